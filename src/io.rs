//! IO utilities.
//!
//! Conversion itself never touches the filesystem; callers flush the
//! returned buffers here when files on disk are actually wanted.

use std::io::Write;
use std::path::Path;

use indexmap::IndexMap;

use crate::deps::arcstr::ArcStr;
use crate::error::{with_err_context, ErrorContext, Result};

pub fn create_dir_all(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    with_err_context(std::fs::create_dir_all(path), || {
        ErrorContext::CreateDir(path.to_path_buf())
    })?;
    Ok(())
}

pub fn create_file(path: impl AsRef<Path>) -> Result<std::fs::File> {
    let path = path.as_ref();
    let file = with_err_context(std::fs::File::create(path), || {
        ErrorContext::CreateFile(path.to_path_buf())
    })?;
    Ok(file)
}

/// Writes an emitted-file map into `dir`, one file per entry.
pub fn write_files(dir: impl AsRef<Path>, files: &IndexMap<ArcStr, String>) -> Result<()> {
    let dir = dir.as_ref();
    create_dir_all(dir)?;
    for (name, content) in files.iter() {
        let path = dir.join(name.as_str());
        let mut f = create_file(&path)?;
        with_err_context(f.write_all(content.as_bytes()), || {
            ErrorContext::CreateFile(path.clone())
        })?;
    }
    Ok(())
}
