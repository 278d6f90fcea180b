//! Re-exports of dependencies whose types appear in the public API.

pub use arcstr;
pub use indexmap;
