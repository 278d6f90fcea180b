//! VHDL identifier and text helpers.

use lazy_static::lazy_static;
use regex::Regex;

use crate::deps::arcstr::ArcStr;

/// VHDL reserved words that commonly collide with signal names.
pub(crate) const RESERVED_NAMES: &[&str] = &[
    "in",
    "out",
    "entity",
    "architecture",
    "generic",
    "port",
    "map",
    "end",
];

/// Prefix applied to renamed identifiers, consistently in declarations and
/// references.
pub(crate) const NAME_PREFIX: &str = "strata";

pub fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES.iter().any(|r| name.eq_ignore_ascii_case(r))
}

/// Renames a reserved identifier with the fixed prefix; other names pass
/// through unchanged. Idempotent.
pub fn fix_reserved(name: &str) -> ArcStr {
    if is_reserved(name) {
        arcstr::format!("{NAME_PREFIX}_{name}")
    } else {
        name.into()
    }
}

/// Fixes a name whose leading character is illegal as a VHDL identifier
/// start (entity names cannot begin with `_` or a digit).
pub fn fix_leading(name: &str) -> ArcStr {
    match name.chars().next() {
        Some(c) if c.is_ascii_alphabetic() => name.into(),
        _ => arcstr::format!("{NAME_PREFIX}{name}"),
    }
}

/// The VHDL type for a wire of `width` bits.
pub(crate) fn wire_type(width: usize) -> String {
    if width == 1 {
        "std_logic".to_string()
    } else {
        format!("unsigned({} downto 0)", width - 1)
    }
}

lazy_static! {
    static ref ENTITY_OPEN: Regex =
        Regex::new(r"(?im)^\s*entity\s+\w+\s+is\b").expect("failed to compile entity-open regex");
    static ref ENTITY_CLOSE: Regex =
        Regex::new(r"(?im)^\s*end\s+entity[^;]*;").expect("failed to compile entity-close regex");
    static ref ENTITY_WORD: Regex =
        Regex::new(r"(?i)\bentity\b").expect("failed to compile entity-word regex");
}

/// Extracts the `entity … end entity …;` block from generated module text.
pub(crate) fn extract_interface_block(text: &str) -> Option<&str> {
    let open = ENTITY_OPEN.find(text)?;
    let close = ENTITY_CLOSE.find(&text[open.start()..])?;
    Some(&text[open.start()..open.start() + close.end()])
}

/// Rewrites an interface block's introducer keyword to a component
/// declaration.
pub(crate) fn to_component_decl(block: &str) -> String {
    ENTITY_WORD.replace_all(block, "component").into_owned()
}
