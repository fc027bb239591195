//! Resource classification of operation kinds.
//!
//! Maps a raw operation-kind label (as it appears in the dataflow graph) to the
//! hardware resource class that executes it:
//! - multiply / divide -> `WIDE`
//! - add, sub, neg, and, compare, shifts, I/O, memory, load/store, branches -> `NARROW`
//! - anything else -> its own singleton class

use std::fmt;

/// Canonical hardware resource class an operation contends for.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceClass {
    /// Multiplier-class units (mul, div).
    Wide,
    /// General ALU-class units.
    Narrow,
    /// Any kind the classifier does not know; forms its own class.
    Other(String),
}

impl ResourceClass {
    /// Whether this is the multiplier class.
    pub fn is_wide(&self) -> bool {
        matches!(self, Self::Wide)
    }

    /// Canonical name of the class.
    pub fn name(&self) -> &str {
        match self {
            Self::Wide => "WIDE",
            Self::Narrow => "NARROW",
            Self::Other(kind) => kind,
        }
    }
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const WIDE_KINDS: &[&str] = &["mul", "div"];

const NARROW_KINDS: &[&str] = &[
    "add", "sub", "neg", "and", // arithmetic / logic
    "les", // compare
    "lsl", "lsr", "asr", // shifts
    "imp", "exp", // implicit / explicit I/O
    "memr", "memw", // memory read / write
    "str", "lod", // store / load
    "bne", "bge", // branches
];

/// Classify an operation kind. Matching is ASCII case-insensitive.
///
/// A kind spelled like a canonical class name (`wide`, `narrow`) maps to that
/// class, so no singleton class shares a name with a canonical one.
pub fn classify(kind: &str) -> ResourceClass {
    let matches = |table: &[&str]| table.iter().any(|k| k.eq_ignore_ascii_case(kind));
    if matches(WIDE_KINDS) || kind.eq_ignore_ascii_case(ResourceClass::Wide.name()) {
        ResourceClass::Wide
    } else if matches(NARROW_KINDS) || kind.eq_ignore_ascii_case(ResourceClass::Narrow.name()) {
        ResourceClass::Narrow
    } else {
        ResourceClass::Other(kind.to_string())
    }
}
