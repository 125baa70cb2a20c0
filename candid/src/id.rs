use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Computes the 32-bit label hash Candid uses to identify record fields and variant options on
/// the wire.
pub fn idl_hash(name: &str) -> u32 {
    name.bytes()
        .fold(0u32, |hash, byte| hash.wrapping_mul(223).wrapping_add(byte as u32))
}

/// Identifier of a declared type, a record field or a variant option.
///
/// Identity is the canonical label hash, so `Named("foo")` and `Numbered(idl_hash("foo"))` are
/// equal, and ordering follows the hash like the wire format does.
#[derive(Clone, Debug)]
pub enum CandidId {
    Named(String),
    Numbered(u32),
}

impl CandidId {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn hash(&self) -> u32 {
        match self {
            Self::Named(name) => idl_hash(name),
            Self::Numbered(id) => *id,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Named(name) => Some(name),
            Self::Numbered(_) => None,
        }
    }

    /// Parses a label as written in Candid source: a decimal number becomes [`Self::Numbered`],
    /// anything else (with surrounding quotes removed) [`Self::Named`].
    pub fn parse(label: &str) -> Self {
        match label.parse::<u32>() {
            Ok(id) => Self::Numbered(id),
            Err(_) => Self::Named(unquote(label).to_string()),
        }
    }
}

pub(crate) fn unquote(text: &str) -> &str {
    text.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text)
}

impl PartialEq for CandidId {
    fn eq(&self, other: &Self) -> bool {
        self.hash() == other.hash()
    }
}

impl Eq for CandidId {}

impl PartialOrd for CandidId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CandidId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.hash().cmp(&other.hash())
    }
}

impl Hash for CandidId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        CandidId::hash(self).hash(state);
    }
}

impl fmt::Display for CandidId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::Numbered(id) => write!(f, "{id}"),
        }
    }
}

impl From<&str> for CandidId {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}
