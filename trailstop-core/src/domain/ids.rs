use serde::{Deserialize, Serialize};
use std::fmt;

/// Deterministic run ID: BLAKE3 hex digest of a canonical parameter encoding.
///
/// Two runs with identical parameters share a `RunId` regardless of which
/// thread or process produced them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    pub fn from_canonical(canonical: &str) -> Self {
        Self(blake3::hash(canonical.as_bytes()).to_hex().to_string())
    }

    /// First 12 hex characters, for log lines and directory names.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_is_deterministic() {
        let a = RunId::from_canonical("buy|100|10");
        let b = RunId::from_canonical("buy|100|10");
        assert_eq!(a, b);
        assert_eq!(a.0.len(), 64);
        assert_ne!(a, RunId::from_canonical("sell|100|10"));
    }

    #[test]
    fn short_form_is_prefix() {
        let id = RunId::from_canonical("x");
        assert!(id.0.starts_with(id.short()));
        assert_eq!(id.short().len(), 12);
    }
}
