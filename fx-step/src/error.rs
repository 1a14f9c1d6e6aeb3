//! Engine-level failures
//!
//! A [`Defect`] is never a domain error: it means the sequence was wired up
//! wrongly (a capability nobody provides) and it always reaches the outermost
//! run boundary, after finalizers have been drained.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Defect {
    #[error("Unresolved capability `{name}` (key #{id})")]
    UnresolvedCapability { name: String, id: u64 },

    /// A routine returned an abort token its own handle never issued.
    /// Only reachable by misuse, such as stashing a token from an earlier
    /// run and returning it later.
    #[error("Routine returned an abort token its own handle never issued")]
    DetachedAbort,
}

impl Defect {
    pub fn unresolved(name: impl Into<String>, id: u64) -> Self {
        Self::UnresolvedCapability {
            name: name.into(),
            id,
        }
    }

    /// Name of the missing capability, if this defect is an unresolved lookup
    pub fn capability_name(&self) -> Option<&str> {
        match self {
            Self::UnresolvedCapability { name, .. } => Some(name),
            Self::DetachedAbort => None,
        }
    }

    pub fn is_unresolved_capability(&self) -> bool {
        matches!(self, Self::UnresolvedCapability { .. })
    }
}
