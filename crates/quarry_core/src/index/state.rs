//! Index lifecycle states.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of an index.
///
/// ```text
/// Creating -> Open <-> Closed -> Deleting
///     \                  ^
///      -> Failed         |
///                    Recovering
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexState {
    /// Storage is being acquired.
    Creating,
    /// Available for reads and writes.
    Open,
    /// Data preserved, no engine handles held.
    Closed,
    /// Being removed. Terminal.
    Deleting,
    /// Initialization failed.
    Failed,
    /// Discovered on disk and about to be opened.
    Recovering,
}

impl IndexState {
    /// Every state, in declaration order.
    pub const ALL: [IndexState; 6] = [
        Self::Creating,
        Self::Open,
        Self::Closed,
        Self::Deleting,
        Self::Failed,
        Self::Recovering,
    ];

    /// Returns the lowercase state name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Creating => "creating",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Deleting => "deleting",
            Self::Failed => "failed",
            Self::Recovering => "recovering",
        }
    }

    /// Documents may be written.
    pub const fn is_writeable(self) -> bool {
        matches!(self, Self::Open)
    }

    /// Searchers may be acquired.
    pub const fn is_readable(self) -> bool {
        matches!(self, Self::Open)
    }

    /// The index directory may be removed.
    pub const fn is_deletable(self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }

    /// The index may be (re)opened.
    pub const fn can_open(self) -> bool {
        matches!(self, Self::Closed | Self::Recovering)
    }

    /// The index may be closed.
    pub const fn can_close(self) -> bool {
        matches!(self, Self::Open)
    }

    /// No further transition is allowed.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Deleting)
    }
}

impl fmt::Display for IndexState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_ascii_uppercase())
    }
}

/// Error returned when parsing an unknown state name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown index state: {0}")]
pub struct UnknownState(pub String);

impl FromStr for IndexState {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownState(s.to_string()))
    }
}
