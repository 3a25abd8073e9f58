use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of ranked conversations captured per tick.
pub const TOP_N: usize = 3;

/// Sentinel placed in the first slot when extraction failed outright.
pub const ERROR_SENTINEL: &str = "Error";

/// Sentinel placed in the first slot when no conversation list was found
/// and diagnostics are enabled.
pub const NOT_FOUND_SENTINEL: &str = "No chats found";

/// The ranked display names of the top conversations at one tick.
///
/// Always exactly [`TOP_N`] entries; missing conversations are empty strings
/// so positional comparison is well-defined.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationSnapshot {
    names: [String; TOP_N],
}

impl ConversationSnapshot {
    pub fn new(names: [String; TOP_N]) -> Self {
        Self { names }
    }

    /// Build from a ranked list, keeping the first [`TOP_N`] and padding with `""`.
    pub fn from_ranked<I, S>(ranked: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: [String; TOP_N] = Default::default();
        for (slot, name) in names.iter_mut().zip(ranked) {
            *slot = name.into();
        }
        Self { names }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn error_sentinel() -> Self {
        Self::from_ranked([ERROR_SENTINEL])
    }

    pub fn not_found_sentinel() -> Self {
        Self::from_ranked([NOT_FOUND_SENTINEL])
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Name at `rank` (0-based), `""` when that slot is padding.
    pub fn get(&self, rank: usize) -> Option<&str> {
        self.names.get(rank).map(String::as_str)
    }

    /// Most recent conversation, `""` when the list was empty.
    pub fn top(&self) -> &str {
        &self.names[0]
    }

    pub fn is_blank(&self) -> bool {
        self.names.iter().all(|n| n.is_empty())
    }

    pub fn into_names(self) -> [String; TOP_N] {
        self.names
    }
}

impl fmt::Display for ConversationSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, name) in self.names.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            if name.is_empty() {
                write!(f, "{}. -", i + 1)?;
            } else {
                write!(f, "{}. {}", i + 1, name)?;
            }
        }
        Ok(())
    }
}
