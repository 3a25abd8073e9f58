//! Change detection between two snapshots.
//!
//! Comparison is positional and exact: no case folding, no whitespace
//! normalization beyond the trimming the extractor already did.

use crate::snapshot::ConversationSnapshot;

/// Length check followed by pairwise, position-sensitive string equality.
pub fn sequences_equal<S: AsRef<str>>(a: &[S], b: &[S]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.as_ref() == y.as_ref())
}

pub fn equal(a: &ConversationSnapshot, b: &ConversationSnapshot) -> bool {
    sequences_equal(a.names(), b.names())
}

/// 0-based ranks whose names differ, for logging.
pub fn changed_ranks(a: &ConversationSnapshot, b: &ConversationSnapshot) -> Vec<usize> {
    a.names()
        .iter()
        .zip(b.names())
        .enumerate()
        .filter(|(_, (x, y))| x != y)
        .map(|(i, _)| i)
        .collect()
}
