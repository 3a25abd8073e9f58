use crate::protocol::NodeId;
use thiserror::Error;

/// Errors surfaced by browser backends and the in-page DOM helper.
#[derive(Debug, Error)]
pub enum BackendError {
    // ============================================================
    // Navigation Errors
    // ============================================================
    #[error("Navigation failed: {0}")]
    Navigation(String),

    // ============================================================
    // Query Errors (reported by the in-page helper)
    // ============================================================
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Node {id} is no longer attached to the document")]
    StaleNode { id: NodeId },

    #[error("Script error: {0}")]
    Script(String),

    // ============================================================
    // Session Errors
    // ============================================================
    #[error("Backend not ready")]
    NotReady,

    #[error("Connection lost")]
    ConnectionLost,

    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    #[error("Not supported: {0}")]
    NotSupported(String),

    // ============================================================
    // Infrastructure
    // ============================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl BackendError {
    /// Errors a selector chain may step over: the query itself was rejected,
    /// as opposed to the browser session being gone.
    pub fn is_query_error(&self) -> bool {
        matches!(
            self,
            BackendError::InvalidSelector(_)
                | BackendError::StaleNode { .. }
                | BackendError::Script(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_errors_are_distinguished_from_session_errors() {
        assert!(BackendError::InvalidSelector("div[".into()).is_query_error());
        assert!(BackendError::StaleNode { id: NodeId(4) }.is_query_error());
        assert!(!BackendError::NotReady.is_query_error());
        assert!(!BackendError::Timeout(10_000).is_query_error());
    }

    #[test]
    fn stale_node_message_names_the_node() {
        let err = BackendError::StaleNode { id: NodeId(12) };
        assert_eq!(
            err.to_string(),
            "Node 12 is no longer attached to the document"
        );
    }
}
