//! Wire types exchanged with the in-page DOM helper (`window.ChatWatch`).
//!
//! Requests are serialized to JSON and passed to `ChatWatch.process(...)`;
//! the helper answers with a `DomResponse` tagged by `status`.

use crate::error::BackendError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle to an element registered in the page helper's element map.
///
/// Handles stay valid until the element is detached or the helper is reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DomRequest {
    /// `querySelectorAll` against the document or a registered node.
    Query(QueryRequest),
    /// Read the label-relevant facts of one registered node.
    Describe(DescribeRequest),
    /// Drop every registered handle.
    Reset,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub selector: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescribeRequest {
    pub id: NodeId,
}

/// What the helper knows about a single element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeDetails {
    pub id: NodeId,
    /// Raw value of the element's `title` attribute, if present.
    #[serde(default)]
    pub title: Option<String>,
    /// Non-empty, trimmed descendant text nodes in document order.
    #[serde(default)]
    pub text_nodes: Vec<String>,
    /// Rendered text (`innerText`) of the element.
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidSelector,
    StaleNode,
    UnknownAction,
    #[serde(other)]
    Internal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DomResponse {
    Nodes {
        ids: Vec<NodeId>,
    },
    Node {
        node: NodeDetails,
    },
    Done,
    Error {
        code: ErrorCode,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<NodeId>,
    },
}

impl DomResponse {
    /// Unwrap a `Nodes` answer, mapping helper errors onto `BackendError`.
    pub fn into_nodes(self) -> Result<Vec<NodeId>, BackendError> {
        match self {
            DomResponse::Nodes { ids } => Ok(ids),
            other => Err(other.into_error("nodes")),
        }
    }

    /// Unwrap a `Node` answer, mapping helper errors onto `BackendError`.
    pub fn into_node(self) -> Result<NodeDetails, BackendError> {
        match self {
            DomResponse::Node { node } => Ok(node),
            other => Err(other.into_error("node")),
        }
    }

    fn into_error(self, expected: &str) -> BackendError {
        match self {
            DomResponse::Error {
                code: ErrorCode::InvalidSelector,
                message,
                ..
            } => BackendError::InvalidSelector(message),
            DomResponse::Error {
                code: ErrorCode::StaleNode,
                id: Some(id),
                ..
            } => BackendError::StaleNode { id },
            DomResponse::Error { message, .. } => BackendError::Script(message),
            other => BackendError::Script(format!(
                "Unexpected helper response (expected {}): {:?}",
                expected, other
            )),
        }
    }
}
