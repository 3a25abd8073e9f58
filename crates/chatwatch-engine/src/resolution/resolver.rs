//! Selector chain resolution.
//!
//! `DomQuery` is the single capability the resolver needs: run one query and
//! get back zero or more node handles. Native backends provide it through
//! [`BackendDom`](super::BackendDom); tests use in-memory documents.

use super::chain::SelectorChain;
use async_trait::async_trait;
use chatwatch_common::error::BackendError;
use chatwatch_common::protocol::{NodeDetails, NodeId};
use tracing::{debug, trace};

#[async_trait]
pub trait DomQuery: Send {
    /// Returns every match of `selector` under `scope` (the document when `None`),
    /// in document order.
    async fn query_all(
        &mut self,
        scope: Option<NodeId>,
        selector: &str,
    ) -> Result<Vec<NodeId>, BackendError>;

    /// Reads the title attribute and text of a previously returned node.
    async fn describe(&mut self, id: NodeId) -> Result<NodeDetails, BackendError>;

    /// Drops every handle handed out so far.
    async fn release_all(&mut self) -> Result<(), BackendError> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found {
        selector: &'static str,
        nodes: Vec<NodeId>,
    },
    NotFound,
}

impl Resolution {
    pub fn nodes(&self) -> &[NodeId] {
        match self {
            Resolution::Found { nodes, .. } => nodes,
            Resolution::NotFound => &[],
        }
    }

    pub fn into_nodes(self) -> Option<Vec<NodeId>> {
        match self {
            Resolution::Found { nodes, .. } => Some(nodes),
            Resolution::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found { .. })
    }
}

/// Try each selector of `chain` in order and return the first non-empty match set.
///
/// A selector the page rejects (syntax error, stale scope) counts as a miss.
/// Only errors that mean the browser session itself is unusable are returned.
pub async fn resolve<D: DomQuery + ?Sized>(
    dom: &mut D,
    chain: &SelectorChain,
    scope: Option<NodeId>,
) -> Result<Resolution, BackendError> {
    for &selector in chain.selectors {
        match dom.query_all(scope, selector).await {
            Ok(nodes) if !nodes.is_empty() => {
                trace!(
                    "{} matched {} node(s) with '{}'",
                    chain.name,
                    nodes.len(),
                    selector
                );
                return Ok(Resolution::Found { selector, nodes });
            }
            Ok(_) => continue,
            Err(e) if e.is_query_error() => {
                debug!("{}: skipping selector '{}': {}", chain.name, selector, e);
                continue;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(Resolution::NotFound)
}
