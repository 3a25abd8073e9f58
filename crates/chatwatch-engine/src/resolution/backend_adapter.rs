//! Backend Adapter for DOM queries
//!
//! Implements [`DomQuery`] on top of any [`Backend`] by translating calls into
//! `DomRequest`s for the in-page helper. This keeps resolution and extraction
//! backend-agnostic.

use async_trait::async_trait;
use chatwatch_common::protocol::{
    DescribeRequest, DomRequest, NodeDetails, NodeId, QueryRequest,
};

use super::resolver::DomQuery;
use crate::backend::{Backend, BackendError};

/// Adapter that implements DomQuery using a Backend.
pub struct BackendDom<'a, B: Backend + ?Sized> {
    backend: &'a mut B,
}

impl<'a, B: Backend + ?Sized> BackendDom<'a, B> {
    pub fn new(backend: &'a mut B) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl<'a, B: Backend + ?Sized> DomQuery for BackendDom<'a, B> {
    async fn query_all(
        &mut self,
        scope: Option<NodeId>,
        selector: &str,
    ) -> Result<Vec<NodeId>, BackendError> {
        let req = DomRequest::Query(QueryRequest {
            selector: selector.to_string(),
            scope,
        });
        self.backend.execute_dom(req).await?.into_nodes()
    }

    async fn describe(&mut self, id: NodeId) -> Result<NodeDetails, BackendError> {
        let req = DomRequest::Describe(DescribeRequest { id });
        self.backend.execute_dom(req).await?.into_node()
    }

    async fn release_all(&mut self) -> Result<(), BackendError> {
        self.backend.execute_dom(DomRequest::Reset).await?;
        Ok(())
    }
}
