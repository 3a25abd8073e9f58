use async_trait::async_trait;
pub use chatwatch_common::error::BackendError;
use chatwatch_common::protocol::{DomRequest, DomResponse};

#[derive(Debug, Clone)]
pub struct NavigationResult {
    pub url: String,
    pub title: String,
    pub status: u16, // generic status code (e.g. 200)
}

/// The Backend trait is the unified interface the CDP and WebDriver drivers implement.
///
/// The watcher only ever needs navigation, the DOM helper round-trip and a
/// screenshot for diagnostics; everything else stays inside the driver crates.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Launch the backend (start browser, connect to a driver, etc.)
    async fn launch(&mut self) -> Result<(), BackendError>;

    /// Close the backend and cleanup resources.
    async fn close(&mut self) -> Result<(), BackendError>;

    /// Check if the backend is ready to accept commands.
    async fn is_ready(&self) -> bool;

    /// Navigate to a specific URL.
    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, BackendError>;

    /// Execute one request against the in-page DOM helper, injecting it first if needed.
    async fn execute_dom(&mut self, request: DomRequest) -> Result<DomResponse, BackendError>;

    /// Capture a PNG screenshot of the current viewport.
    async fn screenshot(&mut self) -> Result<Vec<u8>, BackendError> {
        Err(BackendError::NotSupported("screenshot".into()))
    }
}
