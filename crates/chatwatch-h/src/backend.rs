use crate::cdp::{CdpClient, LaunchOptions};
use crate::inject::{EvalError, execute_request};
use async_trait::async_trait;
use chatwatch_engine::backend::{Backend, BackendError, NavigationResult};
use chatwatch_engine::protocol::{DomRequest, DomResponse};
use std::time::Duration;
use tracing::info;

const DEFAULT_EVAL_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HeadlessBackend {
    client: Option<CdpClient>,
    options: LaunchOptions,
    eval_timeout: Duration,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::with_options(LaunchOptions::default())
    }

    pub fn with_options(options: LaunchOptions) -> Self {
        Self {
            client: None,
            options,
            eval_timeout: DEFAULT_EVAL_TIMEOUT,
        }
    }

    pub fn eval_timeout(mut self, timeout: Duration) -> Self {
        self.eval_timeout = timeout;
        self
    }

    pub fn get_client(&self) -> Option<&CdpClient> {
        self.client.as_ref()
    }

    async fn get_navigation_result(
        page: &chromiumoxide::Page,
    ) -> Result<NavigationResult, BackendError> {
        let title = page
            .get_title()
            .await
            .unwrap_or_default()
            .unwrap_or_default();
        let url = page
            .url()
            .await
            .map_err(|e| BackendError::Navigation(e.to_string()))?
            .unwrap_or_default();
        Ok(NavigationResult {
            url,
            title,
            status: 200,
        })
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for HeadlessBackend {
    async fn launch(&mut self) -> Result<(), BackendError> {
        info!("Launching Chromium...");
        let client = CdpClient::launch(&self.options)
            .await
            .map_err(|e| BackendError::Other(e.to_string()))?;
        self.client = Some(client);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BackendError> {
        if let Some(client) = self.client.take() {
            client
                .close()
                .await
                .map_err(|e| BackendError::Other(e.to_string()))?;
        }
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        self.client.is_some()
    }

    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, BackendError> {
        let client = self.client.as_mut().ok_or(BackendError::NotReady)?;

        info!("Navigating to: {}", url);
        client
            .page
            .goto(url)
            .await
            .map_err(|e| BackendError::Navigation(e.to_string()))?;

        Self::get_navigation_result(&client.page).await
    }

    async fn execute_dom(&mut self, request: DomRequest) -> Result<DomResponse, BackendError> {
        let client = self.client.as_ref().ok_or(BackendError::NotReady)?;

        let value = execute_request(&client.page, &request, self.eval_timeout)
            .await
            .map_err(|e| match e {
                EvalError::Timeout => BackendError::Timeout(self.eval_timeout.as_millis() as u64),
                EvalError::Context(_) => BackendError::ConnectionLost,
                EvalError::Other(msg) => BackendError::Other(format!("Evaluation failed: {}", msg)),
            })?;

        Ok(serde_json::from_value(value)?)
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, BackendError> {
        let client = self.client.as_ref().ok_or(BackendError::NotReady)?;
        client
            .page
            .screenshot(chromiumoxide::page::ScreenshotParams::builder().build())
            .await
            .map_err(|e| BackendError::Other(format!("Screenshot failed: {}", e)))
    }
}
