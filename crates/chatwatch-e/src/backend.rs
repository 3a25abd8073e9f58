use crate::webdriver::{DriverOptions, WebDriverClient};
use async_trait::async_trait;
use chatwatch_engine::backend::{Backend, BackendError, NavigationResult};
use chatwatch_engine::protocol::{DomRequest, DomResponse};
use chatwatch_scanner::{DOM_JS, PROBE_JS};
use fantoccini::error::CmdError;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

const MAX_ATTEMPTS: u32 = 3;
const DEFAULT_EVAL_TIMEOUT: Duration = Duration::from_secs(10);

pub struct WebDriverBackend {
    client: Option<WebDriverClient>,
    webdriver_url: String,
    options: DriverOptions,
    eval_timeout: Duration,
}

impl WebDriverBackend {
    pub fn new(webdriver_url: impl Into<String>, options: DriverOptions) -> Self {
        Self {
            client: None,
            webdriver_url: webdriver_url.into(),
            options,
            eval_timeout: DEFAULT_EVAL_TIMEOUT,
        }
    }

    /// Upper bound for each script the DOM helper runs.
    pub fn eval_timeout(mut self, timeout: Duration) -> Self {
        self.eval_timeout = timeout;
        self
    }

    pub fn webdriver_url(&self) -> &str {
        &self.webdriver_url
    }

    async fn get_navigation_result(
        client: &WebDriverClient,
    ) -> Result<NavigationResult, BackendError> {
        let title = client.client.title().await.unwrap_or_default();
        let url = client
            .client
            .current_url()
            .await
            .map(|u| u.to_string())
            .unwrap_or_default();

        Ok(NavigationResult {
            url,
            title,
            status: 200,
        })
    }
}

const PROCESS_SCRIPT: &str = "return window.ChatWatch.process(arguments[0]);";

/// Run a driver command, giving up with [`BackendError::Timeout`] after `limit`.
async fn bounded<F>(command: F, limit: Duration) -> Result<Result<Value, CmdError>, BackendError>
where
    F: Future<Output = Result<Value, CmdError>>,
{
    tokio::time::timeout(limit, command)
        .await
        .map_err(|_| BackendError::Timeout(limit.as_millis() as u64))
}

#[async_trait]
impl Backend for WebDriverBackend {
    async fn launch(&mut self) -> Result<(), BackendError> {
        info!("Connecting to WebDriver at {}...", self.webdriver_url);
        let client = WebDriverClient::connect(&self.webdriver_url, self.options.capabilities())
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
            .client
            .goto(url)
            .await
            .map_err(|e| BackendError::Navigation(e.to_string()))?;

        Self::get_navigation_result(client).await
    }

    async fn execute_dom(&mut self, request: DomRequest) -> Result<DomResponse, BackendError> {
        let timeout = self.eval_timeout;
        let client = self.client.as_mut().ok_or(BackendError::NotReady)?;
        let args = serde_json::to_value(&request)?;
        let probe = format!("return {};", PROBE_JS);

        let mut last_error = None;
        for attempt in 1..=MAX_ATTEMPTS {
            if attempt > 1 {
                warn!("Retrying DOM request (attempt {})...", attempt);
                tokio::time::sleep(Duration::from_millis(200)).await;
            }

            let installed = match bounded(client.client.execute(&probe, vec![]), timeout).await? {
                Ok(val) => val.as_bool().unwrap_or(false),
                // Context likely lost mid-navigation; inject again.
                Err(_) => false,
            };

            if !installed {
                debug!("Injecting DOM helper");
                if let Err(e) = bounded(client.client.execute(DOM_JS, vec![]), timeout).await? {
                    last_error = Some(BackendError::Other(format!(
                        "Failed to inject DOM helper: {}",
                        e
                    )));
                    continue;
                }
            }

            let processed =
                bounded(client.client.execute(PROCESS_SCRIPT, vec![args.clone()]), timeout).await?;
            match processed {
                // Null comes back while the document is being replaced.
                Ok(value) if value.is_null() => {
                    last_error = Some(BackendError::ConnectionLost);
                    continue;
                }
                Ok(value) => return Ok(serde_json::from_value(value)?),
                Err(e) => {
                    let msg = e.to_string();
                    if msg.contains("undefined is not an object")
                        || msg.contains("ChatWatch is not defined")
                        || msg.contains("Cannot read properties of undefined")
                    {
                        last_error = Some(BackendError::Other(msg));
                        continue;
                    }
                    return Err(BackendError::Other(format!("Script execution failed: {}", msg)));
                }
            }
        }

        Err(last_error.unwrap_or(BackendError::Other(
            "DOM request failed after maximum retries".into(),
        )))
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, BackendError> {
        let client = self.client.as_mut().ok_or(BackendError::NotReady)?;
        client
            .client
            .screenshot()
            .await
            .map_err(|e| BackendError::Other(format!("Screenshot failed: {}", e)))
    }
}
