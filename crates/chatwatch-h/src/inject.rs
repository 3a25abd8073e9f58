use chatwatch_engine::protocol::DomRequest;
use chatwatch_scanner::{DOM_JS, PROBE_JS};
use chromiumoxide::Page;
use std::error::Error;
use std::future::Future;
use std::time::Duration;

/// Maximum retries for context errors while the page is navigating.
const MAX_CONTEXT_RETRIES: u32 = 10;

const CONTEXT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// The page context is unavailable (e.g. mid-navigation).
fn is_context_error(err: &str) -> bool {
    err.contains("Cannot find context")
        || err.contains("Execution context was destroyed")
        || err.contains("-32000")
}

/// Retry `operation` while it fails with context errors; other errors return at once.
async fn retry_on_context_error<T, E, F, Fut>(
    operation_name: &str,
    mut operation: F,
) -> Result<T, Box<dyn Error + Send + Sync>>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut last_error = None;

    for attempt in 0..MAX_CONTEXT_RETRIES {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                let err_str = e.to_string();
                if is_context_error(&err_str) {
                    tracing::debug!(
                        "{} context error (attempt {}/{}), retrying...",
                        operation_name,
                        attempt + 1,
                        MAX_CONTEXT_RETRIES
                    );
                    last_error = Some(err_str);
                    tokio::time::sleep(CONTEXT_RETRY_DELAY).await;
                    continue;
                }
                return Err(err_str.into());
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| format!("{} failed after retries", operation_name))
        .into())
}

/// Install `window.ChatWatch` unless the current document already has it.
pub async fn inject_helper(page: &Page) -> Result<(), Box<dyn Error + Send + Sync>> {
    retry_on_context_error("Helper injection", || try_inject_helper(page)).await
}

async fn try_inject_helper(page: &Page) -> Result<(), Box<dyn Error + Send + Sync>> {
    let is_loaded: bool = page
        .evaluate(PROBE_JS)
        .await
        .map_err(|e| format!("Failed to check helper status: {}", e))?
        .into_value()
        .map_err(|e| format!("Failed to read probe result: {}", e))?;

    if !is_loaded {
        tracing::debug!("Injecting DOM helper");
        page.evaluate(DOM_JS)
            .await
            .map_err(|e| format!("Failed to inject DOM helper: {}", e))?;
    }

    Ok(())
}

#[derive(Debug)]
pub enum EvalError {
    Timeout,
    Context(String),
    Other(String),
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvalError::Timeout => write!(f, "evaluation timed out"),
            EvalError::Context(e) => write!(f, "page context unavailable: {}", e),
            EvalError::Other(e) => write!(f, "{}", e),
        }
    }
}

impl Error for EvalError {}

/// Expression handing one request to the helper.
pub fn request_expression(request: &DomRequest) -> Result<String, serde_json::Error> {
    Ok(format!(
        "window.ChatWatch.process({})",
        serde_json::to_string(request)?
    ))
}

/// Run one helper request, re-injecting after navigations.
pub async fn execute_request(
    page: &Page,
    request: &DomRequest,
    timeout: Duration,
) -> Result<serde_json::Value, EvalError> {
    let expression =
        request_expression(request).map_err(|e| EvalError::Other(e.to_string()))?;
    tracing::trace!("Evaluating: {}", expression);

    let mut last_error = None;

    for attempt in 0..MAX_CONTEXT_RETRIES {
        inject_helper(page)
            .await
            .map_err(|e| EvalError::Other(e.to_string()))?;

        match evaluate_with_timeout(page, &expression, timeout).await {
            Ok(value) => return Ok(value),
            Err(EvalError::Context(err_str)) => {
                tracing::debug!(
                    "Context error during request (attempt {}/{}), retrying...",
                    attempt + 1,
                    MAX_CONTEXT_RETRIES
                );
                last_error = Some(err_str);
                tokio::time::sleep(CONTEXT_RETRY_DELAY).await;
            }
            Err(other) => return Err(other),
        }
    }

    Err(EvalError::Context(
        last_error.unwrap_or_else(|| "request failed after retries".to_string()),
    ))
}

async fn evaluate_with_timeout(
    page: &Page,
    expression: &str,
    timeout: Duration,
) -> Result<serde_json::Value, EvalError> {
    match tokio::time::timeout(timeout, page.evaluate(expression)).await {
        Err(_) => Err(EvalError::Timeout),
        Ok(Err(e)) => {
            let err_str = e.to_string();
            if is_context_error(&err_str) {
                Err(EvalError::Context(err_str))
            } else {
                Err(EvalError::Other(err_str))
            }
        }
        Ok(Ok(remote_object)) => remote_object
            .into_value::<serde_json::Value>()
            .map_err(|e| EvalError::Other(format!("Failed to get result: {}", e))),
    }
}
