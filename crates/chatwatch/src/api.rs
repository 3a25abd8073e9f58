use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chatwatch_engine::config::{ChatwatchConfig, ConfigError, ConfigLoader};
use chatwatch_engine::control::{ControlError, MonitorController};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

pub struct AppState {
    pub controller: Arc<MonitorController>,
    /// Overrides sent with `/api/start` are persisted here.
    pub config_path: PathBuf,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/status", get(status))
        .route("/api/start", post(start))
        .route("/api/stop", post(stop))
        .with_state(state)
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct StartRequest {
    pub phone: Option<String>,
    pub email_to: Option<String>,
}

impl StartRequest {
    fn is_empty(&self) -> bool {
        self.phone.is_none() && self.email_to.is_none()
    }

    fn apply(&self, config: &mut ChatwatchConfig) {
        if let Some(phone) = &self.phone {
            config.watcher.phone = Some(phone.clone());
        }
        if let Some(to) = &self.email_to {
            config.email.to = Some(to.clone());
        }
    }
}

pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<ControlError> for ApiError {
    fn from(err: ControlError) -> Self {
        let status = match err {
            ControlError::AlreadyRunning | ControlError::NotRunning => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

async fn status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "running": state.controller.is_running().await,
        "starting": state.controller.is_starting().await,
    }))
}

async fn start(
    State(state): State<Arc<AppState>>,
    body: Option<Json<StartRequest>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    // Refuse before touching the config file.
    if state.controller.is_running().await || state.controller.is_starting().await {
        return Err(ControlError::AlreadyRunning.into());
    }

    if let Some(Json(req)) = body
        && !req.is_empty()
    {
        let mut file_config = ConfigLoader::load_or_default(&state.config_path).await?;
        req.apply(&mut file_config);
        ConfigLoader::save_to(&state.config_path, &file_config).await?;
        state.controller.update_config(|c| req.apply(c)).await;
        info!("Saved start overrides to {}", state.config_path.display());
    }

    state.controller.start().await?;
    Ok(Json(json!({ "status": "started", "running": true })))
}

async fn stop(State(state): State<Arc<AppState>>) -> Result<Json<serde_json::Value>, ApiError> {
    state.controller.stop().await?;
    Ok(Json(json!({ "status": "stopped", "running": false })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chatwatch_engine::backend::{Backend, BackendError, NavigationResult};
    use chatwatch_engine::monitor::{Monitor, MonitorSettings};
    use chatwatch_engine::notifier::{NotificationEvent, Notifier, NotifyError};
    use chatwatch_engine::protocol::{DomRequest, DomResponse, NodeDetails, NodeId};
    use std::time::Duration;

    /// Always logged in, with a single chat called "Alice".
    struct StubPage;

    #[async_trait]
    impl Backend for StubPage {
        async fn launch(&mut self) -> Result<(), BackendError> {
            Ok(())
        }

        async fn close(&mut self) -> Result<(), BackendError> {
            Ok(())
        }

        async fn is_ready(&self) -> bool {
            true
        }

        async fn navigate(&mut self, url: &str) -> Result<NavigationResult, BackendError> {
            Ok(NavigationResult {
                url: url.to_string(),
                title: "WhatsApp".into(),
                status: 200,
            })
        }

        async fn execute_dom(&mut self, request: DomRequest) -> Result<DomResponse, BackendError> {
            Ok(match request {
                DomRequest::Query(_) => DomResponse::Nodes {
                    ids: vec![NodeId(1)],
                },
                DomRequest::Describe(req) => DomResponse::Node {
                    node: NodeDetails {
                        id: req.id,
                        title: Some("Alice".into()),
                        text_nodes: vec!["Alice".into()],
                        text: "Alice".into(),
                    },
                },
                DomRequest::Reset => DomResponse::Done,
            })
        }
    }

    struct Silent;

    #[async_trait]
    impl Notifier for Silent {
        async fn notify(&self, _event: &NotificationEvent) -> Result<(), NotifyError> {
            Ok(())
        }
    }

    async fn serve(dir: &tempfile::TempDir) -> String {
        let mut config = ChatwatchConfig::default();
        config.watcher.state_path = dir.path().join("state.json");
        config.watcher.interval_secs = 3600;

        let controller = MonitorController::new(
            config,
            Box::new(
                |config: &ChatwatchConfig| -> Result<Monitor, ControlError> {
                    let mut settings = MonitorSettings::from_config(config);
                    settings.session.poll_every = Duration::from_millis(10);
                    Ok(Monitor::new(Box::new(StubPage), Arc::new(Silent), settings))
                },
            ),
        );
        let state = Arc::new(AppState {
            controller: Arc::new(controller),
            config_path: dir.path().join("chatwatch.yaml"),
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn start_stop_and_status() {
        let dir = tempfile::tempdir().unwrap();
        let base = serve(&dir).await;
        let client = reqwest::Client::new();

        let health: serde_json::Value = client
            .get(format!("{}/api/health", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["status"], "ok");

        let resp = client.post(format!("{}/api/start", base)).send().await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);

        let status: serde_json::Value = client
            .get(format!("{}/api/status", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(status["running"], true);
        assert_eq!(status["starting"], false);

        let again = client
            .post(format!("{}/api/start", base))
            .json(&StartRequest {
                phone: Some("+447700900123".into()),
                email_to: None,
            })
            .send()
            .await
            .unwrap();
        assert_eq!(again.status(), reqwest::StatusCode::CONFLICT);
        assert!(!dir.path().join("chatwatch.yaml").exists());

        let resp = client.post(format!("{}/api/stop", base)).send().await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);

        let resp = client.post(format!("{}/api/stop", base)).send().await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::CONFLICT);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn start_overrides_are_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let base = serve(&dir).await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{}/api/start", base))
            .json(&StartRequest {
                phone: Some("+447700900123".into()),
                email_to: Some("me@example.com".into()),
            })
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);

        let saved = ConfigLoader::load_from(&dir.path().join("chatwatch.yaml"))
            .await
            .unwrap();
        assert_eq!(saved.watcher.phone.as_deref(), Some("+447700900123"));
        assert_eq!(saved.email.to.as_deref(), Some("me@example.com"));

        client.post(format!("{}/api/stop", base)).send().await.unwrap();
    }
}
