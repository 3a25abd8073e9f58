use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;

type LaunchError = Box<dyn std::error::Error + Send + Sync>;

/// How Chromium is started.
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    pub visible: bool,
    pub chrome_bin: Option<PathBuf>,
    /// Persistent profile; when unset a throwaway directory is created and removed on close.
    pub user_data_dir: Option<PathBuf>,
    pub user_agent: Option<String>,
}

pub struct CdpClient {
    pub browser: Browser,
    pub handler_task: JoinHandle<()>,
    pub page: Page,
    user_data_dir: PathBuf,
    cleanup_user_data_dir: bool,
}

impl CdpClient {
    pub async fn launch(options: &LaunchOptions) -> Result<Self, LaunchError> {
        let mut config_builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(1280, 900);

        let (user_data_dir, cleanup_user_data_dir) =
            resolve_user_data_dir(options.user_data_dir.as_deref())?;
        config_builder = config_builder.user_data_dir(&user_data_dir);

        if options.visible {
            tracing::info!("Launching browser in visible mode");
            config_builder = config_builder.with_head();
        } else {
            tracing::info!("Launching browser in headless mode");
        }

        if let Some(chrome_bin) = &options.chrome_bin {
            tracing::info!("Using custom Chrome binary: {}", chrome_bin.display());
            config_builder = config_builder.chrome_executable(chrome_bin);
        }

        // Optional override; Chromium's own UA is used otherwise.
        if let Some(user_agent) = &options.user_agent {
            config_builder = config_builder.arg(format!("--user-agent={}", user_agent));
        }

        let (browser, mut handler) = Browser::launch(
            config_builder
                .build()
                .map_err(|e| format!("Failed to build browser config: {}", e))?,
        )
        .await
        .map_err(|e| format!("Failed to launch browser: {}", e))?;

        let handler_task = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if let Err(e) = h {
                    tracing::debug!("Browser handler error (ignoring): {}", e);
                }
            }
            tracing::debug!("Browser handler task ended");
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| format!("Failed to create page: {}", e))?;

        let mut console_events = page
            .event_listener::<chromiumoxide::cdp::js_protocol::runtime::EventConsoleApiCalled>()
            .await
            .map_err(|e| format!("Failed to subscribe to console events: {}", e))?;

        tokio::spawn(async move {
            while let Some(event) = console_events.next().await {
                let args: Vec<String> = event
                    .args
                    .iter()
                    .map(|arg| arg.description.clone().unwrap_or_else(|| "?".to_string()))
                    .collect();
                tracing::trace!("Browser console [{:?}]: {}", event.r#type, args.join(" "));
            }
        });

        // "Leave site?" and similar prompts would otherwise block every evaluation.
        let mut dialog_events = page
            .event_listener::<chromiumoxide::cdp::browser_protocol::page::EventJavascriptDialogOpening>()
            .await
            .map_err(|e| format!("Failed to subscribe to dialog events: {}", e))?;

        let page_clone = page.clone();
        tokio::spawn(async move {
            while let Some(event) = dialog_events.next().await {
                tracing::info!("Dismissing JavaScript dialog: {}", event.message);
                let cmd =
                    chromiumoxide::cdp::browser_protocol::page::HandleJavaScriptDialogParams::new(
                        true,
                    );
                if let Err(e) = page_clone.execute(cmd).await {
                    tracing::warn!("Failed to accept dialog: {}", e);
                }
            }
        });

        Ok(Self {
            browser,
            handler_task,
            page,
            user_data_dir,
            cleanup_user_data_dir,
        })
    }

    pub async fn close(mut self) -> Result<(), LaunchError> {
        self.browser
            .close()
            .await
            .map_err(|e| format!("Error closing browser: {}", e))?;
        self.handler_task
            .await
            .map_err(|e| format!("Error awaiting handler: {}", e))?;

        if self.cleanup_user_data_dir
            && let Err(e) = std::fs::remove_dir_all(&self.user_data_dir)
        {
            tracing::debug!(
                "Failed to clean up user-data-dir {}: {}",
                self.user_data_dir.display(),
                e
            );
        }

        Ok(())
    }
}

/// Returns the profile directory and whether it should be removed on close.
pub fn resolve_user_data_dir(requested: Option<&Path>) -> Result<(PathBuf, bool), LaunchError> {
    if let Some(dir) = requested {
        std::fs::create_dir_all(dir)?;
        tracing::info!("Using browser profile {}", dir.display());
        return Ok((dir.to_path_buf(), false));
    }

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| format!("System clock error: {}", e))?
        .as_nanos();
    let unique = format!("chatwatch-profile-{}-{}", std::process::id(), nanos);
    let path = std::env::temp_dir().join(unique);
    std::fs::create_dir_all(&path)?;
    tracing::warn!(
        "Using throwaway profile {}; the WhatsApp login will not survive a restart",
        path.display()
    );
    Ok((path, true))
}
