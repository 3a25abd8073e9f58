//! Wiring between configuration, browser backends and the mail notifier.

use chatwatch_e::{DriverOptions, WebDriverBackend};
use chatwatch_engine::backend::Backend;
use chatwatch_engine::config::{ChatwatchConfig, ConfigLoader};
use chatwatch_engine::control::{ControlError, MonitorFactory};
use chatwatch_engine::monitor::{Monitor, MonitorSettings};
use chatwatch_h::{HeadlessBackend, LaunchOptions};
use chatwatch_mail::EmailNotifier;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Command-line flags layered over file and environment configuration.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub visible: bool,
    pub interval_secs: Option<u64>,
    pub driver_url: Option<String>,
}

impl CliOverrides {
    pub fn apply(&self, config: &mut ChatwatchConfig) {
        if self.visible {
            config.browser.headless = false;
        }
        if let Some(secs) = self.interval_secs {
            config.watcher.interval_secs = secs;
        }
        if let Some(url) = &self.driver_url {
            config.browser.driver_url = Some(url.clone());
        }
    }
}

/// Where the config file lives: the explicit path, else the first existing
/// default location, else `./chatwatch.yaml`.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .or_else(ConfigLoader::locate)
        .unwrap_or_else(|| PathBuf::from("./chatwatch.yaml"))
}

/// File, then environment, then command line.
pub async fn load_config(
    path: &Path,
    overrides: &CliOverrides,
) -> anyhow::Result<ChatwatchConfig> {
    let mut config = ConfigLoader::load_or_default(path).await?;
    config.apply_env()?;
    overrides.apply(&mut config);
    Ok(config)
}

pub fn build_backend(config: &ChatwatchConfig) -> Box<dyn Backend> {
    let browser = &config.browser;
    match &browser.driver_url {
        Some(url) => {
            info!("Using WebDriver backend at {}", url);
            Box::new(WebDriverBackend::new(
                url.clone(),
                DriverOptions {
                    headless: browser.headless,
                    user_data_dir: browser.profile_dir(),
                    user_agent: browser.user_agent.clone(),
                },
            )
            .eval_timeout(browser.eval_timeout()))
        }
        None => Box::new(
            HeadlessBackend::with_options(LaunchOptions {
                visible: !browser.headless,
                chrome_bin: browser.chrome_bin.clone(),
                user_data_dir: browser.profile_dir(),
                user_agent: browser.user_agent.clone(),
            })
            .eval_timeout(browser.eval_timeout()),
        ),
    }
}

pub fn build_notifier(config: &ChatwatchConfig) -> Result<EmailNotifier, ControlError> {
    let mail = config.mail_settings()?;
    EmailNotifier::new(mail).map_err(|e| ControlError::Build(e.to_string()))
}

/// Fresh backend and notifier for every start.
pub fn monitor_factory() -> MonitorFactory {
    Box::new(
        |config: &ChatwatchConfig| -> Result<Monitor, ControlError> {
            let notifier = build_notifier(config)?;
            Ok(Monitor::new(
                build_backend(config),
                Arc::new(notifier),
                MonitorSettings::from_config(config),
            ))
        },
    )
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
