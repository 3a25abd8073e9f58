mod api;
mod runtime;

use anyhow::Context;
use chatwatch_engine::control::{ControlError, MonitorController};
use chatwatch_engine::notifier::Notifier;
use clap::{Parser, Subcommand};
use runtime::CliOverrides;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Parser)]
#[command(
    name = "chatwatch",
    version,
    about = "Email me when my most recent WhatsApp chats change"
)]
struct Args {
    #[command(subcommand)]
    mode: Mode,

    /// Config file (defaults to ./chatwatch.yaml, then ~/.chatwatch/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Show the browser window instead of running headless
    #[arg(long, global = true)]
    visible: bool,

    /// Drive an external WebDriver server instead of launching Chromium
    #[arg(long, global = true)]
    driver_url: Option<String>,

    /// Seconds between checks
    #[arg(long, global = true)]
    interval_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Mode {
    /// Watch until Ctrl+C
    Watch,
    /// Serve the HTTP start/stop API
    Serve {
        #[arg(long, default_value_t = 8787)]
        port: u16,

        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Allow cross-origin requests from any origin
        #[arg(long)]
        cors: bool,

        /// Start watching immediately instead of waiting for /api/start
        #[arg(long)]
        autostart: bool,
    },
    /// Send a sample notification and exit
    TestEmail,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let overrides = CliOverrides {
        visible: args.visible,
        interval_secs: args.interval_secs,
        driver_url: args.driver_url.clone(),
    };
    let config_path = runtime::config_path(args.config.as_deref());
    let config = runtime::load_config(&config_path, &overrides)
        .await
        .with_context(|| format!("loading {}", config_path.display()))?;

    match args.mode {
        Mode::Watch => {
            let controller = MonitorController::new(config, runtime::monitor_factory());
            let start = controller.start();
            let signal = runtime::shutdown_signal();
            tokio::pin!(start, signal);

            tokio::select! {
                started = &mut start => {
                    started?;
                    info!("Watching; press Ctrl+C to stop");
                    signal.await;
                }
                _ = &mut signal => {
                    // Cancels the login wait; the start then closes the browser.
                    controller.shutdown().await;
                    match start.await {
                        Ok(()) | Err(ControlError::Cancelled) => {}
                        Err(e) => warn!("Startup ended with error: {}", e),
                    }
                }
            }
            controller.shutdown().await;
        }
        Mode::Serve {
            port,
            host,
            cors,
            autostart,
        } => {
            if let Err(e) = config.mail_settings() {
                warn!("Email is not configured yet ({}); /api/start will fail until it is", e);
            }

            let controller = Arc::new(MonitorController::new(config, runtime::monitor_factory()));
            if autostart {
                controller.start().await?;
            }

            let state = Arc::new(api::AppState {
                controller: controller.clone(),
                config_path,
            });
            let mut app = api::router(state).layer(TraceLayer::new_for_http());
            if cors {
                app = app.layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                );
            }

            let addr = format!("{}:{}", host, port);
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("binding {}", addr))?;
            info!("Control API listening on http://{}", addr);

            axum::serve(listener, app)
                .with_graceful_shutdown(runtime::shutdown_signal())
                .await?;
            controller.shutdown().await;
        }
        Mode::TestEmail => {
            let notifier = runtime::build_notifier(&config)?;
            notifier
                .notify(&chatwatch_mail::template::sample_event())
                .await?;
            info!("Test email sent");
        }
    }

    Ok(())
}
