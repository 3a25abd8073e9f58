//! Start/stop handle around a monitor running on its own task.
//!
//! The controller owns the effective configuration and builds a fresh
//! [`Monitor`] through a factory on every start, so a restarted watcher
//! picks up configuration changes made while it was stopped.

use crate::config::{ChatwatchConfig, ConfigError};
use crate::monitor::{Monitor, MonitorError};
use thiserror::Error;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("Monitor is already running")]
    AlreadyRunning,

    #[error("Monitor is not running")]
    NotRunning,

    #[error("Start was cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Monitor(#[from] MonitorError),

    #[error("Failed to construct monitor: {0}")]
    Build(String),

    #[error("Monitor task failed: {0}")]
    Task(String),
}

/// Builds a monitor (backend plus notifier) for the given configuration.
pub type MonitorFactory =
    Box<dyn Fn(&ChatwatchConfig) -> Result<Monitor, ControlError> + Send + Sync>;

struct RunningMonitor {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<Result<(), MonitorError>>,
}

struct Inner {
    config: ChatwatchConfig,
    running: Option<RunningMonitor>,
    /// Set while a start is launching the browser and waiting for login.
    starting: Option<watch::Sender<bool>>,
}

impl Inner {
    /// Cancel handle of a live start. A start whose future was dropped
    /// leaves a closed sender behind, which is cleared here.
    fn start_in_progress(&mut self) -> Option<&watch::Sender<bool>> {
        if self.starting.as_ref().is_some_and(|tx| tx.is_closed()) {
            self.starting = None;
        }
        self.starting.as_ref()
    }
}

pub struct MonitorController {
    factory: MonitorFactory,
    inner: Mutex<Inner>,
}

impl MonitorController {
    pub fn new(config: ChatwatchConfig, factory: MonitorFactory) -> Self {
        Self {
            factory,
            inner: Mutex::new(Inner {
                config,
                running: None,
                starting: None,
            }),
        }
    }

    pub async fn config(&self) -> ChatwatchConfig {
        self.inner.lock().await.config.clone()
    }

    /// Apply a change to the configuration used by the next start.
    pub async fn update_config<F>(&self, change: F)
    where
        F: FnOnce(&mut ChatwatchConfig),
    {
        change(&mut self.inner.lock().await.config);
    }

    pub async fn is_running(&self) -> bool {
        self.inner
            .lock()
            .await
            .running
            .as_ref()
            .is_some_and(|r| !r.task.is_finished())
    }

    /// True while a start is in progress and has not yet captured its baseline.
    pub async fn is_starting(&self) -> bool {
        self.inner.lock().await.start_in_progress().is_some()
    }

    /// Build and start a monitor, then hand it to a background task.
    /// Returns once the baseline has been captured.
    ///
    /// The lock is not held across the browser launch and login wait, so
    /// status queries and `stop` stay responsive. A `stop` issued meanwhile
    /// cancels the start and this returns [`ControlError::Cancelled`].
    pub async fn start(&self) -> Result<(), ControlError> {
        let (mut monitor, mut cancel) = {
            let mut inner = self.inner.lock().await;
            if inner.start_in_progress().is_some() {
                return Err(ControlError::AlreadyRunning);
            }
            if let Some(running) = &inner.running {
                if !running.task.is_finished() {
                    return Err(ControlError::AlreadyRunning);
                }
                inner.running = None;
            }

            let monitor = (self.factory)(&inner.config)?;
            let (cancel_tx, cancel_rx) = watch::channel(false);
            inner.starting = Some(cancel_tx);
            (monitor, cancel_rx)
        };

        let started = tokio::select! {
            res = monitor.start() => Some(res),
            _ = cancel.changed() => None,
        };

        let mut inner = self.inner.lock().await;
        inner.starting = None;
        let cancelled = *cancel.borrow();
        match started {
            Some(Ok(())) if !cancelled => {
                let (stop_tx, stop_rx) = watch::channel(false);
                let task = tokio::spawn(async move { monitor.run(stop_rx).await });
                inner.running = Some(RunningMonitor { stop_tx, task });
                info!("Monitor started");
                Ok(())
            }
            Some(Err(e)) => Err(e.into()),
            _ => {
                drop(inner);
                info!("Start cancelled");
                monitor.abort().await;
                Err(ControlError::Cancelled)
            }
        }
    }

    /// Signal the running monitor and wait for it to wind down. While a start
    /// is still in progress this cancels it instead and returns at once.
    pub async fn stop(&self) -> Result<(), ControlError> {
        let mut inner = self.inner.lock().await;
        if let Some(cancel) = inner.start_in_progress() {
            let _ = cancel.send(true);
            return Ok(());
        }
        let Some(running) = inner.running.take() else {
            return Err(ControlError::NotRunning);
        };
        drop(inner);

        let finished_early = running.task.is_finished();
        // A send error only means the task already dropped its receiver.
        let _ = running.stop_tx.send(true);

        match running.task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Monitor ended with error: {}", e),
            Err(e) => return Err(ControlError::Task(e.to_string())),
        }

        if finished_early {
            return Err(ControlError::NotRunning);
        }
        info!("Monitor stopped");
        Ok(())
    }

    /// Stop if running; used on process shutdown.
    pub async fn shutdown(&self) {
        match self.stop().await {
            Ok(()) | Err(ControlError::NotRunning) => {}
            Err(e) => warn!("Error during shutdown: {}", e),
        }
    }
}
