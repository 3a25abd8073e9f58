//! The poll loop.
//!
//! `Idle → Running → Stopped`. Starting opens the session and captures the
//! baseline; each tick sleeps, extracts, compares and notifies on change.
//! Everything that goes wrong inside a tick stays inside that tick.

use crate::backend::{Backend, BackendError};
use crate::config::ChatwatchConfig;
use crate::detector;
use crate::extraction::{Extraction, ExtractionStatus, ExtractorOptions, SnapshotExtractor};
use crate::notifier::{NotificationEvent, Notifier};
use crate::resolution::BackendDom;
use crate::session::{self, SessionSettings};
use crate::snapshot::ConversationSnapshot;
use crate::state::{PersistedState, StateStore};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub session: SessionSettings,
    pub interval: Duration,
    pub state_path: Option<std::path::PathBuf>,
    pub extractor: ExtractorOptions,
}

impl MonitorSettings {
    pub fn from_config(config: &ChatwatchConfig) -> Self {
        let watcher = &config.watcher;
        Self {
            session: SessionSettings {
                url: watcher.url.clone(),
                login_timeout: Duration::from_secs(watcher.login_timeout_secs),
                poll_every: Duration::from_secs(1),
                diagnostics_dir: watcher.diagnostics_dir.clone(),
                expected_phone: watcher.phone.clone(),
            },
            interval: Duration::from_secs(watcher.interval_secs.max(1)),
            state_path: Some(watcher.state_path.clone()),
            extractor: ExtractorOptions {
                diagnostic_sentinel: watcher.diagnostic_sentinel,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Running,
    Stopped,
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MonitorState::Idle => "idle",
            MonitorState::Running => "running",
            MonitorState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Cannot {action} a monitor that is {state}")]
    InvalidState {
        action: &'static str,
        state: MonitorState,
    },

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Unchanged,
    /// No baseline existed yet (the start-up capture failed); this tick set it.
    Baseline(ConversationSnapshot),
    Changed {
        event: NotificationEvent,
        delivered: bool,
    },
    /// Extraction failed; the baseline was left untouched.
    Skipped { reason: String },
}

pub struct Monitor {
    backend: Box<dyn Backend>,
    notifier: Arc<dyn Notifier>,
    settings: MonitorSettings,
    extractor: SnapshotExtractor,
    state: MonitorState,
    baseline: Option<ConversationSnapshot>,
    store: Option<StateStore>,
    persisted: PersistedState,
}

impl Monitor {
    pub fn new(
        backend: Box<dyn Backend>,
        notifier: Arc<dyn Notifier>,
        settings: MonitorSettings,
    ) -> Self {
        let extractor = SnapshotExtractor::new(settings.extractor);
        let store = settings.state_path.clone().map(StateStore::new);
        Self {
            backend,
            notifier,
            settings,
            extractor,
            state: MonitorState::Idle,
            baseline: None,
            store,
            persisted: PersistedState::default(),
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == MonitorState::Running
    }

    pub fn baseline(&self) -> Option<&ConversationSnapshot> {
        self.baseline.as_ref()
    }

    pub fn interval(&self) -> Duration {
        self.settings.interval
    }

    /// Launch the browser, open the session and capture the baseline.
    /// No notification is sent for the baseline.
    pub async fn start(&mut self) -> Result<(), MonitorError> {
        if self.state != MonitorState::Idle {
            return Err(MonitorError::InvalidState {
                action: "start",
                state: self.state,
            });
        }

        info!("Starting monitor for {}", self.settings.session.url);
        self.backend.launch().await?;

        if let Err(e) = session::open_session(self.backend.as_mut(), &self.settings.session).await
        {
            error!("Failed to open session: {}", e);
            if let Err(close_err) = self.backend.close().await {
                warn!("Error closing browser after failed start: {}", close_err);
            }
            return Err(e.into());
        }

        if let Some(store) = &self.store {
            match store.load().await {
                Ok(loaded) => {
                    debug!(
                        "Loaded state from {} ({} processed messages)",
                        store.path().display(),
                        loaded.processed_messages.len()
                    );
                    self.persisted = loaded;
                }
                Err(e) => warn!("Ignoring unreadable state file: {}", e),
            }
        }

        let extraction = self.capture().await;
        if extraction.is_degraded() {
            warn!("Baseline capture failed; the first successful tick becomes the baseline");
            self.baseline = None;
        } else {
            info!("Baseline: {}", extraction.snapshot);
            self.baseline = Some(extraction.snapshot);
        }

        self.state = MonitorState::Running;
        Ok(())
    }

    /// One comparison round (without the sleep).
    pub async fn tick(&mut self) -> Result<TickOutcome, MonitorError> {
        if self.state != MonitorState::Running {
            return Err(MonitorError::InvalidState {
                action: "tick",
                state: self.state,
            });
        }

        let extraction = self.capture().await;
        if let ExtractionStatus::Failed(reason) = extraction.status {
            warn!("Tick skipped: {}", reason);
            return Ok(TickOutcome::Skipped { reason });
        }
        let current = extraction.snapshot;

        let Some(baseline) = self.baseline.take() else {
            info!("Baseline: {}", current);
            self.baseline = Some(current.clone());
            return Ok(TickOutcome::Baseline(current));
        };

        if detector::equal(&baseline, &current) {
            debug!("No change: {}", current);
            self.baseline = Some(baseline);
            return Ok(TickOutcome::Unchanged);
        }

        info!(
            "Top conversations changed at rank(s) {:?}: [{}] -> [{}]",
            detector::changed_ranks(&baseline, &current)
                .iter()
                .map(|r| r + 1)
                .collect::<Vec<_>>(),
            baseline,
            current
        );

        let event = NotificationEvent::new(baseline, current.clone()).with_phones(extraction.phones);
        let delivered = match self.notifier.notify(&event).await {
            Ok(()) => {
                info!("Notification sent");
                true
            }
            Err(e) => {
                error!("Notification failed: {}", e);
                false
            }
        };

        // Delivery failures do not hold the baseline back.
        self.baseline = Some(current);
        Ok(TickOutcome::Changed { event, delivered })
    }

    /// Tick every interval until `stop` flips to `true` (or its sender goes away),
    /// then stop the monitor. A stop request never interrupts a tick in progress.
    pub async fn run(&mut self, mut stop: watch::Receiver<bool>) -> Result<(), MonitorError> {
        if self.state != MonitorState::Running {
            return Err(MonitorError::InvalidState {
                action: "run",
                state: self.state,
            });
        }

        info!("Polling every {}s", self.settings.interval.as_secs());
        loop {
            if *stop.borrow_and_update() {
                info!("Stop requested");
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(self.settings.interval) => {}
                changed = stop.changed() => {
                    if changed.is_err() {
                        info!("Stop channel closed");
                        break;
                    }
                    continue;
                }
            }
            self.tick().await?;
        }

        self.stop().await
    }

    /// Persist bookkeeping and release the browser.
    pub async fn stop(&mut self) -> Result<(), MonitorError> {
        if self.state == MonitorState::Stopped {
            return Err(MonitorError::InvalidState {
                action: "stop",
                state: self.state,
            });
        }

        info!("Stopping monitor");
        self.save_state().await;
        if let Err(e) = self.backend.close().await {
            warn!("Error closing browser: {}", e);
        }
        self.state = MonitorState::Stopped;
        Ok(())
    }

    /// Release the browser without touching the state file. Used when a
    /// start is abandoned before the baseline exists.
    pub async fn abort(&mut self) {
        if self.state == MonitorState::Stopped {
            return;
        }
        if let Err(e) = self.backend.close().await {
            warn!("Error closing browser: {}", e);
        }
        self.state = MonitorState::Stopped;
    }

    /// Write the state file (best-effort).
    pub async fn save_state(&mut self) {
        let Some(store) = &self.store else {
            return;
        };
        if let Some(baseline) = &self.baseline {
            self.persisted.record_baseline(baseline);
        }
        match store.save(&mut self.persisted).await {
            Ok(()) => debug!("Saved state to {}", store.path().display()),
            Err(e) => warn!("Failed to save state to {}: {}", store.path().display(), e),
        }
    }

    async fn capture(&mut self) -> Extraction {
        let mut dom = BackendDom::new(self.backend.as_mut());
        self.extractor.extract(&mut dom).await
    }
}
