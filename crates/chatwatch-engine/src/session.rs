//! Opening the WhatsApp Web session.
//!
//! Login is best-effort: the flow waits for the chat list to appear, tells
//! the operator when a QR code needs scanning, and on timeout saves a
//! screenshot for inspection and carries on anyway. Only a failed navigation
//! aborts startup.

use crate::backend::{Backend, BackendError};
use crate::resolution::chain::{LOGGED_IN_MARKER, QR_CODE_MARKER};
use crate::resolution::{BackendDom, resolve};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub url: String,
    pub login_timeout: Duration,
    pub poll_every: Duration,
    pub diagnostics_dir: PathBuf,
    pub expected_phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    LoggedIn { waited: Duration },
    /// The chat list never showed up; the screenshot path is set when one was saved.
    TimedOut { screenshot: Option<PathBuf> },
}

pub async fn open_session<B: Backend + ?Sized>(
    backend: &mut B,
    settings: &SessionSettings,
) -> Result<LoginOutcome, BackendError> {
    if let Some(phone) = &settings.expected_phone {
        info!("Expecting WhatsApp account {}", phone);
    }

    let nav = backend.navigate(&settings.url).await?;
    info!("Opened {} ({})", nav.url, nav.title);

    let started = Instant::now();
    let deadline = started + settings.login_timeout;
    let mut qr_reported = false;

    loop {
        let mut dom = BackendDom::new(&mut *backend);
        match resolve(&mut dom, &LOGGED_IN_MARKER, None).await {
            Ok(found) if found.is_found() => {
                let waited = started.elapsed();
                info!("Logged in after {:.1}s", waited.as_secs_f64());
                return Ok(LoginOutcome::LoggedIn { waited });
            }
            Ok(_) => {}
            // The page is still loading or navigating; try again next round.
            Err(e) => debug!("Login check failed: {}", e),
        }

        if !qr_reported
            && let Ok(qr) = resolve(&mut dom, &QR_CODE_MARKER, None).await
            && qr.is_found()
        {
            warn!("WhatsApp Web is showing a QR code; scan it with your phone to log in");
            qr_reported = true;
        }

        if Instant::now() + settings.poll_every > deadline {
            break;
        }
        tokio::time::sleep(settings.poll_every).await;
    }

    warn!(
        "Login not confirmed within {}s; continuing anyway",
        settings.login_timeout.as_secs()
    );
    let screenshot = capture_diagnostics(backend, &settings.diagnostics_dir, "login-timeout").await;
    Ok(LoginOutcome::TimedOut { screenshot })
}

/// Save a screenshot into `dir`. Failures are logged and swallowed.
pub async fn capture_diagnostics<B: Backend + ?Sized>(
    backend: &mut B,
    dir: &Path,
    label: &str,
) -> Option<PathBuf> {
    let bytes = match backend.screenshot().await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Could not capture diagnostic screenshot: {}", e);
            return None;
        }
    };

    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S");
    let path = dir.join(format!("{}-{}.png", label, stamp));
    let written = async {
        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(&path, &bytes).await
    }
    .await;

    match written {
        Ok(()) => {
            info!("Saved diagnostic screenshot to {}", path.display());
            Some(path)
        }
        Err(e) => {
            warn!("Could not write {}: {}", path.display(), e);
            None
        }
    }
}
