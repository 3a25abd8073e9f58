use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatwatchConfig {
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub watcher: WatcherConfig,
    #[serde(default)]
    pub email: EmailConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_headless")]
    pub headless: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chrome_bin: Option<PathBuf>,
    /// Persistent profile directory so the WhatsApp login survives restarts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data_dir: Option<PathBuf>,
    /// Use an external WebDriver server instead of launching Chromium.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default = "default_eval_timeout_ms")]
    pub eval_timeout_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            chrome_bin: None,
            user_data_dir: None,
            driver_url: None,
            user_agent: None,
            eval_timeout_ms: default_eval_timeout_ms(),
        }
    }
}

impl BrowserConfig {
    pub fn eval_timeout(&self) -> Duration {
        Duration::from_millis(self.eval_timeout_ms)
    }

    /// Profile directory to use, falling back to `~/.chatwatch/chromium-profile`.
    pub fn profile_dir(&self) -> Option<PathBuf> {
        self.user_data_dir.clone().or_else(|| {
            dirs::home_dir().map(|home| home.join(".chatwatch").join("chromium-profile"))
        })
    }
}

fn default_headless() -> bool {
    true
}

fn default_eval_timeout_ms() -> u64 {
    10000
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatcherConfig {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_login_timeout_secs")]
    pub login_timeout_secs: u64,
    #[serde(default = "default_diagnostics_dir")]
    pub diagnostics_dir: PathBuf,
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
    /// Phone number of the account expected to be logged in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub diagnostic_sentinel: bool,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            interval_secs: default_interval_secs(),
            login_timeout_secs: default_login_timeout_secs(),
            diagnostics_dir: default_diagnostics_dir(),
            state_path: default_state_path(),
            phone: None,
            diagnostic_sentinel: false,
        }
    }
}

fn default_url() -> String {
    "https://web.whatsapp.com".to_string()
}

fn default_interval_secs() -> u64 {
    5
}

fn default_login_timeout_secs() -> u64 {
    120
}

fn default_diagnostics_dir() -> PathBuf {
    PathBuf::from("./diagnostics")
}

fn default_state_path() -> PathBuf {
    PathBuf::from("./chatwatch-state.json")
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_from_name")]
    pub from_name: String,
    #[serde(default = "default_smtp_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            user: None,
            pass: None,
            to: None,
            smtp_host: default_smtp_host(),
            from_name: default_from_name(),
            timeout_secs: default_smtp_timeout_secs(),
        }
    }
}

impl fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailConfig")
            .field("user", &self.user)
            .field("pass", &self.pass.as_ref().map(|_| "***"))
            .field("to", &self.to)
            .field("smtp_host", &self.smtp_host)
            .field("from_name", &self.from_name)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}

fn default_from_name() -> String {
    "WhatsApp Monitor".to_string()
}

fn default_smtp_timeout_secs() -> u64 {
    30
}

/// Fully specified mail settings; only constructed once every required value is present.
#[derive(Clone, PartialEq)]
pub struct MailSettings {
    pub user: String,
    pub pass: String,
    pub to: String,
    pub smtp_host: String,
    pub from_name: String,
    pub timeout: Duration,
}

impl fmt::Debug for MailSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailSettings")
            .field("user", &self.user)
            .field("pass", &"***")
            .field("to", &self.to)
            .field("smtp_host", &self.smtp_host)
            .field("from_name", &self.from_name)
            .field("timeout", &self.timeout)
            .finish()
    }
}
