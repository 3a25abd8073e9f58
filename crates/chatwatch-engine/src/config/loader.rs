use super::schema::{ChatwatchConfig, MailSettings};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },
    #[error("Missing required email settings: {}", .0.join(", "))]
    MissingEmail(Vec<&'static str>),
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Candidate locations, in priority order:
    /// 1. ./chatwatch.yaml
    /// 2. ~/.chatwatch/config.yaml
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("./chatwatch.yaml")];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".chatwatch").join("config.yaml"));
        }
        paths
    }

    /// First existing config file, if any.
    pub fn locate() -> Option<PathBuf> {
        Self::search_paths().into_iter().find(|p| p.exists())
    }

    /// Load from the first existing default location, or defaults.
    pub async fn load_default() -> Result<ChatwatchConfig, ConfigError> {
        match Self::locate() {
            Some(path) => Self::load_from(&path).await,
            None => Ok(ChatwatchConfig::default()),
        }
    }

    /// Load `path` if it exists, defaults otherwise.
    pub async fn load_or_default(path: &Path) -> Result<ChatwatchConfig, ConfigError> {
        if tokio::fs::try_exists(path).await? {
            Self::load_from(path).await
        } else {
            Ok(ChatwatchConfig::default())
        }
    }

    pub async fn load_from(path: &Path) -> Result<ChatwatchConfig, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: ChatwatchConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub async fn save_to(path: &Path, config: &ChatwatchConfig) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_yaml::to_string(config)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

/// Environment variables recognized on top of the config file.
pub const ENV_KEYS: &[&str] = &[
    "EMAIL_USER",
    "EMAIL_PASS",
    "EMAIL_TO",
    "HEADLESS",
    "WHATSAPP_PHONE",
    "SMTP_HOST",
    "CHROME_BIN",
    "CHATWATCH_USER_DATA_DIR",
];

impl ChatwatchConfig {
    /// Overlay values from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Overlay values from an arbitrary key lookup. Empty values are ignored.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("EMAIL_USER") {
            self.email.user = Some(v);
        }
        if let Some(v) = get("EMAIL_PASS") {
            self.email.pass = Some(v);
        }
        if let Some(v) = get("EMAIL_TO") {
            self.email.to = Some(v);
        }
        if let Some(v) = get("SMTP_HOST") {
            self.email.smtp_host = v;
        }
        if let Some(v) = get("HEADLESS") {
            self.browser.headless = parse_bool("HEADLESS", &v)?;
        }
        if let Some(v) = get("WHATSAPP_PHONE") {
            self.watcher.phone = Some(v);
        }
        if let Some(v) = get("CHROME_BIN") {
            self.browser.chrome_bin = Some(PathBuf::from(v));
        }
        if let Some(v) = get("CHATWATCH_USER_DATA_DIR") {
            self.browser.user_data_dir = Some(PathBuf::from(v));
        }
        Ok(())
    }

    /// Mail settings, or the list of missing mandatory values.
    pub fn mail_settings(&self) -> Result<MailSettings, ConfigError> {
        let email = &self.email;
        let mut missing = Vec::new();
        if email.user.as_deref().is_none_or(str::is_empty) {
            missing.push("EMAIL_USER");
        }
        if email.pass.as_deref().is_none_or(str::is_empty) {
            missing.push("EMAIL_PASS");
        }
        if email.to.as_deref().is_none_or(str::is_empty) {
            missing.push("EMAIL_TO");
        }
        if !missing.is_empty() {
            return Err(ConfigError::MissingEmail(missing));
        }

        Ok(MailSettings {
            user: email.user.clone().unwrap_or_default(),
            pass: email.pass.clone().unwrap_or_default(),
            to: email.to.clone().unwrap_or_default(),
            smtp_host: email.smtp_host.clone(),
            from_name: email.from_name.clone(),
            timeout: Duration::from_secs(email.timeout_secs),
        })
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}
