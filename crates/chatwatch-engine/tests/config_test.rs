use chatwatch_engine::config::{ChatwatchConfig, ConfigError, ConfigLoader};
use chatwatch_engine::monitor::MonitorSettings;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| map.get(key).cloned()
}

#[test]
fn defaults_match_documented_values() {
    let config = ChatwatchConfig::default();
    assert!(config.browser.headless);
    assert_eq!(config.watcher.url, "https://web.whatsapp.com");
    assert_eq!(config.watcher.interval_secs, 5);
    assert_eq!(config.email.smtp_host, "smtp.gmail.com");
    assert_eq!(config.email.from_name, "WhatsApp Monitor");
    assert_eq!(config.browser.eval_timeout(), Duration::from_secs(10));
}

#[test]
fn partial_yaml_fills_in_defaults() {
    let yaml = r#"
watcher:
  interval_secs: 30
  phone: "+15550001111"
email:
  to: ops@example.com
"#;
    let config: ChatwatchConfig = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.watcher.interval_secs, 30);
    assert_eq!(config.watcher.phone.as_deref(), Some("+15550001111"));
    assert_eq!(config.watcher.login_timeout_secs, 120);
    assert_eq!(config.email.to.as_deref(), Some("ops@example.com"));
    assert!(config.browser.headless);
}

#[test]
fn environment_overrides_file_values() {
    let mut config = ChatwatchConfig::default();
    config.email.to = Some("file@example.com".into());

    config
        .apply_env_from(env(&[
            ("EMAIL_USER", "bot@example.com"),
            ("EMAIL_PASS", "app-password"),
            ("EMAIL_TO", "me@example.com"),
            ("HEADLESS", "false"),
            ("WHATSAPP_PHONE", "+447700900123"),
            ("CHATWATCH_USER_DATA_DIR", "/tmp/profile"),
        ]))
        .unwrap();

    assert_eq!(config.email.user.as_deref(), Some("bot@example.com"));
    assert_eq!(config.email.to.as_deref(), Some("me@example.com"));
    assert!(!config.browser.headless);
    assert_eq!(config.watcher.phone.as_deref(), Some("+447700900123"));
    assert_eq!(
        config.browser.profile_dir(),
        Some(PathBuf::from("/tmp/profile"))
    );
}

#[test]
fn empty_environment_values_are_ignored() {
    let mut config = ChatwatchConfig::default();
    config.email.user = Some("kept@example.com".into());
    config
        .apply_env_from(env(&[("EMAIL_USER", "  "), ("HEADLESS", "")]))
        .unwrap();
    assert_eq!(config.email.user.as_deref(), Some("kept@example.com"));
    assert!(config.browser.headless);
}

#[test]
fn bad_headless_value_is_rejected() {
    let mut config = ChatwatchConfig::default();
    let err = config
        .apply_env_from(env(&[("HEADLESS", "sometimes")]))
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { key: "HEADLESS", .. }));
}

#[test]
fn mail_settings_list_every_missing_value() {
    let mut config = ChatwatchConfig::default();
    config.email.to = Some("me@example.com".into());

    match config.mail_settings() {
        Err(ConfigError::MissingEmail(missing)) => {
            assert_eq!(missing, vec!["EMAIL_USER", "EMAIL_PASS"]);
        }
        other => panic!("expected missing email settings, got {:?}", other),
    }

    config.email.user = Some("bot@example.com".into());
    config.email.pass = Some("secret".into());
    let mail = config.mail_settings().unwrap();
    assert_eq!(mail.smtp_host, "smtp.gmail.com");
    assert_eq!(mail.timeout, Duration::from_secs(30));
}

#[test]
fn debug_output_masks_the_password() {
    let mut config = ChatwatchConfig::default();
    config.email.user = Some("bot@example.com".into());
    config.email.pass = Some("hunter2".into());
    config.email.to = Some("me@example.com".into());

    assert!(!format!("{:?}", config).contains("hunter2"));
    assert!(!format!("{:?}", config.mail_settings().unwrap()).contains("hunter2"));
}

#[test]
fn monitor_settings_follow_the_config() {
    let mut config = ChatwatchConfig::default();
    config.watcher.interval_secs = 0;
    config.watcher.login_timeout_secs = 45;
    config.watcher.diagnostic_sentinel = true;

    let settings = MonitorSettings::from_config(&config);
    assert_eq!(settings.interval, Duration::from_secs(1));
    assert_eq!(settings.session.login_timeout, Duration::from_secs(45));
    assert!(settings.extractor.diagnostic_sentinel);
}

#[tokio::test]
async fn save_and_reload_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("conf").join("chatwatch.yaml");

    assert_eq!(
        ConfigLoader::load_or_default(&path).await.unwrap(),
        ChatwatchConfig::default()
    );

    let mut config = ChatwatchConfig::default();
    config.watcher.phone = Some("+15550001111".into());
    config.email.to = Some("me@example.com".into());
    ConfigLoader::save_to(&path, &config).await.unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(!raw.contains("pass"));

    let loaded = ConfigLoader::load_or_default(&path).await.unwrap();
    assert_eq!(loaded, config);
}

#[tokio::test]
async fn malformed_yaml_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chatwatch.yaml");
    std::fs::write(&path, "watcher: [unclosed").unwrap();

    let err = ConfigLoader::load_from(&path).await.unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}
