mod common;

use chatwatch_engine::config::ChatwatchConfig;
use chatwatch_engine::control::{ControlError, MonitorController};
use chatwatch_engine::monitor::{Monitor, MonitorSettings};
use common::{FakePage, RecordingNotifier};
use std::sync::Arc;
use std::time::Duration;

fn controller(
    page: &FakePage,
    notifier: &RecordingNotifier,
    dir: &std::path::Path,
) -> MonitorController {
    let mut config = ChatwatchConfig::default();
    config.watcher.state_path = dir.join("state.json");
    config.watcher.diagnostics_dir = dir.join("diagnostics");

    let page = page.clone();
    let notifier = notifier.clone();
    MonitorController::new(
        config,
        Box::new(move |config: &ChatwatchConfig| -> Result<Monitor, ControlError> {
            Ok(Monitor::new(
                page.boxed(),
                Arc::new(notifier.clone()),
                MonitorSettings::from_config(config),
            ))
        }),
    )
}

#[tokio::test]
async fn start_stop_and_status() {
    let dir = tempfile::tempdir().unwrap();
    let page = FakePage::with_chats(&["Alice"]);
    let notifier = RecordingNotifier::default();
    let control = controller(&page, &notifier, dir.path());

    assert!(!control.is_running().await);
    control.start().await.unwrap();
    assert!(control.is_running().await);

    assert!(matches!(
        control.start().await,
        Err(ControlError::AlreadyRunning)
    ));

    control.stop().await.unwrap();
    assert!(!control.is_running().await);
    assert_eq!(page.closes(), 1);

    assert!(matches!(control.stop().await, Err(ControlError::NotRunning)));
}

#[tokio::test]
async fn restart_builds_a_fresh_monitor() {
    let dir = tempfile::tempdir().unwrap();
    let page = FakePage::with_chats(&["Alice"]);
    let notifier = RecordingNotifier::default();
    let control = controller(&page, &notifier, dir.path());

    control.start().await.unwrap();
    control.stop().await.unwrap();
    control
        .update_config(|c| c.watcher.phone = Some("+15550001111".into()))
        .await;
    control.start().await.unwrap();

    assert_eq!(page.launches(), 2);
    assert_eq!(
        control.config().await.watcher.phone.as_deref(),
        Some("+15550001111")
    );
    control.shutdown().await;
    assert!(!control.is_running().await);
}

#[tokio::test]
async fn status_and_stop_answer_while_waiting_for_login() {
    let dir = tempfile::tempdir().unwrap();
    let page = FakePage::with_chats(&["Alice"]);
    page.update(|s| s.logged_in = false);
    let notifier = RecordingNotifier::default();
    let control = Arc::new(controller(&page, &notifier, dir.path()));
    control
        .update_config(|c| c.watcher.login_timeout_secs = 60)
        .await;

    let starting = tokio::spawn({
        let control = control.clone();
        async move { control.start().await }
    });
    for _ in 0..200 {
        if page.launches() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(control.is_starting().await);

    let running = tokio::time::timeout(Duration::from_secs(1), control.is_running())
        .await
        .expect("is_running blocked behind the start");
    assert!(!running);
    assert!(matches!(
        control.start().await,
        Err(ControlError::AlreadyRunning)
    ));

    tokio::time::timeout(Duration::from_secs(1), control.stop())
        .await
        .expect("stop blocked behind the start")
        .unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), starting)
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(result, Err(ControlError::Cancelled)));
    assert!(!control.is_starting().await);
    assert!(!control.is_running().await);
    assert_eq!(page.closes(), 1);
    assert!(!dir.path().join("state.json").exists());
}

#[tokio::test]
async fn abandoned_start_does_not_block_the_next_one() {
    let dir = tempfile::tempdir().unwrap();
    let page = FakePage::with_chats(&["Alice"]);
    page.update(|s| s.logged_in = false);
    let control = controller(&page, &RecordingNotifier::default(), dir.path());
    control
        .update_config(|c| c.watcher.login_timeout_secs = 60)
        .await;

    let abandoned = tokio::time::timeout(Duration::from_millis(200), control.start()).await;
    assert!(abandoned.is_err());
    assert!(!control.is_starting().await);
    assert!(matches!(control.stop().await, Err(ControlError::NotRunning)));

    page.update(|s| s.logged_in = true);
    control.start().await.unwrap();
    assert!(control.is_running().await);
    control.shutdown().await;
}

#[tokio::test]
async fn failed_start_is_reported_and_leaves_it_stopped() {
    let dir = tempfile::tempdir().unwrap();
    let page = FakePage::with_chats(&["Alice"]);
    page.update(|s| s.fail_navigate = true);
    let notifier = RecordingNotifier::default();
    let control = controller(&page, &notifier, dir.path());

    assert!(matches!(control.start().await, Err(ControlError::Monitor(_))));
    assert!(!control.is_running().await);
}

#[tokio::test]
async fn factory_errors_surface_to_the_caller() {
    let control = MonitorController::new(
        ChatwatchConfig::default(),
        Box::new(|config: &ChatwatchConfig| -> Result<Monitor, ControlError> {
            config.mail_settings()?;
            unreachable!("default config has no mail credentials")
        }),
    );

    match control.start().await {
        Err(ControlError::Config(e)) => assert!(e.to_string().contains("EMAIL_USER")),
        other => panic!("expected a config error, got {:?}", other.err()),
    }
}

#[tokio::test]
async fn shutdown_when_idle_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let page = FakePage::default();
    let control = controller(&page, &RecordingNotifier::default(), dir.path());
    control.shutdown().await;
    assert_eq!(page.closes(), 0);
}
