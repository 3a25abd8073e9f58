//! Subject and HTML body for a change notification.
//!
//! Both are pure functions of the event so the same change always renders
//! the same message.

use chatwatch_engine::notifier::NotificationEvent;
use chatwatch_engine::snapshot::ConversationSnapshot;
use chrono::{TimeZone, Utc};
use std::fmt::Write;

const EMPTY_SLOT: &str = "(none)";

pub fn render_subject(event: &NotificationEvent) -> String {
    let top = event.current.top();
    let top = if top.is_empty() { EMPTY_SLOT } else { top };
    format!("WhatsApp: recent chats changed ({})", top)
}

pub fn render_html(event: &NotificationEvent) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html><body style=\"font-family: sans-serif;\">\n");
    html.push_str("<h2>Your most recent WhatsApp chats changed</h2>\n");

    html.push_str("<ol>\n");
    for (rank, name) in event.current.names().iter().enumerate() {
        let _ = write!(html, "<li><strong>{}</strong>", slot(name));
        if let Some(phone) = &event.phones[rank] {
            let _ = write!(html, " <span style=\"color:#555;\">{}</span>", escape_html(phone));
        }
        html.push_str("</li>\n");
    }
    html.push_str("</ol>\n");

    if !event.previous.is_blank() {
        html.push_str("<p>Previously:</p>\n");
        html.push_str(&ranked_list(&event.previous));
    }

    let _ = writeln!(
        html,
        "<p style=\"color:#888;\">Detected at {}</p>",
        event.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    );
    html.push_str("</body></html>\n");
    html
}

fn ranked_list(snapshot: &ConversationSnapshot) -> String {
    let mut out = String::from("<ol>\n");
    for name in snapshot.names() {
        let _ = writeln!(out, "<li>{}</li>", slot(name));
    }
    out.push_str("</ol>\n");
    out
}

fn slot(name: &str) -> String {
    if name.is_empty() {
        EMPTY_SLOT.to_string()
    } else {
        escape_html(name)
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Fixed event used by the `test-email` command.
pub fn sample_event() -> NotificationEvent {
    let timestamp = Utc
        .with_ymd_and_hms(2024, 1, 1, 12, 0, 0)
        .single()
        .unwrap_or_else(Utc::now);
    NotificationEvent::new(
        ConversationSnapshot::from_ranked(["Alice", "Bob", "Carol"]),
        ConversationSnapshot::from_ranked(["Dave", "Alice", "Bob"]),
    )
    .with_phones([Some("+15550001111".to_string()), None, None])
    .with_timestamp(timestamp)
}
