//! Text filters used when picking a conversation label.

use regex::Regex;
use std::sync::LazyLock;

static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,2}:\d{2}(\s?[AaPp][Mm])?$").unwrap());

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(https?://|www\.)\S").unwrap());

/// Exclusive bounds on the trimmed length (in characters) of a usable label.
pub const MIN_LABEL_LEN: usize = 1;
pub const MAX_LABEL_LEN: usize = 50;

pub fn has_label_length(text: &str) -> bool {
    let len = text.chars().count();
    len > MIN_LABEL_LEN && len < MAX_LABEL_LEN
}

/// `HH:MM` timestamps as rendered next to each chat (optionally with AM/PM).
pub fn is_time_like(text: &str) -> bool {
    TIME_RE.is_match(text)
}

pub fn contains_url(text: &str) -> bool {
    URL_RE.is_match(text)
}

/// Trimmed `title` attribute value, if it is usable as a display name.
pub fn title_label(title: Option<&str>) -> Option<&str> {
    let title = title?.trim();
    has_label_length(title).then_some(title)
}

/// Trimmed text node value, if it is usable as a display name.
pub fn text_label(text: &str) -> Option<&str> {
    let text = text.trim();
    (has_label_length(text) && !is_time_like(text) && !contains_url(text)).then_some(text)
}
