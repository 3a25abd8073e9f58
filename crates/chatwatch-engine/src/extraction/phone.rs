//! Best-effort phone number spotting in conversation rows.
//!
//! Unsaved contacts show up by number instead of name. Anything that looks
//! like an international number is surfaced as a hint; there is no guarantee
//! the match is a real number.

use regex::Regex;
use std::sync::LazyLock;

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+?\(?\d[\d\s().-]{6,}\d").unwrap());

const MIN_DIGITS: usize = 8;
const MAX_DIGITS: usize = 15;

/// First phone-like run in `text`, normalized to an optional `+` followed by digits.
pub fn find_phone(text: &str) -> Option<String> {
    PHONE_RE.find_iter(text).find_map(|m| normalize(m.as_str()))
}

fn normalize(candidate: &str) -> Option<String> {
    let digits: String = candidate.chars().filter(char::is_ascii_digit).collect();
    if !(MIN_DIGITS..=MAX_DIGITS).contains(&digits.len()) {
        return None;
    }
    if candidate.trim_start().starts_with('+') {
        Some(format!("+{}", digits))
    } else {
        Some(digits)
    }
}
