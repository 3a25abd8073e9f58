/// In-page DOM helper injected by backends before issuing `DomRequest`s.
/// Installs `window.ChatWatch` once per document.
pub const DOM_JS: &str = include_str!("dom.js");

/// Expression that evaluates to `true` when the helper is installed.
pub const PROBE_JS: &str = "typeof window.ChatWatch !== 'undefined'";
