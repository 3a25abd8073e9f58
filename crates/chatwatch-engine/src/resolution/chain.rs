//! Prioritized selector chains for the WhatsApp Web markup.
//!
//! The client's markup is unversioned and shifts without notice, so every
//! extraction site carries an ordered list of CSS queries. The first query
//! that matches anything wins; later entries are older or looser variants.

use std::fmt;

/// An immutable, ordered list of CSS queries tried until one matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectorChain {
    pub name: &'static str,
    pub selectors: &'static [&'static str],
}

impl SelectorChain {
    pub const fn new(name: &'static str, selectors: &'static [&'static str]) -> Self {
        Self { name, selectors }
    }

    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }
}

impl fmt::Display for SelectorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} selectors)", self.name, self.selectors.len())
    }
}

/// Rows of the chat list, in rendered (recency) order.
pub const CONVERSATION_LIST: SelectorChain = SelectorChain::new(
    "conversation-list",
    &[
        "#pane-side [role=\"listitem\"]",
        "#pane-side [role=\"row\"]",
        "[aria-label=\"Chat list\"] [role=\"listitem\"]",
        "div[data-testid=\"cell-frame-container\"]",
        "#pane-side > div > div > div > div",
    ],
);

/// Display-name label inside one conversation row.
pub const NAME_LABEL: SelectorChain = SelectorChain::new(
    "name-label",
    &[
        "[data-testid=\"cell-frame-title\"] span[title]",
        "span[dir=\"auto\"][title]",
        "span[title]",
        "[title]",
    ],
);

/// Text inside one conversation row that may carry a phone number.
pub const PHONE_NUMBER: SelectorChain = SelectorChain::new(
    "phone-number",
    &[
        "span[title^=\"+\"]",
        "[data-testid=\"cell-frame-title\"] span",
        "span[dir=\"auto\"]",
    ],
);

/// Present once the client has finished logging in and shows the chat list.
pub const LOGGED_IN_MARKER: SelectorChain = SelectorChain::new(
    "logged-in-marker",
    &[
        "#pane-side",
        "[aria-label=\"Chat list\"]",
        "[data-testid=\"chat-list\"]",
        "div[data-testid=\"chatlist-header\"]",
    ],
);

/// Present while the client waits for the QR-code pairing.
pub const QR_CODE_MARKER: SelectorChain = SelectorChain::new(
    "qr-code-marker",
    &[
        "canvas[aria-label=\"Scan me!\"]",
        "[data-testid=\"qrcode\"]",
        "div[data-ref] canvas",
    ],
);
