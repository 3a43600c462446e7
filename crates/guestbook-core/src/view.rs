//! Client views and entry rendering.
//!
//! Every user-supplied text field is HTML-escaped before it is placed in
//! markup. The signature only ever appears as an `<img src>` and only when
//! it is an image data URI.

use chrono::DateTime;

use crate::entry::{Entry, SIGNATURE_PREFIX};
use crate::gate::AccessKind;

/// The screen the client is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Home,
    WritePasswordPrompt,
    ReadPasswordPrompt,
    Write,
    Read,
}

impl View {
    /// Which secret the current prompt asks for, if this is a prompt.
    #[must_use]
    pub const fn prompt_kind(self) -> Option<AccessKind> {
        match self {
            Self::WritePasswordPrompt => Some(AccessKind::Write),
            Self::ReadPasswordPrompt => Some(AccessKind::Read),
            Self::Home | Self::Write | Self::Read => None,
        }
    }

    /// The view a verified password of `kind` unlocks.
    #[must_use]
    pub const fn unlocked_by(kind: AccessKind) -> Self {
        match kind {
            AccessKind::Write => Self::Write,
            AccessKind::Read => Self::Read,
        }
    }
}

/// Escape `& < > " '` for safe inclusion in HTML text or attributes.
#[must_use]
pub fn escape_html(unsafe_text: &str) -> String {
    let mut out = String::with_capacity(unsafe_text.len());
    for c in unsafe_text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            other => out.push(other),
        }
    }
    out
}

/// Human-readable form of an entry date; unparseable dates are shown as given.
fn display_date(date: &str) -> String {
    DateTime::parse_from_rfc3339(date).map_or_else(
        |_| date.to_owned(),
        |d| d.format("%Y-%m-%d %H:%M:%S %Z").to_string(),
    )
}

/// Render a single entry card.
#[must_use]
pub fn render_entry(entry: &Entry) -> String {
    let signature = if entry.signature.starts_with(SIGNATURE_PREFIX) {
        format!(
            "<img src=\"{}\" alt=\"Signature\" class=\"signature\">",
            escape_html(&entry.signature)
        )
    } else {
        String::new()
    };

    format!(
        "<div class=\"entry\"><h3>{}</h3><p>{}</p>{}<p class=\"date\">Signed on: {}</p></div>",
        escape_html(&entry.name),
        escape_html(&entry.message),
        signature,
        escape_html(&display_date(&entry.date)),
    )
}

/// Render the entry list, or the empty-state message.
#[must_use]
pub fn render_entries(entries: &[Entry]) -> String {
    if entries.is_empty() {
        return "<p class=\"no-entries\">No entries found</p>".to_owned();
    }
    entries.iter().map(render_entry).collect()
}
