//! Names and starting content for new notes.

use chrono::{Local, NaiveDateTime};

use crate::settings::StickyNoteSettings;
use crate::vault::NotePath;

const FALLBACK_PREFIX: &str = "Sticky_";

/// Current local wall-clock time.
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// `{prefix}{YYYY-MM-DD}_{HH-MM-SS}`. An empty prefix falls back to
/// `Sticky_`.
pub fn note_name(prefix: &str, at: &NaiveDateTime) -> String {
    let prefix = if prefix.is_empty() {
        FALLBACK_PREFIX
    } else {
        prefix
    };
    format!("{prefix}{}", at.format("%Y-%m-%d_%H-%M-%S"))
}

/// Markdown file for `name` inside `folder`.
pub fn note_path(folder: &str, name: &str) -> NotePath {
    NotePath::join(folder, &format!("{name}.md"))
}

/// Heading, optional creation stamp and optional template body.
pub fn initial_content(name: &str, settings: &StickyNoteSettings, at: &NaiveDateTime) -> String {
    let mut content = format!("# {name}\n\n");
    if settings.include_timestamp {
        content.push_str(&format!("Created: {}\n\n", at.format("%Y-%m-%d %H:%M:%S")));
    }
    if settings.include_template {
        content.push_str(&settings.default_content);
    }
    content
}
