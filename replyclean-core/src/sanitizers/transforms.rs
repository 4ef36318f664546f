// File: replyclean-core/src/sanitizers/transforms.rs
//! Programmatic replacements for rules whose output cannot be expressed as a
//! regex template.
//!
//! A rule opts in by naming a [`TransformKind`] in its `transform` field. The
//! functions here receive the match captures and return the replacement.
//!
//! Several transforms hide Markdown marker characters behind placeholders so
//! later rules cannot treat them as syntax. A placeholder is the lead
//! character U+E000 followed by the marker's slot in U+E100..U+E10C; the
//! `restore_escapes` transform turns each one back into its marker.
//!
//! License: MIT OR APACHE 2.0

use regex::Captures;

use crate::config::TransformKind;

/// Marker characters that can be protected, in placeholder slot order.
pub const MARKERS: [char; 13] = ['*', '_', '`', '~', '[', ']', '(', ')', '#', '>', '!', '|', '<'];

const PLACEHOLDERS: [char; 13] = [
    '\u{E100}', '\u{E101}', '\u{E102}', '\u{E103}', '\u{E104}', '\u{E105}', '\u{E106}',
    '\u{E107}', '\u{E108}', '\u{E109}', '\u{E10A}', '\u{E10B}', '\u{E10C}',
];

/// Leads every placeholder.
pub const PLACEHOLDER_LEAD: char = '\u{E000}';

/// Dispatches to the transform named by `kind`.
///
/// `haystack` is the full text the captures were taken from.
pub fn apply(kind: TransformKind, caps: &Captures<'_>, haystack: &str) -> String {
    match kind {
        TransformKind::ProtectEscapes => protect_escape(caps),
        TransformKind::InlineCode => inline_code(caps),
        TransformKind::Link => link(caps),
        TransformKind::ProtectUrl => protect_url(caps),
        TransformKind::TableRow => table_row(caps),
        TransformKind::UnderscoreEmphasis => underscore_emphasis(caps, haystack),
        TransformKind::RestoreEscapes => restore_escape(caps),
    }
}

fn whole<'h>(caps: &Captures<'h>) -> &'h str {
    caps.get(0).map_or("", |m| m.as_str())
}

fn group<'h>(caps: &Captures<'h>, name: &str) -> Option<&'h str> {
    caps.name(name).map(|m| m.as_str())
}

fn push_placeholder(out: &mut String, c: char) -> bool {
    match MARKERS.iter().position(|&m| m == c) {
        Some(slot) => {
            out.push(PLACEHOLDER_LEAD);
            out.push(PLACEHOLDERS[slot]);
            true
        }
        None => false,
    }
}

/// Replaces every marker character in `s` with its placeholder.
pub fn mask_markers(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if !push_placeholder(&mut out, c) {
            out.push(c);
        }
    }
    out
}

/// `\*` and friends: group 1 is the escaped marker.
fn protect_escape(caps: &Captures<'_>) -> String {
    let marker = caps.get(1).and_then(|m| m.as_str().chars().next());
    let mut out = String::new();
    match marker {
        Some(c) if push_placeholder(&mut out, c) => out,
        _ => whole(caps).to_string(),
    }
}

/// Code span content is verbatim, so an escape inside it keeps its backslash.
fn inline_code(caps: &Captures<'_>) -> String {
    let content = group(caps, "triple")
        .or_else(|| group(caps, "double"))
        .or_else(|| group(caps, "single"))
        .unwrap_or("");

    let mut out = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();
    while let Some(c) = chars.next() {
        if c == PLACEHOLDER_LEAD {
            let slot = chars.peek().and_then(|p| PLACEHOLDERS.iter().position(|q| q == p));
            if let Some(slot) = slot {
                chars.next();
                out.push('\\');
                push_placeholder(&mut out, MARKERS[slot]);
                continue;
            }
        }
        if !push_placeholder(&mut out, c) {
            out.push(c);
        }
    }
    out
}

/// Links and images.
///
/// Images reduce to their URL. Links become `text (url)`, or just the URL
/// when the text is empty or repeats it; a link without a URL keeps its text.
fn link(caps: &Captures<'_>) -> String {
    let text = group(caps, "text").unwrap_or("").trim();
    let url = group(caps, "url").unwrap_or("").trim();

    if whole(caps).starts_with('!') {
        return mask_markers(url);
    }
    if url.is_empty() {
        return text.to_string();
    }
    if text.is_empty() || text == url {
        return mask_markers(url);
    }
    format!("{} ({})", text, mask_markers(url))
}

fn protect_url(caps: &Captures<'_>) -> String {
    mask_markers(group(caps, "url").unwrap_or_else(|| whole(caps)))
}

/// A delimiter row contains only pipes, dashes, colons and spaces.
pub fn is_separator_row(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.contains('-')
        && trimmed
            .chars()
            .all(|c| c == '|' || c == '-' || c == ':' || c.is_whitespace())
}

fn table_row(caps: &Captures<'_>) -> String {
    let line = whole(caps);
    let newline = if line.ends_with('\n') { "\n" } else { "" };
    let body = line.trim();

    if is_separator_row(body) {
        return String::new();
    }

    let inner = body.strip_prefix('|').unwrap_or(body);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    format!("{}{}", inner.replace('|', " "), newline)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// `_x_` and `__x__` only count when the closing delimiter is not followed
/// by a word character, so identifiers like `snake_case_name` are content.
fn underscore_emphasis(caps: &Captures<'_>, haystack: &str) -> String {
    let end = caps.get(0).map_or(0, |m| m.end());
    let followed_by_word = haystack
        .get(end..)
        .and_then(|rest| rest.chars().next())
        .is_some_and(is_word_char);
    if followed_by_word {
        return whole(caps).to_string();
    }
    format!(
        "{}{}",
        group(caps, "pre").unwrap_or(""),
        group(caps, "inner").unwrap_or("")
    )
}

fn restore_escape(caps: &Captures<'_>) -> String {
    let placeholder = group(caps, "marker").and_then(|m| m.chars().next());
    match placeholder.and_then(|p| PLACEHOLDERS.iter().position(|&c| c == p)) {
        Some(slot) => MARKERS[slot].to_string(),
        None => whole(caps).to_string(),
    }
}
