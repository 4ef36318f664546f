// replyclean-core/src/metadata.rs
//! Transcript-stamp stripping.
//!
//! Prompts sent to the model prefix each turn with `[<timestamp>] <speaker>: `
//! so the model can tell speakers apart. Models sometimes echo that prefix at
//! the start of their reply. This module removes it once, and only at the
//! very start of the text; a stamp anywhere else is content.

use chrono::{DateTime, FixedOffset};
use log::debug;
use serde::Serialize;

use crate::config::Stage;
use crate::sanitizers::compiler::PatternTable;

/// A stamp removed from the start of a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptStamp {
    /// The parsed timestamp, when the rule captures one.
    pub timestamp: Option<DateTime<FixedOffset>>,
    /// The speaker label, trimmed.
    pub speaker: String,
}

/// Parses a captured stamp timestamp.
///
/// The matcher accepts a space or lowercase `t`/`z` where RFC 3339 wants
/// `T`/`Z`; those are normalized before handing the value to chrono.
fn parse_stamp_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let normalized = raw.replace([' ', 't'], "T").replace('z', "Z");
    DateTime::parse_from_rfc3339(&normalized).ok()
}

/// Removes a leading transcript stamp and the whitespace after it.
///
/// Returns the remaining text and the stamp, or the input unchanged and
/// `None`. A bracketed prefix whose timestamp does not parse is not a stamp.
pub fn strip_metadata_prefix<'t>(
    table: &PatternTable,
    text: &'t str,
) -> (&'t str, Option<TranscriptStamp>) {
    for rule in table.stage_rules(Stage::Metadata) {
        let Some(caps) = rule.regex.captures(text) else {
            continue;
        };
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if whole.start() != 0 {
            continue;
        }

        let timestamp = match caps.name("timestamp") {
            Some(raw) => match parse_stamp_timestamp(raw.as_str()) {
                Some(ts) => Some(ts),
                None => {
                    debug!(
                        "Rule '{}' matched a prefix with an invalid timestamp; keeping it as content.",
                        rule.name
                    );
                    continue;
                }
            },
            None => None,
        };
        let speaker = caps
            .name("speaker")
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();

        debug!("Stripped transcript stamp via rule '{}' ({} bytes).", rule.name, whole.end());
        return (&text[whole.end()..], Some(TranscriptStamp { timestamp, speaker }));
    }
    (text, None)
}
