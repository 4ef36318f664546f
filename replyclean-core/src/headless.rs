// replyclean-core/src/headless.rs
//! `headless.rs`
//! One-shot helpers for callers that do not want to hold a `Sanitizer`.
//!
//! All of them use the process-wide default table unless handed a
//! `RuleSet`, in which case the rules are compiled for that single call.

use anyhow::Result;
use log::warn;

use crate::config::RuleSet;
use crate::engine::{SanitizeOutcome, SanitizedText, Sanitizer};
use crate::report::fingerprint;

/// Sanitizes `text` with the default rules.
pub fn sanitize(text: &str) -> SanitizeOutcome {
    Sanitizer::new().sanitize(text)
}

/// Sanitizes `text`, returning `fallback` when nothing sendable is left.
///
/// For callers that must always send something, such as a chat bot that
/// answers every message.
pub fn sanitize_or_fallback(text: &str, fallback: &str) -> String {
    match sanitize(text) {
        Ok(clean) => clean.into_string(),
        Err(e) => {
            warn!(
                "Sanitizing {} left nothing to send ({}); using fallback.",
                fingerprint(text),
                e
            );
            fallback.to_string()
        }
    }
}

/// Compiles `rules` and sanitizes `text` with them.
///
/// Rule errors and sanitize errors both surface through `anyhow`.
pub fn sanitize_with_rules(rules: RuleSet, text: &str) -> Result<SanitizedText> {
    let sanitizer = Sanitizer::with_rules(rules)?;
    Ok(sanitizer.sanitize(text)?)
}
