// replyclean-core/src/report.rs
//! Per-call diagnostics and log-safe views of user text.
//!
//! Model replies are user data. Debug logs identify an input by a short
//! SHA-256 fingerprint and print only its length, unless
//! `REPLYCLEAN_ALLOW_DEBUG_PII=true` is set in the environment.

use lazy_static::lazy_static;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::markdown::MarkdownKinds;
use crate::metadata::TranscriptStamp;

lazy_static! {
    /// Read once: whether raw text may appear in debug logs.
    static ref PII_DEBUG_ALLOWED: bool = {
        std::env::var("REPLYCLEAN_ALLOW_DEBUG_PII")
            .map(|s| s.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    };
}

/// Number of hex characters kept from the SHA-256 digest.
const FINGERPRINT_LEN: usize = 16;

/// Short, stable identifier for a piece of text.
pub fn fingerprint(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(FINGERPRINT_LEN);
    hex
}

pub fn redact_sensitive(s: &str) -> String {
    format!("[REDACTED: {} chars]", s.chars().count())
}

/// Text as it may appear in logs.
pub fn loggable(text: &str) -> String {
    if *PII_DEBUG_ALLOWED {
        format!("{:?}", text)
    } else {
        redact_sensitive(text)
    }
}

/// How often each rule rewrote something during one call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuleHits(BTreeMap<String, usize>);

impl RuleHits {
    pub fn record(&mut self, rule_name: &str, count: usize) {
        *self.0.entry(rule_name.to_string()).or_insert(0) += count;
    }

    pub fn get(&self, rule_name: &str) -> usize {
        self.0.get(rule_name).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// What a single sanitize call saw and did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SanitizeReport {
    pub input_fingerprint: String,
    pub input_chars: usize,
    /// The transcript stamp removed from the start, if any.
    pub stamp: Option<TranscriptStamp>,
    /// Markdown constructs found by the classifier.
    pub markdown: MarkdownKinds,
    pub rule_hits: RuleHits,
    pub output_chars: usize,
}

impl SanitizeReport {
    pub fn new(input: &str) -> Self {
        Self {
            input_fingerprint: fingerprint(input),
            input_chars: input.chars().count(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_short_and_stable() {
        let a = fingerprint("hello world");
        assert_eq!(a.len(), FINGERPRINT_LEN);
        assert_eq!(a, fingerprint("hello world"));
        assert_ne!(a, fingerprint("hello world!"));
        // sha256("hello world") = b94d27b9...
        assert_eq!(a, "b94d27b9934d3e08");
    }

    #[test]
    fn redaction_counts_chars_not_bytes() {
        assert_eq!(redact_sensitive("héllo"), "[REDACTED: 5 chars]");
    }

    #[test]
    fn rule_hits_accumulate() {
        let mut hits = RuleHits::default();
        hits.record("bold_star", 2);
        hits.record("bold_star", 1);
        assert_eq!(hits.get("bold_star"), 3);
        assert_eq!(hits.get("missing"), 0);
        assert_eq!(hits.iter().count(), 1);
    }
}
