// replyclean-core/src/engine.rs
//! The `Sanitizer`: composes every stage in a fixed order.
//!
//! ```text
//! raw ─▶ metadata strip ─▶ classify ─▶ (convert) ─▶ LF ─▶ char classes
//!     ─▶ controls ─▶ line whitespace ─▶ blank lines ─▶ guard ─▶ trim ─▶ SanitizedText
//! ```
//!
//! A `Sanitizer` holds nothing but an `Arc` to an immutable `PatternTable`,
//! so it is `Send + Sync`, cheap to clone, and safe to call from any number
//! of threads at once.
//!
//! License: MIT OR APACHE 2.0

use anyhow::Result;
use log::debug;
use serde::Serialize;
use std::borrow::Cow;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::config::RuleSet;
use crate::errors::{RuleError, SanitizeError};
use crate::markdown::{self, MarkdownKinds};
use crate::metadata::{self, TranscriptStamp};
use crate::normalize;
use crate::report::{fingerprint, loggable, RuleHits, SanitizeReport};
use crate::sanitizers::compiler::{compile_rules, default_table, PatternTable};

/// Text that passed through the full pipeline.
///
/// Contains no CR and no ASCII control character other than `\n`, never
/// more than one blank line in a row, and no leading or trailing whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SanitizedText(String);

impl SanitizedText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Deref for SanitizedText {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for SanitizedText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SanitizedText {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<SanitizedText> for String {
    fn from(text: SanitizedText) -> Self {
        text.0
    }
}

impl PartialEq<str> for SanitizedText {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for SanitizedText {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// The result of one sanitize call.
pub type SanitizeOutcome = std::result::Result<SanitizedText, SanitizeError>;

#[derive(Debug, Clone)]
pub struct Sanitizer {
    table: Arc<PatternTable>,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Sanitizer {
    /// A sanitizer over the built-in rule table.
    pub fn new() -> Self {
        Self {
            table: default_table(),
        }
    }

    /// A sanitizer over a custom rule table.
    pub fn with_rules(rules: RuleSet) -> std::result::Result<Self, RuleError> {
        Ok(Self {
            table: Arc::new(compile_rules(rules)?),
        })
    }

    /// Loads a YAML rule file, merges it over the defaults and compiles it.
    pub fn from_rule_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let defaults = RuleSet::load_default_rules()?;
        let user = RuleSet::load_from_file(path)?;
        let merged = crate::config::merge_rules(defaults, Some(user));
        Ok(Self::with_rules(merged)?)
    }

    pub fn table(&self) -> &PatternTable {
        &self.table
    }

    /// Removes a leading transcript stamp.
    pub fn strip_metadata<'t>(&self, text: &'t str) -> (&'t str, Option<TranscriptStamp>) {
        metadata::strip_metadata_prefix(&self.table, text)
    }

    /// Reports which Markdown constructs occur unescaped in `text`.
    pub fn classify(&self, text: &str) -> MarkdownKinds {
        markdown::classify(&self.table, text)
    }

    /// Runs the Markdown converter unconditionally.
    pub fn convert_markdown(&self, text: &str) -> String {
        markdown::convert(&self.table, text, &mut RuleHits::default())
    }

    /// Sanitizes `text`.
    pub fn sanitize(&self, text: &str) -> SanitizeOutcome {
        self.sanitize_with_report(text).0
    }

    /// Sanitizes `text` and describes what happened.
    pub fn sanitize_with_report(&self, text: &str) -> (SanitizeOutcome, SanitizeReport) {
        let mut report = SanitizeReport::new(text);
        let outcome = self.run(text, &mut report);

        match &outcome {
            Ok(clean) => {
                report.output_chars = clean.chars().count();
                debug!(
                    target: "replyclean_core::engine",
                    "Sanitized input {} ({} chars) -> {} chars, markdown: {}, rules fired: {}",
                    report.input_fingerprint,
                    report.input_chars,
                    report.output_chars,
                    report.markdown.is_markdown(),
                    report.rule_hits.iter().count()
                );
            }
            Err(e) => {
                debug!(
                    target: "replyclean_core::engine",
                    "Input {} {} produced nothing: {}",
                    report.input_fingerprint,
                    loggable(text),
                    e
                );
            }
        }
        (outcome, report)
    }

    fn run(&self, text: &str, report: &mut SanitizeReport) -> SanitizeOutcome {
        if text.is_empty() {
            return Err(SanitizeError::EmptyInput);
        }

        let (body, stamp) = self.strip_metadata(text);
        if let Some(stamp) = stamp {
            report.stamp = Some(stamp);
            if body.is_empty() {
                return Err(SanitizeError::MetadataOnly);
            }
        }

        let table = &*self.table;
        let hits = &mut report.rule_hits;

        let kinds = markdown::classify(table, body);
        let body: Cow<'_, str> = if kinds.is_markdown() {
            debug!(
                "Markdown detected in {}: {:?}",
                fingerprint(body),
                kinds.iter().map(|k| k.as_str()).collect::<Vec<_>>()
            );
            Cow::Owned(markdown::convert(table, body, hits))
        } else {
            Cow::Borrowed(body)
        };
        report.markdown = kinds;

        let s = normalize::normalize_line_endings(&body);
        let s = normalize::normalize_char_classes(table, &s, hits);
        let s = normalize::filter_control_chars(table, &s, hits);
        let s = normalize::collapse_line_whitespace(table, &s, hits);
        let s = normalize::limit_blank_lines(table, &s, hits);
        let s = normalize::enforce_output_invariants(&s, hits);
        let s = s.trim();

        if s.is_empty() {
            Err(SanitizeError::WhitespaceOnly)
        } else {
            Ok(SanitizedText(s.to_string()))
        }
    }
}
