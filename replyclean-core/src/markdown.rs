// replyclean-core/src/markdown.rs
//! Markdown detection and flattening.
//!
//! [`classify`] is the cheap gate: one `RegexSet` pass over the text after
//! escaped markers have been hidden. Only when it finds something does
//! [`convert`] run the ordered markdown rules, which is where the real work
//! (and cost) is. Plain replies never pay for the converter.

use log::debug;
use serde::Serialize;
use std::collections::BTreeSet;

use crate::config::{MarkdownKind, Stage};
use crate::normalize::normalize_line_endings;
use crate::report::RuleHits;
use crate::sanitizers::compiler::PatternTable;

/// The set of Markdown construct kinds found in a text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MarkdownKinds(BTreeSet<MarkdownKind>);

impl MarkdownKinds {
    /// True when the converter has anything to do.
    pub fn is_markdown(&self) -> bool {
        !self.0.is_empty()
    }

    pub fn contains(&self, kind: MarkdownKind) -> bool {
        self.0.contains(&kind)
    }

    /// True when the only Markdown present is backslash escapes.
    pub fn only_escapes(&self) -> bool {
        self.0.len() == 1 && self.contains(MarkdownKind::Escape)
    }

    /// Kinds in `MarkdownKind` order.
    pub fn iter(&self) -> impl Iterator<Item = MarkdownKind> + '_ {
        self.0.iter().copied()
    }
}

/// Reports which Markdown constructs occur unescaped in `text`.
pub fn classify(table: &PatternTable, text: &str) -> MarkdownKinds {
    let mut kinds = BTreeSet::new();

    let mut masked = text.to_string();
    for rule in table.protectors() {
        let (out, count) = rule.apply(&masked);
        if count > 0 {
            kinds.insert(rule.kind.unwrap_or(MarkdownKind::Escape));
            masked = out.into_owned();
        }
    }

    for index in table.detector().matches(&masked).iter() {
        if let Some(kind) = table.detector_kind(index) {
            kinds.insert(kind);
        }
    }

    MarkdownKinds(kinds)
}

/// Rewrites Markdown constructs as plain text.
///
/// Never fails: malformed or unbalanced markup is left as best-effort text.
pub fn convert(table: &PatternTable, text: &str, hits: &mut RuleHits) -> String {
    let normalized = normalize_line_endings(text);
    let converted = table.run_stage(Stage::Markdown, &normalized, hits);
    debug!(
        "Markdown conversion: {} -> {} bytes.",
        normalized.len(),
        converted.len()
    );
    converted
}
