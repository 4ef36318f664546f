//! compiler.rs - Turns a `RuleSet` into an immutable `PatternTable`.
//!
//! Compilation happens once. The default table is held in a process-wide
//! `Lazy` and handed out as an `Arc`, so every caller reads the same compiled
//! regexes without locking. Custom tables are compiled on demand and owned by
//! the `Sanitizer` that uses them.
//!
//! License: MIT OR APACHE 2.0

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::{Captures, Regex, RegexBuilder, RegexSet, RegexSetBuilder};
use std::borrow::Cow;
use std::sync::Arc;

use crate::config::{MarkdownKind, RuleSet, RuleSpec, Stage, TransformKind, MAX_PATTERN_LENGTH};
use crate::errors::RuleError;
use crate::report::RuleHits;
use crate::sanitizers::transforms;

/// Upper bound for a single compiled program.
const REGEX_SIZE_LIMIT: usize = 10 * (1 << 20);

static DEFAULT_TABLE: Lazy<Arc<PatternTable>> = Lazy::new(|| {
    let rules = RuleSet::load_default_rules().expect("embedded default rules must parse");
    Arc::new(compile_rules(rules).expect("embedded default rules must compile"))
});

/// Returns the process-wide table built from the embedded default rules.
pub fn default_table() -> Arc<PatternTable> {
    Arc::clone(&DEFAULT_TABLE)
}

/// How a match is rewritten.
#[derive(Debug, Clone)]
pub enum Replacement {
    /// A regex template such as `${inner}`.
    Template(String),
    /// A function from `sanitizers::transforms`.
    Transform(TransformKind),
}

/// A single compiled rule.
#[derive(Debug)]
pub struct CompiledRule {
    /// The compiled regular expression used for matching.
    pub regex: Regex,
    pub replacement: Replacement,
    /// The unique name of the rule.
    pub name: String,
    pub stage: Stage,
    pub kind: Option<MarkdownKind>,
}

impl CompiledRule {
    /// Rewrites every match in `text`, returning the result and the match count.
    ///
    /// The text is borrowed back unchanged when nothing matched.
    pub fn apply<'t>(&self, text: &'t str) -> (Cow<'t, str>, usize) {
        let mut hits = 0usize;
        let out = self.regex.replace_all(text, |caps: &Captures<'_>| {
            hits += 1;
            match &self.replacement {
                Replacement::Template(template) => {
                    let mut dst = String::new();
                    caps.expand(template, &mut dst);
                    dst
                }
                Replacement::Transform(kind) => transforms::apply(*kind, caps, text),
            }
        });
        (out, hits)
    }

    pub fn is_protector(&self) -> bool {
        matches!(self.replacement, Replacement::Transform(TransformKind::ProtectEscapes))
    }
}

/// The compiled, read-only rule table shared by all sanitize calls.
#[derive(Debug)]
pub struct PatternTable {
    /// Enabled rules in execution order (stage first, then table order).
    pub rules: Vec<CompiledRule>,
    /// Union of the markdown construct matchers, used by the classifier.
    detector: RegexSet,
    /// Kind of each pattern in `detector`, by index.
    detector_kinds: Vec<MarkdownKind>,
}

impl PatternTable {
    /// Rules of one stage, in table order.
    pub fn stage_rules(&self, stage: Stage) -> impl Iterator<Item = &CompiledRule> {
        self.rules.iter().filter(move |r| r.stage == stage)
    }

    /// Markdown rules that hide escaped markers before detection.
    pub fn protectors(&self) -> impl Iterator<Item = &CompiledRule> {
        self.stage_rules(Stage::Markdown).filter(|r| r.is_protector())
    }

    pub fn detector(&self) -> &RegexSet {
        &self.detector
    }

    pub fn detector_kind(&self, index: usize) -> Option<MarkdownKind> {
        self.detector_kinds.get(index).copied()
    }

    /// Runs every rule of `stage` over `text`, in order.
    pub fn run_stage(&self, stage: Stage, text: &str, hits: &mut RuleHits) -> String {
        let mut current = text.to_string();
        for rule in self.stage_rules(stage) {
            let (out, count) = rule.apply(&current);
            if count > 0 {
                hits.record(&rule.name, count);
                current = out.into_owned();
            }
        }
        current
    }
}

/// Pattern string with the rule's flags inlined, as needed by `RegexSet`.
fn effective_pattern(rule: &RuleSpec, pattern: &str) -> String {
    let mut flags = String::new();
    if rule.multiline {
        flags.push('m');
    }
    if rule.dot_matches_new_line {
        flags.push('s');
    }
    if flags.is_empty() {
        pattern.to_string()
    } else {
        format!("(?{}){}", flags, pattern)
    }
}

/// Compiles a `RuleSet` into a `PatternTable`.
///
/// Disabled rules and rules without a pattern are skipped. All compilation
/// failures are collected and reported together.
pub fn compile_rules(rule_set: RuleSet) -> Result<PatternTable, RuleError> {
    debug!("Starting compilation of {} rules.", rule_set.rules.len());

    let mut compiled_rules = Vec::new();
    let mut detector_patterns = Vec::new();
    let mut detector_kinds = Vec::new();
    let mut compilation_errors = Vec::new();

    let mut rules = rule_set.rules;
    // Stable: table order is kept inside each stage.
    rules.sort_by_key(|r| r.stage);

    for rule in rules {
        if !rule.is_enabled() {
            debug!("Skipping disabled rule '{}'.", rule.name);
            continue;
        }
        let Some(pattern) = rule.pattern.clone() else {
            warn!("Skipping rule '{}' because its pattern is missing.", &rule.name);
            continue;
        };

        if pattern.len() > MAX_PATTERN_LENGTH {
            compilation_errors.push(RuleError::PatternLengthExceeded(
                rule.name,
                pattern.len(),
                MAX_PATTERN_LENGTH,
            ));
            continue;
        }
        if rule.detect && rule.kind.is_none() {
            compilation_errors.push(RuleError::InvalidRule(
                rule.name,
                "`detect` requires a `kind`".to_string(),
            ));
            continue;
        }

        let regex_result = RegexBuilder::new(&pattern)
            .multi_line(rule.multiline)
            .dot_matches_new_line(rule.dot_matches_new_line)
            .size_limit(REGEX_SIZE_LIMIT)
            .build();

        let regex = match regex_result {
            Ok(regex) => regex,
            Err(e) => {
                compilation_errors.push(RuleError::RuleCompilationError(rule.name, e));
                continue;
            }
        };

        let replacement = match rule.transform {
            Some(kind) => Replacement::Transform(kind),
            None => Replacement::Template(rule.replace_with.clone()),
        };

        let compiled = CompiledRule {
            regex,
            replacement,
            name: rule.name.clone(),
            stage: rule.stage,
            kind: rule.kind,
        };

        // Escape protectors are applied before detection rather than being
        // part of the set, so escaped markers never count as constructs.
        if rule.detect && rule.stage == Stage::Markdown && !compiled.is_protector() {
            if let Some(kind) = rule.kind {
                detector_patterns.push(effective_pattern(&rule, &pattern));
                detector_kinds.push(kind);
            }
        }

        log::debug!(
            target: "replyclean_core::compiler",
            "Rule '{}' ({}) compiled successfully.",
            &compiled.name,
            compiled.stage
        );
        compiled_rules.push(compiled);
    }

    if !compilation_errors.is_empty() {
        let error_message = compilation_errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<String>>()
            .join("\n");
        return Err(RuleError::Fatal(format!(
            "Failed to compile {} rule(s):\n{}",
            compilation_errors.len(),
            error_message
        )));
    }

    let detector = RegexSetBuilder::new(&detector_patterns)
        .size_limit(REGEX_SIZE_LIMIT)
        .build()
        .map_err(|e| RuleError::RuleCompilationError("markdown_detector".to_string(), e))?;

    debug!(
        "Finished compiling rules. Total compiled: {}, markdown detectors: {}.",
        compiled_rules.len(),
        detector_kinds.len()
    );
    Ok(PatternTable {
        rules: compiled_rules,
        detector,
        detector_kinds,
    })
}
