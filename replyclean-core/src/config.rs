//! Configuration management for `replyclean-core`.
//!
//! Every transformation the sanitizer performs is expressed as data: a
//! [`RuleSpec`] names a regex matcher, the pipeline [`Stage`] it belongs to,
//! and either a replacement template or a programmatic [`TransformKind`].
//! The built-in table lives in `config/default_rules.yaml` and is embedded
//! at compile time. Users may load extra rule files and merge them on top.
//!
//! Rule order is significant: within a stage, rules run top to bottom.
//!
//! License: MIT OR Apache-2.0

use anyhow::{anyhow, Context, Result};
use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// Maximum allowed length for a regex pattern string.
pub const MAX_PATTERN_LENGTH: usize = 500;

lazy_static! {
    /// Matches `$1`, `${1}` and `${name}` references inside a replacement template.
    static ref CAPTURE_REFERENCE: Regex =
        Regex::new(r"\$(?:\{([A-Za-z0-9_]+)\}|([0-9]+))").unwrap();
}

/// The pipeline stage a rule belongs to, listed in execution order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Leading transcript stamp removal.
    Metadata,
    /// Markdown-to-plaintext conversion, gated by the classifier.
    #[default]
    Markdown,
    /// Unicode separators, joiners and format characters.
    CharClass,
    /// ASCII control characters.
    Control,
    /// Horizontal whitespace inside a single line.
    Whitespace,
    /// Runs of blank lines.
    BlankLines,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Metadata,
        Stage::Markdown,
        Stage::CharClass,
        Stage::Control,
        Stage::Whitespace,
        Stage::BlankLines,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Metadata => "metadata",
            Stage::Markdown => "markdown",
            Stage::CharClass => "char_class",
            Stage::Control => "control",
            Stage::Whitespace => "whitespace",
            Stage::BlankLines => "blank_lines",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Markdown construct families reported by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkdownKind {
    /// A backslash-escaped marker such as `\*`.
    Escape,
    Emphasis,
    Strikethrough,
    Code,
    Link,
    Image,
    Header,
    Blockquote,
    List,
    HorizontalRule,
    Table,
}

impl MarkdownKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarkdownKind::Escape => "escape",
            MarkdownKind::Emphasis => "emphasis",
            MarkdownKind::Strikethrough => "strikethrough",
            MarkdownKind::Code => "code",
            MarkdownKind::Link => "link",
            MarkdownKind::Image => "image",
            MarkdownKind::Header => "header",
            MarkdownKind::Blockquote => "blockquote",
            MarkdownKind::List => "list",
            MarkdownKind::HorizontalRule => "horizontal_rule",
            MarkdownKind::Table => "table",
        }
    }
}

impl fmt::Display for MarkdownKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Replacements that cannot be written as a plain regex template.
///
/// When a rule names a transform, its `replace_with` is ignored and the
/// function in `sanitizers::transforms` is called for every match instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    /// Swap `\x` escapes for private placeholders.
    ProtectEscapes,
    /// Drop code-span delimiters and shield the span's content.
    InlineCode,
    /// `[text](url)` to `text (url)` or `url`.
    Link,
    /// Shield a bare URL from emphasis rules.
    ProtectUrl,
    /// Flatten or drop a pipe-table line.
    TableRow,
    /// `_x_` / `__x__` only at word boundaries.
    UnderscoreEmphasis,
    /// Turn placeholders back into literal markers.
    RestoreEscapes,
}

/// A single sanitization rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(default)]
pub struct RuleSpec {
    /// Unique identifier for the rule (e.g., "atx_header").
    pub name: String,
    /// Human-readable description of what the rule targets.
    pub description: Option<String>,
    /// The pipeline stage that runs this rule.
    pub stage: Stage,
    /// The regex pattern string.
    pub pattern: Option<String>,
    /// Regex replacement template (`${1}`, `${name}`); ignored when `transform` is set.
    pub replace_with: String,
    /// Programmatic replacement used instead of `replace_with`.
    pub transform: Option<TransformKind>,
    /// If true, the pattern also feeds the Markdown classifier.
    pub detect: bool,
    /// The construct family this rule detects.
    pub kind: Option<MarkdownKind>,
    /// If true, enables multiline mode for the regex engine.
    pub multiline: bool,
    /// If true, the dot character `.` in regex will match newlines.
    pub dot_matches_new_line: bool,
    /// Explicit override for enabling/disabling the rule.
    pub enabled: Option<bool>,
}

impl Default for RuleSpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: None,
            stage: Stage::Markdown,
            pattern: None,
            replace_with: String::new(),
            transform: None,
            detect: false,
            kind: None,
            multiline: false,
            dot_matches_new_line: false,
            enabled: None,
        }
    }
}

impl RuleSpec {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

/// An ordered collection of rules.
#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
pub struct RuleSet {
    pub rules: Vec<RuleSpec>,
}

/// Error type for missing rule configurations.
#[derive(Debug)]
pub struct RuleConfigNotFoundError {
    pub config_name: String,
}

impl fmt::Display for RuleConfigNotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Rule configuration '{}' not found.", self.config_name)
    }
}

impl std::error::Error for RuleConfigNotFoundError {}

impl RuleSet {
    /// Loads rules from a YAML file and validates them.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading custom rules from: {}", path.display());
        if !path.exists() {
            return Err(RuleConfigNotFoundError {
                config_name: path.display().to_string(),
            }
            .into());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read rule file {}", path.display()))?;
        let config = Self::from_yaml_str(&text)
            .with_context(|| format!("Failed to parse rule file {}", path.display()))?;

        validate_rules(&config.rules)?;
        info!("Loaded {} rules from file {}.", config.rules.len(), path.display());

        Ok(config)
    }

    /// Loads the built-in rules from the embedded configuration.
    pub fn load_default_rules() -> Result<Self> {
        debug!("Loading default rules from embedded string...");
        let default_yaml = include_str!("../config/default_rules.yaml");
        let config = Self::from_yaml_str(default_yaml).context("Failed to parse default rules")?;

        debug!("Loaded {} default rules.", config.rules.len());
        Ok(config)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: RuleSet = serde_yml::from_str(text)?;
        Ok(config)
    }

    /// Applies enable/disable lists by rule name.
    ///
    /// Disabled rules stay in the set so that order is kept if they are
    /// re-enabled by a later merge; the compiler skips them.
    pub fn set_active_rules(&mut self, enable_rules: &[String], disable_rules: &[String]) {
        let enable_set: HashSet<&str> = enable_rules.iter().map(String::as_str).collect();
        let disable_set: HashSet<&str> = disable_rules.iter().map(String::as_str).collect();
        let all_rule_names: HashSet<&str> = self.rules.iter().map(|r| r.name.as_str()).collect();

        for rule_name in enable_set.difference(&all_rule_names) {
            warn!("Rule '{}' in `enable_rules` list does not exist.", rule_name);
        }
        for rule_name in disable_set.difference(&all_rule_names) {
            warn!("Rule '{}' in `disable_rules` list does not exist.", rule_name);
        }

        for rule in &mut self.rules {
            if disable_set.contains(rule.name.as_str()) {
                rule.enabled = Some(false);
            } else if enable_set.contains(rule.name.as_str()) {
                rule.enabled = Some(true);
            }
        }

        debug!(
            "Active rules after filtering: {} of {}",
            self.rules.iter().filter(|r| r.is_enabled()).count(),
            self.rules.len()
        );
    }

    /// Returns the rules of one stage, in table order.
    pub fn stage_rules(&self, stage: Stage) -> impl Iterator<Item = &RuleSpec> {
        self.rules.iter().filter(move |r| r.stage == stage)
    }
}

/// Merges user-defined rules into the defaults.
///
/// A user rule with the same name replaces the default in place, so the
/// default ordering survives; new rules are appended at the end of the set.
pub fn merge_rules(default_config: RuleSet, user_config: Option<RuleSet>) -> RuleSet {
    debug!("merge_rules called. Initial default rules count: {}", default_config.rules.len());

    let mut final_rules = default_config.rules;

    if let Some(user_cfg) = user_config {
        debug!("User config provided. Merging {} user rules.", user_cfg.rules.len());
        for user_rule in user_cfg.rules {
            match final_rules.iter_mut().find(|r| r.name == user_rule.name) {
                Some(existing) => {
                    debug!("Overriding rule '{}'.", user_rule.name);
                    *existing = user_rule;
                }
                None => final_rules.push(user_rule),
            }
        }
    }

    debug!("Final total rules after merge: {}", final_rules.len());
    RuleSet { rules: final_rules }
}

/// Validates rule integrity (regex compilation, capture references, transforms).
pub fn validate_rules(rules: &[RuleSpec]) -> Result<()> {
    let mut rule_names = HashSet::new();
    let mut errors = Vec::new();

    for rule in rules {
        if rule.name.is_empty() {
            errors.push("A rule has an empty `name` field.".to_string());
        } else if !rule_names.insert(rule.name.clone()) {
            errors.push(format!("Duplicate rule name found: '{}'.", rule.name));
        }

        let pattern = match &rule.pattern {
            Some(p) if !p.is_empty() => p,
            Some(_) => {
                errors.push(format!("Rule '{}' has an empty `pattern` field.", rule.name));
                continue;
            }
            None => {
                errors.push(format!("Rule '{}' is missing the `pattern` field.", rule.name));
                continue;
            }
        };

        if pattern.len() > MAX_PATTERN_LENGTH {
            errors.push(format!(
                "Rule '{}': pattern length ({}) exceeds maximum allowed ({}).",
                rule.name,
                pattern.len(),
                MAX_PATTERN_LENGTH
            ));
        }

        if rule.detect && rule.kind.is_none() {
            errors.push(format!("Rule '{}' sets `detect` without a `kind`.", rule.name));
        }
        if rule.detect && rule.stage != Stage::Markdown {
            errors.push(format!(
                "Rule '{}': only markdown rules may set `detect` (stage is {}).",
                rule.name, rule.stage
            ));
        }
        if rule.transform.is_some() && !rule.replace_with.is_empty() {
            errors.push(format!(
                "Rule '{}' sets both `transform` and `replace_with`.",
                rule.name
            ));
        }

        let regex = match Regex::new(pattern) {
            Ok(r) => r,
            Err(e) => {
                errors.push(format!("Rule '{}' has an invalid regex pattern: {}", rule.name, e));
                continue;
            }
        };

        // captures_len() counts the implicit whole-match group 0.
        let group_count = regex.captures_len() - 1;
        let group_names: HashSet<&str> = regex.capture_names().flatten().collect();
        for cap in CAPTURE_REFERENCE.captures_iter(&rule.replace_with) {
            let reference = cap.get(1).or_else(|| cap.get(2)).map(|m| m.as_str()).unwrap_or("");
            let known = match reference.parse::<usize>() {
                Ok(n) => n <= group_count,
                Err(_) => group_names.contains(reference),
            };
            if !known {
                errors.push(format!(
                    "Rule '{}': replacement references non-existent capture group '{}'.",
                    rule.name, reference
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(anyhow!("Rule validation failed:\n{}", errors.join("\n")))
    }
}
