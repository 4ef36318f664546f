// replyclean-core/src/lib.rs
//! # ReplyClean Core Library
//!
//! `replyclean-core` turns model-generated replies into plain text that is
//! safe to post on messaging platforms. It removes echoed transcript stamps,
//! flattens Markdown, normalizes Unicode separators and invisible characters,
//! replaces control characters, and tidies whitespace.
//!
//! The library is pure and stateless: every transformation is a rule in a
//! compiled, read-only table, and the same input always yields the same
//! output. A single `Sanitizer` may be shared across threads.
//!
//! ## Modules
//!
//! * `config`: Defines `RuleSpec`s and `RuleSet` (loading, merging, filtering, validation).
//! * `sanitizers`: Compiles rules into a `PatternTable` and holds programmatic transforms.
//! * `metadata`: Strips a leading `[timestamp] speaker:` stamp.
//! * `markdown`: Classifies and flattens Markdown.
//! * `normalize`: Character-class, control-character, whitespace and blank-line stages.
//! * `engine`: The `Sanitizer` that runs every stage in order.
//! * `report`: Per-call diagnostics and log-safe fingerprints.
//! * `headless`: One-shot convenience wrappers.
//! * `errors`: `SanitizeError` and `RuleError`.
//!
//! ## Usage Example
//!
//! ```rust
//! use replyclean_core::{sanitize, sanitize_or_fallback, SanitizeError};
//!
//! let reply = "[2025-03-06T22:30:11+01:00] BOT: **Hello**   there!\r\n\r\n\r\n\r\nBye";
//! assert_eq!(sanitize(reply).unwrap(), "Hello there!\n\nBye");
//!
//! assert_eq!(sanitize("   "), Err(SanitizeError::WhitespaceOnly));
//! assert_eq!(sanitize_or_fallback("", "(no reply)"), "(no reply)");
//! ```
//!
//! License: MIT OR APACHE 2.0

pub mod config;
pub mod engine;
pub mod errors;
pub mod headless;
pub mod markdown;
pub mod metadata;
pub mod normalize;
pub mod report;
pub mod sanitizers;

// Configuration
pub use config::{merge_rules, validate_rules, MarkdownKind, RuleSet, RuleSpec, Stage, TransformKind};

// Errors
pub use errors::{RuleError, SanitizeError};

// Engine
pub use engine::{SanitizeOutcome, SanitizedText, Sanitizer};

// Stage outputs
pub use markdown::MarkdownKinds;
pub use metadata::TranscriptStamp;
pub use report::{RuleHits, SanitizeReport};

// Headless
pub use headless::{sanitize, sanitize_or_fallback, sanitize_with_rules};

pub use sanitizers::compiler::{compile_rules, default_table, CompiledRule, PatternTable};

/// Reports which Markdown constructs occur unescaped in `text`, using the default rules.
pub fn classify(text: &str) -> MarkdownKinds {
    markdown::classify(&default_table(), text)
}

/// Flattens Markdown in `text` with the default rules.
pub fn convert_markdown(text: &str) -> String {
    markdown::convert(&default_table(), text, &mut RuleHits::default())
}

/// Removes a leading transcript stamp from `text`, using the default rules.
pub fn strip_metadata(text: &str) -> (&str, Option<TranscriptStamp>) {
    metadata::strip_metadata_prefix(&default_table(), text)
}
