//! errors.rs - Custom error types for the replyclean-core library.
//!
//! Two enums cover two very different failure classes:
//!
//! * [`SanitizeError`] describes the shape of an input that produced nothing
//!   worth sending. These are deterministic and never worth retrying; the
//!   caller is expected to substitute a fallback message.
//! * [`RuleError`] describes a rule table that could not be compiled. The
//!   built-in table always compiles, so this only surfaces for user rule files.
//!
//! License: MIT OR APACHE 2.0

use thiserror::Error;

/// Why a call to `sanitize` produced no text.
///
/// By using `#[non_exhaustive]`, we signal to consumers of this library that
/// new variants may be added in future versions.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum SanitizeError {
    /// The input string was empty.
    #[error("input text is empty")]
    EmptyInput,

    /// The input was non-empty but nothing survived sanitization.
    #[error("input text contains only whitespace, control characters or discarded markup")]
    WhitespaceOnly,

    /// The input was a transcript stamp with nothing after it.
    #[error("input text consists only of a transcript metadata stamp")]
    MetadataOnly,
}

/// Errors raised while validating or compiling a rule table.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RuleError {
    #[error("Failed to compile sanitization rule '{0}': {1}")]
    RuleCompilationError(String, regex::Error),

    #[error("Rule '{0}': pattern length ({1}) exceeds maximum allowed ({2})")]
    PatternLengthExceeded(String, usize, usize),

    #[error("Rule '{0}' is invalid: {1}")]
    InvalidRule(String, String),

    #[error("A fatal error occurred: {0}")]
    Fatal(String),
}
