//! Rule compilation and programmatic replacements.
//!
//! `compiler` turns a `RuleSet` into the immutable `PatternTable` every
//! stage reads from. `transforms` holds the replacements that a regex
//! template cannot express, such as link rewriting and escape protection.

pub mod compiler;
pub mod transforms;
