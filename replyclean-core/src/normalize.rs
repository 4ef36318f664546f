// replyclean-core/src/normalize.rs
//! Character and whitespace normalization stages.
//!
//! Each function runs one stage of the rule table. They are separate so that
//! each stage can be tested on its own; the engine calls them in order.

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::Stage;
use crate::report::RuleHits;
use crate::sanitizers::compiler::PatternTable;

/// Name under which the output guard reports its rewrites.
pub const OUTPUT_GUARD: &str = "output_guard";

static STRAY_CONTROL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x00-\x09\x0B-\x1F\x7F]").unwrap());
static EXCESS_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// CRLF and lone CR become LF.
pub fn normalize_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

/// Unicode separators, joiners and format characters.
pub fn normalize_char_classes(table: &PatternTable, input: &str, hits: &mut RuleHits) -> String {
    table.run_stage(Stage::CharClass, input, hits)
}

/// ASCII control characters other than `\t` and `\n` become a space.
pub fn filter_control_chars(table: &PatternTable, input: &str, hits: &mut RuleHits) -> String {
    table.run_stage(Stage::Control, input, hits)
}

/// Collapses horizontal whitespace runs and trims every line.
///
/// Only ASCII spaces are trimmed; an ideographic space at a line edge is
/// content.
pub fn collapse_line_whitespace(table: &PatternTable, input: &str, hits: &mut RuleHits) -> String {
    let collapsed = table.run_stage(Stage::Whitespace, input, hits);
    collapsed
        .split('\n')
        .map(|line| line.trim_matches(' '))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Three or more consecutive newlines become exactly two.
pub fn limit_blank_lines(table: &PatternTable, input: &str, hits: &mut RuleHits) -> String {
    table.run_stage(Stage::BlankLines, input, hits)
}

/// Enforces the output guarantees whatever the rule table did.
///
/// ASCII controls other than `\n` become a space and runs of three or more
/// newlines become two. A no-op with the built-in rules; it only rewrites
/// text when `ascii_control` or `blank_line_run` was disabled or overridden.
pub fn enforce_output_invariants(input: &str, hits: &mut RuleHits) -> String {
    let controls = STRAY_CONTROL.find_iter(input).count();
    let s = STRAY_CONTROL.replace_all(input, " ");
    let runs = EXCESS_NEWLINES.find_iter(&s).count();
    let s = EXCESS_NEWLINES.replace_all(&s, "\n\n").into_owned();

    if controls + runs > 0 {
        debug!(
            "Output guard rewrote {} control character(s) and {} newline run(s).",
            controls, runs
        );
        hits.record(OUTPUT_GUARD, controls + runs);
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sanitizers::compiler::default_table;

    fn char_classes(input: &str) -> String {
        normalize_char_classes(&default_table(), input, &mut RuleHits::default())
    }

    fn controls(input: &str) -> String {
        filter_control_chars(&default_table(), input, &mut RuleHits::default())
    }

    fn whitespace(input: &str) -> String {
        collapse_line_whitespace(&default_table(), input, &mut RuleHits::default())
    }

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalize_line_endings("a\r\nb\rc\nd"), "a\nb\nc\nd");
        assert_eq!(normalize_line_endings("\r\r\n"), "\n\n");
    }

    #[test]
    fn separators_become_newlines() {
        assert_eq!(char_classes("a\u{2028}b"), "a\nb");
        assert_eq!(char_classes("a\u{2029}b"), "a\n\nb");
        assert_eq!(char_classes("a\u{0085}b"), "a\nb");
    }

    #[test]
    fn zero_width_breaks_become_spaces() {
        assert_eq!(char_classes("a\u{200B}b\u{200C}c"), "a b c");
    }

    #[test]
    fn format_characters_are_deleted() {
        let input = "\u{FEFF}soft\u{00AD}ware\u{2060}x\u{202E}y\u{202C}\u{2066}z\u{2069}\u{200D}";
        assert_eq!(char_classes(input), "softwarexyz");
    }

    #[test]
    fn mongolian_vowel_separator_is_kept() {
        assert_eq!(char_classes("ᠨᠢ\u{180E}ᠠ"), "ᠨᠢ\u{180E}ᠠ");
        assert_eq!(whitespace("ᠨᠢ\u{180E}ᠠ"), "ᠨᠢ\u{180E}ᠠ");
    }

    #[test]
    fn emoji_zwj_sequences_survive() {
        let family = "Family: 👨\u{200D}👩\u{200D}👧\u{200D}👦";
        assert_eq!(char_classes(family), family);
        let flag = "🏳\u{FE0F}\u{200D}🌈";
        assert_eq!(char_classes(flag), flag);
        let coder = "👩🏽\u{200D}💻";
        assert_eq!(char_classes(coder), coder);
    }

    #[test]
    fn stray_zwj_is_deleted() {
        assert_eq!(char_classes("ab\u{200D}cd 👍\u{200D}"), "abcd 👍");
    }

    #[test]
    fn combining_marks_and_rtl_pass_through() {
        let text = "e\u{0301} שלום مرحبا";
        assert_eq!(char_classes(text), text);
    }

    #[test]
    fn control_characters_become_spaces() {
        assert_eq!(controls("a\u{0}b\u{7}c\u{1B}d\u{7F}e"), "a b c d e");
        assert_eq!(controls("v\u{B}f\u{C}"), "v f ");
        assert_eq!(controls("tab\tnew\nline"), "tab\tnew\nline");
    }

    #[test]
    fn whitespace_runs_collapse_per_line() {
        assert_eq!(whitespace("  a \t b\u{00A0}\u{2003}c  \n\t d  "), "a b c\nd");
    }

    #[test]
    fn ideographic_space_is_preserved() {
        assert_eq!(whitespace("日本\u{3000}語"), "日本\u{3000}語");
        assert_eq!(whitespace("a  \u{3000}\u{3000}  b"), "a \u{3000}\u{3000} b");
        assert_eq!(whitespace("\u{3000}indent"), "\u{3000}indent");
    }

    #[test]
    fn output_guard_is_silent_on_clean_text() {
        let mut hits = RuleHits::default();
        assert_eq!(enforce_output_invariants("a b\n\nc", &mut hits), "a b\n\nc");
        assert!(hits.is_empty());
    }

    #[test]
    fn output_guard_catches_what_rules_left() {
        let mut hits = RuleHits::default();
        let out = enforce_output_invariants("a\u{7}b\tc\r\n\n\n\nd", &mut hits);
        assert_eq!(out, "a b c \n\nd");
        assert_eq!(hits.get(OUTPUT_GUARD), 4);
    }

    #[test]
    fn blank_lines_are_limited() {
        let table = default_table();
        let mut hits = RuleHits::default();
        assert_eq!(limit_blank_lines(&table, "a\n\n\n\n\nb\n\nc", &mut hits), "a\n\nb\n\nc");
        assert_eq!(hits.get("blank_line_run"), 1);
    }
}
