// replyclean-core/tests/config_integration_tests.rs
use anyhow::Result;
use std::io::Write;
use tempfile::NamedTempFile;

use replyclean_core::config::{self, RuleConfigNotFoundError, RuleSet, RuleSpec, Stage};
use replyclean_core::Sanitizer;

fn write_rules(yaml: &str) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    file.write_all(yaml.as_bytes())?;
    Ok(file)
}

#[test]
fn test_load_default_rules() {
    let config = RuleSet::load_default_rules().unwrap();
    assert!(!config.rules.is_empty());
    let stamp = config.rules.iter().find(|r| r.name == "transcript_stamp").unwrap();
    assert_eq!(stamp.stage, Stage::Metadata);
    let bold = config.rules.iter().find(|r| r.name == "bold_star").unwrap();
    assert_eq!(bold.stage, Stage::Markdown);
    assert!(bold.detect);
    assert!(bold.is_enabled());
}

#[test]
fn test_load_from_file() -> Result<()> {
    let file = write_rules(
        r#"
rules:
  - name: brand_name
    description: "Normalize the company name"
    stage: control
    pattern: '(?i)acme corp'
    replace_with: "ACME Corp"
"#,
    )?;
    let config = RuleSet::load_from_file(file.path())?;
    assert_eq!(config.rules.len(), 1);
    let rule = &config.rules[0];
    assert_eq!(rule.name, "brand_name");
    assert_eq!(rule.stage, Stage::Control);
    assert_eq!(rule.pattern, Some("(?i)acme corp".to_string()));
    assert!(!rule.detect);
    assert!(!rule.multiline);
    assert_eq!(rule.enabled, None);
    Ok(())
}

#[test]
fn test_stage_defaults_to_markdown() -> Result<()> {
    let file = write_rules("rules:\n  - name: bare\n    pattern: 'x'\n")?;
    let config = RuleSet::load_from_file(file.path())?;
    assert_eq!(config.rules[0].stage, Stage::Markdown);
    Ok(())
}

#[test]
fn test_missing_rule_file() {
    let err = RuleSet::load_from_file("/definitely/not/here/rules.yaml").unwrap_err();
    assert!(err.downcast_ref::<RuleConfigNotFoundError>().is_some());
}

#[test]
fn test_invalid_capture_reference_is_rejected() -> Result<()> {
    let file = write_rules(
        r#"
rules:
  - name: bad_ref
    stage: control
    pattern: '(?P<word>\w+)'
    replace_with: "${missing}"
"#,
    )?;
    let err = RuleSet::load_from_file(file.path()).unwrap_err();
    assert!(
        err.to_string().contains("non-existent capture group 'missing'"),
        "got: {err}"
    );
    Ok(())
}

#[test]
fn test_detect_outside_markdown_is_rejected() -> Result<()> {
    let file = write_rules(
        r#"
rules:
  - name: detect_control
    stage: control
    pattern: 'x'
    detect: true
    kind: emphasis
"#,
    )?;
    let err = RuleSet::load_from_file(file.path()).unwrap_err();
    assert!(err.to_string().contains("only markdown rules"), "got: {err}");
    Ok(())
}

#[test]
fn test_overlong_pattern_is_rejected() -> Result<()> {
    let pattern = "a".repeat(config::MAX_PATTERN_LENGTH + 1);
    let file = write_rules(&format!(
        "rules:\n  - name: long\n    stage: control\n    pattern: '{pattern}'\n"
    ))?;
    let err = RuleSet::load_from_file(file.path()).unwrap_err();
    assert!(err.to_string().contains("exceeds maximum allowed"), "got: {err}");
    Ok(())
}

#[test]
fn test_merge_rules_no_user_config() {
    let defaults = RuleSet::load_default_rules().unwrap();
    let merged = config::merge_rules(defaults.clone(), None);
    assert_eq!(merged, defaults);
}

#[test]
fn test_merge_rules_override_keeps_position() {
    let defaults = RuleSet::load_default_rules().unwrap();
    let position = defaults.rules.iter().position(|r| r.name == "ascii_control").unwrap();

    let user = RuleSet {
        rules: vec![RuleSpec {
            name: "ascii_control".to_string(),
            stage: Stage::Control,
            pattern: Some(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x7F]".to_string()),
            replace_with: String::new(),
            ..Default::default()
        }],
    };
    let merged = config::merge_rules(defaults.clone(), Some(user));

    assert_eq!(merged.rules.len(), defaults.rules.len());
    assert_eq!(merged.rules[position].name, "ascii_control");
    assert_eq!(merged.rules[position].replace_with, "");

    let sanitizer = Sanitizer::with_rules(merged).unwrap();
    assert_eq!(sanitizer.sanitize("a\u{7}b").unwrap(), "ab");
    assert_eq!(Sanitizer::new().sanitize("a\u{7}b").unwrap(), "a b");
}

#[test]
fn test_merge_rules_add_new() {
    let defaults = RuleSet::load_default_rules().unwrap();
    let user = RuleSet {
        rules: vec![RuleSpec {
            name: "ellipsis".to_string(),
            stage: Stage::Whitespace,
            pattern: Some(r"\.{3,}".to_string()),
            replace_with: "\u{2026}".to_string(),
            ..Default::default()
        }],
    };
    let merged = config::merge_rules(defaults.clone(), Some(user));
    assert_eq!(merged.rules.len(), defaults.rules.len() + 1);
    assert_eq!(merged.rules.last().unwrap().name, "ellipsis");

    let sanitizer = Sanitizer::with_rules(merged).unwrap();
    assert_eq!(sanitizer.sanitize("wait.....").unwrap(), "wait\u{2026}");
}

#[test]
fn test_set_active_rules_disables_emphasis() {
    let mut rules = RuleSet::load_default_rules().unwrap();
    rules.set_active_rules(
        &[],
        &[
            "italic_star".to_string(),
            "italic_underscore".to_string(),
            "no_such_rule".to_string(),
        ],
    );
    assert!(!rules.rules.iter().find(|r| r.name == "italic_star").unwrap().is_enabled());

    let sanitizer = Sanitizer::with_rules(rules).unwrap();
    assert_eq!(sanitizer.sanitize("*keep* this").unwrap(), "*keep* this");
    assert_eq!(sanitizer.sanitize("**bold** only").unwrap(), "bold only");
}

#[test]
fn test_sanitizer_from_rule_file() -> Result<()> {
    let file = write_rules(
        r#"
rules:
  - name: brand_name
    stage: control
    pattern: '(?i)acme corp'
    replace_with: "ACME Corp"
"#,
    )?;
    let sanitizer = Sanitizer::from_rule_file(file.path())?;
    assert_eq!(
        sanitizer.sanitize("we at **acme corp** say hi")?,
        "we at ACME Corp say hi"
    );
    Ok(())
}
