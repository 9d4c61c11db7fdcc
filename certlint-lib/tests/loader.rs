#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing
)]
//! YAML policy documents.

use certlint_lib::*;
use std::fs;

const SINGLE: &str = r#"
id: tls-server
description: Basic TLS server checks
rules:
  - id: cn-present
    target: certificate.subject.CN
    operator: notEmpty
  - id: short-validity
    target: certificate.validity.days
    operator: lte
    operands: [398]
    severity: warning
    appliesTo: [leaf]
  - id: dns-suffix
    target: certificate.subject.CN
    operator: regex
    operands: ['\.example\.com$']
"#;

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

#[test]
fn single_policy_document() {
    let policies = parse_policies(SINGLE).unwrap();
    assert_eq!(policies.len(), 1);
    let p = &policies[0];
    assert_eq!(p.id, "tls-server");
    assert_eq!(p.description.as_deref(), Some("Basic TLS server checks"));
    assert_eq!(p.rules.len(), 3);

    let cn = &p.rules[0];
    assert_eq!(cn.operator, "notEmpty");
    assert!(cn.operands.is_empty());
    assert_eq!(cn.severity, Severity::Error);
    assert!(cn.applies_to.is_empty());

    let validity = &p.rules[1];
    assert_eq!(validity.operands, vec![Value::Int(398)]);
    assert_eq!(validity.severity, Severity::Warning);
    assert_eq!(validity.applies_to, vec![CertType::Leaf]);

    assert_eq!(p.rules[2].operands, vec![Value::from(r"\.example\.com$")]);
}

#[test]
fn list_and_wrapped_forms() {
    let list = r#"
- id: a
  rules:
    - {id: r1, target: certificate.version, operator: eq, operands: [3]}
- id: b
  rules: []
"#;
    let policies = parse_policies(list).unwrap();
    let ids: Vec<&str> = policies.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);

    let wrapped = r#"
policies:
  - id: c
    rules:
      - {id: r1, operator: present}
"#;
    let policies = parse_policies(wrapped).unwrap();
    assert_eq!(policies.len(), 1);
    assert_eq!(policies[0].rules[0].target, "");
}

#[test]
fn multiple_documents_in_one_text() {
    let text = "id: one\nrules: []\n---\nid: two\nrules: []\n---\n";
    let policies = parse_policies(text).unwrap();
    let ids: Vec<&str> = policies.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["one", "two"]);
    assert!(parse_policies("").unwrap().is_empty());
}

#[test]
fn operand_shapes() {
    let text = r#"
id: shapes
rules:
  - id: mixed
    operator: in
    operands: [true, -7, 2.5, "text", [a, b], 18446744073709551615]
  - id: snake
    operator: present
    applies_to: [root, intermediate]
"#;
    let p = &parse_policies(text).unwrap()[0];
    assert_eq!(
        p.rules[0].operands,
        vec![
            Value::Bool(true),
            Value::Int(-7),
            Value::Float(2.5),
            Value::from("text"),
            Value::List(vec![Value::from("a"), Value::from("b")]),
            Value::UInt(u64::MAX),
        ]
    );
    assert_eq!(
        p.rules[1].applies_to,
        vec![CertType::Root, CertType::Intermediate]
    );
}

#[test]
fn invalid_documents_are_rejected() {
    // Unknown field.
    assert!(parse_policies("id: p\nrulez: []\n").is_err());
    // Unknown severity and position names.
    assert!(parse_policies("id: p\nrules: [{id: r, operator: eq, severity: fatal}]\n").is_err());
    assert!(parse_policies("id: p\nrules: [{id: r, operator: eq, appliesTo: [ca]}]\n").is_err());
    // Missing operator.
    assert!(parse_policies("id: p\nrules: [{id: r}]\n").is_err());
    // Not YAML at all.
    assert!(parse_policies("id: [unclosed").is_err());
}

#[test]
fn semantic_validation() {
    let dup = "id: p\nrules:\n  - {id: r, operator: eq}\n  - {id: r, operator: neq}\n";
    let err = parse_policies(dup).unwrap_err();
    assert!(matches!(err, LintError::PolicyError(_)));
    assert!(err.to_string().contains("duplicate rule id r"));

    assert!(matches!(
        parse_policies("id: ''\nrules: []\n"),
        Err(LintError::PolicyError(_))
    ));
    assert!(matches!(
        parse_policies("id: p\nrules: [{id: r, operator: ' '}]\n"),
        Err(LintError::PolicyError(_))
    ));
}

// ---------------------------------------------------------------------------
// Files and directories
// ---------------------------------------------------------------------------

#[test]
fn load_file_and_directory() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("b.yaml"), "id: second\nrules: []\n").unwrap();
    fs::write(dir.path().join("a.yml"), "id: first\nrules: []\n").unwrap();
    fs::write(dir.path().join("notes.txt"), "not a policy").unwrap();
    fs::create_dir(dir.path().join("nested")).unwrap();
    fs::write(dir.path().join("nested/c.YAML"), "id: third\nrules: []\n").unwrap();

    let single = load_policy_file(&dir.path().join("b.yaml")).unwrap();
    assert_eq!(single[0].id, "second");

    let all = load_policy_dir(dir.path()).unwrap();
    let ids: Vec<&str> = all.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["first", "second", "third"]);

    assert_eq!(load_policies(dir.path()).unwrap(), all);
    assert_eq!(load_policies(&dir.path().join("a.yml")).unwrap()[0].id, "first");
}

#[test]
fn file_errors_name_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.yaml");
    fs::write(&path, "id: p\nrulez: []\n").unwrap();
    let err = load_policy_file(&path).unwrap_err();
    assert!(matches!(err, LintError::PolicyError(_)));
    assert!(err.to_string().contains("broken.yaml"));

    assert!(matches!(
        load_policy_file(&dir.path().join("missing.yaml")),
        Err(LintError::Io(_))
    ));
}

#[test]
fn bundled_policies_parse() {
    let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../policies");
    let policies = load_policy_dir(&dir).unwrap();
    assert!(!policies.is_empty());
    let registry = OperatorRegistry::with_defaults();
    for policy in &policies {
        for rule in &policy.rules {
            assert!(
                registry.get(&rule.operator).is_ok(),
                "{}/{} uses unknown operator {}",
                policy.id,
                rule.id,
                rule.operator
            );
        }
    }
}
