#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing
)]
//! Generic value operators over hand-built trees.

mod common;

use certlint_lib::*;
use common::*;
use proptest::prelude::*;
use std::sync::Arc;
use time::macros::datetime;

/// A small tree with one of each value shape under `t`.
fn sample() -> EvaluationContext {
    let t = AttributeNode::new("t")
        .with_child(AttributeNode::leaf("int", 5))
        .with_child(AttributeNode::leaf("float", 2.5))
        .with_child(AttributeNode::leaf("str", "foo.example.com"))
        .with_child(AttributeNode::leaf("empty", ""))
        .with_child(AttributeNode::leaf("bytes", vec![0xab, 0xcd]))
        .with_child(AttributeNode::leaf("zero", vec![0x00, 0x00]))
        .with_child(AttributeNode::leaf(
            "list",
            Value::List(vec![Value::from("a"), Value::from("b"), Value::from(3)]),
        ))
        .with_child(AttributeNode::leaf("nil", Value::List(vec![])))
        .with_child(AttributeNode::leaf("time", datetime!(2030-01-01 00:00 UTC)))
        .with_child(AttributeNode::leaf("flag", true))
        .with_child(AttributeNode::leaf("decimal", "123456789012345678901234567890"))
        .with_child(AttributeNode::leaf("copy", "foo.example.com"))
        .with_child(
            AttributeNode::new("ext")
                .with_child(AttributeNode::leaf("critical", true))
                .with_child(AttributeNode::leaf("x", "y")),
        )
        .with_child(
            AttributeNode::new("plain").with_child(AttributeNode::leaf("x", "y")),
        )
        .with_child(AttributeNode::new("bare"));
    EvaluationContext::new(AttributeNode::new("").with_child(t)).with_now(fixed_now())
}

fn check(operator: &str, target: &str, operands: &[Value]) -> bool {
    run_on(&sample(), operator, target, operands).unwrap()
}

fn error(operator: &str, target: &str, operands: &[Value]) -> OperatorError {
    run_on(&sample(), operator, target, operands).unwrap_err()
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[test]
fn registry_has_every_builtin() {
    let registry = OperatorRegistry::with_defaults();
    assert_eq!(registry.len(), 40);
    for name in [
        "eq", "neq", "matches", "gt", "gte", "lt", "lte", "in", "notIn", "contains",
        "minLength", "maxLength", "isEmpty", "notEmpty", "regex", "notRegex", "before",
        "after", "isCritical", "notCritical", "positive", "present", "signedBy", "issuedBy",
        "akiMatchesSki", "pathLenValid", "nameConstraintsValid", "certificatePolicyValid",
        "crlValid", "crlNotExpired", "crlSignedBy", "notRevoked", "ocspValid",
        "ocspNotExpired", "ocspSignedBy", "notRevokedOCSP", "ocspGood", "keyAlgorithm",
        "minKeySize", "noUnknownCriticalExtensions",
    ] {
        assert_eq!(registry.get(name).unwrap().name(), name);
    }
    let names = registry.names();
    let mut sorted = names.clone();
    sorted.sort_unstable();
    assert_eq!(names, sorted);
}

#[test]
fn unknown_operator_is_not_found() {
    let registry = OperatorRegistry::with_defaults();
    assert_eq!(
        registry.get("frobnicate").err(),
        Some(OperatorError::NotFound("frobnicate".into()))
    );
    assert!(OperatorRegistry::new().is_empty());
}

#[test]
fn custom_operator_can_be_registered() {
    struct Always;
    impl Operator for Always {
        fn name(&self) -> &'static str {
            "always"
        }
        fn evaluate(
            &self,
            _target: Option<&AttributeNode>,
            _ctx: &EvaluationContext,
            _operands: &[Value],
        ) -> Result<bool, OperatorError> {
            Ok(true)
        }
    }
    let mut registry = OperatorRegistry::new();
    registry.register(Always);
    assert_eq!(registry.names(), vec!["always"]);
    let ctx = sample();
    assert!(registry.get("always").unwrap().evaluate(None, &ctx, &[]).unwrap());
}

// ---------------------------------------------------------------------------
// Equality
// ---------------------------------------------------------------------------

#[test]
fn eq_and_neq() {
    assert!(check("eq", "t.int", &[Value::from(5)]));
    assert!(check("eq", "t.int", &[Value::from(5.0)]));
    assert!(!check("eq", "t.int", &[Value::from("5")]));
    assert!(check("neq", "t.int", &[Value::from(6)]));
    assert!(check("eq", "t.str", &[Value::from("foo.example.com")]));
    assert!(check("eq", "t.flag", &[Value::from(true)]));
}

#[test]
fn eq_compares_bytes_with_hex_text() {
    assert!(check("eq", "t.bytes", &[Value::from("AB:CD")]));
    assert!(check("eq", "t.bytes", &[Value::from("abcd")]));
    assert!(!check("eq", "t.bytes", &[Value::from("abce")]));
}

#[test]
fn eq_compares_lists_deeply() {
    let list = Value::List(vec![Value::from("a"), Value::from("b"), Value::from(3.0)]);
    assert!(check("eq", "t.list", &[list]));
    assert!(!check("eq", "t.list", &[Value::List(vec![Value::from("a")])]));
}

#[test]
fn eq_with_wrong_operand_count_is_false_both_ways() {
    assert!(!check("eq", "t.int", &[]));
    assert!(!check("neq", "t.int", &[]));
    assert!(!check("eq", "t.int", &[Value::from(5), Value::from(5)]));
    assert!(!check("neq", "t.int", &[Value::from(5), Value::from(5)]));
}

#[test]
fn eq_on_missing_target_is_false_both_ways() {
    assert!(!check("eq", "t.missing", &[Value::from(1)]));
    assert!(!check("neq", "t.missing", &[Value::from(1)]));
}

#[test]
fn missing_target_is_false_before_operands_are_checked() {
    for (operator, operands) in [
        ("gt", vec![]),
        ("lte", vec![Value::from("x")]),
        ("in", vec![]),
        ("notIn", vec![]),
        ("contains", vec![]),
        ("regex", vec![Value::from("(")]),
        ("notRegex", vec![Value::from(1)]),
        ("before", vec![Value::from("garbage")]),
        ("after", vec![Value::from(1), Value::from(2)]),
        ("minLength", vec![Value::from("x")]),
        ("maxLength", vec![Value::from(-1)]),
        ("matches", vec![Value::from(1)]),
    ] {
        assert_eq!(
            run_on(&sample(), operator, "t.missing", &operands),
            Ok(false),
            "{} on a missing target",
            operator
        );
    }
}

#[test]
fn matches_compares_two_paths() {
    assert!(check("matches", "t.str", &[Value::from("t.copy")]));
    assert!(!check("matches", "t.str", &[Value::from("t.int")]));
    assert!(!check("matches", "t.str", &[Value::from("t.missing")]));
    assert!(matches!(
        error("matches", "t.str", &[Value::from(1)]),
        OperatorError::InvalidOperand { .. }
    ));
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

#[test]
fn numeric_comparisons() {
    assert!(check("gte", "t.int", &[Value::from(5)]));
    assert!(!check("gt", "t.int", &[Value::from(5)]));
    assert!(check("lte", "t.int", &[Value::from(5)]));
    assert!(!check("lt", "t.int", &[Value::from(5)]));
    assert!(check("lt", "t.float", &[Value::from(3)]));
    assert!(check("gt", "t.int", &[Value::from(4.5)]));
}

#[test]
fn comparisons_reject_non_numbers() {
    assert!(matches!(
        error("lt", "t.int", &[Value::from("not a number")]),
        OperatorError::NotNumeric { .. }
    ));
    assert!(matches!(
        error("gt", "t.str", &[Value::from(1)]),
        OperatorError::NotNumeric { .. }
    ));
    assert!(matches!(
        error("gt", "t.int", &[]),
        OperatorError::Arity { got: 0, .. }
    ));
    // A missing target is a plain failure.
    assert!(!check("gt", "t.missing", &[Value::from(1)]));
}

#[test]
fn positive_reads_several_shapes() {
    assert!(check("positive", "t.int", &[]));
    assert!(check("positive", "t.bytes", &[]));
    assert!(!check("positive", "t.zero", &[]));
    assert!(check("positive", "t.decimal", &[]));
    assert!(!check("positive", "t.flag", &[]));
    assert!(!check("positive", "t.missing", &[]));

    let tree = build_tree(&load("leaf.pem"));
    let ctx = EvaluationContext::new(tree);
    assert!(run_on(&ctx, "positive", "certificate.serialNumber", &[]).unwrap());
    assert!(run_on(&ctx, "positive", "certificate.serialNumber.decimal", &[]).unwrap());
}

// ---------------------------------------------------------------------------
// Membership
// ---------------------------------------------------------------------------

#[test]
fn in_and_not_in() {
    assert!(check("in", "t.int", &[Value::from(1), Value::from(5)]));
    assert!(check("in", "t.int", &[Value::from("5")]));
    assert!(check("notIn", "t.str", &[Value::from("bar"), Value::from("baz")]));
    assert!(!check("in", "t.missing", &[Value::from(1)]));
    assert!(!check("notIn", "t.missing", &[Value::from(1)]));
    assert!(matches!(
        error("in", "t.int", &[]),
        OperatorError::Arity { .. }
    ));
}

#[test]
fn contains_over_lists_strings_and_children() {
    assert!(check("contains", "t.list", &[Value::from("b")]));
    assert!(check("contains", "t.list", &[Value::from(3)]));
    assert!(!check("contains", "t.list", &[Value::from("c")]));
    assert!(check("contains", "t.str", &[Value::from("example")]));
    assert!(check("contains", "t.plain", &[Value::from("y")]));
    assert!(!check("contains", "t.plain", &[Value::from("z")]));
    assert!(!check("contains", "t.missing", &[Value::from("z")]));
    assert!(matches!(
        error("contains", "t.int", &[Value::from(5)]),
        OperatorError::UnsupportedShape { .. }
    ));
}

#[test]
fn contains_finds_san_entries() {
    let ctx = EvaluationContext::new(build_tree(&load("leaf.pem")));
    let dns = "certificate.subjectAltName.dns";
    assert!(run_on(&ctx, "contains", dns, &[Value::from("www.example.com")]).unwrap());
    assert!(!run_on(&ctx, "contains", dns, &[Value::from("bar.example.com")]).unwrap());
    let server_auth = [Value::from("1.3.6.1.5.5.7.3.1")];
    assert!(run_on(&ctx, "contains", "certificate.extendedKeyUsage", &server_auth).unwrap());
}

// ---------------------------------------------------------------------------
// Length and presence
// ---------------------------------------------------------------------------

#[test]
fn length_bounds() {
    assert!(check("minLength", "t.str", &[Value::from(15)]));
    assert!(!check("minLength", "t.str", &[Value::from(16)]));
    assert!(check("maxLength", "t.list", &[Value::from(3)]));
    assert!(check("maxLength", "t.bytes", &[Value::from(2)]));
    assert!(check("minLength", "t.plain", &[Value::from(1)]));
    assert!(!check("minLength", "t.int", &[Value::from(0)]));
    assert!(!check("minLength", "t.missing", &[Value::from(0)]));
    assert!(matches!(
        error("maxLength", "t.str", &[Value::from(-1)]),
        OperatorError::InvalidOperand { .. }
    ));
}

#[test]
fn emptiness() {
    assert!(check("isEmpty", "t.empty", &[]));
    assert!(check("isEmpty", "t.nil", &[]));
    assert!(check("isEmpty", "t.bare", &[]));
    assert!(check("isEmpty", "t.missing", &[]));
    assert!(!check("notEmpty", "t.missing", &[]));
    assert!(check("notEmpty", "t.list", &[]));
    assert!(check("notEmpty", "t.int", &[]));
    assert!(check("notEmpty", "t.plain", &[]));
}

#[test]
fn present_only_checks_existence() {
    assert!(check("present", "t.bare", &[]));
    assert!(check("present", "t.empty", &[]));
    assert!(!check("present", "t.missing", &[]));
}

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

#[test]
fn regex_and_not_regex() {
    assert!(check("regex", "t.str", &[Value::from(r"^[a-z.]+$")]));
    assert!(!check("regex", "t.str", &[Value::from(r"^bar")]));
    assert!(check("notRegex", "t.str", &[Value::from(r"\*")]));
    // Non-strings never match either way.
    assert!(!check("regex", "t.int", &[Value::from(".*")]));
    assert!(!check("notRegex", "t.int", &[Value::from(".*")]));
    assert!(!check("regex", "t.missing", &[Value::from(".*")]));
}

#[test]
fn invalid_pattern_is_an_error() {
    let err = error("regex", "t.str", &[Value::from("(unclosed")]);
    assert!(matches!(err, OperatorError::InvalidPattern { .. }));
    assert!(err.to_string().contains("(unclosed"));
}

#[test]
fn regex_cache_compiles_once() {
    let cache = RegexCache::new();
    assert!(cache.is_empty());
    let a = cache.get_or_compile("^a+$").unwrap();
    let b = cache.get_or_compile("^a+$").unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(cache.len(), 1);
    assert!(cache.get_or_compile("[").is_err());
    assert_eq!(cache.len(), 1);
}

#[test]
fn regex_cache_is_shared_across_threads() {
    let cache = Arc::new(RegexCache::new());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || {
                let re = cache.get_or_compile(r"^\d+$").unwrap();
                assert!(re.is_match(&i.to_string()));
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(cache.len(), 1);
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

#[test]
fn before_and_after_the_context_clock() {
    // fixed_now is 2026-06-01.
    assert!(check("after", "t.time", &[]));
    assert!(check("after", "t.time", &[Value::from("now")]));
    assert!(!check("before", "t.time", &[]));
}

#[test]
fn temporal_operand_formats() {
    assert!(check("before", "t.time", &[Value::from("2030-01-02")]));
    assert!(check("before", "t.time", &[Value::from("2030-01-01T00:00:01Z")]));
    assert!(check("after", "t.time", &[Value::from("2029-12-31T23:59:59+00:00")]));
    assert!(!check("after", "t.time", &[Value::from("2030-01-01T00:00:00Z")]));
    // Unix seconds: 2030-01-01 is 1893456000.
    assert!(check("before", "t.time", &[Value::from(1_893_456_001_i64)]));
    assert!(matches!(
        error("before", "t.time", &[Value::from("next tuesday")]),
        OperatorError::InvalidTimestamp { .. }
    ));
    assert!(matches!(
        error("before", "t.str", &[]),
        OperatorError::UnsupportedShape { .. }
    ));
    assert!(!check("before", "t.missing", &[]));
}

#[test]
fn validity_rules_on_the_fixture_leaf() {
    let chain = pki_chain();
    let ctx = context_at(&chain, 0);
    assert!(run_on(&ctx, "before", "certificate.validity.notBefore", &[]).unwrap());
    assert!(run_on(&ctx, "after", "certificate.validity.notAfter", &[]).unwrap());
    assert!(run_on(&ctx, "lte", "certificate.validity.days", &[Value::from(3652)]).unwrap());
    assert!(!run_on(&ctx, "lte", "certificate.validity.days", &[Value::from(398)]).unwrap());

    let late = ctx.with_now(datetime!(2036-01-01 00:00 UTC));
    assert!(!run_on(&late, "after", "certificate.validity.notAfter", &[]).unwrap());
}

// ---------------------------------------------------------------------------
// Criticality
// ---------------------------------------------------------------------------

#[test]
fn criticality() {
    assert!(check("isCritical", "t.ext", &[]));
    assert!(!check("notCritical", "t.ext", &[]));
    assert!(check("notCritical", "t.plain", &[]));
    assert!(!check("isCritical", "t.missing", &[]));
    assert!(!check("notCritical", "t.missing", &[]));

    let ctx = EvaluationContext::new(build_tree(&load("int.pem")));
    assert!(run_on(&ctx, "isCritical", "certificate.nameConstraints", &[]).unwrap());
    assert!(run_on(&ctx, "isCritical", "certificate.extensions.2.5.29.19", &[]).unwrap());
    assert!(run_on(&ctx, "notCritical", "certificate.certificatePolicies", &[]).unwrap());
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        "[a-z0-9]{0,8}".prop_map(Value::String),
        proptest::collection::vec(any::<u8>(), 0..4).prop_map(Value::Bytes),
    ]
}

fn ctx_with(value: Value) -> EvaluationContext {
    EvaluationContext::new(AttributeNode::new("").with_child(AttributeNode::leaf("v", value)))
}

proptest! {
    #[test]
    fn eq_and_neq_are_complementary(value in scalar(), operand in scalar()) {
        let ctx = ctx_with(value);
        let eq = run_on(&ctx, "eq", "v", std::slice::from_ref(&operand)).unwrap();
        let neq = run_on(&ctx, "neq", "v", &[operand]).unwrap();
        prop_assert_ne!(eq, neq);
    }

    #[test]
    fn in_and_not_in_are_complementary(
        value in scalar(),
        operands in proptest::collection::vec(scalar(), 1..4),
    ) {
        let ctx = ctx_with(value);
        let is_in = run_on(&ctx, "in", "v", &operands).unwrap();
        let not_in = run_on(&ctx, "notIn", "v", &operands).unwrap();
        prop_assert_ne!(is_in, not_in);
    }

    #[test]
    fn gte_is_gt_or_eq(a in -1000i64..1000, b in -1000i64..1000) {
        let ctx = ctx_with(Value::Int(a));
        let gte = run_on(&ctx, "gte", "v", &[Value::Int(b)]).unwrap();
        let gt = run_on(&ctx, "gt", "v", &[Value::Int(b)]).unwrap();
        let eq = run_on(&ctx, "eq", "v", &[Value::Int(b)]).unwrap();
        prop_assert_eq!(gte, gt || eq);
    }
}
