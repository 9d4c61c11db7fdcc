#![no_main]

use libfuzzer_sys::fuzz_target;
use certlint_lib::{build_tree, parse_cert, ChainCertInfo, EvaluationContext, Evaluator, Rule};

fuzz_target!(|data: &[u8]| {
    // Parsing and tree building must never panic, regardless of input.
    if let Ok(cert) = parse_cert(data) {
        let tree = build_tree(&cert);
        for (path, _) in tree.walk() {
            let _ = tree.resolve(&path);
        }
        let _ = certlint_lib::display_tree(&tree);

        // Run every operator once against the parsed certificate.
        let info = ChainCertInfo::new(cert, None);
        let chain = certlint_lib::build_chain(vec![info]).unwrap_or_default();
        let Some(first) = chain.first().cloned() else {
            return;
        };
        let ctx = EvaluationContext::new(tree).with_cert(first).with_chain(chain);
        let evaluator = Evaluator::default();
        for name in evaluator.registry().names() {
            let rule = Rule {
                id: name.to_string(),
                target: "certificate".to_string(),
                operator: name.to_string(),
                operands: vec![],
                severity: Default::default(),
                applies_to: vec![],
                description: None,
            };
            let _ = evaluator.evaluate_rule(&rule, &ctx);
        }
    }
});
