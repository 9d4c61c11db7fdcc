//! Policies, rules, and the evaluator that runs them against one context.

mod loader;

pub use loader::{load_policies, load_policy_dir, load_policy_file, parse_policies};

use crate::chain::CertType;
use crate::context::EvaluationContext;
use crate::operators::OperatorRegistry;
use crate::tree::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How much a failing rule matters. Only `error` failures fail a policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// One declarative check: `operator(resolve(target), operands...)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rule {
    pub id: String,
    /// Dotted path into the attribute tree; empty means the tree root.
    #[serde(default)]
    pub target: String,
    pub operator: String,
    #[serde(default)]
    pub operands: Vec<Value>,
    #[serde(default)]
    pub severity: Severity,
    /// Certificate types the rule applies to; empty means all.
    #[serde(default, rename = "appliesTo", alias = "applies_to")]
    pub applies_to: Vec<CertType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A named, ordered list of rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Policy {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Fail,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => write!(f, "pass"),
            Verdict::Fail => write!(f, "fail"),
        }
    }
}

/// Outcome of one rule. Skipped rules count as passed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleResult {
    pub rule_id: String,
    pub passed: bool,
    pub skipped: bool,
    pub message: String,
    pub severity: Severity,
}

/// Outcome of one policy against one certificate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyResult {
    pub policy_id: String,
    pub verdict: Verdict,
    pub results: Vec<RuleResult>,
}

impl PolicyResult {
    /// Rules that ran and failed, in policy order.
    pub fn failures(&self) -> impl Iterator<Item = &RuleResult> {
        self.results.iter().filter(|r| !r.passed)
    }
}

/// Runs rules and policies. Holds no per-evaluation state.
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    registry: OperatorRegistry,
}

impl Evaluator {
    pub fn new(registry: OperatorRegistry) -> Self {
        Evaluator { registry }
    }

    pub fn registry(&self) -> &OperatorRegistry {
        &self.registry
    }

    /// Evaluate one rule.
    ///
    /// Unknown operators and operator errors fail the rule with the error
    /// text as message; they never abort evaluation.
    pub fn evaluate_rule(&self, rule: &Rule, ctx: &EvaluationContext) -> RuleResult {
        let result = |passed: bool, skipped: bool, message: String| RuleResult {
            rule_id: rule.id.clone(),
            passed,
            skipped,
            message,
            severity: rule.severity,
        };

        if !rule.applies_to.is_empty() {
            let applies = ctx
                .cert_type()
                .is_some_and(|t| rule.applies_to.contains(&t));
            if !applies {
                tracing::trace!(rule = %rule.id, "rule skipped");
                let message = format!("skipped: applies to {}", join(&rule.applies_to));
                return result(true, true, message);
            }
        }

        let operator = match self.registry.get(&rule.operator) {
            Ok(op) => op,
            Err(e) => {
                tracing::debug!(rule = %rule.id, operator = %rule.operator, "operator not found");
                return result(false, false, e.to_string());
            }
        };

        let target = ctx.root.resolve(&rule.target);
        match operator.evaluate(target, ctx, &rule.operands) {
            Ok(true) => result(true, false, "passed".to_string()),
            Ok(false) => {
                let value = target.and_then(|n| n.value.as_ref());
                result(false, false, failure_message(rule, value))
            }
            Err(e) => {
                tracing::debug!(rule = %rule.id, error = %e, "operator error");
                result(false, false, e.to_string())
            }
        }
    }

    /// Evaluate every rule of `policy`. The verdict is `fail` iff some
    /// error-severity rule failed; every rule runs regardless.
    pub fn evaluate_policy(&self, policy: &Policy, ctx: &EvaluationContext) -> PolicyResult {
        let results: Vec<RuleResult> = policy
            .rules
            .iter()
            .map(|rule| self.evaluate_rule(rule, ctx))
            .collect();
        let failed = results
            .iter()
            .any(|r| !r.passed && r.severity == Severity::Error);
        PolicyResult {
            policy_id: policy.id.clone(),
            verdict: if failed { Verdict::Fail } else { Verdict::Pass },
            results,
        }
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn failure_message(rule: &Rule, actual: Option<&Value>) -> String {
    let target = if rule.target.is_empty() {
        "<root>"
    } else {
        rule.target.as_str()
    };
    let mut msg = match actual {
        Some(value) => format!("{} ({}) failed {}", target, value, rule.operator),
        None => format!("{} failed {}", target, rule.operator),
    };
    if !rule.operands.is_empty() {
        msg.push_str(&format!(" [{}]", join(&rule.operands)));
    }
    msg
}
