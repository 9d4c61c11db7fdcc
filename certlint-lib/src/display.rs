//! Human-readable, JSON and YAML formatting of lint reports and trees.

use crate::linter::{CertificateReport, RunReport};
use crate::policy::{PolicyResult, Severity, Verdict};
use crate::tree::AttributeNode;
use crate::LintError;

/// Format a run report as text.
///
/// With `failures_only`, passing rules and passing policies are left out;
/// certificate headers are always printed.
pub fn display_text(report: &RunReport, failures_only: bool) -> String {
    let mut out = String::new();

    for cert in &report.certificates {
        format_certificate(&mut out, cert, failures_only);
    }

    let total = report.certificates.len();
    let failed = report
        .certificates
        .iter()
        .filter(|c| c.verdict == Verdict::Fail)
        .count();
    out.push_str(&format!(
        "Result: {} ({} of {} certificates failed, {} policy failures)\n",
        report.verdict.to_string().to_uppercase(),
        failed,
        total,
        report.failed_policies()
    ));
    out
}

fn format_certificate(out: &mut String, cert: &CertificateReport, failures_only: bool) {
    out.push_str(&format!(
        "[{}] {} #{}: {}\n",
        cert.verdict.to_string().to_uppercase(),
        cert.cert_type,
        cert.position,
        cert.subject
    ));
    if let Some(file) = &cert.file {
        out.push_str(&format!("  File: {}\n", file));
    }
    out.push_str(&format!("  SHA-256: {}\n", cert.hash));

    for policy in &cert.policies {
        if failures_only && policy.verdict == Verdict::Pass && policy.failures().next().is_none() {
            continue;
        }
        format_policy(out, policy, failures_only);
    }
    out.push('\n');
}

fn format_policy(out: &mut String, policy: &PolicyResult, failures_only: bool) {
    out.push_str(&format!("  Policy {}: {}\n", policy.policy_id, policy.verdict));
    for rule in &policy.results {
        if failures_only && rule.passed {
            continue;
        }
        let mark = if rule.skipped {
            "SKIP"
        } else if rule.passed {
            "PASS"
        } else {
            match rule.severity {
                Severity::Error => "FAIL",
                Severity::Warning => "WARN",
                Severity::Info => "INFO",
            }
        };
        out.push_str(&format!("    {:<4} {}", mark, rule.rule_id));
        if !rule.passed || rule.skipped {
            out.push_str(&format!(": {}", rule.message));
        }
        out.push('\n');
    }
}

/// Serialize a run report to pretty-printed JSON.
pub fn to_json(report: &RunReport) -> Result<String, LintError> {
    serde_json::to_string_pretty(report).map_err(LintError::Json)
}

/// Serialize a run report to YAML.
pub fn to_yaml(report: &RunReport) -> Result<String, LintError> {
    serde_yaml::to_string(report).map_err(LintError::Yaml)
}

/// Render an attribute tree as one `path = value` line per node.
pub fn display_tree(root: &AttributeNode) -> String {
    let mut out = String::new();
    for (path, node) in root.walk() {
        if path.is_empty() {
            continue;
        }
        match &node.value {
            Some(value) => out.push_str(&format!("{} = {}\n", path, value)),
            None => out.push_str(&format!("{}\n", path)),
        }
    }
    out
}
