//! YAML policy documents.
//!
//! A document holds one policy, a list of policies, or a mapping with a
//! `policies` list. Several documents may share a file, separated by `---`.

use super::Policy;
use crate::LintError;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use walkdir::WalkDir;

/// Parse every policy in a YAML text.
pub fn parse_policies(text: &str) -> Result<Vec<Policy>, LintError> {
    let mut policies = Vec::new();
    for document in serde_yaml::Deserializer::from_str(text) {
        let value = serde_yaml::Value::deserialize(document)?;
        match value {
            serde_yaml::Value::Null => {}
            serde_yaml::Value::Sequence(_) => {
                policies.extend(serde_yaml::from_value::<Vec<Policy>>(value)?);
            }
            serde_yaml::Value::Mapping(ref map) if map.contains_key("policies") => {
                let list = map.get("policies").cloned().unwrap_or_default();
                policies.extend(serde_yaml::from_value::<Vec<Policy>>(list)?);
            }
            other => policies.push(serde_yaml::from_value::<Policy>(other)?),
        }
    }
    for policy in &policies {
        validate(policy)?;
    }
    Ok(policies)
}

fn validate(policy: &Policy) -> Result<(), LintError> {
    if policy.id.trim().is_empty() {
        return Err(LintError::PolicyError("policy with empty id".into()));
    }
    let mut seen = HashSet::new();
    for rule in &policy.rules {
        if rule.id.trim().is_empty() {
            return Err(LintError::PolicyError(format!(
                "policy {}: rule with empty id",
                policy.id
            )));
        }
        if rule.operator.trim().is_empty() {
            return Err(LintError::PolicyError(format!(
                "policy {}: rule {} has no operator",
                policy.id, rule.id
            )));
        }
        if !seen.insert(rule.id.as_str()) {
            return Err(LintError::PolicyError(format!(
                "policy {}: duplicate rule id {}",
                policy.id, rule.id
            )));
        }
    }
    Ok(())
}

/// Load the policies of one YAML file.
pub fn load_policy_file(path: &Path) -> Result<Vec<Policy>, LintError> {
    let text = std::fs::read_to_string(path)?;
    let policies = parse_policies(&text).map_err(|e| match e {
        LintError::Yaml(inner) => {
            LintError::PolicyError(format!("{}: {}", path.display(), inner))
        }
        other => other,
    })?;
    tracing::debug!(path = %path.display(), count = policies.len(), "loaded policies");
    Ok(policies)
}

/// Load every `.yaml` / `.yml` file below `dir`, in path order.
pub fn load_policy_dir(dir: &Path) -> Result<Vec<Policy>, LintError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.map_err(|e| LintError::PolicyError(e.to_string()))?;
        if entry.file_type().is_file() && is_yaml(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files.sort();

    let mut policies = Vec::new();
    for file in &files {
        policies.extend(load_policy_file(file)?);
    }
    Ok(policies)
}

/// Load a policy file, or every policy file of a directory.
pub fn load_policies(path: &Path) -> Result<Vec<Policy>, LintError> {
    if path.is_dir() {
        load_policy_dir(path)
    } else {
        load_policy_file(path)
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
}
