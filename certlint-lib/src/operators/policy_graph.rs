//! Certificate policy processing (RFC 5280 Section 6.1, simplified).
//!
//! Instead of a full valid_policy_tree the walk carries a flat set of valid
//! policy OIDs from the root down to the certificate under test, with
//! anyPolicy acting as a wildcard member.

use super::{string_operands, Operator, OperatorError};
use crate::context::EvaluationContext;
use crate::fields::CertificateInfo;
use crate::oid::ANY_POLICY;
use crate::tree::{AttributeNode, Value};
use std::collections::BTreeSet;

/// `certificatePolicyValid`: after policy processing down to the
/// certificate under test, one of the acceptable policies (the operands)
/// or anyPolicy is still valid. Without operands any surviving policy will
/// do.
#[derive(Debug, Clone, Copy)]
pub struct CertificatePolicyValid;

/// Chain step (root = 0) from which a skip-count constraint applies.
/// The first declaration wins.
fn record_threshold(slot: &mut Option<usize>, step: usize, skip: Option<u32>) {
    if slot.is_none() {
        if let Some(skip) = skip {
            *slot = Some(step + 1 + skip as usize);
        }
    }
}

fn active(threshold: Option<usize>, step: usize) -> bool {
    threshold.is_some_and(|t| t <= step)
}

/// Valid policy set after processing `path` (root first).
pub(crate) fn process_policies(path: &[&CertificateInfo]) -> (BTreeSet<String>, bool) {
    let mut valid: BTreeSet<String> = BTreeSet::from([ANY_POLICY.to_string()]);
    let mut require_explicit: Option<usize> = None;
    let mut inhibit_mapping: Option<usize> = None;
    let mut inhibit_any: Option<usize> = None;

    for (step, cert) in path.iter().enumerate() {
        let mut declared: BTreeSet<String> = cert
            .policies()
            .map(|p| p.iter().cloned().collect())
            .unwrap_or_default();
        if active(inhibit_any, step) {
            declared.remove(ANY_POLICY);
        }

        valid = if declared.is_empty() {
            BTreeSet::new()
        } else if valid.len() == 1 && valid.contains(ANY_POLICY) {
            declared
        } else {
            intersect(&valid, &declared)
        };

        if !active(inhibit_mapping, step) {
            for mapping in cert.policy_mappings() {
                if valid.contains(&mapping.issuer_domain_policy) {
                    valid.insert(mapping.subject_domain_policy.clone());
                }
            }
        }

        if let Some((explicit, mapping)) = cert.policy_constraints() {
            record_threshold(&mut require_explicit, step, explicit);
            record_threshold(&mut inhibit_mapping, step, mapping);
        }
        record_threshold(&mut inhibit_any, step, cert.inhibit_any_policy());
    }

    let last_step = path.len().saturating_sub(1);
    let explicit_required = active(require_explicit, last_step);
    if explicit_required {
        valid.remove(ANY_POLICY);
    }
    (valid, explicit_required)
}

/// Intersection where anyPolicy on either side admits the other side's
/// policies, and a declared anyPolicy is always kept.
fn intersect(valid: &BTreeSet<String>, declared: &BTreeSet<String>) -> BTreeSet<String> {
    let valid_any = valid.contains(ANY_POLICY);
    let declared_any = declared.contains(ANY_POLICY);
    let mut out: BTreeSet<String> = declared
        .iter()
        .filter(|p| valid_any || valid.contains(*p))
        .cloned()
        .collect();
    out.extend(
        valid
            .iter()
            .filter(|p| declared_any || declared.contains(*p))
            .cloned(),
    );
    if declared_any {
        out.insert(ANY_POLICY.to_string());
    }
    out
}

impl Operator for CertificatePolicyValid {
    fn name(&self) -> &'static str {
        "certificatePolicyValid"
    }

    fn evaluate(
        &self,
        _target: Option<&AttributeNode>,
        ctx: &EvaluationContext,
        operands: &[Value],
    ) -> Result<bool, OperatorError> {
        let Some(info) = ctx.cert.as_ref() else {
            return Ok(false);
        };
        if ctx.chain.is_empty() {
            return Ok(false);
        }

        // Root down to the certificate under test.
        let path: Vec<&CertificateInfo> = ctx
            .chain
            .iter()
            .skip(info.position)
            .rev()
            .map(|c| c.cert.as_ref())
            .collect();
        let (valid, explicit_required) = process_policies(&path);
        tracing::trace!(?valid, explicit_required, "policy processing done");

        if valid.contains(ANY_POLICY) {
            return Ok(true);
        }
        let acceptable = string_operands(operands);
        if acceptable.is_empty() {
            return Ok(!valid.is_empty());
        }
        Ok(acceptable.iter().any(|p| valid.contains(p)))
    }
}
