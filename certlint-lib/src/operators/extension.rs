use super::{Operator, OperatorError};
use crate::context::EvaluationContext;
use crate::oid;
use crate::tree::{AttributeNode, Value};

/// `isCritical` / `notCritical`: read the target's `critical` child. A
/// missing child means not critical; a missing target is `false` for both.
#[derive(Debug, Clone, Copy)]
pub struct Criticality {
    negate: bool,
}

impl Criticality {
    pub fn is_critical() -> Self {
        Criticality { negate: false }
    }

    pub fn not_critical() -> Self {
        Criticality { negate: true }
    }
}

impl Operator for Criticality {
    fn name(&self) -> &'static str {
        if self.negate {
            "notCritical"
        } else {
            "isCritical"
        }
    }

    fn evaluate(
        &self,
        target: Option<&AttributeNode>,
        _ctx: &EvaluationContext,
        _operands: &[Value],
    ) -> Result<bool, OperatorError> {
        let Some(node) = target else {
            return Ok(false);
        };
        let critical = node.critical().unwrap_or(false);
        Ok(critical != self.negate)
    }
}

/// `noUnknownCriticalExtensions`: every critical extension of the
/// certificate under test is one this tool recognizes.
#[derive(Debug, Clone, Copy)]
pub struct NoUnknownCriticalExtensions;

impl Operator for NoUnknownCriticalExtensions {
    fn name(&self) -> &'static str {
        "noUnknownCriticalExtensions"
    }

    fn evaluate(
        &self,
        _target: Option<&AttributeNode>,
        ctx: &EvaluationContext,
        _operands: &[Value],
    ) -> Result<bool, OperatorError> {
        let Some(cert) = ctx.certificate() else {
            return Ok(false);
        };
        let unknown: Vec<&str> = cert
            .extensions
            .iter()
            .filter(|ext| ext.critical && !oid::is_known_extension(&ext.oid))
            .map(|ext| ext.oid.as_str())
            .collect();
        if !unknown.is_empty() {
            tracing::debug!(?unknown, "unrecognized critical extensions");
        }
        Ok(unknown.is_empty())
    }
}
