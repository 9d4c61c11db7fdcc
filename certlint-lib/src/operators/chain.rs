//! Operators over the issuer linkage of the chain.

use super::{Operator, OperatorError};
use crate::chain::CertType;
use crate::context::EvaluationContext;
use crate::parser::verify_issued_by;
use crate::tree::{AttributeNode, Value};

/// `signedBy`: the certificate's signature verifies with the key of its
/// chain issuer (itself for a root).
#[derive(Debug, Clone, Copy)]
pub struct SignedBy;

impl Operator for SignedBy {
    fn name(&self) -> &'static str {
        "signedBy"
    }

    fn evaluate(
        &self,
        _target: Option<&AttributeNode>,
        ctx: &EvaluationContext,
        _operands: &[Value],
    ) -> Result<bool, OperatorError> {
        let (Some(cert), Some(issuer)) = (ctx.certificate(), ctx.issuer()) else {
            return Ok(false);
        };
        Ok(verify_issued_by(cert, issuer))
    }
}

/// `issuedBy`: the certificate's issuer name equals its chain issuer's
/// subject name.
#[derive(Debug, Clone, Copy)]
pub struct IssuedBy;

impl Operator for IssuedBy {
    fn name(&self) -> &'static str {
        "issuedBy"
    }

    fn evaluate(
        &self,
        _target: Option<&AttributeNode>,
        ctx: &EvaluationContext,
        _operands: &[Value],
    ) -> Result<bool, OperatorError> {
        let (Some(cert), Some(issuer)) = (ctx.certificate(), ctx.issuer()) else {
            return Ok(false);
        };
        Ok(cert.issuer_string() == issuer.subject_string())
    }
}

/// `akiMatchesSki`: the Authority Key Identifier equals the issuer's Subject
/// Key Identifier. Passes when either identifier is absent, since the link
/// cannot be checked.
#[derive(Debug, Clone, Copy)]
pub struct AkiMatchesSki;

impl Operator for AkiMatchesSki {
    fn name(&self) -> &'static str {
        "akiMatchesSki"
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
        if ctx.chain.is_empty() {
            return Ok(false);
        }
        let Some(aki) = cert.authority_key_id() else {
            return Ok(true);
        };
        let Some(issuer) = ctx.issuer() else {
            return Ok(false);
        };
        Ok(issuer.subject_key_id().map_or(true, |ski| ski == aki))
    }
}

/// `pathLenValid`: no basicConstraints pathLenConstraint along the chain is
/// exceeded by the CA certificates below it. Only subordinate CAs count;
/// the leaf never does.
#[derive(Debug, Clone, Copy)]
pub struct PathLenValid;

impl Operator for PathLenValid {
    fn name(&self) -> &'static str {
        "pathLenValid"
    }

    fn evaluate(
        &self,
        _target: Option<&AttributeNode>,
        ctx: &EvaluationContext,
        _operands: &[Value],
    ) -> Result<bool, OperatorError> {
        let Some(info) = ctx.cert.as_ref() else {
            return Ok(false);
        };
        if ctx.chain.is_empty() {
            return Ok(false);
        }
        if info.cert_type == CertType::Root {
            return Ok(true);
        }

        let position = info.position;
        let ca_below = ctx
            .chain
            .iter()
            .take(position)
            .filter(|c| c.cert.is_ca())
            .count();

        for (idx, issuer) in ctx.chain.iter().enumerate().skip(position) {
            let Some(max) = issuer.cert.path_len_constraint() else {
                continue;
            };
            // CA certificates strictly between the chain start and this issuer.
            let intermediates = ctx
                .chain
                .iter()
                .take(idx)
                .skip(1)
                .filter(|c| c.cert.is_ca())
                .count();
            if intermediates > max as usize {
                tracing::debug!(
                    issuer = %issuer.subject(),
                    max,
                    intermediates,
                    "path length constraint exceeded"
                );
                return Ok(false);
            }
        }

        if let Some(own_max) = info.cert.path_len_constraint() {
            if ca_below > own_max as usize {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
