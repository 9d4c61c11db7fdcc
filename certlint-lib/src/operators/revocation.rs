//! CRL and OCSP operators.
//!
//! Window and signature checks are `false` when no material was supplied.
//! `notRevoked` and `notRevokedOCSP` pass when nothing covers the
//! certificate (absence of revocation evidence). `ocspGood` instead
//! demands an explicit good status.

use super::{Operator, OperatorError};
use crate::context::EvaluationContext;
use crate::revocation::CertStatus;
use crate::tree::{AttributeNode, Value};

/// `crlValid`: every supplied CRL is inside its thisUpdate/nextUpdate window.
#[derive(Debug, Clone, Copy)]
pub struct CrlValid;

impl Operator for CrlValid {
    fn name(&self) -> &'static str {
        "crlValid"
    }

    fn evaluate(
        &self,
        _target: Option<&AttributeNode>,
        ctx: &EvaluationContext,
        _operands: &[Value],
    ) -> Result<bool, OperatorError> {
        if ctx.crls.is_empty() {
            return Ok(false);
        }
        Ok(ctx.crls.iter().all(|crl| crl.is_current(ctx.now)))
    }
}

/// `crlNotExpired`: no supplied CRL is past its nextUpdate.
#[derive(Debug, Clone, Copy)]
pub struct CrlNotExpired;

impl Operator for CrlNotExpired {
    fn name(&self) -> &'static str {
        "crlNotExpired"
    }

    fn evaluate(
        &self,
        _target: Option<&AttributeNode>,
        ctx: &EvaluationContext,
        _operands: &[Value],
    ) -> Result<bool, OperatorError> {
        if ctx.crls.is_empty() {
            return Ok(false);
        }
        Ok(ctx.crls.iter().all(|crl| !crl.is_expired(ctx.now)))
    }
}

/// `crlSignedBy`: each CRL's issuer is a chain certificate whose key
/// verifies the CRL signature.
#[derive(Debug, Clone, Copy)]
pub struct CrlSignedBy;

impl Operator for CrlSignedBy {
    fn name(&self) -> &'static str {
        "crlSignedBy"
    }

    fn evaluate(
        &self,
        _target: Option<&AttributeNode>,
        ctx: &EvaluationContext,
        _operands: &[Value],
    ) -> Result<bool, OperatorError> {
        if ctx.crls.is_empty() || ctx.chain.is_empty() {
            return Ok(false);
        }
        Ok(ctx.crls.iter().all(|crl| {
            let issuer = crl.issuer_string();
            ctx.chain
                .iter()
                .filter(|c| c.subject() == issuer)
                .any(|c| crl.verify_signature(&c.cert))
        }))
    }
}

/// `notRevoked`: the certificate's serial is not listed by any CRL from
/// its issuer.
#[derive(Debug, Clone, Copy)]
pub struct NotRevoked;

impl Operator for NotRevoked {
    fn name(&self) -> &'static str {
        "notRevoked"
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
        let revoked = ctx
            .crls
            .iter()
            .filter(|crl| crl.covers(cert))
            .find_map(|crl| crl.find_revoked(&cert.serial));
        if let Some(entry) = revoked {
            tracing::debug!(
                serial = %cert.serial_hex(),
                reason = entry.reason.as_deref().unwrap_or("unspecified"),
                "certificate listed on CRL"
            );
        }
        Ok(revoked.is_none())
    }
}

/// `ocspValid`: every supplied response is successful and each of its
/// entries is inside its thisUpdate/nextUpdate window.
#[derive(Debug, Clone, Copy)]
pub struct OcspValid;

impl Operator for OcspValid {
    fn name(&self) -> &'static str {
        "ocspValid"
    }

    fn evaluate(
        &self,
        _target: Option<&AttributeNode>,
        ctx: &EvaluationContext,
        _operands: &[Value],
    ) -> Result<bool, OperatorError> {
        if ctx.ocsps.is_empty() {
            return Ok(false);
        }
        Ok(ctx.ocsps.iter().all(|resp| {
            resp.is_successful() && resp.responses.iter().all(|r| r.is_current(ctx.now))
        }))
    }
}

/// `ocspNotExpired`: no supplied response entry is past its nextUpdate.
#[derive(Debug, Clone, Copy)]
pub struct OcspNotExpired;

impl Operator for OcspNotExpired {
    fn name(&self) -> &'static str {
        "ocspNotExpired"
    }

    fn evaluate(
        &self,
        _target: Option<&AttributeNode>,
        ctx: &EvaluationContext,
        _operands: &[Value],
    ) -> Result<bool, OperatorError> {
        if ctx.ocsps.is_empty() {
            return Ok(false);
        }
        Ok(ctx
            .ocsps
            .iter()
            .all(|resp| resp.responses.iter().all(|r| !r.is_expired(ctx.now))))
    }
}

/// `ocspSignedBy`: each response verifies with the key of a chain
/// certificate, directly or through a responder certificate it issued.
#[derive(Debug, Clone, Copy)]
pub struct OcspSignedBy;

impl Operator for OcspSignedBy {
    fn name(&self) -> &'static str {
        "ocspSignedBy"
    }

    fn evaluate(
        &self,
        _target: Option<&AttributeNode>,
        ctx: &EvaluationContext,
        _operands: &[Value],
    ) -> Result<bool, OperatorError> {
        if ctx.ocsps.is_empty() || ctx.chain.is_empty() {
            return Ok(false);
        }
        Ok(ctx.ocsps.iter().all(|resp| {
            ctx.chain
                .iter()
                .any(|signer| resp.verify_signature(&signer.cert))
        }))
    }
}

/// `notRevokedOCSP`: no response reports the certificate as revoked.
#[derive(Debug, Clone, Copy)]
pub struct NotRevokedOcsp;

impl Operator for NotRevokedOcsp {
    fn name(&self) -> &'static str {
        "notRevokedOCSP"
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
        let revoked = ctx
            .ocsps
            .iter()
            .flat_map(|resp| resp.responses.iter())
            .filter(|r| r.matches(cert))
            .any(|r| matches!(r.status, CertStatus::Revoked { .. }));
        Ok(!revoked)
    }
}

/// `ocspGood`: some response explicitly reports the certificate as good,
/// and none reports it revoked.
#[derive(Debug, Clone, Copy)]
pub struct OcspGood;

impl Operator for OcspGood {
    fn name(&self) -> &'static str {
        "ocspGood"
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
        let mut good = false;
        for entry in ctx
            .ocsps
            .iter()
            .flat_map(|resp| resp.responses.iter())
            .filter(|r| r.matches(cert))
        {
            match entry.status {
                CertStatus::Good => good = true,
                CertStatus::Revoked { .. } => return Ok(false),
                CertStatus::Unknown => {}
            }
        }
        Ok(good)
    }
}
