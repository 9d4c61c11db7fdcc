//! Certificate Revocation List decoding.

use crate::fields::{CertificateInfo, DistinguishedName};
use crate::parser::build_dn;
use crate::util;
use crate::LintError;
use serde::Serialize;
use ::time::OffsetDateTime;
use x509_parser::prelude::*;
use x509_parser::revocation_list::CertificateRevocationList;

/// One revoked serial number.
#[derive(Debug, Clone, Serialize)]
pub struct RevokedEntry {
    /// Serial as big-endian bytes with leading zeros stripped.
    #[serde(serialize_with = "serialize_serial")]
    pub serial: Vec<u8>,
    #[serde(with = "::time::serde::rfc3339")]
    pub revocation_date: OffsetDateTime,
    pub reason: Option<String>,
}

/// A decoded CRL.
#[derive(Debug, Clone, Serialize)]
pub struct CrlInfo {
    pub issuer: DistinguishedName,
    #[serde(with = "::time::serde::rfc3339")]
    pub this_update: OffsetDateTime,
    #[serde(with = "::time::serde::rfc3339::option")]
    pub next_update: Option<OffsetDateTime>,
    pub revoked: Vec<RevokedEntry>,
    pub signature_algorithm_oid: String,
    /// Raw DER of the whole CRL, kept for signature checks.
    #[serde(skip)]
    pub raw_der: Vec<u8>,
}

impl CrlInfo {
    pub fn issuer_string(&self) -> String {
        self.issuer.to_oneline()
    }

    /// Whether `thisUpdate <= now <= nextUpdate` holds. A missing
    /// nextUpdate leaves the window open-ended.
    pub fn is_current(&self, now: OffsetDateTime) -> bool {
        self.this_update <= now && !self.is_expired(now)
    }

    /// Whether nextUpdate is set and already in the past.
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.next_update.is_some_and(|next| now > next)
    }

    /// Whether the CRL was issued by the certificate's issuer (name match).
    pub fn covers(&self, cert: &CertificateInfo) -> bool {
        if !self.issuer.raw.is_empty() && !cert.issuer.raw.is_empty() {
            return self.issuer.raw == cert.issuer.raw;
        }
        self.issuer_string() == cert.issuer_string()
    }

    /// Revoked entry for `serial`, if listed.
    pub fn find_revoked(&self, serial: &[u8]) -> Option<&RevokedEntry> {
        let serial = util::strip_leading_zeros(serial);
        self.revoked.iter().find(|r| r.serial == serial)
    }

    /// Verify the CRL signature with the public key of `issuer`.
    pub fn verify_signature(&self, issuer: &CertificateInfo) -> bool {
        let Ok((_, crl)) = CertificateRevocationList::from_der(&self.raw_der) else {
            return false;
        };
        let Ok((_, issuer_x509)) = X509Certificate::from_der(&issuer.raw_der) else {
            return false;
        };
        crl.verify_signature(issuer_x509.public_key()).is_ok()
    }
}

/// Parse one or more CRLs from PEM (`X509 CRL` blocks) or a single DER CRL.
pub fn parse_crl(input: &[u8]) -> Result<Vec<CrlInfo>, LintError> {
    if util::is_pem(input) {
        parse_pem_crls(input)
    } else {
        parse_crl_der(input).map(|crl| vec![crl])
    }
}

/// Parse every `X509 CRL` block of a PEM file.
pub fn parse_pem_crls(input: &[u8]) -> Result<Vec<CrlInfo>, LintError> {
    let mut crls = Vec::new();
    for pem_result in Pem::iter_from_buffer(input) {
        match pem_result {
            Ok(pem) => {
                if pem.label == "X509 CRL" {
                    crls.push(parse_crl_der(&pem.contents)?);
                }
            }
            Err(e) => {
                if !crls.is_empty() {
                    break;
                }
                return Err(LintError::PemError(format!(
                    "failed to parse CRL PEM: {}",
                    e
                )));
            }
        }
    }
    if crls.is_empty() {
        return Err(LintError::PemError("no CRLs found in PEM input".into()));
    }
    Ok(crls)
}

/// Parse a DER-encoded CRL.
pub fn parse_crl_der(input: &[u8]) -> Result<CrlInfo, LintError> {
    let (remaining, crl) = CertificateRevocationList::from_der(input)
        .map_err(|e| LintError::RevocationError(format!("invalid CRL: {}", e)))?;
    let crl_len = input.len() - remaining.len();

    let revoked = crl
        .iter_revoked_certificates()
        .map(|entry| RevokedEntry {
            serial: util::strip_leading_zeros(entry.raw_serial()).to_vec(),
            revocation_date: entry.revocation_date.to_datetime(),
            reason: entry
                .reason_code()
                .map(|(_, rc)| super::reason_name(rc.0).to_string()),
        })
        .collect();

    Ok(CrlInfo {
        issuer: build_dn(crl.issuer()),
        this_update: crl.last_update().to_datetime(),
        next_update: crl.next_update().map(|t| t.to_datetime()),
        revoked,
        signature_algorithm_oid: crl.signature_algorithm.algorithm.to_id_string(),
        raw_der: input.get(..crl_len).unwrap_or(input).to_vec(),
    })
}

fn serialize_serial<S: serde::Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&util::hex_colon_upper(bytes))
}
