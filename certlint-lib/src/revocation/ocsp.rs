//! OCSP response decoding (RFC 6960).
//!
//! x509-parser has no OCSP support, so the response is walked TLV by TLV
//! with `asn1-rs`. Only the fields the lint operators consume are kept.

use crate::fields::{CertificateInfo, DigestAlgorithm, DistinguishedName};
use crate::fingerprint::compute_digest;
use crate::oid;
use crate::parser::{parse_der, parse_name_der, verify_detached, verify_issued_by};
use crate::util;
use crate::LintError;
use serde::Serialize;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};
use x509_parser::der_parser::asn1_rs::{Any, Class, FromDer, Tag};

/// OCSPResponseStatus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OcspResponseStatus {
    Successful,
    MalformedRequest,
    InternalError,
    TryLater,
    SigRequired,
    Unauthorized,
    Other(u8),
}

impl From<u8> for OcspResponseStatus {
    fn from(code: u8) -> Self {
        match code {
            0 => OcspResponseStatus::Successful,
            1 => OcspResponseStatus::MalformedRequest,
            2 => OcspResponseStatus::InternalError,
            3 => OcspResponseStatus::TryLater,
            5 => OcspResponseStatus::SigRequired,
            6 => OcspResponseStatus::Unauthorized,
            other => OcspResponseStatus::Other(other),
        }
    }
}

/// Responder identification from the response data.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum ResponderId {
    ByName(DistinguishedName),
    ByKey(#[serde(serialize_with = "serialize_hex")] Vec<u8>),
}

/// Per-certificate status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CertStatus {
    Good,
    Revoked {
        #[serde(with = "time::serde::rfc3339")]
        time: OffsetDateTime,
        reason: Option<String>,
    },
    Unknown,
}

/// One SingleResponse: a CertID and its status.
#[derive(Debug, Clone, Serialize)]
pub struct OcspSingleResponse {
    /// CertID hash algorithm OID.
    pub hash_algorithm: String,
    #[serde(serialize_with = "serialize_hex")]
    pub issuer_name_hash: Vec<u8>,
    #[serde(serialize_with = "serialize_hex")]
    pub issuer_key_hash: Vec<u8>,
    /// Serial as big-endian bytes with leading zeros stripped.
    #[serde(serialize_with = "serialize_hex")]
    pub serial: Vec<u8>,
    pub status: CertStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub this_update: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub next_update: Option<OffsetDateTime>,
}

impl OcspSingleResponse {
    /// Whether this entry's CertID refers to `cert`.
    ///
    /// The serial must match. When the hash algorithm is recognized the
    /// issuer name hash must also equal the hash of the certificate's
    /// issuer DN; otherwise the serial alone decides.
    pub fn matches(&self, cert: &CertificateInfo) -> bool {
        if self.serial != util::strip_leading_zeros(&cert.serial) {
            return false;
        }
        match digest_for(&self.hash_algorithm) {
            Some(alg) if !cert.issuer.raw.is_empty() => {
                compute_digest(&cert.issuer.raw, alg) == self.issuer_name_hash
            }
            _ => true,
        }
    }

    pub fn is_current(&self, now: OffsetDateTime) -> bool {
        self.this_update <= now && !self.is_expired(now)
    }

    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.next_update.is_some_and(|next| now > next)
    }
}

/// A decoded OCSPResponse.
#[derive(Debug, Clone, Serialize)]
pub struct OcspResponse {
    pub status: OcspResponseStatus,
    pub responder: Option<ResponderId>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub produced_at: Option<OffsetDateTime>,
    pub responses: Vec<OcspSingleResponse>,
    /// Certificates embedded by the responder (delegated signing).
    #[serde(skip)]
    pub certs: Vec<CertificateInfo>,
    pub signature_algorithm_oid: Option<String>,
    #[serde(skip)]
    signature_algorithm: Vec<u8>,
    #[serde(skip)]
    signature: Vec<u8>,
    #[serde(skip)]
    tbs_response_data: Vec<u8>,
}

impl OcspResponse {
    fn unsuccessful(status: OcspResponseStatus) -> Self {
        OcspResponse {
            status,
            responder: None,
            produced_at: None,
            responses: Vec::new(),
            certs: Vec::new(),
            signature_algorithm_oid: None,
            signature_algorithm: Vec::new(),
            signature: Vec::new(),
            tbs_response_data: Vec::new(),
        }
    }

    pub fn is_successful(&self) -> bool {
        self.status == OcspResponseStatus::Successful
    }

    /// First single response whose CertID refers to `cert`.
    pub fn find(&self, cert: &CertificateInfo) -> Option<&OcspSingleResponse> {
        self.responses.iter().find(|r| r.matches(cert))
    }

    /// Whether the response signature verifies with `signer`'s key, either
    /// directly or through an embedded responder certificate that `signer`
    /// issued.
    pub fn verify_signature(&self, signer: &CertificateInfo) -> bool {
        if !self.is_successful() || self.signature.is_empty() {
            return false;
        }
        let direct = verify_detached(
            signer,
            &self.signature_algorithm,
            &self.signature,
            &self.tbs_response_data,
        );
        direct
            || self.certs.iter().any(|responder| {
                verify_issued_by(responder, signer)
                    && verify_detached(
                        responder,
                        &self.signature_algorithm,
                        &self.signature,
                        &self.tbs_response_data,
                    )
            })
    }
}

/// Parse an OCSP response from DER, or from base64 text of the DER.
pub fn parse_ocsp_response(input: &[u8]) -> Result<OcspResponse, LintError> {
    match decode_response(input) {
        Ok(resp) => Ok(resp),
        Err(der_err) => match util::decode_base64_body(input) {
            Some(der) => decode_response(&der),
            None => Err(der_err),
        },
    }
}

fn ocsp_err(msg: &str) -> LintError {
    LintError::RevocationError(format!("invalid OCSP response: {}", msg))
}

/// Read one TLV, returning it with the remaining bytes and the full encoding.
fn next_tlv(input: &[u8]) -> Result<(Any<'_>, &[u8], &[u8]), LintError> {
    let (rest, any) = Any::from_der(input).map_err(|e| ocsp_err(&e.to_string()))?;
    let consumed = input.len() - rest.len();
    let full = input.get(..consumed).unwrap_or(input);
    Ok((any, rest, full))
}

fn expect_tag<'a>(
    input: &'a [u8],
    tag: Tag,
    what: &str,
) -> Result<(Any<'a>, &'a [u8]), LintError> {
    let (any, rest, _) = next_tlv(input)?;
    if any.header.class() != Class::Universal || any.header.tag() != tag {
        return Err(ocsp_err(&format!("expected {}", what)));
    }
    Ok((any, rest))
}

fn is_context(any: &Any<'_>, n: u32) -> bool {
    any.header.class() == Class::ContextSpecific && any.header.tag().0 == n
}

fn decode_response(input: &[u8]) -> Result<OcspResponse, LintError> {
    let (outer, _) = expect_tag(input, Tag::Sequence, "OCSPResponse")?;
    let (status_any, rest) = expect_tag(outer.data, Tag::Enumerated, "responseStatus")?;
    let status = OcspResponseStatus::from(status_any.data.last().copied().unwrap_or(0));
    if status != OcspResponseStatus::Successful || rest.is_empty() {
        tracing::debug!(?status, "OCSP response carries no response bytes");
        return Ok(OcspResponse::unsuccessful(status));
    }

    // responseBytes [0] EXPLICIT SEQUENCE { responseType, response }
    let (bytes_tagged, _, _) = next_tlv(rest)?;
    if !is_context(&bytes_tagged, 0) {
        return Err(ocsp_err("expected responseBytes"));
    }
    let (bytes_seq, _) = expect_tag(bytes_tagged.data, Tag::Sequence, "ResponseBytes")?;
    let (type_any, rest) = expect_tag(bytes_seq.data, Tag::Oid, "responseType")?;
    let (payload, _) = expect_tag(rest, Tag::OctetString, "response")?;

    let response_type = x509_parser::der_parser::asn1_rs::Oid::new(type_any.data.into());
    if response_type.to_id_string() != oid::OCSP_BASIC {
        return Err(ocsp_err(&format!(
            "unsupported response type {}",
            response_type.to_id_string()
        )));
    }

    decode_basic(payload.data)
}

fn decode_basic(input: &[u8]) -> Result<OcspResponse, LintError> {
    let (basic, _) = expect_tag(input, Tag::Sequence, "BasicOCSPResponse")?;
    let (tbs, rest, tbs_full) = next_tlv(basic.data)?;
    let (alg_any, rest, alg_full) = next_tlv(rest)?;
    let (sig_any, rest) = expect_tag(rest, Tag::BitString, "signature")?;

    let signature_algorithm_oid = next_tlv(alg_any.data)
        .ok()
        .map(|(oid_any, _, _)| x509_parser::der_parser::asn1_rs::Oid::new(oid_any.data.into()))
        .map(|o| o.to_id_string());
    // Drop the unused-bits octet.
    let signature = sig_any.data.get(1..).unwrap_or_default().to_vec();

    let mut certs = Vec::new();
    if !rest.is_empty() {
        let (certs_tagged, _, _) = next_tlv(rest)?;
        if is_context(&certs_tagged, 0) {
            let (seq, _) = expect_tag(certs_tagged.data, Tag::Sequence, "certs")?;
            let mut remaining = seq.data;
            while !remaining.is_empty() {
                let (_, next, full) = next_tlv(remaining)?;
                match parse_der(full) {
                    Ok(cert) => certs.push(cert),
                    Err(e) => {
                        tracing::warn!("skipping malformed OCSP responder certificate: {}", e)
                    }
                }
                remaining = next;
            }
        }
    }

    let (responder, produced_at, responses) = decode_response_data(tbs.data)?;

    Ok(OcspResponse {
        status: OcspResponseStatus::Successful,
        responder,
        produced_at: Some(produced_at),
        responses,
        certs,
        signature_algorithm_oid,
        signature_algorithm: alg_full.to_vec(),
        signature,
        tbs_response_data: tbs_full.to_vec(),
    })
}

type ResponseData = (Option<ResponderId>, OffsetDateTime, Vec<OcspSingleResponse>);

fn decode_response_data(input: &[u8]) -> Result<ResponseData, LintError> {
    let (mut field, mut rest, _) = next_tlv(input)?;
    // version [0] EXPLICIT, DEFAULT v1
    if is_context(&field, 0) {
        (field, rest, _) = next_tlv(rest)?;
    }

    let responder = if is_context(&field, 1) {
        parse_name_der(field.data).map(ResponderId::ByName)
    } else if is_context(&field, 2) {
        let (key, _) = expect_tag(field.data, Tag::OctetString, "responder key hash")?;
        Some(ResponderId::ByKey(key.data.to_vec()))
    } else {
        return Err(ocsp_err("expected responderID"));
    };

    let (produced, rest) = expect_tag(rest, Tag::GeneralizedTime, "producedAt")?;
    let produced_at = parse_generalized_time(produced.data)?;

    let (list, _) = expect_tag(rest, Tag::Sequence, "responses")?;
    let mut responses = Vec::new();
    let mut remaining = list.data;
    while !remaining.is_empty() {
        let (single, next) = expect_tag(remaining, Tag::Sequence, "SingleResponse")?;
        responses.push(decode_single(single.data)?);
        remaining = next;
    }

    Ok((responder, produced_at, responses))
}

fn decode_single(input: &[u8]) -> Result<OcspSingleResponse, LintError> {
    let (cert_id, rest) = expect_tag(input, Tag::Sequence, "CertID")?;
    let (hash_alg, id_rest) = expect_tag(cert_id.data, Tag::Sequence, "hashAlgorithm")?;
    let (hash_oid, _) = expect_tag(hash_alg.data, Tag::Oid, "hash algorithm OID")?;
    let (name_hash, id_rest) = expect_tag(id_rest, Tag::OctetString, "issuerNameHash")?;
    let (key_hash, id_rest) = expect_tag(id_rest, Tag::OctetString, "issuerKeyHash")?;
    let (serial, _) = expect_tag(id_rest, Tag::Integer, "serialNumber")?;

    let (status_any, rest, _) = next_tlv(rest)?;
    let status = if is_context(&status_any, 0) {
        CertStatus::Good
    } else if is_context(&status_any, 1) {
        // RevokedInfo, IMPLICIT: revocationTime then optional [0] reason
        let (time_any, info_rest) =
            expect_tag(status_any.data, Tag::GeneralizedTime, "revocationTime")?;
        let reason = match next_tlv(info_rest) {
            Ok((reason_tagged, _, _)) if is_context(&reason_tagged, 0) => {
                expect_tag(reason_tagged.data, Tag::Enumerated, "revocationReason")
                    .ok()
                    .and_then(|(code, _)| code.data.last().copied())
                    .map(|code| super::reason_name(code).to_string())
            }
            _ => None,
        };
        CertStatus::Revoked {
            time: parse_generalized_time(time_any.data)?,
            reason,
        }
    } else {
        CertStatus::Unknown
    };

    let (this_any, mut rest) = expect_tag(rest, Tag::GeneralizedTime, "thisUpdate")?;
    let this_update = parse_generalized_time(this_any.data)?;

    let mut next_update = None;
    while !rest.is_empty() {
        let (field, next, _) = next_tlv(rest)?;
        if is_context(&field, 0) {
            let (t, _) = expect_tag(field.data, Tag::GeneralizedTime, "nextUpdate")?;
            next_update = Some(parse_generalized_time(t.data)?);
        }
        rest = next;
    }

    Ok(OcspSingleResponse {
        hash_algorithm: x509_parser::der_parser::asn1_rs::Oid::new(hash_oid.data.into())
            .to_id_string(),
        issuer_name_hash: name_hash.data.to_vec(),
        issuer_key_hash: key_hash.data.to_vec(),
        serial: util::strip_leading_zeros(serial.data).to_vec(),
        status,
        this_update,
        next_update,
    })
}

/// Parse a DER GeneralizedTime (`YYYYMMDDHHMMSS[.fff]Z`) as UTC.
fn parse_generalized_time(data: &[u8]) -> Result<OffsetDateTime, LintError> {
    let text = std::str::from_utf8(data).map_err(|_| ocsp_err("non-ASCII time"))?;
    let text = text.strip_suffix('Z').unwrap_or(text);
    let whole = text.split('.').next().unwrap_or(text);
    let format = format_description!("[year][month][day][hour][minute][second]");
    PrimitiveDateTime::parse(whole, &format)
        .map(PrimitiveDateTime::assume_utc)
        .map_err(|e| ocsp_err(&format!("bad GeneralizedTime {:?}: {}", text, e)))
}

fn digest_for(oid_str: &str) -> Option<DigestAlgorithm> {
    match oid_str {
        oid::DIGEST_SHA1 => Some(DigestAlgorithm::Sha1),
        oid::DIGEST_SHA256 => Some(DigestAlgorithm::Sha256),
        oid::DIGEST_SHA384 => Some(DigestAlgorithm::Sha384),
        oid::DIGEST_SHA512 => Some(DigestAlgorithm::Sha512),
        _ => None,
    }
}

fn serialize_hex<S: serde::Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&util::hex_colon_upper(bytes))
}
