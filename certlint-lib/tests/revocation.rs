#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing
)]
//! CRL and OCSP decoding and the revocation operators.

mod common;

use base64::Engine as _;
use certlint_lib::*;
use common::*;
use time::{Duration, OffsetDateTime};

/// An hour after the fixture CRL was issued.
fn crl_now() -> OffsetDateTime {
    load_crls()[0].this_update + Duration::hours(1)
}

fn ocsp_now() -> OffsetDateTime {
    load_ocsp("leaf.ocsp").responses[0].this_update + Duration::hours(1)
}

/// Context for chain position 0 with revocation material attached.
fn with_material(
    chain: &[ChainCertInfo],
    now: OffsetDateTime,
    crls: Vec<CrlInfo>,
    ocsps: Vec<OcspResponse>,
) -> EvaluationContext {
    context_at(chain, 0)
        .with_now(now)
        .with_crls(crls)
        .with_ocsps(ocsps)
}

fn revoked_chain() -> Vec<ChainCertInfo> {
    fixture_chain(&["revoked.pem", "int.pem", "root.pem"])
}

// ---------------------------------------------------------------------------
// CRL decoding
// ---------------------------------------------------------------------------

#[test]
fn crl_pem_and_der_agree() {
    let pem = load_crls();
    assert_eq!(pem.len(), 1);
    let der = parse_crl(&read_data("int.crl.der")).unwrap();
    assert_eq!(der.len(), 1);
    assert_eq!(pem[0].raw_der, der[0].raw_der);
    assert_eq!(pem[0].this_update, der[0].this_update);
}

#[test]
fn crl_fields() {
    let crl = &load_crls()[0];
    assert_eq!(
        crl.issuer_string(),
        "C = US, O = Certlint Test, CN = Certlint Test Intermediate CA"
    );
    assert_eq!(crl.signature_algorithm_oid, "1.2.840.10045.4.3.2");
    let next = crl.next_update.unwrap();
    assert_eq!(next - crl.this_update, Duration::days(30));
    assert_eq!(crl.revoked.len(), 1);
    assert_eq!(crl.revoked[0].serial, vec![0x10, 0x02]);
    assert_eq!(crl.revoked[0].reason.as_deref(), Some("keyCompromise"));
    assert!(crl.find_revoked(&[0x00, 0x10, 0x02]).is_some());
    assert!(crl.find_revoked(&[0x10, 0x00]).is_none());
}

#[test]
fn crl_covers_certificates_of_its_issuer() {
    let crl = &load_crls()[0];
    assert!(crl.covers(&load("leaf.pem")));
    assert!(crl.covers(&load("revoked.pem")));
    assert!(!crl.covers(&load("int.pem")));
}

#[test]
fn crl_window() {
    let crl = &load_crls()[0];
    let now = crl_now();
    assert!(crl.is_current(now));
    assert!(!crl.is_current(crl.this_update - Duration::seconds(1)));
    assert!(!crl.is_expired(crl.this_update - Duration::seconds(1)));
    let after = crl.next_update.unwrap() + Duration::seconds(1);
    assert!(crl.is_expired(after));
    assert!(!crl.is_current(after));
}

#[test]
fn crl_garbage_is_rejected() {
    assert!(matches!(
        parse_crl(b"not a crl"),
        Err(LintError::RevocationError(_))
    ));
    assert!(parse_crl(b"-----BEGIN X509 CRL-----\nAAAA\n-----END X509 CRL-----\n").is_err());
    // A certificate PEM holds no CRL blocks.
    assert!(matches!(
        parse_crl(&read_data("leaf.pem")),
        Err(LintError::PemError(_))
    ));
}

// ---------------------------------------------------------------------------
// CRL operators
// ---------------------------------------------------------------------------

#[test]
fn crl_operators_on_fixtures() {
    let chain = pki_chain();
    let ctx = with_material(&chain, crl_now(), load_crls(), vec![]);
    assert!(run_op(&ctx, "crlValid", &[]));
    assert!(run_op(&ctx, "crlNotExpired", &[]));
    assert!(run_op(&ctx, "crlSignedBy", &[]));
    assert!(run_op(&ctx, "notRevoked", &[]));
}

#[test]
fn revoked_serial_is_caught() {
    let chain = revoked_chain();
    let ctx = with_material(&chain, crl_now(), load_crls(), vec![]);
    assert!(!run_op(&ctx, "notRevoked", &[]));
    // The CRL itself is fine.
    assert!(run_op(&ctx, "crlValid", &[]));
}

#[test]
fn crl_window_follows_the_clock() {
    let chain = pki_chain();
    let crl = load_crls().remove(0);
    let early = crl.this_update - Duration::days(1);
    let late = crl.next_update.unwrap() + Duration::days(1);

    let ctx = with_material(&chain, early, vec![crl.clone()], vec![]);
    assert!(!run_op(&ctx, "crlValid", &[]));
    assert!(run_op(&ctx, "crlNotExpired", &[]));

    let ctx = with_material(&chain, late, vec![crl], vec![]);
    assert!(!run_op(&ctx, "crlValid", &[]));
    assert!(!run_op(&ctx, "crlNotExpired", &[]));
}

#[test]
fn crl_signature_needs_the_issuer_in_the_chain() {
    let chain = fixture_chain(&["root.pem"]);
    let ctx = with_material(&chain, crl_now(), load_crls(), vec![]);
    assert!(!run_op(&ctx, "crlSignedBy", &[]));
}

#[test]
fn crl_operators_without_crls() {
    let chain = revoked_chain();
    let ctx = with_material(&chain, crl_now(), vec![], vec![]);
    assert!(!run_op(&ctx, "crlValid", &[]));
    assert!(!run_op(&ctx, "crlNotExpired", &[]));
    assert!(!run_op(&ctx, "crlSignedBy", &[]));
    // No evidence of revocation.
    assert!(run_op(&ctx, "notRevoked", &[]));
}

#[test]
fn crl_from_another_issuer_does_not_apply() {
    // The fixture CRL lists 0x1002, but a certificate with that serial from
    // a different issuer is not covered by it.
    let chain = synthetic_chain(vec![
        synthetic("Leaf", "Other CA").serial(&[0x10, 0x02]),
        synthetic("Other CA", "Other CA").ca(None),
    ]);
    let ctx = with_material(&chain, crl_now(), load_crls(), vec![]);
    assert!(run_op(&ctx, "notRevoked", &[]));
}

// ---------------------------------------------------------------------------
// OCSP decoding
// ---------------------------------------------------------------------------

#[test]
fn ocsp_good_response_fields() {
    let resp = load_ocsp("leaf.ocsp");
    assert!(resp.is_successful());
    assert_eq!(resp.status, OcspResponseStatus::Successful);
    assert!(matches!(resp.responder, Some(ResponderId::ByName(_))));
    assert_eq!(resp.signature_algorithm_oid.as_deref(), Some("1.2.840.10045.4.3.2"));
    assert_eq!(resp.certs.len(), 1);
    assert_eq!(
        resp.certs[0].subject.get("CN"),
        Some("Certlint Test Intermediate CA")
    );
    assert_eq!(resp.responses.len(), 1);

    let single = &resp.responses[0];
    assert_eq!(single.hash_algorithm, "1.3.14.3.2.26");
    assert_eq!(single.serial, vec![0x10, 0x00]);
    assert_eq!(single.status, CertStatus::Good);
    assert_eq!(single.issuer_name_hash.len(), 20);
    assert!(single.next_update.is_some());
    assert!(resp.find(&load("leaf.pem")).is_some());
    assert!(resp.find(&load("revoked.pem")).is_none());
}

#[test]
fn ocsp_revoked_response_fields() {
    let resp = load_ocsp("revoked.ocsp");
    let single = &resp.responses[0];
    assert_eq!(single.serial, vec![0x10, 0x02]);
    match &single.status {
        CertStatus::Revoked { reason, time } => {
            assert_eq!(reason.as_deref(), Some("keyCompromise"));
            assert_eq!(time.year(), 2025);
        }
        other => panic!("expected revoked, got {:?}", other),
    }
}

#[test]
fn ocsp_matching_checks_the_issuer_name_hash() {
    let resp = load_ocsp("leaf.ocsp");
    // Same serial, different issuer.
    let mut impostor = synthetic("foo", "Someone Else").serial(&[0x10, 0x00]).build();
    impostor.issuer.raw = vec![0x30, 0x00];
    assert!(resp.find(&impostor).is_none());
}

#[test]
fn ocsp_accepts_base64_text() {
    let der = read_data("leaf.ocsp");
    let text = base64::engine::general_purpose::STANDARD.encode(&der);
    let resp = parse_ocsp_response(text.as_bytes()).unwrap();
    assert_eq!(resp.responses.len(), 1);
    assert_eq!(resp.responses[0].status, CertStatus::Good);
}

#[test]
fn ocsp_unsuccessful_status_has_no_responses() {
    // OCSPResponse { responseStatus tryLater }
    let resp = parse_ocsp_response(&[0x30, 0x03, 0x0a, 0x01, 0x03]).unwrap();
    assert_eq!(resp.status, OcspResponseStatus::TryLater);
    assert!(!resp.is_successful());
    assert!(resp.responses.is_empty());
    assert!(!resp.verify_signature(&load("int.pem")));
}

#[test]
fn ocsp_garbage_is_rejected() {
    assert!(parse_ocsp_response(b"").is_err());
    assert!(parse_ocsp_response(&[0x02, 0x01, 0x00]).is_err());
    let der = read_data("leaf.ocsp");
    assert!(parse_ocsp_response(&der[..der.len() / 2]).is_err());
}

// ---------------------------------------------------------------------------
// OCSP operators
// ---------------------------------------------------------------------------

#[test]
fn ocsp_operators_on_good_response() {
    let chain = pki_chain();
    let ctx = with_material(&chain, ocsp_now(), vec![], vec![load_ocsp("leaf.ocsp")]);
    assert!(run_op(&ctx, "ocspValid", &[]));
    assert!(run_op(&ctx, "ocspNotExpired", &[]));
    assert!(run_op(&ctx, "ocspSignedBy", &[]));
    assert!(run_op(&ctx, "ocspGood", &[]));
    assert!(run_op(&ctx, "notRevokedOCSP", &[]));
}

#[test]
fn ocsp_operators_on_revoked_response() {
    let chain = revoked_chain();
    let ctx = with_material(&chain, ocsp_now(), vec![], vec![load_ocsp("revoked.ocsp")]);
    assert!(!run_op(&ctx, "ocspGood", &[]));
    assert!(!run_op(&ctx, "notRevokedOCSP", &[]));
    assert!(run_op(&ctx, "ocspValid", &[]));
}

#[test]
fn revoked_anywhere_beats_good() {
    let chain = revoked_chain();
    let mut good_for_revoked = load_ocsp("revoked.ocsp");
    good_for_revoked.responses[0].status = CertStatus::Good;
    let ctx = with_material(
        &chain,
        ocsp_now(),
        vec![],
        vec![good_for_revoked, load_ocsp("revoked.ocsp")],
    );
    assert!(!run_op(&ctx, "ocspGood", &[]));
}

#[test]
fn no_matching_response_asymmetry() {
    // The good response is for another serial: nothing speaks about this
    // certificate. Absence of revocation passes; absence of "good" fails.
    let chain = revoked_chain();
    let ctx = with_material(&chain, ocsp_now(), vec![], vec![load_ocsp("leaf.ocsp")]);
    assert!(run_op(&ctx, "notRevokedOCSP", &[]));
    assert!(!run_op(&ctx, "ocspGood", &[]));

    let ctx = with_material(&chain, ocsp_now(), vec![], vec![]);
    assert!(run_op(&ctx, "notRevokedOCSP", &[]));
    assert!(!run_op(&ctx, "ocspGood", &[]));
    assert!(!run_op(&ctx, "ocspValid", &[]));
    assert!(!run_op(&ctx, "ocspNotExpired", &[]));
    assert!(!run_op(&ctx, "ocspSignedBy", &[]));
}

#[test]
fn ocsp_window_follows_the_clock() {
    let chain = pki_chain();
    let resp = load_ocsp("leaf.ocsp");
    let late = resp.responses[0].next_update.unwrap() + Duration::minutes(1);
    let ctx = with_material(&chain, late, vec![], vec![resp]);
    assert!(!run_op(&ctx, "ocspValid", &[]));
    assert!(!run_op(&ctx, "ocspNotExpired", &[]));
    // Status does not depend on freshness.
    assert!(run_op(&ctx, "ocspGood", &[]));
}

#[test]
fn ocsp_signature_through_embedded_responder() {
    // Only the root is in the chain; the response is signed by the embedded
    // intermediate, which the root issued.
    let chain = fixture_chain(&["root.pem"]);
    let ctx = with_material(&chain, ocsp_now(), vec![], vec![load_ocsp("leaf.ocsp")]);
    assert!(run_op(&ctx, "ocspSignedBy", &[]));

    let chain = fixture_chain(&["rsa.pem"]);
    let ctx = with_material(&chain, ocsp_now(), vec![], vec![load_ocsp("leaf.ocsp")]);
    assert!(!run_op(&ctx, "ocspSignedBy", &[]));
}

#[test]
fn direct_signature_verification() {
    let resp = load_ocsp("leaf.ocsp");
    assert!(resp.verify_signature(&load("int.pem")));
    assert!(!resp.verify_signature(&load("leaf.pem")));

    let crl = &load_crls()[0];
    assert!(crl.verify_signature(&load("int.pem")));
    assert!(!crl.verify_signature(&load("root.pem")));
}
