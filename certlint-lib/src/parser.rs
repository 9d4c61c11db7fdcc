//! Certificate parsing from PEM and DER formats.

use crate::fields::{
    AiaEntry, CertificateInfo, DistinguishedName, Extension, ExtensionValue, GeneralSubtree,
    KeyAlgorithm, NameConstraints, PolicyMapping, PublicKeyInfo, SanEntry,
};
use crate::oid;
use crate::util;
use crate::LintError;
use x509_parser::prelude::*;

/// Parse a certificate from PEM or DER (auto-detected).
///
/// If the input begins with `-----BEGIN` (after stripping whitespace), it is
/// treated as PEM. Otherwise it is treated as DER.
pub fn parse_cert(input: &[u8]) -> Result<CertificateInfo, LintError> {
    if input.is_empty() {
        return Err(LintError::ParseError("empty input".into()));
    }

    if util::is_pem(input) {
        parse_pem(input)
    } else {
        parse_der(input)
    }
}

/// Parse a certificate from PEM format.
pub fn parse_pem(input: &[u8]) -> Result<CertificateInfo, LintError> {
    let (_, pem) = x509_parser::pem::parse_x509_pem(input)
        .map_err(|e| LintError::PemError(format!("{}", e)))?;

    if !is_certificate_label(&pem.label) {
        return Err(LintError::PemError(format!(
            "expected CERTIFICATE, got {}",
            pem.label
        )));
    }

    parse_der(&pem.contents)
}

/// Parse every certificate in a PEM bundle, or a single DER certificate.
///
/// Non-certificate PEM blocks (keys, CRLs) are skipped. Trailing garbage after
/// at least one certificate ends the scan instead of failing it.
pub fn parse_pem_bundle(input: &[u8]) -> Result<Vec<CertificateInfo>, LintError> {
    if !util::is_pem(input) {
        return parse_der(input).map(|cert| vec![cert]);
    }

    let mut certs = Vec::new();
    for pem_result in Pem::iter_from_buffer(input) {
        match pem_result {
            Ok(pem) => {
                if is_certificate_label(&pem.label) {
                    certs.push(parse_der(&pem.contents)?);
                }
            }
            Err(e) => {
                if !certs.is_empty() {
                    break;
                }
                return Err(LintError::PemError(format!("failed to parse PEM: {}", e)));
            }
        }
    }

    if certs.is_empty() {
        return Err(LintError::PemError(
            "no certificates found in PEM input".into(),
        ));
    }
    Ok(certs)
}

fn is_certificate_label(label: &str) -> bool {
    label == "CERTIFICATE" || label == "TRUSTED CERTIFICATE" || label == "X509 CERTIFICATE"
}

/// Parse a certificate from DER format.
pub fn parse_der(input: &[u8]) -> Result<CertificateInfo, LintError> {
    let (remaining, x509) =
        X509Certificate::from_der(input).map_err(|e| LintError::DerError(format!("{}", e)))?;

    // Keep only the certificate bytes so the content hash ignores trailing data.
    let cert_len = input.len() - remaining.len();
    let cert_der = input.get(..cert_len).unwrap_or(input);
    build_certificate_info(&x509, cert_der)
}

/// Build a CertificateInfo from a parsed X509Certificate.
fn build_certificate_info(
    x509: &X509Certificate,
    raw_der: &[u8],
) -> Result<CertificateInfo, LintError> {
    let tbs = &x509.tbs_certificate;

    let raw_version = tbs.version.0;
    if raw_version > 2 {
        return Err(LintError::ParseError(format!(
            "unsupported X.509 version {} (expected v1, v2, or v3)",
            raw_version + 1
        )));
    }

    let signature_algorithm_oid = x509.signature_algorithm.algorithm.to_id_string();

    Ok(CertificateInfo {
        version: raw_version + 1,
        serial: util::strip_leading_zeros(tbs.raw_serial()).to_vec(),
        signature_algorithm: sig_algorithm_name(&signature_algorithm_oid),
        signature_algorithm_oid,
        issuer: build_dn(&tbs.issuer),
        subject: build_dn(&tbs.subject),
        not_before: tbs.validity.not_before.to_datetime(),
        not_after: tbs.validity.not_after.to_datetime(),
        public_key: build_public_key_info(&tbs.subject_pki),
        extensions: tbs.extensions().iter().map(build_extension).collect(),
        raw_der: raw_der.to_vec(),
    })
}

fn sig_algorithm_name(oid_str: &str) -> String {
    match oid_str {
        oid::SHA1_WITH_RSA => "sha1WithRSAEncryption".into(),
        oid::SHA256_WITH_RSA => "sha256WithRSAEncryption".into(),
        oid::SHA384_WITH_RSA => "sha384WithRSAEncryption".into(),
        oid::SHA512_WITH_RSA => "sha512WithRSAEncryption".into(),
        oid::RSASSA_PSS => "rsassaPss".into(),
        oid::ECDSA_WITH_SHA256 => "ecdsa-with-SHA256".into(),
        oid::ECDSA_WITH_SHA384 => "ecdsa-with-SHA384".into(),
        oid::ECDSA_WITH_SHA512 => "ecdsa-with-SHA512".into(),
        oid::ED25519 => "Ed25519".into(),
        oid::ED448 => "Ed448".into(),
        other => other.to_string(),
    }
}

pub(crate) fn build_dn(name: &X509Name) -> DistinguishedName {
    let mut components = Vec::new();
    for rdn in name.iter() {
        for attr in rdn.iter() {
            let key = util::oid_short_name(&attr.attr_type().to_id_string());
            let value = attr.as_str().unwrap_or("<binary>").to_string();
            components.push((key, value));
        }
    }
    DistinguishedName {
        components,
        raw: name.as_raw().to_vec(),
    }
}

/// Decode a DER `Name` (as found in an OCSP responder ID).
pub(crate) fn parse_name_der(der: &[u8]) -> Option<DistinguishedName> {
    X509Name::from_der(der).ok().map(|(_, name)| build_dn(&name))
}

/// Check that `cert` carries a valid signature made with `issuer`'s key.
pub(crate) fn verify_issued_by(cert: &CertificateInfo, issuer: &CertificateInfo) -> bool {
    let Ok((_, child)) = X509Certificate::from_der(&cert.raw_der) else {
        return false;
    };
    let Ok((_, parent)) = X509Certificate::from_der(&issuer.raw_der) else {
        return false;
    };
    child.verify_signature(Some(parent.public_key())).is_ok()
}

/// Verify a detached signature (OCSP responses) with the key of `signer`.
///
/// `algorithm` is the full DER AlgorithmIdentifier; `signature` is the
/// BIT STRING contents without the unused-bits octet.
pub(crate) fn verify_detached(
    signer: &CertificateInfo,
    algorithm: &[u8],
    signature: &[u8],
    signed_data: &[u8],
) -> bool {
    use x509_parser::der_parser::asn1_rs::{Any, BitString, FromDer as _, Oid};

    let Ok((_, signer_x509)) = X509Certificate::from_der(&signer.raw_der) else {
        return false;
    };
    let Ok((_, alg_seq)) = Any::from_der(algorithm) else {
        return false;
    };
    let Ok((rest, oid_any)) = Any::from_der(alg_seq.data) else {
        return false;
    };
    let params = Any::from_der(rest).ok().map(|(_, p)| p);
    let alg = AlgorithmIdentifier::new(Oid::new(oid_any.data.into()), params);
    let bits = BitString::new(0, signature);
    x509_parser::verify::verify_signature(signer_x509.public_key(), &alg, &bits, signed_data)
        .is_ok()
}

fn build_public_key_info(spki: &SubjectPublicKeyInfo) -> PublicKeyInfo {
    let oid_str = spki.algorithm.algorithm.to_id_string();
    let key_data = &spki.subject_public_key.data;

    let algorithm = match oid_str.as_str() {
        oid::RSA_ENCRYPTION => match extract_rsa_params(key_data) {
            Some((bits, exponent)) => KeyAlgorithm::Rsa { bits, exponent },
            None => KeyAlgorithm::Unknown { oid: oid_str },
        },
        oid::EC_PUBLIC_KEY => {
            let curve = extract_ec_curve(&spki.algorithm);
            let bits = match curve.as_str() {
                "P-256" => Some(256),
                "P-384" => Some(384),
                "P-521" => Some(521),
                _ => None,
            };
            KeyAlgorithm::Ec { curve, bits }
        }
        oid::ED25519 => KeyAlgorithm::Ed25519,
        oid::ED448 => KeyAlgorithm::Ed448,
        _ => KeyAlgorithm::Unknown { oid: oid_str },
    };

    PublicKeyInfo {
        algorithm,
        raw: key_data.to_vec(),
    }
}

/// Extract the RSA modulus size and public exponent from the raw key DER.
///
/// Returns `None` if the DER structure cannot be parsed, so malformed keys
/// surface as `KeyAlgorithm::Unknown` instead of a made-up size.
fn extract_rsa_params(data: &[u8]) -> Option<(u32, u64)> {
    let (_, parsed) = x509_parser::der_parser::parse_der(data).ok()?;
    let seq = parsed.as_sequence().ok()?;
    let bigint = seq.first().and_then(|m| m.as_bigint().ok())?;
    let bytes = bigint.to_bytes_be().1;
    let significant = util::strip_leading_zeros(&bytes);
    let leading_bits = significant
        .first()
        .map_or(0, |b| 8 - b.leading_zeros());
    let bits = (significant.len().saturating_sub(1) as u32) * 8 + leading_bits;
    let exponent = seq.get(1).and_then(|e| e.as_u64().ok())?;
    Some((bits, exponent))
}

fn extract_ec_curve(algo: &AlgorithmIdentifier) -> String {
    if let Some(params) = &algo.parameters {
        if let Ok(oid) = params.as_oid() {
            return match oid.to_id_string().as_str() {
                oid::CURVE_P256 => "P-256".into(),
                oid::CURVE_P384 => "P-384".into(),
                oid::CURVE_P521 => "P-521".into(),
                other => other.to_string(),
            };
        }
    }
    "unknown".into()
}

fn build_extension(ext: &X509Extension) -> Extension {
    let oid = ext.oid.to_id_string();
    let name = extension_oid_to_name(&oid);

    let value = match ext.parsed_extension() {
        ParsedExtension::BasicConstraints(bc) => ExtensionValue::BasicConstraints {
            ca: bc.ca,
            path_len: bc.path_len_constraint,
        },
        ParsedExtension::KeyUsage(ku) => ExtensionValue::KeyUsage(ku.flags),
        ParsedExtension::ExtendedKeyUsage(eku) => {
            let mut usages = Vec::new();
            if eku.any {
                usages.push(oid::EKU_ANY.to_string());
            }
            if eku.server_auth {
                usages.push(oid::EKU_SERVER_AUTH.to_string());
            }
            if eku.client_auth {
                usages.push(oid::EKU_CLIENT_AUTH.to_string());
            }
            if eku.code_signing {
                usages.push(oid::EKU_CODE_SIGNING.to_string());
            }
            if eku.email_protection {
                usages.push(oid::EKU_EMAIL_PROTECTION.to_string());
            }
            if eku.time_stamping {
                usages.push(oid::EKU_TIME_STAMPING.to_string());
            }
            if eku.ocsp_signing {
                usages.push(oid::EKU_OCSP_SIGNING.to_string());
            }
            usages.extend(eku.other.iter().map(|o| o.to_id_string()));
            ExtensionValue::ExtendedKeyUsage(usages)
        }
        ParsedExtension::SubjectAlternativeName(san) => ExtensionValue::SubjectAltName(
            san.general_names
                .iter()
                .map(general_name_to_san_entry)
                .collect(),
        ),
        ParsedExtension::SubjectKeyIdentifier(ski) => {
            ExtensionValue::SubjectKeyIdentifier(ski.0.to_vec())
        }
        ParsedExtension::AuthorityKeyIdentifier(aki) => ExtensionValue::AuthorityKeyIdentifier {
            key_id: aki.key_identifier.as_ref().map(|ki| ki.0.to_vec()),
        },
        ParsedExtension::AuthorityInfoAccess(aia) => ExtensionValue::AuthorityInfoAccess(
            aia.accessdescs
                .iter()
                .map(|desc| {
                    let method = match desc.access_method.to_id_string().as_str() {
                        oid::ACCESS_OCSP => "OCSP".into(),
                        oid::ACCESS_CA_ISSUERS => "CA Issuers".into(),
                        other => other.to_string(),
                    };
                    AiaEntry {
                        method,
                        location: format_general_name(&desc.access_location),
                    }
                })
                .collect(),
        ),
        ParsedExtension::CRLDistributionPoints(cdp) => {
            let mut uris = Vec::new();
            for point in &cdp.points {
                if let Some(x509_parser::extensions::DistributionPointName::FullName(names)) =
                    &point.distribution_point
                {
                    for gn in names {
                        if let GeneralName::URI(uri) = gn {
                            uris.push(uri.to_string());
                        }
                    }
                }
            }
            ExtensionValue::CrlDistributionPoints(uris)
        }
        ParsedExtension::CertificatePolicies(policies) => ExtensionValue::CertificatePolicies(
            policies
                .iter()
                .map(|p| p.policy_id.to_id_string())
                .collect(),
        ),
        ParsedExtension::PolicyMappings(pm) => ExtensionValue::PolicyMappings(
            pm.mappings
                .iter()
                .map(|m| PolicyMapping {
                    issuer_domain_policy: m.issuer_domain_policy.to_id_string(),
                    subject_domain_policy: m.subject_domain_policy.to_id_string(),
                })
                .collect(),
        ),
        ParsedExtension::PolicyConstraints(pc) => ExtensionValue::PolicyConstraints {
            require_explicit_policy: pc.require_explicit_policy,
            inhibit_policy_mapping: pc.inhibit_policy_mapping,
        },
        ParsedExtension::InhibitAnyPolicy(iap) => ExtensionValue::InhibitAnyPolicy(iap.skip_certs),
        ParsedExtension::NameConstraints(nc) => {
            let subtrees = |list: &Option<Vec<x509_parser::extensions::GeneralSubtree>>| {
                list.iter()
                    .flatten()
                    .map(|s| general_name_to_subtree(&s.base))
                    .collect::<Vec<_>>()
            };
            ExtensionValue::NameConstraints(NameConstraints {
                permitted: subtrees(&nc.permitted_subtrees),
                excluded: subtrees(&nc.excluded_subtrees),
            })
        }
        _ => ExtensionValue::Raw,
    };

    Extension {
        oid,
        name,
        critical: ext.critical,
        raw: ext.value.to_vec(),
        value,
    }
}

pub(crate) fn extension_oid_to_name(oid_str: &str) -> String {
    match oid_str {
        oid::EXT_SUBJECT_KEY_ID => "Subject Key Identifier".into(),
        oid::EXT_KEY_USAGE => "Key Usage".into(),
        oid::EXT_SUBJECT_ALT_NAME => "Subject Alternative Name".into(),
        oid::EXT_ISSUER_ALT_NAME => "Issuer Alternative Name".into(),
        oid::EXT_BASIC_CONSTRAINTS => "Basic Constraints".into(),
        oid::EXT_NAME_CONSTRAINTS => "Name Constraints".into(),
        oid::EXT_CRL_DISTRIBUTION_POINTS => "CRL Distribution Points".into(),
        oid::EXT_CERTIFICATE_POLICIES => "Certificate Policies".into(),
        oid::EXT_POLICY_MAPPINGS => "Policy Mappings".into(),
        oid::EXT_AUTHORITY_KEY_ID => "Authority Key Identifier".into(),
        oid::EXT_POLICY_CONSTRAINTS => "Policy Constraints".into(),
        oid::EXT_EXTENDED_KEY_USAGE => "Extended Key Usage".into(),
        oid::EXT_INHIBIT_ANY_POLICY => "Inhibit Any-Policy".into(),
        oid::EXT_AUTHORITY_INFO_ACCESS => "Authority Information Access".into(),
        oid::EXT_SUBJECT_INFO_ACCESS => "Subject Information Access".into(),
        oid::EXT_NETSCAPE_CERT_TYPE => "Netscape Cert Type".into(),
        oid::EXT_NETSCAPE_COMMENT => "Netscape Comment".into(),
        other => other.to_string(),
    }
}

fn general_name_to_san_entry(gn: &GeneralName) -> SanEntry {
    match gn {
        GeneralName::DNSName(name) => SanEntry::Dns(name.to_string()),
        GeneralName::RFC822Name(email) => SanEntry::Email(email.to_string()),
        GeneralName::IPAddress(ip_bytes) => match util::ip_from_bytes(ip_bytes) {
            Some(ip) => SanEntry::Ip(ip),
            None => SanEntry::Other(hex::encode(ip_bytes)),
        },
        GeneralName::URI(uri) => SanEntry::Uri(uri.to_string()),
        GeneralName::DirectoryName(dn) => SanEntry::DirName(build_dn(dn).to_oneline()),
        other => SanEntry::Other(format!("{:?}", other)),
    }
}

fn general_name_to_subtree(gn: &GeneralName) -> GeneralSubtree {
    match gn {
        GeneralName::DNSName(name) => GeneralSubtree::Dns(name.to_string()),
        GeneralName::RFC822Name(email) => GeneralSubtree::Email(email.to_string()),
        GeneralName::URI(uri) => GeneralSubtree::Uri(uri.to_string()),
        GeneralName::IPAddress(bytes) => GeneralSubtree::Ip(bytes.to_vec()),
        other => GeneralSubtree::Other(format!("{:?}", other)),
    }
}

fn format_general_name(gn: &GeneralName) -> String {
    match general_name_to_san_entry(gn) {
        SanEntry::Ip(ip) => ip.to_string(),
        SanEntry::Dns(v)
        | SanEntry::Email(v)
        | SanEntry::Uri(v)
        | SanEntry::DirName(v)
        | SanEntry::Other(v) => v,
    }
}
