#![allow(
    dead_code,
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing
)]
//! Shared fixtures: the generated test PKI under `tests/data/` and a builder
//! for synthetic certificates that never touch DER.

use certlint_lib::*;
use std::path::PathBuf;
use time::macros::datetime;
use time::OffsetDateTime;

// ---------------------------------------------------------------------------
// On-disk fixtures
// ---------------------------------------------------------------------------

/// Path of a file under `tests/data/`.
pub fn data_path(name: &str) -> PathBuf {
    let mut p = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    p.push("tests");
    p.push("data");
    p.push(name);
    p
}

pub fn read_data(name: &str) -> Vec<u8> {
    std::fs::read(data_path(name)).unwrap_or_else(|e| panic!("reading {}: {}", name, e))
}

/// Parse one fixture certificate.
pub fn load(name: &str) -> CertificateInfo {
    parse_cert(&read_data(name)).unwrap_or_else(|e| panic!("parsing {}: {}", name, e))
}

pub fn load_info(name: &str) -> ChainCertInfo {
    ChainCertInfo::new(load(name), Some(data_path(name)))
}

/// Build a chain from fixture files, in whatever order they are given.
pub fn fixture_chain(names: &[&str]) -> Vec<ChainCertInfo> {
    build_chain(names.iter().map(|n| load_info(n)).collect()).unwrap()
}

/// leaf.pem -> int.pem -> root.pem
pub fn pki_chain() -> Vec<ChainCertInfo> {
    fixture_chain(&["leaf.pem", "int.pem", "root.pem"])
}

pub fn load_crls() -> Vec<CrlInfo> {
    parse_crl(&read_data("int.crl")).unwrap()
}

pub fn load_ocsp(name: &str) -> OcspResponse {
    parse_ocsp_response(&read_data(name)).unwrap()
}

/// A moment inside every fixture certificate's validity window.
pub fn fixed_now() -> OffsetDateTime {
    datetime!(2026-06-01 00:00 UTC)
}

/// Context for the chain entry at `position`.
pub fn context_at(chain: &[ChainCertInfo], position: usize) -> EvaluationContext {
    let info = chain[position].clone();
    EvaluationContext::new(build_tree(&info.cert))
        .with_now(fixed_now())
        .with_cert(info)
        .with_chain(chain.to_vec())
}

/// Run one registered operator with no target node.
pub fn run_op(ctx: &EvaluationContext, operator: &str, operands: &[Value]) -> bool {
    run_on(ctx, operator, "", operands).unwrap()
}

/// Run one registered operator against `target` resolved from the context root.
pub fn run_on(
    ctx: &EvaluationContext,
    operator: &str,
    target: &str,
    operands: &[Value],
) -> Result<bool, OperatorError> {
    let registry = OperatorRegistry::with_defaults();
    let op = registry.get(operator)?;
    let node = if target.is_empty() {
        None
    } else {
        ctx.root.resolve(target)
    };
    op.evaluate(node, ctx, operands)
}

// ---------------------------------------------------------------------------
// Synthetic certificates
// ---------------------------------------------------------------------------

/// Builder for certificates that exist only as parsed structures.
pub struct CertBuilder {
    subject: String,
    issuer: String,
    serial: Vec<u8>,
    key: KeyAlgorithm,
    extensions: Vec<Extension>,
}

/// A certificate `CN=subject` issued by `CN=issuer`.
pub fn synthetic(subject: &str, issuer: &str) -> CertBuilder {
    CertBuilder {
        subject: subject.to_string(),
        issuer: issuer.to_string(),
        serial: vec![0x01],
        key: KeyAlgorithm::Ec {
            curve: "P-256".into(),
            bits: Some(256),
        },
        extensions: Vec::new(),
    }
}

impl CertBuilder {
    pub fn serial(mut self, serial: &[u8]) -> Self {
        self.serial = serial.to_vec();
        self
    }

    pub fn key(mut self, key: KeyAlgorithm) -> Self {
        self.key = key;
        self
    }

    pub fn extension(mut self, oid: &str, critical: bool, value: ExtensionValue) -> Self {
        self.extensions.push(Extension {
            oid: oid.to_string(),
            name: oid.to_string(),
            critical,
            raw: Vec::new(),
            value,
        });
        self
    }

    pub fn ca(self, path_len: Option<u32>) -> Self {
        self.extension(
            "2.5.29.19",
            true,
            ExtensionValue::BasicConstraints { ca: true, path_len },
        )
    }

    pub fn policies(self, oids: &[&str]) -> Self {
        self.extension(
            "2.5.29.32",
            false,
            ExtensionValue::CertificatePolicies(oids.iter().map(|s| s.to_string()).collect()),
        )
    }

    pub fn mappings(self, pairs: &[(&str, &str)]) -> Self {
        self.extension(
            "2.5.29.33",
            false,
            ExtensionValue::PolicyMappings(
                pairs
                    .iter()
                    .map(|(i, s)| PolicyMapping {
                        issuer_domain_policy: i.to_string(),
                        subject_domain_policy: s.to_string(),
                    })
                    .collect(),
            ),
        )
    }

    pub fn policy_constraints(self, require: Option<u32>, inhibit: Option<u32>) -> Self {
        self.extension(
            "2.5.29.36",
            true,
            ExtensionValue::PolicyConstraints {
                require_explicit_policy: require,
                inhibit_policy_mapping: inhibit,
            },
        )
    }

    pub fn inhibit_any(self, skip: u32) -> Self {
        self.extension("2.5.29.54", true, ExtensionValue::InhibitAnyPolicy(skip))
    }

    pub fn san(self, entries: Vec<SanEntry>) -> Self {
        self.extension("2.5.29.17", false, ExtensionValue::SubjectAltName(entries))
    }

    pub fn dns(self, names: &[&str]) -> Self {
        self.san(names.iter().map(|n| SanEntry::Dns(n.to_string())).collect())
    }

    pub fn name_constraints(
        self,
        permitted: Vec<GeneralSubtree>,
        excluded: Vec<GeneralSubtree>,
    ) -> Self {
        self.extension(
            "2.5.29.30",
            true,
            ExtensionValue::NameConstraints(NameConstraints {
                permitted,
                excluded,
            }),
        )
    }

    pub fn ski(self, id: &[u8]) -> Self {
        self.extension(
            "2.5.29.14",
            false,
            ExtensionValue::SubjectKeyIdentifier(id.to_vec()),
        )
    }

    pub fn aki(self, id: &[u8]) -> Self {
        self.extension(
            "2.5.29.35",
            false,
            ExtensionValue::AuthorityKeyIdentifier {
                key_id: Some(id.to_vec()),
            },
        )
    }

    pub fn build(self) -> CertificateInfo {
        CertificateInfo {
            version: 3,
            serial: self.serial,
            signature_algorithm: "ecdsa-with-SHA256".into(),
            signature_algorithm_oid: "1.2.840.10045.4.3.2".into(),
            issuer: DistinguishedName::from_components([("CN", self.issuer)]),
            subject: DistinguishedName::from_components([("CN", self.subject)]),
            not_before: datetime!(2025-01-01 00:00 UTC),
            not_after: datetime!(2027-01-01 00:00 UTC),
            public_key: PublicKeyInfo {
                algorithm: self.key,
                raw: Vec::new(),
            },
            extensions: self.extensions,
            raw_der: Vec::new(),
        }
    }

    pub fn info(self) -> ChainCertInfo {
        ChainCertInfo::new(self.build(), None)
    }
}

/// Chain over synthetic certificates.
pub fn synthetic_chain(certs: Vec<CertBuilder>) -> Vec<ChainCertInfo> {
    build_chain(certs.into_iter().map(CertBuilder::info).collect()).unwrap()
}
