//! certlint-lib: policy-based linting of X.509 certificates.
//!
//! Certificates are parsed into [`CertificateInfo`], assembled into an ordered
//! chain with [`build_chain`], and flattened into an [`AttributeNode`] tree.
//! Policies are ordered lists of declarative [`Rule`]s; each rule resolves a
//! dotted path in the tree and hands the node to a named [`Operator`] together
//! with an [`EvaluationContext`] that knows the chain position and any CRL or
//! OCSP material supplied for the run.

pub mod chain;
pub mod context;
mod display;
mod fields;
mod fingerprint;
pub mod linter;
pub mod operators;
mod oid;
mod parser;
pub mod policy;
pub mod revocation;
pub mod tree;
mod util;

pub use chain::{
    build_chain, build_chain_with_remainder, CertType, ChainCertInfo, ChainError, MAX_CHAIN_DEPTH,
};
pub use context::EvaluationContext;
pub use display::{display_text, display_tree, to_json, to_yaml};
pub use fields::{
    AiaEntry, CertificateInfo, DigestAlgorithm, DistinguishedName, Extension, ExtensionValue,
    GeneralSubtree, KeyAlgorithm, NameConstraints, PolicyMapping, PublicKeyInfo, SanEntry,
};
pub use fingerprint::{compute_digest, content_hash};
pub use linter::{CertificateReport, LintOptions, Linter, RunReport};
pub use operators::{Operator, OperatorError, OperatorRegistry, RegexCache};
pub use parser::{parse_cert, parse_der, parse_pem, parse_pem_bundle};
pub use policy::{
    load_policies, load_policy_dir, load_policy_file, parse_policies, Evaluator, Policy,
    PolicyResult, Rule, RuleResult, Severity, Verdict,
};
pub use revocation::{
    parse_crl, parse_crl_der, parse_ocsp_response, parse_pem_crls, CertStatus, CrlInfo,
    OcspResponse, OcspResponseStatus, OcspSingleResponse, ResponderId, RevokedEntry,
};
pub use tree::{build_tree, AttributeNode, Value, ROOT_KEY};

/// Errors returned by certlint-lib.
#[derive(Debug, thiserror::Error)]
pub enum LintError {
    #[error("Failed to parse certificate: {0}")]
    ParseError(String),

    #[error("Invalid PEM format: {0}")]
    PemError(String),

    #[error("Invalid DER format: {0}")]
    DerError(String),

    #[error("Invalid revocation data: {0}")]
    RevocationError(String),

    #[error("Invalid policy document: {0}")]
    PolicyError(String),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
