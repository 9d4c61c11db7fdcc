//! Per-certificate evaluation context.

use crate::chain::{CertType, ChainCertInfo};
use crate::fields::CertificateInfo;
use crate::revocation::{CrlInfo, OcspResponse};
use crate::tree::AttributeNode;
use std::sync::Arc;
use time::OffsetDateTime;

/// Everything an operator may consult while evaluating one certificate.
///
/// `now` is the logical clock: temporal operators read it and never the
/// system clock. Chain and revocation material are shared between the
/// contexts of one run.
#[derive(Debug, Clone)]
pub struct EvaluationContext {
    pub root: AttributeNode,
    pub now: OffsetDateTime,
    pub cert: Option<ChainCertInfo>,
    /// Full chain, leaf first.
    pub chain: Arc<[ChainCertInfo]>,
    pub crls: Arc<[CrlInfo]>,
    pub ocsps: Arc<[OcspResponse]>,
}

impl EvaluationContext {
    /// A context over `root` with the clock set to the current time and no
    /// chain or revocation material.
    pub fn new(root: AttributeNode) -> Self {
        EvaluationContext {
            root,
            now: OffsetDateTime::now_utc(),
            cert: None,
            chain: Arc::from(Vec::new()),
            crls: Arc::from(Vec::new()),
            ocsps: Arc::from(Vec::new()),
        }
    }

    pub fn with_now(mut self, now: OffsetDateTime) -> Self {
        self.now = now;
        self
    }

    pub fn with_cert(mut self, cert: ChainCertInfo) -> Self {
        self.cert = Some(cert);
        self
    }

    pub fn with_chain(mut self, chain: impl Into<Arc<[ChainCertInfo]>>) -> Self {
        self.chain = chain.into();
        self
    }

    pub fn with_crls(mut self, crls: impl Into<Arc<[CrlInfo]>>) -> Self {
        self.crls = crls.into();
        self
    }

    pub fn with_ocsps(mut self, ocsps: impl Into<Arc<[OcspResponse]>>) -> Self {
        self.ocsps = ocsps.into();
        self
    }

    /// Type of the certificate under test, if one is set.
    pub fn cert_type(&self) -> Option<CertType> {
        self.cert.as_ref().map(|c| c.cert_type)
    }

    /// The parsed certificate under test.
    pub fn certificate(&self) -> Option<&CertificateInfo> {
        self.cert.as_ref().map(|c| c.cert.as_ref())
    }

    /// The chain-determined issuer of the certificate under test: itself for
    /// a root, the next chain entry otherwise. `None` without a chain.
    pub fn issuer(&self) -> Option<&CertificateInfo> {
        let cert = self.cert.as_ref()?;
        if self.chain.is_empty() {
            return None;
        }
        if cert.cert_type == CertType::Root {
            return Some(cert.cert.as_ref());
        }
        self.chain
            .get(cert.position + 1)
            .map(|c| c.cert.as_ref())
    }
}
