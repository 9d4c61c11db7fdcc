//! Certificate chain construction and position classification.
//!
//! Certificates are linked by name: a certificate's issuer string must equal
//! its parent's subject string. Every input certificate is tried as the leaf
//! of an issuer walk; the longest walk wins and ties go to the earliest
//! candidate in input order.

use crate::fields::CertificateInfo;
use crate::fingerprint::content_hash;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Maximum chain depth. Walks stop here even without a cycle.
pub const MAX_CHAIN_DEPTH: usize = 32;

/// Position class of a certificate within its chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertType {
    Leaf,
    Intermediate,
    Root,
}

impl fmt::Display for CertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CertType::Leaf => write!(f, "leaf"),
            CertType::Intermediate => write!(f, "intermediate"),
            CertType::Root => write!(f, "root"),
        }
    }
}

/// A loaded certificate plus its place in the chain.
#[derive(Debug, Clone, Serialize)]
pub struct ChainCertInfo {
    /// Where the certificate was read from, if it came from disk.
    pub file_path: Option<PathBuf>,
    /// Lowercase hex SHA-256 of the DER encoding.
    pub hash: String,
    /// Zero-based position in the chain; 0 is the leaf.
    pub position: usize,
    pub cert_type: CertType,
    #[serde(skip)]
    pub cert: Arc<CertificateInfo>,
}

impl ChainCertInfo {
    /// Wrap a parsed certificate. Position and type are assigned by
    /// [`build_chain`].
    pub fn new(cert: CertificateInfo, file_path: Option<PathBuf>) -> Self {
        ChainCertInfo {
            file_path,
            hash: content_hash(&cert.raw_der),
            position: 0,
            cert_type: CertType::Leaf,
            cert: Arc::new(cert),
        }
    }

    pub fn subject(&self) -> String {
        self.cert.subject_string()
    }

    pub fn issuer(&self) -> String {
        self.cert.issuer_string()
    }

    /// Label for logs and reports: the file path when known, else the subject.
    pub fn label(&self) -> String {
        match &self.file_path {
            Some(path) => path.display().to_string(),
            None => self.subject(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("no certificates provided")]
    NoCertificates,
    #[error("could not build chain")]
    ChainNotBuilt,
}

/// Order `certs` leaf-first and classify each position.
///
/// Certificates that do not end up in the longest chain are dropped; use
/// [`build_chain_with_remainder`] to keep them.
pub fn build_chain(certs: Vec<ChainCertInfo>) -> Result<Vec<ChainCertInfo>, ChainError> {
    build_chain_with_remainder(certs).map(|(chain, _)| chain)
}

/// Like [`build_chain`], also returning the certificates left out of the
/// chain, in input order, each classified as a standalone chain of one.
pub fn build_chain_with_remainder(
    certs: Vec<ChainCertInfo>,
) -> Result<(Vec<ChainCertInfo>, Vec<ChainCertInfo>), ChainError> {
    if certs.is_empty() {
        return Err(ChainError::NoCertificates);
    }

    let order = longest_walk(&certs);
    if order.is_empty() {
        return Err(ChainError::ChainNotBuilt);
    }
    tracing::debug!(
        candidates = certs.len(),
        length = order.len(),
        "chain built"
    );

    let mut slots: Vec<Option<ChainCertInfo>> = certs.into_iter().map(Some).collect();
    let chain_len = order.len();
    let mut chain = Vec::with_capacity(chain_len);
    for (position, idx) in order.into_iter().enumerate() {
        if let Some(mut info) = slots.get_mut(idx).and_then(Option::take) {
            info.position = position;
            info.cert_type = classify(position, chain_len, &info.cert);
            tracing::trace!(
                position,
                cert_type = %info.cert_type,
                subject = %info.subject(),
                "classified"
            );
            chain.push(info);
        }
    }

    let remainder = slots
        .into_iter()
        .flatten()
        .map(|mut info| {
            info.position = 0;
            info.cert_type = classify(0, 1, &info.cert);
            info
        })
        .collect();

    Ok((chain, remainder))
}

fn classify(position: usize, chain_len: usize, cert: &CertificateInfo) -> CertType {
    let last = position + 1 == chain_len;
    if last && cert.is_self_issued() {
        CertType::Root
    } else if position == 0 {
        CertType::Leaf
    } else {
        CertType::Intermediate
    }
}

/// Indices of the longest issuer walk over `certs`, leaf first.
fn longest_walk(certs: &[ChainCertInfo]) -> Vec<usize> {
    // First certificate per subject wins so lookups stay deterministic.
    let mut by_subject: HashMap<String, usize> = HashMap::new();
    for (idx, info) in certs.iter().enumerate() {
        by_subject.entry(info.subject()).or_insert(idx);
    }

    let mut best: Vec<usize> = Vec::new();
    for start in 0..certs.len() {
        let walk = walk_from(start, certs, &by_subject);
        tracing::trace!(start, length = walk.len(), "candidate walk");
        if walk.len() > best.len() {
            best = walk;
        }
    }
    best
}

fn walk_from(
    start: usize,
    certs: &[ChainCertInfo],
    by_subject: &HashMap<String, usize>,
) -> Vec<usize> {
    let mut walk = vec![start];
    let mut current = start;
    while walk.len() < MAX_CHAIN_DEPTH {
        let Some(info) = certs.get(current) else {
            break;
        };
        if info.cert.is_self_issued() {
            break;
        }
        let Some(&next) = by_subject.get(&info.issuer()) else {
            break;
        };
        if walk.contains(&next) {
            tracing::debug!(subject = %info.subject(), "issuer cycle detected");
            break;
        }
        walk.push(next);
        current = next;
    }
    walk
}
