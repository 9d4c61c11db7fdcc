//! Lint orchestration: chain, trees, contexts, policies, reports.

use crate::chain::{build_chain_with_remainder, CertType, ChainCertInfo};
use crate::context::EvaluationContext;
use crate::policy::{Evaluator, Policy, PolicyResult, Verdict};
use crate::revocation::{CrlInfo, OcspResponse};
use crate::tree::build_tree;
use crate::LintError;
use serde::Serialize;
use std::sync::Arc;
use time::OffsetDateTime;

/// Run-wide knobs.
#[derive(Debug, Clone, Default)]
pub struct LintOptions {
    /// Unix time to evaluate at instead of the current time.
    pub at_time: Option<i64>,
    /// Lint certificates that do not fit the chain as standalone
    /// certificates instead of dropping them.
    pub allow_partial_chain: bool,
}

/// Results for one certificate.
#[derive(Debug, Clone, Serialize)]
pub struct CertificateReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub subject: String,
    pub hash: String,
    pub position: usize,
    pub cert_type: CertType,
    pub verdict: Verdict,
    pub policies: Vec<PolicyResult>,
}

/// Results for a whole run. Fails iff any certificate fails.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    #[serde(with = "time::serde::rfc3339")]
    pub evaluated_at: OffsetDateTime,
    pub verdict: Verdict,
    pub certificates: Vec<CertificateReport>,
}

impl RunReport {
    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Pass
    }

    /// Number of (certificate, policy) pairs that failed.
    pub fn failed_policies(&self) -> usize {
        self.certificates
            .iter()
            .flat_map(|c| &c.policies)
            .filter(|p| p.verdict == Verdict::Fail)
            .count()
    }
}

/// Evaluates policies against a set of certificates.
#[derive(Debug, Clone, Default)]
pub struct Linter {
    evaluator: Evaluator,
    options: LintOptions,
}

impl Linter {
    pub fn new(options: LintOptions) -> Self {
        Linter {
            evaluator: Evaluator::default(),
            options,
        }
    }

    pub fn with_evaluator(evaluator: Evaluator, options: LintOptions) -> Self {
        Linter { evaluator, options }
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    /// The logical clock for this run.
    pub fn now(&self) -> Result<OffsetDateTime, LintError> {
        match self.options.at_time {
            Some(ts) => OffsetDateTime::from_unix_timestamp(ts).map_err(|e| {
                LintError::ParseError(format!("invalid evaluation time {}: {}", ts, e))
            }),
            None => Ok(OffsetDateTime::now_utc()),
        }
    }

    /// Build the chain from `certs` and evaluate every policy against every
    /// chain certificate.
    pub fn lint(
        &self,
        certs: Vec<ChainCertInfo>,
        policies: &[Policy],
        crls: Vec<CrlInfo>,
        ocsps: Vec<OcspResponse>,
    ) -> Result<RunReport, LintError> {
        let now = self.now()?;
        let (chain, remainder) = build_chain_with_remainder(certs)?;
        let crls: Arc<[CrlInfo]> = crls.into();
        let ocsps: Arc<[OcspResponse]> = ocsps.into();

        let mut certificates = self.lint_chain(chain, policies, now, &crls, &ocsps);
        for extra in remainder {
            if self.options.allow_partial_chain {
                tracing::info!(
                    cert = %extra.label(),
                    "linting certificate outside the chain on its own"
                );
                certificates.extend(self.lint_chain(vec![extra], policies, now, &crls, &ocsps));
            } else {
                tracing::warn!(
                    cert = %extra.label(),
                    "certificate is not part of the chain; skipped"
                );
            }
        }

        let verdict = if certificates.iter().all(|c| c.verdict == Verdict::Pass) {
            Verdict::Pass
        } else {
            Verdict::Fail
        };
        Ok(RunReport {
            evaluated_at: now,
            verdict,
            certificates,
        })
    }

    fn lint_chain(
        &self,
        chain: Vec<ChainCertInfo>,
        policies: &[Policy],
        now: OffsetDateTime,
        crls: &Arc<[CrlInfo]>,
        ocsps: &Arc<[OcspResponse]>,
    ) -> Vec<CertificateReport> {
        let chain: Arc<[ChainCertInfo]> = chain.into();
        chain
            .iter()
            .map(|info| {
                let ctx = EvaluationContext::new(build_tree(&info.cert))
                    .with_now(now)
                    .with_cert(info.clone())
                    .with_chain(Arc::clone(&chain))
                    .with_crls(Arc::clone(crls))
                    .with_ocsps(Arc::clone(ocsps));
                let results: Vec<PolicyResult> = policies
                    .iter()
                    .map(|policy| self.evaluator.evaluate_policy(policy, &ctx))
                    .collect();
                let verdict = if results.iter().any(|r| r.verdict == Verdict::Fail) {
                    Verdict::Fail
                } else {
                    Verdict::Pass
                };
                tracing::debug!(
                    cert = %info.label(),
                    position = info.position,
                    %verdict,
                    "certificate evaluated"
                );
                CertificateReport {
                    file: info.file_path.as_ref().map(|p| p.display().to_string()),
                    subject: info.subject(),
                    hash: info.hash.clone(),
                    position: info.position,
                    cert_type: info.cert_type,
                    verdict,
                    policies: results,
                }
            })
            .collect()
    }
}
