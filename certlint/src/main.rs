//! certlint: Command-line tool for linting X.509 certificates against policies.

use anyhow::{Context, Result};
use certlint_lib::{ChainCertInfo, CrlInfo, LintOptions, Linter, OcspResponse, Policy, RunReport};
use clap::{Parser, Subcommand, ValueEnum};
use rayon::prelude::*;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "certlint",
    version,
    about = "Lint X.509 certificates and chains against declarative YAML policies",
    long_about = "certlint builds a chain from the certificates it is given, flattens each\n\
                  certificate into an attribute tree, and evaluates policy rules against\n\
                  every certificate in the chain.\n\n\
                  Input format (PEM vs DER) is auto-detected. PEM bundles may hold\n\
                  several certificates. Commands read from stdin when no file is given.",
    after_help = "EXIT STATUS:\n\
                  \n  0  every certificate passed every policy\
                  \n  1  at least one policy failed\
                  \n  2  usage, input or policy errors\
                  \n\nEXAMPLES:\n\
                  \n  certlint lint --policy policies/ chain.pem\
                  \n  certlint lint --policy web.yaml leaf.pem int.pem root.pem\
                  \n  certlint lint --policy web.yaml --crl int.crl --ocsp leaf.ocsp chain.pem\
                  \n  certlint lint --policy web.yaml --batch -r certs/\
                  \n  certlint tree cert.pem\
                  \n  certlint operators"
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG also works.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate policies against a certificate chain (exit 0 = pass, 1 = fail)
    #[command(after_help = "INPUTS:\n\
                      \n  Files and directories of certificates (.pem, .der, .crt, .cer).\
                      \n  Without --batch every certificate from every input is pooled into\
                      \n  a single chain. With --batch each file is linted on its own, in\
                      \n  parallel.\
                      \n\nTIME:\n\
                      \n  --attime EPOCH   evaluate as of a Unix timestamp\
                      \n  --in DURATION    evaluate as of now + DURATION (e.g. 30d, 1w)\
                      \n\nEXAMPLES:\n\
                      \n  certlint lint --policy web.yaml chain.pem\
                      \n  certlint lint --policy a.yaml --policy b.yaml leaf.pem int.pem\
                      \n  certlint lint --policy policies/ --format json chain.pem\
                      \n  certlint lint --policy web.yaml --in 30d chain.pem\
                      \n  certlint lint --policy web.yaml --batch --failures-only -r certs/\
                      \n  cat chain.pem | certlint lint --policy web.yaml")]
    Lint {
        /// Certificate files or directories. Reads from stdin if omitted.
        inputs: Vec<PathBuf>,
        /// Policy file or directory of .yaml/.yml files (repeatable)
        #[arg(short, long = "policy", value_name = "PATH", required = true)]
        policies: Vec<PathBuf>,
        /// CRL file, PEM or DER (repeatable)
        #[arg(long = "crl", value_name = "FILE")]
        crls: Vec<PathBuf>,
        /// OCSP response file, DER or base64 (repeatable)
        #[arg(long = "ocsp", value_name = "FILE")]
        ocsps: Vec<PathBuf>,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Only print failing rules and policies
        #[arg(long)]
        failures_only: bool,
        /// Lint each file as its own chain, in parallel
        #[arg(long)]
        batch: bool,
        /// Recurse into subdirectories
        #[arg(short, long)]
        recurse: bool,
        /// Evaluate at a specific Unix timestamp instead of the current time
        #[arg(long, value_name = "EPOCH", conflicts_with = "in_duration")]
        attime: Option<i64>,
        /// Evaluate at the current time plus DURATION
        #[arg(long = "in", value_name = "DURATION")]
        in_duration: Option<String>,
        /// Lint certificates that do not fit the chain on their own instead of skipping them
        #[arg(long)]
        allow_partial_chain: bool,
    },
    /// Print the attribute tree of a certificate (paths usable as rule targets)
    #[command(after_help = "EXAMPLES:\n\
                      \n  certlint tree cert.pem\
                      \n  certlint tree --json cert.der\
                      \n  certlint tree cert.pem | grep keyUsage")]
    Tree {
        /// Certificate file (PEM or DER). Reads from stdin if omitted.
        file: Option<PathBuf>,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// List the registered operator names
    Operators,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Yaml,
}

/// Maximum file size for certificate, CRL, OCSP and policy inputs (10 MiB).
const MAX_INPUT_BYTES: u64 = 10 * 1024 * 1024;

fn read_input(file: Option<&Path>) -> Result<Vec<u8>> {
    match file {
        Some(path) => {
            let meta = std::fs::metadata(path)
                .with_context(|| format!("Failed to stat file: {}", path.display()))?;
            if meta.len() > MAX_INPUT_BYTES {
                anyhow::bail!(
                    "File too large ({} bytes, max {} bytes): {}",
                    meta.len(),
                    MAX_INPUT_BYTES,
                    path.display()
                );
            }
            std::fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))
        }
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .take(MAX_INPUT_BYTES)
                .read_to_end(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

/// Parse a duration string using humantime format.
///
/// Plain numbers (e.g. "3600") default to seconds.
fn parse_duration(s: &str) -> Result<Duration> {
    if s.chars().all(|c| c.is_ascii_digit()) {
        let secs: u64 = s.parse().context("Invalid duration value")?;
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(s).with_context(|| format!("Invalid duration: '{s}'"))
}

/// Resolve `--attime` / `--in` into an evaluation timestamp.
fn evaluation_time(attime: Option<i64>, in_duration: Option<&str>) -> Result<Option<i64>> {
    if let Some(ts) = attime {
        return Ok(Some(ts));
    }
    let Some(spec) = in_duration else {
        return Ok(None);
    };
    let offset = parse_duration(spec)?;
    let at = SystemTime::now()
        .checked_add(offset)
        .context("Evaluation time out of range")?
        .duration_since(UNIX_EPOCH)
        .context("System clock is before the Unix epoch")?;
    Ok(Some(i64::try_from(at.as_secs()).context("Evaluation time out of range")?))
}

/// Check if a path has a certificate file extension.
fn is_cert_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some(ext) if ext.eq_ignore_ascii_case("pem") || ext.eq_ignore_ascii_case("der")
            || ext.eq_ignore_ascii_case("crt") || ext.eq_ignore_ascii_case("cer")
    )
}

/// Find all certificate files in a directory.
fn find_cert_files(dir: &Path, recurse: bool) -> Vec<PathBuf> {
    let walker = if recurse {
        walkdir::WalkDir::new(dir)
    } else {
        walkdir::WalkDir::new(dir).max_depth(1)
    };
    let mut files: Vec<PathBuf> = walker
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_cert_file(e.path()))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// Expand directories into their certificate files, keeping argument order.
fn expand_inputs(inputs: &[PathBuf], recurse: bool) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            files.extend(find_cert_files(input, recurse));
        } else {
            files.push(input.clone());
        }
    }
    files
}

/// Read every certificate of one file (or stdin), tagging each with its path.
fn load_certificates(path: Option<&Path>) -> Result<Vec<ChainCertInfo>> {
    let input = read_input(path)?;
    let label = path.map_or_else(|| "<stdin>".to_string(), |p| p.display().to_string());
    let certs = certlint_lib::parse_pem_bundle(&input)
        .with_context(|| format!("Failed to parse certificates: {}", label))?;
    Ok(certs
        .into_iter()
        .map(|cert| ChainCertInfo::new(cert, path.map(Path::to_path_buf)))
        .collect())
}

fn load_policies(paths: &[PathBuf]) -> Result<Vec<Policy>> {
    let mut policies = Vec::new();
    for path in paths {
        let loaded = certlint_lib::load_policies(path)
            .with_context(|| format!("Failed to load policies: {}", path.display()))?;
        policies.extend(loaded);
    }
    if policies.is_empty() {
        anyhow::bail!("No policies found");
    }
    tracing::debug!(count = policies.len(), "policies loaded");
    Ok(policies)
}

fn load_crls(paths: &[PathBuf]) -> Result<Vec<CrlInfo>> {
    let mut crls = Vec::new();
    for path in paths {
        let input = read_input(Some(path))?;
        let parsed = certlint_lib::parse_crl(&input)
            .with_context(|| format!("Failed to parse CRL: {}", path.display()))?;
        crls.extend(parsed);
    }
    Ok(crls)
}

fn load_ocsps(paths: &[PathBuf]) -> Result<Vec<OcspResponse>> {
    paths
        .iter()
        .map(|path| {
            let input = read_input(Some(path))?;
            certlint_lib::parse_ocsp_response(&input)
                .with_context(|| format!("Failed to parse OCSP response: {}", path.display()))
        })
        .collect()
}

fn render(report: &RunReport, format: OutputFormat, failures_only: bool) -> Result<String> {
    Ok(match format {
        OutputFormat::Text => certlint_lib::display_text(report, failures_only),
        OutputFormat::Json => format!("{}\n", certlint_lib::to_json(report)?),
        OutputFormat::Yaml => certlint_lib::to_yaml(report)?,
    })
}

/// A single result from batch processing.
struct BatchResult {
    path: String,
    report: Result<RunReport>,
}

/// Lint each file as its own chain in parallel. Returns the number of files
/// that failed or could not be processed.
fn run_batch(
    files: &[PathBuf],
    linter: &Linter,
    policies: &[Policy],
    crls: &[CrlInfo],
    ocsps: &[OcspResponse],
    format: OutputFormat,
    failures_only: bool,
) -> usize {
    let results: Vec<BatchResult> = files
        .par_iter()
        .map(|f| BatchResult {
            path: f.display().to_string(),
            report: load_certificates(Some(f)).and_then(|certs| {
                linter
                    .lint(certs, policies, crls.to_vec(), ocsps.to_vec())
                    .map_err(anyhow::Error::from)
            }),
        })
        .collect();

    let mut failures = 0;
    for r in &results {
        match &r.report {
            Ok(report) => {
                if !report.passed() {
                    failures += 1;
                } else if failures_only {
                    continue;
                }
                match render(report, format, failures_only) {
                    Ok(text) => {
                        if format == OutputFormat::Text {
                            println!("== {} ==", r.path);
                        }
                        print!("{}", text);
                    }
                    Err(e) => eprintln!("{}: {:#}", r.path, e),
                }
            }
            Err(e) => {
                failures += 1;
                eprintln!("{}: FAIL ({:#})", r.path, e);
            }
        }
    }
    failures
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Lint {
            inputs,
            policies,
            crls,
            ocsps,
            format,
            failures_only,
            batch,
            recurse,
            attime,
            in_duration,
            allow_partial_chain,
        } => {
            let options = LintOptions {
                at_time: evaluation_time(attime, in_duration.as_deref())?,
                allow_partial_chain,
            };
            let linter = Linter::new(options);
            let policies = load_policies(&policies)?;
            let crls = load_crls(&crls)?;
            let ocsps = load_ocsps(&ocsps)?;

            let files = expand_inputs(&inputs, recurse);
            if batch {
                if files.is_empty() {
                    anyhow::bail!("No certificate files found");
                }
                let failures = run_batch(
                    &files,
                    &linter,
                    &policies,
                    &crls,
                    &ocsps,
                    format,
                    failures_only,
                );
                return Ok(if failures > 0 {
                    ExitCode::from(1)
                } else {
                    ExitCode::SUCCESS
                });
            }

            let mut certs = Vec::new();
            if inputs.is_empty() {
                certs.extend(load_certificates(None)?);
            } else {
                if files.is_empty() {
                    anyhow::bail!("No certificate files found");
                }
                for file in &files {
                    certs.extend(load_certificates(Some(file))?);
                }
            }

            let report = linter.lint(certs, &policies, crls, ocsps)?;
            print!("{}", render(&report, format, failures_only)?);
            Ok(if report.passed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            })
        }
        Commands::Tree { file, json } => {
            let input = read_input(file.as_deref())?;
            let cert = certlint_lib::parse_cert(&input)?;
            let tree = certlint_lib::build_tree(&cert);
            if json {
                println!("{}", serde_json::to_string_pretty(&tree)?);
            } else {
                print!("{}", certlint_lib::display_tree(&tree));
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Operators => {
            let registry = certlint_lib::OperatorRegistry::with_defaults();
            for name in registry.names() {
                println!("{}", name);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}
