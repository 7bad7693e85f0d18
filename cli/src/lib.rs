//! `remove-dup` command line
//!
//! Deduplicates a directory of analyzer HTML reports and copies one report per
//! distinct defect into an output directory, with an `index.html` summary.
//!
//! ## Exit Codes
//! - 0: every report parsed
//! - 1: some reports could not be parsed (survivors are still written)
//! - 2: fatal error, nothing trustworthy was written

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use remove_dup_core::{
    DedupConfig, DedupOutcome, DedupStats, IngestOptions, Policy, Report, dedup_directory,
};
use remove_dup_html::{
    HtmlReportSource, IndexContext, copy_reports, generate_index, order_reports,
};
use serde::Serialize;

pub const EXIT_CLEAN: u8 = 0;
pub const EXIT_PARTIAL: u8 = 1;
pub const EXIT_FATAL: u8 = 2;

/// How long exit waits for blocking parses still running. A parse that
/// outlived its timeout is abandoned after this.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Collapse duplicate static-analysis reports
#[derive(Debug, Parser)]
#[command(name = "remove-dup", version)]
pub struct Cli {
    /// Directory holding the analyzer's HTML reports
    #[arg(value_name = "INPUT_DIR")]
    pub input: PathBuf,

    /// Directory receiving the surviving reports and index
    #[arg(value_name = "OUTPUT_DIR")]
    pub output: PathBuf,

    /// Importance policy: aggressive or conservative
    #[arg(long, value_name = "POLICY")]
    pub policy: Option<Policy>,

    /// Concurrent parse workers (0 = available parallelism)
    #[arg(long, short = 'j', value_name = "N")]
    pub jobs: Option<usize>,

    /// Stop at the first report that cannot be parsed
    #[arg(long)]
    pub fail_fast: bool,

    /// Per-report parse timeout in seconds
    #[arg(long, value_name = "N")]
    pub timeout_secs: Option<u64>,

    /// Config file (default: $REMOVE_DUP_CONFIG or ~/.config/remove-dup/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Do not write index.html
    #[arg(long)]
    pub no_index: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long)]
    pub verbose: bool,
}

/// Machine-readable run result printed with `--json`.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub policy: Policy,
    pub candidates: usize,
    pub survivors: Vec<String>,
    pub failures: Vec<FailureSummary>,
    pub stats: DedupStats,
    pub index: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct FailureSummary {
    pub path: PathBuf,
    pub kind: &'static str,
    pub message: String,
}

impl RunSummary {
    fn new(policy: Policy, outcome: &DedupOutcome, index: Option<PathBuf>) -> Self {
        Self {
            policy,
            candidates: outcome.candidates,
            survivors: outcome.survivors.iter().map(Report::file_name).collect(),
            failures: outcome
                .failures
                .iter()
                .map(|f| FailureSummary {
                    path: f.path.clone(),
                    kind: f.error.kind(),
                    message: f.error.to_string(),
                })
                .collect(),
            stats: outcome.stats,
            index,
        }
    }

    pub fn exit_code(&self) -> u8 {
        if self.failures.is_empty() {
            EXIT_CLEAN
        } else {
            EXIT_PARTIAL
        }
    }
}

impl Cli {
    /// Run and map the result to an exit code.
    pub async fn run(self) -> u8 {
        let json = self.json;
        match self.execute().await {
            Ok(summary) => {
                if json {
                    print_json_summary(&summary);
                } else {
                    print_human_summary(&summary);
                }
                summary.exit_code()
            }
            Err(err) => {
                tracing::error!("{err:#}");
                if json {
                    let output = serde_json::json!({ "error": format!("{err:#}") });
                    println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
                }
                EXIT_FATAL
            }
        }
    }

    /// Config file values with command line flags applied on top.
    pub fn resolve_config(&self) -> Result<DedupConfig> {
        let mut cfg = match &self.config {
            Some(path) => DedupConfig::load_from_path(path)?,
            None => DedupConfig::load()?,
        };

        if let Some(policy) = self.policy {
            cfg.policy = policy;
        }
        if let Some(jobs) = self.jobs {
            cfg.jobs = jobs;
        }
        if let Some(timeout) = self.timeout_secs {
            cfg.parse_timeout_secs = timeout;
        }
        cfg.fail_fast |= self.fail_fast;
        if self.no_index {
            cfg.index.enabled = false;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    async fn execute(&self) -> Result<RunSummary> {
        let cfg = self.resolve_config().context("failed to load configuration")?;
        if !self.input.is_dir() {
            anyhow::bail!("input directory {} does not exist", self.input.display());
        }
        if same_directory(&self.input, &self.output) {
            anyhow::bail!("output directory must differ from the input directory");
        }

        let options = IngestOptions::from(&cfg);
        let source = Arc::new(HtmlReportSource);
        let mut outcome = dedup_directory(source, &self.input, cfg.policy, &options)
            .await
            .with_context(|| format!("failed to deduplicate {}", self.input.display()))?;

        order_reports(&mut outcome.survivors, cfg.index.order);
        copy_reports(&outcome.survivors, &self.output)
            .with_context(|| format!("failed to copy reports to {}", self.output.display()))?;

        let index = if cfg.index.enabled {
            let context = IndexContext::capture(cfg.index.title.as_str());
            generate_index(&self.output, &outcome.survivors, &context)
                .context("failed to generate index")?
        } else {
            None
        };

        Ok(RunSummary::new(cfg.policy, &outcome, index))
    }
}

fn same_directory(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Drive `future` on a fresh multi-thread runtime, then shut it down with
/// [`SHUTDOWN_GRACE`] as the deadline for leftover blocking work.
pub fn block_on<F: Future>(future: F) -> std::io::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let output = runtime.block_on(future);
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    Ok(output)
}

/// Logs go to stderr so `--json` output stays parseable.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn print_json_summary(summary: &RunSummary) {
    println!("{}", serde_json::to_string_pretty(summary).unwrap_or_default());
}

fn print_human_summary(summary: &RunSummary) {
    println!(
        "{} reports, {} unique ({} policy)",
        summary.candidates,
        summary.survivors.len(),
        summary.policy
    );
    println!(
        "  redundant: {}  superseded: {}  failed: {}",
        summary.stats.redundant,
        summary.stats.superseded,
        summary.failures.len()
    );
    for failure in &summary.failures {
        println!(
            "  ✗ {} [{}]: {}",
            failure.path.display(),
            failure.kind,
            failure.message
        );
    }
    if let Some(index) = &summary.index {
        println!("index: {}", index.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use remove_dup_core::{ReportError, ReportSource, dedup_paths};
    use std::time::Instant;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("remove-dup").chain(args.iter().copied()))
            .expect("valid args")
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = dir.path().join("config.toml");
        std::fs::write(
            &config,
            "policy = \"conservative\"\njobs = 2\nparse_timeout_secs = 30\n[index]\ntitle = \"Nightly\"\n",
        )
        .expect("write config");
        let config = config.to_string_lossy().into_owned();

        let cli = parse(&[
            "in", "out", "--config", &config, "--policy", "Aggressive", "-j", "4", "--no-index",
        ]);
        let cfg = cli.resolve_config().expect("config");
        assert_eq!(cfg.policy, Policy::Aggressive);
        assert_eq!(cfg.jobs, 4);
        assert_eq!(cfg.parse_timeout_secs, 30);
        assert_eq!(cfg.index.title, "Nightly");
        assert!(!cfg.index.enabled);
        assert!(!cfg.fail_fast);
    }

    #[test]
    fn zero_timeout_flag_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = dir.path().join("config.toml");
        std::fs::write(&config, "").expect("write config");
        let config = config.to_string_lossy().into_owned();

        let cli = parse(&["in", "out", "--config", &config, "--timeout-secs", "0"]);
        assert!(cli.resolve_config().is_err());
    }

    #[test]
    fn rejects_unknown_policy() {
        let err = Cli::try_parse_from(["remove-dup", "in", "out", "--policy", "lenient"])
            .expect_err("unknown policy");
        assert!(err.to_string().contains("lenient"));
    }

    struct StalledSource;

    impl ReportSource for StalledSource {
        fn list_candidates(&self, _dir: &Path) -> std::result::Result<Vec<PathBuf>, ReportError> {
            Ok(vec![PathBuf::from("stuck.html")])
        }

        fn parse(&self, _path: &Path) -> std::result::Result<Report, ReportError> {
            std::thread::sleep(Duration::from_secs(5));
            Err(ReportError::malformed("woke up too late"))
        }
    }

    #[test]
    fn timed_out_parse_does_not_hold_exit() {
        let started = Instant::now();
        let options = IngestOptions {
            jobs: 1,
            fail_fast: false,
            parse_timeout: Duration::from_millis(50),
        };
        let outcome = block_on(dedup_paths(
            Arc::new(StalledSource),
            vec![PathBuf::from("stuck.html")],
            Policy::Conservative,
            &options,
        ))
        .expect("runtime")
        .expect("timeouts are per-file failures");

        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].error.kind(), "timed_out");
        assert!(started.elapsed() < SHUTDOWN_GRACE + Duration::from_secs(2));
    }

    #[test]
    fn exit_code_reflects_failures() {
        let mut summary = RunSummary {
            policy: Policy::Conservative,
            candidates: 1,
            survivors: vec!["report-1.html".to_string()],
            failures: Vec::new(),
            stats: DedupStats::default(),
            index: None,
        };
        assert_eq!(summary.exit_code(), EXIT_CLEAN);

        summary.failures.push(FailureSummary {
            path: PathBuf::from("report-2.html"),
            kind: "malformed",
            message: "malformed report: no report metadata found".to_string(),
        });
        assert_eq!(summary.exit_code(), EXIT_PARTIAL);
    }
}
