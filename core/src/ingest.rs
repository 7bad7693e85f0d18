//! Ingestion orchestrator
//!
//! Discovers report files through a [`ReportSource`], parses them on tokio's
//! blocking pool and feeds each parsed report into a single [`DedupTrie`] as
//! soon as it is available.
//!
//! ## Ordering
//! At most `jobs` parses run at once and they are dispatched in discovery
//! order, but results are taken in completion order. Trie insertion order
//! therefore depends on scheduling: which of two reports with identical
//! signatures survives, and the order of the survivors, are unspecified.
//!
//! ## Failures
//! A file that cannot be read, parsed or validated against the policy is
//! recorded as a [`ParseFailure`] and left out of deduplication. Worker
//! panics and timeouts are handled the same way. With `fail_fast` the first
//! failure ends the run instead.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::{Id, JoinSet};

use crate::config::DedupConfig;
use crate::errors::{DedupError, ReportError, Result};
use crate::model::Report;
use crate::policy::Policy;
use crate::trie::{DedupStats, DedupTrie, Insertion};

/// Collaborator that finds and parses report files.
///
/// `parse` runs on blocking worker threads and must not assume any ordering
/// between calls.
pub trait ReportSource: Send + Sync + 'static {
    /// Report identifiers in `dir`, in dispatch order.
    fn list_candidates(&self, dir: &Path) -> std::result::Result<Vec<PathBuf>, ReportError>;

    fn parse(&self, path: &Path) -> std::result::Result<Report, ReportError>;
}

#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Maximum concurrent parses
    pub jobs: usize,
    /// Abort on the first failing file
    pub fail_fast: bool,
    /// Upper bound on a single parse. A timed-out parse is reported as
    /// failed but its blocking thread is not interrupted; the runtime owner
    /// must shut down with a deadline (`Runtime::shutdown_timeout`) so the
    /// abandoned thread cannot keep the process alive.
    pub parse_timeout: Duration,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self::from(&DedupConfig::default())
    }
}

impl From<&DedupConfig> for IngestOptions {
    fn from(cfg: &DedupConfig) -> Self {
        Self {
            jobs: cfg.resolved_jobs(),
            fail_fast: cfg.fail_fast,
            parse_timeout: cfg.parse_timeout(),
        }
    }
}

/// A file excluded from deduplication, and why.
#[derive(Debug)]
pub struct ParseFailure {
    pub path: PathBuf,
    pub error: ReportError,
}

#[derive(Debug)]
pub struct DedupOutcome {
    /// Number of report files discovered
    pub candidates: usize,
    /// One report per distinct defect, in no particular order
    pub survivors: Vec<Report>,
    pub failures: Vec<ParseFailure>,
    pub stats: DedupStats,
}

impl DedupOutcome {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Deduplicate every report `source` finds in `dir`.
pub async fn dedup_directory<S: ReportSource>(
    source: Arc<S>,
    dir: &Path,
    policy: Policy,
    options: &IngestOptions,
) -> Result<DedupOutcome> {
    let candidates = source
        .list_candidates(dir)
        .map_err(|source| DedupError::Discovery {
            dir: dir.to_path_buf(),
            source,
        })?;
    tracing::info!(
        dir = %dir.display(),
        candidates = candidates.len(),
        policy = %policy,
        jobs = options.jobs,
        "discovered reports"
    );
    dedup_paths(source, candidates, policy, options).await
}

/// Parse and deduplicate an explicit list of report files.
pub async fn dedup_paths<S: ReportSource>(
    source: Arc<S>,
    paths: Vec<PathBuf>,
    policy: Policy,
    options: &IngestOptions,
) -> Result<DedupOutcome> {
    let total = paths.len();
    let mut queue = paths.into_iter();
    let mut workers = Workers {
        source,
        policy,
        timeout: options.parse_timeout,
        tasks: JoinSet::new(),
        in_flight: HashMap::new(),
    };
    for path in queue.by_ref().take(options.jobs.max(1)) {
        workers.spawn(path);
    }

    let mut trie = DedupTrie::new(policy);
    let mut failures = Vec::new();
    let mut completed = 0;
    while let Some((path, result)) = workers.next_completed().await {
        completed += 1;
        if let Some(next) = queue.next() {
            workers.spawn(next);
        }

        match result {
            Ok(report) => {
                tracing::info!("[{completed}/{total}] \"{}\"", path.display());
                if let Insertion::Kept { superseded } = trie.insert(report)
                    && superseded > 0
                {
                    tracing::debug!(
                        path = %path.display(),
                        superseded,
                        "report supersedes longer duplicates"
                    );
                }
            }
            Err(error) => {
                tracing::warn!(
                    path = %path.display(),
                    kind = error.kind(),
                    "[{completed}/{total}] excluding report: {error}"
                );
                if options.fail_fast {
                    workers.tasks.abort_all();
                    return Err(DedupError::Report {
                        path,
                        source: error,
                    });
                }
                failures.push(ParseFailure { path, error });
            }
        }
    }

    let stats = trie.stats();
    let survivors = trie.into_survivors();
    tracing::info!(
        candidates = total,
        parsed = stats.inserted,
        failed = failures.len(),
        redundant = stats.redundant,
        superseded = stats.superseded,
        survivors = survivors.len(),
        "deduplication finished"
    );
    Ok(DedupOutcome {
        candidates: total,
        survivors,
        failures,
        stats,
    })
}

type Parsed = std::result::Result<Report, ReportError>;

struct Workers<S> {
    source: Arc<S>,
    policy: Policy,
    timeout: Duration,
    tasks: JoinSet<Parsed>,
    in_flight: HashMap<Id, PathBuf>,
}

impl<S: ReportSource> Workers<S> {
    fn spawn(&mut self, path: PathBuf) {
        let source = Arc::clone(&self.source);
        let policy = self.policy;
        let timeout = self.timeout;
        let task_path = path.clone();
        let handle = self.tasks.spawn(async move {
            let worker = tokio::task::spawn_blocking(move || -> Parsed {
                let report = source.parse(&task_path)?;
                policy.check(&report)?;
                Ok(report)
            });
            match tokio::time::timeout(timeout, worker).await {
                Ok(Ok(result)) => result,
                Ok(Err(join_err)) => Err(ReportError::Worker(join_err.to_string())),
                Err(_) => Err(ReportError::TimedOut(timeout)),
            }
        });
        self.in_flight.insert(handle.id(), path);
    }

    async fn next_completed(&mut self) -> Option<(PathBuf, Parsed)> {
        let joined = self.tasks.join_next_with_id().await?;
        Some(match joined {
            Ok((id, result)) => (self.in_flight.remove(&id).unwrap_or_default(), result),
            Err(err) => (
                self.in_flight.remove(&err.id()).unwrap_or_default(),
                Err(ReportError::Worker(err.to_string())),
            ),
        })
    }
}
