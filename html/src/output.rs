use std::path::{Path, PathBuf};

use remove_dup_core::Report;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to render index: {0}")]
    Render(#[from] askama::Error),
}

impl OutputError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Copy each report file into `dir` under its own file name, creating `dir`
/// if needed. Returns the destination paths in input order.
pub fn copy_reports(reports: &[Report], dir: &Path) -> Result<Vec<PathBuf>, OutputError> {
    std::fs::create_dir_all(dir).map_err(|source| OutputError::io(dir, source))?;

    let mut copied = Vec::with_capacity(reports.len());
    for report in reports {
        let target = dir.join(report.file_name());
        std::fs::copy(report.path(), &target).map_err(|source| OutputError::io(&target, source))?;
        tracing::debug!(from = %report.path().display(), to = %target.display(), "copied report");
        copied.push(target);
    }
    Ok(copied)
}
