use std::path::{Path, PathBuf};

use remove_dup_core::ReportError;
use walkdir::WalkDir;

/// Name of the generated index page, never treated as a report.
pub const INDEX_FILE: &str = "index.html";

/// Report files directly inside `dir`, sorted by name. A missing directory
/// has no reports.
pub fn find_reports(dir: &Path) -> Result<Vec<PathBuf>, ReportError> {
    if !dir.exists() {
        tracing::debug!(dir = %dir.display(), "report directory does not exist");
        return Ok(Vec::new());
    }

    let mut reports = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| ReportError::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let is_html = path.extension().is_some_and(|ext| ext == "html");
        if is_html && entry.file_name() != INDEX_FILE {
            reports.push(path.to_path_buf());
        }
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn finds_html_reports_only() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in ["report-b.html", "report-a.html", "index.html", "scanview.css", "notes.txt"] {
            std::fs::write(dir.path().join(name), "").expect("write");
        }
        std::fs::create_dir(dir.path().join("nested")).expect("mkdir");
        std::fs::write(dir.path().join("nested/report-c.html"), "").expect("write nested");

        let found: Vec<String> = find_reports(dir.path())
            .expect("find")
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        assert_eq!(found, vec!["report-a.html", "report-b.html"]);
    }

    #[test]
    fn missing_directory_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let found = find_reports(&dir.path().join("absent")).expect("find");
        assert!(found.is_empty());
    }
}
