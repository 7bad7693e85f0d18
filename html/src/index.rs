//! `index.html` summary page for a directory of surviving reports.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use askama::Template;
use remove_dup_core::{IndexOrder, Report, keys};

use crate::discovery::INDEX_FILE;
use crate::output::OutputError;

/// Static files written next to `index.html`.
const ASSETS: [(&str, &str); 2] = [
    ("scanview.css", include_str!("../assets/scanview.css")),
    ("sorttable.js", include_str!("../assets/sorttable.js")),
];

/// Run details shown in the page header. Captured once per run.
#[derive(Debug, Clone)]
pub struct IndexContext {
    pub title: String,
    pub user: String,
    pub host: String,
    pub working_dir: String,
    pub date: String,
}

impl IndexContext {
    /// Capture the invoking user, host, working directory and local time.
    pub fn capture(title: impl Into<String>) -> Self {
        let host = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        let working_dir = std::env::current_dir()
            .map(|dir| dir.display().to_string())
            .unwrap_or_default();

        Self {
            title: title.into(),
            user: whoami::username(),
            host,
            working_dir,
            date: chrono::Local::now().format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

struct SummaryRow {
    bug_type: String,
    count: usize,
    class_name: String,
}

struct ReportRow {
    number: usize,
    category: String,
    bug_type: String,
    class_name: String,
    file: String,
    line: i64,
    path_length: i64,
    link: String,
    exceptional: bool,
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexPage<'a> {
    run: &'a IndexContext,
    total: usize,
    summary: Vec<SummaryRow>,
    rows: Vec<ReportRow>,
}

fn class_name(bug_type: &str) -> String {
    bug_type.to_lowercase().replace(' ', "_")
}

fn report_row(number: usize, report: &Report) -> ReportRow {
    let bug_type = report.bug_type().unwrap_or_default().to_string();
    let file = report
        .meta_text(keys::BUGFILE)
        .map(|file| {
            Path::new(file)
                .file_name()
                .map_or_else(|| file.to_string(), |name| name.to_string_lossy().into_owned())
        })
        .unwrap_or_default();
    ReportRow {
        number,
        category: report.bug_category().unwrap_or_default().to_string(),
        class_name: class_name(&bug_type),
        bug_type,
        file,
        line: report.meta_number(keys::BUGLINE).unwrap_or(0),
        path_length: report.meta_number(keys::BUGPATHLENGTH).unwrap_or(1),
        link: report.file_name(),
        exceptional: report.has_meta(keys::EXCEPTIONAL),
    }
}

/// Render the page for `reports`, listed in the given order.
pub fn render_index(reports: &[Report], context: &IndexContext) -> Result<String, OutputError> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for report in reports {
        *counts.entry(report.bug_type().unwrap_or_default()).or_default() += 1;
    }
    let summary = counts
        .into_iter()
        .map(|(bug_type, count)| SummaryRow {
            bug_type: bug_type.to_string(),
            count,
            class_name: class_name(bug_type),
        })
        .collect();
    let rows = reports
        .iter()
        .enumerate()
        .map(|(i, report)| report_row(i + 1, report))
        .collect();

    let page = IndexPage {
        run: context,
        total: reports.len(),
        summary,
        rows,
    };
    Ok(page.render()?)
}

/// Write `index.html` with its stylesheet and sort script into `dir`.
/// Nothing is written when there are no reports; returns the index path
/// otherwise.
pub fn generate_index(
    dir: &Path,
    reports: &[Report],
    context: &IndexContext,
) -> Result<Option<PathBuf>, OutputError> {
    if reports.is_empty() {
        tracing::debug!(dir = %dir.display(), "no reports, skipping index");
        return Ok(None);
    }

    let html = render_index(reports, context)?;
    std::fs::create_dir_all(dir).map_err(|source| OutputError::io(dir, source))?;

    let index = dir.join(INDEX_FILE);
    std::fs::write(&index, html).map_err(|source| OutputError::io(&index, source))?;
    for (name, contents) in ASSETS {
        let asset = dir.join(name);
        std::fs::write(&asset, contents).map_err(|source| OutputError::io(&asset, source))?;
    }

    tracing::info!(path = %index.display(), reports = reports.len(), "wrote index");
    Ok(Some(index))
}

/// Sort `reports` for presentation. Stable, so equal keys keep the
/// deduplication order.
pub fn order_reports(reports: &mut [Report], order: IndexOrder) {
    reports.sort_by(|a, b| compare(a, b, order));
}

fn compare(a: &Report, b: &Report, order: IndexOrder) -> Ordering {
    match order {
        IndexOrder::BugType => a.bug_type().cmp(&b.bug_type()),
        IndexOrder::Category => a
            .bug_category()
            .cmp(&b.bug_category())
            .then_with(|| a.bug_type().cmp(&b.bug_type())),
        IndexOrder::Path => a.path().cmp(b.path()),
    }
}
