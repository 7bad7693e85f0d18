//! Analyzer HTML reports on disk: discovery, parsing, copying survivors and
//! writing the `index.html` summary page.

#![deny(clippy::print_stdout, clippy::print_stderr)]

mod discovery;
mod dom;
mod index;
mod output;
mod parser;

use std::path::{Path, PathBuf};

use remove_dup_core::{Report, ReportError, ReportSource};

pub use discovery::{INDEX_FILE, find_reports};
pub use index::{IndexContext, generate_index, order_reports, render_index};
pub use output::{OutputError, copy_reports};
pub use parser::{parse_report, parse_report_str};

/// [`ReportSource`] over a directory of HTML reports.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlReportSource;

impl ReportSource for HtmlReportSource {
    fn list_candidates(&self, dir: &Path) -> Result<Vec<PathBuf>, ReportError> {
        find_reports(dir)
    }

    fn parse(&self, path: &Path) -> Result<Report, ReportError> {
        parse_report(path)
    }
}
