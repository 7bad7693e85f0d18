//! Analyzer HTML report → [`Report`].
//!
//! A report starts with metadata comments (`<!-- BUGTYPE Memory leak -->`)
//! terminated by `<!-- BUGMETAEND -->`. The annotated source follows as one
//! `<table class="code">` per file, optionally preceded by an
//! `<h4 class="FileName">` header. Code rows count lines; every other row
//! holds one event box.

use std::path::{Path, PathBuf};

use remove_dup_core::{Event, Meta, MetaValue, Report, ReportError, keys};

use crate::dom::{self, Element, Node};

const META_END: &str = "BUGMETAEND";

/// Read and parse the report at `path`.
pub fn parse_report(path: &Path) -> Result<Report, ReportError> {
    let bytes = std::fs::read(path)?;
    parse_report_str(path, &String::from_utf8_lossy(&bytes))
}

/// Parse report markup already in memory. `path` is kept as the report's
/// identity and is not read.
pub fn parse_report_str(path: impl Into<PathBuf>, html: &str) -> Result<Report, ReportError> {
    let document = dom::parse_document(html);
    let mut parser = ReportParser::default();
    parser.visit(&document)?;
    if parser.in_meta && parser.meta.is_empty() {
        return Err(ReportError::malformed("no report metadata found"));
    }
    Ok(Report::new(path, parser.meta, parser.events))
}

#[derive(Debug)]
struct ReportParser {
    meta: Meta,
    in_meta: bool,
    current_file: Option<String>,
    events: Vec<Event>,
}

impl Default for ReportParser {
    fn default() -> Self {
        Self {
            meta: Meta::new(),
            in_meta: true,
            current_file: None,
            events: Vec::new(),
        }
    }
}

impl ReportParser {
    fn visit(&mut self, element: &Element) -> Result<(), ReportError> {
        for child in &element.children {
            match child {
                Node::Comment(text) if self.in_meta => self.in_meta = self.read_meta(text)?,
                Node::Element(el) if el.tag == "h4" && el.class() == "FileName" => {
                    self.current_file = Some(base_name(el.leading_text().trim()));
                }
                Node::Element(el) if el.tag == "table" && el.class() == "code" => {
                    self.read_code(el)?;
                }
                Node::Element(el) => self.visit(el)?,
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns false once the metadata block ends.
    fn read_meta(&mut self, comment: &str) -> Result<bool, ReportError> {
        let text = comment.trim();
        if text == META_END {
            return Ok(false);
        }
        let (key, value) = match text.split_once(' ') {
            Some((key, value)) => (key, Some(value.trim())),
            None => (text, None),
        };
        let value = match value {
            Some(value) if keys::NUMERIC.contains(&key) => {
                let number = value.parse().map_err(|_| ReportError::InvalidMeta {
                    key: key.to_string(),
                    value: value.to_string(),
                })?;
                MetaValue::Number(number)
            }
            Some(value) => MetaValue::Text(value.to_string()),
            None => MetaValue::Flag,
        };
        self.meta.insert(key.to_string(), value);
        Ok(true)
    }

    fn read_code(&mut self, table: &Element) -> Result<(), ReportError> {
        let file = match &self.current_file {
            Some(file) => file.clone(),
            None => {
                let file = self
                    .meta
                    .get(keys::BUGFILE)
                    .and_then(MetaValue::as_text)
                    .map(base_name)
                    .ok_or_else(|| ReportError::MissingMeta(keys::BUGFILE.to_string()))?;
                self.current_file = Some(file.clone());
                file
            }
        };

        let mut line = 0;
        for row in rows(table) {
            match row.class() {
                "codeline" => line += 1,
                "variable_popup" => {}
                _ => {
                    let boxes: Vec<&Element> = row
                        .elements()
                        .filter(|cell| cell.tag == "td")
                        .flat_map(Element::elements)
                        .filter(|inner| inner.tag == "div")
                        .collect();
                    let [event_box] = boxes.as_slice() else {
                        return Err(ReportError::malformed(format!(
                            "expected one event box after line {line} of {file}, found {}",
                            boxes.len()
                        )));
                    };
                    self.events.push(read_event(&file, line, event_box)?);
                }
            }
        }
        Ok(())
    }
}

/// Events name files by base name, whatever form the report spells them in.
fn base_name(file: &str) -> String {
    Path::new(file)
        .file_name()
        .map_or_else(|| file.to_string(), |name| name.to_string_lossy().into_owned())
}

fn rows(table: &Element) -> Vec<&Element> {
    let mut rows = Vec::new();
    for child in table.elements() {
        match child.tag.as_str() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => rows.extend(child.elements().filter(|e| e.tag == "tr")),
            _ => {}
        }
    }
    rows
}

/// An indexed box carries its number in a `PathIndex` cell followed by a
/// plain message cell. A box without an index is an unnumbered note whose
/// text is the message.
fn read_event(file: &str, line: u32, event_box: &Element) -> Result<Event, ReportError> {
    let mut sequence = None;
    for cell in event_box.descendants().into_iter().filter(|e| e.tag == "td") {
        match cell.elements().next() {
            None => {
                let Some(sequence) = sequence else {
                    return Err(ReportError::malformed(format!(
                        "event message without path index at {file}:{line}"
                    )));
                };
                return Ok(Event::new(sequence, cell.leading_text().trim(), file, line));
            }
            Some(first) if first.class().contains("PathIndex") => {
                let text = first.leading_text();
                let index = text.trim().parse().map_err(|_| {
                    ReportError::malformed(format!("invalid path index {text:?} at {file}:{line}"))
                })?;
                sequence = Some(index);
            }
            Some(_) => {}
        }
    }
    if sequence.is_some() {
        return Err(ReportError::malformed(format!(
            "path index without message at {file}:{line}"
        )));
    }
    Ok(Event::new(0, event_box.leading_text().trim(), file, line))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Builds report markup shaped like the analyzer's output.
    pub(crate) struct ReportHtml {
        meta: Vec<String>,
        body: String,
    }

    impl ReportHtml {
        pub(crate) fn new(bug_type: &str, bug_file: &str) -> Self {
            Self {
                meta: vec![
                    format!("BUGDESC {bug_type} found"),
                    format!("BUGTYPE {bug_type}"),
                    "BUGCATEGORY Memory error".to_string(),
                    format!("BUGFILE {bug_file}"),
                    "BUGLINE 3".to_string(),
                    "BUGCOLUMN 5".to_string(),
                    "BUGPATHLENGTH 2".to_string(),
                ],
                body: String::new(),
            }
        }

        pub(crate) fn meta(mut self, line: &str) -> Self {
            self.meta.push(line.to_string());
            self
        }

        pub(crate) fn file_header(mut self, name: &str) -> Self {
            self.body.push_str(&format!("<h4 class=\"FileName\">{name}</h4>\n"));
            self
        }

        /// `rows`: `None` is a code line, `Some((index, message))` an event.
        pub(crate) fn code(mut self, rows: &[Option<(u32, &str)>]) -> Self {
            self.body.push_str("<table class=\"code\" data-fileid=\"1\">\n");
            let mut line = 0;
            for row in rows {
                match row {
                    None => {
                        line += 1;
                        self.body.push_str(&format!(
                            "<tr class=\"codeline\" data-linenumber=\"{line}\"><td class=\"num\" id=\"LN{line}\">{line}</td><td class=\"line\">  int x = a &lt; b;</td></tr>\n"
                        ));
                    }
                    Some((0, message)) => self.body.push_str(&format!(
                        "<tr><td class=\"num\"></td><td class=\"line\"><div id=\"EndPath\" class=\"msg msgEvent\" style=\"margin-left:3ex\">{message}</div></td></tr>\n"
                    )),
                    Some((index, message)) => self.body.push_str(&format!(
                        "<tr><td class=\"num\"></td><td class=\"line\"><div id=\"Path{index}\" class=\"msg msgEvent\" style=\"margin-left:3ex\"><table class=\"msgT\"><tr><td valign=\"top\"><div class=\"PathIndex PathIndexEvent\">{index}</div></td><td><div class=\"PathNav\"><a href=\"#Path{index}\" title=\"Previous event\">&#x2190;</a></div></td><td>{message}</td></tr></table></div></td></tr>\n"
                    )),
                }
            }
            self.body.push_str("</table>\n");
            self
        }

        pub(crate) fn build(&self) -> String {
            let meta: String = self
                .meta
                .iter()
                .map(|line| format!("<!-- {line} -->\n"))
                .collect();
            format!(
                "<!doctype html>\n<html>\n<head>\n<title>report</title>\n{meta}<!-- BUGMETAEND -->\n<!-- REPORTHEADER -->\n<style type=\"text/css\">body {{ color:#000000; }}</style>\n<script>if (a<b) {{}}</script>\n</head>\n<body>\n<h3>Bug Summary</h3>\n<table class=\"simpletable\"><tr><td class=\"rowname\">File:</td><td>x</td></tr></table>\n<!-- REPORTSUMMARYEXTRA -->\n<h3>Annotated Source Code</h3>\n{}</body></html>\n",
                self.body
            )
        }
    }

    fn summary(report: &Report) -> Vec<(u32, String, String, u32)> {
        report
            .events()
            .iter()
            .map(|e| (e.sequence(), e.message().to_string(), e.file().to_string(), e.line()))
            .collect()
    }

    #[test]
    fn parses_metadata() {
        let html = ReportHtml::new("Memory leak", "/src/a.c")
            .meta("EXCEPTIONAL")
            .code(&[None, Some((1, "Memory is allocated"))])
            .build();
        let report = parse_report_str("report-1.html", &html).expect("parse");

        assert_eq!(report.bug_type(), Some("Memory leak"));
        assert_eq!(report.bug_category(), Some("Memory error"));
        assert_eq!(report.meta_number(keys::BUGLINE), Some(3));
        assert_eq!(report.meta_number(keys::BUGPATHLENGTH), Some(2));
        assert_eq!(report.meta().get(keys::EXCEPTIONAL), Some(&MetaValue::Flag));
        // Comments after BUGMETAEND are not metadata.
        assert!(!report.has_meta("REPORTHEADER"));
    }

    #[test]
    fn parses_events_with_line_numbers() {
        let html = ReportHtml::new("Memory leak", "a.c")
            .code(&[
                None,
                Some((1, "Memory is allocated")),
                None,
                None,
                Some((3, "Potential leak of memory pointed to by &apos;p&apos;")),
                Some((2, "Assuming &apos;p&apos; is non-null")),
            ])
            .build();
        let report = parse_report_str("report-1.html", &html).expect("parse");

        assert_eq!(
            summary(&report),
            vec![
                (1, "Memory is allocated".to_string(), "a.c".to_string(), 1),
                (2, "Assuming 'p' is non-null".to_string(), "a.c".to_string(), 3),
                (3, "Potential leak of memory pointed to by 'p'".to_string(), "a.c".to_string(), 3),
            ]
        );
    }

    #[test]
    fn file_headers_switch_files() {
        let html = ReportHtml::new("Null dereference", "/src/b.c")
            .file_header("a.c")
            .code(&[None, None, Some((1, "Calling 'f'"))])
            .file_header("b.c")
            .code(&[None, Some((2, "Dereference of null pointer"))])
            .build();
        let report = parse_report_str("report-2.html", &html).expect("parse");

        assert_eq!(
            summary(&report),
            vec![
                (1, "Calling 'f'".to_string(), "a.c".to_string(), 2),
                (2, "Dereference of null pointer".to_string(), "b.c".to_string(), 1),
            ]
        );
    }

    #[test]
    fn event_files_are_base_names() {
        let single = ReportHtml::new("Dead store", "/src/lib/a.c")
            .code(&[None, Some((1, "x declared"))])
            .build();
        let report = parse_report_str("report-6.html", &single).expect("parse");
        assert_eq!(report.events()[0].file(), "a.c");

        let headed = ReportHtml::new("Dead store", "/src/lib/a.c")
            .file_header("lib/a.c")
            .code(&[None, Some((1, "x declared"))])
            .build();
        let other = parse_report_str("report-7.html", &headed).expect("parse");
        assert_eq!(other.events()[0].edge(), report.events()[0].edge());
    }

    #[test]
    fn unindexed_event_uses_box_text() {
        let html = ReportHtml::new("Dead store", "c.c")
            .code(&[None, Some((0, "Value stored to 'x' is never read"))])
            .build();
        let report = parse_report_str("report-3.html", &html).expect("parse");
        assert_eq!(
            summary(&report),
            vec![(0, "Value stored to 'x' is never read".to_string(), "c.c".to_string(), 1)]
        );
    }

    #[test]
    fn variable_popups_are_skipped() {
        let mut html = ReportHtml::new("Dead store", "c.c")
            .code(&[None, Some((1, "x declared"))])
            .build();
        html = html.replace(
            "<tr><td class=\"num\"></td>",
            "<tr class=\"variable_popup\"><td class=\"num\"></td><td class=\"line\"><div class=\"msg msgVariable\">x = 1</div></td></tr>\n<tr><td class=\"num\"></td>",
        );
        let report = parse_report_str("report-4.html", &html).expect("parse");
        assert_eq!(report.events().len(), 1);
        assert_eq!(report.events()[0].message(), "x declared");
    }

    #[test]
    fn missing_bugfile_without_header_is_malformed() {
        let html = "<!-- BUGTYPE Dead store -->\n<!-- BUGMETAEND -->\n<table class=\"code\"><tr class=\"codeline\"><td>1</td></tr></table>";
        let err = parse_report_str("r.html", html).expect_err("BUGFILE required");
        assert_eq!(err.kind(), "missing_meta");
    }

    #[test]
    fn invalid_numeric_meta_is_rejected() {
        let html = ReportHtml::new("Dead store", "c.c")
            .meta("GUESS many")
            .code(&[None])
            .build();
        let err = parse_report_str("r.html", &html).expect_err("GUESS must be numeric");
        assert_eq!(err.kind(), "invalid_meta");
    }

    #[test]
    fn event_row_without_box_is_malformed() {
        let html = "<!-- BUGFILE a.c -->\n<!-- BUGMETAEND -->\n<table class=\"code\"><tr><td class=\"num\"></td><td class=\"line\"></td></tr></table>";
        let err = parse_report_str("r.html", html).expect_err("event box required");
        assert_eq!(err.kind(), "malformed");
    }

    #[test]
    fn non_report_html_is_malformed() {
        let err = parse_report_str("notes.html", "<html><body><p>hello</p></body></html>")
            .expect_err("no metadata");
        assert_eq!(err.kind(), "malformed");
    }

    #[test]
    fn reads_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("report-5.html");
        let html = ReportHtml::new("Dead store", "c.c")
            .code(&[None, Some((1, "x declared"))])
            .build();
        std::fs::write(&path, html).expect("write report");

        let report = parse_report(&path).expect("parse");
        assert_eq!(report.path(), path.as_path());
        assert_eq!(report.events().len(), 1);

        let missing = parse_report(&dir.path().join("nope.html")).expect_err("missing file");
        assert_eq!(missing.kind(), "io");
    }
}
