//! Event and report model.
//!
//! Values here are produced once by a report parser and never mutated
//! afterwards. They move between parse workers and the deduplicating task by
//! value, so no synchronization is involved.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Metadata keys written by the analyzer into every report header.
pub mod keys {
    pub const BUGTYPE: &str = "BUGTYPE";
    pub const BUGCATEGORY: &str = "BUGCATEGORY";
    pub const BUGFILE: &str = "BUGFILE";
    pub const BUGLINE: &str = "BUGLINE";
    pub const BUGCOLUMN: &str = "BUGCOLUMN";
    pub const BUGPATHLENGTH: &str = "BUGPATHLENGTH";
    pub const GUESS: &str = "GUESS";
    pub const EXCEPTIONAL: &str = "EXCEPTIONAL";

    /// Keys whose values are integers.
    pub const NUMERIC: [&str; 4] = [BUGLINE, BUGCOLUMN, BUGPATHLENGTH, GUESS];
}

/// One step on a diagnostic path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    sequence: u32,
    message: String,
    file: String,
    line: u32,
}

impl Event {
    pub fn new(
        sequence: u32,
        message: impl Into<String>,
        file: impl Into<String>,
        line: u32,
    ) -> Self {
        Self {
            sequence,
            message: message.into(),
            file: file.into(),
            line,
        }
    }

    /// Position on the diagnostic path; 0 for unindexed steps.
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    /// Comparison key for this step. The sequence number is left out: the
    /// same step shows up at different path positions across reports.
    pub fn edge(&self) -> Edge {
        Edge {
            message: self.message.clone(),
            file: self.file.clone(),
            line: self.line,
        }
    }
}

/// `(message, file, line)` triple labelling one trie transition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    message: String,
    file: String,
    line: u32,
}

/// A scalar metadata value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MetaValue {
    Number(i64),
    Text(String),
    /// Key present without a value (e.g. `EXCEPTIONAL`)
    Flag,
}

impl MetaValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }
}

pub type Meta = BTreeMap<String, MetaValue>;

/// One defect diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    path: PathBuf,
    meta: Meta,
    events: Vec<Event>,
}

impl Report {
    /// Build a report, ordering events by sequence number. The sort is
    /// stable, so steps sharing a number keep their source order.
    pub fn new(path: impl Into<PathBuf>, meta: Meta, mut events: Vec<Event>) -> Self {
        events.sort_by_key(Event::sequence);
        Self {
            path: path.into(),
            meta,
            events,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name of the backing report, used for copying and index links.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn meta_text(&self, key: &str) -> Option<&str> {
        self.meta.get(key).and_then(MetaValue::as_text)
    }

    pub fn meta_number(&self, key: &str) -> Option<i64> {
        self.meta.get(key).and_then(MetaValue::as_number)
    }

    pub fn has_meta(&self, key: &str) -> bool {
        self.meta.contains_key(key)
    }

    pub fn bug_type(&self) -> Option<&str> {
        self.meta_text(keys::BUGTYPE)
    }

    pub fn bug_category(&self) -> Option<&str> {
        self.meta_text(keys::BUGCATEGORY)
    }
}
