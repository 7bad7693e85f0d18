//! Deduplication of static-analysis diagnostic reports.
//!
//! An analyzer run emits one report per defect path, and many paths lead to
//! the same defect. This crate collapses such families to one report each:
//!
//! - [`Policy`] picks each report's important event sequence,
//! - [`DedupTrie`] keeps the shortest report of every suffix-related family,
//! - [`ingest`] parses report files in parallel and drives the trie.
//!
//! Parsing the report format and rendering output live behind the
//! [`ReportSource`] trait and in the `remove-dup-html` crate.

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod config;
pub mod errors;
pub mod ingest;
pub mod model;
pub mod policy;
pub mod trie;

pub use config::{DedupConfig, IndexConfig, IndexOrder};
pub use errors::{DedupError, ReportError, Result};
pub use ingest::{
    DedupOutcome, IngestOptions, ParseFailure, ReportSource, dedup_directory, dedup_paths,
};
pub use model::{Edge, Event, Meta, MetaValue, Report, keys};
pub use policy::Policy;
pub use trie::{DedupStats, DedupTrie, Insertion, unique_reports};
