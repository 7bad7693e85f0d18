//! Suffix-matching dedup trie.
//!
//! Report B duplicates report A when A's important event sequence is a
//! suffix of B's. Walking each sequence in reverse turns suffix containment
//! into prefix containment, so one left-to-right trie walk per report finds
//! every conflict without pairwise comparison. The shorter report always
//! wins.
//!
//! When two reports have identical sequences the one inserted last owns the
//! node. Insertion follows parse completion order, so which of them survives
//! is unspecified.

use std::collections::{HashMap, VecDeque};

use serde::Serialize;

use crate::model::{Edge, Event, Report};
use crate::policy::Policy;

#[derive(Debug, Default)]
struct Node {
    children: HashMap<Edge, Node>,
    owner: Option<Report>,
}

impl Node {
    fn is_leaf(&self) -> bool {
        self.owner.is_some() && self.children.is_empty()
    }

    /// Take ownership of `report`, dropping everything below this node.
    /// Returns how many reports were displaced.
    fn claim(&mut self, report: Report) -> usize {
        let mut displaced = usize::from(self.owner.is_some());
        let mut stack: Vec<Node> = self.children.drain().map(|(_, child)| child).collect();
        while let Some(node) = stack.pop() {
            displaced += usize::from(node.owner.is_some());
            stack.extend(node.children.into_values());
        }
        self.owner = Some(report);
        displaced
    }
}

/// Result of a single insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    /// The report now owns a node; `superseded` longer (or tied) reports
    /// were dropped to make room.
    Kept { superseded: usize },
    /// A shorter report already covers this one.
    Redundant,
}

/// Running counters over one dedup run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DedupStats {
    pub inserted: usize,
    pub redundant: usize,
    pub superseded: usize,
}

impl DedupStats {
    /// Reports still owning a node.
    pub fn surviving(&self) -> usize {
        self.inserted - self.redundant - self.superseded
    }
}

#[derive(Debug)]
pub struct DedupTrie {
    root: Node,
    policy: Policy,
    stats: DedupStats,
}

impl DedupTrie {
    pub fn new(policy: Policy) -> Self {
        Self {
            root: Node::default(),
            policy,
            stats: DedupStats::default(),
        }
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    pub fn stats(&self) -> DedupStats {
        self.stats
    }

    pub fn insert(&mut self, report: Report) -> Insertion {
        self.stats.inserted += 1;
        let edges: Vec<Edge> = self
            .policy
            .important_events(&report)
            .into_iter()
            .rev()
            .map(Event::edge)
            .collect();

        let mut node = &mut self.root;
        for edge in edges {
            if node.is_leaf() {
                tracing::debug!(
                    path = %report.path().display(),
                    "discarding report covered by a shorter one"
                );
                self.stats.redundant += 1;
                return Insertion::Redundant;
            }
            node = node.children.entry(edge).or_default();
        }

        let superseded = node.claim(report);
        self.stats.superseded += superseded;
        Insertion::Kept { superseded }
    }

    /// Consume the trie and return every report still owning a leaf. The
    /// order of the result carries no meaning.
    pub fn into_survivors(self) -> Vec<Report> {
        let mut reports = Vec::new();
        let mut queue = VecDeque::from([self.root]);
        while let Some(Node { children, owner }) = queue.pop_front() {
            match owner {
                Some(report) if children.is_empty() => reports.push(report),
                _ => queue.extend(children.into_values()),
            }
        }
        reports
    }
}

/// Deduplicate `reports` under `policy`.
pub fn unique_reports(reports: impl IntoIterator<Item = Report>, policy: Policy) -> Vec<Report> {
    let mut trie = DedupTrie::new(policy);
    for report in reports {
        trie.insert(report);
    }
    trie.into_survivors()
}
