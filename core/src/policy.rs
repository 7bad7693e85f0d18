//! Importance policies.
//!
//! A policy picks the events that characterize a report's defect, its
//! important event sequence. Two reports are compared only through these
//! sequences, so the policy decides how eagerly paths are merged.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ReportError;
use crate::model::{Event, Report, keys};

const MEMORY_LEAK: &str = "Memory leak";
const LEAK_MARKERS: [&str; 2] = [" exception", "Memory is allocated"];
const NARRATION_PREFIXES: [&str; 2] = ["Assuming", "Taking"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    /// Keep only events that tell leak paths apart, or events in the file
    /// where the defect is reported minus branch narration.
    Aggressive,
    /// Every event is important.
    #[default]
    Conservative,
}

impl Policy {
    /// Ordered subsequence of `report.events()` used as the report's
    /// duplicate signature.
    pub fn important_events(self, report: &Report) -> Vec<&Event> {
        match self {
            Self::Conservative => report.events().iter().collect(),
            Self::Aggressive if report.bug_type() == Some(MEMORY_LEAK) => leak_events(report),
            Self::Aggressive => defect_file_events(report),
        }
    }

    /// Verify the report carries what this policy reads.
    pub fn check(self, report: &Report) -> Result<(), ReportError> {
        match self {
            Self::Aggressive if !report.has_meta(keys::BUGTYPE) => {
                Err(ReportError::MissingMeta(keys::BUGTYPE.to_string()))
            }
            _ => Ok(()),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aggressive => "aggressive",
            Self::Conservative => "conservative",
        }
    }
}

fn leak_events(report: &Report) -> Vec<&Event> {
    report
        .events()
        .iter()
        .filter(|event| LEAK_MARKERS.iter().any(|marker| event.message().contains(marker)))
        .collect()
}

// The defect-reporting step is always last on the path.
fn defect_file_events(report: &Report) -> Vec<&Event> {
    let Some(important_file) = report.events().last().map(Event::file) else {
        return Vec::new();
    };
    report
        .events()
        .iter()
        .filter(|event| event.file() == important_file)
        .filter(|event| {
            !NARRATION_PREFIXES
                .iter()
                .any(|prefix| event.message().starts_with(prefix))
        })
        .collect()
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Policy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "aggressive" => Ok(Self::Aggressive),
            "conservative" => Ok(Self::Conservative),
            other => Err(format!(
                "unknown policy `{other}` (expected `aggressive` or `conservative`)"
            )),
        }
    }
}
