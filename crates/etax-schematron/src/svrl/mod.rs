//! Schematron Validation Report Language (SVRL) model.

mod entry;
mod reader;
mod writer;

pub use entry::{
    EntryKind, ExtractError, MixedText, Outcome, ReportEntry, Segment, SvrlEntry, SvrlText,
    TextPayload,
};

/// SVRL namespace URI.
pub const SVRL_NAMESPACE: &str = "http://purl.oclc.org/dsdl/svrl";

/// Raw report produced by executing a bundle, or read from SVRL XML.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SvrlReport {
    pub title: Option<String>,
    pub schema_version: Option<String>,
    pub query_binding: Option<String>,
    /// `(prefix, uri)` pairs from `svrl:ns-prefix-in-attribute-values`.
    pub namespaces: Vec<(String, String)>,
    entries: Vec<SvrlEntry>,
}

impl SvrlReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: SvrlEntry) {
        self.entries.push(entry);
    }

    /// Entries in report order.
    pub fn entries(&self) -> &[SvrlEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn failed_asserts(&self) -> impl Iterator<Item = &Outcome> {
        self.entries.iter().filter_map(|entry| match entry {
            SvrlEntry::FailedAssert(outcome) => Some(outcome),
            _ => None,
        })
    }

    pub fn successful_reports(&self) -> impl Iterator<Item = &Outcome> {
        self.entries.iter().filter_map(|entry| match entry {
            SvrlEntry::SuccessfulReport(outcome) => Some(outcome),
            _ => None,
        })
    }

    /// Number of fired rules recorded in the report.
    pub fn fired_rule_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| matches!(entry, SvrlEntry::FiredRule { .. }))
            .count()
    }
}

impl FromIterator<SvrlEntry> for SvrlReport {
    fn from_iter<I: IntoIterator<Item = SvrlEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
            ..Self::default()
        }
    }
}
