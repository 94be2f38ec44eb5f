use serde::Serialize;
use std::collections::BTreeMap;

use crate::console_warn;
use crate::error::{ErrorKind, MapDataError};

/// A skipped input record and why it was skipped
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    /// Position of the record in its source array
    pub index: usize,
    pub kind: ErrorKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(index: usize, error: &MapDataError) -> Self {
        Self {
            index,
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Diagnostics collected while processing one batch
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DiagnosticReport {
    entries: Vec<Diagnostic>,
}

impl DiagnosticReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, index: usize, error: &MapDataError) {
        self.entries.push(Diagnostic::new(index, error));
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, kind: ErrorKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }

    pub fn counts(&self) -> BTreeMap<ErrorKind, usize> {
        let mut counts = BTreeMap::new();
        for entry in &self.entries {
            *counts.entry(entry.kind).or_insert(0) += 1;
        }
        counts
    }

    /// One console line per batch, not per record
    pub fn log_summary(&self, label: &str) {
        if self.entries.is_empty() {
            return;
        }
        let summary = self
            .counts()
            .iter()
            .map(|(kind, count)| format!("{:?}={}", kind, count))
            .collect::<Vec<_>>()
            .join(", ");
        console_warn!("{}: skipped {} record(s) ({})", label, self.entries.len(), summary);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_by_kind() {
        let mut report = DiagnosticReport::new();
        report.push(0, &MapDataError::malformed("ring has 3 vertices"));
        report.push(
            4,
            &MapDataError::InvalidCoordinate {
                longitude: f64::NAN,
                latitude: 1.0,
            },
        );
        report.push(7, &MapDataError::malformed("ring is not closed"));

        assert_eq!(report.len(), 3);
        assert_eq!(report.count(ErrorKind::MalformedGeometry), 2);
        assert_eq!(report.count(ErrorKind::InvalidCoordinate), 1);
        assert_eq!(report.count(ErrorKind::OutOfDomain), 0);
        assert_eq!(report.counts().get(&ErrorKind::MalformedGeometry), Some(&2));
        report.log_summary("test batch");
    }

    #[test]
    fn test_serializes_as_plain_list() {
        let mut report = DiagnosticReport::new();
        report.push(2, &MapDataError::malformed("bad height"));
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(
            value,
            serde_json::json!([{
                "index": 2,
                "kind": "malformedGeometry",
                "message": "Malformed geometry: bad height"
            }])
        );
    }
}
