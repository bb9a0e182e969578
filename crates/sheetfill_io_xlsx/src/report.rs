//! Fill report models and mutable report builder.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use tracing::debug;

use crate::spec::SpecResolvedWrite;

/// Aggregate counters and diagnostics for one fill run.
#[derive(Debug, Default, Clone)]
pub struct ReportFill {
    /// Output workbook path; `None` under dry run.
    pub path_file_out: Option<PathBuf>,
    /// Number of resolved writes handed to the apply engine.
    pub cnt_resolved: u64,
    /// Number of cells actually assigned.
    pub cnt_written: u64,
    /// Writes skipped because the value was the empty sentinel.
    pub cnt_skipped_empty: u64,
    /// Writes skipped because the target sheet is absent.
    pub cnt_skipped_sheet: u64,
    /// Configuration entries dropped before resolution (unknown label, bad column, malformed).
    pub cnt_dropped: u64,
    /// Applied writes in application order.
    pub writes: Vec<SpecResolvedWrite>,
    /// Human-readable notes for dropped or skipped entries.
    pub warnings: Vec<String>,
}

impl ReportFill {
    /// Number of collected warnings.
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_resolved".to_string(), self.cnt_resolved);
        dict_counts.insert("cnt_written".to_string(), self.cnt_written);
        dict_counts.insert("cnt_skipped_empty".to_string(), self.cnt_skipped_empty);
        dict_counts.insert("cnt_skipped_sheet".to_string(), self.cnt_skipped_sheet);
        dict_counts.insert("cnt_dropped".to_string(), self.cnt_dropped);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} resolved={} written={} skipped_empty={} skipped_sheet={} dropped={}",
            self.cnt_resolved,
            self.cnt_written,
            self.cnt_skipped_empty,
            self.cnt_skipped_sheet,
            self.cnt_dropped
        )
    }
}

impl fmt::Display for ReportFill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[FILL]"))
    }
}

/// Mutable accumulator for fill statistics.
#[derive(Debug, Default, Clone)]
pub struct ReportFillBuilder {
    /// See [`ReportFill::cnt_resolved`].
    pub cnt_resolved: u64,
    /// See [`ReportFill::cnt_skipped_empty`].
    pub cnt_skipped_empty: u64,
    /// See [`ReportFill::cnt_skipped_sheet`].
    pub cnt_skipped_sheet: u64,
    /// See [`ReportFill::cnt_dropped`].
    pub cnt_dropped: u64,
    /// See [`ReportFill::writes`].
    pub writes: Vec<SpecResolvedWrite>,
    /// See [`ReportFill::warnings`].
    pub warnings: Vec<String>,
}

impl ReportFillBuilder {
    /// Increment resolved count by one.
    pub fn add_resolved(&mut self) {
        self.cnt_resolved += 1;
    }

    /// Record one applied write.
    pub fn add_written(&mut self, write: SpecResolvedWrite) {
        self.writes.push(write);
    }

    /// Increment empty-sentinel skip count by one.
    pub fn add_skipped_empty(&mut self) {
        self.cnt_skipped_empty += 1;
    }

    /// Record a write dropped for a missing sheet.
    pub fn add_skipped_sheet(&mut self, sheet_name: &str) {
        self.cnt_skipped_sheet += 1;
        self.warnings
            .push(format!("Sheet not found, write skipped: {sheet_name:?}"));
    }

    /// Record a configuration entry dropped before resolution.
    pub fn add_dropped(&mut self, warning: String) {
        debug!("Dropped: {warning}");
        self.cnt_dropped += 1;
        self.warnings.push(warning);
    }

    /// Count entries dropped upstream that carry no individual warning.
    pub fn add_dropped_many(&mut self, cnt: u64) {
        self.cnt_dropped += cnt;
    }

    /// Finalize builder into immutable report.
    pub fn build(self, path_file_out: Option<PathBuf>) -> ReportFill {
        ReportFill {
            path_file_out,
            cnt_resolved: self.cnt_resolved,
            cnt_written: self.writes.len() as u64,
            cnt_skipped_empty: self.cnt_skipped_empty,
            cnt_skipped_sheet: self.cnt_skipped_sheet,
            cnt_dropped: self.cnt_dropped,
            writes: self.writes,
            warnings: self.warnings,
        }
    }
}
