//! Shared fill specification models and top-level error types.

use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

use crate::conf::{N_ROW_LABEL_SCAN_END, N_ROW_LABEL_SCAN_START};

////////////////////////////////////////////////////////////////////////////////
// #region CellValueSpecification

/// Typed scalar written into one cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EnumCellValue {
    /// Nothing supplied; applying it leaves the target cell untouched.
    #[default]
    Empty,
    /// Whole number.
    Integer(i64),
    /// Floating point number.
    Float(f64),
    /// Text value.
    String(String),
    /// Boolean value.
    Boolean(bool),
}

impl EnumCellValue {
    /// Whether this value is the "no value supplied" sentinel.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl fmt::Display for EnumCellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, ""),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v}"),
            Self::Boolean(v) => write!(f, "{}", if *v { "TRUE" } else { "FALSE" }),
        }
    }
}

/// Replacement text for floats a workbook cannot store as numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecValuePolicy {
    /// Replacement text for NaN.
    pub nan_str: String,
    /// Replacement text for positive infinity.
    pub posinf_str: String,
    /// Replacement text for negative infinity.
    pub neginf_str: String,
}

impl Default for SpecValuePolicy {
    fn default() -> Self {
        Self {
            nan_str: "NaN".to_string(),
            posinf_str: "Inf".to_string(),
            neginf_str: "-Inf".to_string(),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CoordinateSpecification

/// One-based `(column, row)` cell coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpecCellRef {
    /// One-based column index (`A` = 1).
    pub col: u32,
    /// One-based row index.
    pub row: u32,
}

impl fmt::Display for SpecCellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", crate::util::format_cell_ref(*self))
    }
}

/// Canonical unit produced by every resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecResolvedWrite {
    /// Target worksheet name.
    pub sheet_name: String,
    /// Target cell.
    pub cell: SpecCellRef,
    /// Value to assign.
    pub value: EnumCellValue,
}

/// Normalized `cell_inputs` / `manual_cells` entry, cell reference still textual.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecCellAssignment {
    /// Target worksheet name.
    pub sheet_name: String,
    /// Cell reference as written in configuration (e.g. `C5`).
    pub cell_ref: String,
    /// Value to assign.
    pub value: EnumCellValue,
}

/// Values spread over a row range.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumRowRangeValues {
    /// One value copied into every column of the span.
    Replicate(EnumCellValue),
    /// Values consumed left to right; extra columns are left untouched.
    Sequence(Vec<EnumCellValue>),
}

/// One `row_ranges` entry.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecRowRangeDirective {
    /// Target worksheet name.
    pub sheet_name: String,
    /// One-based target row.
    pub row: u32,
    /// Start column letters as configured.
    pub col_start: String,
    /// End column letters as configured.
    pub col_end: String,
    /// Values to write.
    pub values: EnumRowRangeValues,
}

/// Budget group descriptor: labels are searched in one column, values land in another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecBudgetGroup {
    /// Group key in the `budget` section.
    pub group: &'static str,
    /// Column holding row labels.
    pub col_label: &'static str,
    /// Column receiving values.
    pub col_value: &'static str,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RunOptions

/// Inclusive row window scanned for budget labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecLabelScanWindow {
    /// First scanned row.
    pub row_start: u32,
    /// Last scanned row (inclusive).
    pub row_end: u32,
}

impl Default for SpecLabelScanWindow {
    fn default() -> Self {
        Self {
            row_start: N_ROW_LABEL_SCAN_START,
            row_end: N_ROW_LABEL_SCAN_END,
        }
    }
}

/// `project` section of the configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct SpecProjectPaths {
    /// Template workbook path.
    pub template: Option<String>,
    /// Output workbook path.
    pub output: Option<String>,
}

/// Input options for `run_fill`.
#[derive(Debug, Clone)]
pub struct SpecFillOptions {
    /// Configuration document path.
    pub path_file_config: PathBuf,
    /// Template path override (wins over `project.template`).
    pub path_file_template: Option<PathBuf>,
    /// Output path override (wins over `project.output`).
    pub path_file_out: Option<PathBuf>,
    /// Budget label scan window.
    pub label_scan_window: SpecLabelScanWindow,
    /// Float replacement policy.
    pub value_policy: SpecValuePolicy,
    /// Resolve and apply in memory but do not save.
    pub if_dry_run: bool,
}

impl Default for SpecFillOptions {
    fn default() -> Self {
        Self {
            path_file_config: PathBuf::from(crate::conf::C_FILE_CONFIG_DEFAULT),
            path_file_template: None,
            path_file_out: None,
            label_scan_window: SpecLabelScanWindow::default(),
            value_policy: SpecValuePolicy::default(),
            if_dry_run: false,
        }
    }
}

/// Orchestrator progress through one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EnumFillStage {
    /// Configuration document read.
    Loaded,
    /// Summary highlights and inputs applied.
    SummaryApplied,
    /// Budget labels resolved and applied.
    BudgetApplied,
    /// Waterfall inputs applied.
    WaterfallApplied,
    /// `cell_inputs` + `manual_cells` applied.
    CellsApplied,
    /// `row_ranges` applied.
    RowsApplied,
    /// Output persisted (or skipped under dry run).
    Saved,
}

impl fmt::Display for EnumFillStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c_name = match self {
            Self::Loaded => "loaded",
            Self::SummaryApplied => "summary_applied",
            Self::BudgetApplied => "budget_applied",
            Self::WaterfallApplied => "waterfall_applied",
            Self::CellsApplied => "cells_applied",
            Self::RowsApplied => "rows_applied",
            Self::Saved => "saved",
        };
        write!(f, "{c_name}")
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// "Run stopped" errors. Per-entry problems never surface here.
#[derive(Debug, Error)]
pub enum FillError {
    /// Configuration document does not exist.
    #[error("Config file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),
    /// Configuration document is not valid YAML or its root is not a mapping.
    #[error("Invalid config {}: {message}", path.display())]
    ConfigInvalid {
        /// Configuration path.
        path: PathBuf,
        /// Parser message.
        message: String,
    },
    /// Template workbook does not exist.
    #[error("Cannot find template workbook at {}", .0.display())]
    TemplateNotFound(PathBuf),
    /// Template exists but could not be parsed.
    #[error("Failed to read workbook {}: {message}", path.display())]
    WorkbookRead {
        /// Template path.
        path: PathBuf,
        /// Reader message.
        message: String,
    },
    /// Output would overwrite the template.
    #[error("Output path is the template itself: {}", .0.display())]
    OutputIsTemplate(PathBuf),
    /// Run options are inconsistent.
    #[error("{0}")]
    InvalidOptions(String),
    /// Workbook serialization failed.
    #[error("Failed to write workbook {}: {message}", path.display())]
    WorkbookWrite {
        /// Output path.
        path: PathBuf,
        /// Writer message.
        message: String,
    },
    /// Filesystem error while persisting.
    #[error("IO error at {}: {source}", path.display())]
    Io {
        /// Path involved.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
