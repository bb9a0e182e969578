//! Spreadsheet capability and the cell application engine.
//!
//! Resolvers only need three things from a workbook: does a sheet exist,
//! what text is in a cell, and assign a value. [`CellStore`] is that seam;
//! [`XlsxWorkbook`] backs it with a real template and [`MemoryCellStore`]
//! keeps a sheet grid in memory.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use tracing::{debug, info};
use umya_spreadsheet::Spreadsheet;

use crate::report::ReportFillBuilder;
use crate::spec::{EnumCellValue, FillError, SpecCellRef, SpecResolvedWrite, SpecValuePolicy};
use crate::util::{derive_storable_value, persist_file_atomic};

////////////////////////////////////////////////////////////////////////////////
// #region CellStoreCapability

/// Sheet-addressable cell storage.
pub trait CellStore {
    /// Whether a worksheet named `sheet_name` exists.
    fn has_sheet(&self, sheet_name: &str) -> bool;

    /// Text of a string cell; `None` for missing sheets, blank or non-text cells.
    fn read_text(&self, sheet_name: &str, cell: SpecCellRef) -> Option<String>;

    /// Assign `value`; returns `false` when the sheet is absent.
    fn write_value(&mut self, sheet_name: &str, cell: SpecCellRef, value: &EnumCellValue) -> bool;
}

/// In-memory sheet grid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryCellStore {
    dict_sheets: BTreeMap<String, BTreeMap<SpecCellRef, EnumCellValue>>,
}

impl MemoryCellStore {
    /// Store without sheets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with the given (empty) sheets.
    pub fn with_sheets<I, S>(sheet_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            dict_sheets: sheet_names
                .into_iter()
                .map(|name| (name.into(), BTreeMap::new()))
                .collect(),
        }
    }

    /// Current value; [`EnumCellValue::Empty`] when unset.
    pub fn get_value(&self, sheet_name: &str, cell: SpecCellRef) -> EnumCellValue {
        self.dict_sheets
            .get(sheet_name)
            .and_then(|cells| cells.get(&cell))
            .cloned()
            .unwrap_or_default()
    }

    /// Number of non-empty cells across all sheets.
    pub fn cell_count(&self) -> usize {
        self.dict_sheets.values().map(BTreeMap::len).sum()
    }
}

impl CellStore for MemoryCellStore {
    fn has_sheet(&self, sheet_name: &str) -> bool {
        self.dict_sheets.contains_key(sheet_name)
    }

    fn read_text(&self, sheet_name: &str, cell: SpecCellRef) -> Option<String> {
        match self.dict_sheets.get(sheet_name)?.get(&cell)? {
            EnumCellValue::String(text) => Some(text.clone()),
            _ => None,
        }
    }

    fn write_value(&mut self, sheet_name: &str, cell: SpecCellRef, value: &EnumCellValue) -> bool {
        let Some(cells) = self.dict_sheets.get_mut(sheet_name) else {
            return false;
        };
        if value.is_empty() {
            cells.remove(&cell);
        } else {
            cells.insert(cell, value.clone());
        }
        true
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region XlsxWorkbook

/// Template workbook opened for in-memory edits.
pub struct XlsxWorkbook {
    book: Spreadsheet,
}

impl XlsxWorkbook {
    /// Open the template at `path`.
    pub fn open(path: &Path) -> Result<Self, FillError> {
        if !path.is_file() {
            return Err(FillError::TemplateNotFound(path.to_path_buf()));
        }
        let book = umya_spreadsheet::reader::xlsx::read(path).map_err(|err| {
            FillError::WorkbookRead {
                path: path.to_path_buf(),
                message: derive_xlsx_error_text(err),
            }
        })?;
        Ok(Self { book })
    }

    /// Worksheet names in workbook order.
    pub fn sheet_names(&self) -> Vec<String> {
        self.book
            .get_sheet_collection()
            .iter()
            .map(|sheet| sheet.get_name().to_string())
            .collect()
    }

    /// Write the workbook to `path_file_out` via temp file + rename.
    pub fn save(&self, path_file_out: &Path) -> Result<(), FillError> {
        persist_file_atomic(path_file_out, ".xlsx", |path_tmp| {
            umya_spreadsheet::writer::xlsx::write(&self.book, path_tmp).map_err(|err| {
                FillError::WorkbookWrite {
                    path: path_file_out.to_path_buf(),
                    message: derive_xlsx_error_text(err),
                }
            })
        })?;
        info!("Saved workbook {}", path_file_out.display());
        Ok(())
    }
}

impl CellStore for XlsxWorkbook {
    fn has_sheet(&self, sheet_name: &str) -> bool {
        self.book.get_sheet_by_name(sheet_name).is_some()
    }

    fn read_text(&self, sheet_name: &str, cell: SpecCellRef) -> Option<String> {
        let sheet = self.book.get_sheet_by_name(sheet_name)?;
        let cell = sheet.get_cell((cell.col, cell.row))?;
        if !matches!(cell.get_data_type(), "s" | "str" | "inlineStr") {
            return None;
        }
        let text = cell.get_value();
        (!text.is_empty()).then(|| text.into_owned())
    }

    fn write_value(&mut self, sheet_name: &str, cell: SpecCellRef, value: &EnumCellValue) -> bool {
        let Some(sheet) = self.book.get_sheet_by_name_mut(sheet_name) else {
            return false;
        };
        let target = sheet.get_cell_mut((cell.col, cell.row));
        match value {
            EnumCellValue::Empty => {}
            EnumCellValue::Integer(v) => {
                target.set_value_number(*v as f64);
            }
            EnumCellValue::Float(v) => {
                target.set_value_number(*v);
            }
            EnumCellValue::String(v) => {
                target.set_value_string(v.as_str());
            }
            EnumCellValue::Boolean(v) => {
                target.set_value_bool(*v);
            }
        }
        true
    }
}

fn derive_xlsx_error_text(err: impl fmt::Display) -> String {
    format!("xlsx error: {err}")
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellApplicationEngine

/// What happened to one resolved write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumApplyOutcome {
    /// Value assigned.
    Written,
    /// Empty sentinel; target cell left as is.
    SkippedEmpty,
    /// Target sheet absent.
    SkippedSheet,
}

/// Apply one resolved write, recording the outcome in `builder`.
pub fn apply_resolved_write<S: CellStore + ?Sized>(
    store: &mut S,
    write: SpecResolvedWrite,
    value_policy: &SpecValuePolicy,
    builder: &mut ReportFillBuilder,
) -> EnumApplyOutcome {
    builder.add_resolved();
    if write.value.is_empty() {
        debug!("Skip empty value for {}!{}", write.sheet_name, write.cell);
        builder.add_skipped_empty();
        return EnumApplyOutcome::SkippedEmpty;
    }

    let value = derive_storable_value(&write.value, value_policy);
    if !store.write_value(&write.sheet_name, write.cell, &value) {
        debug!("Skip write to missing sheet {:?}", write.sheet_name);
        builder.add_skipped_sheet(&write.sheet_name);
        return EnumApplyOutcome::SkippedSheet;
    }

    builder.add_written(SpecResolvedWrite { value, ..write });
    EnumApplyOutcome::Written
}

/// Apply writes in order; later writes to the same cell win.
pub fn apply_resolved_writes<S, I>(
    store: &mut S,
    writes: I,
    value_policy: &SpecValuePolicy,
    builder: &mut ReportFillBuilder,
) where
    S: CellStore + ?Sized,
    I: IntoIterator<Item = SpecResolvedWrite>,
{
    for write in writes {
        apply_resolved_write(store, write, value_policy, builder);
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
