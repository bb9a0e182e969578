//! `sheetfill_io_xlsx` v1:
//! Rust-side template fill engine.
//!
//! Architecture:
//! - `conf`       : constants, default paths and coordinate tables
//! - `spec`       : models/options/errors
//! - `util`       : pure helper functions (coercion, cell refs, paths)
//! - `config`     : YAML configuration document
//! - `normalize`  : `cell_inputs` / `manual_cells` shape normalizer
//! - `resolve`    : static map, label search and row range resolvers
//! - `workbook`   : cell store capability + apply engine
//! - `report`     : run-time report model
//! - `runner`     : fill orchestration
//! - `submission` : form field merge
pub mod conf;
pub mod config;
pub mod normalize;
pub mod report;
pub mod resolve;
pub mod runner;
pub mod spec;
pub mod submission;
pub mod util;
pub mod workbook;

pub use conf::{
    C_FILE_CONFIG_DEFAULT, C_FILE_OUTPUT_DEFAULT, C_FILE_TEMPLATE_DEFAULT, C_SHEET_BUDGET,
    C_SHEET_SUMMARY, C_SHEET_WATERFALL, N_ROW_LABEL_SCAN_END, N_ROW_LABEL_SCAN_START,
    TUP_BUDGET_GROUP_COLUMNS, TUP_SUMMARY_HIGHLIGHT_CELLS, TUP_SUMMARY_INPUT_CELLS,
    TUP_WATERFALL_CELLS,
};
pub use config::ConfigDocument;
pub use normalize::{SpecSheetGroupedAssignments, normalize_cell_inputs, normalize_cell_sections};
pub use report::{ReportFill, ReportFillBuilder};
pub use resolve::{
    SpecLabelIndex, parse_row_range_directives, resolve_budget_labels, resolve_cell_assignments,
    resolve_row_ranges, resolve_static_map,
};
pub use runner::{SpecFillPaths, fill_workbook, resolve_fill_paths, run_fill, run_fill_from_paths};
pub use spec::{
    EnumCellValue, EnumFillStage, EnumRowRangeValues, FillError, SpecBudgetGroup,
    SpecCellAssignment, SpecCellRef, SpecFillOptions, SpecLabelScanWindow, SpecProjectPaths,
    SpecResolvedWrite, SpecRowRangeDirective, SpecValuePolicy,
};
pub use submission::{apply_form_fields, parse_field_assignment};
pub use util::{
    convert_column_index_to_letters, convert_column_letters_to_index, format_cell_ref,
    parse_cell_ref, parse_value,
};
pub use workbook::{
    CellStore, EnumApplyOutcome, MemoryCellStore, XlsxWorkbook, apply_resolved_write,
    apply_resolved_writes,
};
