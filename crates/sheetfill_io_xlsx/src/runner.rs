//! Fill orchestration: configuration document -> resolved writes -> saved workbook.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::conf::{
    C_FILE_OUTPUT_DEFAULT, C_FILE_TEMPLATE_DEFAULT, C_SECTION_BUDGET, C_SECTION_CELL_INPUTS,
    C_SECTION_MANUAL_CELLS, C_SECTION_ROW_RANGES, C_SECTION_SUMMARY,
    C_SECTION_SUMMARY_HIGHLIGHTS, C_SECTION_SUMMARY_INPUTS, C_SECTION_WATERFALL, C_SHEET_BUDGET,
    C_SHEET_SUMMARY, N_NROWS_EXCEL_MAX, TUP_SUMMARY_HIGHLIGHT_CELLS, TUP_SUMMARY_INPUT_CELLS,
    TUP_WATERFALL_CELLS, derive_budget_groups,
};
use crate::config::ConfigDocument;
use crate::normalize::normalize_cell_sections;
use crate::report::{ReportFill, ReportFillBuilder};
use crate::resolve::{
    parse_row_range_directives, resolve_budget_labels, resolve_cell_assignments,
    resolve_row_ranges, resolve_static_map,
};
use crate::spec::{EnumFillStage, FillError, SpecFillOptions, SpecLabelScanWindow};
use crate::util::{derive_display_path, is_same_path};
use crate::workbook::{CellStore, XlsxWorkbook, apply_resolved_writes};

/// Template and output paths after precedence is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecFillPaths {
    pub path_file_template: PathBuf,
    pub path_file_out: PathBuf,
}

/// Override > `project.*` > built-in default.
pub fn resolve_fill_paths(options: &SpecFillOptions, config: &ConfigDocument) -> SpecFillPaths {
    let project = config.project_paths();
    let path_file_template = options
        .path_file_template
        .clone()
        .or_else(|| project.template.map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(C_FILE_TEMPLATE_DEFAULT));
    let path_file_out = options
        .path_file_out
        .clone()
        .or_else(|| project.output.map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(C_FILE_OUTPUT_DEFAULT));
    SpecFillPaths {
        path_file_template,
        path_file_out,
    }
}

/// Reject scan windows outside the worksheet or with start after end.
pub fn validate_label_scan_window(window: SpecLabelScanWindow) -> Result<(), FillError> {
    if window.row_start == 0 {
        return Err(FillError::InvalidOptions(
            "Label scan row_start must be >= 1.".to_string(),
        ));
    }
    if window.row_start > window.row_end {
        return Err(FillError::InvalidOptions(format!(
            "Label scan row_start ({}) must be <= row_end ({}).",
            window.row_start, window.row_end
        )));
    }
    if window.row_end > N_NROWS_EXCEL_MAX {
        return Err(FillError::InvalidOptions(format!(
            "Label scan row_end must be <= {N_NROWS_EXCEL_MAX}."
        )));
    }
    Ok(())
}

fn _enter_stage(stage: EnumFillStage, builder: &ReportFillBuilder) {
    debug!(
        "stage={stage} resolved={} dropped={}",
        builder.cnt_resolved, builder.cnt_dropped
    );
}

/// Apply every configuration section to `store` in fixed section order.
///
/// Order: summary highlights, summary inputs, budget, waterfall,
/// `cell_inputs` + `manual_cells`, `row_ranges`. Within the run a later
/// write to the same cell wins. Never fails; per-entry problems land in
/// `builder`.
pub fn fill_workbook<S: CellStore + ?Sized>(
    store: &mut S,
    config: &ConfigDocument,
    options: &SpecFillOptions,
    builder: &mut ReportFillBuilder,
) -> EnumFillStage {
    let value_policy = &options.value_policy;

    let l_highlights = resolve_static_map(
        config.section_mapping(&[C_SECTION_SUMMARY, C_SECTION_SUMMARY_HIGHLIGHTS]),
        TUP_SUMMARY_HIGHLIGHT_CELLS
            .iter()
            .map(|&(key, cell)| (key, C_SHEET_SUMMARY, cell)),
        builder,
    );
    apply_resolved_writes(store, l_highlights, value_policy, builder);
    let l_inputs = resolve_static_map(
        config.section_mapping(&[C_SECTION_SUMMARY, C_SECTION_SUMMARY_INPUTS]),
        TUP_SUMMARY_INPUT_CELLS
            .iter()
            .map(|&(key, cell)| (key, C_SHEET_SUMMARY, cell)),
        builder,
    );
    apply_resolved_writes(store, l_inputs, value_policy, builder);
    _enter_stage(EnumFillStage::SummaryApplied, builder);

    let l_budget = resolve_budget_labels(
        &*store,
        C_SHEET_BUDGET,
        config.section_mapping(&[C_SECTION_BUDGET]),
        &derive_budget_groups(),
        options.label_scan_window,
        builder,
    );
    apply_resolved_writes(store, l_budget, value_policy, builder);
    _enter_stage(EnumFillStage::BudgetApplied, builder);

    let l_waterfall = resolve_static_map(
        config.section_mapping(&[C_SECTION_WATERFALL]),
        TUP_WATERFALL_CELLS.iter().copied(),
        builder,
    );
    apply_resolved_writes(store, l_waterfall, value_policy, builder);
    _enter_stage(EnumFillStage::WaterfallApplied, builder);

    let grouped = normalize_cell_sections(
        config.section(C_SECTION_CELL_INPUTS),
        config.section(C_SECTION_MANUAL_CELLS),
    );
    builder.add_dropped_many(grouped.cnt_dropped());
    let l_cells = resolve_cell_assignments(grouped.into_assignments(), builder);
    apply_resolved_writes(store, l_cells, value_policy, builder);
    _enter_stage(EnumFillStage::CellsApplied, builder);

    let l_directives = parse_row_range_directives(config.section(C_SECTION_ROW_RANGES), builder);
    let l_rows = resolve_row_ranges(&l_directives, builder);
    apply_resolved_writes(store, l_rows, value_policy, builder);
    _enter_stage(EnumFillStage::RowsApplied, builder);

    EnumFillStage::RowsApplied
}

/// Run one fill from configuration path to saved workbook.
///
/// This function performs:
/// 1. Option validation and configuration load.
/// 2. Template/output path resolution and template open.
/// 3. Section-ordered resolve + apply against the in-memory workbook.
/// 4. Atomic save (skipped under dry run).
///
/// Fatal errors leave no output file behind; any previous output at the
/// same path is left as it was. Concurrent runs targeting the same output
/// must be serialized by the caller.
pub fn run_fill(options: &SpecFillOptions) -> Result<ReportFill, FillError> {
    validate_label_scan_window(options.label_scan_window)?;

    let config = ConfigDocument::load(&options.path_file_config)?;
    let mut builder = ReportFillBuilder::default();
    _enter_stage(EnumFillStage::Loaded, &builder);

    let paths = resolve_fill_paths(options, &config);
    if !paths.path_file_template.is_file() {
        return Err(FillError::TemplateNotFound(paths.path_file_template));
    }
    if is_same_path(&paths.path_file_template, &paths.path_file_out) {
        return Err(FillError::OutputIsTemplate(paths.path_file_out));
    }
    info!(
        "Filling {} from {}",
        paths.path_file_template.display(),
        options.path_file_config.display()
    );

    let mut workbook = XlsxWorkbook::open(&paths.path_file_template)?;
    debug!("Template sheets: {:?}", workbook.sheet_names());
    fill_workbook(&mut workbook, &config, options, &mut builder);

    if options.if_dry_run {
        info!("Dry run, {} not written", paths.path_file_out.display());
        _enter_stage(EnumFillStage::Saved, &builder);
        return Ok(builder.build(None));
    }

    workbook.save(&paths.path_file_out)?;
    _enter_stage(EnumFillStage::Saved, &builder);
    Ok(builder.build(Some(derive_display_path(&paths.path_file_out))))
}

/// Same as [`run_fill`] for callers holding plain paths.
pub fn run_fill_from_paths(
    path_file_config: &Path,
    path_file_template: Option<&Path>,
    path_file_out: Option<&Path>,
) -> Result<ReportFill, FillError> {
    run_fill(&SpecFillOptions {
        path_file_config: path_file_config.to_path_buf(),
        path_file_template: path_file_template.map(Path::to_path_buf),
        path_file_out: path_file_out.map(Path::to_path_buf),
        ..SpecFillOptions::default()
    })
}
