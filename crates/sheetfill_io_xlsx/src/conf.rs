//! Template constants, default paths and compile-time coordinate tables.

use crate::spec::SpecBudgetGroup;

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: u32 = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: u32 = 16_384;
/// Maximum number of letters in a column reference (`XFD`).
pub const N_LEN_COLUMN_LETTERS_MAX: usize = 3;

/// Configuration document used when no `--config` is given.
pub const C_FILE_CONFIG_DEFAULT: &str = "kalani_config.yaml";
/// Template workbook used when neither override nor `project.template` is set.
pub const C_FILE_TEMPLATE_DEFAULT: &str = "A.CRE-Hotel-Development-Model-beta-v1.57.xlsx";
/// Output workbook used when neither override nor `project.output` is set.
pub const C_FILE_OUTPUT_DEFAULT: &str = "updated_model.xlsx";

/// First row of the template's labeled input region.
pub const N_ROW_LABEL_SCAN_START: u32 = 11;
/// Last row (inclusive) scanned for budget labels.
pub const N_ROW_LABEL_SCAN_END: u32 = 99;

////////////////////////////////////////////////////////////////////////////////
// #region SheetNames

pub const C_SHEET_SUMMARY: &str = "Summary";
pub const C_SHEET_BUDGET: &str = "Budget";
pub const C_SHEET_WATERFALL: &str = "Waterfall - IRR Hurdles";

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SectionKeys

pub const C_SECTION_PROJECT: &str = "project";
pub const C_SECTION_SUMMARY: &str = "summary";
pub const C_SECTION_SUMMARY_HIGHLIGHTS: &str = "highlights";
pub const C_SECTION_SUMMARY_INPUTS: &str = "inputs";
pub const C_SECTION_BUDGET: &str = "budget";
pub const C_SECTION_WATERFALL: &str = "waterfall";
pub const C_SECTION_CELL_INPUTS: &str = "cell_inputs";
pub const C_SECTION_MANUAL_CELLS: &str = "manual_cells";
pub const C_SECTION_ROW_RANGES: &str = "row_ranges";

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CoordinateTables

/// Summary banner text, written top to bottom.
pub const TUP_SUMMARY_HIGHLIGHT_CELLS: [(&str, &str); 5] = [
    ("title", "A1"),
    ("equity_note", "A2"),
    ("irr_note", "A3"),
    ("refi_note", "A4"),
    ("distribution_note", "A5"),
];

/// Blue input cells on the `Summary` sheet.
pub const TUP_SUMMARY_INPUT_CELLS: [(&str, &str); 28] = [
    ("property_name", "C5"),
    ("address", "C6"),
    ("city_state_zip", "C7"),
    ("room_count", "C9"),
    ("gross_square_feet", "C10"),
    ("analysis_start_month", "C14"),
    ("analysis_start_year", "C15"),
    ("operations_start_month", "C18"),
    ("operations_start_year", "C19"),
    ("hold_period_years", "C20"),
    ("mezz_toggle", "C36"),
    ("exit_cap_rate", "C25"),
    ("sale_cost_rate", "C27"),
    ("mezz_ltc", "C37"),
    ("senior_floor_rate", "C45"),
    ("senior_ceiling_rate", "C46"),
    ("perm_floor_rate", "C56"),
    ("perm_ceiling_rate", "C57"),
    ("dial_in_interest_rate", "C43"),
    ("secondary_ltc_control", "C48"),
    ("refi_interest_rate_bps", "C54"),
    ("operating_cashflow_pct_to_interest", "C58"),
    ("going_in_cap_rate", "G37"),
    ("ltv_ratio", "G39"),
    ("senior_interest_rate", "G40"),
    ("loan_fee_percent", "G41"),
    ("interest_only_months", "G42"),
    ("amortization_years", "G43"),
];

/// Budget group -> (label column, value column) on the `Budget` sheet.
pub const TUP_BUDGET_GROUP_COLUMNS: [(&str, &str, &str); 6] = [
    ("acquisition", "P", "Q"),
    ("soft_costs", "T", "U"),
    ("hard_costs", "X", "Y"),
    ("ff_and_e", "AB", "AC"),
    ("financing_costs", "AF", "AG"),
    ("other_costs", "AJ", "AK"),
];

/// Waterfall inputs -> (sheet, cell).
pub const TUP_WATERFALL_CELLS: [(&str, &str, &str); 6] = [
    ("lp_equity_share", C_SHEET_WATERFALL, "C6"),
    ("tier1_lp_split", C_SHEET_WATERFALL, "C9"),
    ("tier1_hurdle", C_SHEET_WATERFALL, "C11"),
    ("tier2_gp_promote", C_SHEET_WATERFALL, "C13"),
    ("tier3_gp_promote", C_SHEET_WATERFALL, "C18"),
    ("post_stabilization_gp_share", C_SHEET_WATERFALL, "C24"),
];

/// Summary fields the input form always submits.
pub const TUP_FORM_SUMMARY_FIELDS: [&str; 13] = [
    "property_name",
    "address",
    "city_state_zip",
    "room_count",
    "gross_square_feet",
    "analysis_start_month",
    "analysis_start_year",
    "operations_start_month",
    "operations_start_year",
    "hold_period_years",
    "exit_cap_rate",
    "sale_cost_rate",
    "mezz_ltc",
];

/// Budget group descriptors in table order.
pub fn derive_budget_groups() -> Vec<SpecBudgetGroup> {
    TUP_BUDGET_GROUP_COLUMNS
        .iter()
        .map(|&(group, col_label, col_value)| SpecBudgetGroup {
            group,
            col_label,
            col_value,
        })
        .collect()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn assert_unique(keys: impl IntoIterator<Item = &'static str>) {
        let l_keys: Vec<&str> = keys.into_iter().collect();
        let set_keys: BTreeSet<&str> = l_keys.iter().copied().collect();
        assert_eq!(l_keys.len(), set_keys.len(), "duplicate keys: {l_keys:?}");
    }

    #[test]
    fn coordinate_table_keys_are_unique() {
        assert_unique(TUP_SUMMARY_HIGHLIGHT_CELLS.iter().map(|(k, _)| *k));
        assert_unique(TUP_SUMMARY_INPUT_CELLS.iter().map(|(k, _)| *k));
        assert_unique(TUP_BUDGET_GROUP_COLUMNS.iter().map(|(k, _, _)| *k));
        assert_unique(TUP_WATERFALL_CELLS.iter().map(|(k, _, _)| *k));
    }

    #[test]
    fn form_summary_fields_are_mapped_inputs() {
        for field in TUP_FORM_SUMMARY_FIELDS {
            assert!(
                TUP_SUMMARY_INPUT_CELLS.iter().any(|(k, _)| *k == field),
                "{field} has no summary cell"
            );
        }
    }
}
