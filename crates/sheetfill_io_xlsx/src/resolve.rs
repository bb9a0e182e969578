//! Coordinate resolvers: configuration entries -> [`SpecResolvedWrite`].
//!
//! Resolvers never fail. An entry that cannot be placed is counted as
//! dropped in the report and logged at `debug`.

use std::collections::BTreeMap;

use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::config::{describe_value_kind, get_non_null};
use crate::report::ReportFillBuilder;
use crate::spec::{
    EnumCellValue, EnumRowRangeValues, SpecBudgetGroup, SpecCellAssignment, SpecCellRef,
    SpecLabelScanWindow, SpecResolvedWrite, SpecRowRangeDirective,
};
use crate::util::{
    convert_column_letters_to_index, convert_yaml_to_cell_value, normalize_label, parse_cell_ref,
    parse_row_number,
};
use crate::workbook::CellStore;

////////////////////////////////////////////////////////////////////////////////
// #region StaticMapResolver

/// Resolve friendly names through a `(key, sheet, cell)` table.
///
/// Emits in table order. Keys missing from `section`, `null` and blank
/// values emit nothing; keys not in the table are ignored.
pub fn resolve_static_map<'a, I>(
    section: Option<&Mapping>,
    table: I,
    builder: &mut ReportFillBuilder,
) -> Vec<SpecResolvedWrite>
where
    I: IntoIterator<Item = (&'a str, &'a str, &'a str)>,
{
    let Some(section) = section else {
        return Vec::new();
    };

    let mut l_writes = Vec::new();
    for (key, sheet_name, cell_ref) in table {
        let Some(raw) = get_non_null(section, key) else {
            continue;
        };
        let Some(value) = convert_yaml_to_cell_value(raw) else {
            builder.add_dropped(format!(
                "Ignoring {key:?}: expected a scalar, got {}",
                describe_value_kind(raw)
            ));
            continue;
        };
        if value.is_empty() {
            continue;
        }
        match parse_cell_ref(cell_ref) {
            Ok(cell) => l_writes.push(SpecResolvedWrite {
                sheet_name: sheet_name.to_string(),
                cell,
                value,
            }),
            Err(err) => builder.add_dropped(err),
        }
    }
    l_writes
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region LabelSearchResolver

/// First row per normalized label within one column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecLabelIndex {
    dict_rows: BTreeMap<String, u32>,
}

impl SpecLabelIndex {
    /// Scan `col` of `sheet_name` over `window`.
    pub fn build<S: CellStore + ?Sized>(
        store: &S,
        sheet_name: &str,
        col: u32,
        window: SpecLabelScanWindow,
    ) -> Self {
        let mut dict_rows = BTreeMap::new();
        if !store.has_sheet(sheet_name) {
            debug!("Label index skipped, sheet {sheet_name:?} not found");
            return Self { dict_rows };
        }
        for row in window.row_start..=window.row_end {
            let Some(text) = store.read_text(sheet_name, SpecCellRef { col, row }) else {
                continue;
            };
            let c_label = normalize_label(&text);
            if c_label.is_empty() {
                continue;
            }
            dict_rows.entry(c_label).or_insert(row);
        }
        Self { dict_rows }
    }

    /// Row holding `label` (case- and whitespace-insensitive).
    pub fn find_row(&self, label: &str) -> Option<u32> {
        self.dict_rows.get(&normalize_label(label)).copied()
    }

    /// Number of distinct labels indexed.
    pub fn len(&self) -> usize {
        self.dict_rows.len()
    }

    /// Whether no label was found in the scan window.
    pub fn is_empty(&self) -> bool {
        self.dict_rows.is_empty()
    }
}

/// Resolve `budget.<group>.<label>` entries by searching label text.
///
/// Groups follow descriptor order; entries within a group follow the
/// document. Unmatched labels are dropped.
pub fn resolve_budget_labels<S: CellStore + ?Sized>(
    store: &S,
    sheet_name: &str,
    section: Option<&Mapping>,
    groups: &[SpecBudgetGroup],
    window: SpecLabelScanWindow,
    builder: &mut ReportFillBuilder,
) -> Vec<SpecResolvedWrite> {
    let Some(section) = section else {
        return Vec::new();
    };

    let mut l_writes = Vec::new();
    for group in groups {
        let Some(entries) = get_non_null(section, group.group) else {
            continue;
        };
        let Some(entries) = entries.as_mapping() else {
            builder.add_dropped(format!(
                "Budget group {:?} is not a mapping",
                group.group
            ));
            continue;
        };
        if entries.is_empty() {
            continue;
        }

        let (Ok(col_label), Ok(col_value)) = (
            convert_column_letters_to_index(group.col_label),
            convert_column_letters_to_index(group.col_value),
        ) else {
            builder.add_dropped(format!("Budget group {:?} has bad columns", group.group));
            continue;
        };
        let label_index = SpecLabelIndex::build(store, sheet_name, col_label, window);
        debug!(
            "Indexed {} label(s) in {sheet_name}!{} rows {}..={}",
            label_index.len(),
            group.col_label,
            window.row_start,
            window.row_end
        );

        for (label, raw) in entries {
            let Some(label) = label.as_str() else {
                builder.add_dropped(format!("Budget label is not text: {label:?}"));
                continue;
            };
            if raw.is_null() {
                continue;
            }
            let Some(value) = convert_yaml_to_cell_value(raw) else {
                builder.add_dropped(format!("Budget value for {label:?} is not a scalar"));
                continue;
            };
            if value.is_empty() {
                continue;
            }
            let Some(row) = label_index.find_row(label) else {
                builder.add_dropped(format!(
                    "Budget label not found in group {:?}: {label:?}",
                    group.group
                ));
                continue;
            };
            l_writes.push(SpecResolvedWrite {
                sheet_name: sheet_name.to_string(),
                cell: SpecCellRef {
                    col: col_value,
                    row,
                },
                value,
            });
        }
    }

    for key in section.keys().filter_map(Value::as_str) {
        if !groups.iter().any(|g| g.group == key) {
            debug!("Ignoring unknown budget group {key:?}");
        }
    }
    l_writes
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ExplicitRangeResolver

fn _get_text(entry: &Mapping, key: &str) -> Option<String> {
    match get_non_null(entry, key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

fn _parse_row_range_values(entry: &Mapping) -> EnumRowRangeValues {
    if let Some(Value::Sequence(l_raw)) = get_non_null(entry, "values")
        && !l_raw.is_empty()
    {
        return EnumRowRangeValues::Sequence(
            l_raw
                .iter()
                .map(|raw| convert_yaml_to_cell_value(raw).unwrap_or_default())
                .collect(),
        );
    }
    let value = entry
        .get("value")
        .and_then(convert_yaml_to_cell_value)
        .unwrap_or_default();
    EnumRowRangeValues::Replicate(value)
}

/// Parse `row_ranges` into directives; malformed entries are dropped.
pub fn parse_row_range_directives(
    raw: Option<&Value>,
    builder: &mut ReportFillBuilder,
) -> Vec<SpecRowRangeDirective> {
    let l_entries = match raw {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Sequence(l_entries)) => l_entries,
        Some(other) => {
            builder.add_dropped(format!(
                "row_ranges must be a list, got {}",
                describe_value_kind(other)
            ));
            return Vec::new();
        }
    };

    let mut l_directives = Vec::with_capacity(l_entries.len());
    for (idx, entry) in l_entries.iter().enumerate() {
        let Some(entry) = entry.as_mapping() else {
            builder.add_dropped(format!("row_ranges[{idx}] is not a mapping"));
            continue;
        };
        let Some(sheet_name) = _get_text(entry, "sheet") else {
            builder.add_dropped(format!("row_ranges[{idx}] has no sheet"));
            continue;
        };
        let Some(row) = get_non_null(entry, "row").and_then(parse_row_number) else {
            builder.add_dropped(format!("row_ranges[{idx}] has no valid row"));
            continue;
        };
        let (Some(col_start), Some(col_end)) = (_get_text(entry, "start_col"), _get_text(entry, "end_col"))
        else {
            builder.add_dropped(format!("row_ranges[{idx}] is missing start_col or end_col"));
            continue;
        };
        l_directives.push(SpecRowRangeDirective {
            sheet_name,
            row,
            col_start,
            col_end,
            values: _parse_row_range_values(entry),
        });
    }
    l_directives
}

/// Expand one directive left to right.
///
/// Inverted columns are swapped. A sequence shorter than the span leaves
/// the trailing columns untouched. Bad column letters drop the whole
/// directive.
pub fn resolve_row_range(directive: &SpecRowRangeDirective) -> Result<Vec<SpecResolvedWrite>, String> {
    let n_start = convert_column_letters_to_index(&directive.col_start)?;
    let n_end = convert_column_letters_to_index(&directive.col_end)?;
    let (n_start, n_end) = if n_start > n_end {
        (n_end, n_start)
    } else {
        (n_start, n_end)
    };

    let mk_write = |col: u32, value: EnumCellValue| SpecResolvedWrite {
        sheet_name: directive.sheet_name.clone(),
        cell: SpecCellRef {
            col,
            row: directive.row,
        },
        value,
    };

    let l_writes = match &directive.values {
        EnumRowRangeValues::Replicate(value) => (n_start..=n_end)
            .map(|col| mk_write(col, value.clone()))
            .collect(),
        EnumRowRangeValues::Sequence(l_values) => (n_start..=n_end)
            .zip(l_values.iter())
            .map(|(col, value)| mk_write(col, value.clone()))
            .collect(),
    };
    Ok(l_writes)
}

/// Expand every directive in order.
pub fn resolve_row_ranges(
    directives: &[SpecRowRangeDirective],
    builder: &mut ReportFillBuilder,
) -> Vec<SpecResolvedWrite> {
    let mut l_writes = Vec::new();
    for directive in directives {
        match resolve_row_range(directive) {
            Ok(l_expanded) => l_writes.extend(l_expanded),
            Err(err) => builder.add_dropped(format!(
                "Row range on {}!{} skipped: {err}",
                directive.sheet_name, directive.row
            )),
        }
    }
    l_writes
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellAssignmentResolver

/// Parse the textual cell reference of each normalized assignment.
pub fn resolve_cell_assignments(
    assignments: Vec<SpecCellAssignment>,
    builder: &mut ReportFillBuilder,
) -> Vec<SpecResolvedWrite> {
    assignments
        .into_iter()
        .filter_map(|assignment| match parse_cell_ref(&assignment.cell_ref) {
            Ok(cell) => Some(SpecResolvedWrite {
                sheet_name: assignment.sheet_name,
                cell,
                value: assignment.value,
            }),
            Err(err) => {
                builder.add_dropped(format!("{}: {err}", assignment.sheet_name));
                None
            }
        })
        .collect()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::conf::{C_SHEET_BUDGET, TUP_WATERFALL_CELLS, derive_budget_groups};
    use crate::workbook::MemoryCellStore;

    fn yaml_mapping(text: &str) -> Mapping {
        serde_yaml::from_str(text).expect("yaml mapping")
    }

    fn budget_store() -> MemoryCellStore {
        let mut store = MemoryCellStore::with_sheets([C_SHEET_BUDGET]);
        // Column P = 16
        store.write_value(
            C_SHEET_BUDGET,
            SpecCellRef { col: 16, row: 15 },
            &EnumCellValue::String("  Land Cost ".to_string()),
        );
        store.write_value(
            C_SHEET_BUDGET,
            SpecCellRef { col: 16, row: 40 },
            &EnumCellValue::String("land cost".to_string()),
        );
        store.write_value(
            C_SHEET_BUDGET,
            SpecCellRef { col: 16, row: 120 },
            &EnumCellValue::String("Closing Costs".to_string()),
        );
        store
    }

    fn cell(col: u32, row: u32) -> SpecCellRef {
        SpecCellRef { col, row }
    }

    #[test]
    fn static_map_follows_table_order_and_ignores_unknown_keys() {
        let section = yaml_mapping(
            "tier1_hurdle: 0.08\nlp_equity_share: 0.9\nnot_a_key: 1\ntier2_gp_promote: ~\ntier3_gp_promote: ''\n",
        );
        let mut builder = ReportFillBuilder::default();
        let l_writes = resolve_static_map(
            Some(&section),
            TUP_WATERFALL_CELLS.iter().copied(),
            &mut builder,
        );

        let l_cells: Vec<String> = l_writes.iter().map(|w| w.cell.to_string()).collect();
        assert_eq!(l_cells, vec!["C6", "C11"]);
        assert_eq!(l_writes[0].value, EnumCellValue::Float(0.9));
        assert_eq!(builder.cnt_dropped, 0);
    }

    #[test]
    fn static_map_tolerates_absent_section() {
        let mut builder = ReportFillBuilder::default();
        assert!(resolve_static_map(None, TUP_WATERFALL_CELLS.iter().copied(), &mut builder).is_empty());
    }

    #[test]
    fn label_search_finds_first_row_in_window() {
        let store = budget_store();
        let section = yaml_mapping("acquisition:\n  LAND COST: 500000\n  Nonexistent Item: 1\n");
        let mut builder = ReportFillBuilder::default();

        let l_writes = resolve_budget_labels(
            &store,
            C_SHEET_BUDGET,
            Some(&section),
            &derive_budget_groups(),
            SpecLabelScanWindow::default(),
            &mut builder,
        );

        assert_eq!(
            l_writes,
            vec![SpecResolvedWrite {
                sheet_name: C_SHEET_BUDGET.to_string(),
                cell: cell(17, 15),
                value: EnumCellValue::Integer(500_000),
            }]
        );
        assert_eq!(builder.cnt_dropped, 1);
    }

    #[test]
    fn label_outside_window_is_dropped() {
        let store = budget_store();
        let section = yaml_mapping("acquisition:\n  Closing Costs: 10\n");
        let mut builder = ReportFillBuilder::default();
        let groups = derive_budget_groups();

        let l_default = resolve_budget_labels(
            &store,
            C_SHEET_BUDGET,
            Some(&section),
            &groups,
            SpecLabelScanWindow::default(),
            &mut builder,
        );
        assert!(l_default.is_empty());

        let l_wide = resolve_budget_labels(
            &store,
            C_SHEET_BUDGET,
            Some(&section),
            &groups,
            SpecLabelScanWindow {
                row_start: 11,
                row_end: 150,
            },
            &mut builder,
        );
        assert_eq!(l_wide.len(), 1);
        assert_eq!(l_wide[0].cell, cell(17, 120));
    }

    #[test]
    fn label_search_on_missing_sheet_drops_entries() {
        let store = MemoryCellStore::new();
        let section = yaml_mapping("acquisition:\n  Land Cost: 1\n");
        let mut builder = ReportFillBuilder::default();
        let l_writes = resolve_budget_labels(
            &store,
            C_SHEET_BUDGET,
            Some(&section),
            &derive_budget_groups(),
            SpecLabelScanWindow::default(),
            &mut builder,
        );
        assert!(l_writes.is_empty());
        assert_eq!(builder.cnt_dropped, 1);
    }

    fn directives(text: &str, builder: &mut ReportFillBuilder) -> Vec<SpecRowRangeDirective> {
        let raw: Value = serde_yaml::from_str(text).expect("yaml");
        parse_row_range_directives(Some(&raw), builder)
    }

    fn written_cells(l_writes: &[SpecResolvedWrite]) -> Vec<(String, EnumCellValue)> {
        l_writes
            .iter()
            .map(|w| (w.cell.to_string(), w.value.clone()))
            .collect()
    }

    #[test]
    fn row_range_replicates_single_value() {
        let mut builder = ReportFillBuilder::default();
        let l_directives = directives(
            "- {sheet: Budget, row: 20, start_col: P, end_col: R, value: 5}\n",
            &mut builder,
        );
        let l_writes = resolve_row_ranges(&l_directives, &mut builder);
        assert_eq!(
            written_cells(&l_writes),
            vec![
                ("P20".to_string(), EnumCellValue::Integer(5)),
                ("Q20".to_string(), EnumCellValue::Integer(5)),
                ("R20".to_string(), EnumCellValue::Integer(5)),
            ]
        );
    }

    #[test]
    fn row_range_short_sequence_leaves_trailing_columns() {
        let mut builder = ReportFillBuilder::default();
        let l_directives = directives(
            "- {sheet: Budget, row: '20', start_col: P, end_col: R, values: [1, 2]}\n",
            &mut builder,
        );
        let l_writes = resolve_row_ranges(&l_directives, &mut builder);
        assert_eq!(
            written_cells(&l_writes),
            vec![
                ("P20".to_string(), EnumCellValue::Integer(1)),
                ("Q20".to_string(), EnumCellValue::Integer(2)),
            ]
        );
    }

    #[test]
    fn row_range_swapped_columns_match_forward_order() {
        let mut builder = ReportFillBuilder::default();
        let l_forward = directives(
            "- {sheet: Budget, row: 20, start_col: P, end_col: R, value: 5}\n",
            &mut builder,
        );
        let l_swapped = directives(
            "- {sheet: Budget, row: 20, start_col: R, end_col: P, value: 5}\n",
            &mut builder,
        );
        assert_eq!(
            resolve_row_ranges(&l_forward, &mut builder),
            resolve_row_ranges(&l_swapped, &mut builder)
        );
    }

    #[test]
    fn row_range_bad_column_skips_whole_directive() {
        let mut builder = ReportFillBuilder::default();
        let l_directives = directives(
            "- {sheet: Budget, row: 20, start_col: P, end_col: '9', value: 5}\n- {sheet: Budget, row: 21, start_col: A, end_col: A, value: 1}\n",
            &mut builder,
        );
        let l_writes = resolve_row_ranges(&l_directives, &mut builder);
        assert_eq!(
            written_cells(&l_writes),
            vec![("A21".to_string(), EnumCellValue::Integer(1))]
        );
        assert_eq!(builder.cnt_dropped, 1);
    }

    #[test]
    fn row_range_malformed_entries_are_dropped() {
        let mut builder = ReportFillBuilder::default();
        let l_directives = directives(
            "- just text\n- {row: 20, start_col: P, end_col: R}\n- {sheet: Budget, start_col: P, end_col: R}\n- {sheet: Budget, row: 1, start_col: P}\n",
            &mut builder,
        );
        assert!(l_directives.is_empty());
        assert_eq!(builder.cnt_dropped, 4);
    }

    #[test]
    fn cell_assignments_with_bad_refs_are_dropped() {
        let mut builder = ReportFillBuilder::default();
        let l_writes = resolve_cell_assignments(
            vec![
                SpecCellAssignment {
                    sheet_name: "Summary".to_string(),
                    cell_ref: "$C$5".to_string(),
                    value: EnumCellValue::Integer(1),
                },
                SpecCellAssignment {
                    sheet_name: "Summary".to_string(),
                    cell_ref: "C5:C6".to_string(),
                    value: EnumCellValue::Integer(2),
                },
            ],
            &mut builder,
        );
        assert_eq!(l_writes.len(), 1);
        assert_eq!(l_writes[0].cell, cell(3, 5));
        assert_eq!(builder.cnt_dropped, 1);
    }

    #[derive(Clone, Default)]
    struct CapturedLog(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLog {
        type Writer = CapturedLog;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn every_dropped_directive_is_logged_at_debug() {
        let raw: Value = serde_yaml::from_str(
            r#"
- not a mapping
- {row: 20, start_col: P, end_col: R, value: 1}
- {sheet: Budget, row: zero, start_col: P, end_col: R, value: 1}
- {sheet: Budget, row: 20, start_col: P, value: 1}
"#,
        )
        .expect("yaml");
        let log = CapturedLog::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(log.clone())
            .finish();

        let mut builder = ReportFillBuilder::default();
        let l_directives = tracing::subscriber::with_default(subscriber, || {
            parse_row_range_directives(Some(&raw), &mut builder)
        });

        assert!(l_directives.is_empty());
        let report = builder.build(None);
        assert_eq!(report.cnt_dropped, 4);
        let c_log = String::from_utf8(log.0.lock().unwrap().clone()).expect("utf8");
        for warning in &report.warnings {
            assert!(c_log.contains(warning.as_str()), "{warning} not logged:\n{c_log}");
        }
        assert_eq!(c_log.matches("DEBUG").count(), 4);
    }
}
