//! Shape normalizer for the free-form `cell_inputs` / `manual_cells` sections.
//!
//! Three shapes are accepted and may be mixed per sheet:
//! - A: `{sheet: {cell: value}}`
//! - B: `{sheet: [{cell, value}]}`
//! - C: `[{sheet, cell, value}]`
//!
//! Anything else is dropped entry by entry.

use serde_yaml::{Mapping, Sequence, Value};
use tracing::debug;

use crate::config::get_non_null;
use crate::spec::{EnumCellValue, SpecCellAssignment};
use crate::util::convert_yaml_to_cell_value;

////////////////////////////////////////////////////////////////////////////////
// #region ShapeClassification

/// Assignments listed under one sheet key.
#[derive(Debug, Clone, Copy)]
pub enum EnumSheetAssignments<'a> {
    /// Shape A: `cell -> value`.
    CellMap(&'a Mapping),
    /// Shape B: list of `{cell, value}` entries.
    EntryList(&'a Sequence),
    /// Neither; dropped.
    Malformed,
}

/// Top-level shape of one cell section.
#[derive(Debug, Clone)]
pub enum EnumCellInputsShape<'a> {
    /// Section absent or `null`.
    Absent,
    /// Shapes A/B keyed by sheet name.
    BySheet(Vec<(&'a str, EnumSheetAssignments<'a>)>),
    /// Shape C.
    Flat(&'a Sequence),
    /// Scalar or otherwise unusable section.
    Malformed,
}

/// Classify a raw section value.
pub fn classify_cell_inputs(raw: Option<&Value>) -> EnumCellInputsShape<'_> {
    match raw {
        None | Some(Value::Null) => EnumCellInputsShape::Absent,
        Some(Value::Mapping(map)) => EnumCellInputsShape::BySheet(
            map.iter()
                .filter_map(|(key, assignments)| {
                    let Some(sheet_name) = key.as_str() else {
                        debug!("Dropping cell inputs under non-string sheet key: {key:?}");
                        return None;
                    };
                    let shape = match assignments {
                        Value::Mapping(cells) => EnumSheetAssignments::CellMap(cells),
                        Value::Sequence(entries) => EnumSheetAssignments::EntryList(entries),
                        _ => EnumSheetAssignments::Malformed,
                    };
                    Some((sheet_name, shape))
                })
                .collect(),
        ),
        Some(Value::Sequence(entries)) => EnumCellInputsShape::Flat(entries),
        Some(_) => EnumCellInputsShape::Malformed,
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Normalization

/// Assignments grouped by sheet, sheets in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpecSheetGroupedAssignments {
    groups: Vec<(String, Vec<SpecCellAssignment>)>,
    cnt_dropped: u64,
}

impl SpecSheetGroupedAssignments {
    fn push(&mut self, sheet_name: &str, cell_ref: &str, value: EnumCellValue) {
        if sheet_name.is_empty() || cell_ref.is_empty() {
            self.cnt_dropped += 1;
            return;
        }
        let assignment = SpecCellAssignment {
            sheet_name: sheet_name.to_string(),
            cell_ref: cell_ref.to_string(),
            value,
        };
        match self.groups.iter_mut().find(|(name, _)| name == sheet_name) {
            Some((_, l_entries)) => l_entries.push(assignment),
            None => self.groups.push((sheet_name.to_string(), vec![assignment])),
        }
    }

    fn drop_entry(&mut self, reason: &str) {
        debug!("Dropping cell input entry: {reason}");
        self.cnt_dropped += 1;
    }

    /// Append `other` after `self`, sheet by sheet, so `other` wins on conflicts.
    pub fn extend(&mut self, other: SpecSheetGroupedAssignments) {
        for (sheet_name, l_entries) in other.groups {
            match self.groups.iter_mut().find(|(name, _)| *name == sheet_name) {
                Some((_, l_existing)) => l_existing.extend(l_entries),
                None => self.groups.push((sheet_name, l_entries)),
            }
        }
        self.cnt_dropped += other.cnt_dropped;
    }

    /// Sheet names in application order.
    pub fn sheet_names(&self) -> Vec<&str> {
        self.groups.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Entries dropped while normalizing.
    pub fn cnt_dropped(&self) -> u64 {
        self.cnt_dropped
    }

    /// Flatten into application order.
    pub fn into_assignments(self) -> Vec<SpecCellAssignment> {
        self.groups
            .into_iter()
            .flat_map(|(_, l_entries)| l_entries)
            .collect()
    }
}

fn _get_str<'a>(entry: &'a Mapping, key: &str) -> Option<&'a str> {
    get_non_null(entry, key)?.as_str()
}

fn _normalize_cell_map(out: &mut SpecSheetGroupedAssignments, sheet_name: &str, cells: &Mapping) {
    for (key, value) in cells {
        let Some(cell_ref) = key.as_str() else {
            out.drop_entry("non-string cell key");
            continue;
        };
        match convert_yaml_to_cell_value(value) {
            Some(value) => out.push(sheet_name, cell_ref, value),
            None => out.drop_entry("non-scalar value"),
        }
    }
}

fn _normalize_entry_list(
    out: &mut SpecSheetGroupedAssignments,
    sheet_name: &str,
    entries: &Sequence,
) {
    for entry in entries {
        let Some(entry) = entry.as_mapping() else {
            out.drop_entry("list entry is not a mapping");
            continue;
        };
        let Some(cell_ref) = _get_str(entry, "cell") else {
            out.drop_entry("entry without cell");
            continue;
        };
        let Some(value) = get_non_null(entry, "value") else {
            out.drop_entry("entry without value");
            continue;
        };
        match convert_yaml_to_cell_value(value) {
            Some(value) => out.push(sheet_name, cell_ref, value),
            None => out.drop_entry("non-scalar value"),
        }
    }
}

fn _normalize_flat_list(out: &mut SpecSheetGroupedAssignments, entries: &Sequence) {
    for entry in entries {
        let Some(entry) = entry.as_mapping() else {
            out.drop_entry("list entry is not a mapping");
            continue;
        };
        let (Some(sheet_name), Some(cell_ref)) = (_get_str(entry, "sheet"), _get_str(entry, "cell"))
        else {
            out.drop_entry("entry without sheet or cell");
            continue;
        };
        let value = entry.get("value").unwrap_or(&Value::Null);
        match convert_yaml_to_cell_value(value) {
            Some(value) => out.push(sheet_name, cell_ref, value),
            None => out.drop_entry("non-scalar value"),
        }
    }
}

/// Normalize one cell section into sheet-grouped assignments.
pub fn normalize_cell_inputs(raw: Option<&Value>) -> SpecSheetGroupedAssignments {
    let mut out = SpecSheetGroupedAssignments::default();
    match classify_cell_inputs(raw) {
        EnumCellInputsShape::Absent => {}
        EnumCellInputsShape::Malformed => out.drop_entry("section is neither mapping nor list"),
        EnumCellInputsShape::BySheet(l_sheets) => {
            for (sheet_name, assignments) in l_sheets {
                match assignments {
                    EnumSheetAssignments::CellMap(cells) => {
                        _normalize_cell_map(&mut out, sheet_name, cells)
                    }
                    EnumSheetAssignments::EntryList(entries) => {
                        _normalize_entry_list(&mut out, sheet_name, entries)
                    }
                    EnumSheetAssignments::Malformed => {
                        out.drop_entry("sheet assignments are neither mapping nor list")
                    }
                }
            }
        }
        EnumCellInputsShape::Flat(entries) => _normalize_flat_list(&mut out, entries),
    }
    out
}

/// Normalize `cell_inputs` then `manual_cells`; manual entries apply last per sheet.
pub fn normalize_cell_sections(
    cell_inputs: Option<&Value>,
    manual_cells: Option<&Value>,
) -> SpecSheetGroupedAssignments {
    let mut grouped = normalize_cell_inputs(cell_inputs);
    grouped.extend(normalize_cell_inputs(manual_cells));
    grouped
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).expect("yaml")
    }

    fn kalani(sheet: &str, cell: &str) -> SpecCellAssignment {
        SpecCellAssignment {
            sheet_name: sheet.to_string(),
            cell_ref: cell.to_string(),
            value: EnumCellValue::String("Kalani".to_string()),
        }
    }

    #[test]
    fn three_shapes_normalize_to_the_same_assignment() {
        let shape_a = yaml("Summary:\n  C5: Kalani\n");
        let shape_b = yaml("Summary:\n  - cell: C5\n    value: Kalani\n");
        let shape_c = yaml("- sheet: Summary\n  cell: C5\n  value: Kalani\n");

        let expected = vec![kalani("Summary", "C5")];
        assert_eq!(normalize_cell_inputs(Some(&shape_a)).into_assignments(), expected);
        assert_eq!(normalize_cell_inputs(Some(&shape_b)).into_assignments(), expected);
        assert_eq!(normalize_cell_inputs(Some(&shape_c)).into_assignments(), expected);
    }

    #[test]
    fn manual_cells_follow_cell_inputs_per_sheet() {
        let cell_inputs = yaml("Summary:\n  C5: Old\nBudget:\n  Q15: 1\n");
        let manual_cells = yaml("- sheet: Summary\n  cell: C5\n  value: New\n- sheet: Extra\n  cell: A1\n  value: x\n");

        let grouped = normalize_cell_sections(Some(&cell_inputs), Some(&manual_cells));
        assert_eq!(grouped.sheet_names(), vec!["Summary", "Budget", "Extra"]);

        let l_summary: Vec<EnumCellValue> = grouped
            .into_assignments()
            .into_iter()
            .filter(|a| a.sheet_name == "Summary")
            .map(|a| a.value)
            .collect();
        assert_eq!(
            l_summary,
            vec![
                EnumCellValue::String("Old".to_string()),
                EnumCellValue::String("New".to_string()),
            ]
        );
    }

    #[test]
    fn malformed_entries_are_dropped_silently() {
        let raw = yaml(
            "Summary:\n  - cell: C5\n  - value: 3\n  - just text\n  - cell: C6\n    value: 7\nBudget: 12\n",
        );
        let grouped = normalize_cell_inputs(Some(&raw));
        assert_eq!(grouped.cnt_dropped(), 4);
        assert_eq!(
            grouped.into_assignments(),
            vec![SpecCellAssignment {
                sheet_name: "Summary".to_string(),
                cell_ref: "C6".to_string(),
                value: EnumCellValue::Integer(7),
            }]
        );
    }

    #[test]
    fn flat_entries_require_sheet_and_cell() {
        let raw = yaml("- cell: C5\n  value: 1\n- sheet: Summary\n  value: 1\n- sheet: Summary\n  cell: C7\n");
        let grouped = normalize_cell_inputs(Some(&raw));
        assert_eq!(grouped.cnt_dropped(), 2);
        assert_eq!(
            grouped.into_assignments(),
            vec![SpecCellAssignment {
                sheet_name: "Summary".to_string(),
                cell_ref: "C7".to_string(),
                value: EnumCellValue::Empty,
            }]
        );
    }

    #[test]
    fn absent_and_scalar_sections() {
        assert!(normalize_cell_inputs(None).into_assignments().is_empty());
        let grouped = normalize_cell_inputs(Some(&Value::from("oops")));
        assert_eq!(grouped.cnt_dropped(), 1);
        assert!(grouped.into_assignments().is_empty());
    }
}
