//! Merge submitted form fields into the configuration document.
//!
//! Field keys:
//! - `template_path`, `output_path`
//! - one key per summary input listed in [`TUP_FORM_SUMMARY_FIELDS`]
//! - `budget::<group>::<label>`
//! - `cell::<sheet>::<cell>`
//! - `row::<idx>::{sheet,row,start_col,end_col,value}`
//!
//! Every value goes through [`parse_value`] before it is stored.

use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::conf::{
    C_SECTION_BUDGET, C_SECTION_CELL_INPUTS, C_SECTION_PROJECT, C_SECTION_ROW_RANGES,
    C_SECTION_SUMMARY, C_SECTION_SUMMARY_INPUTS, TUP_FORM_SUMMARY_FIELDS,
};
use crate::config::ConfigDocument;
use crate::util::{convert_cell_value_to_yaml, parse_value};

const C_FIELD_TEMPLATE_PATH: &str = "template_path";
const C_FIELD_OUTPUT_PATH: &str = "output_path";
const C_PREFIX_BUDGET: &str = "budget::";
const C_PREFIX_CELL: &str = "cell::";
const C_PREFIX_ROW: &str = "row::";
const C_SEP_FIELD: &str = "::";

fn _find_field<'a>(fields: &'a [(String, String)], key: &str) -> Option<&'a str> {
    fields
        .iter()
        .rev()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn _set(map: &mut Mapping, key: &str, value: Value) {
    map.insert(Value::String(key.to_string()), value);
}

fn _apply_project_paths(document: &mut ConfigDocument, fields: &[(String, String)]) -> u64 {
    let mut cnt = 0;
    for (field, key) in [(C_FIELD_TEMPLATE_PATH, "template"), (C_FIELD_OUTPUT_PATH, "output")] {
        let Some(raw) = _find_field(fields, field) else {
            continue;
        };
        let c_path = raw.trim();
        if c_path.is_empty() {
            continue;
        }
        if let Some(project) = document.ensure_mapping(&[C_SECTION_PROJECT]) {
            _set(project, key, Value::String(c_path.to_string()));
            cnt += 1;
        }
    }
    cnt
}

fn _apply_summary_inputs(
    document: &mut ConfigDocument,
    fields: &[(String, String)],
    if_keep_absent: bool,
) -> u64 {
    let l_updates: Vec<(&str, Value)> = TUP_FORM_SUMMARY_FIELDS
        .iter()
        .filter_map(|&field| {
            let raw = _find_field(fields, field);
            if raw.is_none() && if_keep_absent {
                return None;
            }
            Some((field, convert_cell_value_to_yaml(&parse_value(raw))))
        })
        .collect();
    if l_updates.is_empty() {
        return 0;
    }

    let Some(inputs) = document.ensure_mapping(&[C_SECTION_SUMMARY, C_SECTION_SUMMARY_INPUTS])
    else {
        return 0;
    };
    let cnt = l_updates.len() as u64;
    for (field, value) in l_updates {
        _set(inputs, field, value);
    }
    cnt
}

fn _apply_budget_field(document: &mut ConfigDocument, rest: &str, raw: &str) -> bool {
    let Some((group, label)) = rest.split_once(C_SEP_FIELD) else {
        debug!("Ignoring budget field without label: {rest:?}");
        return false;
    };
    let Some(entries) = document.ensure_mapping(&[C_SECTION_BUDGET, group]) else {
        return false;
    };
    _set(entries, label, convert_cell_value_to_yaml(&parse_value(Some(raw))));
    true
}

fn _apply_cell_field(document: &mut ConfigDocument, rest: &str, raw: &str) -> bool {
    let Some((sheet_name, cell_ref)) = rest.split_once(C_SEP_FIELD) else {
        debug!("Ignoring cell field without cell: {rest:?}");
        return false;
    };
    let root = document.root_mut();
    let section = root
        .entry(Value::String(C_SECTION_CELL_INPUTS.to_string()))
        .or_insert(Value::Null);
    if section.is_null() {
        *section = Value::Mapping(Mapping::new());
    }
    let Some(section) = section.as_mapping_mut() else {
        debug!("cell_inputs is a list; form cell field {rest:?} ignored");
        return false;
    };
    let sheet = section
        .entry(Value::String(sheet_name.to_string()))
        .or_insert(Value::Null);
    if sheet.is_null() {
        *sheet = Value::Mapping(Mapping::new());
    }
    let Some(cells) = sheet.as_mapping_mut() else {
        debug!("cell_inputs.{sheet_name} is not a cell map; form cell field ignored");
        return false;
    };
    _set(cells, cell_ref, convert_cell_value_to_yaml(&parse_value(Some(raw))));
    true
}

fn _apply_row_field(document: &mut ConfigDocument, rest: &str, raw: &str) -> bool {
    let Some((c_idx, attr)) = rest.split_once(C_SEP_FIELD) else {
        return false;
    };
    let Ok(idx) = c_idx.trim().parse::<usize>() else {
        debug!("Ignoring row field with bad index: {c_idx:?}");
        return false;
    };
    let Some(directive) = document
        .root_mut()
        .get_mut(C_SECTION_ROW_RANGES)
        .and_then(Value::as_sequence_mut)
        .and_then(|l_ranges| l_ranges.get_mut(idx))
        .and_then(Value::as_mapping_mut)
    else {
        debug!("Ignoring row field for unknown directive {idx}");
        return false;
    };

    let c_text = raw.trim();
    let value = match attr {
        "sheet" | "start_col" | "end_col" => {
            if c_text.is_empty() {
                return false;
            }
            Value::String(c_text.to_string())
        }
        "row" => {
            if c_text.is_empty() {
                return false;
            }
            match c_text.parse::<i64>() {
                Ok(v) => Value::Number(v.into()),
                Err(_) => Value::String(c_text.to_string()),
            }
        }
        "value" => convert_cell_value_to_yaml(&parse_value(Some(raw))),
        _ => {
            debug!("Ignoring unknown row field {attr:?}");
            return false;
        }
    };
    _set(directive, attr, value);
    true
}

/// Merge `fields` into `document`; returns how many keys were updated.
///
/// Summary inputs are replaced on every call (absent fields become the
/// empty sentinel) unless `if_keep_absent` is set, in which case only
/// submitted fields are touched. Row fields only update existing
/// `row_ranges` entries.
pub fn apply_form_fields(
    document: &mut ConfigDocument,
    fields: &[(String, String)],
    if_keep_absent: bool,
) -> u64 {
    let mut cnt = _apply_project_paths(document, fields);
    cnt += _apply_summary_inputs(document, fields, if_keep_absent);

    for (key, raw) in fields {
        let if_applied = if let Some(rest) = key.strip_prefix(C_PREFIX_BUDGET) {
            _apply_budget_field(document, rest, raw)
        } else if let Some(rest) = key.strip_prefix(C_PREFIX_CELL) {
            _apply_cell_field(document, rest, raw)
        } else if let Some(rest) = key.strip_prefix(C_PREFIX_ROW) {
            _apply_row_field(document, rest, raw)
        } else {
            false
        };
        if if_applied {
            cnt += 1;
        }
    }
    cnt
}

/// Split `KEY=VALUE` into a form field pair.
pub fn parse_field_assignment(text: &str) -> Result<(String, String), String> {
    match text.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("Expected KEY=VALUE, got {text:?}")),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use pretty_assertions::assert_eq;

    use super::*;

    fn parse(text: &str) -> ConfigDocument {
        ConfigDocument::from_yaml_str(text, Path::new("test.yaml")).expect("config")
    }

    fn fields(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn summary_input(document: &ConfigDocument, key: &str) -> Option<Value> {
        document
            .section_mapping(&[C_SECTION_SUMMARY, C_SECTION_SUMMARY_INPUTS])
            .and_then(|m| m.get(key))
            .cloned()
    }

    #[test]
    fn full_form_sets_every_summary_field() {
        let mut document = parse("summary:\n  inputs:\n    address: 1 Old Rd\n");
        apply_form_fields(
            &mut document,
            &fields(&[("room_count", "120"), ("exit_cap_rate", "0.075")]),
            false,
        );

        assert_eq!(summary_input(&document, "room_count"), Some(Value::from(120)));
        assert_eq!(summary_input(&document, "exit_cap_rate"), Some(Value::from(0.075)));
        assert_eq!(summary_input(&document, "address"), Some(Value::from("")));
        assert_eq!(
            document
                .section_mapping(&[C_SECTION_SUMMARY, C_SECTION_SUMMARY_INPUTS])
                .map(Mapping::len),
            Some(TUP_FORM_SUMMARY_FIELDS.len())
        );
    }

    #[test]
    fn keep_absent_only_touches_submitted_fields() {
        let mut document = parse("summary:\n  inputs:\n    address: 1 Old Rd\n");
        let cnt = apply_form_fields(&mut document, &fields(&[("room_count", "120")]), true);

        assert_eq!(cnt, 1);
        assert_eq!(summary_input(&document, "address"), Some(Value::from("1 Old Rd")));
    }

    #[test]
    fn project_budget_and_cell_fields_create_sections() {
        let mut document = ConfigDocument::new();
        apply_form_fields(
            &mut document,
            &fields(&[
                ("template_path", "  model.xlsx "),
                ("output_path", ""),
                ("budget::acquisition::Land Cost", "500000"),
                ("cell::Summary::C5", "Kalani"),
            ]),
            true,
        );

        let project = document.project_paths();
        assert_eq!(project.template.as_deref(), Some("model.xlsx"));
        assert_eq!(project.output, None);
        assert_eq!(
            document
                .section_mapping(&[C_SECTION_BUDGET, "acquisition"])
                .and_then(|m| m.get("Land Cost")),
            Some(&Value::from(500_000))
        );
        assert_eq!(
            document
                .section_mapping(&[C_SECTION_CELL_INPUTS, "Summary"])
                .and_then(|m| m.get("C5")),
            Some(&Value::from("Kalani"))
        );
    }

    #[test]
    fn cell_fields_leave_list_shapes_alone() {
        let mut document = parse("cell_inputs:\n  - {sheet: Summary, cell: C5, value: A}\n");
        let before = document.clone();
        let cnt = apply_form_fields(&mut document, &fields(&[("cell::Summary::C5", "B")]), true);
        assert_eq!(cnt, 0);
        assert_eq!(document, before);
    }

    #[test]
    fn row_fields_update_existing_directives_only() {
        let mut document = parse(
            "row_ranges:\n  - {sheet: Budget, row: 20, start_col: P, end_col: R, value: 5}\n",
        );
        let cnt = apply_form_fields(
            &mut document,
            &fields(&[
                ("row::0::row", "21"),
                ("row::0::end_col", " S "),
                ("row::0::value", "7.5"),
                ("row::3::row", "1"),
            ]),
            true,
        );
        assert_eq!(cnt, 3);

        let directive = document
            .section(C_SECTION_ROW_RANGES)
            .and_then(Value::as_sequence)
            .and_then(|l| l.first())
            .and_then(Value::as_mapping)
            .cloned()
            .expect("directive");
        assert_eq!(directive.get("row"), Some(&Value::from(21)));
        assert_eq!(directive.get("end_col"), Some(&Value::from("S")));
        assert_eq!(directive.get("value"), Some(&Value::from(7.5)));
        assert_eq!(
            document
                .section(C_SECTION_ROW_RANGES)
                .and_then(Value::as_sequence)
                .map(Vec::len),
            Some(1)
        );
    }

    #[test]
    fn field_assignment_parsing() {
        assert_eq!(
            parse_field_assignment("budget::acquisition::Land Cost=500000"),
            Ok(("budget::acquisition::Land Cost".to_string(), "500000".to_string()))
        );
        assert_eq!(
            parse_field_assignment("address="),
            Ok(("address".to_string(), String::new()))
        );
        assert!(parse_field_assignment("=5").is_err());
        assert!(parse_field_assignment("novalue").is_err());
    }
}
