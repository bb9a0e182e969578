//! Stateless helper utilities shared by resolvers and the apply engine.

use std::fs;
use std::num::IntErrorKind;
use std::path::{Path, PathBuf};

use serde_yaml::Value;

use crate::conf::{N_LEN_COLUMN_LETTERS_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX};
use crate::spec::{EnumCellValue, FillError, SpecCellRef, SpecValuePolicy};

////////////////////////////////////////////////////////////////////////////////
// #region CellValueConversion

/// Drop `_` digit separators, accepted only between two ASCII digits.
fn _strip_digit_separators(text: &str) -> Option<String> {
    if !text.contains('_') {
        return Some(text.to_string());
    }
    let l_chars: Vec<char> = text.chars().collect();
    let mut c_out = String::with_capacity(text.len());
    for (idx, ch) in l_chars.iter().enumerate() {
        if *ch != '_' {
            c_out.push(*ch);
            continue;
        }
        let if_prev_digit = idx > 0 && l_chars[idx - 1].is_ascii_digit();
        let if_next_digit = l_chars.get(idx + 1).is_some_and(char::is_ascii_digit);
        if !(if_prev_digit && if_next_digit) {
            return None;
        }
    }
    Some(c_out)
}

/// Coerce raw form text into a typed scalar.
///
/// `None` and blank text become [`EnumCellValue::Empty`]. Text with a `.` is
/// tried as a float, anything else as an integer; `_` separators between
/// digits are accepted, and integers beyond `i64` fall back to a float. When
/// parsing fails the trimmed text is kept as a string. Never fails.
pub fn parse_value(raw: Option<&str>) -> EnumCellValue {
    let Some(raw) = raw else {
        return EnumCellValue::Empty;
    };
    let c_text = raw.trim();
    if c_text.is_empty() {
        return EnumCellValue::Empty;
    }

    if let Some(c_number) = _strip_digit_separators(c_text) {
        if c_number.contains('.') {
            if let Ok(v) = c_number.parse::<f64>() {
                return EnumCellValue::Float(v);
            }
        } else {
            match c_number.parse::<i64>() {
                Ok(v) => return EnumCellValue::Integer(v),
                Err(err)
                    if matches!(
                        err.kind(),
                        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow
                    ) =>
                {
                    if let Ok(v) = c_number.parse::<f64>() {
                        return EnumCellValue::Float(v);
                    }
                }
                Err(_) => {}
            }
        }
    }

    EnumCellValue::String(c_text.to_string())
}

/// Convert one YAML scalar into a cell value.
///
/// `null` and blank strings map to the empty sentinel. Returns `None` for
/// sequences, mappings and tagged values, which are never cell contents.
pub fn convert_yaml_to_cell_value(value: &Value) -> Option<EnumCellValue> {
    match value {
        Value::Null => Some(EnumCellValue::Empty),
        Value::Bool(b) => Some(EnumCellValue::Boolean(*b)),
        Value::Number(n) => {
            if let Some(v) = n.as_i64() {
                Some(EnumCellValue::Integer(v))
            } else {
                n.as_f64().map(EnumCellValue::Float)
            }
        }
        Value::String(s) => {
            if s.trim().is_empty() {
                Some(EnumCellValue::Empty)
            } else {
                Some(EnumCellValue::String(s.clone()))
            }
        }
        Value::Sequence(_) | Value::Mapping(_) | Value::Tagged(_) => None,
    }
}

/// Convert a cell value back into YAML for persisting configuration.
pub fn convert_cell_value_to_yaml(value: &EnumCellValue) -> Value {
    match value {
        EnumCellValue::Empty => Value::String(String::new()),
        EnumCellValue::Integer(v) => Value::Number((*v).into()),
        EnumCellValue::Float(v) => Value::Number((*v).into()),
        EnumCellValue::String(v) => Value::String(v.clone()),
        EnumCellValue::Boolean(v) => Value::Bool(*v),
    }
}

/// Convert `NaN`/`Inf` to policy string; return error for finite values.
pub fn convert_nan_inf_to_str(x: f64, value_policy: &SpecValuePolicy) -> Result<String, String> {
    if x.is_nan() {
        return Ok(value_policy.nan_str.clone());
    }
    if x.is_infinite() {
        return Ok(if x.is_sign_positive() {
            value_policy.posinf_str.clone()
        } else {
            value_policy.neginf_str.clone()
        });
    }
    Err("Input is neither NaN nor Inf.".to_string())
}

/// Replace floats a workbook cannot hold with their policy text.
pub fn derive_storable_value(value: &EnumCellValue, value_policy: &SpecValuePolicy) -> EnumCellValue {
    match value {
        EnumCellValue::Float(v) if !v.is_finite() => EnumCellValue::String(
            convert_nan_inf_to_str(*v, value_policy).unwrap_or_else(|_| value_policy.nan_str.clone()),
        ),
        other => other.clone(),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CoordinateConversion

/// Convert column letters (`A`, `ab`, `XFD`) into a one-based index.
pub fn convert_column_letters_to_index(letters: &str) -> Result<u32, String> {
    let c_letters = letters.trim();
    if c_letters.is_empty() || c_letters.len() > N_LEN_COLUMN_LETTERS_MAX {
        return Err(format!("Invalid column letters: {letters:?}"));
    }

    let mut n_idx: u32 = 0;
    for ch in c_letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return Err(format!("Invalid column letters: {letters:?}"));
        }
        let n_digit = u32::from(ch.to_ascii_uppercase() as u8 - b'A') + 1;
        n_idx = n_idx * 26 + n_digit;
    }

    if n_idx > N_NCOLS_EXCEL_MAX {
        return Err(format!(
            "Column {letters:?} exceeds Excel limit of {N_NCOLS_EXCEL_MAX} columns."
        ));
    }
    Ok(n_idx)
}

/// Convert a one-based column index into letters.
pub fn convert_column_index_to_letters(idx: u32) -> Result<String, String> {
    if idx == 0 || idx > N_NCOLS_EXCEL_MAX {
        return Err(format!("Column index out of range: {idx}"));
    }

    let mut v_letters = Vec::with_capacity(N_LEN_COLUMN_LETTERS_MAX);
    let mut n_rest = idx;
    while n_rest > 0 {
        let n_rem = (n_rest - 1) % 26;
        v_letters.push(char::from(b'A' + n_rem as u8));
        n_rest = (n_rest - 1) / 26;
    }
    Ok(v_letters.iter().rev().collect())
}

/// Parse an A1-style reference (`C5`, `$ab$12`) into a coordinate.
pub fn parse_cell_ref(text: &str) -> Result<SpecCellRef, String> {
    let c_text = text.trim();
    let c_body = c_text.strip_prefix('$').unwrap_or(c_text);

    let n_split = c_body
        .find(|ch: char| !ch.is_ascii_alphabetic())
        .ok_or_else(|| format!("Invalid cell reference: {text:?}"))?;
    let (c_letters, c_rest) = c_body.split_at(n_split);
    let c_digits = c_rest.strip_prefix('$').unwrap_or(c_rest);

    if c_digits.is_empty() || !c_digits.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(format!("Invalid cell reference: {text:?}"));
    }

    let col = convert_column_letters_to_index(c_letters)
        .map_err(|_| format!("Invalid cell reference: {text:?}"))?;
    let row = c_digits
        .parse::<u32>()
        .map_err(|_| format!("Invalid cell reference: {text:?}"))?;
    if row == 0 || row > N_NROWS_EXCEL_MAX {
        return Err(format!("Row out of range in cell reference: {text:?}"));
    }

    Ok(SpecCellRef { col, row })
}

/// Render a coordinate as `A1` text.
pub fn format_cell_ref(cell: SpecCellRef) -> String {
    match convert_column_index_to_letters(cell.col) {
        Ok(c_letters) => format!("{c_letters}{}", cell.row),
        Err(_) => format!("R{}C{}", cell.row, cell.col),
    }
}

/// Parse a row number given as YAML integer or numeric text.
pub fn parse_row_number(value: &Value) -> Option<u32> {
    let n_row = match value {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok())?,
        Value::String(s) => s.trim().parse::<u32>().ok()?,
        _ => return None,
    };
    (1..=N_NROWS_EXCEL_MAX).contains(&n_row).then_some(n_row)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region LabelMatching

/// Case-folded, whitespace-trimmed label used for budget row matching.
pub fn normalize_label(text: &str) -> String {
    text.trim().to_lowercase()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region PathUtilities

fn _normalize_path(path: &Path) -> PathBuf {
    if let Ok(resolved) = fs::canonicalize(path) {
        return resolved;
    }
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(path)
}

/// Whether two paths point at the same file once resolved.
pub fn is_same_path(path_a: &Path, path_b: &Path) -> bool {
    _normalize_path(path_a) == _normalize_path(path_b)
}

/// Absolute form of `path` for user-facing messages.
pub fn derive_display_path(path: &Path) -> PathBuf {
    _normalize_path(path)
}

fn _derive_parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Write `path_target` through a sibling temp file renamed into place.
///
/// `write_fn` receives the temp path; the target is only replaced when it
/// succeeds, so a failed write leaves any previous file untouched.
pub fn persist_file_atomic<F>(path_target: &Path, suffix: &str, write_fn: F) -> Result<(), FillError>
where
    F: FnOnce(&Path) -> Result<(), FillError>,
{
    let path_dir = _derive_parent_dir(path_target);
    let file_tmp = tempfile::Builder::new()
        .prefix(".sheetfill-")
        .suffix(suffix)
        .tempfile_in(&path_dir)
        .map_err(|source| FillError::Io {
            path: path_dir.clone(),
            source,
        })?;

    write_fn(file_tmp.path())?;

    file_tmp
        .persist(path_target)
        .map_err(|err| FillError::Io {
            path: path_target.to_path_buf(),
            source: err.error,
        })?;
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
