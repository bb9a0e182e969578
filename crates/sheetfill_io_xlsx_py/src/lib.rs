use std::collections::BTreeMap;
use std::path::PathBuf;

use pyo3::IntoPyObject;
use pyo3::exceptions::{PyFileNotFoundError, PyOSError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyBool, PyFloat, PyString};
use sheetfill_io_xlsx::{
    C_FILE_CONFIG_DEFAULT, ConfigDocument, EnumCellValue, FillError, N_ROW_LABEL_SCAN_END,
    N_ROW_LABEL_SCAN_START, ReportFill, SpecFillOptions, SpecLabelScanWindow, SpecResolvedWrite,
    apply_form_fields, parse_value, run_fill,
};
use sheetfill_log::{EnumLogLevel, init_tracing};

const N_BRIDGE_ABI_VERSION: u64 = 1;
const C_BRIDGE_CONTRACT_VERSION: &str = "sheetfill.xlsx.fill_workbook.v1";
const C_BRIDGE_TRANSPORT: &str = "rust_native";

#[pyclass(name = "ResolvedWrite")]
#[derive(Debug, Clone)]
struct PyResolvedWrite {
    #[pyo3(get)]
    sheet: String,
    #[pyo3(get)]
    cell: String,
    #[pyo3(get)]
    value: String,
}

impl From<SpecResolvedWrite> for PyResolvedWrite {
    fn from(write: SpecResolvedWrite) -> Self {
        Self {
            sheet: write.sheet_name,
            cell: write.cell.to_string(),
            value: write.value.to_string(),
        }
    }
}

#[pymethods]
impl PyResolvedWrite {
    fn __repr__(&self) -> String {
        format!("ResolvedWrite({}!{} = {:?})", self.sheet, self.cell, self.value)
    }
}

#[pyclass(name = "ReportFill")]
#[derive(Debug, Clone)]
struct PyReportFill {
    #[pyo3(get)]
    file_out: Option<String>,
    #[pyo3(get)]
    cnt_resolved: u64,
    #[pyo3(get)]
    cnt_written: u64,
    #[pyo3(get)]
    cnt_skipped_empty: u64,
    #[pyo3(get)]
    cnt_skipped_sheet: u64,
    #[pyo3(get)]
    cnt_dropped: u64,
    #[pyo3(get)]
    writes: Vec<PyResolvedWrite>,
    #[pyo3(get)]
    warnings: Vec<String>,
    report: ReportFill,
}

impl From<ReportFill> for PyReportFill {
    fn from(report: ReportFill) -> Self {
        Self {
            file_out: report
                .path_file_out
                .as_ref()
                .map(|path| path.to_string_lossy().to_string()),
            cnt_resolved: report.cnt_resolved,
            cnt_written: report.cnt_written,
            cnt_skipped_empty: report.cnt_skipped_empty,
            cnt_skipped_sheet: report.cnt_skipped_sheet,
            cnt_dropped: report.cnt_dropped,
            writes: report
                .writes
                .iter()
                .cloned()
                .map(PyResolvedWrite::from)
                .collect(),
            warnings: report.warnings.clone(),
            report,
        }
    }
}

#[pymethods]
impl PyReportFill {
    #[getter]
    fn warning_count(&self) -> usize {
        self.report.warning_count()
    }

    fn to_dict(&self) -> BTreeMap<String, u64> {
        self.report.to_dict()
    }

    #[pyo3(signature = (prefix = "[FILL]"))]
    fn format(&self, prefix: &str) -> String {
        self.report.format(prefix)
    }

    fn __str__(&self) -> String {
        self.report.to_string()
    }
}

fn map_fill_error(exception: FillError) -> PyErr {
    match exception {
        FillError::ConfigNotFound(_) | FillError::TemplateNotFound(_) => {
            PyFileNotFoundError::new_err(exception.to_string())
        }
        FillError::ConfigInvalid { .. }
        | FillError::OutputIsTemplate(_)
        | FillError::InvalidOptions(_) => PyValueError::new_err(exception.to_string()),
        FillError::WorkbookRead { .. } | FillError::WorkbookWrite { .. } | FillError::Io { .. } => {
            PyOSError::new_err(exception.to_string())
        }
    }
}

#[pyfunction(name = "fill_workbook")]
#[pyo3(signature = (
    file_config = C_FILE_CONFIG_DEFAULT.to_string(),
    file_template = None,
    file_out = None,
    label_row_start = N_ROW_LABEL_SCAN_START,
    label_row_end = N_ROW_LABEL_SCAN_END,
    if_dry_run = false
))]
fn fill_workbook_py(
    py: Python<'_>,
    file_config: String,
    file_template: Option<String>,
    file_out: Option<String>,
    label_row_start: u32,
    label_row_end: u32,
    if_dry_run: bool,
) -> PyResult<PyReportFill> {
    let options = SpecFillOptions {
        path_file_config: PathBuf::from(file_config),
        path_file_template: file_template.map(PathBuf::from),
        path_file_out: file_out.map(PathBuf::from),
        label_scan_window: SpecLabelScanWindow {
            row_start: label_row_start,
            row_end: label_row_end,
        },
        if_dry_run,
        ..SpecFillOptions::default()
    };

    let report = py.allow_threads(|| run_fill(&options));
    let report = report.map_err(map_fill_error)?;
    Ok(PyReportFill::from(report))
}

#[pyfunction(name = "parse_value")]
#[pyo3(signature = (raw = None))]
fn parse_value_py<'py>(py: Python<'py>, raw: Option<&str>) -> PyResult<Bound<'py, PyAny>> {
    let obj = match parse_value(raw) {
        EnumCellValue::Empty => PyString::new(py, "").into_any(),
        EnumCellValue::Integer(v) => v.into_pyobject(py)?.into_any(),
        EnumCellValue::Float(v) => PyFloat::new(py, v).into_any(),
        EnumCellValue::String(v) => PyString::new(py, &v).into_any(),
        EnumCellValue::Boolean(v) => PyBool::new(py, v).to_owned().into_any(),
    };
    Ok(obj)
}

#[pyfunction(name = "apply_form_fields")]
#[pyo3(signature = (file_config, fields, if_keep_absent = false))]
fn apply_form_fields_py(
    py: Python<'_>,
    file_config: String,
    fields: Vec<(String, String)>,
    if_keep_absent: bool,
) -> PyResult<u64> {
    let path_file_config = PathBuf::from(file_config);
    let result = py.allow_threads(|| {
        let mut document = ConfigDocument::load_or_default(&path_file_config)?;
        let cnt = apply_form_fields(&mut document, &fields, if_keep_absent);
        document.save(&path_file_config)?;
        Ok::<u64, FillError>(cnt)
    });
    result.map_err(map_fill_error)
}

#[pyfunction(name = "init_logging")]
#[pyo3(signature = (level = "warn"))]
fn init_logging_py(level: &str) -> PyResult<bool> {
    let level = level.parse::<EnumLogLevel>().map_err(PyValueError::new_err)?;
    Ok(init_tracing(level).is_ok())
}

#[pymodule]
fn _sheetfill_io_xlsx_rs(module: &Bound<'_, PyModule>) -> PyResult<()> {
    module.add_class::<PyResolvedWrite>()?;
    module.add_class::<PyReportFill>()?;
    module.add_function(wrap_pyfunction!(fill_workbook_py, module)?)?;
    module.add_function(wrap_pyfunction!(parse_value_py, module)?)?;
    module.add_function(wrap_pyfunction!(apply_form_fields_py, module)?)?;
    module.add_function(wrap_pyfunction!(init_logging_py, module)?)?;
    module.add("__bridge_abi__", N_BRIDGE_ABI_VERSION)?;
    module.add("__bridge_contract__", C_BRIDGE_CONTRACT_VERSION)?;
    module.add("__bridge_transport__", C_BRIDGE_TRANSPORT)?;
    Ok(())
}
