//! Workbook reader - Excel (.xlsx) → Dataset
//!
//! Reads the three input sheets of a project workbook:
//! `CriterionValues` (flat observations), `PivotInfos` (report specs) and
//! `ResourceStrings` (labels per language).

use crate::error::{PivotError, PivotResult};
use crate::types::{format_key_number, CellValue, CriterionRecord, Dataset, ReportSpec, ResourceString};
use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const CRITERIA_SHEET: &str = "CriterionValues";
pub const REPORTS_SHEET: &str = "PivotInfos";
pub const RESOURCES_SHEET: &str = "ResourceStrings";

/// Reads a project workbook into a [`Dataset`]
pub struct WorkbookReader {
    path: PathBuf,
}

impl WorkbookReader {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn read(&self) -> PivotResult<Dataset> {
        let mut workbook: Xlsx<_> = open_workbook(&self.path).map_err(|e| {
            PivotError::Import(format!(
                "Failed to open Excel file '{}': {}",
                self.path.display(),
                e
            ))
        })?;

        let sheet_names = workbook.sheet_names().to_vec();
        let mut load = |name: &str, required: bool| -> PivotResult<Option<SheetTable>> {
            if !sheet_names.iter().any(|s| s == name) {
                if required {
                    return Err(PivotError::Import(format!(
                        "Sheet '{}' not found in '{}'",
                        name,
                        self.path.display()
                    )));
                }
                warn!(sheet = name, "Optional sheet not found");
                return Ok(None);
            }
            let range = workbook
                .worksheet_range(name)
                .map_err(|e| PivotError::Import(format!("Failed to read sheet '{}': {}", name, e)))?;
            Ok(Some(SheetTable::from_range(&range)))
        };

        let criteria_sheet = load(CRITERIA_SHEET, true)?;
        let reports_sheet = load(REPORTS_SHEET, true)?;
        let resources_sheet = load(RESOURCES_SHEET, false)?;

        let dataset = Dataset {
            criteria: criteria_sheet.map(|s| read_criteria(&s)).transpose()?.unwrap_or_default(),
            reports: reports_sheet.map(|s| read_reports(&s)).transpose()?.unwrap_or_default(),
            resources: resources_sheet.map(|s| read_resources(&s)).unwrap_or_default(),
        };

        debug!(
            criteria = dataset.criteria.len(),
            reports = dataset.reports.len(),
            resources = dataset.resources.len(),
            "Read workbook"
        );
        Ok(dataset)
    }
}

//==============================================================================
// Sheet access
//==============================================================================

/// A sheet as header names plus data rows
#[derive(Debug, Clone, Default)]
pub(crate) struct SheetTable {
    /// Trimmed header per column; None for untitled or `Unnamed*` columns
    headers: Vec<Option<String>>,
    rows: Vec<Vec<Data>>,
}

impl SheetTable {
    pub(crate) fn from_range(range: &Range<Data>) -> Self {
        let mut rows = range.rows();
        let headers = match rows.next() {
            Some(header) => header
                .iter()
                .map(|cell| {
                    let name = cell_to_text(cell)?;
                    if name.starts_with("Unnamed") {
                        None
                    } else {
                        Some(name)
                    }
                })
                .collect(),
            None => Vec::new(),
        };

        let rows = rows
            .filter(|row| row.iter().any(|cell| cell_to_text(cell).is_some()))
            .map(|row| row.to_vec())
            .collect();

        Self { headers, rows }
    }

    fn column(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.as_deref().is_some_and(|h| h.eq_ignore_ascii_case(name)))
    }

    /// First of `names` present as a header
    fn any_column(&self, names: &[&str]) -> Option<usize> {
        names.iter().find_map(|name| self.column(name))
    }

    fn require(&self, sheet: &str, name: &str) -> PivotResult<usize> {
        self.column(name).ok_or_else(|| {
            PivotError::Import(format!("Sheet '{}' has no '{}' column", sheet, name))
        })
    }

    fn cell<'a>(row: &'a [Data], col: Option<usize>) -> &'a Data {
        col.and_then(|c| row.get(c)).unwrap_or(&Data::Empty)
    }
}

//==============================================================================
// Cell conversion
//==============================================================================

/// Trimmed text of a cell; None for empty or blank cells
pub(crate) fn cell_to_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty | Data::Error(_) => return None,
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => format_key_number(*f),
        Data::Bool(b) => b.to_string(),
        other => other.to_string().trim().to_string(),
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Cell interpreted as a flag: booleans, non-zero numbers, `true/yes/1/x`
pub(crate) fn cell_to_flag(cell: &Data) -> Option<bool> {
    match cell {
        Data::Bool(b) => Some(*b),
        Data::Int(i) => Some(*i != 0),
        Data::Float(f) => Some(*f != 0.0),
        Data::String(s) if s.trim().is_empty() => None,
        Data::String(s) => Some(matches!(
            s.trim().to_lowercase().as_str(),
            "true" | "yes" | "1" | "x"
        )),
        _ => None,
    }
}

fn cell_to_value(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Number(if *b { 1.0 } else { 0.0 }),
        other => match cell_to_text(other) {
            Some(text) => CellValue::Text(text),
            None => CellValue::Empty,
        },
    }
}

//==============================================================================
// Sheets
//==============================================================================

fn read_criteria(sheet: &SheetTable) -> PivotResult<Vec<CriterionRecord>> {
    let criterion = sheet.require(CRITERIA_SHEET, "criterion_key")?;
    let row_key = sheet.require(CRITERIA_SHEET, "dimension_1")?;
    let column_key = sheet.require(CRITERIA_SHEET, "dimension_2")?;
    let numeric = sheet.column("numeric_value");
    let text = sheet.column("text_value");
    let plain = sheet.column("value");
    if numeric.is_none() && text.is_none() && plain.is_none() {
        return Err(PivotError::Import(format!(
            "Sheet '{}' has no value column (numeric_value, text_value or value)",
            CRITERIA_SHEET
        )));
    }

    let mut records = Vec::with_capacity(sheet.rows.len());
    for (idx, row) in sheet.rows.iter().enumerate() {
        let keys = (
            cell_to_text(SheetTable::cell(row, Some(criterion))),
            cell_to_text(SheetTable::cell(row, Some(row_key))),
            cell_to_text(SheetTable::cell(row, Some(column_key))),
        );
        let (Some(c), Some(r), Some(k)) = keys else {
            warn!(sheet = CRITERIA_SHEET, row = idx + 2, "Skipping row with a missing key");
            continue;
        };

        // numeric_value wins, then text_value, then value
        let value = [numeric, text, plain]
            .into_iter()
            .flatten()
            .map(|col| cell_to_value(SheetTable::cell(row, Some(col))))
            .find(|v| !v.is_empty())
            .unwrap_or_default();

        records.push(CriterionRecord::new(c, r, k, value));
    }
    Ok(records)
}

fn read_reports(sheet: &SheetTable) -> PivotResult<Vec<ReportSpec>> {
    let query = sheet.require(REPORTS_SHEET, "query_name")?;
    let formula = sheet.column("formula");
    let show_rows = sheet.any_column(&["show_rows", "draw_rows"]);
    let show_total = sheet.any_column(&["show_total", "draw_total"]);
    let show_delta = sheet.any_column(&["show_delta", "draw_delta"]);
    let show_init = sheet.column("show_init");

    let flag = |row: &[Data], col: Option<usize>, default: bool| {
        cell_to_flag(SheetTable::cell(row, col)).unwrap_or(default)
    };

    Ok(sheet
        .rows
        .iter()
        .filter_map(|row| {
            let query_name = cell_to_text(SheetTable::cell(row, Some(query)))?;
            Some(ReportSpec {
                query_name,
                formula: cell_to_text(SheetTable::cell(row, formula)),
                show_rows: flag(row, show_rows, true),
                show_total: flag(row, show_total, false),
                show_delta: flag(row, show_delta, false),
                show_init: flag(row, show_init, false),
            })
        })
        .collect())
}

fn read_resources(sheet: &SheetTable) -> Vec<ResourceString> {
    let Some(reference) = sheet.column("Ref") else {
        warn!(sheet = RESOURCES_SHEET, "No 'Ref' column; resource strings ignored");
        return Vec::new();
    };
    let columns = [
        sheet.column("EN"),
        sheet.column("DE"),
        sheet.column("FR"),
        sheet.column("IT"),
    ];

    sheet
        .rows
        .iter()
        .filter_map(|row| {
            let text = |col: Option<usize>| cell_to_text(SheetTable::cell(row, col));
            Some(ResourceString {
                reference: text(Some(reference))?,
                en: text(columns[0]),
                de: text(columns[1]),
                fr: text(columns[2]),
                it: text(columns[3]),
            })
        })
        .collect()
}
