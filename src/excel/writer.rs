//! Workbook writer - report sheets → Excel (.xlsx)
//!
//! Implements [`ReportSink`] on top of `rust_xlsxwriter`. Sheets are built in
//! memory and only saved by [`ReportSink::finish`], with the Index sheet
//! placed first.

use crate::core::orchestrator::{ChartSheet, DataSheet, IndexEntry, ReportSink, INDEX_SHEET_NAME};
use crate::core::report::RowKind;
use crate::error::{PivotError, PivotResult};
use rust_xlsxwriter::{
    Chart, ChartType, Format, FormatAlign, FormatBorder, Formula, Workbook, Worksheet,
};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const MAX_SHEET_NAME_LEN: usize = 31;
const MIN_COLUMN_WIDTH: usize = 8;
const PAPER_A4: u8 = 9;
const HEADER_FILL: u32 = 0xE7E6E6;
const CHART_STYLE: u8 = 10;
const CHART_WIDTH: u32 = 1300;
const CHART_HEIGHT: u32 = 800;
const FIRST_COLUMN_HEADER: &str = "Name";

/// Column index → Excel column letters (0 → A, 26 → AA)
pub fn column_letter(index: u16) -> String {
    let mut result = String::new();
    let mut idx = index as usize;

    loop {
        result.insert(0, (b'A' + (idx % 26) as u8) as char);
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }

    result
}

/// Make a string usable as a worksheet name
pub fn sanitize_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .collect();
    let cleaned = cleaned.trim_matches('\'').trim();
    let truncated: String = cleaned.chars().take(MAX_SHEET_NAME_LEN).collect();
    if truncated.is_empty() {
        "Sheet".to_string()
    } else {
        truncated
    }
}

struct SheetFormats {
    cell: Format,
    header: Format,
    first_column: Format,
}

impl SheetFormats {
    fn new() -> Self {
        let cell = Format::new().set_border(FormatBorder::Thin);

        let header = Format::new()
            .set_bold()
            .set_align(FormatAlign::Center)
            .set_background_color(HEADER_FILL)
            .set_border(FormatBorder::Medium);

        let first_column = Format::new()
            .set_bold()
            .set_background_color(HEADER_FILL)
            .set_border(FormatBorder::Medium);

        Self {
            cell,
            header,
            first_column,
        }
    }
}

/// Writes report sheets into one .xlsx file
pub struct XlsxReportWriter {
    path: PathBuf,
    sheets: Vec<Worksheet>,
    index: Option<Worksheet>,
    used_names: HashSet<String>,
    /// Requested data sheet name → name actually used
    data_sheet_names: HashMap<String, String>,
    formats: SheetFormats,
}

impl XlsxReportWriter {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            sheets: Vec::new(),
            index: None,
            used_names: HashSet::new(),
            data_sheet_names: HashMap::new(),
            formats: SheetFormats::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sanitized name, made unique within the workbook (case-insensitive)
    fn unique_name(&mut self, requested: &str) -> String {
        let base = sanitize_sheet_name(requested);
        let mut name = base.clone();
        let mut n = 2;
        while self.used_names.contains(&name.to_lowercase()) {
            let suffix = format!("_{}", n);
            let keep = MAX_SHEET_NAME_LEN.saturating_sub(suffix.len());
            name = format!("{}{}", base.chars().take(keep).collect::<String>(), suffix);
            n += 1;
        }
        if name != requested {
            warn!(requested, used = %name, "Sheet name adjusted");
        }
        self.used_names.insert(name.to_lowercase());
        name
    }

    fn new_sheet(&mut self, requested: &str) -> PivotResult<(Worksheet, String)> {
        let name = self.unique_name(requested);
        let mut worksheet = Worksheet::new();
        worksheet.set_name(&name).map_err(|e| {
            PivotError::Export(format!("Failed to set worksheet name '{}': {}", name, e))
        })?;
        Ok((worksheet, name))
    }

    fn write_data(&self, worksheet: &mut Worksheet, sheet: &DataSheet) -> PivotResult<()> {
        let formats = &self.formats;
        let table = &sheet.table;
        let mut widths: Vec<usize> = Vec::with_capacity(table.columns.len() + 1);

        worksheet.write_string_with_format(0, 0, FIRST_COLUMN_HEADER, &formats.header)?;
        widths.push(FIRST_COLUMN_HEADER.len());
        for (c, column) in table.columns.iter().enumerate() {
            worksheet.write_string_with_format(0, c as u16 + 1, column, &formats.header)?;
            widths.push(column.chars().count());
        }

        let data_rows = table.data_rows().count() as u32;
        for (r, row) in table.rows.iter().enumerate() {
            let xl_row = r as u32 + 1;
            let label = sheet.row_labels.get(r).map(String::as_str).unwrap_or(&row.key);
            worksheet.write_string_with_format(xl_row, 0, label, &formats.first_column)?;
            widths[0] = widths[0].max(label.chars().count());

            for (c, cell) in row.cells.iter().enumerate() {
                let xl_col = c as u16 + 1;
                let Some(value) = cell else {
                    worksheet.write_blank(xl_row, xl_col, &formats.cell)?;
                    continue;
                };
                widths[c + 1] = widths[c + 1].max(format!("{}", value).len());

                match row_formula(row.kind, xl_row, xl_col, data_rows) {
                    Some(text) => {
                        let formula = Formula::new(text).set_result(value.to_string());
                        worksheet.write_formula_with_format(xl_row, xl_col, formula, &formats.cell)?;
                    }
                    None => {
                        worksheet.write_number_with_format(xl_row, xl_col, *value, &formats.cell)?;
                    }
                }
            }
        }

        for (c, width) in widths.iter().enumerate() {
            worksheet.set_column_width(c as u16, (*width).max(MIN_COLUMN_WIDTH) as f64)?;
        }
        Ok(())
    }
}

/// Excel formula for a summary cell; None for plain data cells
fn row_formula(kind: RowKind, xl_row: u32, xl_col: u16, data_rows: u32) -> Option<String> {
    let col = column_letter(xl_col);
    match kind {
        RowKind::Data => None,
        RowKind::Total if data_rows == 0 => None,
        // data rows sit at 1-based rows 2..=data_rows + 1
        RowKind::Total => Some(format!("=SUM({col}2:{col}{})", data_rows + 1)),
        RowKind::Delta if xl_col < 2 => None,
        // the row above, whose 1-based number is xl_row
        RowKind::Delta => Some(format!(
            "={col}{row}-{prev}{row}",
            prev = column_letter(xl_col - 1),
            row = xl_row
        )),
    }
}

/// A4 landscape, one page wide, title and date in the header
fn setup_page(worksheet: &mut Worksheet, title: &str) {
    worksheet.set_paper_size(PAPER_A4);
    worksheet.set_landscape();
    worksheet.set_print_fit_to_pages(1, 0);
    worksheet.set_margins(1.0, 1.0, 1.5, 1.0, 0.3, 0.3);
    worksheet.set_header(&format!(
        "&C&\"Arial,Bold\"&16{}&R&\"Arial\"&12&D",
        title.replace('&', "&&")
    ));
    worksheet.set_footer("&L&\"Arial\"&12&F &C&\"Arial\"&12&A  &R&\"Arial\"&12&P/&N");
}

fn build_chart(chart_sheet: &ChartSheet, data: &DataSheet, data_name: &str) -> Option<Chart> {
    let table = &data.table;
    if table.columns.is_empty() {
        return None;
    }
    let last_col = table.columns.len() as u16;

    let mut chart = Chart::new(ChartType::Line);
    chart.set_style(CHART_STYLE);
    chart.set_width(CHART_WIDTH);
    chart.set_height(CHART_HEIGHT);
    let labels = &chart_sheet.labels;
    if !labels.title.is_empty() {
        chart.title().set_name(labels.title.as_str());
    }
    if !labels.x_label.is_empty() {
        chart.x_axis().set_name(labels.x_label.as_str());
    }
    if !labels.y_label.is_empty() {
        chart.y_axis().set_name(labels.y_label.as_str());
    }

    let mut series = 0;
    for (r, row) in table.rows.iter().enumerate() {
        let wanted = match row.kind {
            RowKind::Data => chart_sheet.show_rows,
            RowKind::Total => chart_sheet.show_total,
            RowKind::Delta => chart_sheet.show_delta,
        };
        if !wanted {
            continue;
        }
        let xl_row = r as u32 + 1;
        chart
            .add_series()
            .set_name((data_name, xl_row, 0))
            .set_categories((data_name, 0, 1, 0, last_col))
            .set_values((data_name, xl_row, 1, xl_row, last_col));
        series += 1;
    }

    if series == 0 {
        None
    } else {
        Some(chart)
    }
}

impl ReportSink for XlsxReportWriter {
    fn add_data_sheet(&mut self, sheet: &DataSheet) -> PivotResult<()> {
        let (mut worksheet, name) = self.new_sheet(&sheet.name)?;
        self.write_data(&mut worksheet, sheet)?;
        setup_page(&mut worksheet, &sheet.title);

        self.data_sheet_names.insert(sheet.name.clone(), name);
        self.sheets.push(worksheet);
        Ok(())
    }

    fn add_chart_sheet(&mut self, chart_sheet: &ChartSheet, data: &DataSheet) -> PivotResult<()> {
        let data_name = self
            .data_sheet_names
            .get(&chart_sheet.data_sheet)
            .cloned()
            .ok_or_else(|| {
                PivotError::Export(format!(
                    "Chart '{}' refers to unknown data sheet '{}'",
                    chart_sheet.name, chart_sheet.data_sheet
                ))
            })?;

        let (mut worksheet, name) = self.new_sheet(&chart_sheet.name)?;
        match build_chart(chart_sheet, data, &data_name) {
            Some(chart) => {
                worksheet.insert_chart(0, 0, &chart)?;
            }
            None => debug!(sheet = %name, "No series to draw; chart sheet left empty"),
        }
        worksheet.set_paper_size(PAPER_A4);
        worksheet.set_landscape();

        self.sheets.push(worksheet);
        Ok(())
    }

    fn add_index_sheet(&mut self, entries: &[IndexEntry]) -> PivotResult<()> {
        let (mut worksheet, _) = self.new_sheet(INDEX_SHEET_NAME)?;
        let headers = ["title", "sheet_prefix", "formula", "query_name"];
        let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();

        for (c, header) in headers.iter().enumerate() {
            worksheet.write_string_with_format(0, c as u16, *header, &self.formats.header)?;
        }
        for (r, entry) in entries.iter().enumerate() {
            let xl_row = r as u32 + 1;
            let values = [&entry.title, &entry.sheet_prefix, &entry.formula, &entry.query_name];
            for (c, value) in values.iter().enumerate() {
                worksheet.write_string_with_format(xl_row, c as u16, value.as_str(), &self.formats.cell)?;
                widths[c] = widths[c].max(value.chars().count());
            }
        }
        for (c, width) in widths.iter().enumerate() {
            worksheet.set_column_width(c as u16, (*width).max(MIN_COLUMN_WIDTH) as f64)?;
        }
        setup_page(&mut worksheet, INDEX_SHEET_NAME);

        self.index = Some(worksheet);
        Ok(())
    }

    fn finish(&mut self) -> PivotResult<()> {
        let mut workbook = Workbook::new();
        if let Some(index) = self.index.take() {
            workbook.push_worksheet(index);
        }
        for worksheet in self.sheets.drain(..) {
            workbook.push_worksheet(worksheet);
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        workbook.save(&self.path).map_err(|e| {
            PivotError::Export(format!(
                "Failed to save Excel file '{}': {}",
                self.path.display(),
                e
            ))
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letter() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(1), "B");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(51), "AZ");
        assert_eq!(column_letter(701), "ZZ");
        assert_eq!(column_letter(702), "AAA");
    }

    #[test]
    fn test_sanitize_sheet_name() {
        assert_eq!(sanitize_sheet_name("a/b:c*d?[e]\\f"), "abcdef");
        assert_eq!(sanitize_sheet_name("'quoted'"), "quoted");
        assert_eq!(sanitize_sheet_name("???"), "Sheet");
        let long = "x".repeat(40);
        assert_eq!(sanitize_sheet_name(&long).len(), 31);
    }

    #[test]
    fn test_unique_names() {
        let mut writer = XlsxReportWriter::new("unused.xlsx");
        assert_eq!(writer.unique_name("report_data"), "report_data");
        assert_eq!(writer.unique_name("Report_Data"), "Report_Data_2");
        assert_eq!(writer.unique_name("report_data"), "report_data_3");
    }

    #[test]
    fn test_row_formulas() {
        assert_eq!(row_formula(RowKind::Data, 1, 1, 3), None);
        assert_eq!(
            row_formula(RowKind::Total, 4, 1, 3).as_deref(),
            Some("=SUM(B2:B4)")
        );
        assert_eq!(row_formula(RowKind::Total, 1, 1, 0), None);
        assert_eq!(row_formula(RowKind::Delta, 5, 1, 3), None);
        assert_eq!(
            row_formula(RowKind::Delta, 5, 3, 3).as_deref(),
            Some("=D5-C5")
        );
    }
}
