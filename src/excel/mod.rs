//! Excel input and output
//!
//! - Read: project workbook (.xlsx) → [`Dataset`](crate::types::Dataset)
//! - Write: report sheets, charts and the Index → .xlsx

mod reader;
mod writer;

pub use reader::{WorkbookReader, CRITERIA_SHEET, REPORTS_SHEET, RESOURCES_SHEET};
pub use writer::{column_letter, sanitize_sheet_name, XlsxReportWriter};
