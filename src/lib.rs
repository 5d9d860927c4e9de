//! xlpivot - criterion pivots and formula reports
//!
//! This library reads a flat table of criterion observations, builds one
//! row × column cross-tabulation per criterion, evaluates report formulas
//! over them and writes formatted Excel reports.
//!
//! # Features
//!
//! - One pivot per criterion over a shared row and column domain
//! - Arithmetic report formulas over criterion keys (`(C_2 + C_3) / C_1`)
//! - Column pruning and mixed numeric/prefixed/text column ordering
//! - Optional Total and Delta rows
//! - Data sheets, line charts and an Index sheet via `rust_xlsxwriter`
//! - Workbook or YAML input, multilingual labels
//!
//! # Example
//!
//! ```
//! use xlpivot::core::{process_formula, PivotSet};
//! use xlpivot::types::CriterionRecord;
//!
//! let records = vec![
//!     CriterionRecord::new("C1", "r1", "c1", 10.0),
//!     CriterionRecord::new("C1", "r1", "c2", 20.0),
//!     CriterionRecord::new("C2", "r1", "c1", 5.0),
//! ];
//! let pivots = PivotSet::build(&records)?;
//! let table = process_formula(&pivots, "C1 + C2");
//!
//! assert_eq!(table.value("r1", "c1"), Some(15.0));
//! assert_eq!(table.value("r1", "c2"), Some(20.0));
//! # Ok::<(), xlpivot::error::PivotError>(())
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod excel;
pub mod logging;
pub mod parser;
pub mod resources;
pub mod types;

// Re-export commonly used types
pub use error::{PivotError, PivotResult};
pub use types::{CellValue, CriterionRecord, Dataset, ReportSpec, ResourceString};
