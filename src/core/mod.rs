//! Pivot and formula engine

pub mod formula;
pub mod orchestrator;
pub mod pivot;
pub mod report;

pub use formula::{evaluate_formula, CompiledFormula};
pub use orchestrator::{PivotReportWriter, ReportSettings, ReportSink};
pub use pivot::{CriterionPivotTable, PivotSet};
pub use report::{process_formula, ReportResultTable};
