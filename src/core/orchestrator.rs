//! Pivot report orchestrator
//!
//! Drives one export run: builds the pivot set once, evaluates every report
//! spec against it, applies the per-report row options, resolves labels and
//! hands finished sheets to a [`ReportSink`].

use crate::core::pivot::PivotSet;
use crate::core::report::{
    process_formula, ReportResultTable, RowKind, DELTA_ROW_LABEL, TOTAL_ROW_LABEL,
};
use crate::error::PivotResult;
use crate::resources::{Language, ResourceStrings};
use crate::types::{CriterionRecord, ReportSpec};
use serde::Serialize;
use tracing::info;

pub const INDEX_SHEET_NAME: &str = "Index";

/// Settings that apply to a whole export run
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReportSettings {
    pub language: Language,
}

/// Chart title and axis titles
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartLabels {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
}

/// A report table ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct DataSheet {
    pub name: String,
    pub title: String,
    pub table: ReportResultTable,
    /// Display label for each row of `table`, same order
    pub row_labels: Vec<String>,
}

/// A line chart drawn from a data sheet
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSheet {
    pub name: String,
    pub data_sheet: String,
    pub labels: ChartLabels,
    pub show_rows: bool,
    pub show_total: bool,
    pub show_delta: bool,
}

/// One line of the Index sheet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexEntry {
    pub title: String,
    pub sheet_prefix: String,
    pub formula: String,
    pub query_name: String,
}

/// Destination for finished report sheets
pub trait ReportSink {
    fn add_data_sheet(&mut self, sheet: &DataSheet) -> PivotResult<()>;

    fn add_chart_sheet(&mut self, chart: &ChartSheet, data: &DataSheet) -> PivotResult<()>;

    /// Called once after all reports, with entries already sorted
    fn add_index_sheet(&mut self, entries: &[IndexEntry]) -> PivotResult<()>;

    fn finish(&mut self) -> PivotResult<()>;
}

/// What an export run produced
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExportSummary {
    pub reports_written: usize,
    pub reports_skipped: usize,
    /// Query names whose result had no columns left after pruning
    pub empty_reports: Vec<String>,
    pub index: Vec<IndexEntry>,
}

/// Builds every configured report for one dataset
pub struct PivotReportWriter<'a> {
    settings: ReportSettings,
    resources: &'a dyn ResourceStrings,
}

impl<'a> PivotReportWriter<'a> {
    pub fn new(settings: ReportSettings, resources: &'a dyn ResourceStrings) -> Self {
        Self {
            settings,
            resources,
        }
    }

    /// Run the export. Fails before touching the sink if the dataset is invalid.
    pub fn export(
        &self,
        records: &[CriterionRecord],
        specs: &[ReportSpec],
        sink: &mut dyn ReportSink,
    ) -> PivotResult<ExportSummary> {
        let pivots = PivotSet::build(records)?;
        info!(
            criteria = pivots.len(),
            rows = pivots.rows().len(),
            columns = pivots.columns().len(),
            "Built criterion pivots"
        );

        let mut summary = ExportSummary::default();
        for spec in specs {
            let Some(formula) = spec.active_formula() else {
                summary.reports_skipped += 1;
                continue;
            };

            let (data, chart, entry) = self.build_report(&pivots, spec, formula);
            if data.table.is_empty() {
                summary.empty_reports.push(spec.query_name.clone());
            }
            info!(
                query = %spec.query_name,
                sheet = %data.name,
                columns = data.table.columns.len(),
                "Writing report"
            );

            sink.add_data_sheet(&data)?;
            sink.add_chart_sheet(&chart, &data)?;
            summary.index.push(entry);
            summary.reports_written += 1;
        }

        // Index lists reports by title, descending
        summary.index.sort_by(|a, b| b.title.cmp(&a.title));
        sink.add_index_sheet(&summary.index)?;
        sink.finish()?;

        Ok(summary)
    }

    /// Evaluate one report and assemble its sheets
    pub fn build_report(
        &self,
        pivots: &PivotSet,
        spec: &ReportSpec,
        formula: &str,
    ) -> (DataSheet, ChartSheet, IndexEntry) {
        let table = self.build_table(pivots, spec, formula);

        let language = self.settings.language;
        let q = spec.query_name.as_str();
        let sheet_prefix = self.resources.resource_or(&spec.sheet_prefix_key(), language, q);
        let title = self.resources.resource_or(&spec.title_key(), language, q);
        let labels = ChartLabels {
            title: title.clone(),
            x_label: self.resources.resource_or(&spec.x_label_key(), language, ""),
            y_label: self.resources.resource_or(&spec.y_label_key(), language, ""),
        };

        let row_labels = table.rows.iter().map(|row| self.row_label(&row.key, row.kind)).collect();

        let data = DataSheet {
            name: format!("{}_data", sheet_prefix),
            title: title.clone(),
            table,
            row_labels,
        };
        let chart = ChartSheet {
            name: format!("{}_chart", sheet_prefix),
            data_sheet: data.name.clone(),
            labels,
            show_rows: spec.show_rows,
            show_total: spec.show_total,
            show_delta: spec.show_delta,
        };
        let entry = IndexEntry {
            title,
            sheet_prefix,
            formula: formula.to_string(),
            query_name: spec.query_name.clone(),
        };

        (data, chart, entry)
    }

    /// Result table with the report's init/total/delta options applied
    pub fn build_table(&self, pivots: &PivotSet, spec: &ReportSpec, formula: &str) -> ReportResultTable {
        let mut table = process_formula(pivots, formula);
        if !spec.show_init {
            table.remove_init_row();
        }
        if spec.show_total {
            table.push_total_row();
        }
        if spec.show_delta {
            table.push_delta_row();
        }
        table
    }

    fn row_label(&self, key: &str, kind: RowKind) -> String {
        let fallback = match kind {
            RowKind::Data => key,
            RowKind::Total => TOTAL_ROW_LABEL,
            RowKind::Delta => DELTA_ROW_LABEL,
        };
        // a row key without a translation is its own label
        self.resources
            .lookup(fallback, self.settings.language)
            .unwrap_or_else(|| fallback.to_string())
    }
}
