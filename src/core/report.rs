//! Report row processor
//!
//! Evaluates one formula over every (row, column) of a [`PivotSet`] and
//! assembles the result table: undefined cells are omitted, columns without
//! any defined value or with only zeros are dropped, and the surviving
//! columns are sorted with [`ColumnSortKey`].

use crate::core::formula::CompiledFormula;
use crate::core::pivot::PivotSet;
use serde::Serialize;
use std::cmp::Ordering;
use tracing::warn;

/// Row key of the synthetic initial-state row, hidden unless requested
pub const INIT_ROW_KEY: &str = "zz_Init";
pub const TOTAL_ROW_LABEL: &str = "Total";
pub const DELTA_ROW_LABEL: &str = "Delta";

//==============================================================================
// Column ordering
//==============================================================================

/// Sort key for result columns.
///
/// Integer keys come first (numeric order), then keys made of a two
/// character prefix and an integer such as `S_05` (ordered by the integer),
/// then everything else (lexicographic).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ColumnSortKey {
    Numeric(i64),
    PrefixedNumeric(i64),
    Text(String),
}

impl ColumnSortKey {
    pub fn of(key: &str) -> Self {
        let trimmed = key.trim();
        if let Ok(n) = trimmed.parse::<i64>() {
            return ColumnSortKey::Numeric(n);
        }

        let suffix: String = trimmed.chars().skip(2).collect();
        if let Ok(n) = suffix.parse::<i64>() {
            return ColumnSortKey::PrefixedNumeric(n);
        }

        ColumnSortKey::Text(key.to_string())
    }
}

/// Compare two column keys; equal sort keys fall back to the raw key
pub fn compare_columns(a: &str, b: &str) -> Ordering {
    ColumnSortKey::of(a)
        .cmp(&ColumnSortKey::of(b))
        .then_with(|| a.cmp(b))
}

/// Sort column keys in place
pub fn sort_columns(columns: &mut [String]) {
    columns.sort_by(|a, b| compare_columns(a, b));
}

//==============================================================================
// Result table
//==============================================================================

/// What a result row stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowKind {
    Data,
    Total,
    Delta,
}

/// One row of a report; `None` cells are undefined and left blank
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub key: String,
    pub kind: RowKind,
    pub cells: Vec<Option<f64>>,
}

/// Output of evaluating one report formula
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportResultTable {
    pub columns: Vec<String>,
    pub rows: Vec<ResultRow>,
}

impl ReportResultTable {
    /// Evaluate a compiled formula over the whole pivot set
    pub fn from_formula(pivots: &PivotSet, formula: &CompiledFormula) -> Self {
        let unknown = formula.unknown_criteria(pivots);
        if !unknown.is_empty() {
            warn!(
                formula = formula.source(),
                "Unknown criteria {:?}: treated as zero",
                unknown
            );
        }

        let columns = pivots.columns().to_vec();
        let rows = pivots
            .rows()
            .iter()
            .map(|row| ResultRow {
                key: row.clone(),
                kind: RowKind::Data,
                cells: columns
                    .iter()
                    .map(|column| formula.evaluate_at(pivots, row, column))
                    .collect(),
            })
            .collect();

        let mut table = Self { columns, rows };
        table.prune_columns();
        table.sort_columns();
        table
    }

    /// A table with the full row domain and no columns
    fn without_columns(pivots: &PivotSet) -> Self {
        Self {
            columns: Vec::new(),
            rows: pivots
                .rows()
                .iter()
                .map(|row| ResultRow {
                    key: row.clone(),
                    kind: RowKind::Data,
                    cells: Vec::new(),
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn row(&self, key: &str) -> Option<&ResultRow> {
        self.rows.iter().find(|r| r.key == key)
    }

    /// Cell value at (row, column); None when absent or undefined
    pub fn value(&self, row: &str, column: &str) -> Option<f64> {
        let c = self.column_index(column)?;
        self.row(row)?.cells.get(c).copied().flatten()
    }

    pub fn data_rows(&self) -> impl Iterator<Item = &ResultRow> {
        self.rows.iter().filter(|r| r.kind == RowKind::Data)
    }

    /// Drop columns with no defined value, or whose defined values are all zero
    fn prune_columns(&mut self) {
        let keep: Vec<bool> = (0..self.columns.len())
            .map(|c| {
                self.rows
                    .iter()
                    .filter_map(|row| row.cells[c])
                    .any(|v| v != 0.0)
            })
            .collect();

        let mut idx = 0;
        self.columns.retain(|_| {
            idx += 1;
            keep[idx - 1]
        });
        for row in &mut self.rows {
            let mut idx = 0;
            row.cells.retain(|_| {
                idx += 1;
                keep[idx - 1]
            });
        }
    }

    /// Reorder columns (and every row's cells) by [`ColumnSortKey`]
    fn sort_columns(&mut self) {
        let mut order: Vec<usize> = (0..self.columns.len()).collect();
        order.sort_by(|&a, &b| compare_columns(&self.columns[a], &self.columns[b]));

        self.columns = order.iter().map(|&i| self.columns[i].clone()).collect();
        for row in &mut self.rows {
            row.cells = order.iter().map(|&i| row.cells[i]).collect();
        }
    }

    /// Remove the synthetic initial-state row
    pub fn remove_init_row(&mut self) {
        self.rows
            .retain(|r| !(r.kind == RowKind::Data && r.key == INIT_ROW_KEY));
    }

    /// Append a row holding the per-column sum of the data rows.
    ///
    /// A column without any defined data value stays undefined.
    pub fn push_total_row(&mut self) {
        let cells = (0..self.columns.len())
            .map(|c| {
                let mut defined = self.data_rows().filter_map(|row| row.cells[c]).peekable();
                defined.peek()?;
                Some(defined.sum())
            })
            .collect();

        self.rows.push(ResultRow {
            key: TOTAL_ROW_LABEL.to_string(),
            kind: RowKind::Total,
            cells,
        });
    }

    /// Append a row with the column-to-column change of the last row.
    ///
    /// Each cell is `last[c] - last[c - 1]`; the first column and any pair
    /// with an undefined operand stay undefined.
    pub fn push_delta_row(&mut self) {
        let cells = match self.rows.last() {
            Some(last) => (0..self.columns.len())
                .map(|c| {
                    if c == 0 {
                        return None;
                    }
                    Some(last.cells[c]? - last.cells[c - 1]?)
                })
                .collect(),
            None => vec![None; self.columns.len()],
        };

        self.rows.push(ResultRow {
            key: DELTA_ROW_LABEL.to_string(),
            kind: RowKind::Delta,
            cells,
        });
    }
}

/// Build the result table for `formula`.
///
/// A formula that does not tokenize or parse is logged and produces a table
/// with every row and no columns, as if every cell were undefined.
pub fn process_formula(pivots: &PivotSet, formula: &str) -> ReportResultTable {
    match CompiledFormula::compile(formula) {
        Ok(compiled) => ReportResultTable::from_formula(pivots, &compiled),
        Err(err) => {
            warn!(formula, "Error evaluating formula: {}", err);
            ReportResultTable::without_columns(pivots)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CellValue, CriterionRecord};
    use pretty_assertions::assert_eq;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_sort_key_buckets() {
        assert_eq!(ColumnSortKey::of("2021"), ColumnSortKey::Numeric(2021));
        assert_eq!(ColumnSortKey::of("S_05"), ColumnSortKey::PrefixedNumeric(5));
        assert_eq!(ColumnSortKey::of("abc"), ColumnSortKey::Text("abc".to_string()));
        assert_eq!(ColumnSortKey::of("x"), ColumnSortKey::Text("x".to_string()));
    }

    #[test]
    fn test_sort_mixed_columns() {
        let mut columns = strings(&["10", "S_02", "S_01", "abc"]);
        sort_columns(&mut columns);
        assert_eq!(columns, strings(&["10", "S_01", "S_02", "abc"]));
    }

    #[test]
    fn test_sort_numeric_is_not_lexicographic() {
        let mut columns = strings(&["100", "9", "-1", "S_10", "S_9"]);
        sort_columns(&mut columns);
        assert_eq!(columns, strings(&["-1", "9", "100", "S_9", "S_10"]));
    }

    #[test]
    fn test_sort_prefix_ties_fall_back_to_raw_key() {
        let mut columns = strings(&["T_01", "S_01", "S_1"]);
        sort_columns(&mut columns);
        assert_eq!(columns, strings(&["S_01", "S_1", "T_01"]));
    }

    fn sample() -> PivotSet {
        PivotSet::build(&[
            CriterionRecord::new("C1", "r1", "c1", 10.0),
            CriterionRecord::new("C1", "r1", "c2", 20.0),
            CriterionRecord::new("C2", "r1", "c1", 5.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_process_formula_sum() {
        let table = process_formula(&sample(), "C1 + C2");
        assert_eq!(table.columns, strings(&["c1", "c2"]));
        assert_eq!(table.value("r1", "c1"), Some(15.0));
        assert_eq!(table.value("r1", "c2"), Some(20.0));
    }

    #[test]
    fn test_process_formula_unknown_criterion_prunes_everything() {
        let table = process_formula(&sample(), "C3");
        assert!(table.is_empty());
        assert_eq!(table.rows.len(), 1);
        assert!(table.rows[0].cells.is_empty());
    }

    #[test]
    fn test_process_formula_bad_syntax_keeps_rows() {
        let table = process_formula(&sample(), "C1 +");
        assert!(table.is_empty());
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn test_prune_all_zero_and_all_undefined_columns() {
        let set = PivotSet::build(&[
            CriterionRecord::new("A", "r1", "y1", 1.0),
            CriterionRecord::new("A", "r1", "y2", 0.0),
            CriterionRecord::new("A", "r1", "y3", CellValue::Empty),
            CriterionRecord::new("A", "r2", "y1", 2.0),
            CriterionRecord::new("A", "r2", "y2", 0.0),
            CriterionRecord::new("A", "r2", "y3", CellValue::Empty),
            CriterionRecord::new("A", "r1", "y4", 0.0),
            CriterionRecord::new("A", "r2", "y4", CellValue::Empty),
        ])
        .unwrap();
        let table = process_formula(&set, "A");
        // y2 only zeros, y3 only undefined, y4 zero plus undefined
        assert_eq!(table.columns, strings(&["y1"]));
        assert_eq!(table.value("r2", "y1"), Some(2.0));
    }

    #[test]
    fn test_undefined_cells_are_omitted_not_zero() {
        let set = PivotSet::build(&[
            CriterionRecord::new("A", "r1", "c1", 4.0),
            CriterionRecord::new("A", "r2", "c1", 6.0),
            CriterionRecord::new("B", "r1", "c1", 2.0),
            CriterionRecord::new("B", "r2", "c1", 0.0),
        ])
        .unwrap();
        let table = process_formula(&set, "A / B");
        assert_eq!(table.value("r1", "c1"), Some(2.0));
        assert_eq!(table.row("r2").unwrap().cells, vec![None]);
    }

    fn totals_fixture() -> ReportResultTable {
        ReportResultTable {
            columns: strings(&["2020", "2021", "2022"]),
            rows: vec![
                ResultRow {
                    key: "a".to_string(),
                    kind: RowKind::Data,
                    cells: vec![Some(1.0), Some(2.0), None],
                },
                ResultRow {
                    key: "b".to_string(),
                    kind: RowKind::Data,
                    cells: vec![Some(3.0), Some(5.0), None],
                },
                ResultRow {
                    key: INIT_ROW_KEY.to_string(),
                    kind: RowKind::Data,
                    cells: vec![Some(100.0), None, None],
                },
            ],
        }
    }

    #[test]
    fn test_remove_init_row() {
        let mut table = totals_fixture();
        table.remove_init_row();
        assert_eq!(table.rows.len(), 2);
        assert!(table.row(INIT_ROW_KEY).is_none());
    }

    #[test]
    fn test_total_then_delta() {
        let mut table = totals_fixture();
        table.remove_init_row();
        table.push_total_row();
        table.push_delta_row();

        let total = table.row(TOTAL_ROW_LABEL).unwrap();
        assert_eq!(total.kind, RowKind::Total);
        assert_eq!(total.cells, vec![Some(4.0), Some(7.0), None]);

        let delta = table.row(DELTA_ROW_LABEL).unwrap();
        assert_eq!(delta.kind, RowKind::Delta);
        assert_eq!(delta.cells, vec![None, Some(3.0), None]);
    }

    #[test]
    fn test_delta_without_total_uses_last_data_row() {
        let mut table = totals_fixture();
        table.remove_init_row();
        table.push_delta_row();
        assert_eq!(table.row(DELTA_ROW_LABEL).unwrap().cells, vec![None, Some(2.0), None]);
    }
}
