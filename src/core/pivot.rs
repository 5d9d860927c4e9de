//! Criterion pivot builder
//!
//! Groups a flat table of (criterion, row, column, value) records into one
//! row × column grid per criterion. Every grid is laid out on the same global
//! column domain (all column keys seen in the table, first-seen order); a
//! column that a criterion never observed is zero-filled, while a missing
//! (row, column) pair inside an observed row and column stays empty. Row keys
//! are kept sorted, which puts the synthetic `zz_Init` row last.

use crate::error::{PivotError, PivotResult};
use crate::types::{CellValue, CriterionRecord};
use std::collections::{HashMap, HashSet};

/// Number of duplicate triples quoted in a duplicate-records error
const DUPLICATE_SAMPLE_SIZE: usize = 20;

/// Reject datasets where a (criterion, row, column) triple appears more than once.
///
/// Every record that takes part in a duplicated triple is counted, and the
/// first offending triples are quoted in the error.
pub fn check_unique(records: &[CriterionRecord]) -> PivotResult<()> {
    let mut counts: HashMap<(&str, &str, &str), usize> = HashMap::new();
    for record in records {
        *counts.entry(record.triple()).or_insert(0) += 1;
    }

    let mut count = 0;
    let mut sample = Vec::new();
    for record in records {
        if counts.get(&record.triple()).copied().unwrap_or(0) > 1 {
            count += 1;
            if sample.len() < DUPLICATE_SAMPLE_SIZE {
                let (c, r, k) = record.triple();
                sample.push(format!("({}, {}, {})", c, r, k));
            }
        }
    }

    if count == 0 {
        Ok(())
    } else {
        Err(PivotError::DuplicateRecords { count, sample })
    }
}

/// Ordered set of keys, remembering first-seen order
#[derive(Debug, Clone, Default, PartialEq)]
struct KeyIndex {
    keys: Vec<String>,
    positions: HashMap<String, usize>,
}

impl KeyIndex {
    fn insert(&mut self, key: &str) -> usize {
        if let Some(&pos) = self.positions.get(key) {
            return pos;
        }
        let pos = self.keys.len();
        self.keys.push(key.to_string());
        self.positions.insert(key.to_string(), pos);
        pos
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.positions.get(key).copied()
    }

    fn len(&self) -> usize {
        self.keys.len()
    }
}

/// Cross-tabulation of one criterion: rows × global columns
#[derive(Debug, Clone, PartialEq)]
pub struct CriterionPivotTable {
    criterion: String,
    rows: KeyIndex,
    columns: KeyIndex,
    cells: Vec<CellValue>,
}

impl CriterionPivotTable {
    pub fn criterion(&self) -> &str {
        &self.criterion
    }

    /// Row keys, sorted
    pub fn rows(&self) -> &[String] {
        &self.rows.keys
    }

    /// Column keys (the global column domain)
    pub fn columns(&self) -> &[String] {
        &self.columns.keys
    }

    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.columns.len())
    }

    pub fn contains_row(&self, row: &str) -> bool {
        self.rows.position(row).is_some()
    }

    pub fn contains_column(&self, column: &str) -> bool {
        self.columns.position(column).is_some()
    }

    /// Cell at (row, column), or None when either key is not part of this table
    pub fn get(&self, row: &str, column: &str) -> Option<&CellValue> {
        let r = self.rows.position(row)?;
        let c = self.columns.position(column)?;
        self.cells.get(r * self.columns.len() + c)
    }
}

/// All criterion pivots of one export run, sharing one row and column domain
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PivotSet {
    criteria: Vec<String>,
    rows: Vec<String>,
    columns: Vec<String>,
    pivots: HashMap<String, CriterionPivotTable>,
}

impl PivotSet {
    /// Build one pivot per criterion from the flat record table.
    ///
    /// Fails on duplicate (criterion, row, column) triples, and when a
    /// criterion's row keys differ from the first criterion's row keys.
    pub fn build(records: &[CriterionRecord]) -> PivotResult<Self> {
        check_unique(records)?;

        let mut global_columns = KeyIndex::default();
        let mut criteria = KeyIndex::default();
        for record in records {
            global_columns.insert(&record.column_key);
            criteria.insert(&record.criterion_key);
        }

        let mut partitions: Vec<Vec<&CriterionRecord>> = vec![Vec::new(); criteria.len()];
        for record in records {
            if let Some(idx) = criteria.position(&record.criterion_key) {
                partitions[idx].push(record);
            }
        }

        let mut pivots = HashMap::with_capacity(criteria.len());
        for (criterion, partition) in criteria.keys.iter().zip(&partitions) {
            let pivot = Self::pivot_criterion(criterion, partition, &global_columns);
            pivots.insert(criterion.clone(), pivot);
        }

        let rows = match criteria.keys.first() {
            Some(first) => {
                let reference = &pivots[first];
                for criterion in criteria.keys.iter().skip(1) {
                    Self::check_row_domain(reference, &pivots[criterion])?;
                }
                reference.rows().to_vec()
            }
            None => Vec::new(),
        };

        tracing::debug!(
            criteria = criteria.len(),
            rows = rows.len(),
            columns = global_columns.len(),
            "built criterion pivots"
        );

        Ok(Self {
            criteria: criteria.keys,
            rows,
            columns: global_columns.keys,
            pivots,
        })
    }

    /// Pivot one criterion's records and reindex onto the global columns
    fn pivot_criterion(
        criterion: &str,
        records: &[&CriterionRecord],
        global_columns: &KeyIndex,
    ) -> CriterionPivotTable {
        let mut row_keys: Vec<&str> = Vec::with_capacity(records.len());
        let mut observed_columns = HashSet::new();
        for record in records {
            row_keys.push(&record.row_key);
            observed_columns.insert(record.column_key.as_str());
        }
        row_keys.sort_unstable();
        row_keys.dedup();

        let mut rows = KeyIndex::default();
        for key in row_keys {
            rows.insert(key);
        }

        let width = global_columns.len();
        let mut cells = Vec::with_capacity(rows.len() * width);
        for _ in 0..rows.len() {
            for column in &global_columns.keys {
                if observed_columns.contains(column.as_str()) {
                    cells.push(CellValue::Empty);
                } else {
                    cells.push(CellValue::Number(0.0));
                }
            }
        }

        for record in records {
            if let (Some(r), Some(c)) = (
                rows.position(&record.row_key),
                global_columns.position(&record.column_key),
            ) {
                cells[r * width + c] = record.value.clone();
            }
        }

        CriterionPivotTable {
            criterion: criterion.to_string(),
            rows,
            columns: global_columns.clone(),
            cells,
        }
    }

    fn check_row_domain(
        reference: &CriterionPivotTable,
        other: &CriterionPivotTable,
    ) -> PivotResult<()> {
        let missing: Vec<String> = reference
            .rows()
            .iter()
            .filter(|row| !other.contains_row(row))
            .cloned()
            .collect();
        let extra: Vec<String> = other
            .rows()
            .iter()
            .filter(|row| !reference.contains_row(row))
            .cloned()
            .collect();

        if missing.is_empty() && extra.is_empty() {
            Ok(())
        } else {
            Err(PivotError::RowDomainMismatch {
                criterion: other.criterion().to_string(),
                reference: reference.criterion().to_string(),
                missing,
                extra,
            })
        }
    }

    /// Criterion keys in first-seen order
    pub fn criteria(&self) -> &[String] {
        &self.criteria
    }

    /// Row domain shared by every report, sorted
    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    /// Global column domain in first-seen order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn get(&self, criterion: &str) -> Option<&CriterionPivotTable> {
        self.pivots.get(criterion)
    }

    pub fn contains(&self, criterion: &str) -> bool {
        self.pivots.contains_key(criterion)
    }

    pub fn len(&self) -> usize {
        self.pivots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pivots.is_empty()
    }
}
