use crate::core::pivot::check_unique;
use crate::error::{PivotError, PivotResult};
use crate::excel::WorkbookReader;
use crate::types::Dataset;
use std::path::Path;
use tracing::info;

/// Load a dataset, choosing the format from the file extension.
///
/// Supported inputs:
/// - `.xlsx`: a project workbook with `CriterionValues`, `PivotInfos` and
///   `ResourceStrings` sheets
/// - `.yaml` / `.yml`: a document with `criteria`, `reports` and `resources`
///
/// Duplicate (criterion, row, column) triples are rejected here, before any
/// report is built.
///
/// # Example
/// ```no_run
/// use xlpivot::parser::load_dataset;
/// use std::path::Path;
///
/// let dataset = load_dataset(Path::new("criteria.yaml"))?;
/// println!("Records: {}", dataset.criteria.len());
/// # Ok::<(), xlpivot::error::PivotError>(())
/// ```
pub fn load_dataset(path: &Path) -> PivotResult<Dataset> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let dataset = match extension.as_str() {
        "xlsx" | "xlsm" => WorkbookReader::new(path).read()?,
        "yaml" | "yml" => {
            let content = std::fs::read_to_string(path).map_err(|e| {
                PivotError::Import(format!("Failed to read '{}': {}", path.display(), e))
            })?;
            parse_dataset(&content)?
        }
        other => {
            return Err(PivotError::Import(format!(
                "Unsupported data file '{}': expected .xlsx, .yaml or .yml (got '{}')",
                path.display(),
                other
            )))
        }
    };

    check_unique(&dataset.criteria)?;
    info!(
        path = %path.display(),
        records = dataset.criteria.len(),
        reports = dataset.reports.len(),
        resources = dataset.resources.len(),
        "Loaded dataset"
    );
    Ok(dataset)
}

/// Parse a YAML dataset document
pub fn parse_dataset(content: &str) -> PivotResult<Dataset> {
    let mut dataset: Dataset = serde_yaml::from_str(content)?;
    for record in &mut dataset.criteria {
        record.criterion_key = record.criterion_key.trim().to_string();
        record.row_key = record.row_key.trim().to_string();
        record.column_key = record.column_key.trim().to_string();
    }
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CellValue, CriterionRecord};
    use std::io::Write;
    use tempfile::Builder;

    const SAMPLE: &str = r#"
criteria:
  - { criterion_key: C1, dimension_1: " r1 ", dimension_2: 2021, numeric_value: 10 }
  - { criterion_key: C1, dimension_1: r1, dimension_2: 2022, value: "7,5" }
  - { criterion_key: C2, dimension_1: r1, dimension_2: 2021, value: ~ }
reports:
  - { query_name: q1, formula: "C1 + C2", draw_total: true }
  - { query_name: q2 }
resources:
  - { Ref: q1_title, EN: Totals, DE: Summen }
"#;

    #[test]
    fn test_parse_dataset() {
        let dataset = parse_dataset(SAMPLE).unwrap();
        assert_eq!(dataset.criteria.len(), 3);
        assert_eq!(dataset.criteria[0], CriterionRecord::new("C1", "r1", "2021", 10.0));
        assert_eq!(dataset.criteria[1].value, CellValue::Text("7,5".to_string()));
        assert!(dataset.criteria[2].value.is_empty());
        assert!(dataset.reports[0].show_total);
        assert_eq!(dataset.reports[1].active_formula(), None);
        assert_eq!(dataset.resources[0].de.as_deref(), Some("Summen"));
    }

    #[test]
    fn test_load_dataset_rejects_duplicates() {
        let mut file = Builder::new().suffix(".yaml").tempfile().unwrap();
        write!(
            file,
            "criteria:\n  - {{ criterion_key: C1, dimension_1: r1, dimension_2: c1, value: 1 }}\n  - {{ criterion_key: C1, dimension_1: r1, dimension_2: c1, value: 2 }}\n"
        )
        .unwrap();

        let err = load_dataset(file.path()).unwrap_err();
        assert!(matches!(err, PivotError::DuplicateRecords { count: 2, .. }));
    }

    #[test]
    fn test_load_dataset_unknown_extension() {
        let file = Builder::new().suffix(".csv").tempfile().unwrap();
        assert!(matches!(
            load_dataset(file.path()),
            Err(PivotError::Import(_))
        ));
    }
}
