use serde::{Deserialize, Serialize};

//==============================================================================
// Cell values
//==============================================================================

/// Value carried by a criterion observation and by each pivot cell
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// A numeric observation
    Number(f64),
    /// A textual observation (numeric text still takes part in formulas)
    Text(String),
    /// Missing value; poisons any formula that reads it
    #[default]
    Empty,
}

impl CellValue {
    /// Numeric view of the value, if it has one
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => s.trim().replace(',', ".").parse().ok(),
            CellValue::Empty => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

//==============================================================================
// Source tables
//==============================================================================

/// One observation: the value of a criterion at a (row, column) coordinate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionRecord {
    #[serde(deserialize_with = "scalar_key")]
    pub criterion_key: String,
    /// Grouping dimension for rows (e.g. an entity name)
    #[serde(rename = "dimension_1", alias = "row_key", deserialize_with = "scalar_key")]
    pub row_key: String,
    /// Grouping dimension for columns (e.g. a year or period)
    #[serde(rename = "dimension_2", alias = "column_key", deserialize_with = "scalar_key")]
    pub column_key: String,
    #[serde(default, alias = "numeric_value")]
    pub value: CellValue,
}

impl CriterionRecord {
    pub fn new(
        criterion_key: impl Into<String>,
        row_key: impl Into<String>,
        column_key: impl Into<String>,
        value: impl Into<CellValue>,
    ) -> Self {
        Self {
            criterion_key: criterion_key.into(),
            row_key: row_key.into(),
            column_key: column_key.into(),
            value: value.into(),
        }
    }

    /// The (criterion, row, column) triple that must be unique in a dataset
    pub fn triple(&self) -> (&str, &str, &str) {
        (&self.criterion_key, &self.row_key, &self.column_key)
    }
}

/// Render a number used as a key: integral values lose their decimal part
pub fn format_key_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Accept a key written as a string, a number or a boolean
fn scalar_key<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ScalarKey {
        Int(i64),
        Float(f64),
        Bool(bool),
        Text(String),
    }

    Ok(match ScalarKey::deserialize(deserializer)? {
        ScalarKey::Int(i) => i.to_string(),
        ScalarKey::Float(f) => format_key_number(f),
        ScalarKey::Bool(b) => b.to_string(),
        ScalarKey::Text(s) => s,
    })
}

/// Configuration of one derived report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSpec {
    pub query_name: String,
    #[serde(default)]
    pub formula: Option<String>,
    #[serde(default = "default_true", alias = "draw_rows")]
    pub show_rows: bool,
    #[serde(default, alias = "draw_total")]
    pub show_total: bool,
    #[serde(default, alias = "draw_delta")]
    pub show_delta: bool,
    #[serde(default)]
    pub show_init: bool,
}

fn default_true() -> bool {
    true
}

impl ReportSpec {
    pub fn new(query_name: impl Into<String>, formula: impl Into<String>) -> Self {
        Self {
            query_name: query_name.into(),
            formula: Some(formula.into()),
            show_rows: true,
            show_total: false,
            show_delta: false,
            show_init: false,
        }
    }

    /// The formula, or None when it is absent or blank (the report is skipped)
    pub fn active_formula(&self) -> Option<&str> {
        self.formula
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
    }

    pub fn title_key(&self) -> String {
        format!("{}_title", self.query_name)
    }

    pub fn sheet_prefix_key(&self) -> String {
        format!("{}_sheet_prefix", self.query_name)
    }

    pub fn x_label_key(&self) -> String {
        format!("{}_x_label", self.query_name)
    }

    pub fn y_label_key(&self) -> String {
        format!("{}_y_label", self.query_name)
    }
}

/// One row of the ResourceStrings table
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceString {
    #[serde(rename = "Ref", alias = "ref")]
    pub reference: String,
    #[serde(rename = "EN", alias = "en", default)]
    pub en: Option<String>,
    #[serde(rename = "DE", alias = "de", default)]
    pub de: Option<String>,
    #[serde(rename = "FR", alias = "fr", default)]
    pub fr: Option<String>,
    #[serde(rename = "IT", alias = "it", default)]
    pub it: Option<String>,
}

//==============================================================================
// Dataset
//==============================================================================

/// Everything one export run consumes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub criteria: Vec<CriterionRecord>,
    #[serde(default)]
    pub reports: Vec<ReportSpec>,
    #[serde(default)]
    pub resources: Vec<ResourceString>,
}
