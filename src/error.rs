use thiserror::Error;

pub type PivotResult<T> = Result<T, PivotError>;

#[derive(Error, Debug)]
pub enum PivotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Import error: {0}")]
    Import(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Duplicates exist in the data: {count} rows share a (criterion_key, dimension_1, dimension_2) triple; first: {}", .sample.join(", "))]
    DuplicateRecords { count: usize, sample: Vec<String> },

    #[error("Criterion '{criterion}' does not share the row domain of '{reference}' (missing: [{}], extra: [{}])", .missing.join(", "), .extra.join(", "))]
    RowDomainMismatch {
        criterion: String,
        reference: String,
        missing: Vec<String>,
        extra: Vec<String>,
    },

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<rust_xlsxwriter::XlsxError> for PivotError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        PivotError::Export(err.to_string())
    }
}

/// Diagnostic for a formula problem, with an optional "did you mean" hint
#[derive(Debug, Clone)]
pub struct FormulaErrorContext {
    pub formula: String,
    pub location: String,
    pub error: String,
    pub suggestion: Option<String>,
    pub available_criteria: Vec<String>,
}

impl FormulaErrorContext {
    pub fn new(
        formula: impl Into<String>,
        location: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            formula: formula.into(),
            location: location.into(),
            error: error.into(),
            suggestion: None,
            available_criteria: Vec::new(),
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_available_criteria(mut self, criteria: Vec<String>) -> Self {
        self.available_criteria = criteria;
        self
    }

    /// Find the known criterion closest to `name`.
    ///
    /// Tries a case-insensitive exact match, then a prefix match, then a
    /// substring match.
    pub fn find_similar(&self, name: &str) -> Option<String> {
        let needle = name.to_lowercase();
        if needle.is_empty() {
            return None;
        }

        if let Some(hit) = self
            .available_criteria
            .iter()
            .find(|c| c.to_lowercase() == needle)
        {
            return Some(hit.clone());
        }

        if let Some(hit) = self
            .available_criteria
            .iter()
            .find(|c| c.to_lowercase().starts_with(&needle))
        {
            return Some(hit.clone());
        }

        self.available_criteria
            .iter()
            .find(|c| c.to_lowercase().contains(&needle))
            .cloned()
    }
}

impl std::fmt::Display for FormulaErrorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} in '{}' ({})", self.error, self.formula, self.location)?;
        if let Some(ref hint) = self.suggestion {
            write!(f, " - did you mean '{}'?", hint)?;
        }
        Ok(())
    }
}
