//! Report formulas: small arithmetic expressions over criterion keys
//!
//! A formula such as `(C_2 + C_3) / C_1` is tokenized and parsed once, then
//! evaluated at every (row, column) coordinate of a report.

pub mod evaluator;
pub mod parser;
pub mod tokenizer;

pub use evaluator::{evaluate, CellContext, EvalError};
pub use parser::{Expr, ParseError};
pub use tokenizer::{Token, TokenizeError};

use crate::core::pivot::PivotSet;
use tracing::{debug, warn};

/// A formula that failed to tokenize or parse
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaError {
    Tokenize(TokenizeError),
    Parse(ParseError),
}

impl std::fmt::Display for FormulaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormulaError::Tokenize(e) => e.fmt(f),
            FormulaError::Parse(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for FormulaError {}

impl From<TokenizeError> for FormulaError {
    fn from(e: TokenizeError) -> Self {
        FormulaError::Tokenize(e)
    }
}

impl From<ParseError> for FormulaError {
    fn from(e: ParseError) -> Self {
        FormulaError::Parse(e)
    }
}

/// A parsed report formula
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFormula {
    source: String,
    expr: Expr,
}

impl CompiledFormula {
    pub fn compile(source: &str) -> Result<Self, FormulaError> {
        let tokens = tokenizer::tokenize(source)?;
        let expr = parser::parse(tokens)?;
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Criterion names referenced by the formula
    pub fn criteria(&self) -> Vec<&str> {
        self.expr.criteria()
    }

    /// Referenced names that match no pivot; they contribute zero everywhere
    pub fn unknown_criteria<'a>(&'a self, pivots: &PivotSet) -> Vec<&'a str> {
        self.criteria()
            .into_iter()
            .filter(|name| !pivots.contains(name))
            .collect()
    }

    /// Evaluate at one coordinate; None when the cell is undefined
    pub fn evaluate_at(&self, pivots: &PivotSet, row: &str, column: &str) -> Option<f64> {
        match evaluate(&self.expr, &CellContext::new(pivots, row, column)) {
            Ok(value) => Some(value),
            Err(err @ EvalError::Unresolved { .. }) => {
                warn!(
                    formula = %self.source,
                    row,
                    column,
                    "Error evaluating formula: {}",
                    err
                );
                None
            }
            Err(err) => {
                debug!(formula = %self.source, row, column, "{}", err);
                None
            }
        }
    }
}

/// Compile and evaluate `formula` at (row, column) in one go.
///
/// An unparsable formula is logged and yields None, like any other
/// undefined cell.
pub fn evaluate_formula(pivots: &PivotSet, formula: &str, row: &str, column: &str) -> Option<f64> {
    match CompiledFormula::compile(formula) {
        Ok(compiled) => compiled.evaluate_at(pivots, row, column),
        Err(err) => {
            warn!(formula, row, column, "Error evaluating formula: {}", err);
            None
        }
    }
}
