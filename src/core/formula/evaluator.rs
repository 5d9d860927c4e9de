//! Formula evaluator
//!
//! Evaluates a parsed formula at one (row, column) coordinate of a
//! [`PivotSet`]. Criterion references are looked up in the pivots:
//! a structurally absent criterion, row or column contributes zero, while a
//! present-but-empty cell makes the whole result undefined.

use super::parser::Expr;
use crate::core::pivot::PivotSet;
use crate::types::CellValue;

/// Coordinate a formula is evaluated at
#[derive(Debug, Clone, Copy)]
pub struct CellContext<'a> {
    pub pivots: &'a PivotSet,
    pub row: &'a str,
    pub column: &'a str,
}

impl<'a> CellContext<'a> {
    pub fn new(pivots: &'a PivotSet, row: &'a str, column: &'a str) -> Self {
        Self {
            pivots,
            row,
            column,
        }
    }
}

/// Why a cell has no value
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// The criterion has this coordinate but no value is stored there
    EmptyCell { criterion: String },
    /// An identifier that cannot stand for a number
    Unresolved { identifier: String },
    DivisionByZero,
    NotANumber,
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvalError::EmptyCell { criterion } => {
                write!(f, "Eval error: criterion '{}' has no value here", criterion)
            }
            EvalError::Unresolved { identifier } => {
                write!(f, "Eval error: name '{}' is not defined", identifier)
            }
            EvalError::DivisionByZero => write!(f, "Eval error: division by zero"),
            EvalError::NotANumber => write!(f, "Eval error: result is not a number"),
        }
    }
}

impl std::error::Error for EvalError {}

/// Evaluate an expression at the given coordinate
pub fn evaluate(expr: &Expr, ctx: &CellContext<'_>) -> Result<f64, EvalError> {
    let value = evaluate_expr(expr, ctx)?;
    if value.is_nan() {
        Err(EvalError::NotANumber)
    } else {
        Ok(value)
    }
}

fn evaluate_expr(expr: &Expr, ctx: &CellContext<'_>) -> Result<f64, EvalError> {
    match expr {
        Expr::Number(n) => Ok(*n),

        Expr::Criterion(name) => resolve_criterion(name, ctx),

        Expr::BinaryOp { op, left, right } => {
            let l = evaluate_expr(left, ctx)?;
            let r = evaluate_expr(right, ctx)?;
            evaluate_binary_op(*op, l, r)
        }

        Expr::UnaryOp { op, operand } => {
            let v = evaluate_expr(operand, ctx)?;
            match op {
                '-' => Ok(-v),
                _ => Ok(v),
            }
        }
    }
}

/// Look up a criterion at the context coordinate
fn resolve_criterion(name: &str, ctx: &CellContext<'_>) -> Result<f64, EvalError> {
    // Only names starting with a letter are criterion keys
    if !name.chars().next().is_some_and(char::is_alphabetic) {
        return Err(EvalError::Unresolved {
            identifier: name.to_string(),
        });
    }

    let Some(pivot) = ctx.pivots.get(name) else {
        return Ok(0.0);
    };

    match pivot.get(ctx.row, ctx.column) {
        None => Ok(0.0),
        Some(CellValue::Empty) => Err(EvalError::EmptyCell {
            criterion: name.to_string(),
        }),
        Some(CellValue::Number(n)) if n.is_nan() => Err(EvalError::EmptyCell {
            criterion: name.to_string(),
        }),
        Some(value) => value.as_number().ok_or_else(|| EvalError::Unresolved {
            identifier: match value {
                CellValue::Text(s) => s.clone(),
                _ => name.to_string(),
            },
        }),
    }
}

fn evaluate_binary_op(op: char, l: f64, r: f64) -> Result<f64, EvalError> {
    match op {
        '+' => Ok(l + r),
        '-' => Ok(l - r),
        '*' => Ok(l * r),
        '/' => {
            if r == 0.0 {
                Err(EvalError::DivisionByZero)
            } else {
                Ok(l / r)
            }
        }
        _ => Err(EvalError::Unresolved {
            identifier: op.to_string(),
        }),
    }
}
