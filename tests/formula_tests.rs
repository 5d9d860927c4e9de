//! Formula tokenizer, parser and evaluator tests through the public API

use xlpivot::core::formula::tokenizer::{tokenize, Token};
use xlpivot::core::formula::{evaluate_formula, CompiledFormula, FormulaError};
use xlpivot::core::PivotSet;
use xlpivot::types::{CellValue, CriterionRecord};

fn pivots() -> PivotSet {
    PivotSet::build(&[
        CriterionRecord::new("C_1", "north", "2021", 100.0),
        CriterionRecord::new("C_1", "north", "2022", 110.0),
        CriterionRecord::new("C_1", "south", "2021", 50.0),
        CriterionRecord::new("C_2", "north", "2021", 10.0),
        CriterionRecord::new("C_2", "north", "2022", 0.0),
        CriterionRecord::new("C_2", "south", "2021", CellValue::Empty),
        CriterionRecord::new("C_3", "north", "2021", "2,5"),
        CriterionRecord::new("C_3", "south", "2021", "-"),
    ])
    .unwrap()
}

// ═══════════════════════════════════════════════════════════════════════════
// TOKENIZER
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_tokenize_leading_equals_is_ignored() {
    assert_eq!(tokenize("=C_1").unwrap(), tokenize("C_1").unwrap());
}

#[test]
fn test_tokenize_decimal_comma() {
    assert_eq!(
        tokenize("C_1 * 0,5").unwrap(),
        vec![
            Token::Identifier("C_1".to_string()),
            Token::Operator('*'),
            Token::Number(0.5),
        ]
    );
}

#[test]
fn test_tokenize_rejects_unsupported_operators() {
    for formula in ["C_1 ^ 2", "C_1 % 2", "C_1 & C_2", "C_1 ; C_2"] {
        assert!(tokenize(formula).is_err(), "{} should not tokenize", formula);
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// COMPILATION
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_compile_lists_criteria_once() {
    let f = CompiledFormula::compile("(C_2 + C_3) / C_1 - C_2").unwrap();
    assert_eq!(f.criteria(), vec!["C_2", "C_3", "C_1"]);
}

#[test]
fn test_compile_errors_are_reported() {
    assert!(matches!(
        CompiledFormula::compile("C_1 +"),
        Err(FormulaError::Parse(_))
    ));
    assert!(matches!(
        CompiledFormula::compile("C_1 // 2"),
        Err(FormulaError::Parse(_))
    ));
    assert!(matches!(
        CompiledFormula::compile("C_1 ^ 2"),
        Err(FormulaError::Tokenize(_))
    ));
    let err = CompiledFormula::compile("(C_1").unwrap_err();
    assert!(err.to_string().contains("')'"));
}

// ═══════════════════════════════════════════════════════════════════════════
// EVALUATION
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_arithmetic_over_criteria() {
    let set = pivots();
    assert_eq!(evaluate_formula(&set, "C_1 + C_2", "north", "2021"), Some(110.0));
    assert_eq!(evaluate_formula(&set, "C_1 - 2 * C_2", "north", "2021"), Some(80.0));
    assert_eq!(evaluate_formula(&set, "-C_1 / 4", "north", "2022"), Some(-27.5));
}

#[test]
fn test_empty_value_makes_cell_undefined() {
    let set = pivots();
    assert_eq!(evaluate_formula(&set, "C_1 + C_2", "south", "2021"), None);
    // south has no 2022 observation for C_1: a gap, not a zero
    assert_eq!(evaluate_formula(&set, "C_1 * 0", "south", "2022"), None);
}

#[test]
fn test_absent_coordinates_contribute_zero() {
    let set = pivots();
    assert_eq!(evaluate_formula(&set, "C_1 + C_9", "north", "2021"), Some(100.0));
    assert_eq!(evaluate_formula(&set, "C_1 + 1", "east", "2021"), Some(1.0));
    assert_eq!(evaluate_formula(&set, "C_1 + 1", "north", "2030"), Some(1.0));
}

#[test]
fn test_division_by_zero_is_undefined() {
    let set = pivots();
    assert_eq!(evaluate_formula(&set, "C_1 / C_2", "north", "2022"), None);
    assert_eq!(evaluate_formula(&set, "C_1 / C_2", "north", "2021"), Some(10.0));
}

#[test]
fn test_text_values() {
    let set = pivots();
    assert_eq!(evaluate_formula(&set, "C_3 * 2", "north", "2021"), Some(5.0));
    assert_eq!(evaluate_formula(&set, "C_3 * 2", "south", "2021"), None);
}

#[test]
fn test_syntax_error_is_undefined_everywhere() {
    let set = pivots();
    for row in ["north", "south"] {
        assert_eq!(evaluate_formula(&set, "C_1 ^ 2", row, "2021"), None);
    }
}
