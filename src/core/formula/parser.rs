//! Formula parser
//!
//! Converts a sequence of tokens into an Abstract Syntax Tree (AST).
//! Uses recursive descent parsing with operator precedence.

use super::tokenizer::Token;

/// Abstract Syntax Tree node for formula expressions
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A numeric literal
    Number(f64),
    /// A criterion reference, resolved per (row, column) at evaluation time
    Criterion(String),
    /// Binary operation: left op right
    BinaryOp {
        op: char,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Unary operation: -expr or +expr
    UnaryOp { op: char, operand: Box<Expr> },
}

impl Expr {
    /// Criterion names referenced by this expression, in order of appearance
    pub fn criteria(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_criteria(&mut names);
        names
    }

    fn collect_criteria<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expr::Number(_) => {}
            Expr::Criterion(name) => {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
            Expr::BinaryOp { left, right, .. } => {
                left.collect_criteria(names);
                right.collect_criteria(names);
            }
            Expr::UnaryOp { operand, .. } => operand.collect_criteria(names),
        }
    }
}

/// Error during parsing
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Parse error at token {}: {}",
            self.position, self.message
        )
    }
}

impl std::error::Error for ParseError {}

/// Parser for formula tokens
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    /// Parse the tokens into an AST
    pub fn parse(mut self) -> Result<Expr, ParseError> {
        if self.tokens.is_empty() {
            return Err(ParseError::new("Empty expression", 0));
        }
        let expr = self.expression()?;

        if !self.is_at_end() {
            return Err(ParseError::new(
                format!("Unexpected token after expression: {:?}", self.peek()),
                self.position,
            ));
        }

        Ok(expr)
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<&Token> {
        if !self.is_at_end() {
            self.position += 1;
        }
        self.tokens.get(self.position - 1)
    }

    fn match_token(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume the current token if it is one of the given operators
    fn match_any_operator(&mut self, ops: &[char]) -> Option<char> {
        if let Some(Token::Operator(op)) = self.peek() {
            if ops.contains(op) {
                let op = *op;
                self.advance();
                return Some(op);
            }
        }
        None
    }

    /// Expression: term
    fn expression(&mut self) -> Result<Expr, ParseError> {
        self.term()
    }

    /// Term: factor (( "+" | "-" ) factor)*
    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.factor()?;

        while let Some(op) = self.match_any_operator(&['+', '-']) {
            let right = self.factor()?;
            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Factor: unary (( "*" | "/" ) unary)*
    fn factor(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.unary()?;

        while let Some(op) = self.match_any_operator(&['*', '/']) {
            let right = self.unary()?;
            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Unary: ( "-" | "+" ) unary | primary
    fn unary(&mut self) -> Result<Expr, ParseError> {
        if let Some(op) = self.match_any_operator(&['-', '+']) {
            let operand = self.unary()?;
            Ok(Expr::UnaryOp {
                op,
                operand: Box::new(operand),
            })
        } else {
            self.primary()
        }
    }

    /// Primary: NUMBER | IDENTIFIER | "(" expr ")"
    fn primary(&mut self) -> Result<Expr, ParseError> {
        let position = self.position;
        match self.advance().cloned() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Identifier(name)) => Ok(Expr::Criterion(name)),
            Some(Token::OpenParen) => {
                let expr = self.expression()?;
                if !self.match_token(&Token::CloseParen) {
                    return Err(ParseError::new(
                        "Expected ')' after expression",
                        self.position,
                    ));
                }
                Ok(expr)
            }
            Some(token) => Err(ParseError::new(
                format!("Unexpected token: {:?}", token),
                position,
            )),
            None => Err(ParseError::new("Unexpected end of formula", position)),
        }
    }
}

/// Convenience function to parse tokens
pub fn parse(tokens: Vec<Token>) -> Result<Expr, ParseError> {
    Parser::new(tokens).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::formula::tokenizer::tokenize;

    fn parse_formula(formula: &str) -> Result<Expr, ParseError> {
        let tokens = tokenize(formula).map_err(|e| ParseError::new(e.message, e.position))?;
        parse(tokens)
    }

    fn num(n: f64) -> Box<Expr> {
        Box::new(Expr::Number(n))
    }

    fn crit(name: &str) -> Box<Expr> {
        Box::new(Expr::Criterion(name.to_string()))
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_formula("42").unwrap(), Expr::Number(42.0));
    }

    #[test]
    fn test_parse_criterion() {
        assert_eq!(
            parse_formula("C_1").unwrap(),
            Expr::Criterion("C_1".to_string())
        );
    }

    #[test]
    fn test_parse_operator_precedence_mul_over_add() {
        assert_eq!(
            parse_formula("4 + 4 * 5").unwrap(),
            Expr::BinaryOp {
                op: '+',
                left: num(4.0),
                right: Box::new(Expr::BinaryOp {
                    op: '*',
                    left: num(4.0),
                    right: num(5.0),
                }),
            }
        );
    }

    #[test]
    fn test_parse_left_associative_subtraction() {
        // (10 - 4) - 3, not 10 - (4 - 3)
        assert_eq!(
            parse_formula("10 - 4 - 3").unwrap(),
            Expr::BinaryOp {
                op: '-',
                left: Box::new(Expr::BinaryOp {
                    op: '-',
                    left: num(10.0),
                    right: num(4.0),
                }),
                right: num(3.0),
            }
        );
    }

    #[test]
    fn test_parse_parentheses() {
        assert_eq!(
            parse_formula("(C1 + C2) / 2").unwrap(),
            Expr::BinaryOp {
                op: '/',
                left: Box::new(Expr::BinaryOp {
                    op: '+',
                    left: crit("C1"),
                    right: crit("C2"),
                }),
                right: num(2.0),
            }
        );
    }

    #[test]
    fn test_parse_unary_minus() {
        assert_eq!(
            parse_formula("10 * -C1").unwrap(),
            Expr::BinaryOp {
                op: '*',
                left: num(10.0),
                right: Box::new(Expr::UnaryOp {
                    op: '-',
                    operand: crit("C1"),
                }),
            }
        );
    }

    #[test]
    fn test_criteria_listed_once_in_order() {
        let expr = parse_formula("C2 / (C1 + C2) * C3").unwrap();
        assert_eq!(expr.criteria(), vec!["C2", "C1", "C3"]);
    }

    #[test]
    fn test_parse_error_empty() {
        assert!(parse_formula("").is_err());
    }

    #[test]
    fn test_parse_error_missing_close_paren() {
        let err = parse_formula("(C1 + C2").unwrap_err();
        assert!(err.message.contains("Expected ')'"));
    }

    #[test]
    fn test_parse_error_dangling_operator() {
        let err = parse_formula("C1 +").unwrap_err();
        assert!(err.message.contains("end of formula"));
    }

    #[test]
    fn test_parse_error_adjacent_operands() {
        let err = parse_formula("2 3").unwrap_err();
        assert!(err.message.contains("Unexpected token after expression"));
    }

    #[test]
    fn test_parse_error_double_slash() {
        assert!(parse_formula("C1 // 2").is_err());
    }
}
