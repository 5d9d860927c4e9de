//! Formula tokenizer
//!
//! Splits a report formula like "(C_1 + C_2) / 2,5" into numbers, the
//! operators `+ - * / ( )` and identifiers (criterion keys).

use std::iter::Peekable;
use std::str::Chars;

/// A token in a formula expression
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A numeric literal (e.g., 123, 45.67, 4,5, 1.5e10)
    Number(f64),
    /// An identifier: letters, digits, '_' and '.', not starting with a digit
    Identifier(String),
    /// Arithmetic operators: + - * /
    Operator(char),
    /// Opening parenthesis
    OpenParen,
    /// Closing parenthesis
    CloseParen,
}

/// Error during tokenization
#[derive(Debug, Clone, PartialEq)]
pub struct TokenizeError {
    pub message: String,
    pub position: usize,
}

impl TokenizeError {
    fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

impl std::fmt::Display for TokenizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Tokenize error at position {}: {}",
            self.position, self.message
        )
    }
}

impl std::error::Error for TokenizeError {}

/// Tokenizer for formula expressions
pub struct Tokenizer<'a> {
    chars: Peekable<Chars<'a>>,
    position: usize,
}

impl<'a> Tokenizer<'a> {
    /// Create a new tokenizer for the given formula string
    pub fn new(formula: &'a str) -> Self {
        // Spreadsheet users sometimes paste formulas with a leading '='
        let body = formula.trim_start();
        let body = body.strip_prefix('=').unwrap_or(body);
        // positions count from the start of the text as written
        let skipped = formula.chars().count() - body.chars().count();
        Self {
            chars: body.chars().peekable(),
            position: skipped,
        }
    }

    /// Tokenize the entire formula into a vector of tokens
    pub fn tokenize(mut self) -> Result<Vec<Token>, TokenizeError> {
        let mut tokens = Vec::new();

        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }

        Ok(tokens)
    }

    /// Get the next token, or None if at end of input
    fn next_token(&mut self) -> Result<Option<Token>, TokenizeError> {
        self.skip_whitespace();

        let Some(c) = self.peek() else {
            return Ok(None);
        };

        let token = match c {
            '(' => {
                self.advance();
                Token::OpenParen
            }
            ')' => {
                self.advance();
                Token::CloseParen
            }
            '+' | '-' | '*' | '/' => {
                self.advance();
                Token::Operator(c)
            }
            c if c.is_ascii_digit() || c == '.' => self.read_number()?,
            c if c.is_alphabetic() || c == '_' => self.read_identifier(),
            c => {
                return Err(TokenizeError::new(
                    format!("Unexpected character: '{}'", c),
                    self.position,
                ));
            }
        };

        Ok(Some(token))
    }

    /// Peek at the next character without consuming it
    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    /// Peek one character past the next one
    fn peek_second(&self) -> Option<char> {
        let mut ahead = self.chars.clone();
        ahead.next();
        ahead.next()
    }

    /// Advance to the next character
    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next();
        if c.is_some() {
            self.position += 1;
        }
        c
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Append a run of ASCII digits to `buf`
    fn read_digits(&mut self, buf: &mut String) {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                buf.push(c);
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Read a number (integer, decimal with '.' or ',', or scientific notation)
    fn read_number(&mut self) -> Result<Token, TokenizeError> {
        let start_pos = self.position;
        let mut num_str = String::new();

        self.read_digits(&mut num_str);

        // Decimal part; a comma only counts when a digit follows it
        match self.peek() {
            Some('.') => {
                self.advance();
                num_str.push('.');
                self.read_digits(&mut num_str);
            }
            Some(',') if self.peek_second().is_some_and(|c| c.is_ascii_digit()) => {
                self.advance();
                num_str.push('.');
                self.read_digits(&mut num_str);
            }
            _ => {}
        }

        // Exponent part (e.g., 1.5e10, 2E-5)
        if matches!(self.peek(), Some('e') | Some('E')) {
            num_str.push('e');
            self.advance();
            if let Some(sign @ ('+' | '-')) = self.peek() {
                num_str.push(sign);
                self.advance();
            }
            self.read_digits(&mut num_str);
        }

        num_str
            .parse::<f64>()
            .map(Token::Number)
            .map_err(|_| TokenizeError::new(format!("Invalid number: {}", num_str), start_pos))
    }

    /// Read an identifier (criterion key)
    fn read_identifier(&mut self) -> Token {
        let mut ident = String::new();

        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '.' {
                ident.push(c);
                self.advance();
            } else {
                break;
            }
        }

        Token::Identifier(ident)
    }
}

/// Convenience function to tokenize a formula string
pub fn tokenize(formula: &str) -> Result<Vec<Token>, TokenizeError> {
    Tokenizer::new(formula).tokenize()
}
