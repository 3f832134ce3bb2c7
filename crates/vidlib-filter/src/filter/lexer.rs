//! Lexer (tokenizer) for filter expressions.
//!
//! Positions are 0-based character columns, so diagnostics line up with the
//! text a user typed regardless of multi-byte characters.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use crate::types::Operator;

/// Error encountered during lexical analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexerError {
    /// What could not be tokenized.
    pub message: String,
    /// The column where the offending text starts.
    pub column: usize,
}

impl fmt::Display for LexerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at column {}", self.message, self.column)
    }
}

impl std::error::Error for LexerError {}

/// Result of tokenizing a filter expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexerResult {
    /// The tokens successfully read, with their columns.
    pub tokens: Vec<PositionedToken>,
    /// Any errors encountered.
    pub errors: Vec<LexerError>,
    /// The end-of-input column (the character count).
    pub end: usize,
}

/// A token with its column in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionedToken {
    /// The token.
    pub token: FilterToken,
    /// The column where the token starts.
    pub column: usize,
}

/// A token in a filter expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterToken {
    // ==================== Operands ====================
    /// An attribute name.
    Identifier(String),

    /// A quoted string, with doubled delimiters already collapsed.
    String(String),

    /// A decimal, octal (`017`) or hex (`0x1F`) integer.
    Integer(i64),

    /// A decimal number with one decimal point, kept as written.
    Double(String),

    /// The `TRUE` or `FALSE` keyword.
    Boolean(bool),

    /// The text between `#` delimiters, trimmed.
    TimeStamp(String),

    /// A bracketed tag list, brackets included, kept as written.
    TagList(String),

    // ==================== Operators ====================
    /// A comparison or substring operator, `~` variants already resolved.
    Comparison(Operator),

    /// The `AND` keyword.
    And,

    /// The `OR` keyword.
    Or,

    /// The `NOT` keyword.
    Not,

    /// Opening parenthesis `(`.
    OpenParen,

    /// Closing parenthesis `)`.
    CloseParen,
}

impl fmt::Display for FilterToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterToken::Identifier(name) => f.write_str(name),
            FilterToken::String(s) => write!(f, "\"{}\"", s.replace('"', "\"\"")),
            FilterToken::Integer(i) => write!(f, "{i}"),
            FilterToken::Double(raw) | FilterToken::TagList(raw) => f.write_str(raw),
            FilterToken::TimeStamp(text) => write!(f, "#{text}#"),
            FilterToken::Boolean(true) => f.write_str("TRUE"),
            FilterToken::Boolean(false) => f.write_str("FALSE"),
            FilterToken::Comparison(op) => write!(f, "{op}"),
            FilterToken::And => f.write_str("AND"),
            FilterToken::Or => f.write_str("OR"),
            FilterToken::Not => f.write_str("NOT"),
            FilterToken::OpenParen => f.write_str("("),
            FilterToken::CloseParen => f.write_str(")"),
        }
    }
}

/// Lexer for tokenizing filter expressions.
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    /// Current character column.
    column: usize,
    /// Errors encountered during tokenization.
    errors: Vec<LexerError>,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input string.
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            column: 0,
            errors: Vec::new(),
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn next_char(&mut self) -> Option<char> {
        let c = self.chars.next();
        if c.is_some() {
            self.column += 1;
        }
        c
    }

    /// Consumes the next character if it equals `expected`.
    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.next_char();
            true
        } else {
            false
        }
    }

    fn error(&mut self, message: impl Into<String>, column: usize) {
        self.errors.push(LexerError {
            message: message.into(),
            column,
        });
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.next_char();
        }
    }

    /// Reads characters while `accept` holds.
    fn read_while(&mut self, accept: impl Fn(char) -> bool) -> String {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if !accept(c) {
                break;
            }
            text.push(c);
            self.next_char();
        }
        text
    }

    /// Reads a quoted string. A doubled delimiter stands for one delimiter.
    fn read_quoted_string(&mut self, quote: char, start: usize) -> Option<FilterToken> {
        self.next_char();
        let mut text = String::new();
        loop {
            match self.next_char() {
                Some(c) if c == quote => {
                    if self.eat(quote) {
                        text.push(quote);
                    } else {
                        return Some(FilterToken::String(text));
                    }
                }
                Some(c) => text.push(c),
                None => {
                    self.error("unterminated string literal", start);
                    return None;
                }
            }
        }
    }

    /// Reads a `#`-delimited timestamp.
    fn read_timestamp(&mut self, start: usize) -> Option<FilterToken> {
        self.next_char();
        let text = self.read_while(|c| c != '#');
        if !self.eat('#') {
            self.error("unterminated timestamp literal", start);
            return None;
        }
        Some(FilterToken::TimeStamp(text.trim().to_string()))
    }

    /// Reads a bracketed tag list up to the first closing bracket outside a
    /// quoted item. An item is quoted when it starts with `"`.
    fn read_tag_list(&mut self, start: usize) -> Option<FilterToken> {
        let mut raw = String::new();
        let mut quoted = false;
        let mut item_start = false;
        while let Some(c) = self.next_char() {
            raw.push(c);
            if quoted {
                if c == '"' {
                    if self.eat('"') {
                        raw.push('"');
                    } else {
                        quoted = false;
                    }
                }
                continue;
            }
            match c {
                ']' => return Some(FilterToken::TagList(raw)),
                '[' | ',' => item_start = true,
                '"' if item_start => {
                    quoted = true;
                    item_start = false;
                }
                c if c.is_whitespace() => {}
                _ => item_start = false,
            }
        }
        self.error("unterminated tag list", start);
        None
    }

    /// Reads an integer or double, with an optional leading minus.
    fn read_number(&mut self, start: usize) -> Option<FilterToken> {
        let negative = self.eat('-');
        let body = self.read_while(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_');
        let sign = if negative { "-" } else { "" };
        let text = format!("{sign}{body}");

        if body.contains('.') {
            let valid = body.matches('.').count() == 1
                && body.chars().any(|c| c.is_ascii_digit())
                && body.chars().all(|c| c == '.' || c.is_ascii_digit());
            if valid {
                return Some(FilterToken::Double(text));
            }
            self.error(format!("invalid number '{text}'"), start);
            return None;
        }

        let (radix, digits) = if let Some(hex) = body
            .strip_prefix("0x")
            .or_else(|| body.strip_prefix("0X"))
        {
            (16, hex)
        } else if body.len() > 1 && body.starts_with('0') {
            (8, &body[1..])
        } else {
            (10, body.as_str())
        };

        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            self.error(format!("invalid number '{text}'"), start);
            return None;
        }
        match i64::from_str_radix(&format!("{sign}{digits}"), radix) {
            Ok(value) => Some(FilterToken::Integer(value)),
            Err(_) => {
                self.error(format!("integer '{text}' is out of range"), start);
                None
            }
        }
    }

    /// Reads a comparison operator, optionally prefixed with `~`.
    fn read_comparison(&mut self, start: usize) -> Option<FilterToken> {
        let ignore_case = self.eat('~');
        let base = match self.next_char() {
            Some('=') => {
                self.eat('=');
                Operator::Equals
            }
            Some('!') if self.eat('=') => Operator::DoesNotEqual,
            Some('<') => {
                if self.eat('=') {
                    Operator::LessThanOrEqual
                } else if self.eat('>') {
                    Operator::DoesNotEqual
                } else {
                    Operator::LessThan
                }
            }
            Some('>') => {
                if self.eat('=') {
                    Operator::GreaterThanOrEqual
                } else {
                    Operator::GreaterThan
                }
            }
            Some('$') => Operator::IsASubstringOf,
            Some(c) if ignore_case => {
                self.error(format!("'~' must precede a comparison, found '{c}'"), start);
                return None;
            }
            Some(c) => {
                self.error(format!("unexpected character '{c}'"), start);
                return None;
            }
            None => {
                self.error("'~' must precede a comparison", start);
                return None;
            }
        };
        let op = if ignore_case {
            base.ignoring_case().unwrap_or(base)
        } else {
            base
        };
        Some(FilterToken::Comparison(op))
    }

    /// Maps a word onto a keyword token, or an identifier.
    fn keyword_or_identifier(word: String) -> FilterToken {
        match word.to_ascii_uppercase().as_str() {
            "AND" => FilterToken::And,
            "OR" => FilterToken::Or,
            "NOT" => FilterToken::Not,
            "TRUE" => FilterToken::Boolean(true),
            "FALSE" => FilterToken::Boolean(false),
            _ => FilterToken::Identifier(word),
        }
    }

    /// Returns the next token with its column, or None at end of input.
    pub fn next_token(&mut self) -> Option<PositionedToken> {
        loop {
            self.skip_whitespace();
            let c = self.peek()?;
            let start = self.column;

            let token = match c {
                '(' => {
                    self.next_char();
                    Some(FilterToken::OpenParen)
                }
                ')' => {
                    self.next_char();
                    Some(FilterToken::CloseParen)
                }
                '"' | '\'' => self.read_quoted_string(c, start),
                '[' => self.read_tag_list(start),
                '#' => self.read_timestamp(start),
                '=' | '!' | '<' | '>' | '$' | '~' => self.read_comparison(start),
                '-' | '.' | '0'..='9' => self.read_number(start),
                _ if c.is_alphabetic() || c == '_' => {
                    let word = self.read_while(|c| c.is_alphanumeric() || c == '_');
                    Some(Self::keyword_or_identifier(word))
                }
                _ => {
                    self.next_char();
                    self.error(format!("unexpected character '{c}'"), start);
                    None
                }
            };

            // On error keep scanning so every problem is reported.
            if let Some(token) = token {
                return Some(PositionedToken {
                    token,
                    column: start,
                });
            }
        }
    }

    /// Collects all tokens without columns.
    #[cfg(test)]
    pub fn tokenize(self) -> Vec<FilterToken> {
        self.tokenize_with_errors()
            .tokens
            .into_iter()
            .map(|pt| pt.token)
            .collect()
    }

    /// Collects all tokens and any errors encountered.
    pub fn tokenize_with_errors(mut self) -> LexerResult {
        let mut tokens = Vec::new();
        while let Some(positioned_token) = self.next_token() {
            tokens.push(positioned_token);
        }
        LexerResult {
            tokens,
            errors: self.errors,
            end: self.column,
        }
    }
}
