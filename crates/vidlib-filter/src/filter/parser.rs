//! Recursive descent parser for filter expressions.

use super::ast::Expr;
use super::factory::ExprFactory;
use super::lexer::{FilterToken, Lexer, PositionedToken};
use crate::error::{FilterError, ParseDiagnostic};
use crate::types::DomainType;

/// Parses filter text into a type-checked tree.
///
/// Every node is built through `factory`, so a parsed tree is checked exactly
/// like a hand-built one.
///
/// # Grammar
///
/// ```text
/// expression ::= or_expr
/// or_expr    ::= and_expr ("OR" and_expr)*
/// and_expr   ::= not_expr ("AND" not_expr)*
/// not_expr   ::= "NOT" not_expr | comparison
/// comparison ::= operand (["~"] compare_op operand)?
/// operand    ::= "(" expression ")" | literal | identifier
/// compare_op ::= "=" | "==" | "!=" | "<>" | "<" | "<=" | ">" | ">=" | "$"
/// literal    ::= string | integer | double | "TRUE" | "FALSE" | timestamp | tag_list
/// timestamp  ::= "#" date_text "#"
/// ```
///
/// `a $ b` reads "a contains b".
///
/// # Example
///
/// ```
/// use vidlib_filter::{parse_filter_expression, DomainType, ExprFactory, Schema};
///
/// let schema = Schema::new("handle")
///     .with_field("handle", DomainType::Integer)
///     .with_field("age", DomainType::Integer);
/// let factory = ExprFactory::new(schema, Vec::<String>::new()).unwrap();
///
/// assert!(parse_filter_expression("age > 18", &factory).is_ok());
///
/// let diag = parse_filter_expression("age >", &factory).unwrap_err();
/// assert_eq!(diag.column, 5);
/// ```
///
/// # Errors
///
/// Returns a [`ParseDiagnostic`] positioned at the offending token. Schema,
/// type and literal errors raised by the factory are reported at the
/// identifier or operator that triggered them.
pub fn parse_filter_expression(text: &str, factory: &ExprFactory) -> Result<Expr, ParseDiagnostic> {
    FilterParser::new(text, factory)?.parse()
}

struct FilterParser<'a> {
    text: &'a str,
    factory: &'a ExprFactory,
    tokens: Vec<PositionedToken>,
    position: usize,
    /// End-of-input column.
    end: usize,
}

impl<'a> FilterParser<'a> {
    fn new(text: &'a str, factory: &'a ExprFactory) -> Result<Self, ParseDiagnostic> {
        if text.trim().is_empty() {
            return Err(ParseDiagnostic::grammar(text, 0, "filter expression is empty"));
        }

        let result = Lexer::new(text).tokenize_with_errors();
        if let Some(error) = result.errors.into_iter().next() {
            return Err(ParseDiagnostic::grammar(text, error.column, error.message));
        }

        Ok(Self {
            text,
            factory,
            tokens: result.tokens,
            position: 0,
            end: result.end,
        })
    }

    fn parse(mut self) -> Result<Expr, ParseDiagnostic> {
        let expr = self.parse_or_expr()?;

        // Check that we consumed all tokens
        if let Some(remaining) = self.peek() {
            return Err(self.unexpected(remaining));
        }

        Ok(expr)
    }

    /// Returns the current token without consuming it.
    fn peek(&self) -> Option<&PositionedToken> {
        self.tokens.get(self.position)
    }

    /// Consumes and returns the current token.
    fn advance(&mut self) -> Option<PositionedToken> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    /// Checks if the current token matches the expected token.
    fn check(&self, expected: &FilterToken) -> bool {
        self.peek().is_some_and(|pt| &pt.token == expected)
    }

    fn grammar(&self, column: usize, message: impl Into<String>) -> ParseDiagnostic {
        ParseDiagnostic::grammar(self.text, column, message)
    }

    fn unexpected(&self, token: &PositionedToken) -> ParseDiagnostic {
        self.grammar(token.column, format!("unexpected token '{}'", token.token))
    }

    fn at(&self, column: usize) -> impl Fn(FilterError) -> ParseDiagnostic + '_ {
        move |error| ParseDiagnostic::from_error(self.text, column, &error)
    }

    /// Parses OR expressions: `and_expr ("OR" and_expr)*`
    fn parse_or_expr(&mut self) -> Result<Expr, ParseDiagnostic> {
        let mut left = self.parse_and_expr()?;

        while self.check(&FilterToken::Or) {
            let column = self.position_column();
            self.advance();
            let right = self.parse_and_expr()?;
            left = self.factory.or(left, right).map_err(self.at(column))?;
        }

        Ok(left)
    }

    /// Parses AND expressions: `not_expr ("AND" not_expr)*`
    fn parse_and_expr(&mut self) -> Result<Expr, ParseDiagnostic> {
        let mut left = self.parse_not_expr()?;

        while self.check(&FilterToken::And) {
            let column = self.position_column();
            self.advance();
            let right = self.parse_not_expr()?;
            left = self.factory.and(left, right).map_err(self.at(column))?;
        }

        Ok(left)
    }

    /// Parses NOT expressions: `"NOT" not_expr | comparison`
    fn parse_not_expr(&mut self) -> Result<Expr, ParseDiagnostic> {
        if self.check(&FilterToken::Not) {
            let column = self.position_column();
            self.advance();
            let operand = self.parse_not_expr()?;
            return self.factory.not(operand).map_err(self.at(column));
        }

        self.parse_comparison()
    }

    /// Parses comparisons: `operand (compare_op operand)?`
    fn parse_comparison(&mut self) -> Result<Expr, ParseDiagnostic> {
        let left = self.parse_operand()?;

        let Some(PositionedToken {
            token: FilterToken::Comparison(operator),
            column,
        }) = self.peek().cloned()
        else {
            return Ok(left);
        };
        self.advance();
        let right = self.parse_operand()?;

        // `haystack $ needle` is stored as `needle IsASubstringOf haystack`.
        let built = if operator.is_substring() {
            self.factory.binary(right, operator, left)
        } else {
            self.factory.binary(left, operator, right)
        };
        built.map_err(self.at(column))
    }

    /// Parses operands: `"(" expression ")" | literal | identifier`
    fn parse_operand(&mut self) -> Result<Expr, ParseDiagnostic> {
        let Some(PositionedToken { token, column }) = self.advance() else {
            return Err(self.grammar(self.end, "unexpected end of expression"));
        };

        match token {
            FilterToken::OpenParen => {
                let inner = self.parse_or_expr()?;
                if self.check(&FilterToken::CloseParen) {
                    self.advance();
                    return Ok(inner);
                }
                match self.peek() {
                    Some(pt) => Err(self.grammar(
                        pt.column,
                        format!("expected ')' but found '{}'", pt.token),
                    )),
                    None => Err(self.grammar(self.end, "missing closing parenthesis")),
                }
            }

            FilterToken::String(text) => Ok(self.factory.value(text)),
            FilterToken::Integer(value) => Ok(self.factory.value(value)),
            FilterToken::Boolean(value) => Ok(self.factory.value(value)),
            FilterToken::Double(raw) => self
                .factory
                .literal_as(&raw, DomainType::Double)
                .map_err(|e| self.at(column)(e.into())),
            FilterToken::TimeStamp(raw) => self
                .factory
                .literal_as(&raw, DomainType::TimeStamp)
                .map_err(|e| self.at(column)(e.into())),
            FilterToken::TagList(raw) => self
                .factory
                .literal_as(&raw, DomainType::Tag)
                .map_err(|e| self.at(column)(e.into())),

            FilterToken::Identifier(name) => self
                .factory
                .attribute(&name)
                .map_err(|e| self.at(column)(e.into())),

            other => Err(self.unexpected(&PositionedToken {
                token: other,
                column,
            })),
        }
    }

    fn position_column(&self) -> usize {
        self.peek().map_or(self.end, |pt| pt.column)
    }
}
