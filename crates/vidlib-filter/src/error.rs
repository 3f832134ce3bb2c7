//! Error types for the filter engine.
//!
//! Construction-time errors ([`SchemaError`], [`TypeError`],
//! [`LiteralParseError`], [`ParseDiagnostic`]) abort tree building; evaluation
//! errors ([`RuntimeEvalError`], [`CollaboratorError`]) abort the current
//! evaluation. None of them are ever turned into a `false` verdict.

use thiserror::Error;

use crate::datetime::DateParseError;
use crate::types::{DomainType, Operator};

/// A specialized Result type for filter engine operations.
pub type FilterResult<T> = Result<T, FilterError>;

/// Any error the filter engine can report.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FilterError {
    /// Unknown attribute or an unusable schema.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Operand types do not fit the operator.
    #[error(transparent)]
    Type(#[from] TypeError),

    /// A literal could not be read as the requested type.
    #[error(transparent)]
    LiteralParse(#[from] LiteralParseError),

    /// Malformed filter text.
    #[error(transparent)]
    Grammar(#[from] ParseDiagnostic),

    /// An internal invariant was violated during evaluation.
    #[error(transparent)]
    Runtime(#[from] RuntimeEvalError),

    /// A schema, record, tag or date collaborator failed.
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
}

/// Errors raised while resolving names against the schema.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    /// The name is neither a schema field nor a known tag.
    #[error("unknown attribute '{name}'{}", suggestion_suffix(.suggestion))]
    UnknownAttribute {
        /// The name that failed to resolve.
        name: String,
        /// A close match among the known names, if any.
        suggestion: Option<String>,
    },

    /// The schema's handle field is not declared.
    #[error("schema does not declare the handle field '{name}'")]
    MissingHandle {
        /// The configured handle field name.
        name: String,
    },

    /// The schema's handle field is declared with a non-integer type.
    #[error("handle field '{name}' must be Integer, found {actual}")]
    HandleNotInteger {
        /// The handle field name.
        name: String,
        /// The declared type.
        actual: DomainType,
    },

    /// The field exists but has a type the engine cannot filter on.
    #[error("field '{name}' has an unsupported type")]
    UnsupportedField {
        /// The field name.
        name: String,
    },
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(" (did you mean '{s}'?)"),
        None => String::new(),
    }
}

/// Errors raised when an operator is applied to operands it does not accept.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    /// Binary operator applied to incompatible operands.
    #[error("operator '{operator}' cannot be applied to {left} and {right}")]
    IncompatibleOperands {
        left: DomainType,
        operator: Operator,
        right: DomainType,
    },

    /// Unary operator applied to an incompatible operand.
    #[error("operator '{operator}' cannot be applied to {operand}")]
    IncompatibleOperand {
        operator: Operator,
        operand: DomainType,
    },

    /// A filter root must produce a Boolean verdict.
    #[error("filter must be a Boolean expression, found {actual}")]
    NotAPredicate { actual: DomainType },
}

/// A literal could not be parsed as the type it was forced to.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("cannot read '{text}' as {expected}")]
pub struct LiteralParseError {
    /// The literal text.
    pub text: String,
    /// The type the literal was forced to.
    pub expected: DomainType,
}

/// What went wrong at a diagnostic's position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Malformed text.
    Grammar,
    /// An identifier did not resolve.
    Schema,
    /// An operator did not accept its operands.
    Type,
    /// A literal did not parse as its required type.
    Literal,
}

/// A parse failure, positioned for caret-style rendering.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message} at column {column}")]
pub struct ParseDiagnostic {
    /// The original filter text.
    pub text: String,
    /// The 0-based character column of the offending token.
    pub column: usize,
    /// Human-readable description.
    pub message: String,
    /// The category of the failure.
    pub kind: DiagnosticKind,
}

impl ParseDiagnostic {
    /// Creates a grammar diagnostic.
    pub fn grammar(text: impl Into<String>, column: usize, message: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            column,
            message: message.into(),
            kind: DiagnosticKind::Grammar,
        }
    }

    /// Creates a diagnostic for a factory error raised while parsing.
    pub fn from_error(text: impl Into<String>, column: usize, error: &FilterError) -> Self {
        let kind = match error {
            FilterError::Schema(_) => DiagnosticKind::Schema,
            FilterError::Type(_) => DiagnosticKind::Type,
            FilterError::LiteralParse(_) => DiagnosticKind::Literal,
            FilterError::Grammar(inner) => inner.kind,
            FilterError::Runtime(_) | FilterError::Collaborator(_) => DiagnosticKind::Grammar,
        };
        Self {
            text: text.into(),
            column,
            message: error.to_string(),
            kind,
        }
    }

    /// Renders the text with a caret under the offending column.
    ///
    /// ```
    /// use vidlib_filter::ParseDiagnostic;
    ///
    /// let diag = ParseDiagnostic::grammar("age >", 5, "unexpected end of expression");
    /// assert_eq!(diag.render(), "age >\n     ^ unexpected end of expression");
    /// ```
    pub fn render(&self) -> String {
        format!(
            "{}\n{}^ {}",
            self.text,
            " ".repeat(self.column),
            self.message
        )
    }
}

/// An internal invariant was violated while evaluating a node.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("evaluation of '{node}' failed: {message}")]
pub struct RuntimeEvalError {
    /// The rendered node that failed.
    pub node: String,
    /// What went wrong.
    pub message: String,
}

impl RuntimeEvalError {
    /// Creates a runtime error for the given node.
    pub fn new(node: impl ToString, message: impl Into<String>) -> Self {
        Self {
            node: node.to_string(),
            message: message.into(),
        }
    }
}

/// Failures reported by the engine's external collaborators.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CollaboratorError {
    /// The record has no value for a field the filter reads.
    #[error("record has no value for field '{field}'")]
    MissingField { field: String },

    /// The record's value does not match the field's declared type.
    #[error("field '{field}' should hold {expected}, found {found}")]
    FieldTypeMismatch {
        field: String,
        expected: DomainType,
        found: String,
    },

    /// The tag store failed.
    #[error("tag store error: {message}")]
    TagStore { message: String },

    /// The tag store returned case variants that disagree.
    #[error("tag store returned inconsistent case variants for '{tag}' on handle {handle}")]
    InconsistentTagSet { tag: String, handle: i64 },

    /// The date/time parser rejected a value.
    #[error(transparent)]
    DateParse(#[from] DateParseError),
}

impl CollaboratorError {
    /// Creates a tag store error.
    pub fn tag_store(message: impl Into<String>) -> Self {
        CollaboratorError::TagStore {
            message: message.into(),
        }
    }

    /// Creates a field type mismatch error.
    pub fn mismatch(field: impl Into<String>, expected: DomainType, found: impl Into<String>) -> Self {
        CollaboratorError::FieldTypeMismatch {
            field: field.into(),
            expected,
            found: found.into(),
        }
    }
}
