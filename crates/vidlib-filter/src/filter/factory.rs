//! The expression factory: the only way to build an [`Expr`].
//!
//! The factory holds a fixed snapshot of the schema and the known tag names.
//! Attribute names are resolved once, here; operator/operand combinations are
//! checked here; constant sub-expressions are folded here.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, trace};
use strsim::levenshtein;

use super::ast::{Attribute, AttributeSource, BinaryKind, BinaryNode, Coercion, Expr, Side, UnaryNode};
use super::evaluator::Plan;
use super::parser::parse_filter_expression;
use crate::datetime::{DateParser, FlexibleDateParser};
use crate::error::{
    FilterError, FilterResult, LiteralParseError, ParseDiagnostic, SchemaError, TypeError,
};
use crate::schema::Schema;
use crate::tags::TagStore;
use crate::types::{DomainType, Operator};
use crate::value::{Instant, TagSet, Value};

/// Maximum Levenshtein distance to consider a name as a suggestion.
const MAX_SUGGESTION_DISTANCE: usize = 3;

/// Builds and type-checks expression trees against one schema snapshot.
#[derive(Clone)]
pub struct ExprFactory {
    schema: Schema,
    /// Lower-cased tag name -> canonical tag name.
    tags: BTreeMap<String, String>,
    dates: Arc<dyn DateParser>,
}

impl std::fmt::Debug for ExprFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExprFactory")
            .field("schema", &self.schema)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

impl ExprFactory {
    /// Creates a factory for `schema` and the given tag names.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] if the schema's handle field is missing or
    /// is not an Integer.
    pub fn new<I, S>(schema: Schema, tag_names: I) -> FilterResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        schema.validate()?;
        let tags: BTreeMap<String, String> = tag_names
            .into_iter()
            .map(Into::into)
            .map(|name: String| (name.to_lowercase(), name))
            .collect();
        debug!(
            "filter factory ready: {} fields, {} tags, handle '{}'",
            schema.fields().count(),
            tags.len(),
            schema.handle()
        );
        Ok(Self {
            schema,
            tags,
            dates: Arc::new(FlexibleDateParser::new()),
        })
    }

    /// Creates a factory reading the known tag names from a tag store.
    pub fn from_store(schema: Schema, store: &dyn TagStore) -> FilterResult<Self> {
        let names = store.tag_names()?;
        Self::new(schema, names)
    }

    /// Replaces the date/time parser used for timestamp literals.
    pub fn with_date_parser(mut self, dates: Arc<dyn DateParser>) -> Self {
        self.dates = dates;
        self
    }

    /// The schema snapshot.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Known tag names, canonical spelling.
    pub fn tag_names(&self) -> impl Iterator<Item = &str> {
        self.tags.values().map(String::as_str)
    }

    /// The date/time parser.
    pub fn date_parser(&self) -> &dyn DateParser {
        self.dates.as_ref()
    }

    // ==================== Text entry points ====================

    /// Parses filter text into a tree.
    pub fn parse(&self, text: &str) -> Result<Expr, ParseDiagnostic> {
        parse_filter_expression(text, self)
    }

    /// Parses filter text into an evaluation plan.
    pub fn compile(&self, text: &str) -> FilterResult<Plan> {
        let root = self.parse(text)?;
        let plan = Plan::from_expr(root)?;
        debug!(
            "compiled filter '{}' (needs tag cache: {})",
            text,
            plan.needs_tags()
        );
        Ok(plan)
    }

    // ==================== Literals ====================

    /// Wraps a typed value as a literal node.
    pub fn value(&self, value: impl Into<Value>) -> Expr {
        Expr::Literal(value.into())
    }

    /// Builds a literal from text, picking the narrowest type that accepts it:
    /// Integer, Double, TimeStamp, Boolean, Tag, then String.
    pub fn literal(&self, text: &str) -> Expr {
        let value = parse_integer(text)
            .map(Value::Integer)
            .or_else(|| parse_double(text).map(Value::Double))
            .or_else(|| self.parse_timestamp(text).map(Value::TimeStamp))
            .or_else(|| parse_boolean(text).map(Value::Boolean))
            .or_else(|| TagSet::parse(text).map(Value::Tag))
            .unwrap_or_else(|| Value::String(text.to_string()));
        Expr::Literal(value)
    }

    /// Builds a literal from text, forcing `domain`.
    ///
    /// # Errors
    ///
    /// Returns a [`LiteralParseError`] if the text is not a valid `domain`
    /// literal. There is no fallback to another type.
    pub fn literal_as(&self, text: &str, domain: DomainType) -> Result<Expr, LiteralParseError> {
        let value = match domain {
            DomainType::String => Some(Value::String(text.to_string())),
            DomainType::Integer => parse_integer(text).map(Value::Integer),
            DomainType::Double => parse_double(text).map(Value::Double),
            DomainType::Boolean => parse_boolean(text).map(Value::Boolean),
            DomainType::TimeStamp => self.parse_timestamp(text).map(Value::TimeStamp),
            DomainType::Tag => TagSet::parse(text).map(Value::Tag),
            DomainType::Unknown => None,
        };
        value.map(Expr::Literal).ok_or_else(|| LiteralParseError {
            text: text.to_string(),
            expected: domain,
        })
    }

    /// Reads a timestamp with or without its `#` delimiters.
    fn parse_timestamp(&self, text: &str) -> Option<Instant> {
        let inner = text
            .strip_prefix('#')
            .and_then(|rest| rest.strip_suffix('#'))
            .map_or(text, str::trim);
        self.dates.parse(inner).ok()
    }

    // ==================== Attributes ====================

    /// Resolves a schema field (case-sensitive) or a tag name
    /// (case-insensitive).
    pub fn attribute(&self, name: &str) -> Result<Expr, SchemaError> {
        if let Some(domain) = self.schema.field_type(name) {
            if domain == DomainType::Unknown {
                return Err(SchemaError::UnsupportedField {
                    name: name.to_string(),
                });
            }
            return Ok(Expr::Attribute(Attribute {
                name: name.to_string(),
                domain,
                source: AttributeSource::Field,
            }));
        }

        if let Some(canonical) = self.tags.get(&name.to_lowercase()) {
            return Ok(Expr::Attribute(Attribute {
                name: canonical.clone(),
                domain: DomainType::Tag,
                source: AttributeSource::Tag {
                    handle: self.schema.handle().to_string(),
                },
            }));
        }

        Err(SchemaError::UnknownAttribute {
            name: name.to_string(),
            suggestion: self.suggest(name),
        })
    }

    fn suggest(&self, name: &str) -> Option<String> {
        let query = name.to_lowercase();
        let (best, distance) = self
            .schema
            .fields()
            .map(|(field, _)| field)
            .chain(self.tag_names())
            .map(|candidate| (candidate, levenshtein(&query, &candidate.to_lowercase())))
            .min_by_key(|(_, d)| *d)?;

        if distance <= MAX_SUGGESTION_DISTANCE && best != name {
            Some(best.to_string())
        } else {
            None
        }
    }

    // ==================== Operators ====================

    /// Combines two operands.
    ///
    /// # Errors
    ///
    /// Returns a [`TypeError`] if the operand types and operator are not a
    /// valid combination, or a [`LiteralParseError`] if a string literal next
    /// to a timestamp does not parse as one.
    pub fn binary(&self, left: Expr, operator: Operator, right: Expr) -> FilterResult<Expr> {
        let (kind, operator, coerce) =
            resolve_binary(left.domain_type(), operator, right.domain_type())?;

        let (left, right, coercion) = match coerce {
            None => (left, right, None),
            Some(Side::Left) => {
                let (left, coercion) = self.coerce_to_timestamp(left, Side::Left)?;
                (left, right, coercion)
            }
            Some(Side::Right) => {
                let (right, coercion) = self.coerce_to_timestamp(right, Side::Right)?;
                (left, right, coercion)
            }
        };

        let mut node = BinaryNode {
            left,
            right,
            operator,
            kind,
            coercion,
            folded: None,
        };

        let folded = match (node.left.constant_value(), node.right.constant_value()) {
            (Some(l), Some(r)) => Some(node.apply(l, r)?),
            _ => None,
        };
        if let Some(verdict) = folded {
            trace!("folded constant {:?} to {verdict}", node.operator);
            node.folded = Some(Value::Boolean(verdict));
        }

        Ok(Expr::Binary(Box::new(node)))
    }

    /// Applies a unary operator. Only Boolean NOT is supported.
    pub fn unary(&self, operator: Operator, operand: Expr) -> FilterResult<Expr> {
        let domain = operand.domain_type();
        if operator != Operator::Not || domain != DomainType::Boolean {
            return Err(TypeError::IncompatibleOperand {
                operator,
                operand: domain,
            }
            .into());
        }

        let folded = operand
            .constant_value()
            .and_then(Value::as_bool)
            .map(|b| Value::Boolean(!b));

        Ok(Expr::Unary(Box::new(UnaryNode {
            operand,
            operator,
            folded,
        })))
    }

    /// `left AND right`.
    pub fn and(&self, left: Expr, right: Expr) -> FilterResult<Expr> {
        self.binary(left, Operator::And, right)
    }

    /// `left OR right`.
    pub fn or(&self, left: Expr, right: Expr) -> FilterResult<Expr> {
        self.binary(left, Operator::Or, right)
    }

    /// `NOT operand`.
    pub fn not(&self, operand: Expr) -> FilterResult<Expr> {
        self.unary(Operator::Not, operand)
    }

    /// Turns a String operand into a TimeStamp operand: constant strings are
    /// parsed now, other strings are parsed on every evaluation.
    fn coerce_to_timestamp(
        &self,
        operand: Expr,
        side: Side,
    ) -> Result<(Expr, Option<Coercion>), FilterError> {
        match operand {
            Expr::Literal(Value::String(text)) => {
                Ok((self.literal_as(&text, DomainType::TimeStamp)?, None))
            }
            other => Ok((
                other,
                Some(Coercion {
                    side,
                    dates: Arc::clone(&self.dates),
                }),
            )),
        }
    }
}

/// Looks up an operand pair and operator in the compatibility matrix.
///
/// Returns the node semantics, the operator to store (equality against a
/// string becomes membership for tags), and which side, if any, holds a
/// String to be read as a TimeStamp.
fn resolve_binary(
    left: DomainType,
    operator: Operator,
    right: DomainType,
) -> Result<(BinaryKind, Operator, Option<Side>), TypeError> {
    use DomainType as T;

    let comparison = operator.comparison();
    let plain_comparison = comparison.is_some() && !operator.is_case_insensitive();
    let equality = comparison.is_some_and(|c| c.is_equality());

    let resolved = match (left, right) {
        (T::Boolean, T::Boolean)
            if matches!(
                operator,
                Operator::Equals | Operator::DoesNotEqual | Operator::And | Operator::Or
            ) =>
        {
            Some((BinaryKind::Boolean, operator, None))
        }
        (T::Integer, T::Integer) if plain_comparison => {
            Some((BinaryKind::Integer, operator, None))
        }
        (l, r) if l.is_numeric() && r.is_numeric() && plain_comparison => {
            Some((BinaryKind::Double, operator, None))
        }
        (T::String, T::String) if comparison.is_some() || operator.is_substring() => {
            Some((BinaryKind::String, operator, None))
        }
        (T::String, T::TimeStamp) if plain_comparison => {
            Some((BinaryKind::TimeStamp, operator, Some(Side::Left)))
        }
        (T::TimeStamp, T::TimeStamp) if plain_comparison => {
            Some((BinaryKind::TimeStamp, operator, None))
        }
        (T::TimeStamp, T::String) if plain_comparison => {
            Some((BinaryKind::TimeStamp, operator, Some(Side::Right)))
        }
        (T::Tag, T::Tag) if equality => Some((BinaryKind::TagSet, operator, None)),
        (T::Tag, T::String) => operator
            .as_membership()
            .map(|membership| (BinaryKind::TagMembership, membership, None)),
        _ => None,
    };

    resolved.ok_or(TypeError::IncompatibleOperands {
        left,
        operator,
        right,
    })
}

/// Signed decimal integer.
fn parse_integer(text: &str) -> Option<i64> {
    let digits = text.strip_prefix(['-', '+']).unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Decimal number with exactly one decimal point.
fn parse_double(text: &str) -> Option<f64> {
    let body = text.strip_prefix(['-', '+']).unwrap_or(text);
    let valid = body.bytes().filter(|&b| b == b'.').count() == 1
        && body.bytes().any(|b| b.is_ascii_digit())
        && body.bytes().all(|b| b == b'.' || b.is_ascii_digit());
    if valid {
        text.parse().ok()
    } else {
        None
    }
}

/// `TRUE` or `FALSE`, any case.
fn parse_boolean(text: &str) -> Option<bool> {
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}
