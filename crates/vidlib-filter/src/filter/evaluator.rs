//! Filter evaluation against records.
//!
//! Evaluation is a pure function of the tree, the record and the tag store:
//! nothing in the tree is written. The tag store is refreshed at most once per
//! [`Plan::evaluate`], [`Plan::filter_records`] or [`eval`] call, and only
//! when the tree contains a tag attribute. Every tag lookup in that call reads
//! the [`TagSnapshot`] taken by the refresh.
//!
//! # Example
//!
//! ```
//! use vidlib_filter::{DomainType, ExprFactory, MapRecord, Schema};
//!
//! let schema = Schema::new("handle")
//!     .with_field("handle", DomainType::Integer)
//!     .with_field("rating", DomainType::Double);
//! let factory = ExprFactory::new(schema, Vec::<String>::new()).unwrap();
//!
//! let plan = factory.compile("rating >= 7.5").unwrap();
//! let record = MapRecord::new().with("handle", 1i64).with("rating", 8.0);
//! assert!(plan.evaluate(&record, None).unwrap());
//! ```

use std::borrow::Cow;
use std::cmp::Ordering;

use log::debug;

use super::ast::{Attribute, AttributeSource, BinaryKind, BinaryNode, Expr, Side, UnaryNode};
use crate::error::{CollaboratorError, FilterResult, RuntimeEvalError, TypeError};
use crate::schema::{FieldValue, Record};
use crate::tags::{TagSnapshot, TagStore};
use crate::types::{Comparison, DomainType, Operator};
use crate::value::{Instant, TagSet, Value};

/// Everything a single evaluation may read.
#[derive(Clone, Copy)]
struct Scope<'a> {
    record: &'a dyn Record,
    tags: Option<&'a dyn TagSnapshot>,
}

/// A compiled filter: a Boolean tree plus whether it reads the tag store.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    root: Expr,
    needs_tags: bool,
}

impl Plan {
    /// Wraps a tree built by the factory.
    ///
    /// # Errors
    ///
    /// Returns [`TypeError::NotAPredicate`] unless the root is Boolean.
    pub fn from_expr(root: Expr) -> Result<Self, TypeError> {
        let actual = root.domain_type();
        if actual != DomainType::Boolean {
            return Err(TypeError::NotAPredicate { actual });
        }
        let needs_tags = root.needs_tags();
        Ok(Self { root, needs_tags })
    }

    /// The root node.
    pub fn root(&self) -> &Expr {
        &self.root
    }

    /// Returns true if evaluation consults the tag store.
    pub fn needs_tags(&self) -> bool {
        self.needs_tags
    }

    /// Returns true if the record matches the filter.
    ///
    /// Refreshes the tag store once before evaluating when the plan reads
    /// tags.
    pub fn evaluate(&self, record: &dyn Record, tags: Option<&dyn TagStore>) -> FilterResult<bool> {
        let pinned = self.refresh(tags)?;
        self.matches(Scope {
            record,
            tags: pinned.as_deref(),
        })
    }

    /// Keeps the records that match, refreshing the tag store once for the
    /// whole batch. The first evaluation error aborts the batch.
    pub fn filter_records<'r, R: Record>(
        &self,
        records: &'r [R],
        tags: Option<&dyn TagStore>,
    ) -> FilterResult<Vec<&'r R>> {
        let pinned = self.refresh(tags)?;
        let mut matched = Vec::new();
        for record in records {
            let scope = Scope {
                record,
                tags: pinned.as_deref(),
            };
            if self.matches(scope)? {
                matched.push(record);
            }
        }
        debug!("filter matched {} of {} records", matched.len(), records.len());
        Ok(matched)
    }

    fn refresh<'t>(
        &self,
        tags: Option<&'t dyn TagStore>,
    ) -> FilterResult<Option<Box<dyn TagSnapshot + 't>>> {
        if !self.needs_tags {
            return Ok(None);
        }
        let store = tags.ok_or_else(|| {
            RuntimeEvalError::new(&self.root, "filter reads tags but no tag store was supplied")
        })?;
        Ok(Some(store.snapshot()?))
    }

    fn matches(&self, scope: Scope<'_>) -> FilterResult<bool> {
        match self.root.evaluate(scope)?.as_ref() {
            Value::Boolean(b) => Ok(*b),
            other => Err(RuntimeEvalError::new(
                &self.root,
                format!("expected Boolean verdict, got {}", other.domain_type()),
            )
            .into()),
        }
    }
}

/// Evaluates any tree against one record.
///
/// Walks the tree first to decide whether the tag store must be refreshed,
/// refreshes it at most once, then evaluates.
pub fn eval(root: &Expr, record: &dyn Record, tags: Option<&dyn TagStore>) -> FilterResult<Value> {
    let pinned = if root.needs_tags() {
        let store = tags.ok_or_else(|| {
            RuntimeEvalError::new(root, "expression reads tags but no tag store was supplied")
        })?;
        Some(store.snapshot()?)
    } else {
        None
    };
    let scope = Scope {
        record,
        tags: pinned.as_deref(),
    };
    Ok(root.evaluate(scope)?.into_owned())
}

impl Expr {
    fn evaluate<'e>(&'e self, scope: Scope<'_>) -> FilterResult<Cow<'e, Value>> {
        if let Some(value) = self.constant_value() {
            return Ok(Cow::Borrowed(value));
        }
        match self {
            Expr::Literal(value) => Ok(Cow::Borrowed(value)),
            Expr::Attribute(attr) => attr.evaluate(scope).map(Cow::Owned),
            Expr::Binary(node) => {
                let left = node.left.evaluate(scope)?;
                let right = node.right.evaluate(scope)?;
                let (left, right) = node.coerce(left, right)?;
                Ok(Cow::Owned(Value::Boolean(node.apply(&left, &right)?)))
            }
            Expr::Unary(node) => {
                let operand = node.operand.evaluate(scope)?;
                Ok(Cow::Owned(Value::Boolean(node.apply(&operand)?)))
            }
        }
    }
}

impl Attribute {
    fn evaluate(&self, scope: Scope<'_>) -> FilterResult<Value> {
        match &self.source {
            AttributeSource::Field => {
                let value = read_field(scope.record, &self.name)?;
                if value.domain_type() != self.domain {
                    return Err(CollaboratorError::mismatch(
                        &self.name,
                        self.domain,
                        value.domain_type().to_string(),
                    )
                    .into());
                }
                Ok(value)
            }
            AttributeSource::Tag { handle } => {
                let snapshot = scope.tags.ok_or_else(|| {
                    RuntimeEvalError::new(&self.name, "tag attribute evaluated without a tag store")
                })?;
                let handle_value = match read_field(scope.record, handle)? {
                    Value::Integer(h) => h,
                    other => {
                        return Err(CollaboratorError::mismatch(
                            handle,
                            DomainType::Integer,
                            other.domain_type().to_string(),
                        )
                        .into())
                    }
                };
                let dual = snapshot.lookup(handle_value, &self.name)?;
                Ok(Value::Tag(TagSet::from_dual(dual, &self.name, handle_value)?))
            }
        }
    }
}

fn read_field(record: &dyn Record, name: &str) -> FilterResult<Value> {
    record
        .field(name)
        .map(FieldValue::into_value)
        .ok_or_else(|| {
            CollaboratorError::MissingField {
                field: name.to_string(),
            }
            .into()
        })
}

impl BinaryNode {
    /// Reads a String operand as a TimeStamp when this node coerces one.
    fn coerce<'v>(
        &self,
        left: Cow<'v, Value>,
        right: Cow<'v, Value>,
    ) -> FilterResult<(Cow<'v, Value>, Cow<'v, Value>)> {
        let Some(coercion) = &self.coercion else {
            return Ok((left, right));
        };
        let to_instant = |value: Cow<'v, Value>| -> FilterResult<Cow<'v, Value>> {
            if let Value::String(text) = value.as_ref() {
                let instant = coercion.dates.parse(text).map_err(CollaboratorError::from)?;
                return Ok(Cow::Owned(Value::TimeStamp(instant)));
            }
            Ok(value)
        };
        match coercion.side {
            Side::Left => Ok((to_instant(left)?, right)),
            Side::Right => Ok((left, to_instant(right)?)),
        }
    }

    /// Applies the operator to already-evaluated operands.
    pub(crate) fn apply(&self, left: &Value, right: &Value) -> FilterResult<bool> {
        let ignore_case = self.operator.is_case_insensitive();
        let verdict = match (self.kind, left, right) {
            (BinaryKind::Boolean, Value::Boolean(l), Value::Boolean(r)) => match self.operator {
                Operator::Equals => l == r,
                Operator::DoesNotEqual => l != r,
                Operator::And => *l && *r,
                Operator::Or => *l || *r,
                _ => return Err(self.unexpected("operator")),
            },
            (BinaryKind::Integer, Value::Integer(l), Value::Integer(r)) => {
                self.comparison()?.test(l.cmp(r))
            }
            (BinaryKind::Double, l, r) => {
                let (Some(l), Some(r)) = (l.as_f64(), r.as_f64()) else {
                    return Err(self.unexpected("operand"));
                };
                // Only NaN is unordered; the total order puts it above every number.
                let ordering = l.partial_cmp(&r).unwrap_or_else(|| l.total_cmp(&r));
                self.comparison()?.test(ordering)
            }
            (BinaryKind::String, Value::String(l), Value::String(r)) => {
                let (l, r) = if ignore_case {
                    (Cow::Owned(l.to_lowercase()), Cow::Owned(r.to_lowercase()))
                } else {
                    (Cow::Borrowed(l.as_str()), Cow::Borrowed(r.as_str()))
                };
                if self.operator.is_substring() {
                    r.contains(l.as_ref())
                } else {
                    self.comparison()?.test(l.cmp(&r))
                }
            }
            (BinaryKind::TimeStamp, Value::TimeStamp(l), Value::TimeStamp(r)) => {
                self.comparison()?.test(Instant::cmp(l, r))
            }
            (BinaryKind::TagSet, Value::Tag(l), Value::Tag(r)) => {
                let equal = if ignore_case {
                    l.same_values_ignore_case(r)
                } else {
                    l.same_values(r)
                };
                match self.comparison()? {
                    Comparison::Eq => equal,
                    Comparison::Ne => !equal,
                    _ => return Err(self.unexpected("operator")),
                }
            }
            (BinaryKind::TagMembership, Value::Tag(set), Value::String(value)) => {
                let included = if ignore_case {
                    set.contains_ignore_case(value)
                } else {
                    set.contains(value)
                };
                match self.operator {
                    Operator::Includes | Operator::IncludesIgnoreCase => included,
                    Operator::DoesNotInclude | Operator::DoesNotIncludeIgnoreCase => !included,
                    _ => return Err(self.unexpected("operator")),
                }
            }
            _ => return Err(self.unexpected("operand")),
        };
        Ok(verdict)
    }

    fn comparison(&self) -> FilterResult<Comparison> {
        self.operator
            .comparison()
            .ok_or_else(|| self.unexpected("operator"))
    }

    fn unexpected(&self, what: &str) -> crate::error::FilterError {
        RuntimeEvalError::new(
            self,
            format!("unexpected {what} for {:?} comparison", self.kind),
        )
        .into()
    }
}

impl UnaryNode {
    fn apply(&self, operand: &Value) -> FilterResult<bool> {
        match (self.operator, operand) {
            (Operator::Not, Value::Boolean(b)) => Ok(!b),
            _ => Err(RuntimeEvalError::new(self, "NOT applied to a non-Boolean value").into()),
        }
    }
}
