//! Expression tree for filter expressions.
//!
//! Trees are built only through [`ExprFactory`](super::ExprFactory), which
//! type-checks every node at construction. A built tree is immutable: constant
//! sub-expressions are folded once when their node is created and evaluation
//! never writes to the tree, so a tree can be shared across threads.

use std::fmt;
use std::sync::Arc;

use crate::datetime::DateParser;
use crate::types::{DomainType, Operator};
use crate::value::Value;

/// A typed, type-checked filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A constant value.
    Literal(Value),

    /// A schema field or tag, resolved at construction.
    Attribute(Attribute),

    /// Two operands combined by an operator.
    Binary(Box<BinaryNode>),

    /// One operand under an operator (only Boolean NOT).
    Unary(Box<UnaryNode>),
}

/// Where an attribute's value comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeSource {
    /// A field read directly from the record.
    Field,
    /// A tag looked up in the tag store, keyed by the record's handle field.
    Tag {
        /// Name of the record's identity field.
        handle: String,
    },
}

/// A resolved attribute reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub(crate) name: String,
    pub(crate) domain: DomainType,
    pub(crate) source: AttributeSource,
}

impl Attribute {
    /// The field name, or the canonical tag name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared type.
    pub fn domain_type(&self) -> DomainType {
        self.domain
    }

    /// Where the value comes from.
    pub fn source(&self) -> &AttributeSource {
        &self.source
    }

    /// Returns true for tag attributes.
    pub fn is_tag(&self) -> bool {
        matches!(self.source, AttributeSource::Tag { .. })
    }
}

/// The comparison semantics a binary node was resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryKind {
    /// Boolean equality and logic.
    Boolean,
    /// Integer comparison.
    Integer,
    /// Numeric comparison with Integer operands promoted to Double.
    Double,
    /// String comparison and substring tests.
    String,
    /// Point-in-time comparison.
    TimeStamp,
    /// Tag set equality.
    TagSet,
    /// Tag membership of a string.
    TagMembership,
}

/// Which operand of a binary node holds a string read as a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// A non-constant String operand that is converted to a TimeStamp on every
/// evaluation.
#[derive(Clone)]
pub(crate) struct Coercion {
    pub(crate) side: Side,
    pub(crate) dates: Arc<dyn DateParser>,
}

impl fmt::Debug for Coercion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coercion").field("side", &self.side).finish()
    }
}

impl PartialEq for Coercion {
    fn eq(&self, other: &Self) -> bool {
        self.side == other.side
    }
}

/// A binary operator node.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryNode {
    pub(crate) left: Expr,
    pub(crate) right: Expr,
    pub(crate) operator: Operator,
    pub(crate) kind: BinaryKind,
    pub(crate) coercion: Option<Coercion>,
    pub(crate) folded: Option<Value>,
}

impl BinaryNode {
    /// The left operand.
    pub fn left(&self) -> &Expr {
        &self.left
    }

    /// The right operand.
    pub fn right(&self) -> &Expr {
        &self.right
    }

    /// The operator, after membership resolution.
    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// The resolved semantics.
    pub fn kind(&self) -> BinaryKind {
        self.kind
    }

    /// The operand read as a timestamp at evaluation time, if any.
    pub fn coerced_side(&self) -> Option<Side> {
        self.coercion.as_ref().map(|c| c.side)
    }
}

/// A unary operator node.
#[derive(Debug, Clone, PartialEq)]
pub struct UnaryNode {
    pub(crate) operand: Expr,
    pub(crate) operator: Operator,
    pub(crate) folded: Option<Value>,
}

impl UnaryNode {
    /// The operand.
    pub fn operand(&self) -> &Expr {
        &self.operand
    }

    /// The operator.
    pub fn operator(&self) -> Operator {
        self.operator
    }
}

/// Coarse node classification for tree consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Literal,
    Attribute,
    Binary(BinaryKind),
    Unary,
}

impl Expr {
    /// The node's type. Fixed at construction.
    pub fn domain_type(&self) -> DomainType {
        match self {
            Expr::Literal(value) => value.domain_type(),
            Expr::Attribute(attr) => attr.domain,
            Expr::Binary(_) | Expr::Unary(_) => DomainType::Boolean,
        }
    }

    /// Returns true when the node's value does not depend on any record.
    pub fn is_constant(&self) -> bool {
        self.constant_value().is_some()
    }

    /// The value computed at construction for constant nodes.
    pub fn constant_value(&self) -> Option<&Value> {
        match self {
            Expr::Literal(value) => Some(value),
            Expr::Attribute(_) => None,
            Expr::Binary(node) => node.folded.as_ref(),
            Expr::Unary(node) => node.folded.as_ref(),
        }
    }

    /// Returns true if evaluating this tree reads the tag store.
    pub fn needs_tags(&self) -> bool {
        match self {
            Expr::Literal(_) => false,
            Expr::Attribute(attr) => attr.is_tag(),
            Expr::Binary(node) => {
                node.folded.is_none() && (node.left.needs_tags() || node.right.needs_tags())
            }
            Expr::Unary(node) => node.folded.is_none() && node.operand.needs_tags(),
        }
    }

    /// The node's classification.
    pub fn kind(&self) -> NodeKind {
        match self {
            Expr::Literal(_) => NodeKind::Literal,
            Expr::Attribute(_) => NodeKind::Attribute,
            Expr::Binary(node) => NodeKind::Binary(node.kind),
            Expr::Unary(_) => NodeKind::Unary,
        }
    }

    /// The operator of a binary or unary node.
    pub fn operator(&self) -> Option<Operator> {
        match self {
            Expr::Binary(node) => Some(node.operator),
            Expr::Unary(node) => Some(node.operator),
            Expr::Literal(_) | Expr::Attribute(_) => None,
        }
    }

    /// The value of a literal node.
    pub fn literal(&self) -> Option<&Value> {
        match self {
            Expr::Literal(value) => Some(value),
            _ => None,
        }
    }

    /// The attribute of an attribute node.
    pub fn attribute(&self) -> Option<&Attribute> {
        match self {
            Expr::Attribute(attr) => Some(attr),
            _ => None,
        }
    }

    /// Direct children, left to right.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Literal(_) | Expr::Attribute(_) => Vec::new(),
            Expr::Binary(node) => vec![&node.left, &node.right],
            Expr::Unary(node) => vec![&node.operand],
        }
    }
}
