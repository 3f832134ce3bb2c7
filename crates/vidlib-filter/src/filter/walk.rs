//! Tree introspection and canonical rendering.
//!
//! External consumers (query generators, debuggers) translate trees through
//! [`Visitor`] and [`walk`] without depending on node internals beyond the
//! public accessors on [`Expr`].

use std::fmt;

use super::ast::{BinaryNode, Expr, UnaryNode};

/// Receives nodes during a pre-order [`walk`].
pub trait Visitor {
    /// Called before a node's children. Return `false` to skip them.
    fn enter(&mut self, node: &Expr, depth: usize) -> bool;

    /// Called after a node's children.
    fn leave(&mut self, _node: &Expr, _depth: usize) {}
}

/// Visits `root` and its descendants, parents before children, left to right.
pub fn walk<V: Visitor + ?Sized>(root: &Expr, visitor: &mut V) {
    walk_at(root, 0, visitor);
}

fn walk_at<V: Visitor + ?Sized>(node: &Expr, depth: usize, visitor: &mut V) {
    if visitor.enter(node, depth) {
        for child in node.children() {
            walk_at(child, depth + 1, visitor);
        }
    }
    visitor.leave(node, depth);
}

/// Writes an operand, parenthesizing operator nodes.
fn operand(f: &mut fmt::Formatter<'_>, expr: &Expr) -> fmt::Result {
    match expr {
        Expr::Binary(_) | Expr::Unary(_) => write!(f, "({expr})"),
        Expr::Literal(_) | Expr::Attribute(_) => write!(f, "{expr}"),
    }
}

/// Renders filter text that parses back to an equivalent tree.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(value) => write!(f, "{value}"),
            Expr::Attribute(attr) => f.write_str(attr.name()),
            Expr::Binary(node) => write!(f, "{node}"),
            Expr::Unary(node) => write!(f, "{node}"),
        }
    }
}

impl fmt::Display for BinaryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Substring nodes hold (needle, haystack); the text reads `haystack $ needle`.
        let (first, second) = if self.operator.is_substring() {
            (&self.right, &self.left)
        } else {
            (&self.left, &self.right)
        };
        operand(f, first)?;
        write!(f, " {} ", self.operator)?;
        operand(f, second)
    }
}

impl fmt::Display for UnaryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.operator)?;
        operand(f, &self.operand)
    }
}
