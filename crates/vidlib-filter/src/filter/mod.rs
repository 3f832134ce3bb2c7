//! Filter expression parser, type checker and evaluator.
//!
//! Filters are boolean expressions over a record's schema fields and its
//! tags. Every tree is built by an [`ExprFactory`], either directly or by the
//! parser driving it, so type errors are caught at construction and never at
//! evaluation.
//!
//! # Supported Syntax
//!
//! ## Operands
//! - `title`, `rating` - schema fields (case-sensitive)
//! - `Genre` - tag names (case-insensitive)
//! - `"text"`, `'text'` - strings; a doubled quote escapes itself
//! - `42`, `-7`, `017`, `0x1F` - integers
//! - `7.5` - doubles
//! - `TRUE`, `FALSE` - booleans
//! - `#2024-01-01T00:00:00Z#` - timestamps, in any form the date parser reads
//! - `[Drama, War]` - tag sets; quote items holding `,` or brackets:
//!   `["Sci-Fi, Drama", War]`
//!
//! ## Comparisons
//! - `=` / `==`, `!=` / `<>`, `<`, `<=`, `>`, `>=`
//! - `a $ b` - `a` contains `b`
//! - prefix any comparison with `~` to ignore case
//! - `tag = "value"` tests membership, `tag = [a, b]` compares sets
//!
//! ## Boolean Operators
//! - `AND`, `OR`, `NOT` (any case)
//! - `()` - Grouping
//!
//! # Example
//!
//! ```
//! use vidlib_filter::{DomainType, ExprFactory, MapRecord, MemoryTagStore, Schema};
//!
//! let schema = Schema::new("handle")
//!     .with_field("handle", DomainType::Integer)
//!     .with_field("title", DomainType::String);
//! let tags = MemoryTagStore::new(["Genre"]);
//! tags.assign(7, "Genre", "Drama").unwrap();
//!
//! let factory = ExprFactory::new(schema, ["Genre"]).unwrap();
//! let plan = factory.compile("title ~$ \"war\" AND Genre = \"Drama\"").unwrap();
//!
//! let record = MapRecord::new().with("handle", 7i64).with("title", "Warhorse");
//! assert!(plan.evaluate(&record, Some(&tags)).unwrap());
//! ```

mod ast;
mod evaluator;
mod factory;
mod lexer;
mod parser;
mod walk;

pub use ast::{
    Attribute, AttributeSource, BinaryKind, BinaryNode, Expr, NodeKind, Side, UnaryNode,
};
pub use evaluator::{eval, Plan};
pub use factory::ExprFactory;
pub use lexer::{FilterToken, Lexer, LexerError, LexerResult, PositionedToken};
pub use parser::parse_filter_expression;
pub use walk::{walk, Visitor};

#[cfg(test)]
mod tests;
