//! Typed filter-expression engine for a personal video library.
//!
//! Users write ad hoc boolean search expressions such as
//! `title ~$ "war" AND rating >= 7.5 AND Genre = "Drama"` over a schema of
//! plain fields plus multi-valued tags. This crate parses the text, resolves
//! names against the schema, type-checks every operator, folds constants and
//! evaluates the result against records, consulting an external tag store for
//! tag memberships.
//!
//! # Example
//!
//! ```
//! use vidlib_filter::{DomainType, ExprFactory, MapRecord, MemoryTagStore, Schema};
//!
//! let schema = Schema::new("handle")
//!     .with_field("handle", DomainType::Integer)
//!     .with_field("title", DomainType::String)
//!     .with_field("rating", DomainType::Double);
//! let tags = MemoryTagStore::new(["Genre"]);
//! tags.assign_all(7, "Genre", ["Drama", "History"]).unwrap();
//!
//! let factory = ExprFactory::new(schema, ["Genre"]).unwrap();
//! let plan = factory
//!     .compile(r#"title ~$ "war" AND rating >= 7.5 AND Genre = "Drama""#)
//!     .unwrap();
//!
//! let record = MapRecord::new()
//!     .with("handle", 7i64)
//!     .with("title", "Warhorse")
//!     .with("rating", 8.0);
//! assert!(plan.evaluate(&record, Some(&tags)).unwrap());
//! ```

pub mod datetime;
pub mod error;
pub mod filter;
pub mod schema;
pub mod tags;
pub mod types;
pub mod value;

pub use datetime::{DateParseError, DateParser, FlexibleDateParser};
pub use error::{
    CollaboratorError, DiagnosticKind, FilterError, FilterResult, LiteralParseError,
    ParseDiagnostic, RuntimeEvalError, SchemaError, TypeError,
};
pub use filter::{
    eval, parse_filter_expression, walk, Expr, ExprFactory, NodeKind, Plan, Visitor,
};
pub use schema::{FieldValue, MapRecord, Record, Schema, DEFAULT_HANDLE};
pub use tags::{DualCased, MemoryTagStore, TagSnapshot, TagStore};
pub use types::{Comparison, DomainType, Operator};
pub use value::{Instant, TagSet, Value};
