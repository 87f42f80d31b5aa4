//! Natural-language to query compiler for Parley.
//!
//! Resolves a named schema context, classifies a free-text utterance with a
//! fixed first-match-wins rule order, and produces a typed
//! [`QueryExpression`] that can be rendered as SQL or as a builder chain.

pub mod catalog;
pub mod compiler;
pub mod error;
pub mod render;
pub mod types;

pub use catalog::{Column, ColumnType, SchemaCatalog, SchemaContext};
pub use compiler::QueryCompiler;
pub use error::QueryError;
pub use render::{render, to_fluent, to_sql};
pub use types::{
    Aggregate, AggregateFunction, Assignment, Literal, Operator, Ordering, Predicate,
    QueryExpression,
};
