//! # sqlrepo-db
//!
//! Statement construction for repositories over relational models. Callers
//! describe what they want with plain data (filter maps, join and load
//! names, search terms, orderings, insert/update payloads, disable
//! requests); this crate validates it against a model's metadata and turns
//! it into typed statements, then compiles those to parameterized SQL.
//!
//! ## Architecture
//!
//! A [`FilterConverter`](filters::FilterConverter) validates and translates
//! filter maps into [`Predicate`](query::Predicate)s using the operator
//! library. The [`QueryBuilder`](query::QueryBuilder) assembles predicates,
//! joins, loads and pagination into a [`Statement`](query::Statement). The
//! [`SqlCompiler`](query::SqlCompiler) renders statements for PostgreSQL,
//! SQLite or MySQL. A [`Repository`](repository::Repository) drives the
//! whole pipeline against any [`StatementExecutor`](executor::StatementExecutor).
//!
//! ## Module Overview
//!
//! - [`model`] - The [`Model`](model::Model) trait and [`ModelMeta`](model::ModelMeta)
//! - [`fields`] - Field and relationship definitions
//! - [`value`] - The backend-agnostic [`Value`](value::Value) enum
//! - [`filters`] - Filter specs, operators, guards and converters
//! - [`query`] - Expressions, predicates, statements, builder and compiler
//! - [`executor`] - The async session boundary
//! - [`repository`] - The async repository facade

// These clippy lints are intentionally allowed for the statement crate:
// - too_many_lines: the SQL compiler methods are inherently large due to many match arms
// - cast_precision_loss: i64-to-f64 casts are acceptable for numeric row conversions
// - result_large_err: SqlRepoError is the shared error type and should be used consistently
// - format_push_string: format! with push_str is clearer than write! for SQL generation
// - doc_markdown: backtick requirements for documentation items are too strict
// - needless_pass_by_value: operator functions share one `fn(Expr, Value)` signature
// - return_self_not_must_use: builder pattern methods are self-documenting
#![allow(clippy::too_many_lines)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::result_large_err)]
#![allow(clippy::format_push_string)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::unused_self)]

pub mod executor;
pub mod fields;
pub mod filters;
pub mod model;
pub mod query;
pub mod repository;
pub mod value;

// Re-export the most commonly used types at the crate root.
pub use executor::StatementExecutor;
pub use fields::{FieldDef, FieldKind, FieldType, RelationDef};
pub use filters::{AdvancedOperator, DjangoLookup, Filter, FilterConverter, FilterMap, Filters};
pub use model::{FromValue, Model, ModelMeta, Row};
pub use query::{
    ColumnSpec, DataMap, DatabaseBackendType, DisableSpec, Expr, InsertData, ItemChanges,
    JoinOptions, JoinSpec, ListQuery, Load, LoadSpec, NonePolicy, OrderBy, Predicate, QueryBuilder,
    QueryConfig, SqlCompiler, Statement, StatementKind,
};
pub use repository::Repository;
pub use value::Value;
