//! Statement construction and compilation.
//!
//! - [`expr`] - scalar expressions and qualified columns
//! - [`predicate`] - boolean conditions
//! - [`statement`] - built statements and the call-scoped specs shaping them
//! - [`builder`] - [`QueryBuilder`], specs to statements
//! - [`compiler`] - [`SqlCompiler`], statements to parameterized SQL

pub mod builder;
pub mod compiler;
pub mod expr;
pub mod predicate;
pub mod statement;

pub use builder::{ItemChanges, NonePolicy, QueryBuilder, QueryConfig};
pub use compiler::{DatabaseBackendType, SqlCompiler};
pub use expr::{CastType, Column, DatePart, Expr};
pub use predicate::{CompareOp, Predicate};
pub use statement::{
    ColumnSpec, DataMap, DisableSpec, InsertData, Join, JoinKind, JoinOptions, JoinSpec, ListQuery,
    Load, LoadSpec, OrderBy, Select, Statement, StatementBody, StatementKind,
};
