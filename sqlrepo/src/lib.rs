//! # sqlrepo
//!
//! Repository-style query construction for relational models.
//!
//! This is the meta-crate that re-exports the sub-crates for convenient
//! access. Depend on `sqlrepo` to get everything, or on the individual crates
//! for finer-grained control.

/// Error types, repository settings, and logging.
pub use sqlrepo_core as core;

/// Models, filters, the query builder, the SQL compiler, and the repository.
pub use sqlrepo_db as db;

/// Convenience re-exports of the most commonly used types.
pub mod prelude {
    pub use sqlrepo_core::{
        FilterConvertStrategy, LoadStrategyKind, RepositorySettings, Settings, SqlRepoError,
        SqlRepoResult,
    };
    pub use sqlrepo_db::{
        FieldDef, FieldType, FilterConverter, FilterMap, Filters, InsertData, JoinSpec, ListQuery,
        LoadSpec, Model, ModelMeta, OrderBy, QueryBuilder, QueryConfig, Repository, Row,
        StatementExecutor, Value,
    };

    pub use async_trait::async_trait;
    pub use chrono;
    pub use serde_json;
    pub use tracing;
}
