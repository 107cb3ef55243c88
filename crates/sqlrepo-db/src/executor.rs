//! Statement executor trait.
//!
//! [`StatementExecutor`] is the boundary between statement construction and a
//! live database session. The [`Repository`](crate::repository::Repository)
//! hands it built [`Statement`]s; implementations compile them for their
//! backend, run them, and report results as [`Row`]s. Errors from the session
//! are returned unaltered, usually as
//! [`SqlRepoError::DatabaseError`](sqlrepo_core::SqlRepoError::DatabaseError).

use sqlrepo_core::SqlRepoResult;

use crate::model::Row;
use crate::query::compiler::{DatabaseBackendType, SqlCompiler};
use crate::query::statement::Statement;
use crate::value::Value;

/// Minimal async session interface used by repositories.
#[async_trait::async_trait]
pub trait StatementExecutor: Send + Sync {
    /// Returns the backend type for SQL compilation.
    fn backend_type(&self) -> DatabaseBackendType;

    /// Compiles a statement for this executor's backend.
    fn compile(&self, statement: &Statement) -> (String, Vec<Value>) {
        SqlCompiler::new(self.backend_type()).compile(statement)
    }

    /// Runs a query and returns the first row, if any.
    async fn fetch_optional(&self, statement: &Statement) -> SqlRepoResult<Option<Row>>;

    /// Runs a query and returns all rows.
    async fn fetch_all(&self, statement: &Statement) -> SqlRepoResult<Vec<Row>>;

    /// Runs a count query and returns the count.
    ///
    /// The default reads the first column of the first row; a query that
    /// returns nothing counts as zero.
    async fn fetch_count(&self, statement: &Statement) -> SqlRepoResult<i64> {
        let Some(row) = self.fetch_optional(statement).await? else {
            return Ok(0);
        };
        let column = row.columns().first().cloned().unwrap_or_default();
        row.get::<i64>(&column)
    }

    /// Runs a statement that returns no rows.
    /// Returns the number of rows affected.
    async fn execute(&self, statement: &Statement) -> SqlRepoResult<u64>;

    /// Runs a statement with `RETURNING *` and returns the affected rows.
    async fn execute_returning(&self, statement: &Statement) -> SqlRepoResult<Vec<Row>>;

    /// Flushes pending writes without ending the transaction.
    async fn flush(&self) -> SqlRepoResult<()>;

    /// Commits the current transaction.
    async fn commit(&self) -> SqlRepoResult<()>;
}
