//! Async repository.
//!
//! A [`Repository`] binds one [`Model`] type to a [`StatementExecutor`] and a
//! [`QueryBuilder`] configured from [`RepositorySettings`]. Every operation
//! builds a statement, hands it to the executor and maps the returned rows
//! back to entities. After writes the session is flushed, or committed when
//! `use_flush` is off.
//!
//! # Examples
//!
//! ```ignore
//! let repo = Repository::<MyModel, _>::new(executor, RepositorySettings::default())?;
//! let item = repo.get(FilterMap::new().with("id", 1), &[], &[]).await?;
//! let removed = repo.disable(vec![Value::Int(1), Value::Int(2)], Filters::none()).await?;
//! ```

use std::collections::HashSet;
use std::marker::PhantomData;

use sqlrepo_core::{RepositorySettings, SqlRepoError, SqlRepoResult};

use crate::executor::StatementExecutor;
use crate::filters::Filters;
use crate::model::{Model, Row};
use crate::query::builder::{NonePolicy, QueryBuilder, QueryConfig};
use crate::query::statement::{DataMap, DisableSpec, InsertData, JoinSpec, ListQuery, LoadSpec};
use crate::value::Value;

/// Statement-level CRUD over one model type.
pub struct Repository<M: Model, E: StatementExecutor> {
    executor: E,
    settings: RepositorySettings,
    queries: QueryBuilder,
    none_policy: NonePolicy,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model, E: StatementExecutor> Repository<M, E> {
    /// Creates a repository.
    ///
    /// # Errors
    ///
    /// Returns [`SqlRepoError::ConfigurationError`] if the settings carry an
    /// invalid column mapping.
    pub fn new(executor: E, settings: RepositorySettings) -> SqlRepoResult<Self> {
        let queries = QueryBuilder::new(QueryConfig::from_settings(&settings)?);
        let none_policy = NonePolicy::from_settings(&settings);
        Ok(Self {
            executor,
            settings,
            queries,
            none_policy,
            _model: PhantomData,
        })
    }

    /// Returns the executor.
    pub const fn executor(&self) -> &E {
        &self.executor
    }

    /// Returns the settings.
    pub const fn settings(&self) -> &RepositorySettings {
        &self.settings
    }

    /// Returns the query builder.
    pub const fn queries(&self) -> &QueryBuilder {
        &self.queries
    }

    async fn finish_write(&self) -> SqlRepoResult<()> {
        if self.settings.use_flush {
            self.executor.flush().await
        } else {
            self.executor.commit().await
        }
    }

    fn rows_to_items(rows: &[Row]) -> SqlRepoResult<Vec<M>> {
        rows.iter().map(M::from_row).collect()
    }

    /// Fetches at most one entity.
    pub async fn get(
        &self,
        filters: impl Into<Filters> + Send,
        joins: &[JoinSpec],
        loads: &[LoadSpec],
    ) -> SqlRepoResult<Option<M>> {
        let stmt = self
            .queries
            .get_item_stmt(M::meta(), &filters.into(), joins, loads)?;
        self.executor
            .fetch_optional(&stmt)
            .await?
            .as_ref()
            .map(M::from_row)
            .transpose()
    }

    /// Counts matching rows.
    pub async fn count(
        &self,
        filters: impl Into<Filters> + Send,
        joins: &[JoinSpec],
    ) -> SqlRepoResult<i64> {
        let stmt = self
            .queries
            .get_items_count_stmt(M::meta(), &filters.into(), joins)?;
        self.executor.fetch_count(&stmt).await
    }

    /// Fetches a list of entities.
    ///
    /// With `unique_list_items` set, entities repeated by joins are returned
    /// once, first occurrence kept.
    pub async fn list(&self, mut query: ListQuery) -> SqlRepoResult<Vec<M>> {
        query.unique_items |= self.settings.unique_list_items;
        let unique = query.unique_items;
        let stmt = self.queries.get_item_list_stmt(M::meta(), query)?;
        let items = Self::rows_to_items(&self.executor.fetch_all(&stmt).await?)?;
        if !unique {
            return Ok(items);
        }
        // Keyed by debug form: Value is not Hash.
        let mut seen = HashSet::with_capacity(items.len());
        Ok(items
            .into_iter()
            .filter(|item| match item.pk() {
                Some(pk) => seen.insert(format!("{pk:?}")),
                None => true,
            })
            .collect())
    }

    /// Inserts one entity, from `data` or from column defaults.
    pub async fn create_instance(&self, data: Option<DataMap>) -> SqlRepoResult<M> {
        let mut created = self.create(InsertData::from(data)).await?;
        if created.is_empty() {
            return Err(SqlRepoError::DatabaseError(format!(
                "insert into {} returned no rows",
                M::meta().db_table
            )));
        }
        Ok(created.swap_remove(0))
    }

    /// Inserts entities with one statement and returns them.
    ///
    /// An empty sequence of rows inserts nothing and leaves the session alone.
    pub async fn create(&self, data: impl Into<InsertData> + Send) -> SqlRepoResult<Vec<M>> {
        let Some(stmt) = self.queries.create_items_stmt(M::meta(), data.into())? else {
            return Ok(Vec::new());
        };
        let rows = self.executor.execute_returning(&stmt).await?;
        self.finish_write().await?;
        tracing::debug!(table = %M::meta().db_table, rows = rows.len(), "created items");
        Self::rows_to_items(&rows)
    }

    /// Updates matching rows and returns them.
    ///
    /// Returns `None` without touching the session when `data` is empty.
    pub async fn update(
        &self,
        data: DataMap,
        filters: impl Into<Filters> + Send,
    ) -> SqlRepoResult<Option<Vec<M>>> {
        let Some(stmt) = self
            .queries
            .update_stmt(M::meta(), data, &filters.into())?
        else {
            return Ok(None);
        };
        let rows = self.executor.execute_returning(&stmt).await?;
        self.finish_write().await?;
        Self::rows_to_items(&rows).map(Some)
    }

    /// Applies `data` to a loaded entity and persists the changed columns.
    pub async fn update_instance(&self, item: M, data: &DataMap) -> SqlRepoResult<(bool, M)> {
        let (changes, item) = self.queries.apply_changes(item, data, &self.none_policy)?;
        let Some(stmt) = self.queries.update_item_stmt(&item, &changes)? else {
            return Ok((false, item));
        };
        self.executor.execute(&stmt).await?;
        self.finish_write().await?;
        Ok((true, item))
    }

    /// Deletes matching rows and returns how many were removed.
    pub async fn delete(&self, filters: impl Into<Filters> + Send) -> SqlRepoResult<u64> {
        let stmt = self.queries.delete_stmt(M::meta(), &filters.into())?;
        let deleted = self.executor.execute(&stmt).await?;
        self.finish_write().await?;
        Ok(deleted)
    }

    /// Deletes one entity by primary key.
    pub async fn delete_item(&self, item: &M) -> SqlRepoResult<bool> {
        let stmt = self.queries.delete_item_stmt(item)?;
        let deleted = self.executor.execute(&stmt).await?;
        self.finish_write().await?;
        Ok(deleted > 0)
    }

    /// Soft-deletes rows by id and returns how many were updated.
    ///
    /// # Errors
    ///
    /// [`SqlRepoError::ImproperlyConfigured`] when `disable_id_field` or
    /// `disable_field` is unset or does not name a field of the model, and the
    /// [`DisableError`](sqlrepo_core::DisableError)s of
    /// [`QueryBuilder::make_disable_filters`].
    pub async fn disable(
        &self,
        ids_to_disable: Vec<Value>,
        extra_filters: impl Into<Filters> + Send,
    ) -> SqlRepoResult<u64> {
        let spec = self.disable_spec(ids_to_disable, extra_filters.into())?;
        let stmt = self.queries.disable_items_stmt(M::meta(), &spec)?;
        let disabled = self.executor.execute(&stmt).await?;
        self.finish_write().await?;
        tracing::debug!(table = %M::meta().db_table, disabled, "disabled items");
        Ok(disabled)
    }

    fn disable_spec(&self, ids: Vec<Value>, extra_filters: Filters) -> SqlRepoResult<DisableSpec> {
        let meta = M::meta();
        let (Some(id_field), Some(disable_field)) = (
            self.settings.disable_id_field.as_deref(),
            self.settings.disable_field.as_deref(),
        ) else {
            return Err(SqlRepoError::ImproperlyConfigured(
                "disable_id_field and disable_field must be set to disable items".to_string(),
            ));
        };
        if !meta.has_field(id_field) {
            return Err(SqlRepoError::ImproperlyConfigured(format!(
                "disable_id_field \"{id_field}\" is not a field of {}",
                meta.model_name
            )));
        }
        let field_type = meta
            .field(disable_field)
            .map(|field| field.field_type)
            .ok_or_else(|| {
                SqlRepoError::ImproperlyConfigured(format!(
                    "disable_field \"{disable_field}\" is not a field of {}",
                    meta.model_name
                ))
            })?;
        Ok(DisableSpec {
            id_field: id_field.to_string(),
            ids_to_disable: ids,
            disable_field: disable_field.to_string(),
            field_type,
            exclude_disabled: self.settings.allow_disable_filter_by_value,
            extra_filters,
        })
    }
}
