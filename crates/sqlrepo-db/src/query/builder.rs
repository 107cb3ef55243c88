//! The query builder.
//!
//! [`QueryBuilder`] turns call-scoped specs (filters, joins, loads, search,
//! ordering, pagination, insert/update data, disable requests) into
//! [`Statement`]s. It holds only its construction-time [`QueryConfig`]; every
//! operation is a pure function of its arguments and that configuration, so
//! one builder can be shared freely across threads.
//!
//! Unresolvable join and load names are not errors: the join or load is
//! skipped and logged, and the statement is built without it.
//!
//! # Examples
//!
//! ```ignore
//! let builder = QueryBuilder::new(QueryConfig::new(FilterConverter::DjangoLike));
//! let stmt = builder.get_item_list_stmt(
//!     MyModel::meta(),
//!     ListQuery {
//!         filters: FilterMap::new().with("name__icontains", "ab").into(),
//!         joins: vec!["other_models".into()],
//!         limit: Some(10),
//!         ..ListQuery::default()
//!     },
//! )?;
//! ```

use std::collections::{BTreeSet, HashMap};

use sqlrepo_core::logging::statement_span;
use sqlrepo_core::{
    AllowedNoneFields, DisableError, FilterError, LoadStrategyKind, RepositorySettings,
    SqlRepoError, SqlRepoResult,
};

use super::expr::{Column, Expr};
use super::predicate::Predicate;
use super::statement::{
    ColumnSpec, DataMap, Delete, DisableSpec, Insert, InsertData, InsertRow, Join, JoinKind, JoinSpec,
    ListQuery, Load, LoadSpec, OrderBy, Select, Statement, StatementBody, StatementKind, Update,
};
use crate::filters::{operators, FilterConverter, Filters};
use crate::model::{Model, ModelMeta};
use crate::value::Value;

/// Immutable builder configuration.
#[derive(Debug, Clone, Default)]
pub struct QueryConfig {
    /// The filter converter applied to filter maps.
    pub converter: FilterConverter,
    /// Bare names redirected to qualified columns.
    pub specific_column_mapping: HashMap<String, Column>,
    /// Strategy applied to relation-name loads.
    pub load_strategy: LoadStrategyKind,
}

impl QueryConfig {
    /// Creates a configuration with no column mapping and the default load
    /// strategy.
    pub fn new(converter: FilterConverter) -> Self {
        Self {
            converter,
            ..Self::default()
        }
    }

    /// Adds a specific-column mapping entry.
    #[must_use]
    pub fn with_column_mapping(mut self, name: impl Into<String>, column: Column) -> Self {
        self.specific_column_mapping.insert(name.into(), column);
        self
    }

    /// Sets the default load strategy.
    #[must_use]
    pub const fn with_load_strategy(mut self, strategy: LoadStrategyKind) -> Self {
        self.load_strategy = strategy;
        self
    }

    /// Builds a configuration from repository settings.
    ///
    /// # Errors
    ///
    /// Returns [`SqlRepoError::ConfigurationError`] if a column mapping value
    /// is not a `"table.column"` reference.
    pub fn from_settings(settings: &RepositorySettings) -> SqlRepoResult<Self> {
        let mut mapping = HashMap::with_capacity(settings.specific_column_mapping.len());
        for (name, reference) in &settings.specific_column_mapping {
            let column = Column::parse(reference).ok_or_else(|| {
                SqlRepoError::ConfigurationError(format!(
                    "specific_column_mapping[\"{name}\"] = \"{reference}\" is not a \"table.column\" reference"
                ))
            })?;
            mapping.insert(name.clone(), column);
        }
        Ok(Self {
            converter: settings.filter_convert_strategy.into(),
            specific_column_mapping: mapping,
            load_strategy: settings.load_strategy,
        })
    }
}

/// Which fields an instance update may overwrite with NULL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NonePolicy {
    /// Incoming nulls are skipped.
    #[default]
    Deny,
    /// Any field may be nulled.
    AllowAll,
    /// Only the listed fields may be nulled.
    AllowOnly(BTreeSet<String>),
}

impl NonePolicy {
    /// Derives the policy from `update_set_none` and
    /// `update_allowed_none_fields`.
    pub fn from_settings(settings: &RepositorySettings) -> Self {
        if !settings.update_set_none {
            return Self::Deny;
        }
        match &settings.update_allowed_none_fields {
            AllowedNoneFields::All => Self::AllowAll,
            AllowedNoneFields::Only(fields) => Self::AllowOnly(fields.clone()),
        }
    }

    /// Returns `true` if `field` may be set to NULL.
    pub fn allows(&self, field: &str) -> bool {
        match self {
            Self::Deny => false,
            Self::AllowAll => true,
            Self::AllowOnly(fields) => fields.contains(field),
        }
    }
}

/// The outcome of [`QueryBuilder::apply_changes`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ItemChanges {
    /// The entity's primary key before the changes.
    pub key: Option<Value>,
    /// Changed field names, in data order.
    pub fields: Vec<String>,
}

impl ItemChanges {
    /// Returns `true` if no field changed.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Builds statements from call-scoped specs.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    config: QueryConfig,
}

impl QueryBuilder {
    /// Creates a builder.
    pub const fn new(config: QueryConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    pub const fn config(&self) -> &QueryConfig {
        &self.config
    }

    // ── Resolution ───────────────────────────────────────────────────

    /// Substitutes mapped columns for bare names; everything else passes
    /// through unchanged.
    pub fn resolve_specific_columns(&self, elements: Vec<ColumnSpec>) -> Vec<ColumnSpec> {
        elements
            .into_iter()
            .map(|element| self.resolve_column(element))
            .collect()
    }

    /// Appends the requested joins to `select`.
    ///
    /// Relation names are looked up on every model already in the statement.
    /// Unresolvable joins are logged and skipped.
    pub fn resolve_joins(&self, mut select: Select, joins: &[JoinSpec]) -> Select {
        for spec in joins {
            match resolve_join(&select, spec) {
                Some(join) => select.joins.push(join),
                None => tracing::warn!(join = ?describe_join(spec), "can't resolve join; skipping"),
            }
        }
        select
    }

    /// Appends the requested eager loads to `select`.
    ///
    /// Relation names resolve like joins and carry the configured strategy.
    /// Unresolvable names are skipped.
    pub fn resolve_loads(&self, mut select: Select, loads: &[LoadSpec]) -> Select {
        for spec in loads {
            match spec {
                LoadSpec::Directive(load) => select.loads.push(load.clone()),
                LoadSpec::Relation(name) => {
                    if select
                        .models()
                        .any(|meta| meta.relationship(name).is_some())
                    {
                        select
                            .loads
                            .push(Load::new(name.clone(), self.config.load_strategy));
                    } else {
                        tracing::debug!(load = %name, "can't resolve load; skipping");
                    }
                }
            }
        }
        select
    }

    /// Converts filters for `meta` with the configured converter.
    pub fn resolve_filters(
        &self,
        meta: &ModelMeta,
        filters: &Filters,
    ) -> SqlRepoResult<Vec<Predicate>> {
        self.config.converter.convert(meta, filters)
    }

    /// Builds the case-insensitive search predicate.
    ///
    /// One `ILIKE '%term%'` per field, ORed (or ANDed when `conjunctive`).
    /// Returns `None` when the term is missing or empty, or there is no field.
    pub fn make_search_filter(
        &self,
        meta: &ModelMeta,
        search: Option<&str>,
        search_by: &[ColumnSpec],
        conjunctive: bool,
    ) -> SqlRepoResult<Option<Predicate>> {
        let Some(term) = search.filter(|term| !term.is_empty()) else {
            return Ok(None);
        };
        if search_by.is_empty() {
            return Ok(None);
        }
        let pattern = format!("%{term}%");
        let mut terms = Vec::with_capacity(search_by.len());
        for field in self.resolve_specific_columns(search_by.to_vec()) {
            let expr = match field {
                ColumnSpec::Expr(expr) => expr,
                ColumnSpec::Name(name) => meta.field_expr(&name).ok_or_else(|| {
                    FilterError::new(
                        format!("'{name}'"),
                        format!("Model {} has no field \"{name}\".", meta.model_name),
                    )
                })?,
            };
            terms.push(expr.ilike(pattern.as_str()));
        }
        Ok(Some(if conjunctive {
            Predicate::and_all(terms)
        } else {
            Predicate::or_all(terms)
        }))
    }

    fn resolve_column(&self, element: ColumnSpec) -> ColumnSpec {
        match element {
            ColumnSpec::Name(name) => match self.config.specific_column_mapping.get(&name) {
                Some(column) => ColumnSpec::Expr(Expr::Column(column.clone())),
                None => ColumnSpec::Name(name),
            },
            expr @ ColumnSpec::Expr(_) => expr,
        }
    }

    fn resolve_order_by(&self, order_by: Vec<OrderBy>) -> Vec<OrderBy> {
        order_by
            .into_iter()
            .map(|entry| OrderBy {
                target: self.resolve_column(entry.target),
                descending: entry.descending,
            })
            .collect()
    }

    // ── SELECT statements ────────────────────────────────────────────

    fn filtered_select(
        &self,
        select: Select,
        meta: &ModelMeta,
        filters: &Filters,
        joins: &[JoinSpec],
    ) -> SqlRepoResult<Select> {
        let mut select = self.resolve_joins(select, joins);
        select.filters.extend(self.resolve_filters(meta, filters)?);
        Ok(select)
    }

    /// Builds a fetch-one statement.
    pub fn get_item_stmt(
        &self,
        meta: &'static ModelMeta,
        filters: &Filters,
        joins: &[JoinSpec],
        loads: &[LoadSpec],
    ) -> SqlRepoResult<Statement> {
        let _span = statement_span(StatementKind::FetchOne.as_str(), &meta.db_table).entered();
        let select = self.filtered_select(Select::new(meta), meta, filters, joins)?;
        let select = self.resolve_loads(select, loads);
        Ok(finish(StatementKind::FetchOne, StatementBody::Select(select)))
    }

    /// Builds a count statement: `SELECT count(*) FROM table [joins] [where]`.
    pub fn get_items_count_stmt(
        &self,
        meta: &'static ModelMeta,
        filters: &Filters,
        joins: &[JoinSpec],
    ) -> SqlRepoResult<Statement> {
        let _span = statement_span(StatementKind::Count.as_str(), &meta.db_table).entered();
        let select = self.filtered_select(Select::count(meta), meta, filters, joins)?;
        Ok(finish(StatementKind::Count, StatementBody::Select(select)))
    }

    /// Builds a fetch-list statement.
    pub fn get_item_list_stmt(
        &self,
        meta: &'static ModelMeta,
        query: ListQuery,
    ) -> SqlRepoResult<Statement> {
        let _span = statement_span(StatementKind::FetchList.as_str(), &meta.db_table).entered();
        let select = self.filtered_select(Select::new(meta), meta, &query.filters, &query.joins)?;
        let mut select = self.resolve_loads(select, &query.loads);
        if let Some(search) = self.make_search_filter(
            meta,
            query.search.as_deref(),
            &query.search_by,
            query.search_conjunctive,
        )? {
            select.filters.push(search);
        }
        select.order_by = self.resolve_order_by(query.order_by);
        select.limit = query.limit;
        select.offset = query.offset;
        select.unique = query.unique_items;
        Ok(finish(StatementKind::FetchList, StatementBody::Select(select)))
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Builds one multi-row `INSERT ... RETURNING *`.
    ///
    /// Returns `None` for an empty sequence of rows.
    pub fn create_items_stmt(
        &self,
        meta: &'static ModelMeta,
        data: InsertData,
    ) -> SqlRepoResult<Option<Statement>> {
        let _span = statement_span(StatementKind::Insert.as_str(), &meta.db_table).entered();
        let rows = match data {
            InsertData::Default => vec![InsertRow::Default],
            InsertData::One(map) => vec![InsertRow::Values(column_values(meta, map)?)],
            InsertData::Many(items) => items
                .into_iter()
                .map(|item| match item {
                    Some(map) => column_values(meta, map).map(InsertRow::Values),
                    None => Ok(InsertRow::Default),
                })
                .collect::<SqlRepoResult<Vec<_>>>()?,
        };
        if rows.is_empty() {
            return Ok(None);
        }
        Ok(Some(finish(
            StatementKind::Insert,
            StatementBody::Insert(Insert { target: meta, rows }),
        )))
    }

    /// Builds `UPDATE ... SET ... WHERE ... RETURNING *`.
    ///
    /// Returns `None` when `data` is empty.
    pub fn update_stmt(
        &self,
        meta: &'static ModelMeta,
        data: DataMap,
        filters: &Filters,
    ) -> SqlRepoResult<Option<Statement>> {
        let _span = statement_span(StatementKind::Update.as_str(), &meta.db_table).entered();
        if data.is_empty() {
            return Ok(None);
        }
        let values = column_values(meta, data)?;
        let filters = self.resolve_filters(meta, filters)?;
        Ok(Some(finish(
            StatementKind::Update,
            StatementBody::Update(Update {
                target: meta,
                values,
                filters,
                returning: true,
            }),
        )))
    }

    /// Applies `data` to a loaded entity in memory.
    ///
    /// Fields whose value would not change are skipped, as are incoming
    /// nulls the policy does not allow. Returns whether anything changed.
    pub fn change_item<M: Model>(
        &self,
        item: M,
        data: &DataMap,
        policy: &NonePolicy,
    ) -> SqlRepoResult<(bool, M)> {
        let (changes, item) = self.apply_changes(item, data, policy)?;
        Ok((!changes.is_empty(), item))
    }

    /// Like [`change_item`](Self::change_item), but reports which fields
    /// changed and the primary key the entity had before.
    pub fn apply_changes<M: Model>(
        &self,
        mut item: M,
        data: &DataMap,
        policy: &NonePolicy,
    ) -> SqlRepoResult<(ItemChanges, M)> {
        let mut changes = ItemChanges {
            key: item.pk(),
            fields: Vec::new(),
        };
        for (field, value) in data.iter() {
            if value.is_null() && !policy.allows(field) {
                continue;
            }
            let current = item.field_value(field).ok_or_else(|| {
                SqlRepoError::ModelError(format!(
                    "Model {} has no field \"{field}\".",
                    M::meta().model_name
                ))
            })?;
            if current == *value {
                continue;
            }
            item.set_field_value(field, value.clone())?;
            if !changes.fields.iter().any(|name| name == field) {
                changes.fields.push(field.to_string());
            }
        }
        Ok((changes, item))
    }

    /// Builds an UPDATE writing only the changed columns of `item`, matched by
    /// the primary key it had before the changes.
    ///
    /// Returns `None` when nothing changed.
    pub fn update_item_stmt<M: Model>(
        &self,
        item: &M,
        changes: &ItemChanges,
    ) -> SqlRepoResult<Option<Statement>> {
        let meta = M::meta();
        if changes.is_empty() {
            return Ok(None);
        }
        let pk = key_predicate(meta, changes.key.clone())?;
        let values = changes
            .fields
            .iter()
            .map(|field| {
                let column = meta.column(field);
                let value = item.field_value(field);
                column.zip(value).map(|(column, value)| (column.name, value)).ok_or_else(|| {
                    SqlRepoError::ModelError(format!(
                        "Model {} has no column field \"{field}\".",
                        meta.model_name
                    ))
                })
            })
            .collect::<SqlRepoResult<Vec<_>>>()?;
        Ok(Some(finish(
            StatementKind::Update,
            StatementBody::Update(Update {
                target: meta,
                values,
                filters: vec![pk],
                returning: false,
            }),
        )))
    }

    /// Builds a DELETE over rows matching `filters`.
    pub fn delete_stmt(
        &self,
        meta: &'static ModelMeta,
        filters: &Filters,
    ) -> SqlRepoResult<Statement> {
        let _span = statement_span(StatementKind::Delete.as_str(), &meta.db_table).entered();
        let filters = self.resolve_filters(meta, filters)?;
        Ok(finish(
            StatementKind::Delete,
            StatementBody::Delete(Delete {
                target: meta,
                filters,
            }),
        ))
    }

    /// Builds a DELETE of one entity by primary key.
    pub fn delete_item_stmt<M: Model>(&self, item: &M) -> SqlRepoResult<Statement> {
        let pk = pk_predicate(item)?;
        Ok(finish(
            StatementKind::Delete,
            StatementBody::Delete(Delete {
                target: M::meta(),
                filters: vec![pk],
            }),
        ))
    }

    // ── Disable ──────────────────────────────────────────────────────

    /// Builds the WHERE predicates of a disable request.
    ///
    /// `id IN ids`, then (with `exclude_disabled`) `field IS NOT true` for a
    /// boolean field or `field IS NULL` for a timestamp field, then the extra
    /// filters.
    ///
    /// # Errors
    ///
    /// [`DisableError::EmptyIds`] for an empty id set,
    /// [`DisableError::UnsupportedFieldType`] for a field that is neither
    /// boolean nor timestamp.
    pub fn make_disable_filters(
        &self,
        meta: &ModelMeta,
        spec: &DisableSpec,
    ) -> SqlRepoResult<Vec<Predicate>> {
        check_disable_preconditions(spec)?;
        let id_field = disable_attribute(meta, &spec.id_field)?;
        let disable_field = disable_attribute(meta, &spec.disable_field)?;

        let mut filters = vec![id_field.in_(spec.ids_to_disable.iter().cloned())];
        if spec.exclude_disabled {
            let exclusion = if spec.field_type.is_boolean() {
                operators::is_not(disable_field, Value::Bool(true))
            } else {
                operators::is_(disable_field, Value::Null)
            };
            filters.push(exclusion);
        }
        filters.extend(self.resolve_filters(meta, &spec.extra_filters)?);
        Ok(filters)
    }

    /// Builds the disable UPDATE: sets the disable field to `true` or to the
    /// current UTC instant on the matched rows.
    pub fn disable_items_stmt(
        &self,
        meta: &'static ModelMeta,
        spec: &DisableSpec,
    ) -> SqlRepoResult<Statement> {
        let _span = statement_span(StatementKind::Disable.as_str(), &meta.db_table).entered();
        let filters = self.make_disable_filters(meta, spec)?;
        let column = meta.column(&spec.disable_field).ok_or_else(|| {
            SqlRepoError::ImproperlyConfigured(format!(
                "disable field \"{}\" is not a column of {}",
                spec.disable_field, meta.model_name
            ))
        })?;
        let value = if spec.field_type.is_boolean() {
            Value::Bool(true)
        } else {
            Value::DateTimeTz(chrono::Utc::now())
        };
        Ok(finish(
            StatementKind::Disable,
            StatementBody::Update(Update {
                target: meta,
                values: vec![(column.name, value)],
                filters,
                returning: false,
            }),
        ))
    }
}

fn finish(kind: StatementKind, body: StatementBody) -> Statement {
    let statement = Statement { kind, body };
    tracing::trace!(?statement, "built statement");
    statement
}

fn describe_join(spec: &JoinSpec) -> String {
    match spec {
        JoinSpec::Model(meta) | JoinSpec::On(meta, _) | JoinSpec::OnWith(meta, _, _) => {
            meta.model_name.to_string()
        }
        JoinSpec::Relation { name, .. } => name.clone(),
    }
}

fn resolve_join(select: &Select, spec: &JoinSpec) -> Option<Join> {
    match spec {
        JoinSpec::Relation { name, options } => select.models().find_map(|owner| {
            owner.relationship(name).map(|rel| Join {
                target: rel.target_meta(),
                kind: options.kind(),
                on: rel.join_condition(owner),
            })
        }),
        JoinSpec::Model(target) => {
            let target = *target;
            let on = select.models().find_map(|present| {
                present
                    .relationship_to(target)
                    .map(|rel| rel.join_condition(present))
                    .or_else(|| {
                        target
                            .relationship_to(present)
                            .map(|rel| rel.join_condition(target))
                    })
            })?;
            Some(Join {
                target,
                kind: JoinKind::Inner,
                on,
            })
        }
        JoinSpec::On(target, on) => Some(Join {
            target: *target,
            kind: JoinKind::Inner,
            on: on.clone(),
        }),
        JoinSpec::OnWith(target, on, options) => Some(Join {
            target: *target,
            kind: options.kind(),
            on: on.clone(),
        }),
    }
}

fn column_values(meta: &ModelMeta, data: DataMap) -> SqlRepoResult<Vec<(String, Value)>> {
    data.into_iter()
        .map(|(field, value)| {
            meta.column(&field)
                .map(|column| (column.name, value))
                .ok_or_else(|| {
                    SqlRepoError::ModelError(format!(
                        "Model {} has no column field \"{field}\".",
                        meta.model_name
                    ))
                })
        })
        .collect()
}

fn pk_predicate<M: Model>(item: &M) -> SqlRepoResult<Predicate> {
    key_predicate(M::meta(), item.pk())
}

fn key_predicate(meta: &ModelMeta, key: Option<Value>) -> SqlRepoResult<Predicate> {
    let pk_field = meta.pk_field().ok_or_else(|| {
        SqlRepoError::ModelError(format!("Model {} has no primary key", meta.model_name))
    })?;
    let pk = key.ok_or_else(|| {
        SqlRepoError::ModelError(format!(
            "{} instance has no primary key value",
            meta.model_name
        ))
    })?;
    Ok(pk_field.expr(&meta.db_table).eq(pk))
}

fn check_disable_preconditions(spec: &DisableSpec) -> Result<(), DisableError> {
    if spec.ids_to_disable.is_empty() {
        return Err(DisableError::EmptyIds);
    }
    if !spec.field_type.is_boolean() && !spec.field_type.is_timestamp() {
        return Err(DisableError::UnsupportedFieldType {
            field: spec.disable_field.clone(),
            field_type: spec.field_type.to_string(),
        });
    }
    Ok(())
}

fn disable_attribute(meta: &ModelMeta, name: &str) -> SqlRepoResult<Expr> {
    meta.field_expr(name).ok_or_else(|| {
        SqlRepoError::ImproperlyConfigured(format!(
            "Model {} has no field \"{name}\" to disable by",
            meta.model_name
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_policy_from_settings() {
        let mut settings = RepositorySettings::default();
        assert_eq!(NonePolicy::from_settings(&settings), NonePolicy::Deny);

        settings.update_set_none = true;
        assert_eq!(NonePolicy::from_settings(&settings), NonePolicy::AllowAll);

        settings.update_allowed_none_fields =
            AllowedNoneFields::Only(["name".to_string()].into_iter().collect());
        let policy = NonePolicy::from_settings(&settings);
        assert!(policy.allows("name"));
        assert!(!policy.allows("dt"));
    }

    #[test]
    fn test_config_from_settings() {
        let mut settings = RepositorySettings::default();
        settings
            .specific_column_mapping
            .insert("other_id".to_string(), "other_model.id".to_string());
        settings.load_strategy = LoadStrategyKind::Joined;
        let config = QueryConfig::from_settings(&settings).unwrap();
        assert_eq!(
            config.specific_column_mapping.get("other_id"),
            Some(&Column::new("other_model", "id"))
        );
        assert_eq!(config.load_strategy, LoadStrategyKind::Joined);
        assert_eq!(config.converter, FilterConverter::Simple);
    }

    #[test]
    fn test_config_from_settings_rejects_bad_reference() {
        let mut settings = RepositorySettings::default();
        settings
            .specific_column_mapping
            .insert("x".to_string(), "no_dot".to_string());
        assert!(matches!(
            QueryConfig::from_settings(&settings),
            Err(SqlRepoError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_resolve_specific_columns() {
        let builder = QueryBuilder::new(
            QueryConfig::default()
                .with_column_mapping("other_model_id", Column::new("other_model", "id")),
        );
        let out = builder.resolve_specific_columns(vec![
            "other_model_id".into(),
            "not_presented_field".into(),
            Expr::column("my_model", "name").into(),
        ]);
        assert_eq!(
            out,
            vec![
                ColumnSpec::Expr(Expr::column("other_model", "id")),
                ColumnSpec::Name("not_presented_field".into()),
                ColumnSpec::Expr(Expr::column("my_model", "name")),
            ]
        );
    }

    #[test]
    fn test_builder_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<QueryBuilder>();
    }
}
