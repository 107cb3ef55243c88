//! Built statements and the call-scoped specs that shape them.
//!
//! A [`Statement`] is what the query builder produces and what executors
//! consume: a [`StatementKind`] tag plus a SELECT, INSERT, UPDATE or DELETE
//! body. Statements are plain data. The compiler renders them to SQL; the
//! builder never touches a connection.

use std::fmt;

use sqlrepo_core::LoadStrategyKind;

use super::expr::Expr;
use super::predicate::Predicate;
use crate::fields::FieldType;
use crate::filters::{FilterMap, Filters};
use crate::model::ModelMeta;
use crate::value::Value;

/// Field name to value map used for inserts and updates.
pub type DataMap = FilterMap;

/// What a statement is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    /// Fetch at most one entity.
    FetchOne,
    /// Count matching rows.
    Count,
    /// Fetch a list of entities.
    FetchList,
    /// Insert rows and return them.
    Insert,
    /// Update rows matched by filters and return them.
    Update,
    /// Delete rows.
    Delete,
    /// Soft-delete rows by id.
    Disable,
}

impl StatementKind {
    /// A short label used in logs and spans.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FetchOne => "fetch-one",
            Self::Count => "count",
            Self::FetchList => "fetch-list",
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Disable => "disable",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Joins ────────────────────────────────────────────────────────────

/// The type of SQL JOIN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinKind {
    /// INNER JOIN
    Inner,
    /// LEFT OUTER JOIN
    LeftOuter,
    /// FULL OUTER JOIN
    FullOuter,
}

impl JoinKind {
    /// Returns the SQL keyword(s) for this join type.
    pub const fn sql_keyword(self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::LeftOuter => "LEFT OUTER JOIN",
            Self::FullOuter => "FULL OUTER JOIN",
        }
    }
}

/// Flags for explicit joins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinOptions {
    /// LEFT OUTER JOIN.
    pub isouter: bool,
    /// FULL OUTER JOIN. Takes precedence over `isouter`.
    pub full: bool,
}

impl JoinOptions {
    /// Outer join options.
    pub const fn outer() -> Self {
        Self {
            isouter: true,
            full: false,
        }
    }

    /// Full join options.
    pub const fn full() -> Self {
        Self {
            isouter: false,
            full: true,
        }
    }

    /// The join type these flags select.
    pub const fn kind(self) -> JoinKind {
        if self.full {
            JoinKind::FullOuter
        } else if self.isouter {
            JoinKind::LeftOuter
        } else {
            JoinKind::Inner
        }
    }
}

/// A join request as the caller states it.
#[derive(Debug, Clone)]
pub enum JoinSpec {
    /// Join a model; the ON clause is inferred from a relationship.
    Model(&'static ModelMeta),
    /// Join through a named relationship of a model already in the statement.
    Relation {
        /// The relationship name.
        name: String,
        /// Join flags.
        options: JoinOptions,
    },
    /// Join a model with an explicit ON clause.
    On(&'static ModelMeta, Predicate),
    /// Join a model with an explicit ON clause and flags.
    OnWith(&'static ModelMeta, Predicate, JoinOptions),
}

impl JoinSpec {
    /// Join through a relationship name with default flags.
    pub fn relation(name: impl Into<String>) -> Self {
        Self::Relation {
            name: name.into(),
            options: JoinOptions::default(),
        }
    }
}

impl From<&str> for JoinSpec {
    fn from(name: &str) -> Self {
        Self::relation(name)
    }
}

impl From<String> for JoinSpec {
    fn from(name: String) -> Self {
        Self::relation(name)
    }
}

impl From<&'static ModelMeta> for JoinSpec {
    fn from(meta: &'static ModelMeta) -> Self {
        Self::Model(meta)
    }
}

/// A resolved join clause.
#[derive(Debug, Clone)]
pub struct Join {
    /// The joined model.
    pub target: &'static ModelMeta,
    /// The join type.
    pub kind: JoinKind,
    /// The ON condition.
    pub on: Predicate,
}

impl PartialEq for Join {
    fn eq(&self, other: &Self) -> bool {
        self.target.same_as(other.target) && self.kind == other.kind && self.on == other.on
    }
}

// ── Loads ────────────────────────────────────────────────────────────

/// A resolved eager-load option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Load {
    /// The relationship to load.
    pub relation: String,
    /// How to load it.
    pub strategy: LoadStrategyKind,
}

impl Load {
    /// Creates a load directive.
    pub fn new(relation: impl Into<String>, strategy: LoadStrategyKind) -> Self {
        Self {
            relation: relation.into(),
            strategy,
        }
    }
}

/// An eager-load request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadSpec {
    /// A relationship name, loaded with the configured strategy.
    Relation(String),
    /// A pre-built load, used as given.
    Directive(Load),
}

impl From<&str> for LoadSpec {
    fn from(name: &str) -> Self {
        Self::Relation(name.to_string())
    }
}

impl From<String> for LoadSpec {
    fn from(name: String) -> Self {
        Self::Relation(name)
    }
}

impl From<Load> for LoadSpec {
    fn from(load: Load) -> Self {
        Self::Directive(load)
    }
}

// ── Columns & ordering ───────────────────────────────────────────────

/// A column reference given either by name or as an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnSpec {
    /// A bare name, subject to the specific-column mapping.
    Name(String),
    /// A resolved expression.
    Expr(Expr),
}

impl From<&str> for ColumnSpec {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for ColumnSpec {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<Expr> for ColumnSpec {
    fn from(expr: Expr) -> Self {
        Self::Expr(expr)
    }
}

/// One ORDER BY entry.
///
/// A [`ColumnSpec::Name`] that the column mapping does not redirect is
/// emitted verbatim, so `"name DESC"` works as a literal ordering token.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    /// What to order by.
    pub target: ColumnSpec,
    /// Whether to sort in descending order.
    pub descending: bool,
}

impl OrderBy {
    /// Creates an ascending order.
    pub fn asc(target: impl Into<ColumnSpec>) -> Self {
        Self {
            target: target.into(),
            descending: false,
        }
    }

    /// Creates a descending order.
    pub fn desc(target: impl Into<ColumnSpec>) -> Self {
        Self {
            target: target.into(),
            descending: true,
        }
    }
}

impl From<&str> for OrderBy {
    fn from(token: &str) -> Self {
        Self::asc(token)
    }
}

impl From<Expr> for OrderBy {
    fn from(expr: Expr) -> Self {
        Self::asc(expr)
    }
}

// ── Statement bodies ─────────────────────────────────────────────────

/// What a SELECT projects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// Every column of every entity.
    Entities,
    /// `count(*)`.
    Count,
}

/// A SELECT statement.
#[derive(Debug, Clone)]
pub struct Select {
    /// Models selected from (the primary entity first).
    pub entities: Vec<&'static ModelMeta>,
    /// What the statement returns.
    pub projection: Projection,
    /// Join clauses, in order.
    pub joins: Vec<Join>,
    /// WHERE predicates, ANDed.
    pub filters: Vec<Predicate>,
    /// Eager-load options for the executor.
    pub loads: Vec<Load>,
    /// ORDER BY entries, in order.
    pub order_by: Vec<OrderBy>,
    /// LIMIT.
    pub limit: Option<u64>,
    /// OFFSET.
    pub offset: Option<u64>,
    /// Deduplicate result entities.
    pub unique: bool,
}

impl Select {
    /// `SELECT <entity> FROM <table>`.
    pub fn new(entity: &'static ModelMeta) -> Self {
        Self {
            entities: vec![entity],
            projection: Projection::Entities,
            joins: Vec::new(),
            filters: Vec::new(),
            loads: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            unique: false,
        }
    }

    /// `SELECT count(*) FROM <table>`.
    pub fn count(entity: &'static ModelMeta) -> Self {
        Self {
            projection: Projection::Count,
            ..Self::new(entity)
        }
    }

    /// Models present in the statement: entities, then joined targets.
    pub fn models(&self) -> impl Iterator<Item = &'static ModelMeta> + '_ {
        self.entities
            .iter()
            .copied()
            .chain(self.joins.iter().map(|join| join.target))
    }
}

/// One INSERT row.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertRow {
    /// A row of column defaults.
    Default,
    /// Explicit `(column, value)` pairs.
    Values(Vec<(String, Value)>),
}

/// An INSERT ... RETURNING statement.
#[derive(Debug, Clone)]
pub struct Insert {
    /// The target model.
    pub target: &'static ModelMeta,
    /// The rows, in order. At least one.
    pub rows: Vec<InsertRow>,
}

/// An UPDATE statement.
#[derive(Debug, Clone)]
pub struct Update {
    /// The target model.
    pub target: &'static ModelMeta,
    /// `(column, value)` assignments.
    pub values: Vec<(String, Value)>,
    /// WHERE predicates, ANDed.
    pub filters: Vec<Predicate>,
    /// Whether the updated rows are returned.
    pub returning: bool,
}

/// A DELETE statement.
#[derive(Debug, Clone)]
pub struct Delete {
    /// The target model.
    pub target: &'static ModelMeta,
    /// WHERE predicates, ANDed.
    pub filters: Vec<Predicate>,
}

/// The body of a statement.
#[derive(Debug, Clone)]
pub enum StatementBody {
    /// SELECT.
    Select(Select),
    /// INSERT.
    Insert(Insert),
    /// UPDATE.
    Update(Update),
    /// DELETE.
    Delete(Delete),
}

/// A built statement.
#[derive(Debug, Clone)]
pub struct Statement {
    /// What the statement is for.
    pub kind: StatementKind,
    /// The statement itself.
    pub body: StatementBody,
}

impl Statement {
    /// Returns the SELECT body, if any.
    pub const fn as_select(&self) -> Option<&Select> {
        match &self.body {
            StatementBody::Select(select) => Some(select),
            _ => None,
        }
    }

    /// Returns the INSERT body, if any.
    pub const fn as_insert(&self) -> Option<&Insert> {
        match &self.body {
            StatementBody::Insert(insert) => Some(insert),
            _ => None,
        }
    }

    /// Returns the UPDATE body, if any.
    pub const fn as_update(&self) -> Option<&Update> {
        match &self.body {
            StatementBody::Update(update) => Some(update),
            _ => None,
        }
    }

    /// Returns the DELETE body, if any.
    pub const fn as_delete(&self) -> Option<&Delete> {
        match &self.body {
            StatementBody::Delete(delete) => Some(delete),
            _ => None,
        }
    }

    /// The primary table the statement reads or writes.
    pub fn table(&self) -> &str {
        match &self.body {
            StatementBody::Select(select) => select
                .entities
                .first()
                .map_or("", |meta| meta.db_table.as_str()),
            StatementBody::Insert(insert) => &insert.target.db_table,
            StatementBody::Update(update) => &update.target.db_table,
            StatementBody::Delete(delete) => &delete.target.db_table,
        }
    }
}

// ── Request shapes ───────────────────────────────────────────────────

/// Rows for an insert statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum InsertData {
    /// One row of defaults.
    #[default]
    Default,
    /// One explicit row.
    One(DataMap),
    /// One row per element; `None` elements are rows of defaults.
    Many(Vec<Option<DataMap>>),
}

impl From<DataMap> for InsertData {
    fn from(data: DataMap) -> Self {
        Self::One(data)
    }
}

impl From<Option<DataMap>> for InsertData {
    fn from(data: Option<DataMap>) -> Self {
        data.map_or(Self::Default, Self::One)
    }
}

impl From<Vec<Option<DataMap>>> for InsertData {
    fn from(rows: Vec<Option<DataMap>>) -> Self {
        Self::Many(rows)
    }
}

/// Parameters of a fetch-list statement.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    /// Filters.
    pub filters: Filters,
    /// Joins.
    pub joins: Vec<JoinSpec>,
    /// Eager loads.
    pub loads: Vec<LoadSpec>,
    /// Free-text search term.
    pub search: Option<String>,
    /// Fields searched by `search`.
    pub search_by: Vec<ColumnSpec>,
    /// AND the search terms instead of ORing them.
    pub search_conjunctive: bool,
    /// ORDER BY entries.
    pub order_by: Vec<OrderBy>,
    /// LIMIT.
    pub limit: Option<u64>,
    /// OFFSET.
    pub offset: Option<u64>,
    /// Deduplicate result entities.
    pub unique_items: bool,
}

/// A bulk soft-delete request.
#[derive(Debug, Clone)]
pub struct DisableSpec {
    /// The field the ids are matched against.
    pub id_field: String,
    /// Ids of the rows to disable. Must not be empty.
    pub ids_to_disable: Vec<Value>,
    /// The boolean or timestamp field that marks a row as disabled.
    pub disable_field: String,
    /// The declared type of `disable_field`.
    pub field_type: FieldType,
    /// Skip rows that are already disabled.
    pub exclude_disabled: bool,
    /// Additional filters, ANDed.
    pub extra_filters: Filters,
}
