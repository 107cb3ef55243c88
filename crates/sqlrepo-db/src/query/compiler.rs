//! SQL compiler.
//!
//! [`SqlCompiler`] renders a built [`Statement`] into a parameterized SQL
//! string plus its bound values. PostgreSQL uses `$1, $2, ...` placeholders;
//! SQLite and MySQL use `?`. Lookups with no portable spelling (ILIKE, regex
//! match, date-part extraction, date/time casts) are emitted per backend.
//!
//! Eager loads and result de-duplication are executor concerns and do not
//! appear in the SQL.

use super::expr::{CastType, DatePart, Expr};
use super::predicate::Predicate;
use super::statement::{
    ColumnSpec, Delete, Insert, InsertRow, Projection, Select, Statement, StatementBody, Update,
};
use crate::value::Value;

/// The type of database backend, used by the compiler to generate
/// backend-specific SQL syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackendType {
    /// PostgreSQL (uses `$1, $2, ...` placeholders).
    PostgreSQL,
    /// SQLite (uses `?` placeholders).
    SQLite,
    /// MySQL (uses `?` placeholders).
    MySQL,
}

/// Translates statements into parameterized SQL.
#[derive(Debug, Clone, Copy)]
pub struct SqlCompiler {
    backend: DatabaseBackendType,
}

impl SqlCompiler {
    /// Creates a new compiler for the given backend type.
    pub const fn new(backend: DatabaseBackendType) -> Self {
        Self { backend }
    }

    /// Returns the backend this compiler targets.
    pub const fn backend(&self) -> DatabaseBackendType {
        self.backend
    }

    /// Returns a parameter placeholder for the given 1-based index.
    fn placeholder(&self, index: usize) -> String {
        match self.backend {
            DatabaseBackendType::PostgreSQL => format!("${index}"),
            DatabaseBackendType::SQLite | DatabaseBackendType::MySQL => "?".to_string(),
        }
    }

    /// Binds `value` and returns its placeholder.
    fn bind(&self, value: &Value, params: &mut Vec<Value>) -> String {
        params.push(value.clone());
        self.placeholder(params.len())
    }

    /// Compiles any statement.
    pub fn compile(&self, statement: &Statement) -> (String, Vec<Value>) {
        match &statement.body {
            StatementBody::Select(select) => self.compile_select(select),
            StatementBody::Insert(insert) => self.compile_insert(insert),
            StatementBody::Update(update) => self.compile_update(update),
            StatementBody::Delete(delete) => self.compile_delete(delete),
        }
    }

    /// Compiles a SELECT statement.
    pub fn compile_select(&self, select: &Select) -> (String, Vec<Value>) {
        let mut params: Vec<Value> = Vec::new();
        let mut sql = String::from("SELECT ");

        match select.projection {
            Projection::Count => sql.push_str("count(*)"),
            Projection::Entities => {
                let parts: Vec<String> = select
                    .entities
                    .iter()
                    .map(|meta| format!("\"{}\".*", meta.db_table))
                    .collect();
                sql.push_str(&parts.join(", "));
            }
        }

        // FROM
        let tables: Vec<String> = select
            .entities
            .iter()
            .map(|meta| format!("\"{}\"", meta.db_table))
            .collect();
        sql.push_str(&format!(" FROM {}", tables.join(", ")));

        // JOINs
        for join in &select.joins {
            sql.push_str(&format!(
                " {} \"{}\" ON ",
                join.kind.sql_keyword(),
                join.target.db_table
            ));
            self.compile_predicate(&join.on, &mut sql, &mut params);
        }

        self.compile_where(&select.filters, &mut sql, &mut params);

        // ORDER BY
        if !select.order_by.is_empty() {
            let orders: Vec<String> = select
                .order_by
                .iter()
                .map(|order| {
                    let mut target = match &order.target {
                        ColumnSpec::Name(token) => token.clone(),
                        ColumnSpec::Expr(expr) => {
                            let mut out = String::new();
                            self.compile_expr(expr, &mut out, &mut params);
                            out
                        }
                    };
                    if order.descending {
                        target.push_str(" DESC");
                    }
                    target
                })
                .collect();
            sql.push_str(&format!(" ORDER BY {}", orders.join(", ")));
        }

        match (select.limit, select.offset) {
            (Some(limit), _) => sql.push_str(&format!(" LIMIT {limit}")),
            (None, Some(_)) => {
                if let Some(unbounded) = self.unbounded_limit() {
                    sql.push_str(&format!(" LIMIT {unbounded}"));
                }
            }
            (None, None) => {}
        }
        if let Some(offset) = select.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }

        (sql, params)
    }

    /// Compiles a multi-row INSERT statement.
    ///
    /// The column list is the union of every row's columns in first-seen
    /// order; a row without a value for a column gets the column default.
    pub fn compile_insert(&self, insert: &Insert) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        let table = &insert.target.db_table;
        let mut sql = format!("INSERT INTO \"{table}\"");

        let mut columns: Vec<&str> = Vec::new();
        for row in &insert.rows {
            if let InsertRow::Values(values) = row {
                for (column, _) in values {
                    if !columns.contains(&column.as_str()) {
                        columns.push(column);
                    }
                }
            }
        }

        if columns.is_empty() {
            self.push_default_rows(insert, &mut sql);
        } else {
            let quoted: Vec<String> = columns.iter().map(|c| format!("\"{c}\"")).collect();
            sql.push_str(&format!(" ({}) VALUES ", quoted.join(", ")));
            let mut rows = Vec::with_capacity(insert.rows.len());
            for row in &insert.rows {
                let cells: Vec<String> = columns
                    .iter()
                    .map(|column| {
                        let value = match row {
                            InsertRow::Values(values) => values
                                .iter()
                                .find(|(name, _)| name == column)
                                .map(|(_, value)| value),
                            InsertRow::Default => None,
                        };
                        value.map_or_else(
                            || self.default_keyword().to_string(),
                            |value| self.bind(value, &mut params),
                        )
                    })
                    .collect();
                rows.push(format!("({})", cells.join(", ")));
            }
            sql.push_str(&rows.join(", "));
        }

        self.push_returning(&mut sql);
        (sql, params)
    }

    fn push_default_rows(&self, insert: &Insert, sql: &mut String) {
        let count = insert.rows.len();
        let key = insert
            .target
            .pk_field()
            .or_else(|| insert.target.column_fields().next())
            .map(|field| field.column.as_str());
        match (self.backend, key) {
            (DatabaseBackendType::MySQL, _) => {
                sql.push_str(" () VALUES ");
                sql.push_str(&vec!["()"; count].join(", "));
            }
            (_, Some(key)) if count > 1 => {
                let cell = format!("({})", self.default_keyword());
                sql.push_str(&format!(" (\"{key}\") VALUES "));
                sql.push_str(&vec![cell; count].join(", "));
            }
            _ => sql.push_str(" DEFAULT VALUES"),
        }
    }

    /// The LIMIT emitted before a bare OFFSET; SQLite and MySQL reject OFFSET alone.
    const fn unbounded_limit(&self) -> Option<&'static str> {
        match self.backend {
            DatabaseBackendType::PostgreSQL => None,
            DatabaseBackendType::SQLite => Some("-1"),
            DatabaseBackendType::MySQL => Some("18446744073709551615"),
        }
    }

    const fn default_keyword(&self) -> &'static str {
        match self.backend {
            DatabaseBackendType::SQLite => "NULL",
            DatabaseBackendType::PostgreSQL | DatabaseBackendType::MySQL => "DEFAULT",
        }
    }

    fn push_returning(&self, sql: &mut String) {
        if self.backend != DatabaseBackendType::MySQL {
            sql.push_str(" RETURNING *");
        }
    }

    /// Compiles an UPDATE statement.
    pub fn compile_update(&self, update: &Update) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        let set_parts: Vec<String> = update
            .values
            .iter()
            .map(|(name, value)| {
                let ph = self.bind(value, &mut params);
                format!("\"{name}\" = {ph}")
            })
            .collect();

        let mut sql = format!(
            "UPDATE \"{}\" SET {}",
            update.target.db_table,
            set_parts.join(", ")
        );
        self.compile_where(&update.filters, &mut sql, &mut params);
        if update.returning {
            self.push_returning(&mut sql);
        }
        (sql, params)
    }

    /// Compiles a DELETE statement.
    pub fn compile_delete(&self, delete: &Delete) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        let mut sql = format!("DELETE FROM \"{}\"", delete.target.db_table);
        self.compile_where(&delete.filters, &mut sql, &mut params);
        (sql, params)
    }

    fn compile_where(&self, filters: &[Predicate], sql: &mut String, params: &mut Vec<Value>) {
        match filters {
            [] => {}
            [single] => {
                sql.push_str(" WHERE ");
                self.compile_predicate(single, sql, params);
            }
            many => {
                sql.push_str(" WHERE ");
                self.compile_predicate(&Predicate::And(many.to_vec()), sql, params);
            }
        }
    }

    /// Compiles a predicate into SQL, appending to the provided string.
    pub fn compile_predicate(&self, predicate: &Predicate, sql: &mut String, params: &mut Vec<Value>) {
        match predicate {
            Predicate::Compare { lhs, op, rhs } => {
                self.compile_expr(lhs, sql, params);
                sql.push_str(&format!(" {} ", op.sql_token()));
                self.compile_expr(rhs, sql, params);
            }
            Predicate::Like {
                lhs,
                pattern,
                case_insensitive,
            } => {
                if !case_insensitive {
                    self.compile_expr(lhs, sql, params);
                    sql.push_str(" LIKE ");
                    self.compile_expr(pattern, sql, params);
                } else if self.backend == DatabaseBackendType::PostgreSQL {
                    self.compile_expr(lhs, sql, params);
                    sql.push_str(" ILIKE ");
                    self.compile_expr(pattern, sql, params);
                } else {
                    sql.push_str("LOWER(");
                    self.compile_expr(lhs, sql, params);
                    sql.push_str(") LIKE LOWER(");
                    self.compile_expr(pattern, sql, params);
                    sql.push(')');
                }
            }
            Predicate::In { lhs, values } => {
                if values.is_empty() {
                    sql.push_str("1=0");
                    return;
                }
                self.compile_expr(lhs, sql, params);
                let phs: Vec<String> = values.iter().map(|v| self.bind(v, params)).collect();
                sql.push_str(&format!(" IN ({})", phs.join(", ")));
            }
            Predicate::Between { lhs, low, high } => {
                self.compile_expr(lhs, sql, params);
                sql.push_str(" BETWEEN ");
                self.compile_expr(low, sql, params);
                sql.push_str(" AND ");
                self.compile_expr(high, sql, params);
            }
            Predicate::Is { lhs, rhs, negated } => {
                self.compile_expr(lhs, sql, params);
                sql.push_str(if *negated { " IS NOT " } else { " IS " });
                match rhs {
                    Value::Null => sql.push_str("NULL"),
                    Value::Bool(true) => sql.push_str("TRUE"),
                    Value::Bool(false) => sql.push_str("FALSE"),
                    other => {
                        let ph = self.bind(other, params);
                        sql.push_str(&ph);
                    }
                }
            }
            Predicate::Regex { lhs, pattern } => {
                self.compile_expr(lhs, sql, params);
                match self.backend {
                    DatabaseBackendType::PostgreSQL => sql.push_str(" ~ "),
                    DatabaseBackendType::SQLite | DatabaseBackendType::MySQL => {
                        sql.push_str(" REGEXP ");
                    }
                }
                self.compile_expr(pattern, sql, params);
            }
            Predicate::Raw {
                sql: fragment,
                params: raw_params,
            } => {
                let mut bound = raw_params.iter();
                for ch in fragment.chars() {
                    let value = if ch == '?' { bound.next() } else { None };
                    match value {
                        Some(value) => {
                            let ph = self.bind(value, params);
                            sql.push_str(&ph);
                        }
                        None => sql.push(ch),
                    }
                }
            }
            Predicate::Const(true) => sql.push_str("1=1"),
            Predicate::Const(false) => sql.push_str("1=0"),
            Predicate::And(children) => self.compile_junction(children, " AND ", "1=1", sql, params),
            Predicate::Or(children) => self.compile_junction(children, " OR ", "1=0", sql, params),
            Predicate::Not(inner) => {
                sql.push_str("NOT (");
                self.compile_predicate(inner, sql, params);
                sql.push(')');
            }
        }
    }

    fn compile_junction(
        &self,
        children: &[Predicate],
        separator: &str,
        empty: &str,
        sql: &mut String,
        params: &mut Vec<Value>,
    ) {
        if children.is_empty() {
            sql.push_str(empty);
            return;
        }
        sql.push('(');
        for (i, child) in children.iter().enumerate() {
            if i > 0 {
                sql.push_str(separator);
            }
            self.compile_predicate(child, sql, params);
        }
        sql.push(')');
    }

    /// Compiles a scalar expression into SQL.
    pub fn compile_expr(&self, expr: &Expr, sql: &mut String, params: &mut Vec<Value>) {
        match expr {
            Expr::Column(column) => {
                sql.push_str(&format!("\"{}\".\"{}\"", column.table, column.name));
            }
            Expr::Value(value) => {
                let ph = self.bind(value, params);
                sql.push_str(&ph);
            }
            Expr::Raw(fragment) => sql.push_str(fragment),
            Expr::Lower(inner) => {
                sql.push_str("LOWER(");
                self.compile_expr(inner, sql, params);
                sql.push(')');
            }
            Expr::Extract(part, inner) => self.compile_extract(*part, inner, sql, params),
            Expr::Cast(inner, ty) => match self.backend {
                DatabaseBackendType::SQLite => {
                    sql.push_str(match ty {
                        CastType::Date => "date(",
                        CastType::Time => "time(",
                    });
                    self.compile_expr(inner, sql, params);
                    sql.push(')');
                }
                DatabaseBackendType::PostgreSQL | DatabaseBackendType::MySQL => {
                    sql.push_str("CAST(");
                    self.compile_expr(inner, sql, params);
                    sql.push_str(&format!(" AS {})", ty.sql_name()));
                }
            },
        }
    }

    fn compile_extract(
        &self,
        part: DatePart,
        inner: &Expr,
        sql: &mut String,
        params: &mut Vec<Value>,
    ) {
        let mut operand = String::new();
        self.compile_expr(inner, &mut operand, params);
        let rendered = match self.backend {
            DatabaseBackendType::PostgreSQL => {
                format!("EXTRACT({} FROM {operand})", part.sql_name())
            }
            DatabaseBackendType::MySQL => match part {
                DatePart::Year => format!("YEAR({operand})"),
                DatePart::IsoYear => format!("(YEARWEEK({operand}, 3) DIV 100)"),
                DatePart::Month => format!("MONTH({operand})"),
                DatePart::Day => format!("DAYOFMONTH({operand})"),
                DatePart::Week => format!("WEEK({operand}, 3)"),
                DatePart::WeekDay => format!("(DAYOFWEEK({operand}) - 1)"),
                DatePart::IsoWeekDay => format!("(WEEKDAY({operand}) + 1)"),
                DatePart::Quarter => format!("QUARTER({operand})"),
                DatePart::Hour => format!("HOUR({operand})"),
                DatePart::Minute => format!("MINUTE({operand})"),
                DatePart::Second => format!("SECOND({operand})"),
            },
            DatabaseBackendType::SQLite => match part {
                DatePart::Quarter => {
                    format!("((CAST(strftime('%m', {operand}) AS INTEGER) + 2) / 3)")
                }
                other => format!(
                    "CAST(strftime('{}', {operand}) AS INTEGER)",
                    sqlite_format(other)
                ),
            },
        };
        sql.push_str(&rendered);
    }
}

const fn sqlite_format(part: DatePart) -> &'static str {
    match part {
        DatePart::Year => "%Y",
        DatePart::IsoYear => "%G",
        DatePart::Month | DatePart::Quarter => "%m",
        DatePart::Day => "%d",
        DatePart::Week => "%V",
        DatePart::WeekDay => "%w",
        DatePart::IsoWeekDay => "%u",
        DatePart::Hour => "%H",
        DatePart::Minute => "%M",
        DatePart::Second => "%S",
    }
}
