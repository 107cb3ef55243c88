//! Field references and scalar expressions.
//!
//! An [`Expr`] is the left-hand side of every predicate the operator library
//! builds: a qualified [`Column`], a hybrid attribute's SQL fragment, or a
//! transform (`LOWER`, `EXTRACT`, `CAST`) wrapped around one of those.
//! Methods on `Expr` mirror the comparison vocabulary of the predicates, so
//! callers can write raw predicates the same way the converters do:
//!
//! ```
//! use sqlrepo_db::query::expr::{Column, Expr};
//!
//! let age = Expr::column("users", "age");
//! let adult = age.clone().ge(18) & age.lt(65);
//! ```

use std::fmt;

use super::predicate::{CompareOp, Predicate};
use crate::value::Value;

/// A fully-qualified column reference (`"table"."name"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Column {
    /// The table (or alias) owning the column.
    pub table: String,
    /// The column name.
    pub name: String,
}

impl Column {
    /// Creates a column reference.
    pub fn new(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            name: name.into(),
        }
    }

    /// Parses a `"table.column"` reference.
    ///
    /// Returns `None` unless the string has exactly one dot with non-empty
    /// parts on both sides.
    pub fn parse(reference: &str) -> Option<Self> {
        let (table, name) = reference.split_once('.')?;
        if table.is_empty() || name.is_empty() || name.contains('.') {
            return None;
        }
        Some(Self::new(table, name))
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.name)
    }
}

/// A component extracted from a date/time value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatePart {
    /// Calendar year.
    Year,
    /// ISO-8601 week-numbering year.
    IsoYear,
    /// Month (1-12).
    Month,
    /// Day of month.
    Day,
    /// ISO week number.
    Week,
    /// Day of week, 0 = Sunday (locale style).
    WeekDay,
    /// ISO day of week, 1 = Monday .. 7 = Sunday.
    IsoWeekDay,
    /// Quarter (1-4).
    Quarter,
    /// Hour.
    Hour,
    /// Minute.
    Minute,
    /// Second.
    Second,
}

impl DatePart {
    /// Returns the PostgreSQL `EXTRACT` field name.
    pub const fn sql_name(self) -> &'static str {
        match self {
            Self::Year => "year",
            Self::IsoYear => "isoyear",
            Self::Month => "month",
            Self::Day => "day",
            Self::Week => "week",
            Self::WeekDay => "dow",
            Self::IsoWeekDay => "isodow",
            Self::Quarter => "quarter",
            Self::Hour => "hour",
            Self::Minute => "minute",
            Self::Second => "second",
        }
    }
}

/// Target type of a `CAST`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastType {
    /// `DATE`
    Date,
    /// `TIME`
    Time,
}

impl CastType {
    /// Returns the SQL type name.
    pub const fn sql_name(self) -> &'static str {
        match self {
            Self::Date => "DATE",
            Self::Time => "TIME",
        }
    }
}

/// A scalar SQL expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A qualified column.
    Column(Column),
    /// A bound parameter.
    Value(Value),
    /// A SQL fragment emitted verbatim (hybrid attribute expressions).
    Raw(String),
    /// `LOWER(expr)`.
    Lower(Box<Expr>),
    /// `EXTRACT(part FROM expr)`.
    Extract(DatePart, Box<Expr>),
    /// `CAST(expr AS type)`.
    Cast(Box<Expr>, CastType),
}

impl From<Column> for Expr {
    fn from(column: Column) -> Self {
        Self::Column(column)
    }
}

impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl Expr {
    /// Shorthand for a column expression.
    pub fn column(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Column(Column::new(table, name))
    }

    /// Shorthand for a raw SQL fragment.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::Raw(sql.into())
    }

    /// Returns the column this expression refers to, if it is a plain column.
    pub const fn as_column(&self) -> Option<&Column> {
        match self {
            Self::Column(column) => Some(column),
            _ => None,
        }
    }

    // ── Transforms ───────────────────────────────────────────────────

    /// `LOWER(self)`.
    #[must_use]
    pub fn lower(self) -> Self {
        Self::Lower(Box::new(self))
    }

    /// `EXTRACT(part FROM self)`.
    #[must_use]
    pub fn extract(self, part: DatePart) -> Self {
        Self::Extract(part, Box::new(self))
    }

    /// `CAST(self AS ty)`.
    #[must_use]
    pub fn cast(self, ty: CastType) -> Self {
        Self::Cast(Box::new(self), ty)
    }

    // ── Comparisons ──────────────────────────────────────────────────

    fn compare(self, op: CompareOp, rhs: impl Into<Value>) -> Predicate {
        Predicate::Compare {
            lhs: self,
            op,
            rhs: Expr::Value(rhs.into()),
        }
    }

    /// `self = rhs`.
    pub fn eq(self, rhs: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Eq, rhs)
    }

    /// `self != rhs`.
    pub fn ne(self, rhs: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Ne, rhs)
    }

    /// `self > rhs`.
    pub fn gt(self, rhs: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Gt, rhs)
    }

    /// `self >= rhs`.
    pub fn ge(self, rhs: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Ge, rhs)
    }

    /// `self < rhs`.
    pub fn lt(self, rhs: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Lt, rhs)
    }

    /// `self <= rhs`.
    pub fn le(self, rhs: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Le, rhs)
    }

    /// `self = other` for two expressions (join conditions).
    pub fn eq_expr(self, other: impl Into<Expr>) -> Predicate {
        Predicate::Compare {
            lhs: self,
            op: CompareOp::Eq,
            rhs: other.into(),
        }
    }

    /// `self LIKE pattern`. The pattern is used as given.
    pub fn like(self, pattern: impl Into<Value>) -> Predicate {
        Predicate::Like {
            lhs: self,
            pattern: Expr::Value(pattern.into()),
            case_insensitive: false,
        }
    }

    /// `self ILIKE pattern`. The pattern is used as given.
    pub fn ilike(self, pattern: impl Into<Value>) -> Predicate {
        Predicate::Like {
            lhs: self,
            pattern: Expr::Value(pattern.into()),
            case_insensitive: true,
        }
    }

    /// `self IN (values...)`.
    pub fn in_(self, values: impl IntoIterator<Item = Value>) -> Predicate {
        Predicate::In {
            lhs: self,
            values: values.into_iter().collect(),
        }
    }

    /// `self BETWEEN low AND high`.
    pub fn between(self, low: impl Into<Value>, high: impl Into<Value>) -> Predicate {
        Predicate::Between {
            lhs: self,
            low: Expr::Value(low.into()),
            high: Expr::Value(high.into()),
        }
    }

    /// `self IS rhs` (NULL, TRUE or FALSE).
    pub fn is_(self, rhs: impl Into<Value>) -> Predicate {
        Predicate::Is {
            lhs: self,
            rhs: rhs.into(),
            negated: false,
        }
    }

    /// `self IS NOT rhs` (NULL, TRUE or FALSE).
    pub fn is_not(self, rhs: impl Into<Value>) -> Predicate {
        Predicate::Is {
            lhs: self,
            rhs: rhs.into(),
            negated: true,
        }
    }

    /// Regular-expression match against `pattern`.
    pub fn regexp_match(self, pattern: impl Into<Value>) -> Predicate {
        Predicate::Regex {
            lhs: self,
            pattern: Expr::Value(pattern.into()),
        }
    }
}
