//! Field and relationship definitions.
//!
//! A [`FieldDef`] describes one attribute a filter map may name: either a
//! plain column or a hybrid attribute whose SQL expression is computed from
//! the owning table. A [`RelationDef`] describes one named relationship to
//! another model and the column pair that links the two tables.

use std::fmt;

use crate::model::ModelMeta;
use crate::query::expr::{Column, Expr};
use crate::query::predicate::Predicate;

/// The semantic type of a field.
///
/// Only the distinction between booleans, timestamps and everything else
/// changes query construction; the remaining variants document the column
/// for callers and executors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum FieldType {
    /// Auto-incrementing 32-bit integer primary key.
    AutoField,
    /// Auto-incrementing 64-bit integer primary key.
    BigAutoField,
    /// Variable-length string.
    CharField,
    /// Unlimited-length text.
    TextField,
    /// 32-bit signed integer.
    IntegerField,
    /// 64-bit signed integer.
    BigIntegerField,
    /// 64-bit floating-point number.
    FloatField,
    /// Boolean (true/false).
    BooleanField,
    /// Date without time.
    DateField,
    /// Date and time.
    DateTimeField,
    /// Time without date.
    TimeField,
    /// UUID.
    UuidField,
    /// Raw binary data.
    BinaryField,
    /// JSON document.
    JsonField,
}

impl FieldType {
    /// Returns `true` for [`FieldType::BooleanField`].
    pub const fn is_boolean(self) -> bool {
        matches!(self, Self::BooleanField)
    }

    /// Returns `true` for [`FieldType::DateTimeField`].
    pub const fn is_timestamp(self) -> bool {
        matches!(self, Self::DateTimeField)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Builds the SQL expression of a hybrid attribute for a given table name.
pub type HybridExprFn = fn(&str) -> Expr;

/// How a field is stored.
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    /// A real table column.
    Column,
    /// A computed attribute usable in filters (`@hybrid_property` style).
    HybridProperty(HybridExprFn),
    /// A computed attribute exposed as a method (`@hybrid_method` style).
    HybridMethod(HybridExprFn),
}

/// Definition of a single model field.
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// The attribute name used in filter maps and data maps.
    pub name: &'static str,
    /// The database column name (may differ from `name`).
    pub column: String,
    /// The semantic type of the field.
    pub field_type: FieldType,
    /// Whether this field is the primary key.
    pub primary_key: bool,
    /// Whether NULL is allowed.
    pub null: bool,
    /// Column or hybrid.
    pub kind: FieldKind,
}

impl FieldDef {
    /// Creates a column field. The column name defaults to the field name.
    pub fn new(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            column: name.to_string(),
            field_type,
            primary_key: false,
            null: false,
            kind: FieldKind::Column,
        }
    }

    /// Creates a hybrid property.
    pub fn hybrid_property(name: &'static str, field_type: FieldType, expr: HybridExprFn) -> Self {
        Self {
            kind: FieldKind::HybridProperty(expr),
            column: String::new(),
            ..Self::new(name, field_type)
        }
    }

    /// Creates a hybrid method.
    pub fn hybrid_method(name: &'static str, field_type: FieldType, expr: HybridExprFn) -> Self {
        Self {
            kind: FieldKind::HybridMethod(expr),
            column: String::new(),
            ..Self::new(name, field_type)
        }
    }

    /// Sets the database column name.
    #[must_use]
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    /// Marks this field as the primary key.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Allows NULL values.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.null = true;
        self
    }

    /// Returns `true` if this field is backed by a real column.
    pub const fn is_column(&self) -> bool {
        matches!(self.kind, FieldKind::Column)
    }

    /// Returns the SQL expression for this field on `table`.
    pub fn expr(&self, table: &str) -> Expr {
        match self.kind {
            FieldKind::Column => Expr::Column(Column::new(table, self.column.clone())),
            FieldKind::HybridProperty(build) | FieldKind::HybridMethod(build) => build(table),
        }
    }
}

/// A named relationship from one model to another.
#[derive(Debug, Clone, Copy)]
pub struct RelationDef {
    /// The relationship attribute name (e.g. `"other_models"`).
    pub name: &'static str,
    /// The related model's metadata.
    pub target: fn() -> &'static ModelMeta,
    /// The linking column on the owning model's table.
    pub local_column: &'static str,
    /// The linking column on the target model's table.
    pub remote_column: &'static str,
    /// `true` for to-many relationships.
    pub uselist: bool,
}

impl RelationDef {
    /// Returns the target model's metadata.
    pub fn target_meta(&self) -> &'static ModelMeta {
        (self.target)()
    }

    /// The ON condition joining `owner` to the target model.
    pub fn join_condition(&self, owner: &ModelMeta) -> Predicate {
        let target = self.target_meta();
        Expr::column(owner.db_table.clone(), self.local_column)
            .eq_expr(Column::new(target.db_table.clone(), self.remote_column))
    }
}
