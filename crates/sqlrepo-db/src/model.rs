//! Model trait and metadata.
//!
//! [`ModelMeta`] is the metadata resolver the converters and the query
//! builder consult: it lists valid field names (columns and hybrid
//! attributes), lists relationship names, and resolves a name to a typed
//! reference. The [`Model`] trait binds an entity type to its metadata and
//! gives the repository read/write access to field values.

use sqlrepo_core::{SqlRepoError, SqlRepoResult};

use crate::fields::{FieldDef, RelationDef};
use crate::query::expr::{Column, Expr};
use crate::value::Value;

/// The core trait for entities handled by a repository.
///
/// # Examples
///
/// ```
/// use std::sync::LazyLock;
/// use sqlrepo_core::{SqlRepoError, SqlRepoResult};
/// use sqlrepo_db::fields::{FieldDef, FieldType};
/// use sqlrepo_db::model::{Model, ModelMeta, Row};
/// use sqlrepo_db::value::Value;
///
/// struct Tag {
///     id: i64,
///     label: String,
/// }
///
/// impl Model for Tag {
///     fn meta() -> &'static ModelMeta {
///         static META: LazyLock<ModelMeta> = LazyLock::new(|| ModelMeta {
///             model_name: "Tag",
///             db_table: "tag".to_string(),
///             fields: vec![
///                 FieldDef::new("id", FieldType::BigAutoField).primary_key(),
///                 FieldDef::new("label", FieldType::CharField),
///             ],
///             relationships: vec![],
///         });
///         &META
///     }
///
///     fn field_value(&self, name: &str) -> Option<Value> {
///         match name {
///             "id" => Some(Value::Int(self.id)),
///             "label" => Some(Value::String(self.label.clone())),
///             _ => None,
///         }
///     }
///
///     fn set_field_value(&mut self, name: &str, value: Value) -> SqlRepoResult<()> {
///         match name {
///             "label" => self.label = sqlrepo_db::model::FromValue::from_value(&value)?,
///             other => return Err(SqlRepoError::ModelError(format!("unknown field {other}"))),
///         }
///         Ok(())
///     }
///
///     fn from_row(row: &Row) -> SqlRepoResult<Self> {
///         Ok(Tag { id: row.get("id")?, label: row.get("label")? })
///     }
/// }
///
/// assert_eq!(Tag::meta().pk_field().map(|f| f.name), Some("id"));
/// ```
pub trait Model: Send + Sync + 'static {
    /// Returns the static metadata for this model type.
    fn meta() -> &'static ModelMeta;

    /// Returns the current value of a column field, or `None` if the model
    /// has no such field.
    fn field_value(&self, name: &str) -> Option<Value>;

    /// Overwrites a column field.
    ///
    /// # Errors
    ///
    /// Returns [`SqlRepoError::ModelError`] for unknown fields or values of
    /// the wrong type.
    fn set_field_value(&mut self, name: &str, value: Value) -> SqlRepoResult<()>;

    /// Constructs an instance from a result row.
    ///
    /// # Errors
    ///
    /// Returns an error if a column is missing or has the wrong type.
    fn from_row(row: &Row) -> SqlRepoResult<Self>
    where
        Self: Sized;

    /// Returns the primary key value, or `None` if it is unset.
    fn pk(&self) -> Option<Value> {
        let pk_name = Self::meta().pk_field()?.name;
        self.field_value(pk_name).filter(|value| !value.is_null())
    }

    /// Returns every column field and its current value.
    fn field_values(&self) -> Vec<(&'static str, Value)> {
        Self::meta()
            .column_fields()
            .filter_map(|field| self.field_value(field.name).map(|value| (field.name, value)))
            .collect()
    }
}

/// Static metadata describing a model's table, fields and relationships.
#[derive(Debug)]
pub struct ModelMeta {
    /// The model name (e.g. `"MyModel"`), used in messages.
    pub model_name: &'static str,
    /// The database table name.
    pub db_table: String,
    /// Column and hybrid field definitions.
    pub fields: Vec<FieldDef>,
    /// Named relationships to other models.
    pub relationships: Vec<RelationDef>,
}

impl ModelMeta {
    /// Returns `true` if both describe the same table.
    pub fn same_as(&self, other: &ModelMeta) -> bool {
        self.db_table == other.db_table
    }

    /// Names accepted in filter maps: columns plus hybrid attributes.
    pub fn valid_field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|field| field.name).collect()
    }

    /// Names of the model's relationships.
    pub fn valid_relationship_names(&self) -> Vec<&'static str> {
        self.relationships.iter().map(|rel| rel.name).collect()
    }

    /// Returns `true` if `name` is a column or hybrid field.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|field| field.name == name)
    }

    /// Looks up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Iterates over fields backed by real columns.
    pub fn column_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|field| field.is_column())
    }

    /// Returns the primary key field, if one is declared.
    pub fn pk_field(&self) -> Option<&FieldDef> {
        self.fields.iter().find(|field| field.primary_key)
    }

    /// Resolves a field name to the expression filters compare against.
    pub fn field_expr(&self, name: &str) -> Option<Expr> {
        self.field(name).map(|field| field.expr(&self.db_table))
    }

    /// Resolves a column field name to a qualified column.
    pub fn column(&self, name: &str) -> Option<Column> {
        self.field(name)
            .filter(|field| field.is_column())
            .map(|field| Column::new(self.db_table.clone(), field.column.clone()))
    }

    /// Looks up a relationship by name.
    pub fn relationship(&self, name: &str) -> Option<&RelationDef> {
        self.relationships.iter().find(|rel| rel.name == name)
    }

    /// Finds a relationship from this model to `target`.
    pub fn relationship_to(&self, target: &ModelMeta) -> Option<&RelationDef> {
        self.relationships
            .iter()
            .find(|rel| rel.target_meta().same_as(target))
    }
}

/// A result row: column names and their values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// Creates a new row from column names and values.
    ///
    /// # Panics
    ///
    /// Panics if the number of columns does not match the number of values.
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        assert_eq!(
            columns.len(),
            values.len(),
            "Row column count must match value count"
        );
        Self { columns, values }
    }

    /// Creates a row from `(column, value)` pairs.
    pub fn from_pairs<K: Into<String>>(pairs: impl IntoIterator<Item = (K, Value)>) -> Self {
        let (columns, values) = pairs
            .into_iter()
            .map(|(column, value)| (column.into(), value))
            .unzip();
        Self { columns, values }
    }

    /// Returns the column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Gets a typed value by column name.
    ///
    /// # Errors
    ///
    /// Returns an error if the column does not exist or the value cannot be
    /// converted to the requested type.
    pub fn get<T: FromValue>(&self, column: &str) -> SqlRepoResult<T> {
        let value = self.get_value(column).ok_or_else(|| {
            SqlRepoError::ModelError(format!("Column '{column}' not found in row"))
        })?;
        T::from_value(value)
    }

    /// Returns a reference to the raw value at the given column name.
    pub fn get_value(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|idx| self.values.get(idx))
    }
}

/// Conversion from a [`Value`] to a concrete Rust type.
pub trait FromValue: Sized {
    /// Attempts to convert a value reference to this type.
    ///
    /// # Errors
    ///
    /// Returns [`SqlRepoError::ModelError`] on a type mismatch.
    fn from_value(value: &Value) -> SqlRepoResult<Self>;
}

fn mismatch(expected: &str, value: &Value) -> SqlRepoError {
    SqlRepoError::ModelError(format!("Expected {expected}, got {value:?}"))
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> SqlRepoResult<Self> {
        match value {
            Value::Int(i) => Ok(*i),
            _ => Err(mismatch("Int", value)),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> SqlRepoResult<Self> {
        match value {
            Value::Int(i) => i32::try_from(*i).map_err(|e| {
                SqlRepoError::ModelError(format!("Int value out of i32 range: {e}"))
            }),
            _ => Err(mismatch("Int", value)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> SqlRepoResult<Self> {
        match value {
            Value::Float(f) => Ok(*f),
            Value::Int(i) => Ok(*i as f64),
            _ => Err(mismatch("Float", value)),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> SqlRepoResult<Self> {
        match value {
            Value::Bool(b) => Ok(*b),
            _ => Err(mismatch("Bool", value)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> SqlRepoResult<Self> {
        match value {
            Value::String(s) => Ok(s.clone()),
            _ => Err(mismatch("String", value)),
        }
    }
}

impl FromValue for uuid::Uuid {
    fn from_value(value: &Value) -> SqlRepoResult<Self> {
        match value {
            Value::Uuid(u) => Ok(*u),
            _ => Err(mismatch("Uuid", value)),
        }
    }
}

impl FromValue for chrono::NaiveDateTime {
    fn from_value(value: &Value) -> SqlRepoResult<Self> {
        match value {
            Value::DateTime(dt) => Ok(*dt),
            Value::DateTimeTz(dt) => Ok(dt.naive_utc()),
            _ => Err(mismatch("DateTime", value)),
        }
    }
}

impl FromValue for chrono::DateTime<chrono::Utc> {
    fn from_value(value: &Value) -> SqlRepoResult<Self> {
        match value {
            Value::DateTimeTz(dt) => Ok(*dt),
            Value::DateTime(dt) => Ok(dt.and_utc()),
            _ => Err(mismatch("DateTimeTz", value)),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> SqlRepoResult<Self> {
        Ok(value.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> SqlRepoResult<Self> {
        match value {
            Value::Null => Ok(None),
            _ => T::from_value(value).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;

    use super::*;
    use crate::fields::FieldType;

    static AUTHOR: LazyLock<ModelMeta> = LazyLock::new(|| ModelMeta {
        model_name: "Author",
        db_table: "author".to_string(),
        fields: vec![
            FieldDef::new("id", FieldType::BigAutoField).primary_key(),
            FieldDef::new("name", FieldType::CharField),
            FieldDef::hybrid_property("shout", FieldType::CharField, |t| {
                Expr::raw(format!("upper({t}.name)"))
            }),
        ],
        relationships: vec![RelationDef {
            name: "books",
            target: book_meta,
            local_column: "id",
            remote_column: "author_id",
            uselist: true,
        }],
    });

    static BOOK: LazyLock<ModelMeta> = LazyLock::new(|| ModelMeta {
        model_name: "Book",
        db_table: "book".to_string(),
        fields: vec![
            FieldDef::new("id", FieldType::BigAutoField).primary_key(),
            FieldDef::new("author_id", FieldType::BigIntegerField),
        ],
        relationships: vec![],
    });

    fn book_meta() -> &'static ModelMeta {
        &BOOK
    }

    // ── ModelMeta tests ──────────────────────────────────────────────

    #[test]
    fn test_valid_field_names_include_hybrids() {
        assert_eq!(AUTHOR.valid_field_names(), vec!["id", "name", "shout"]);
        assert_eq!(AUTHOR.column_fields().count(), 2);
    }

    #[test]
    fn test_field_expr_resolution() {
        assert_eq!(AUTHOR.field_expr("name"), Some(Expr::column("author", "name")));
        assert_eq!(AUTHOR.field_expr("shout"), Some(Expr::raw("upper(author.name)")));
        assert_eq!(AUTHOR.field_expr("missing"), None);
        assert_eq!(AUTHOR.column("shout"), None);
    }

    #[test]
    fn test_relationship_lookup() {
        assert_eq!(AUTHOR.valid_relationship_names(), vec!["books"]);
        let rel = AUTHOR.relationship("books").unwrap();
        assert!(rel.target_meta().same_as(&BOOK));
        assert!(AUTHOR.relationship_to(&BOOK).is_some());
        assert!(BOOK.relationship_to(&AUTHOR).is_none());
        assert_eq!(
            rel.join_condition(&AUTHOR),
            Expr::column("author", "id").eq_expr(Column::new("book", "author_id"))
        );
    }

    #[test]
    fn test_pk_field() {
        assert_eq!(AUTHOR.pk_field().map(|f| f.name), Some("id"));
    }

    // ── Row tests ────────────────────────────────────────────────────

    #[test]
    fn test_row_get_typed() {
        let row = Row::from_pairs([
            ("id", Value::Int(42)),
            ("name", Value::from("Alice")),
            ("bio", Value::Null),
        ]);
        assert_eq!(row.get::<i64>("id").unwrap(), 42);
        assert_eq!(row.get::<String>("name").unwrap(), "Alice");
        assert_eq!(row.get::<Option<String>>("bio").unwrap(), None);
        assert_eq!(row.len(), 3);
    }

    #[test]
    fn test_row_get_missing_column() {
        let row = Row::new(vec!["name".to_string()], vec![Value::from("test")]);
        assert!(matches!(
            row.get::<String>("missing"),
            Err(SqlRepoError::ModelError(_))
        ));
    }

    #[test]
    fn test_row_type_mismatch() {
        let row = Row::from_pairs([("id", Value::from("x"))]);
        assert!(row.get::<i64>("id").is_err());
    }

    #[test]
    fn test_datetime_conversions() {
        let dt = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        let utc = chrono::DateTime::<chrono::Utc>::from_value(&Value::DateTime(dt)).unwrap();
        assert_eq!(utc.naive_utc(), dt);
        let naive = chrono::NaiveDateTime::from_value(&Value::DateTimeTz(utc)).unwrap();
        assert_eq!(naive, dt);
    }
}
