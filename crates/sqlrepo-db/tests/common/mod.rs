//! Shared test models: `MyModel` with a to-many relationship to `OtherModel`.

#![allow(dead_code)]

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use sqlrepo_core::{SqlRepoError, SqlRepoResult};
use sqlrepo_db::fields::{FieldDef, FieldType, RelationDef};
use sqlrepo_db::model::{FromValue, Model, ModelMeta, Row};
use sqlrepo_db::query::Expr;
use sqlrepo_db::value::Value;

// ── MyModel ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct MyModel {
    pub id: i64,
    pub name: String,
    pub other_name: String,
    pub dt: Option<NaiveDateTime>,
    pub bl: bool,
}

impl MyModel {
    pub fn new(id: i64, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            other_name: String::new(),
            dt: None,
            bl: false,
        }
    }

    pub fn row(&self) -> Row {
        Row::from_pairs([
            ("id", Value::Int(self.id)),
            ("name", Value::from(self.name.as_str())),
            ("other_name", Value::from(self.other_name.as_str())),
            ("dt", Value::from(self.dt)),
            ("bl", Value::Bool(self.bl)),
        ])
    }
}

fn full_name(table: &str) -> Expr {
    Expr::raw(format!("\"{table}\".\"name\" || ' ' || \"{table}\".\"other_name\""))
}

static MY_MODEL: LazyLock<ModelMeta> = LazyLock::new(|| ModelMeta {
    model_name: "MyModel",
    db_table: "my_model".to_string(),
    fields: vec![
        FieldDef::new("id", FieldType::BigAutoField).primary_key(),
        FieldDef::new("name", FieldType::CharField),
        FieldDef::new("other_name", FieldType::CharField),
        FieldDef::new("dt", FieldType::DateTimeField).nullable(),
        FieldDef::new("bl", FieldType::BooleanField),
        FieldDef::hybrid_property("full_name", FieldType::CharField, full_name),
        FieldDef::hybrid_method("get_full_name", FieldType::CharField, full_name),
    ],
    relationships: vec![RelationDef {
        name: "other_models",
        target: other_model_meta,
        local_column: "id",
        remote_column: "my_model_id",
        uselist: true,
    }],
});

pub fn my_model_meta() -> &'static ModelMeta {
    &MY_MODEL
}

impl Model for MyModel {
    fn meta() -> &'static ModelMeta {
        &MY_MODEL
    }

    fn field_value(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(Value::Int(self.id)),
            "name" => Some(Value::from(self.name.as_str())),
            "other_name" => Some(Value::from(self.other_name.as_str())),
            "dt" => Some(Value::from(self.dt)),
            "bl" => Some(Value::Bool(self.bl)),
            _ => None,
        }
    }

    fn set_field_value(&mut self, name: &str, value: Value) -> SqlRepoResult<()> {
        match name {
            "id" => self.id = FromValue::from_value(&value)?,
            "name" => self.name = FromValue::from_value(&value)?,
            "other_name" => self.other_name = FromValue::from_value(&value)?,
            "dt" => self.dt = FromValue::from_value(&value)?,
            "bl" => self.bl = FromValue::from_value(&value)?,
            other => {
                return Err(SqlRepoError::ModelError(format!(
                    "MyModel has no field \"{other}\""
                )))
            }
        }
        Ok(())
    }

    fn from_row(row: &Row) -> SqlRepoResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            other_name: row.get("other_name")?,
            dt: row.get("dt")?,
            bl: row.get("bl")?,
        })
    }
}

// ── OtherModel ────────────────────────────────────────────────────────

static OTHER_MODEL: LazyLock<ModelMeta> = LazyLock::new(|| ModelMeta {
    model_name: "OtherModel",
    db_table: "other_model".to_string(),
    fields: vec![
        FieldDef::new("id", FieldType::BigAutoField).primary_key(),
        FieldDef::new("name", FieldType::CharField),
        FieldDef::new("other_name", FieldType::CharField),
        FieldDef::new("my_model_id", FieldType::BigIntegerField),
        FieldDef::hybrid_property("full_name", FieldType::CharField, full_name),
    ],
    relationships: vec![RelationDef {
        name: "my_model",
        target: my_model_meta,
        local_column: "my_model_id",
        remote_column: "id",
        uselist: false,
    }],
});

pub fn other_model_meta() -> &'static ModelMeta {
    &OTHER_MODEL
}

pub fn my_col(name: &str) -> Expr {
    Expr::column("my_model", name)
}

pub fn other_col(name: &str) -> Expr {
    Expr::column("other_model", name)
}
