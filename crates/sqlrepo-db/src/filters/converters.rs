//! Filter converters.
//!
//! A [`FilterConverter`] turns a [`Filters`] specification into predicates
//! against one model. Raw predicates pass through untouched; every filter
//! map is validated and then translated. The three strategies differ only in
//! how a map is validated and parsed:
//!
//! | Strategy     | Map shape                          | Operator                 |
//! |--------------|------------------------------------|--------------------------|
//! | `Simple`     | `{field: value, ...}`              | equality                 |
//! | `Advanced`   | `{field, value, operator?}`        | [`AdvancedOperator`], `==` by default |
//! | `DjangoLike` | `{field[__lookup]: value, ...}`    | [`DjangoLookup`], `exact` by default |
//!
//! Validation yields a parsed form; translation only ever sees parsed forms,
//! so a map can never be translated without having been validated.

use sqlrepo_core::{FilterConvertStrategy, FilterError, SqlRepoError, SqlRepoResult};

use super::guards::{all_keys_are_identifiers, is_operator_filter_map};
use super::operators::{self, AdvancedOperator, DjangoLookup, OperatorFn};
use super::spec::{Filter, FilterMap, Filters};
use crate::model::ModelMeta;
use crate::query::predicate::Predicate;
use crate::value::Value;

/// Separator between a field name and its lookup in Django-style keys.
pub const LOOKUP_SEP: &str = "__";

/// The filter strategy tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FilterConverter {
    /// `{field: value}` equality maps.
    #[default]
    Simple,
    /// `{field, value, operator?}` maps.
    Advanced,
    /// `{field__lookup: value}` maps.
    DjangoLike,
}

impl From<FilterConvertStrategy> for FilterConverter {
    fn from(strategy: FilterConvertStrategy) -> Self {
        match strategy {
            FilterConvertStrategy::Simple => Self::Simple,
            FilterConvertStrategy::Advanced => Self::Advanced,
            FilterConvertStrategy::Django => Self::DjangoLike,
        }
    }
}

/// One validated `(field, operator, value)` triple.
struct Term {
    field: String,
    operator: OperatorFn,
    value: Value,
}

/// A filter map that passed validation.
struct ParsedMap(Vec<Term>);

type ValidateFn = fn(&ModelMeta, &FilterMap) -> Result<ParsedMap, String>;
type TranslateFn = fn(&ModelMeta, ParsedMap) -> SqlRepoResult<Vec<Predicate>>;

struct Strategy {
    validate: ValidateFn,
    translate: TranslateFn,
}

const SIMPLE: Strategy = Strategy {
    validate: validate_simple,
    translate: translate_terms,
};

const ADVANCED: Strategy = Strategy {
    validate: validate_advanced,
    translate: translate_terms,
};

const DJANGO_LIKE: Strategy = Strategy {
    validate: validate_django_like,
    translate: translate_terms,
};

impl FilterConverter {
    const fn strategy(self) -> &'static Strategy {
        match self {
            Self::Simple => &SIMPLE,
            Self::Advanced => &ADVANCED,
            Self::DjangoLike => &DJANGO_LIKE,
        }
    }

    /// Converts a filter specification into predicates, in order.
    ///
    /// An empty specification yields no predicates.
    ///
    /// # Errors
    ///
    /// Returns [`SqlRepoError::Filter`] for the first map that fails
    /// validation, and [`SqlRepoError::InvariantViolated`] if the model
    /// cannot resolve a field it listed as valid.
    pub fn convert(self, meta: &ModelMeta, filters: &Filters) -> SqlRepoResult<Vec<Predicate>> {
        let strategy = self.strategy();
        let mut result = Vec::new();
        for filter in filters {
            match filter {
                Filter::Raw(predicate) => result.push(predicate.clone()),
                Filter::Map(map) => {
                    let parsed = (strategy.validate)(meta, map).map_err(|reason| {
                        tracing::debug!(converter = ?self, data = %map, %reason, "filter map rejected");
                        FilterError::new(map.to_string(), reason)
                    })?;
                    result.extend((strategy.translate)(meta, parsed)?);
                }
            }
        }
        Ok(result)
    }

    /// Checks a single filter map, returning `(is_valid, message)`.
    ///
    /// The message is empty for valid maps.
    pub fn is_valid(self, meta: &ModelMeta, map: &FilterMap) -> (bool, String) {
        match (self.strategy().validate)(meta, map) {
            Ok(_) => (true, String::new()),
            Err(reason) => (false, reason),
        }
    }
}

fn unknown_field(meta: &ModelMeta, field: &str) -> String {
    format!("Model {} has no field \"{field}\".", meta.model_name)
}

fn validate_simple(meta: &ModelMeta, map: &FilterMap) -> Result<ParsedMap, String> {
    let mut terms = Vec::with_capacity(map.len());
    for (field, value) in map.iter() {
        if !meta.has_field(field) {
            return Err(unknown_field(meta, field));
        }
        terms.push(Term {
            field: field.to_string(),
            operator: operators::eq,
            value: value.clone(),
        });
    }
    Ok(ParsedMap(terms))
}

fn validate_advanced(meta: &ModelMeta, map: &FilterMap) -> Result<ParsedMap, String> {
    if !is_operator_filter_map(map) {
        return Err("filter map is not an operator filter map.".to_string());
    }
    let field = map
        .get("field")
        .and_then(Value::as_str)
        .ok_or_else(|| "filter map is not an operator filter map.".to_string())?;
    if !meta.has_field(field) {
        return Err(unknown_field(meta, field));
    }
    let operator = match map.get("operator").and_then(Value::as_str) {
        Some(name) => name.parse::<AdvancedOperator>()?,
        None => AdvancedOperator::Eq,
    };
    let value = map.get("value").cloned().unwrap_or(Value::Null);
    Ok(ParsedMap(vec![Term {
        field: field.to_string(),
        operator: operator.operator(),
        value,
    }]))
}

fn validate_django_like(meta: &ModelMeta, map: &FilterMap) -> Result<ParsedMap, String> {
    if !all_keys_are_identifiers(map) {
        return Err("filter keys must be non-empty field names.".to_string());
    }
    let mut terms = Vec::with_capacity(map.len());
    for (key, value) in map.iter() {
        let parts: Vec<&str> = key.split(LOOKUP_SEP).collect();
        let (field, lookup) = match parts.as_slice() {
            [field] => (*field, DjangoLookup::Exact.as_str()),
            [field, lookup] => (*field, *lookup),
            _ => return Err("nested or related-model lookups are not supported.".to_string()),
        };
        if !meta.has_field(field) {
            return Err(unknown_field(meta, field));
        }
        let lookup = lookup.parse::<DjangoLookup>().map_err(|_| {
            format!(
                "Unexpected lookup \"{lookup}\". Valid lookups: {}.",
                DjangoLookup::names_display()
            )
        })?;
        terms.push(Term {
            field: field.to_string(),
            operator: lookup.operator(),
            value: value.clone(),
        });
    }
    Ok(ParsedMap(terms))
}

fn translate_terms(meta: &ModelMeta, parsed: ParsedMap) -> SqlRepoResult<Vec<Predicate>> {
    parsed
        .0
        .into_iter()
        .map(|term| {
            let field = meta.field_expr(&term.field).ok_or_else(|| {
                SqlRepoError::InvariantViolated(format!(
                    "model {} validated field \"{}\" but cannot resolve it",
                    meta.model_name, term.field
                ))
            })?;
            Ok((term.operator)(field, term.value))
        })
        .collect()
}
