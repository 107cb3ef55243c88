//! Repository settings.
//!
//! [`Settings`] holds process-wide options (debug mode, log level) together
//! with [`RepositorySettings`], the configuration surface a repository hands
//! to its query builder: which filter strategy to use, how bare column names
//! are remapped, which eager-load strategy is the default, and how updates
//! and soft-deletes behave.
//!
//! Settings are plain values. They are read once when a repository is built
//! and are never mutated afterwards.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which filter converter translates filter maps into predicates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterConvertStrategy {
    /// `{field: value}` maps, equality only.
    #[default]
    Simple,
    /// `{field, value, operator?}` maps.
    Advanced,
    /// `{field__lookup: value}` maps.
    Django,
}

impl FilterConvertStrategy {
    /// All strategy tags, in declaration order.
    pub const ALL: [Self; 3] = [Self::Simple, Self::Advanced, Self::Django];

    /// Returns the configuration tag for this strategy.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Advanced => "advanced",
            Self::Django => "django",
        }
    }
}

impl fmt::Display for FilterConvertStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterConvertStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == s)
            .ok_or_else(|| format!("unknown filter convert strategy \"{s}\""))
    }
}

/// How related rows are fetched alongside a primary entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStrategyKind {
    /// One query with a LEFT OUTER JOIN to the related table.
    Joined,
    /// A second batched `WHERE fk IN (...)` query.
    #[default]
    SelectIn,
    /// A second query that re-runs the parent query as a subquery.
    Subquery,
}

impl LoadStrategyKind {
    /// All load strategies, in declaration order.
    pub const ALL: [Self; 3] = [Self::Joined, Self::SelectIn, Self::Subquery];

    /// Returns the configuration tag for this strategy.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Joined => "joined",
            Self::SelectIn => "selectin",
            Self::Subquery => "subquery",
        }
    }
}

impl fmt::Display for LoadStrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoadStrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == s)
            .ok_or_else(|| format!("unknown load strategy \"{s}\""))
    }
}

/// Which fields an instance update may overwrite with NULL.
///
/// Serialized as `"*"` for every field or as a list of field names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "AllowedNoneFieldsRepr", into = "AllowedNoneFieldsRepr")]
pub enum AllowedNoneFields {
    /// Any field.
    #[default]
    All,
    /// Only the listed fields.
    Only(BTreeSet<String>),
}

impl AllowedNoneFields {
    /// Returns `true` if `field` is covered.
    pub fn allows(&self, field: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(fields) => fields.contains(field),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum AllowedNoneFieldsRepr {
    Star(String),
    List(BTreeSet<String>),
}

impl TryFrom<AllowedNoneFieldsRepr> for AllowedNoneFields {
    type Error = String;

    fn try_from(repr: AllowedNoneFieldsRepr) -> Result<Self, Self::Error> {
        match repr {
            AllowedNoneFieldsRepr::Star(s) if s == "*" => Ok(Self::All),
            AllowedNoneFieldsRepr::Star(s) => {
                Err(format!("expected \"*\" or a list of field names, got \"{s}\""))
            }
            AllowedNoneFieldsRepr::List(fields) => Ok(Self::Only(fields)),
        }
    }
}

impl From<AllowedNoneFields> for AllowedNoneFieldsRepr {
    fn from(value: AllowedNoneFields) -> Self {
        match value {
            AllowedNoneFields::All => Self::Star("*".to_string()),
            AllowedNoneFields::Only(fields) => Self::List(fields),
        }
    }
}

/// Per-repository options.
///
/// These replace what would otherwise be per-class mutable attributes: a
/// repository receives one of these at construction and keeps it unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositorySettings {
    /// The filter strategy used for filter maps.
    pub filter_convert_strategy: FilterConvertStrategy,
    /// The default eager-load strategy.
    pub load_strategy: LoadStrategyKind,
    /// Bare column names redirected to `"table.column"` references.
    pub specific_column_mapping: BTreeMap<String, String>,
    /// Flush (instead of commit) after each write.
    pub use_flush: bool,
    /// Allow instance updates to write NULL over a value.
    pub update_set_none: bool,
    /// Which fields `update_set_none` applies to.
    pub update_allowed_none_fields: AllowedNoneFields,
    /// Skip rows that are already disabled when disabling.
    pub allow_disable_filter_by_value: bool,
    /// The id field that disable requests select rows by.
    pub disable_id_field: Option<String>,
    /// The boolean or timestamp field that marks a row as disabled.
    pub disable_field: Option<String>,
    /// Deduplicate list results (needed with joined eager loads).
    pub unique_list_items: bool,
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            filter_convert_strategy: FilterConvertStrategy::Simple,
            load_strategy: LoadStrategyKind::SelectIn,
            specific_column_mapping: BTreeMap::new(),
            use_flush: true,
            update_set_none: false,
            update_allowed_none_fields: AllowedNoneFields::All,
            allow_disable_filter_by_value: true,
            disable_id_field: None,
            disable_field: None,
            unique_list_items: true,
        }
    }
}

/// The complete set of sqlrepo settings.
///
/// # Examples
///
/// ```
/// use sqlrepo_core::settings::{FilterConvertStrategy, Settings};
///
/// let settings = Settings::default();
/// assert_eq!(settings.log_level, "info");
/// assert_eq!(
///     settings.repository.filter_convert_strategy,
///     FilterConvertStrategy::Simple
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Whether debug mode (pretty logs) is enabled.
    pub debug: bool,
    /// The log level filter (e.g. "info", "sqlrepo_db=debug").
    pub log_level: String,
    /// Repository defaults.
    pub repository: RepositorySettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            log_level: "info".to_string(),
            repository: RepositorySettings::default(),
        }
    }
}
