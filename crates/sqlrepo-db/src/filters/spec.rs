//! Filter specifications.
//!
//! A [`Filters`] value is what callers pass wherever a statement accepts
//! filters: any mix of raw [`Predicate`]s and [`FilterMap`]s. Top-level
//! elements are combined with AND. An empty `Filters` means "no filter".

use std::fmt;

use crate::query::predicate::Predicate;
use crate::value::Value;

/// An insertion-ordered `String -> Value` map.
///
/// The converters emit predicates in map order, so order is part of the
/// contract. Inserting an existing key replaces its value in place.
///
/// # Examples
///
/// ```
/// use sqlrepo_db::filters::FilterMap;
///
/// let map = FilterMap::new().with("name", "aboba").with("id", 1);
/// assert_eq!(map.keys().collect::<Vec<_>>(), vec!["name", "id"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterMap {
    entries: Vec<(String, Value)>,
}

impl FilterMap {
    /// Creates an empty map.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts or replaces a value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Returns the value for `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Returns `true` if `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Iterates over keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Iterates over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Builds a map from a JSON object, keeping the document's key order.
    ///
    /// Returns `None` if `json` is not an object.
    pub fn from_json(json: serde_json::Value) -> Option<Self> {
        match json {
            serde_json::Value::Object(object) => Some(
                object
                    .into_iter()
                    .map(|(key, value)| (key, Value::from_json(value)))
                    .collect(),
            ),
            _ => None,
        }
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for FilterMap {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl IntoIterator for FilterMap {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl fmt::Display for FilterMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (key, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "'{key}': {value}")?;
        }
        write!(f, "}}")
    }
}

/// One top-level filter element.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// A pre-built predicate, passed through unchanged.
    Raw(Predicate),
    /// A filter map, validated and translated by the active converter.
    Map(FilterMap),
}

impl From<Predicate> for Filter {
    fn from(predicate: Predicate) -> Self {
        Self::Raw(predicate)
    }
}

impl From<FilterMap> for Filter {
    fn from(map: FilterMap) -> Self {
        Self::Map(map)
    }
}

/// A filter specification: an ordered list of filter elements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters(pub Vec<Filter>);

impl Filters {
    /// No filters.
    pub const fn none() -> Self {
        Self(Vec::new())
    }

    /// Returns `true` if there are no elements.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the elements.
    pub fn iter(&self) -> std::slice::Iter<'_, Filter> {
        self.0.iter()
    }

    /// Appends an element.
    #[must_use]
    pub fn and(mut self, filter: impl Into<Filter>) -> Self {
        self.0.push(filter.into());
        self
    }
}

impl From<Filter> for Filters {
    fn from(filter: Filter) -> Self {
        Self(vec![filter])
    }
}

impl From<Predicate> for Filters {
    fn from(predicate: Predicate) -> Self {
        Self(vec![Filter::Raw(predicate)])
    }
}

impl From<FilterMap> for Filters {
    fn from(map: FilterMap) -> Self {
        Self(vec![Filter::Map(map)])
    }
}

impl From<Vec<Filter>> for Filters {
    fn from(filters: Vec<Filter>) -> Self {
        Self(filters)
    }
}

impl From<Vec<Predicate>> for Filters {
    fn from(predicates: Vec<Predicate>) -> Self {
        Self(predicates.into_iter().map(Filter::Raw).collect())
    }
}

impl From<Vec<FilterMap>> for Filters {
    fn from(maps: Vec<FilterMap>) -> Self {
        Self(maps.into_iter().map(Filter::Map).collect())
    }
}

impl<T: Into<Filters>> From<Option<T>> for Filters {
    fn from(filters: Option<T>) -> Self {
        filters.map_or_else(Self::none, Into::into)
    }
}

impl<'a> IntoIterator for &'a Filters {
    type Item = &'a Filter;
    type IntoIter = std::slice::Iter<'a, Filter>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
