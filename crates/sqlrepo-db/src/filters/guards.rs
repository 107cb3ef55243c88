//! Shape checks for filter maps.

use super::operators::AdvancedOperator;
use super::spec::FilterMap;

/// Keys an advanced filter map may carry.
pub const OPERATOR_FILTER_KEYS: [&str; 3] = ["field", "value", "operator"];

/// Returns `true` if `map` is shaped `{field: str, value: any, operator?}`
/// with `operator`, when present, naming an [`AdvancedOperator`].
///
/// Any key outside `field`/`value`/`operator` makes the map invalid.
pub fn is_operator_filter_map(map: &FilterMap) -> bool {
    if !map.keys().all(|key| OPERATOR_FILTER_KEYS.contains(&key)) {
        return false;
    }
    if map.get("field").and_then(|field| field.as_str()).is_none() {
        return false;
    }
    if !map.contains_key("value") {
        return false;
    }
    match map.get("operator") {
        None => true,
        Some(operator) => operator
            .as_str()
            .is_some_and(|name| name.parse::<AdvancedOperator>().is_ok()),
    }
}

/// Returns `true` if every key is a non-empty identifier.
pub fn all_keys_are_identifiers(map: &FilterMap) -> bool {
    map.keys().all(|key| !key.trim().is_empty())
}
