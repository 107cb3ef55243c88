//! Settings loading from configuration files.
//!
//! Loads [`Settings`] from TOML or JSON and applies environment overrides.
//!
//! ## Loading Order
//!
//! 1. Start with default settings.
//! 2. Merge a TOML or JSON document over them.
//! 3. Apply environment variable overrides (highest priority).
//!
//! ## Environment Variable Mapping
//!
//! | Env Var | Setting |
//! |---|---|
//! | `SQLREPO_DEBUG` | `debug` |
//! | `SQLREPO_LOG_LEVEL` | `log_level` |
//! | `SQLREPO_FILTER_STRATEGY` | `repository.filter_convert_strategy` |
//! | `SQLREPO_LOAD_STRATEGY` | `repository.load_strategy` |
//!
//! ## Examples
//!
//! ```rust,no_run
//! use sqlrepo_core::settings_loader;
//!
//! let settings = settings_loader::from_toml_file_with_env("config/sqlrepo.toml").unwrap();
//! ```

use std::path::Path;

use crate::error::SqlRepoError;
use crate::settings::Settings;

/// Loads settings from a TOML string. Missing keys keep their defaults.
///
/// # Errors
///
/// Returns an error if the TOML is malformed or cannot be deserialized.
pub fn from_toml_str(toml_str: &str) -> Result<Settings, SqlRepoError> {
    let toml_value: toml::Value = toml::from_str(toml_str)
        .map_err(|e| SqlRepoError::ConfigurationError(format!("Failed to parse TOML: {e}")))?;
    from_json_value(toml_to_json(toml_value), "TOML")
}

/// Loads settings from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the TOML is malformed.
pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Settings, SqlRepoError> {
    from_toml_str(&read_file(path.as_ref(), "TOML")?)
}

/// Loads settings from a TOML file and then applies environment overrides.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the TOML is malformed.
pub fn from_toml_file_with_env(path: impl AsRef<Path>) -> Result<Settings, SqlRepoError> {
    let mut settings = from_toml_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Loads settings from a JSON string. Missing keys keep their defaults.
///
/// # Errors
///
/// Returns an error if the JSON is malformed or cannot be deserialized.
pub fn from_json_str(json_str: &str) -> Result<Settings, SqlRepoError> {
    let json_value: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| SqlRepoError::ConfigurationError(format!("Failed to parse JSON: {e}")))?;
    from_json_value(json_value, "JSON")
}

/// Loads settings from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the JSON is malformed.
pub fn from_json_file(path: impl AsRef<Path>) -> Result<Settings, SqlRepoError> {
    from_json_str(&read_file(path.as_ref(), "JSON")?)
}

/// Loads settings from environment variables only, starting from defaults.
pub fn from_env() -> Settings {
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings);
    settings
}

/// Applies environment variable overrides to a settings struct.
///
/// Unparseable strategy values are ignored with a warning and the previous
/// value is kept.
pub fn apply_env_overrides(settings: &mut Settings) {
    if let Ok(val) = std::env::var("SQLREPO_DEBUG") {
        settings.debug = matches!(val.to_lowercase().as_str(), "true" | "1" | "yes");
    }

    if let Ok(val) = std::env::var("SQLREPO_LOG_LEVEL") {
        settings.log_level = val;
    }

    if let Ok(val) = std::env::var("SQLREPO_FILTER_STRATEGY") {
        match val.parse() {
            Ok(strategy) => settings.repository.filter_convert_strategy = strategy,
            Err(e) => tracing::warn!("ignoring SQLREPO_FILTER_STRATEGY: {e}"),
        }
    }

    if let Ok(val) = std::env::var("SQLREPO_LOAD_STRATEGY") {
        match val.parse() {
            Ok(strategy) => settings.repository.load_strategy = strategy,
            Err(e) => tracing::warn!("ignoring SQLREPO_LOAD_STRATEGY: {e}"),
        }
    }
}

// ============================================================
// Helpers
// ============================================================

fn read_file(path: &Path, format: &str) -> Result<String, SqlRepoError> {
    std::fs::read_to_string(path).map_err(|e| {
        SqlRepoError::ConfigurationError(format!(
            "Failed to read {format} file '{}': {e}",
            path.display()
        ))
    })
}

fn from_json_value(value: serde_json::Value, format: &str) -> Result<Settings, SqlRepoError> {
    let default_json = serde_json::to_value(Settings::default()).map_err(|e| {
        SqlRepoError::ConfigurationError(format!("Failed to serialize default settings: {e}"))
    })?;

    let merged = merge_json(default_json, value);
    serde_json::from_value(merged).map_err(|e| {
        SqlRepoError::ConfigurationError(format!(
            "Failed to deserialize settings from {format}: {e}"
        ))
    })
}

/// Converts a TOML value to a `serde_json::Value`.
fn toml_to_json(value: toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::json!(i),
        toml::Value::Float(f) => serde_json::json!(f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => serde_json::Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

/// Deep-merges two JSON objects; `override_val` wins. Arrays are replaced.
fn merge_json(base: serde_json::Value, override_val: serde_json::Value) -> serde_json::Value {
    match (base, override_val) {
        (serde_json::Value::Object(mut base_map), serde_json::Value::Object(override_map)) => {
            for (key, override_v) in override_map {
                let merged = match base_map.remove(&key) {
                    Some(base_v) => merge_json(base_v, override_v),
                    None => override_v,
                };
                base_map.insert(key, merged);
            }
            serde_json::Value::Object(base_map)
        }
        (_, override_val) => override_val,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{AllowedNoneFields, FilterConvertStrategy, LoadStrategyKind};

    #[test]
    fn test_from_toml_str_repository_section() {
        let toml = r#"
            log_level = "debug"

            [repository]
            filter_convert_strategy = "django"
            load_strategy = "joined"
            update_set_none = true
            update_allowed_none_fields = ["name", "dt"]
            disable_id_field = "id"
            disable_field = "bl"

            [repository.specific_column_mapping]
            other_model_id = "other_model.id"
        "#;

        let settings = from_toml_str(toml).unwrap();
        assert_eq!(settings.log_level, "debug");
        let repo = &settings.repository;
        assert_eq!(repo.filter_convert_strategy, FilterConvertStrategy::Django);
        assert_eq!(repo.load_strategy, LoadStrategyKind::Joined);
        assert!(repo.update_set_none);
        assert!(repo.update_allowed_none_fields.allows("dt"));
        assert!(!repo.update_allowed_none_fields.allows("bl"));
        assert_eq!(repo.disable_field.as_deref(), Some("bl"));
        assert_eq!(
            repo.specific_column_mapping.get("other_model_id").map(String::as_str),
            Some("other_model.id")
        );
        // Defaults preserved
        assert!(repo.use_flush);
        assert!(repo.unique_list_items);
    }

    #[test]
    fn test_from_toml_str_empty() {
        let settings = from_toml_str("").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_from_toml_str_invalid() {
        assert!(from_toml_str("[[invalid toml content").is_err());
    }

    #[test]
    fn test_from_toml_str_unknown_strategy() {
        let err = from_toml_str("[repository]\nfilter_convert_strategy = \"fuzzy\"").unwrap_err();
        assert!(matches!(err, SqlRepoError::ConfigurationError(_)));
    }

    #[test]
    fn test_from_json_str_basic() {
        let json = r#"{
            "debug": true,
            "repository": {"filter_convert_strategy": "advanced", "update_allowed_none_fields": "*"}
        }"#;

        let settings = from_json_str(json).unwrap();
        assert!(settings.debug);
        assert_eq!(
            settings.repository.filter_convert_strategy,
            FilterConvertStrategy::Advanced
        );
        assert_eq!(
            settings.repository.update_allowed_none_fields,
            AllowedNoneFields::All
        );
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn test_from_json_str_invalid() {
        assert!(from_json_str("{invalid json").is_err());
    }

    #[test]
    fn test_from_files() {
        let dir = std::env::temp_dir().join("sqlrepo_settings_loader_test");
        std::fs::create_dir_all(&dir).unwrap();

        let toml_path = dir.join("settings.toml");
        std::fs::write(&toml_path, "[repository]\nuse_flush = false\n").unwrap();
        assert!(!from_toml_file(&toml_path).unwrap().repository.use_flush);

        let json_path = dir.join("settings.json");
        std::fs::write(&json_path, r#"{"repository": {"unique_list_items": false}}"#).unwrap();
        assert!(!from_json_file(&json_path).unwrap().repository.unique_list_items);

        std::fs::remove_file(&toml_path).ok();
        std::fs::remove_file(&json_path).ok();
        std::fs::remove_dir(&dir).ok();
    }

    #[test]
    fn test_missing_files() {
        assert!(from_toml_file("/nonexistent/path/settings.toml").is_err());
        assert!(from_json_file("/nonexistent/path/settings.json").is_err());
    }

    // All environment assertions live in one test so parallel tests never
    // observe each other's variables.
    #[test]
    fn test_env_overrides() {
        std::env::set_var("SQLREPO_DEBUG", "1");
        std::env::set_var("SQLREPO_LOG_LEVEL", "trace");
        std::env::set_var("SQLREPO_FILTER_STRATEGY", "django");
        std::env::set_var("SQLREPO_LOAD_STRATEGY", "nonsense");

        let settings = from_env();
        assert!(settings.debug);
        assert_eq!(settings.log_level, "trace");
        assert_eq!(
            settings.repository.filter_convert_strategy,
            FilterConvertStrategy::Django
        );
        // Invalid value keeps the default.
        assert_eq!(settings.repository.load_strategy, LoadStrategyKind::SelectIn);

        let dir = std::env::temp_dir().join("sqlrepo_settings_env_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.toml");
        std::fs::write(&path, "debug = false\nlog_level = \"warn\"\n").unwrap();
        let settings = from_toml_file_with_env(&path).unwrap();
        assert!(settings.debug);
        assert_eq!(settings.log_level, "trace");

        for var in [
            "SQLREPO_DEBUG",
            "SQLREPO_LOG_LEVEL",
            "SQLREPO_FILTER_STRATEGY",
            "SQLREPO_LOAD_STRATEGY",
        ] {
            std::env::remove_var(var);
        }
        std::fs::remove_file(&path).ok();
        std::fs::remove_dir(&dir).ok();
    }

    #[test]
    fn test_merge_json_nested() {
        let base = serde_json::json!({"outer": {"a": 1, "b": 2}, "list": [1, 2]});
        let over = serde_json::json!({"outer": {"b": 3}, "list": [4]});
        let merged = merge_json(base, over);
        assert_eq!(merged["outer"]["a"], 1);
        assert_eq!(merged["outer"]["b"], 3);
        assert_eq!(merged["list"], serde_json::json!([4]));
    }

    #[test]
    fn test_toml_to_json() {
        let toml_val: toml::Value = toml::from_str(
            r#"
            name = "test"
            count = 42
            items = [1, 2]
            [nested]
            key = "value"
        "#,
        )
        .unwrap();

        let json = toml_to_json(toml_val);
        assert_eq!(json["name"], "test");
        assert_eq!(json["count"], 42);
        assert_eq!(json["items"], serde_json::json!([1, 2]));
        assert_eq!(json["nested"]["key"], "value");
    }
}
