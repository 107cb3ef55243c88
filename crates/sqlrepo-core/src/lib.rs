//! # sqlrepo-core
//!
//! Core types shared by the sqlrepo-rs crates: the error type, repository
//! settings and their loader, and logging setup. This crate knows nothing
//! about models or statements.
//!
//! ## Modules
//!
//! - [`error`] - Error types and result aliases
//! - [`settings`] - Repository configuration values
//! - [`settings_loader`] - TOML/JSON/environment loading for settings
//! - [`logging`] - Tracing-based logging integration

pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;

// Re-export the most commonly used types at the crate root.
pub use error::{DisableError, DisableFaultKind, FilterError, SqlRepoError, SqlRepoResult};
pub use settings::{
    AllowedNoneFields, FilterConvertStrategy, LoadStrategyKind, RepositorySettings, Settings,
};
