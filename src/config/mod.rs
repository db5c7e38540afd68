//! Configuration module for Quarry.
//!
//! Handles the settings file, environment variable expansion and defaults.

mod settings;

pub use settings::{
    expand_env_vars, CatalogSettings, LogSettings, QuerySettings, Settings, SettingsError,
};
