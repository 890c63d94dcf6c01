//! Place3D Services Layer
//!
//! Process-level configuration for the coordinator and its sessions.

pub mod settings;

pub use settings::{Settings, SettingsError};

use std::path::Path;

/// Load settings from `path`, or fall back to defaults when no file is given.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, SettingsError> {
    match path {
        Some(path) => Settings::load(path),
        None => {
            tracing::info!("No settings file given, using defaults");
            Ok(Settings::default())
        }
    }
}
