//! Settings management

use glam::Vec3;
use place3d_core::{Color, GridConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading or validating settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("grid size must be at least 1")]
    EmptyGrid,

    #[error("cube size must be a positive finite number, got {0}")]
    InvalidCubeSize(f32),

    #[error("max height must be at least 1")]
    ZeroMaxHeight,

    #[error("player palette must contain at least one color")]
    EmptyPalette,
}

/// Coordinator settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub network: NetworkSettings,
    pub world: WorldSettings,
    pub client: ClientSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    pub bind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorldSettings {
    pub grid: GridConfig,
    /// Where new players appear before their first move.
    pub spawn_position: Vec3,
    /// Colors handed out to players round-robin by id.
    pub palette: Vec<Color>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientSettings {
    /// How long a session keeps an unconfirmed placement preview.
    pub prediction_timeout_ms: u64,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
        }
    }
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            spawn_position: Vec3::new(0.0, 2.0, 10.0),
            palette: Color::default_palette(),
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            prediction_timeout_ms: 2_000,
        }
    }
}

impl ClientSettings {
    pub fn prediction_timeout(&self) -> Duration {
        Duration::from_millis(self.prediction_timeout_ms)
    }
}

impl Settings {
    /// Read and validate a JSON settings file. Missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_json(&text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate()?;
        tracing::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let grid = &self.world.grid;
        if grid.grid_size == 0 {
            return Err(SettingsError::EmptyGrid);
        }
        if !(grid.cube_size.is_finite() && grid.cube_size > 0.0) {
            return Err(SettingsError::InvalidCubeSize(grid.cube_size));
        }
        if grid.max_height == 0 {
            return Err(SettingsError::ZeroMaxHeight);
        }
        if self.world.palette.is_empty() {
            return Err(SettingsError::EmptyPalette);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_classic_board() {
        let settings = Settings::default();
        assert_eq!(settings.network.bind, "0.0.0.0:3000");
        assert_eq!(settings.world.grid.grid_size, 50);
        assert_eq!(settings.world.grid.max_height, 20);
        assert_eq!(settings.world.palette, Color::default_palette());
        assert_eq!(settings.world.spawn_position, Vec3::new(0.0, 2.0, 10.0));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let settings = Settings::from_json(
            r#"{ "world": { "grid": { "maxHeight": 8 } }, "client": { "predictionTimeoutMs": 500 } }"#,
        )
        .unwrap();
        assert_eq!(settings.world.grid.max_height, 8);
        assert_eq!(settings.world.grid.grid_size, 50);
        assert_eq!(settings.network.bind, "0.0.0.0:3000");
        assert_eq!(settings.client.prediction_timeout(), Duration::from_millis(500));
    }

    #[test]
    fn validation_rejects_degenerate_worlds() {
        let mut settings = Settings::default();
        settings.world.grid.cube_size = 0.0;
        assert!(matches!(settings.validate(), Err(SettingsError::InvalidCubeSize(_))));

        let mut settings = Settings::default();
        settings.world.palette.clear();
        assert!(matches!(settings.validate(), Err(SettingsError::EmptyPalette)));

        let mut settings = Settings::default();
        settings.world.grid.max_height = 0;
        assert!(matches!(settings.validate(), Err(SettingsError::ZeroMaxHeight)));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = Settings::load(Path::new("/nonexistent/place3d.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/place3d.json"));
    }
}
