use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::STEPS_PER_PATTERN;
use crate::snap::Snap;

pub const CONFIG_ENV: &str = "STEPGRID_CONFIG";
pub const CONFIG_FILE_NAME: &str = "stepgrid.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub steps: usize,
    pub rows: usize,
    pub snap: Snap,
    pub edge_threshold_px: f32,
    pub handle_radius_px: f32,
    pub quick_click_ms: u64,
    pub drag_threshold_px: f32,
    pub gutter_width: f32,
    pub min_step_width: f32,
    pub min_row_height: f32,
    pub frame_interval_ms: u64,
    pub bpm: f32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            steps: STEPS_PER_PATTERN,
            rows: 24,
            snap: Snap::One,
            edge_threshold_px: 15.0,
            handle_radius_px: 8.0,
            quick_click_ms: 250,
            drag_threshold_px: 3.0,
            gutter_width: 72.0,
            min_step_width: 24.0,
            min_row_height: 18.0,
            frame_interval_ms: 16,
            bpm: 120.0,
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    let cwd = std::env::current_dir().ok()?;
    cwd.ancestors()
        .map(|ancestor| ancestor.join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.exists())
}

impl EditorConfig {
    /// Loads from `STEPGRID_CONFIG` or the nearest `stepgrid.json`, falling
    /// back to defaults when neither exists.
    pub fn load() -> Result<Self, ConfigError> {
        match default_config_path() {
            Some(path) => Self::load_from(&path),
            None => {
                log::info!("no {CONFIG_FILE_NAME} found, using default editor config");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: EditorConfig =
            serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        log::info!("loaded editor config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rows == 0 {
            return Err(ConfigError::Invalid("rows must be at least 1".into()));
        }
        if self.steps == 0 {
            return Err(ConfigError::Invalid("steps must be at least 1".into()));
        }
        let sizes = [
            ("edge_threshold_px", self.edge_threshold_px),
            ("handle_radius_px", self.handle_radius_px),
            ("drag_threshold_px", self.drag_threshold_px),
            ("gutter_width", self.gutter_width),
            ("min_step_width", self.min_step_width),
            ("min_row_height", self.min_row_height),
            ("bpm", self.bpm),
        ];
        if let Some((name, value)) = sizes.iter().find(|(_, value)| !(*value > 0.0)) {
            return Err(ConfigError::Invalid(format!("{name} must be positive (got {value})")));
        }
        if self.frame_interval_ms == 0 {
            return Err(ConfigError::Invalid("frame_interval_ms must be at least 1".into()));
        }
        Ok(())
    }

    /// Steps advanced per millisecond of playback at `bpm`, four steps per beat.
    pub fn steps_per_ms(&self) -> f32 {
        self.bpm * 4.0 / 60_000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: EditorConfig =
            serde_json::from_str(r#"{ "rows": 12, "snap": 4 }"#).expect("parse config");
        assert_eq!(config.rows, 12);
        assert_eq!(config.snap, Snap::Four);
        assert_eq!(config.steps, STEPS_PER_PATTERN);
        assert_eq!(config.quick_click_ms, 250);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = EditorConfig {
            rows: 0,
            ..EditorConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        let config = EditorConfig {
            min_step_width: 0.0,
            ..EditorConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_from_reports_parse_errors() {
        let dir = std::env::temp_dir().join(format!("stepgrid-config-{}", std::process::id()));
        fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join(CONFIG_FILE_NAME);
        fs::write(&path, r#"{ "snap": 3 }"#).expect("write config");
        assert!(matches!(
            EditorConfig::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
        fs::write(&path, r#"{ "bpm": 90.0 }"#).expect("write config");
        let config = EditorConfig::load_from(&path).expect("load config");
        assert_eq!(config.bpm, 90.0);
        let _ = fs::remove_dir_all(&dir);
    }
}
