use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name used when the preferences location is a directory.
pub const PREFERENCES_FILE_NAME: &str = "layout_preferences.json";
const APP_DIR_NAME: &str = "dashboard_layout";

fn default_resize_throttle_ms() -> u64 {
    16
}

fn default_row_height() -> f32 {
    180.0
}

fn default_collapsed_height() -> f32 {
    44.0
}

fn default_normalize_max_passes() -> usize {
    crate::dashboard::layout::NORMALIZE_MAX_PASSES
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    /// Where layout preferences are stored. May name a file or a directory.
    /// When `None` the platform data directory is used.
    #[serde(default)]
    pub preferences_path: Option<String>,
    /// When enabled the application initialises the logger at debug level.
    #[serde(default)]
    pub debug_logging: bool,
    /// Optional log file. Logs go to stdout when absent.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    /// Minimum time between two tier resolutions while the window is resized.
    #[serde(default = "default_resize_throttle_ms")]
    pub resize_throttle_ms: u64,
    /// Height of an expanded grid row in points.
    #[serde(default = "default_row_height")]
    pub row_height: f32,
    /// Height of a collapsed widget in points.
    #[serde(default = "default_collapsed_height")]
    pub collapsed_height: f32,
    #[serde(default = "default_normalize_max_passes")]
    pub normalize_max_passes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            preferences_path: None,
            debug_logging: false,
            log_file: None,
            resize_throttle_ms: default_resize_throttle_ms(),
            row_height: default_row_height(),
            collapsed_height: default_collapsed_height(),
            normalize_max_passes: default_normalize_max_passes(),
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Resolve the file the preference store reads and writes.
    pub fn preferences_path(&self) -> PathBuf {
        match &self.preferences_path {
            Some(p) => {
                let path = Path::new(p);
                if path.is_dir() {
                    path.join(PREFERENCES_FILE_NAME)
                } else {
                    path.to_path_buf()
                }
            }
            None => dirs_next::data_dir()
                .map(|dir| dir.join(APP_DIR_NAME).join(PREFERENCES_FILE_NAME))
                .unwrap_or_else(|| PathBuf::from(PREFERENCES_FILE_NAME)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings::load(path.to_str().unwrap()).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.resize_throttle_ms, 16);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "debug_logging": true, "row_height": 240.0 }"#).unwrap();
        let settings = Settings::load(path.to_str().unwrap()).unwrap();
        assert!(settings.debug_logging);
        assert_eq!(settings.row_height, 240.0);
        assert_eq!(settings.collapsed_height, 44.0);
    }

    #[test]
    fn invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ nope").unwrap();
        assert!(Settings::load(path.to_str().unwrap()).is_err());
    }

    #[test]
    fn preferences_path_accepts_directory_or_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings {
            preferences_path: Some(dir.path().to_string_lossy().into_owned()),
            ..Settings::default()
        };
        assert_eq!(settings.preferences_path(), dir.path().join(PREFERENCES_FILE_NAME));

        let file = dir.path().join("custom.json");
        settings.preferences_path = Some(file.to_string_lossy().into_owned());
        assert_eq!(settings.preferences_path(), file);
    }

    #[test]
    fn save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            resize_throttle_ms: 33,
            log_file: Some(dir.path().join("dashboard.log")),
            ..Settings::default()
        };
        settings.save(path.to_str().unwrap()).unwrap();
        assert_eq!(Settings::load(path.to_str().unwrap()).unwrap(), settings);
    }
}
