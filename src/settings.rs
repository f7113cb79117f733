use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::audio::{AudioMode, Catalog, CatalogError};

/// Returns the path to the settings file: `~/.config/meowboard/settings.json`
pub fn settings_path() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("meowboard");
    path.push("settings.json");
    path
}

/// Persisted application settings.
///
/// Serialized as JSON to the platform config directory.
/// Fields use `#[serde(default)]` so that adding new settings
/// won't break existing config files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    // Assets
    pub assets_dir: PathBuf,
    /// JSON list of sounds; the bundled list is used when unset
    pub catalog_manifest: Option<PathBuf>,

    // Output
    pub volume: f32,
    pub output_device: Option<String>,

    // Audio mode
    pub plays_in_silent_mode: bool,
    pub stays_active_in_background: bool,
    pub duck_others: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        let mode = AudioMode::default();
        Self {
            assets_dir: PathBuf::from("assets"),
            catalog_manifest: None,

            volume: mode.volume,
            output_device: mode.output_device,

            plays_in_silent_mode: mode.plays_in_silent_mode,
            stays_active_in_background: mode.stays_active_in_background,
            duck_others: mode.duck_others,
        }
    }
}

impl AppSettings {
    /// Load settings from disk, falling back to defaults on any error.
    pub fn load() -> Self {
        Self::load_from(&settings_path())
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    settings
                }
                Err(e) => {
                    log::warn!("Failed to parse settings ({}), using defaults", e);
                    Self::default()
                }
            },
            Err(e) => {
                log::info!("No settings file found ({}), using defaults", e);
                Self::default()
            }
        }
    }

    /// Save settings to disk as pretty JSON.
    pub fn save(&self) -> bool {
        let path = settings_path();
        match self.save_to(&path) {
            Ok(()) => {
                log::info!("Saved settings to {}", path.display());
                true
            }
            Err(e) => {
                log::warn!("Failed to write settings: {}", e);
                false
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    /// Audio subsystem options for the playback session
    pub fn audio_mode(&self) -> AudioMode {
        AudioMode {
            plays_in_silent_mode: self.plays_in_silent_mode,
            stays_active_in_background: self.stays_active_in_background,
            duck_others: self.duck_others,
            volume: self.volume.clamp(0.0, 1.0),
            output_device: self.output_device.clone(),
        }
    }

    /// Build the sound catalog: the manifest if one is configured,
    /// otherwise the bundled list
    pub fn catalog(&self) -> Result<Catalog, CatalogError> {
        match &self.catalog_manifest {
            Some(path) => Catalog::from_manifest(path),
            None => Catalog::bundled(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let settings = AppSettings {
            volume: 0.4,
            output_device: Some("Speakers".to_string()),
            ..AppSettings::default()
        };
        settings.save_to(&path).unwrap();

        assert_eq!(AppSettings::load_from(&path), settings);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "volume": 0.5 }"#).unwrap();

        let settings = AppSettings::load_from(&path);
        assert_eq!(settings.volume, 0.5);
        assert_eq!(settings.assets_dir, PathBuf::from("assets"));
        assert!(settings.plays_in_silent_mode);
    }

    #[test]
    fn test_bad_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not json").unwrap();
        assert_eq!(AppSettings::load_from(&path), AppSettings::default());

        let missing = dir.path().join("missing.json");
        assert_eq!(AppSettings::load_from(&missing), AppSettings::default());
    }

    #[test]
    fn test_audio_mode_clamps_volume() {
        let settings = AppSettings {
            volume: 3.0,
            duck_others: false,
            ..AppSettings::default()
        };
        let mode = settings.audio_mode();
        assert_eq!(mode.volume, 1.0);
        assert!(!mode.duck_others);
    }

    #[test]
    fn test_catalog_defaults_to_bundled() {
        let catalog = AppSettings::default().catalog().unwrap();
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn test_catalog_from_missing_manifest() {
        let settings = AppSettings {
            catalog_manifest: Some(PathBuf::from("does/not/exist.json")),
            ..AppSettings::default()
        };
        assert!(matches!(settings.catalog(), Err(CatalogError::Io(_))));
    }
}
