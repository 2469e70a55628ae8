//! Optional JSON settings file.
//!
//! The demo runs fine without one; every field has a default and a missing
//! or malformed file falls back to [`Settings::default`].

use std::path::Path;

fn default_width() -> u32 {
    800
}

fn default_height() -> u32 {
    600
}

fn default_vsync() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct Settings {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default)]
    pub fullscreen: bool,
    #[serde(default = "default_vsync")]
    pub vsync: bool,
    /// Overrides the bundled model path when set.
    #[serde(default)]
    pub model: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            width: default_width(),
            height: default_height(),
            fullscreen: false,
            vsync: default_vsync(),
            model: None,
        }
    }
}

impl Settings {
    pub fn new(s: &str) -> Result<Self, String> {
        serde_json::from_str(s).map_err(|e| e.to_string())
    }

    /// Reads the settings file at `path`, falling back to defaults when the
    /// file is absent or does not parse.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(contents) => match Settings::new(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("Ignoring malformed {}: {}", path.display(), e);
                    Settings::default()
                }
            },
            Err(_) => {
                log::info!("No settings file at {}, using defaults", path.display());
                Settings::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let settings = Settings::new("{}").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn partial_overrides_keep_remaining_defaults() {
        let settings = Settings::new(r#"{"width": 1280, "height": 720, "vsync": false}"#).unwrap();
        assert_eq!(settings.width, 1280);
        assert_eq!(settings.height, 720);
        assert!(!settings.vsync);
        assert!(!settings.fullscreen);
        assert!(settings.model.is_none());
    }

    #[test]
    fn model_path_is_read() {
        let settings = Settings::new(r#"{"model": "assets/models/teapot.gltf"}"#).unwrap();
        assert_eq!(settings.model.as_deref(), Some("assets/models/teapot.gltf"));
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(Settings::new("{not json").is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let settings = Settings::load_or_default("does/not/exist.json");
        assert_eq!(settings, Settings::default());
    }
}
