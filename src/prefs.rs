use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Longest debounce interval accepted, in seconds.
pub const MAX_UPDATE_RATE: f32 = 2.0;

/// User preferences that persist to disk
#[derive(Resource, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Preferences {
    /// Reproject automatically when geometry changes
    #[serde(default = "default_true")]
    pub auto_apply: bool,
    /// Debounce interval for automatic reprojection, in seconds
    #[serde(default)]
    pub update_rate: f32,
    /// Move each face's UVs so its first corner lands in the unit square
    #[serde(default = "default_true")]
    pub wrap_uvs: bool,
    /// Bind the texture-locked transform operators to the transform keys.
    /// Only read by hosts that install key bindings.
    #[serde(default = "default_true")]
    pub use_locked_transform_keymaps: bool,
}

fn default_true() -> bool {
    true
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            auto_apply: true,
            update_rate: 0.0,
            wrap_uvs: true,
            use_locked_transform_keymaps: true,
        }
    }
}

impl Preferences {
    /// Get the preferences file path
    fn file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("bevy_align_uv");
            p.push("preferences.ron");
            p
        })
    }

    /// Copy with `update_rate` clamped into its valid range.
    pub fn sanitized(mut self) -> Self {
        self.update_rate = if self.update_rate.is_finite() {
            self.update_rate.clamp(0.0, MAX_UPDATE_RATE)
        } else {
            0.0
        };
        self
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs_f32(self.update_rate.clamp(0.0, MAX_UPDATE_RATE))
    }

    /// Parse preferences from RON, or return defaults if the text is invalid
    pub fn from_ron(content: &str) -> Self {
        match ron::from_str::<Self>(content) {
            Ok(prefs) => prefs.sanitized(),
            Err(e) => {
                warn!("Ignoring invalid preferences: {}", e);
                Self::default()
            }
        }
    }

    /// Load preferences from disk, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = Self::file_path() else {
            return Self::default();
        };

        match fs::read_to_string(&path) {
            Ok(content) => Self::from_ron(&content),
            Err(_) => Self::default(),
        }
    }

    /// Save preferences to disk
    pub fn save(&self) {
        let Some(path) = Self::file_path() else {
            error!("Could not determine config directory");
            return;
        };

        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                error!("Failed to create config directory: {}", e);
                return;
            }
        }

        match ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()) {
            Ok(content) => {
                if let Err(e) = fs::write(&path, content) {
                    error!("Failed to save preferences: {}", e);
                } else {
                    info!("Preferences saved to: {:?}", path);
                }
            }
            Err(e) => {
                error!("Failed to serialize preferences: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let prefs = Preferences::default();
        assert!(prefs.auto_apply);
        assert!(prefs.wrap_uvs);
        assert!(prefs.use_locked_transform_keymaps);
        assert_eq!(prefs.update_interval(), Duration::ZERO);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let prefs = Preferences::from_ron("(wrap_uvs: false)");
        assert!(!prefs.wrap_uvs);
        assert!(prefs.auto_apply);
        assert_eq!(prefs.update_rate, 0.0);
    }

    #[test]
    fn update_rate_is_clamped_on_load() {
        assert_eq!(Preferences::from_ron("(update_rate: 7.5)").update_rate, 2.0);
        assert_eq!(Preferences::from_ron("(update_rate: -1.0)").update_rate, 0.0);
    }

    #[test]
    fn invalid_text_falls_back_to_defaults() {
        assert_eq!(Preferences::from_ron("not ron at all"), Preferences::default());
    }

    #[test]
    fn ron_round_trip() {
        let prefs = Preferences {
            auto_apply: false,
            update_rate: 0.5,
            wrap_uvs: false,
            use_locked_transform_keymaps: false,
        };
        let text = ron::ser::to_string_pretty(&prefs, ron::ser::PrettyConfig::default()).unwrap();
        assert_eq!(Preferences::from_ron(&text), prefs);
        assert_eq!(prefs.update_interval(), Duration::from_millis(500));
    }
}
