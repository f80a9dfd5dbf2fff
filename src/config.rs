//! Persistent application configuration model and defaults.

/// Root configuration persisted to `tunebook.toml`.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Config {
    #[serde(default)]
    /// UI interaction preferences.
    pub ui: UiConfig,
    #[serde(default)]
    /// Playback behavior preferences.
    pub playback: PlaybackConfig,
    #[serde(default)]
    /// Catalog maintenance preferences.
    pub library: LibraryConfig,
    #[serde(default)]
    /// Storage location overrides.
    pub storage: StorageConfig,
}

/// UI interaction preferences persisted between sessions.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct UiConfig {
    /// Maximum gap between two activations of the same song row for them to
    /// count as one double-activation.
    #[serde(default = "default_double_click_threshold_ms")]
    pub double_click_threshold_ms: u64,
    #[serde(default = "default_true")]
    pub auto_scroll_to_current_song: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            double_click_threshold_ms: default_double_click_threshold_ms(),
            auto_scroll_to_current_song: true,
        }
    }
}

/// Playback behavior preferences persisted between sessions.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct PlaybackConfig {
    /// Continue with the next song when the current one finishes.
    #[serde(default = "default_true")]
    pub auto_advance: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self { auto_advance: true }
    }
}

/// Catalog maintenance preferences persisted between sessions.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct LibraryConfig {
    /// Refresh cached display durations from media files during load.
    #[serde(default = "default_true")]
    pub refresh_durations_on_load: bool,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            refresh_durations_on_load: true,
        }
    }
}

/// Storage location overrides persisted between sessions.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct StorageConfig {
    /// Directory holding the song and playlist documents. Empty means the
    /// platform data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_double_click_threshold_ms() -> u64 {
    300
}

#[cfg(test)]
mod tests {
    use super::{Config, LibraryConfig, PlaybackConfig, StorageConfig, UiConfig};

    #[test]
    fn test_default_config_has_expected_values() {
        let config = Config::default();

        assert_eq!(config.ui.double_click_threshold_ms, 300);
        assert!(config.ui.auto_scroll_to_current_song);
        assert!(config.playback.auto_advance);
        assert!(config.library.refresh_durations_on_load);
        assert_eq!(config.storage.data_dir, None);
        assert_eq!(config.ui, UiConfig::default());
        assert_eq!(config.playback, PlaybackConfig::default());
        assert_eq!(config.library, LibraryConfig::default());
        assert_eq!(config.storage, StorageConfig::default());
    }

    #[test]
    fn test_partial_config_deserialization_fills_defaults() {
        let partial_config_toml = r#"
[ui]
double_click_threshold_ms = 450
"#;

        let parsed: Config = toml::from_str(partial_config_toml).expect("config should parse");
        assert_eq!(parsed.ui.double_click_threshold_ms, 450);
        assert!(parsed.ui.auto_scroll_to_current_song);
        assert!(parsed.playback.auto_advance);
        assert!(parsed.library.refresh_durations_on_load);
        assert_eq!(parsed.storage.data_dir, None);
    }

    #[test]
    fn test_config_serialization_includes_every_preference_key() {
        let config_text =
            toml::to_string(&Config::default()).expect("default config should serialize");

        assert!(config_text.contains("double_click_threshold_ms"));
        assert!(config_text.contains("auto_scroll_to_current_song"));
        assert!(config_text.contains("auto_advance"));
        assert!(config_text.contains("refresh_durations_on_load"));
        // An unset data dir stays out of the file so the platform default
        // keeps applying after upgrades.
        assert!(!config_text.contains("data_dir"));
    }
}
