use std::path::Path;

use log::warn;
use toml_edit::{value, DocumentMut, Item, Table};

use crate::config::Config;

fn set_table_value_preserving_decor(table: &mut Table, key: &str, item: Item) {
    let existing_value_decor = table
        .get(key)
        .and_then(|current| current.as_value().map(|value| value.decor().clone()));
    table[key] = item;
    if let Some(existing_value_decor) = existing_value_decor {
        if let Some(next_value) = table[key].as_value_mut() {
            *next_value.decor_mut() = existing_value_decor;
        }
    }
}

fn set_table_scalar_if_changed<T, F>(
    table: &mut Table,
    key: &str,
    previous_value: T,
    next_value: T,
    to_item: F,
) where
    T: PartialEq + Copy,
    F: FnOnce(T) -> Item,
{
    if table.contains_key(key) && previous_value == next_value {
        return;
    }
    set_table_value_preserving_decor(table, key, to_item(next_value));
}

fn ensure_section_table(document: &mut DocumentMut, key: &str) {
    let root = document.as_table_mut();
    let should_replace = !matches!(root.get(key), Some(item) if item.is_table());
    if should_replace {
        root.insert(key, Item::Table(Table::new()));
    }
}

fn write_config_to_document(document: &mut DocumentMut, previous: &Config, config: &Config) {
    ensure_section_table(document, "ui");
    ensure_section_table(document, "playback");
    ensure_section_table(document, "library");
    ensure_section_table(document, "storage");

    {
        let ui = document["ui"].as_table_mut().expect("ui should be a table");
        set_table_scalar_if_changed(
            ui,
            "double_click_threshold_ms",
            previous.ui.double_click_threshold_ms as i64,
            config.ui.double_click_threshold_ms as i64,
            value,
        );
        set_table_scalar_if_changed(
            ui,
            "auto_scroll_to_current_song",
            previous.ui.auto_scroll_to_current_song,
            config.ui.auto_scroll_to_current_song,
            value,
        );
    }

    {
        let playback = document["playback"]
            .as_table_mut()
            .expect("playback should be a table");
        set_table_scalar_if_changed(
            playback,
            "auto_advance",
            previous.playback.auto_advance,
            config.playback.auto_advance,
            value,
        );
    }

    {
        let library = document["library"]
            .as_table_mut()
            .expect("library should be a table");
        set_table_scalar_if_changed(
            library,
            "refresh_durations_on_load",
            previous.library.refresh_durations_on_load,
            config.library.refresh_durations_on_load,
            value,
        );
    }

    {
        let storage = document["storage"]
            .as_table_mut()
            .expect("storage should be a table");
        match &config.storage.data_dir {
            Some(data_dir) => {
                if !storage.contains_key("data_dir")
                    || previous.storage.data_dir != config.storage.data_dir
                {
                    set_table_value_preserving_decor(storage, "data_dir", value(data_dir.clone()));
                }
            }
            None => {
                storage.remove("data_dir");
            }
        }
    }
}

/// Rewrites `existing_text` to carry `config` while keeping user comments
/// and formatting on untouched keys.
pub fn serialize_config_with_preserved_comments(
    existing_text: &str,
    config: &Config,
) -> Result<String, String> {
    let previous = toml::from_str::<Config>(existing_text)
        .map_err(|err| format!("failed to parse existing config as Config: {}", err))?;
    let mut document = existing_text
        .parse::<DocumentMut>()
        .map_err(|err| format!("failed to parse existing config as TOML document: {}", err))?;
    write_config_to_document(&mut document, &previous, config);
    Ok(document.to_string())
}

pub fn persist_config_file(config: &Config, path: &Path) {
    let existing_text = std::fs::read_to_string(path).ok();
    let config_text = if let Some(existing_text) = existing_text {
        match serialize_config_with_preserved_comments(&existing_text, config) {
            Ok(updated_text) => Some(updated_text),
            Err(err) => {
                warn!(
                    "Failed to preserve config comments for {} ({}). Falling back to plain serialization.",
                    path.display(),
                    err
                );
                toml::to_string(config).ok()
            }
        }
    } else {
        toml::to_string(config).ok()
    };

    let Some(config_text) = config_text else {
        log::error!("Failed to serialize config for {}", path.display());
        return;
    };

    if let Err(err) = std::fs::write(path, config_text) {
        log::error!("Failed to persist config to {}: {}", path.display(), err);
    }
}

#[cfg(test)]
mod tests {
    use super::serialize_config_with_preserved_comments;
    use crate::config::Config;

    #[test]
    fn test_updated_keys_keep_their_comments() {
        let existing = r#"
[ui]
double_click_threshold_ms = 300 # how fast is a double click
auto_scroll_to_current_song = true

[playback]
auto_advance = true
"#;
        let mut config = Config::default();
        config.ui.double_click_threshold_ms = 500;

        let updated = serialize_config_with_preserved_comments(existing, &config)
            .expect("existing config should rewrite");

        assert!(updated.contains("double_click_threshold_ms = 500 # how fast is a double click"));
        assert!(updated.contains("auto_advance = true"));
    }

    #[test]
    fn test_unchanged_keys_are_left_untouched() {
        let existing = r#"
# tunebook preferences
[ui]
double_click_threshold_ms = 275
"#;
        let mut config: Config = toml::from_str(existing).expect("existing config should parse");
        config.playback.auto_advance = false;

        let updated = serialize_config_with_preserved_comments(existing, &config)
            .expect("existing config should rewrite");

        assert!(updated.contains("# tunebook preferences"));
        assert!(updated.contains("double_click_threshold_ms = 275"));
        assert!(updated.contains("auto_advance = false"));
    }

    #[test]
    fn test_missing_sections_are_created() {
        let config = Config::default();
        let updated = serialize_config_with_preserved_comments("", &config)
            .expect("empty config should rewrite");

        assert!(updated.contains("[ui]"));
        assert!(updated.contains("[playback]"));
        assert!(updated.contains("[library]"));
        assert!(updated.contains("[storage]"));
    }
}
