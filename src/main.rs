//! Headless maintenance entry point.
//!
//! Loads the persisted song and playlist documents, runs the same
//! repair/reconciliation pass the application applies at startup, reports
//! every repair it performed, and writes the normalized documents back.

use std::path::{Path, PathBuf};

use log::{info, warn};

use tunebook::config::Config;
use tunebook::media_probe;
use tunebook::normalizer::{self, NormalizationReport};
use tunebook::store::{CatalogStore, JsonFileStore};

fn panic_payload_to_string(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        return (*s).to_string();
    }
    if let Some(s) = payload.downcast_ref::<String>() {
        return s.clone();
    }
    "non-string panic payload".to_string()
}

fn load_or_create_config() -> Result<Config, Box<dyn std::error::Error>> {
    let config_dir = dirs::config_dir().ok_or("no config directory on this platform")?;
    let config_file = config_dir.join("tunebook.toml");

    if !config_file.exists() {
        let default_config = Config::default();
        info!(
            "Config file not found. Creating default config. path={}",
            config_file.display()
        );
        std::fs::write(&config_file, toml::to_string(&default_config)?)?;
        return Ok(default_config);
    }

    let config_content = std::fs::read_to_string(&config_file)?;
    match toml::from_str::<Config>(&config_content) {
        Ok(config) => Ok(config),
        Err(err) => {
            warn!(
                "Failed to parse {}. Continuing with defaults. error={}",
                config_file.display(),
                err
            );
            Ok(Config::default())
        }
    }
}

fn log_repairs(report: &NormalizationReport) {
    if report.is_clean() {
        info!("Catalog is consistent; nothing to repair");
        return;
    }
    if report.song_ids_assigned > 0 {
        info!("Assigned ids to {} songs", report.song_ids_assigned);
    }
    if report.playlist_ids_assigned > 0 {
        info!("Assigned ids to {} playlists", report.playlist_ids_assigned);
    }
    if report.id_collisions_regenerated > 0 {
        info!(
            "Regenerated {} colliding ids",
            report.id_collisions_regenerated
        );
    }
    if report.volumes_repaired > 0 {
        info!("Repaired {} out-of-range volumes", report.volumes_repaired);
    }
    if report.member_refs_deduped > 0 {
        info!(
            "Dropped {} blank or duplicate member references",
            report.member_refs_deduped
        );
    }
    if report.dangling_refs_pruned > 0 {
        info!(
            "Pruned {} references to deleted songs",
            report.dangling_refs_pruned
        );
    }
    if report.playlists_migrated > 0 {
        info!(
            "Migrated {} playlists from name-based membership ({} names resolved, {} no longer exist)",
            report.playlists_migrated,
            report.legacy_names_resolved,
            report.legacy_names_unresolved
        );
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut clog = colog::default_builder();
    clog.filter(None, log::LevelFilter::Info);
    clog.init();

    std::panic::set_hook(Box::new(|panic_info| {
        let current_thread = std::thread::current();
        let thread_name = current_thread.name().unwrap_or("unnamed");
        log::error!(
            "panic in thread '{}': {}",
            thread_name,
            panic_payload_to_string(panic_info.payload())
        );
    }));

    let config = load_or_create_config()?;

    let store = match &config.storage.data_dir {
        Some(data_dir) => {
            let dir = PathBuf::from(data_dir);
            if !dir.exists() {
                std::fs::create_dir_all(&dir)?;
            }
            JsonFileStore::new(Path::new(data_dir))
        }
        None => JsonFileStore::open_default()?,
    };

    // An unreadable document aborts the pass instead of being treated as an
    // empty library: a repair run must never turn a parse error into a wipe.
    let raw_songs = store.load_songs()?;
    let raw_playlists = store.load_playlists()?;
    info!(
        "Loaded {} song records and {} playlist records",
        raw_songs.len(),
        raw_playlists.len()
    );

    let (mut catalog, report) = normalizer::normalize(raw_songs, raw_playlists);
    log_repairs(&report);

    if config.library.refresh_durations_on_load {
        let mut refreshed = 0;
        for song in &mut catalog.songs {
            let Some(path) = song.media_path.clone() else {
                continue;
            };
            if let Some(duration) = media_probe::probe_duration(&path) {
                if song.duration != duration {
                    song.duration = duration;
                    refreshed += 1;
                }
            }
        }
        if refreshed > 0 {
            info!("Refreshed {} cached durations", refreshed);
        }
    }

    store.save_songs(&catalog.songs)?;
    store.save_playlists(&catalog.playlists)?;
    info!(
        "Wrote {} songs and {} playlists back to {}",
        catalog.songs.len(),
        catalog.playlists.len(),
        store.songs_path().parent().unwrap_or(Path::new(".")).display()
    );

    Ok(())
}
