//! Flat-file persistence seam for the catalog.
//!
//! The core only defines the shape of what is persisted: two independent
//! documents, one holding the song array and one holding the playlist array.
//! Raw records are deliberately lenient (every field optional, unknown
//! fields ignored) because stored data may come from an older version or a
//! hand-edited file. The normalizer repairs whatever loads.

use std::path::{Path, PathBuf};

use log::info;

use crate::catalog::{Playlist, Song};

/// Untrusted persisted song record.
#[derive(Debug, Clone, Default, serde::Deserialize, serde::Serialize)]
pub struct RawSong {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub playlist_ids: Option<Vec<String>>,
    #[serde(default)]
    pub is_liked: Option<bool>,
    /// Kept as a raw document value so one bad field never rejects the
    /// record; the normalizer decides what it means.
    #[serde(default)]
    pub volume: Option<serde_json::Value>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub media_path: Option<PathBuf>,
}

/// Untrusted persisted playlist record, including the deprecated name-based
/// membership list written by old versions.
#[derive(Debug, Clone, Default, serde::Deserialize, serde::Serialize)]
pub struct RawPlaylist {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon_path: Option<String>,
    #[serde(default)]
    pub song_ids: Option<Vec<String>>,
    #[serde(default)]
    pub legacy_song_names: Option<Vec<String>>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize {document}: {source}")]
    Serialize {
        document: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("no data directory available on this platform")]
    NoDataDir,
}

/// Storage collaborator consumed by the runtime components.
///
/// Implementations move in-memory records to and from durable storage; the
/// core never touches a filesystem path through any other channel.
pub trait CatalogStore {
    fn load_songs(&self) -> Result<Vec<RawSong>, StoreError>;
    fn save_songs(&self, songs: &[Song]) -> Result<(), StoreError>;
    fn load_playlists(&self) -> Result<Vec<RawPlaylist>, StoreError>;
    fn save_playlists(&self, playlists: &[Playlist]) -> Result<(), StoreError>;
}

/// Default store: `songs.json` and `playlists.json` in one directory.
pub struct JsonFileStore {
    songs_path: PathBuf,
    playlists_path: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            songs_path: dir.join("songs.json"),
            playlists_path: dir.join("playlists.json"),
        }
    }

    /// Opens the store in the platform data directory, creating it on first run.
    pub fn open_default() -> Result<Self, StoreError> {
        let data_dir = dirs::data_dir().ok_or(StoreError::NoDataDir)?.join("tunebook");
        if !data_dir.exists() {
            std::fs::create_dir_all(&data_dir).map_err(|source| StoreError::Io {
                path: data_dir.clone(),
                source,
            })?;
            info!("Created data directory {}", data_dir.display());
        }
        Ok(Self::new(&data_dir))
    }

    pub fn songs_path(&self) -> &Path {
        &self.songs_path
    }

    pub fn playlists_path(&self) -> &Path {
        &self.playlists_path
    }

    fn load_document<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
        if !path.exists() {
            // First run: an absent document is an empty collection.
            return Ok(Vec::new());
        }
        let text = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn save_document<T: serde::Serialize>(
        path: &Path,
        document: &'static str,
        records: &[T],
    ) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(records)
            .map_err(|source| StoreError::Serialize { document, source })?;
        std::fs::write(path, text).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl CatalogStore for JsonFileStore {
    fn load_songs(&self) -> Result<Vec<RawSong>, StoreError> {
        Self::load_document(&self.songs_path)
    }

    fn save_songs(&self, songs: &[Song]) -> Result<(), StoreError> {
        Self::save_document(&self.songs_path, "song list", songs)
    }

    fn load_playlists(&self) -> Result<Vec<RawPlaylist>, StoreError> {
        Self::load_document(&self.playlists_path)
    }

    fn save_playlists(&self, playlists: &[Playlist]) -> Result<(), StoreError> {
        Self::save_document(&self.playlists_path, "playlist list", playlists)
    }
}
