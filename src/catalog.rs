//! Entity model for the reconciled in-memory catalog.
//!
//! Defines `Song`, `Playlist`, and the `Catalog` that owns both collections
//! plus the mutation operations that keep song/playlist membership consistent
//! in both directions.

use std::collections::HashSet;
use std::path::PathBuf;

use uuid::Uuid;

/// Gain assigned to newly created songs and to stored songs without a volume.
pub const DEFAULT_VOLUME: u8 = 100;

/// Gain assigned when a stored volume value cannot be trusted at all.
pub const REPAIRED_VOLUME: u8 = 50;

/// One song in the catalog.
///
/// `playlist_ids` is a derived cache of the playlists that list this song.
/// It is rebuilt by the normalizer on load and maintained by the membership
/// operations on [`Catalog`]; callers never edit it directly.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Song {
    /// Stable identifier, unique within the catalog.
    pub id: String,
    /// 1-based zero-padded ordinal of the current list position. Derived,
    /// recomputed whenever catalog order changes; not an identity.
    #[serde(default)]
    pub display_index: String,
    /// Human-readable title. Also the media filename stem and the key used
    /// to resolve name-based legacy playlist membership.
    pub name: String,
    #[serde(default)]
    pub playlist_ids: Vec<String>,
    #[serde(default)]
    pub is_liked: bool,
    /// Per-song gain in [0, 100].
    #[serde(default = "default_volume")]
    pub volume: u8,
    /// Cached display duration (`m:ss`). Advisory only; refreshed from the
    /// media file when it is readable.
    #[serde(default)]
    pub duration: String,
    /// Path to the media file backing this song, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_path: Option<PathBuf>,
    /// Runtime "currently playing" flag. Never persisted.
    #[serde(skip)]
    pub is_current: bool,
}

fn default_volume() -> u8 {
    DEFAULT_VOLUME
}

impl Song {
    /// Creates a fresh song with a caller-supplied unique id.
    pub fn new(id: String, name: String, media_path: Option<PathBuf>) -> Self {
        Self {
            id,
            display_index: String::new(),
            name,
            playlist_ids: Vec::new(),
            is_liked: false,
            volume: DEFAULT_VOLUME,
            duration: String::new(),
            media_path,
            is_current: false,
        }
    }
}

/// One user-created playlist.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Playlist {
    /// Stable identifier, unique within the catalog.
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Optional external icon image reference. Existence is not validated
    /// here; resolving the path is an I/O concern of the shell.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_path: Option<String>,
    /// Member song ids, display order significant, duplicates forbidden.
    #[serde(default)]
    pub song_ids: Vec<String>,
    /// Name-based membership written by old versions. Read once during
    /// load-time migration and cleared; new code never writes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legacy_song_names: Option<Vec<String>>,
}

impl Playlist {
    /// Creates an empty playlist with a caller-supplied unique id.
    pub fn new(id: String, title: String) -> Self {
        Self {
            id,
            title,
            description: String::new(),
            icon_path: None,
            song_ids: Vec::new(),
            legacy_song_names: None,
        }
    }
}

/// Outcome of a membership add.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipOutcome {
    /// The song was appended to the playlist; both sides updated.
    Added,
    /// The song was already a member; nothing changed.
    AlreadyMember,
    /// The song id or playlist id does not exist in the catalog.
    NotFound,
}

/// True if `v` is usable as an entity id.
pub fn is_valid_id(v: &str) -> bool {
    !v.trim().is_empty()
}

/// Clamps a stored gain value into [0, 100].
///
/// Values above the range clamp to the ceiling. Values below it, and values
/// that are not finite numbers, get [`REPAIRED_VOLUME`]: a negative or
/// garbage gain means the record was corrupted, not that the user wanted
/// silence.
pub fn clamp_volume(v: f64) -> u8 {
    if !v.is_finite() || v < 0.0 {
        REPAIRED_VOLUME
    } else if v > 100.0 {
        100
    } else {
        v.round() as u8
    }
}

/// Generates a fresh opaque entity id.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates an id not present in `claimed` and records it there.
///
/// Retries generation on collision rather than overwriting the holder of the
/// colliding id.
pub fn generate_unique_id(claimed: &mut HashSet<String>) -> String {
    generate_unique_id_with(generate_id, claimed)
}

pub(crate) fn generate_unique_id_with<F>(mut generate: F, claimed: &mut HashSet<String>) -> String
where
    F: FnMut() -> String,
{
    loop {
        let id = generate();
        if is_valid_id(&id) && !claimed.contains(&id) {
            claimed.insert(id.clone());
            return id;
        }
    }
}

/// The reconciled set of all songs and playlists.
///
/// After construction through the normalizer, and after every mutation
/// operation below, membership holds in both directions: a song lists a
/// playlist id exactly when that playlist lists the song id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    pub songs: Vec<Song>,
    pub playlists: Vec<Playlist>,
}

impl Catalog {
    pub fn song_by_id(&self, id: &str) -> Option<&Song> {
        self.songs.iter().find(|song| song.id == id)
    }

    pub fn song_by_id_mut(&mut self, id: &str) -> Option<&mut Song> {
        self.songs.iter_mut().find(|song| song.id == id)
    }

    pub fn playlist_by_id(&self, id: &str) -> Option<&Playlist> {
        self.playlists.iter().find(|playlist| playlist.id == id)
    }

    pub fn playlist_by_id_mut(&mut self, id: &str) -> Option<&mut Playlist> {
        self.playlists.iter_mut().find(|playlist| playlist.id == id)
    }

    /// Every id currently claimed by a song or playlist.
    pub fn claimed_ids(&self) -> HashSet<String> {
        self.songs
            .iter()
            .map(|song| song.id.clone())
            .chain(self.playlists.iter().map(|playlist| playlist.id.clone()))
            .collect()
    }

    /// Appends a new song with a freshly generated unique id and returns the id.
    pub fn add_song(&mut self, name: String, media_path: Option<PathBuf>) -> String {
        let mut claimed = self.claimed_ids();
        let id = generate_unique_id(&mut claimed);
        self.songs.push(Song::new(id.clone(), name, media_path));
        self.renumber_songs();
        id
    }

    /// Appends a new empty playlist with a freshly generated unique id.
    pub fn add_playlist(&mut self, title: String) -> String {
        let mut claimed = self.claimed_ids();
        let id = generate_unique_id(&mut claimed);
        self.playlists.push(Playlist::new(id.clone(), title));
        id
    }

    pub fn rename_song(&mut self, song_id: &str, name: String) -> bool {
        match self.song_by_id_mut(song_id) {
            Some(song) => {
                song.name = name;
                true
            }
            None => false,
        }
    }

    pub fn set_song_liked(&mut self, song_id: &str, is_liked: bool) -> bool {
        match self.song_by_id_mut(song_id) {
            Some(song) => {
                song.is_liked = is_liked;
                true
            }
            None => false,
        }
    }

    pub fn set_song_volume(&mut self, song_id: &str, volume: u8) -> bool {
        match self.song_by_id_mut(song_id) {
            Some(song) => {
                song.volume = volume.min(100);
                true
            }
            None => false,
        }
    }

    /// Adds `song_id` to `playlist_id`, updating both membership sides in the
    /// same step. A membership edit also discards any stale name-based legacy
    /// list still riding on the playlist.
    pub fn add_song_to_playlist(&mut self, song_id: &str, playlist_id: &str) -> MembershipOutcome {
        if self.song_by_id(song_id).is_none() {
            return MembershipOutcome::NotFound;
        }
        let Some(playlist) = self.playlist_by_id_mut(playlist_id) else {
            return MembershipOutcome::NotFound;
        };
        if playlist.song_ids.iter().any(|id| id == song_id) {
            return MembershipOutcome::AlreadyMember;
        }
        playlist.legacy_song_names = None;
        playlist.song_ids.push(song_id.to_string());
        let song = self
            .song_by_id_mut(song_id)
            .expect("membership target verified above");
        if !song.playlist_ids.iter().any(|id| id == playlist_id) {
            song.playlist_ids.push(playlist_id.to_string());
        }
        MembershipOutcome::Added
    }

    /// Removes `song_id` from `playlist_id` on both membership sides.
    /// Returns false when nothing referenced anything.
    pub fn remove_song_from_playlist(&mut self, song_id: &str, playlist_id: &str) -> bool {
        let mut removed = false;
        if let Some(playlist) = self.playlist_by_id_mut(playlist_id) {
            let before = playlist.song_ids.len();
            playlist.song_ids.retain(|id| id != song_id);
            removed |= playlist.song_ids.len() != before;
        }
        if let Some(song) = self.song_by_id_mut(song_id) {
            let before = song.playlist_ids.len();
            song.playlist_ids.retain(|id| id != playlist_id);
            removed |= song.playlist_ids.len() != before;
        }
        removed
    }

    /// Deletes a song and strips its id from every playlist that lists it.
    pub fn delete_song(&mut self, song_id: &str) -> bool {
        let before = self.songs.len();
        self.songs.retain(|song| song.id != song_id);
        if self.songs.len() == before {
            return false;
        }
        for playlist in &mut self.playlists {
            playlist.song_ids.retain(|id| id != song_id);
        }
        self.renumber_songs();
        true
    }

    /// Deletes a playlist and strips its id from every member song.
    pub fn delete_playlist(&mut self, playlist_id: &str) -> bool {
        let before = self.playlists.len();
        self.playlists.retain(|playlist| playlist.id != playlist_id);
        if self.playlists.len() == before {
            return false;
        }
        for song in &mut self.songs {
            song.playlist_ids.retain(|id| id != playlist_id);
        }
        true
    }

    /// Recomputes every song's display ordinal from its current position.
    ///
    /// Ordinals are 1-based and zero-padded to the width of the largest
    /// ordinal, never narrower than two digits.
    pub fn renumber_songs(&mut self) {
        let width = ordinal_width(self.songs.len());
        for (index, song) in self.songs.iter_mut().enumerate() {
            song.display_index = format!("{:0width$}", index + 1, width = width);
        }
    }
}

fn ordinal_width(count: usize) -> usize {
    let mut width = 1;
    let mut remaining = count;
    while remaining >= 10 {
        remaining /= 10;
        width += 1;
    }
    width.max(2)
}
