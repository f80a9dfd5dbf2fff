//! Event-bus protocol shared by all runtime components.
//!
//! This module defines all message payloads exchanged between the catalog
//! owner, the playback manager, the platform engine adapter, and the shell.

use std::path::PathBuf;

use crate::catalog::{MembershipOutcome, Playlist, Song};
use crate::config::Config;

/// Top-level envelope for all bus traffic.
#[derive(Debug, Clone)]
pub enum Message {
    Catalog(CatalogMessage),
    Playback(PlaybackMessage),
    Config(ConfigMessage),
}

/// Catalog-domain commands and notifications.
#[derive(Debug, Clone)]
pub enum CatalogMessage {
    /// Import a new song into the catalog under a freshly generated id.
    ImportSong {
        name: String,
        media_path: Option<PathBuf>,
    },
    CreatePlaylist {
        title: String,
    },
    RenameSong {
        song_id: String,
        name: String,
    },
    SetSongLiked {
        song_id: String,
        is_liked: bool,
    },
    SetSongVolume {
        song_id: String,
        volume: u8,
    },
    /// Edit playlist display metadata. `icon_path` replaces the stored value
    /// as given, including clearing it with `None`.
    UpdatePlaylistDetails {
        playlist_id: String,
        title: String,
        description: String,
        icon_path: Option<String>,
    },
    AddSongToPlaylist {
        song_id: String,
        playlist_id: String,
    },
    RemoveSongFromPlaylist {
        song_id: String,
        playlist_id: String,
    },
    DeleteSong {
        song_id: String,
    },
    DeletePlaylist {
        playlist_id: String,
    },
    /// Re-read advisory durations from the media files that are readable.
    RefreshDurations,

    /// The catalog finished loading and reconciling persisted records.
    CatalogRestored {
        songs: Vec<Song>,
        playlists: Vec<Playlist>,
    },
    /// Snapshot broadcast after every applied mutation.
    CatalogChanged {
        songs: Vec<Song>,
        playlists: Vec<Playlist>,
    },
    SongAdded {
        id: String,
        name: String,
    },
    PlaylistAdded {
        id: String,
        title: String,
    },
    /// Result of a membership add request.
    MembershipChanged {
        song_id: String,
        playlist_id: String,
        outcome: MembershipOutcome,
    },
}

/// Playback-domain commands, engine events, and notifications.
#[derive(Debug, Clone)]
pub enum PlaybackMessage {
    /// Replace the active playback list with a caller-chosen view. The
    /// current song keeps playing even when it is not in the new view.
    ActivateList(Vec<Song>),
    /// A song row was activated at `at_ms` (caller-supplied monotonic
    /// milliseconds). Two activations of the same song within the configured
    /// threshold start playback.
    RowActivated {
        song: Song,
        at_ms: u64,
    },
    /// Focus moved off the song rows; forget the pending activation.
    PointerLeftRows,
    Play,
    Pause,
    Next,
    Previous,
    Seek(u64),

    /// Engine event: the opened media is ready, with its real duration.
    MediaOpened {
        duration_ms: u64,
    },
    /// Engine event: the current media played to its end.
    MediaEnded,
    /// Engine event: periodic position report.
    Progress {
        elapsed_ms: u64,
        total_ms: u64,
    },

    /// The playback cursor moved (or cleared).
    CurrentSongChanged(Option<Song>),
    PlaybackStateChanged {
        is_playing: bool,
    },
}

/// Runtime configuration updates.
#[derive(Debug, Clone)]
pub enum ConfigMessage {
    ConfigChanged(Config),
}
