//! Load-time repair, migration, and membership reconciliation.
//!
//! Persisted records are untrusted: older versions wrote name-based playlist
//! membership, hand-edited files carry blank or duplicate ids, and deletes
//! may have left dangling references. This pass turns whatever loaded into a
//! catalog whose song/playlist membership agrees in both directions. It
//! repairs rather than rejects; nothing in here fails.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::catalog::{
    clamp_volume, generate_unique_id, is_valid_id, Catalog, Playlist, Song, DEFAULT_VOLUME,
    REPAIRED_VOLUME,
};
use crate::store::{RawPlaylist, RawSong};

/// Counts of every repair performed by one normalization pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizationReport {
    pub song_ids_assigned: usize,
    pub playlist_ids_assigned: usize,
    pub id_collisions_regenerated: usize,
    pub volumes_repaired: usize,
    pub member_refs_deduped: usize,
    pub dangling_refs_pruned: usize,
    pub playlists_migrated: usize,
    pub legacy_names_resolved: usize,
    pub legacy_names_unresolved: usize,
}

impl NormalizationReport {
    /// True when the pass changed nothing worth reporting.
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

/// Builds a reconciled catalog from raw persisted records.
///
/// Single pass per collection, then one cross-pass:
/// 1. songs: assign/regenerate ids, repair volumes, build lookups;
/// 2. playlists: assign/regenerate ids, dedupe member lists;
/// 3. migrate name-based legacy membership where no id list exists;
/// 4. prune member ids that resolve to no song;
/// 5. rebuild every song's playlist list by inverting the playlist side,
///    which is the source of truth.
pub fn normalize(
    raw_songs: Vec<RawSong>,
    raw_playlists: Vec<RawPlaylist>,
) -> (Catalog, NormalizationReport) {
    let mut report = NormalizationReport::default();
    let mut claimed: HashSet<String> = HashSet::new();

    // Step 1: song pass.
    let mut songs: Vec<Song> = Vec::with_capacity(raw_songs.len());
    for raw in raw_songs {
        let id = claim_id(
            raw.id.as_deref(),
            &mut claimed,
            &mut report.song_ids_assigned,
            &mut report.id_collisions_regenerated,
        );
        let volume = volume_from_raw(raw.volume.as_ref(), &mut report.volumes_repaired);
        songs.push(Song {
            id,
            display_index: String::new(),
            name: raw.name.unwrap_or_default(),
            // Provisional; step 5 rebuilds this from the playlist side.
            playlist_ids: dedup_ids(raw.playlist_ids.unwrap_or_default(), &mut 0),
            is_liked: raw.is_liked.unwrap_or(false),
            volume,
            duration: raw.duration.unwrap_or_default(),
            media_path: raw.media_path,
            is_current: false,
        });
    }

    // Name lookup is case-insensitive to match what older versions stored;
    // first occurrence wins for duplicate names. Id lookup is exact.
    let mut song_index_by_name: HashMap<String, usize> = HashMap::new();
    let mut song_index_by_id: HashMap<String, usize> = HashMap::new();
    for (index, song) in songs.iter().enumerate() {
        song_index_by_name
            .entry(song.name.to_lowercase())
            .or_insert(index);
        song_index_by_id.insert(song.id.clone(), index);
    }

    // Step 2: playlist pass.
    let mut playlists: Vec<Playlist> = Vec::with_capacity(raw_playlists.len());
    for raw in raw_playlists {
        let id = claim_id(
            raw.id.as_deref(),
            &mut claimed,
            &mut report.playlist_ids_assigned,
            &mut report.id_collisions_regenerated,
        );
        playlists.push(Playlist {
            id,
            title: raw.title.unwrap_or_default(),
            description: raw.description.unwrap_or_default(),
            icon_path: raw.icon_path,
            song_ids: dedup_ids(raw.song_ids.unwrap_or_default(), &mut report.member_refs_deduped),
            legacy_song_names: raw.legacy_song_names,
        });
    }

    // Step 3: legacy migration. Only playlists that never got an id-based
    // member list carry meaning in their name list; an id list alongside
    // legacy names means the names are stale leftovers and stay untouched
    // here (the first membership edit discards them).
    for playlist in &mut playlists {
        if !playlist.song_ids.is_empty() {
            continue;
        }
        let Some(legacy_names) = playlist.legacy_song_names.take() else {
            continue;
        };
        report.playlists_migrated += 1;
        for name in legacy_names {
            match song_index_by_name.get(&name.to_lowercase()) {
                Some(&index) => {
                    let song_id = &songs[index].id;
                    if !playlist.song_ids.iter().any(|id| id == song_id) {
                        playlist.song_ids.push(song_id.clone());
                    }
                    report.legacy_names_resolved += 1;
                }
                None => {
                    // The named song was deleted since the old save; the
                    // reference is dropped, not reported as an error.
                    debug!(
                        "Dropping unresolved legacy member '{}' of playlist '{}'",
                        name, playlist.title
                    );
                    report.legacy_names_unresolved += 1;
                }
            }
        }
    }

    // Step 4: prune references to songs that no longer exist.
    for playlist in &mut playlists {
        let before = playlist.song_ids.len();
        playlist
            .song_ids
            .retain(|id| song_index_by_id.contains_key(id));
        report.dangling_refs_pruned += before - playlist.song_ids.len();
    }

    // Step 5: cross-reconciliation. The playlist side is authoritative, so
    // every song's playlist list is rebuilt from scratch; whatever the song
    // records carried in storage is discarded rather than merged.
    for song in &mut songs {
        song.playlist_ids.clear();
    }
    for playlist in &playlists {
        for song_id in &playlist.song_ids {
            let index = song_index_by_id[song_id];
            songs[index].playlist_ids.push(playlist.id.clone());
        }
    }

    let mut catalog = Catalog { songs, playlists };
    catalog.renumber_songs();
    (catalog, report)
}

fn claim_id(
    stored: Option<&str>,
    claimed: &mut HashSet<String>,
    assigned: &mut usize,
    collisions: &mut usize,
) -> String {
    match stored {
        Some(id) if is_valid_id(id) => {
            if claimed.insert(id.to_string()) {
                id.to_string()
            } else {
                *collisions += 1;
                generate_unique_id(claimed)
            }
        }
        _ => {
            *assigned += 1;
            generate_unique_id(claimed)
        }
    }
}

/// Order-preserving, first-seen dedup that also drops blank entries.
fn dedup_ids(ids: Vec<String>, dropped: &mut usize) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let before = ids.len();
    let deduped: Vec<String> = ids
        .into_iter()
        .filter(|id| is_valid_id(id) && seen.insert(id.clone()))
        .collect();
    *dropped += before - deduped.len();
    deduped
}

/// Interprets a stored volume value.
///
/// An absent value is a song saved before per-song gain existed and gets the
/// full-gain default. A present value that is not a number in [0, 100] is
/// corruption and gets the repaired fallback (above-range values clamp to
/// the ceiling instead).
fn volume_from_raw(raw: Option<&serde_json::Value>, repaired: &mut usize) -> u8 {
    let Some(value) = raw else {
        return DEFAULT_VOLUME;
    };
    let parsed = match value {
        serde_json::Value::Null => return DEFAULT_VOLUME,
        serde_json::Value::Number(number) => number.as_f64(),
        serde_json::Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(number) => {
            let clamped = clamp_volume(number);
            if f64::from(clamped) != number {
                *repaired += 1;
            }
            clamped
        }
        None => {
            *repaired += 1;
            REPAIRED_VOLUME
        }
    }
}
