//! Playback cursor algorithms: song identity matching, wraparound
//! navigation, double-activation tracking, and current-flag sync.
//!
//! Everything here is pure and synchronous; the bus-driven playback manager
//! owns the state these functions operate over.

use crate::catalog::{is_valid_id, Song};

/// True when `candidate` is the song currently playing.
///
/// Matches on the stable id when both records carry one. Records rebuilt
/// from older storage can lack ids, so equal names are accepted as a
/// fallback; two distinct songs sharing a display name will conflate under
/// that path, which is the known cost of keeping old data navigable.
pub fn is_current_song(current: Option<&Song>, candidate: &Song) -> bool {
    let Some(current) = current else {
        return false;
    };
    if is_valid_id(&current.id) && is_valid_id(&candidate.id) {
        return current.id == candidate.id;
    }
    current.name == candidate.name
}

/// Index of `song` in `list` under the identity rule, if any.
pub fn index_of(list: &[Song], song: Option<&Song>) -> Option<usize> {
    let song = song?;
    list.iter()
        .position(|candidate| is_current_song(Some(song), candidate))
}

/// The song after `current`, wrapping past the end back to the start.
///
/// A `current` that is absent or not in the list anchors navigation at
/// index 0. A single-element list wraps to itself.
pub fn next<'a>(list: &'a [Song], current: Option<&Song>) -> Option<&'a Song> {
    if list.is_empty() {
        return None;
    }
    let anchor = index_of(list, current).unwrap_or(0);
    Some(&list[(anchor + 1) % list.len()])
}

/// The song before `current`, wrapping past the start back to the end.
pub fn previous<'a>(list: &'a [Song], current: Option<&Song>) -> Option<&'a Song> {
    if list.is_empty() {
        return None;
    }
    let anchor = index_of(list, current).unwrap_or(0);
    Some(&list[(anchor + list.len() - 1) % list.len()])
}

/// Sets each song's `is_current` flag from the identity rule, writing only
/// on change. Returns how many flags changed so callers can skip redundant
/// change notifications.
pub fn sync_current_flags(songs: &mut [Song], current: Option<&Song>) -> usize {
    let mut changed = 0;
    for song in songs.iter_mut() {
        let flag = is_current_song(current, song);
        if song.is_current != flag {
            song.is_current = flag;
            changed += 1;
        }
    }
    changed
}

#[derive(Debug, Clone, PartialEq)]
struct TrackedClick {
    song_id: String,
    song_name: String,
    at_ms: u64,
}

/// Tracks the most recent row activation to recognize the second half of a
/// double-activation gesture.
#[derive(Debug, Default)]
pub struct DoubleClickTracker {
    last: Option<TrackedClick>,
}

impl DoubleClickTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff `song` matches the previously tracked activation and no more
    /// than `threshold_ms` elapsed since it.
    ///
    /// Tracking re-arms on every call, hit or miss: the current activation
    /// always becomes the new reference point.
    pub fn is_double_click(&mut self, song: &Song, now_ms: u64, threshold_ms: u64) -> bool {
        let hit = match &self.last {
            Some(last) => {
                let same_song = if is_valid_id(&last.song_id) && is_valid_id(&song.id) {
                    last.song_id == song.id
                } else {
                    last.song_name == song.name
                };
                same_song
                    && now_ms
                        .checked_sub(last.at_ms)
                        .is_some_and(|elapsed| elapsed <= threshold_ms)
            }
            None => false,
        };
        self.last = Some(TrackedClick {
            song_id: song.id.clone(),
            song_name: song.name.clone(),
            at_ms: now_ms,
        });
        hit
    }

    /// Forgets the tracked activation. Called when focus leaves the song
    /// rows so an unrelated later click cannot complete a double-click.
    pub fn reset(&mut self) {
        self.last = None;
    }
}
