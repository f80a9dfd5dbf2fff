//! Catalog-domain orchestrator.
//!
//! This component owns the reconciled catalog, restores it from the store
//! through the normalizer, applies caller mutations, persists after every
//! applied change, and broadcasts change notifications via the event bus.

use log::{debug, error, info, warn};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::{Receiver, Sender};

use crate::catalog::{Catalog, MembershipOutcome};
use crate::media_probe;
use crate::normalizer;
use crate::protocol::{self, CatalogMessage};
use crate::store::CatalogStore;

/// Coordinates catalog restore, mutation, and persistence.
pub struct LibraryManager {
    catalog: Catalog,
    bus_consumer: Receiver<protocol::Message>,
    bus_producer: Sender<protocol::Message>,
    store: Box<dyn CatalogStore + Send>,
}

impl LibraryManager {
    /// Creates a library manager bound to bus channels and a storage backend.
    pub fn new(
        bus_consumer: Receiver<protocol::Message>,
        bus_producer: Sender<protocol::Message>,
        store: Box<dyn CatalogStore + Send>,
    ) -> Self {
        Self {
            catalog: Catalog::default(),
            bus_consumer,
            bus_producer,
            store,
        }
    }

    pub fn run(&mut self) {
        self.restore_catalog();

        loop {
            match self.bus_consumer.blocking_recv() {
                Ok(protocol::Message::Catalog(message)) => self.handle_message(message),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!("LibraryManager: Bus lagged, {} messages skipped", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    fn restore_catalog(&mut self) {
        let raw_songs = match self.store.load_songs() {
            Ok(songs) => songs,
            Err(e) => {
                error!("Failed to load songs from store: {}", e);
                Vec::new()
            }
        };
        let raw_playlists = match self.store.load_playlists() {
            Ok(playlists) => playlists,
            Err(e) => {
                error!("Failed to load playlists from store: {}", e);
                Vec::new()
            }
        };

        let (catalog, report) = normalizer::normalize(raw_songs, raw_playlists);
        info!(
            "Restored {} songs and {} playlists",
            catalog.songs.len(),
            catalog.playlists.len()
        );
        if !report.is_clean() {
            info!("Load-time repairs applied: {:?}", report);
        }
        self.catalog = catalog;

        let _ = self.bus_producer.send(protocol::Message::Catalog(
            CatalogMessage::CatalogRestored {
                songs: self.catalog.songs.clone(),
                playlists: self.catalog.playlists.clone(),
            },
        ));
    }

    fn handle_message(&mut self, message: CatalogMessage) {
        match message {
            CatalogMessage::ImportSong { name, media_path } => {
                debug!("LibraryManager: Importing song '{}'", name);
                let id = self.catalog.add_song(name.clone(), media_path);
                if let Some(song) = self.catalog.song_by_id_mut(&id) {
                    if let Some(path) = song.media_path.clone() {
                        if let Some(duration) = media_probe::probe_duration(&path) {
                            song.duration = duration;
                        }
                    }
                }
                self.persist();
                let _ = self
                    .bus_producer
                    .send(protocol::Message::Catalog(CatalogMessage::SongAdded {
                        id,
                        name,
                    }));
                self.broadcast_catalog_changed();
            }
            CatalogMessage::CreatePlaylist { title } => {
                debug!("LibraryManager: Creating playlist '{}'", title);
                let id = self.catalog.add_playlist(title.clone());
                self.persist();
                let _ = self
                    .bus_producer
                    .send(protocol::Message::Catalog(CatalogMessage::PlaylistAdded {
                        id,
                        title,
                    }));
                self.broadcast_catalog_changed();
            }
            CatalogMessage::RenameSong { song_id, name } => {
                if self.catalog.rename_song(&song_id, name) {
                    self.persist();
                    self.broadcast_catalog_changed();
                } else {
                    warn!("LibraryManager: Rename of unknown song {}", song_id);
                }
            }
            CatalogMessage::SetSongLiked { song_id, is_liked } => {
                if self.catalog.set_song_liked(&song_id, is_liked) {
                    self.persist();
                    self.broadcast_catalog_changed();
                }
            }
            CatalogMessage::SetSongVolume { song_id, volume } => {
                if self.catalog.set_song_volume(&song_id, volume) {
                    self.persist();
                    self.broadcast_catalog_changed();
                }
            }
            CatalogMessage::UpdatePlaylistDetails {
                playlist_id,
                title,
                description,
                icon_path,
            } => {
                if let Some(playlist) = self.catalog.playlist_by_id_mut(&playlist_id) {
                    playlist.title = title;
                    playlist.description = description;
                    playlist.icon_path = icon_path;
                    self.persist();
                    self.broadcast_catalog_changed();
                } else {
                    warn!("LibraryManager: Edit of unknown playlist {}", playlist_id);
                }
            }
            CatalogMessage::AddSongToPlaylist {
                song_id,
                playlist_id,
            } => {
                let outcome = self.catalog.add_song_to_playlist(&song_id, &playlist_id);
                debug!(
                    "LibraryManager: Add {} to {}: {:?}",
                    song_id, playlist_id, outcome
                );
                if outcome == MembershipOutcome::Added {
                    self.persist();
                }
                let _ = self.bus_producer.send(protocol::Message::Catalog(
                    CatalogMessage::MembershipChanged {
                        song_id,
                        playlist_id,
                        outcome,
                    },
                ));
                if outcome == MembershipOutcome::Added {
                    self.broadcast_catalog_changed();
                }
            }
            CatalogMessage::RemoveSongFromPlaylist {
                song_id,
                playlist_id,
            } => {
                if self.catalog.remove_song_from_playlist(&song_id, &playlist_id) {
                    self.persist();
                    self.broadcast_catalog_changed();
                }
            }
            CatalogMessage::DeleteSong { song_id } => {
                if self.catalog.delete_song(&song_id) {
                    self.persist();
                    self.broadcast_catalog_changed();
                }
            }
            CatalogMessage::DeletePlaylist { playlist_id } => {
                if self.catalog.delete_playlist(&playlist_id) {
                    self.persist();
                    self.broadcast_catalog_changed();
                }
            }
            CatalogMessage::RefreshDurations => {
                let mut refreshed = 0;
                for song in &mut self.catalog.songs {
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
                info!("LibraryManager: Refreshed {} durations", refreshed);
                if refreshed > 0 {
                    self.persist();
                    self.broadcast_catalog_changed();
                }
            }
            // Notifications, including the ones this component emitted.
            CatalogMessage::CatalogRestored { .. }
            | CatalogMessage::CatalogChanged { .. }
            | CatalogMessage::SongAdded { .. }
            | CatalogMessage::PlaylistAdded { .. }
            | CatalogMessage::MembershipChanged { .. } => {}
        }
    }

    /// Writes both documents. A failed save keeps the in-memory catalog
    /// intact; the next applied mutation writes the full state again.
    fn persist(&mut self) {
        if let Err(e) = self.store.save_songs(&self.catalog.songs) {
            error!("Failed to save songs: {}", e);
        }
        if let Err(e) = self.store.save_playlists(&self.catalog.playlists) {
            error!("Failed to save playlists: {}", e);
        }
    }

    fn broadcast_catalog_changed(&self) {
        let _ = self.bus_producer.send(protocol::Message::Catalog(
            CatalogMessage::CatalogChanged {
                songs: self.catalog.songs.clone(),
                playlists: self.catalog.playlists.clone(),
            },
        ));
    }
}
