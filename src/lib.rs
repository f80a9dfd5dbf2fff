//! Core of a local media-library manager.
//!
//! Songs and user-created playlists live in two flat JSON documents, are
//! repaired and reconciled into an invariant-holding [`catalog::Catalog`] on
//! load, and are navigated by a deterministic playback cursor. The UI shell
//! and the platform media control are external collaborators: the shell
//! drives the runtime components over the [`protocol`] event bus and
//! implements [`playback_engine::PlaybackEngine`].

pub mod catalog;
pub mod config;
pub mod config_persistence;
pub mod library_manager;
pub mod media_probe;
pub mod normalizer;
pub mod playback;
pub mod playback_engine;
pub mod playback_manager;
pub mod protocol;
pub mod store;
