//! Platform playback primitive, consumed as a black box.
//!
//! The real implementation lives with the shell (it wraps whatever media
//! control the platform provides). The core only drives this trait and
//! receives the engine's `MediaOpened`/`MediaEnded`/`Progress` events as
//! [`crate::protocol::PlaybackMessage`] bus traffic, posted by the adapter
//! that owns the platform callbacks.

use std::path::Path;

#[derive(Debug, thiserror::Error)]
#[error("playback engine error: {0}")]
pub struct EngineError(pub String);

pub trait PlaybackEngine {
    /// Loads the media file and prepares it for playback.
    fn open(&mut self, path: &Path) -> Result<(), EngineError>;
    fn play(&mut self);
    fn pause(&mut self);
    fn seek(&mut self, position_ms: u64);
    fn position_ms(&self) -> u64;
    fn duration_ms(&self) -> u64;
}
