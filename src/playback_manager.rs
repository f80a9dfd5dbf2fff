//! Playback-domain orchestrator.
//!
//! Owns the active playback list and the playback cursor, recognizes
//! double-activation gestures, and drives the platform engine. The active
//! list only changes on an explicit `ActivateList`, so playback continues
//! across whatever view the shell is currently showing.

use log::{debug, error, trace, warn};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::{Receiver, Sender};

use crate::catalog::Song;
use crate::config::Config;
use crate::playback::{self, DoubleClickTracker};
use crate::playback_engine::PlaybackEngine;
use crate::protocol::{self, ConfigMessage, PlaybackMessage};

/// Coordinates transport commands, gesture detection, and the engine.
pub struct PlaybackManager {
    active_list: Vec<Song>,
    current: Option<Song>,
    is_playing: bool,
    current_elapsed_ms: u64,
    current_duration_ms: u64,
    click_tracker: DoubleClickTracker,
    double_click_threshold_ms: u64,
    auto_advance: bool,
    bus_consumer: Receiver<protocol::Message>,
    bus_producer: Sender<protocol::Message>,
    engine: Box<dyn PlaybackEngine + Send>,
}

impl PlaybackManager {
    /// Creates a playback manager bound to bus channels and an engine.
    pub fn new(
        bus_consumer: Receiver<protocol::Message>,
        bus_producer: Sender<protocol::Message>,
        engine: Box<dyn PlaybackEngine + Send>,
        config: &Config,
    ) -> Self {
        Self {
            active_list: Vec::new(),
            current: None,
            is_playing: false,
            current_elapsed_ms: 0,
            current_duration_ms: 0,
            click_tracker: DoubleClickTracker::new(),
            double_click_threshold_ms: config.ui.double_click_threshold_ms,
            auto_advance: config.playback.auto_advance,
            bus_consumer,
            bus_producer,
            engine,
        }
    }

    pub fn run(&mut self) {
        loop {
            match self.bus_consumer.blocking_recv() {
                Ok(protocol::Message::Playback(message)) => self.handle_message(message),
                Ok(protocol::Message::Config(ConfigMessage::ConfigChanged(config))) => {
                    self.double_click_threshold_ms = config.ui.double_click_threshold_ms;
                    self.auto_advance = config.playback.auto_advance;
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!("PlaybackManager: Bus lagged, {} messages skipped", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    fn handle_message(&mut self, message: PlaybackMessage) {
        match message {
            PlaybackMessage::ActivateList(songs) => {
                debug!(
                    "PlaybackManager: Active list replaced ({} songs)",
                    songs.len()
                );
                self.active_list = songs;
                playback::sync_current_flags(&mut self.active_list, self.current.as_ref());
            }
            PlaybackMessage::RowActivated { song, at_ms } => {
                if self.click_tracker.is_double_click(
                    &song,
                    at_ms,
                    self.double_click_threshold_ms,
                ) {
                    self.start_song(song);
                }
            }
            PlaybackMessage::PointerLeftRows => self.click_tracker.reset(),
            PlaybackMessage::Play => {
                if self.current.is_some() {
                    if !self.is_playing {
                        self.engine.play();
                        self.is_playing = true;
                        self.broadcast_playback_state();
                    }
                } else if let Some(first) = self.active_list.first().cloned() {
                    self.start_song(first);
                }
            }
            PlaybackMessage::Pause => {
                if self.is_playing {
                    self.engine.pause();
                    self.is_playing = false;
                    self.broadcast_playback_state();
                }
            }
            PlaybackMessage::Next => {
                if let Some(song) =
                    playback::next(&self.active_list, self.current.as_ref()).cloned()
                {
                    self.start_song(song);
                }
            }
            PlaybackMessage::Previous => {
                if let Some(song) =
                    playback::previous(&self.active_list, self.current.as_ref()).cloned()
                {
                    self.start_song(song);
                }
            }
            PlaybackMessage::Seek(position_ms) => self.engine.seek(position_ms),
            PlaybackMessage::MediaOpened { duration_ms } => {
                debug!("PlaybackManager: Media opened, {} ms", duration_ms);
                self.current_duration_ms = duration_ms;
            }
            PlaybackMessage::MediaEnded => {
                if self.auto_advance {
                    if let Some(song) =
                        playback::next(&self.active_list, self.current.as_ref()).cloned()
                    {
                        self.start_song(song);
                        return;
                    }
                }
                self.is_playing = false;
                self.broadcast_playback_state();
            }
            PlaybackMessage::Progress {
                elapsed_ms,
                total_ms,
            } => {
                trace!("PlaybackManager: Progress {}/{} ms", elapsed_ms, total_ms);
                self.current_elapsed_ms = elapsed_ms;
                self.current_duration_ms = total_ms;
            }
            // Notifications this component emitted.
            PlaybackMessage::CurrentSongChanged(_)
            | PlaybackMessage::PlaybackStateChanged { .. } => {}
        }
    }

    fn start_song(&mut self, song: Song) {
        let Some(path) = song.media_path.clone() else {
            warn!("PlaybackManager: Song '{}' has no media file", song.name);
            return;
        };
        if let Err(e) = self.engine.open(&path) {
            error!("Failed to open {}: {}", path.display(), e);
            return;
        }
        self.engine.play();
        self.current_elapsed_ms = 0;
        self.current = Some(song);
        self.is_playing = true;

        let changed =
            playback::sync_current_flags(&mut self.active_list, self.current.as_ref());
        trace!("PlaybackManager: {} current flags updated", changed);

        let _ = self.bus_producer.send(protocol::Message::Playback(
            PlaybackMessage::CurrentSongChanged(self.current.clone()),
        ));
        self.broadcast_playback_state();
    }

    fn broadcast_playback_state(&self) {
        let _ = self.bus_producer.send(protocol::Message::Playback(
            PlaybackMessage::PlaybackStateChanged {
                is_playing: self.is_playing,
            },
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback_engine::EngineError;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::{Duration, Instant};
    use tokio::sync::broadcast::{self, error::TryRecvError};

    #[derive(Debug, Clone, PartialEq)]
    enum EngineCall {
        Open(PathBuf),
        Play,
        Pause,
        Seek(u64),
    }

    #[derive(Clone, Default)]
    struct RecordingEngine {
        calls: Arc<Mutex<Vec<EngineCall>>>,
    }

    impl PlaybackEngine for RecordingEngine {
        fn open(&mut self, path: &Path) -> Result<(), EngineError> {
            self.calls
                .lock()
                .unwrap()
                .push(EngineCall::Open(path.to_path_buf()));
            Ok(())
        }

        fn play(&mut self) {
            self.calls.lock().unwrap().push(EngineCall::Play);
        }

        fn pause(&mut self) {
            self.calls.lock().unwrap().push(EngineCall::Pause);
        }

        fn seek(&mut self, position_ms: u64) {
            self.calls.lock().unwrap().push(EngineCall::Seek(position_ms));
        }

        fn position_ms(&self) -> u64 {
            0
        }

        fn duration_ms(&self) -> u64 {
            0
        }
    }

    struct PlaybackManagerHarness {
        bus_sender: broadcast::Sender<protocol::Message>,
        receiver: broadcast::Receiver<protocol::Message>,
        engine_calls: Arc<Mutex<Vec<EngineCall>>>,
    }

    impl PlaybackManagerHarness {
        fn new() -> Self {
            let (bus_sender, _) = broadcast::channel(1024);
            let manager_bus_sender = bus_sender.clone();
            let manager_receiver = bus_sender.subscribe();
            let receiver = bus_sender.subscribe();
            let engine = RecordingEngine::default();
            let engine_calls = engine.calls.clone();

            thread::spawn(move || {
                let mut manager = PlaybackManager::new(
                    manager_receiver,
                    manager_bus_sender,
                    Box::new(engine),
                    &Config::default(),
                );
                manager.run();
            });

            Self {
                bus_sender,
                receiver,
                engine_calls,
            }
        }

        fn send(&self, message: protocol::Message) {
            self.bus_sender
                .send(message)
                .expect("failed to send message to bus");
        }

        fn activate(&self, songs: Vec<Song>) {
            self.send(protocol::Message::Playback(PlaybackMessage::ActivateList(
                songs,
            )));
        }

        fn click(&self, song: &Song, at_ms: u64) {
            self.send(protocol::Message::Playback(PlaybackMessage::RowActivated {
                song: song.clone(),
                at_ms,
            }));
        }

        fn wait_for_current_song(&mut self) -> Option<Song> {
            let message = wait_for_message(&mut self.receiver, Duration::from_secs(1), |message| {
                matches!(
                    message,
                    protocol::Message::Playback(PlaybackMessage::CurrentSongChanged(_))
                )
            });
            match message {
                protocol::Message::Playback(PlaybackMessage::CurrentSongChanged(song)) => song,
                _ => unreachable!(),
            }
        }
    }

    fn wait_for_message<F>(
        receiver: &mut broadcast::Receiver<protocol::Message>,
        timeout: Duration,
        mut predicate: F,
    ) -> protocol::Message
    where
        F: FnMut(&protocol::Message) -> bool,
    {
        let start = Instant::now();
        loop {
            if start.elapsed() > timeout {
                panic!("timed out waiting for expected message");
            }
            match receiver.try_recv() {
                Ok(message) => {
                    if predicate(&message) {
                        return message;
                    }
                }
                Err(TryRecvError::Empty) => thread::sleep(Duration::from_millis(5)),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Closed) => panic!("bus closed while waiting for message"),
            }
        }
    }

    fn assert_no_message<F>(
        receiver: &mut broadcast::Receiver<protocol::Message>,
        timeout: Duration,
        mut predicate: F,
    ) where
        F: FnMut(&protocol::Message) -> bool,
    {
        let start = Instant::now();
        loop {
            if start.elapsed() > timeout {
                return;
            }
            match receiver.try_recv() {
                Ok(message) => {
                    if predicate(&message) {
                        panic!("received unexpected message: {:?}", message);
                    }
                }
                Err(TryRecvError::Empty) => thread::sleep(Duration::from_millis(5)),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Closed) => return,
            }
        }
    }

    fn is_current_song_changed(message: &protocol::Message) -> bool {
        matches!(
            message,
            protocol::Message::Playback(PlaybackMessage::CurrentSongChanged(_))
        )
    }

    fn song_with_media(id: &str, name: &str) -> Song {
        Song::new(
            id.to_string(),
            name.to_string(),
            Some(PathBuf::from(format!("/music/{}.flac", id))),
        )
    }

    fn three_songs() -> Vec<Song> {
        vec![
            song_with_media("a", "Song A"),
            song_with_media("b", "Song B"),
            song_with_media("c", "Song C"),
        ]
    }

    #[test]
    fn test_double_activation_within_threshold_starts_playback() {
        let mut harness = PlaybackManagerHarness::new();
        let songs = three_songs();
        harness.activate(songs.clone());

        harness.click(&songs[0], 0);
        assert_no_message(
            &mut harness.receiver,
            Duration::from_millis(100),
            is_current_song_changed,
        );

        harness.click(&songs[0], 200);
        let current = harness.wait_for_current_song().expect("a song should start");
        assert_eq!(current.id, "a");

        let calls = harness.engine_calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![
                EngineCall::Open(PathBuf::from("/music/a.flac")),
                EngineCall::Play
            ]
        );
    }

    #[test]
    fn test_slow_second_activation_rearms_instead_of_starting() {
        let mut harness = PlaybackManagerHarness::new();
        let songs = three_songs();
        harness.activate(songs.clone());

        harness.click(&songs[0], 0);
        harness.click(&songs[0], 400);
        assert_no_message(
            &mut harness.receiver,
            Duration::from_millis(100),
            is_current_song_changed,
        );

        // The 400ms click re-armed tracking, so this one completes the pair.
        harness.click(&songs[0], 600);
        let current = harness.wait_for_current_song().expect("a song should start");
        assert_eq!(current.id, "a");
    }

    #[test]
    fn test_pointer_leaving_rows_resets_the_gesture() {
        let mut harness = PlaybackManagerHarness::new();
        let songs = three_songs();
        harness.activate(songs.clone());

        harness.click(&songs[1], 0);
        harness.send(protocol::Message::Playback(PlaybackMessage::PointerLeftRows));
        harness.click(&songs[1], 100);
        assert_no_message(
            &mut harness.receiver,
            Duration::from_millis(100),
            is_current_song_changed,
        );

        harness.click(&songs[1], 250);
        let current = harness.wait_for_current_song().expect("a song should start");
        assert_eq!(current.id, "b");
    }

    #[test]
    fn test_next_and_previous_wrap_the_active_list() {
        let mut harness = PlaybackManagerHarness::new();
        let songs = three_songs();
        harness.activate(songs.clone());

        harness.click(&songs[2], 0);
        harness.click(&songs[2], 100);
        assert_eq!(harness.wait_for_current_song().unwrap().id, "c");

        harness.send(protocol::Message::Playback(PlaybackMessage::Next));
        assert_eq!(harness.wait_for_current_song().unwrap().id, "a");

        harness.send(protocol::Message::Playback(PlaybackMessage::Previous));
        assert_eq!(harness.wait_for_current_song().unwrap().id, "c");
    }

    #[test]
    fn test_media_ended_advances_to_the_next_song() {
        let mut harness = PlaybackManagerHarness::new();
        let songs = three_songs();
        harness.activate(songs.clone());

        harness.click(&songs[0], 0);
        harness.click(&songs[0], 100);
        assert_eq!(harness.wait_for_current_song().unwrap().id, "a");

        harness.send(protocol::Message::Playback(PlaybackMessage::MediaEnded));
        assert_eq!(harness.wait_for_current_song().unwrap().id, "b");
    }

    #[test]
    fn test_pause_and_resume_reuse_the_opened_media() {
        let mut harness = PlaybackManagerHarness::new();
        let songs = three_songs();
        harness.activate(songs.clone());

        harness.click(&songs[0], 0);
        harness.click(&songs[0], 100);
        harness.wait_for_current_song();

        harness.send(protocol::Message::Playback(PlaybackMessage::Pause));
        wait_for_message(&mut harness.receiver, Duration::from_secs(1), |message| {
            matches!(
                message,
                protocol::Message::Playback(PlaybackMessage::PlaybackStateChanged {
                    is_playing: false
                })
            )
        });

        harness.send(protocol::Message::Playback(PlaybackMessage::Play));
        wait_for_message(&mut harness.receiver, Duration::from_secs(1), |message| {
            matches!(
                message,
                protocol::Message::Playback(PlaybackMessage::PlaybackStateChanged {
                    is_playing: true
                })
            )
        });

        let calls = harness.engine_calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![
                EngineCall::Open(PathBuf::from("/music/a.flac")),
                EngineCall::Play,
                EngineCall::Pause,
                EngineCall::Play
            ]
        );
    }
}
