// ==========================================
// PLAYBACK SESSION
// ==========================================
// Drives one TrackQueue through the media engine, one track at a time.
//
// Each loop iteration:
// 1. Loading: resolve the current track and open an engine handle for it
//    (a failure skips to the next track instead of ending the session)
// 2. Near-end check: close to the end of the track -> move on
// 3. Wait up to one poll interval for a command line
//
// Commands and the near-end check are the only things that change state.
// Everything the user should see goes out through the Notifier.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::PlayerConfig;
use crate::error::{SessionError, TrackError};
use crate::player::commands::{Command, VOLUME_STEP};
use crate::player::engine::{MediaEngine, MediaHandle};
use crate::player::queue::{Track, TrackQueue};
use crate::youtube::resolver::{ResolvedStream, StreamResolver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Playing,
    Paused,
    Ended,
}

// How a run() ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Quit,
    Exhausted,
}

// One read from the command source
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Line(String),
    // Nothing typed within the wait
    Timeout,
    // Input stream closed (EOF)
    Closed,
}

#[async_trait(?Send)]
pub trait CommandSource {
    async fn next_command(&mut self, wait: Duration) -> Input;
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub name: String,
    pub index: usize,
    pub total: usize,
    pub elapsed: f64,
    pub duration: f64,
    pub volume: u8,
    pub auto_advance: bool,
    pub paused: bool,
    pub up_next: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    Loading { index: usize, total: usize, name: String },
    TrackStarted { index: usize, name: String, duration: f64 },
    TrackFailed { index: usize, name: String, reason: String },
    TrackEnding { name: String },
    Paused,
    Resumed,
    Restarted { name: String },
    VolumeChanged(u8),
    AutoAdvance(bool),
    AtFirstTrack,
    Invalid(String),
    Status(StatusReport),
    Help,
    QueueFinished,
    Stopped,
}

pub trait Notifier {
    fn notify(&mut self, event: &PlaybackEvent);
}

// ==========================================
// SESSION STRUCT
// ==========================================
// The resolver and engine are borrowed: they outlive any one session and
// are shared by a replay. The session owns its queue and at most one
// engine handle.
pub struct PlaybackSession<'a, R: StreamResolver, E: MediaEngine> {
    queue: TrackQueue,
    volume: u8,
    auto_advance: bool,
    phase: Phase,
    handle: Option<E::Handle>,
    // Kept so restart can reopen the track without resolving again
    stream: Option<ResolvedStream>,
    resolver: &'a mut R,
    engine: &'a E,
    config: PlayerConfig,
}

impl<'a, R: StreamResolver, E: MediaEngine> PlaybackSession<'a, R, E> {
    // Checks once that the engine can play anything at all.
    pub fn new(
        queue: TrackQueue,
        resolver: &'a mut R,
        engine: &'a E,
        config: &PlayerConfig,
    ) -> Result<Self, SessionError> {
        engine
            .check_available()
            .map_err(|e| SessionError::EngineUnavailable(e.to_string()))?;

        if queue.is_empty() {
            return Err(SessionError::EmptyQueue);
        }

        Ok(PlaybackSession {
            queue,
            volume: config.default_volume.min(100),
            auto_advance: true,
            phase: Phase::Idle,
            handle: None,
            stream: None,
            resolver,
            engine,
            config: config.clone(),
        })
    }

    // A fresh session over the same tracks, starting again at the first one
    pub fn replay(self) -> Self {
        PlaybackSession {
            queue: self.queue.rewound(),
            volume: self.config.default_volume.min(100),
            auto_advance: true,
            phase: Phase::Loading,
            handle: None,
            stream: None,
            resolver: self.resolver,
            engine: self.engine,
            config: self.config,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn queue(&self) -> &TrackQueue {
        &self.queue
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn auto_advance(&self) -> bool {
        self.auto_advance
    }

    pub fn has_live_handle(&self) -> bool {
        self.handle.is_some()
    }

    // ==========================================
    // MAIN LOOP: run()
    // ==========================================
    pub async fn run<C, N>(&mut self, input: &mut C, notifier: &mut N) -> SessionOutcome
    where
        C: CommandSource,
        N: Notifier,
    {
        if self.phase == Phase::Idle {
            self.phase = Phase::Loading;
        }

        loop {
            while self.phase == Phase::Loading {
                self.load_current(notifier).await;
            }

            match self.phase {
                Phase::Ended => return SessionOutcome::Exhausted,
                Phase::Idle => return SessionOutcome::Quit,
                _ => {}
            }

            if self.poll_near_end(notifier) {
                continue;
            }

            match input.next_command(self.config.poll_interval()).await {
                Input::Timeout => {}
                Input::Closed => {
                    tracing::info!("input closed, stopping playback");
                    self.apply(Command::Quit, notifier).await;
                }
                Input::Line(line) if line.trim().is_empty() => {}
                Input::Line(line) => match Command::parse(&line) {
                    Ok(command) => self.apply(command, notifier).await,
                    Err(e) => notifier.notify(&PlaybackEvent::Invalid(e.to_string())),
                },
            }
        }
    }

    // ==========================================
    // LOADING: load_current()
    // ==========================================
    // Tries exactly one track.
    // - success: phase Playing
    // - failure: one TrackFailed notice, cursor advanced, phase Loading
    //   (or Ended when that was the last track)
    pub async fn load_current<N: Notifier>(&mut self, notifier: &mut N) {
        let index = self.queue.current_index();
        let track = match self.queue.current() {
            Ok(track) => track.clone(),
            Err(_) => {
                self.finish(notifier);
                return;
            }
        };

        self.phase = Phase::Loading;
        notifier.notify(&PlaybackEvent::Loading {
            index,
            total: self.queue.len(),
            name: track.name.clone(),
        });

        match self.start_track(&track).await {
            Ok(duration) => {
                tracing::info!(index, name = %track.name, duration, "track started");
                self.phase = Phase::Playing;
                notifier.notify(&PlaybackEvent::TrackStarted {
                    index,
                    name: track.name,
                    duration,
                });
            }
            Err(e) => {
                tracing::warn!(index, name = %track.name, error = %e, "skipping track");
                self.forget_stream(&track.reference, &e).await;
                notifier.notify(&PlaybackEvent::TrackFailed {
                    index,
                    name: track.name,
                    reason: e.to_string(),
                });
                self.move_forward(notifier);
            }
        }
    }

    async fn start_track(&mut self, track: &Track) -> Result<f64, TrackError> {
        let stream = self.resolver.resolve(&track.reference).await?;
        self.open_stream(stream).await
    }

    // Open, apply volume, play. Caller guarantees no handle is live.
    async fn open_stream(&mut self, stream: ResolvedStream) -> Result<f64, TrackError> {
        let mut handle = self.engine.open(&stream).await?;
        handle.set_volume(self.volume);
        handle.play();

        let duration = handle.duration_seconds();
        self.handle = Some(handle);
        self.stream = Some(stream);
        Ok(duration)
    }

    // A stream URL the engine could not play is likely expired; make the
    // resolver look it up again next time instead of serving it from cache.
    async fn forget_stream(&mut self, reference: &str, error: &TrackError) {
        if let TrackError::Engine(_) = error {
            self.resolver.invalidate(reference).await;
        }
    }

    fn stop_handle(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.stop();
        }
    }

    // Stop whatever plays and step to the next track
    fn move_forward<N: Notifier>(&mut self, notifier: &mut N) {
        self.stop_handle();
        self.stream = None;
        self.queue.advance();
        if self.queue.is_exhausted() {
            self.finish(notifier);
        } else {
            self.phase = Phase::Loading;
        }
    }

    fn finish<N: Notifier>(&mut self, notifier: &mut N) {
        self.stop_handle();
        self.stream = None;
        self.phase = Phase::Ended;
        tracing::info!(tracks = self.queue.len(), "queue finished");
        notifier.notify(&PlaybackEvent::QueueFinished);
    }

    // ==========================================
    // NEAR-END DETECTION: poll_near_end()
    // ==========================================
    // Returns true when the track was considered finished and the session
    // moved on (phase is then Loading or Ended).
    //
    // Fires when elapsed is inside [total - threshold, total), or when the
    // engine says the stream has drained (covers unknown durations).
    pub fn poll_near_end<N: Notifier>(&mut self, notifier: &mut N) -> bool {
        if self.phase != Phase::Playing || !self.auto_advance {
            return false;
        }
        let Some(handle) = self.handle.as_ref() else {
            return false;
        };

        let total = handle.duration_seconds();
        let elapsed = handle.elapsed_seconds();
        let threshold = self.config.near_end_threshold_secs;
        let near_end = total > 0.0 && elapsed >= total - threshold && elapsed < total;

        if !near_end && !handle.is_finished() {
            return false;
        }

        let name = self
            .queue
            .current()
            .map(|t| t.name.clone())
            .unwrap_or_default();
        tracing::debug!(elapsed, total, "track about to finish, advancing");
        notifier.notify(&PlaybackEvent::TrackEnding { name });
        self.move_forward(notifier);
        true
    }

    // ==========================================
    // COMMANDS: apply()
    // ==========================================
    pub async fn apply<N: Notifier>(&mut self, command: Command, notifier: &mut N) {
        tracing::debug!(?command, phase = ?self.phase, "applying command");
        match command {
            Command::Next => self.move_forward(notifier),
            Command::Previous => {
                if self.queue.retreat() {
                    self.stop_handle();
                    self.stream = None;
                    self.phase = Phase::Loading;
                } else {
                    notifier.notify(&PlaybackEvent::AtFirstTrack);
                }
            }
            Command::TogglePause => self.toggle_pause(notifier),
            Command::Restart => self.restart(notifier).await,
            Command::ToggleAutoAdvance => {
                self.auto_advance = !self.auto_advance;
                notifier.notify(&PlaybackEvent::AutoAdvance(self.auto_advance));
            }
            Command::SetVolume(value) => self.set_volume(value, notifier),
            Command::VolumeUp => {
                let value = self.volume.saturating_add(VOLUME_STEP).min(100);
                self.set_volume(i64::from(value), notifier);
            }
            Command::VolumeDown => {
                let value = self.volume.saturating_sub(VOLUME_STEP);
                self.set_volume(i64::from(value), notifier);
            }
            Command::Status => {
                if let Some(report) = self.status() {
                    notifier.notify(&PlaybackEvent::Status(report));
                }
            }
            Command::Help => notifier.notify(&PlaybackEvent::Help),
            Command::Quit => {
                self.stop_handle();
                self.stream = None;
                self.phase = Phase::Idle;
                notifier.notify(&PlaybackEvent::Stopped);
            }
        }
    }

    fn toggle_pause<N: Notifier>(&mut self, notifier: &mut N) {
        let Some(handle) = self.handle.as_mut() else {
            return;
        };
        match self.phase {
            Phase::Playing => {
                handle.pause();
                self.phase = Phase::Paused;
                notifier.notify(&PlaybackEvent::Paused);
            }
            Phase::Paused => {
                handle.resume();
                self.phase = Phase::Playing;
                notifier.notify(&PlaybackEvent::Resumed);
            }
            _ => {}
        }
    }

    async fn restart<N: Notifier>(&mut self, notifier: &mut N) {
        let Some(stream) = self.stream.clone() else {
            return;
        };
        let index = self.queue.current_index();
        let (name, reference) = self
            .queue
            .current()
            .map(|t| (t.name.clone(), t.reference.clone()))
            .unwrap_or_default();

        self.stop_handle();
        match self.open_stream(stream).await {
            Ok(_) => {
                self.phase = Phase::Playing;
                notifier.notify(&PlaybackEvent::Restarted { name });
            }
            Err(e) => {
                tracing::warn!(index, name = %name, error = %e, "restart failed, skipping track");
                self.forget_stream(&reference, &e).await;
                notifier.notify(&PlaybackEvent::TrackFailed {
                    index,
                    name,
                    reason: e.to_string(),
                });
                self.move_forward(notifier);
            }
        }
    }

    // Out of range leaves the volume alone and reports why
    fn set_volume<N: Notifier>(&mut self, value: i64, notifier: &mut N) {
        let Ok(volume) = u8::try_from(value) else {
            notifier.notify(&PlaybackEvent::Invalid(format!(
                "volume must be between 0 and 100, got {value}"
            )));
            return;
        };
        if volume > 100 {
            notifier.notify(&PlaybackEvent::Invalid(format!(
                "volume must be between 0 and 100, got {value}"
            )));
            return;
        }

        self.volume = volume;
        if let Some(handle) = self.handle.as_mut() {
            handle.set_volume(volume);
        }
        notifier.notify(&PlaybackEvent::VolumeChanged(volume));
    }

    fn status(&self) -> Option<StatusReport> {
        let track = self.queue.current().ok()?;
        let (elapsed, duration) = self
            .handle
            .as_ref()
            .map(|h| (h.elapsed_seconds(), h.duration_seconds()))
            .unwrap_or((0.0, 0.0));

        Some(StatusReport {
            name: track.name.clone(),
            index: self.queue.current_index(),
            total: self.queue.len(),
            elapsed,
            duration,
            volume: self.volume,
            auto_advance: self.auto_advance,
            paused: self.phase == Phase::Paused,
            up_next: self.queue.peek_next().map(|t| t.name.clone()),
        })
    }
}
