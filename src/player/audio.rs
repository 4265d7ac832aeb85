// ==========================================
// AUDIO PLAYBACK ENGINE
// ==========================================
// rodio-backed implementation of the media engine capability.
// It handles:
// - Connecting to the default audio output device (once)
// - Downloading a resolved stream and decoding it
// - Play/pause/resume/stop and volume on a per-track Sink
// - Tracking elapsed time, since rodio 0.17 does not expose a position
//
// Key Concept: one RodioEngine per program, one RodioHandle per track.
// The engine owns the OutputStream (the connection to the speakers); each
// handle owns a Sink (the play/pause/volume buttons for one stream).

use async_trait::async_trait;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::io::Cursor;
use std::time::{Duration, Instant};

use crate::config::PlayerConfig;
use crate::error::EngineError;
use crate::player::engine::{MediaEngine, MediaHandle};
use crate::youtube::resolver::ResolvedStream;

// Grace period before an empty sink counts as "finished"
const MIN_PLAYED_SECS: f64 = 2.0;

// ==========================================
// PLAYBACK CLOCK
// ==========================================
// Wall-clock position tracking for a single track.
//
// Fields:
// - started_at: when play() was first called (None = never started)
// - paused_at: set while paused; elapsed time freezes here
// - paused_total: sum of all finished pauses
//
// elapsed = (now or paused_at) - started_at - paused_total
#[derive(Debug, Clone, Default)]
pub struct PlaybackClock {
    started_at: Option<Instant>,
    paused_at: Option<Instant>,
    paused_total: Duration,
}

impl PlaybackClock {
    pub fn start(&mut self, now: Instant) {
        self.started_at = Some(now);
        self.paused_at = None;
        self.paused_total = Duration::ZERO;
    }

    pub fn pause(&mut self, now: Instant) {
        if self.started_at.is_some() && self.paused_at.is_none() {
            self.paused_at = Some(now);
        }
    }

    pub fn resume(&mut self, now: Instant) {
        if let Some(paused_at) = self.paused_at.take() {
            self.paused_total += now.saturating_duration_since(paused_at);
        }
    }

    pub fn reset(&mut self) {
        *self = PlaybackClock::default();
    }

    pub fn is_started(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    pub fn elapsed_at(&self, now: Instant) -> Duration {
        match self.started_at {
            Some(start) => {
                let until = self.paused_at.unwrap_or(now);
                until
                    .saturating_duration_since(start)
                    .saturating_sub(self.paused_total)
            }
            None => Duration::ZERO,
        }
    }
}

// ==========================================
// RODIO ENGINE
// ==========================================
// output is Err when no audio device could be opened (e.g. a headless
// box). The engine still constructs so the failure can be reported once,
// through check_available(), instead of on every track.
pub struct RodioEngine {
    output: Result<(OutputStream, OutputStreamHandle), String>,
    client: reqwest::Client,
    fetch_timeout: Duration,
}

impl RodioEngine {
    pub fn new(config: &PlayerConfig) -> Self {
        let output = OutputStream::try_default().map_err(|e| e.to_string());
        if let Err(e) = &output {
            tracing::error!(error = %e, "no audio output device");
        }

        RodioEngine {
            output,
            client: reqwest::Client::new(),
            fetch_timeout: config.fetch_timeout(),
        }
    }

    fn output_handle(&self) -> Result<&OutputStreamHandle, EngineError> {
        self.output
            .as_ref()
            .map(|(_, handle)| handle)
            .map_err(|e| EngineError::Unavailable(e.clone()))
    }

    // Download the whole stream; rodio's decoders need Read + Seek
    async fn fetch(&self, url: &str) -> Result<Cursor<Vec<u8>>, EngineError> {
        let response = self
            .client
            .get(url)
            .timeout(self.fetch_timeout)
            .send()
            .await?
            .error_for_status()?;
        let bytes = response.bytes().await?;
        tracing::debug!(bytes = bytes.len(), "downloaded audio stream");
        Ok(Cursor::new(bytes.to_vec()))
    }
}

#[async_trait(?Send)]
impl MediaEngine for RodioEngine {
    type Handle = RodioHandle;

    fn check_available(&self) -> Result<(), EngineError> {
        self.output_handle().map(|_| ())
    }

    async fn open(&self, stream: &ResolvedStream) -> Result<RodioHandle, EngineError> {
        let output = self.output_handle()?;
        let data = self.fetch(&stream.url).await?;

        let decoder = Decoder::new(data).map_err(|e| {
            EngineError::Decode(format!("{e}. File may be corrupted or an unsupported format"))
        })?;

        // Prefer what the decoder measured; fall back to yt-dlp's metadata
        let duration = decoder
            .total_duration()
            .map(|d| d.as_secs_f64())
            .filter(|d| *d > 0.0)
            .or(stream.duration)
            .unwrap_or(0.0);

        let sink = Sink::try_new(output).map_err(|e| EngineError::Output(e.to_string()))?;
        // Queue the source paused; play() starts it and the clock together
        sink.pause();
        sink.append(decoder);

        Ok(RodioHandle {
            sink,
            duration,
            clock: PlaybackClock::default(),
        })
    }
}

// ==========================================
// RODIO HANDLE
// ==========================================
pub struct RodioHandle {
    sink: Sink,
    duration: f64,
    clock: PlaybackClock,
}

impl MediaHandle for RodioHandle {
    fn play(&mut self) {
        self.sink.play();
        self.clock.start(Instant::now());
    }

    fn pause(&mut self) {
        self.sink.pause();
        self.clock.pause(Instant::now());
    }

    fn resume(&mut self) {
        self.sink.play();
        self.clock.resume(Instant::now());
    }

    fn stop(&mut self) {
        self.sink.stop();
        self.clock.reset();
    }

    fn set_volume(&mut self, volume: u8) {
        // rodio uses 0.0-1.0
        self.sink.set_volume(f32::from(volume.min(100)) / 100.0);
    }

    fn elapsed_seconds(&self) -> f64 {
        self.clock.elapsed_at(Instant::now()).as_secs_f64()
    }

    fn duration_seconds(&self) -> f64 {
        self.duration
    }

    // The sink drains after the last sample. Only trust that once the track
    // has really been playing for a moment and is not paused.
    fn is_finished(&self) -> bool {
        self.sink.empty()
            && self.clock.is_started()
            && !self.clock.is_paused()
            && self.elapsed_seconds() >= MIN_PLAYED_SECS
    }
}

impl Drop for RodioHandle {
    fn drop(&mut self) {
        self.sink.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_is_zero_before_start() {
        let clock = PlaybackClock::default();
        assert_eq!(clock.elapsed_at(Instant::now()), Duration::ZERO);
        assert!(!clock.is_started());
    }

    #[test]
    fn clock_excludes_paused_time() {
        let t0 = Instant::now();
        let mut clock = PlaybackClock::default();
        clock.start(t0);
        clock.pause(t0 + Duration::from_secs(10));

        // frozen while paused
        assert_eq!(clock.elapsed_at(t0 + Duration::from_secs(25)), Duration::from_secs(10));

        clock.resume(t0 + Duration::from_secs(30));
        assert_eq!(clock.elapsed_at(t0 + Duration::from_secs(35)), Duration::from_secs(15));
    }

    #[test]
    fn double_pause_keeps_the_first_pause_point() {
        let t0 = Instant::now();
        let mut clock = PlaybackClock::default();
        clock.start(t0);
        clock.pause(t0 + Duration::from_secs(5));
        clock.pause(t0 + Duration::from_secs(8));
        clock.resume(t0 + Duration::from_secs(10));
        assert_eq!(clock.elapsed_at(t0 + Duration::from_secs(12)), Duration::from_secs(7));
    }

    #[test]
    fn restart_resets_accumulated_pauses() {
        let t0 = Instant::now();
        let mut clock = PlaybackClock::default();
        clock.start(t0);
        clock.pause(t0 + Duration::from_secs(1));
        clock.resume(t0 + Duration::from_secs(4));

        let t1 = t0 + Duration::from_secs(20);
        clock.start(t1);
        assert_eq!(clock.elapsed_at(t1 + Duration::from_secs(2)), Duration::from_secs(2));

        clock.reset();
        assert!(!clock.is_started());
    }
}
