// Media engine capability
// The session only talks to audio playback through these two traits, so the
// rodio backend can be swapped for a scripted one in tests.

use async_trait::async_trait;

use crate::error::EngineError;
use crate::youtube::resolver::ResolvedStream;

// A single live stream. Exactly one exists per session at any time; the
// session stops it before opening the next one.
pub trait MediaHandle {
    fn play(&mut self);
    fn pause(&mut self);
    fn resume(&mut self);
    fn stop(&mut self);
    // 0-100
    fn set_volume(&mut self, volume: u8);
    fn elapsed_seconds(&self) -> f64;
    // 0.0 when unknown
    fn duration_seconds(&self) -> f64;

    // True once the stream has been fully played out. Backends that cannot
    // tell keep the default.
    fn is_finished(&self) -> bool {
        false
    }
}

#[async_trait(?Send)]
pub trait MediaEngine {
    type Handle: MediaHandle;

    // Called once when a session is built. An error here means no track
    // could ever play, so the session refuses to start.
    fn check_available(&self) -> Result<(), EngineError>;

    // Prepare a handle for a resolved stream. The handle is not playing yet.
    async fn open(&self, stream: &ResolvedStream) -> Result<Self::Handle, EngineError>;
}
