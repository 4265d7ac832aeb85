// Playback: the track queue, the session state machine that walks it,
// the command interpreter, and the media engine it plays through.

pub mod audio;
pub mod commands;
pub mod engine;
pub mod queue;
pub mod session;
