// Error types shared across the player, resolver, library and config layers
// Each layer gets its own enum so callers can tell recoverable per-track
// failures apart from the ones that stop a session before it starts.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum QueueError {
    #[error("queue exhausted: no track at the current position")]
    Exhausted,
}

// Stream resolution failures. All of them are recoverable: the session
// reports the track and moves on to the next one.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("yt-dlp is not installed or not on PATH")]
    NotInstalled,

    #[error("resolving {reference} timed out after {timeout:?}")]
    Timeout { reference: String, timeout: Duration },

    #[error("yt-dlp failed: {0}")]
    Failed(String),

    #[error("unexpected yt-dlp output: {0}")]
    Malformed(String),

    #[error("failed to run yt-dlp: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum EngineError {
    // No usable audio output. Reported once, the session refuses to start.
    #[error("audio output unavailable: {0}")]
    Unavailable(String),

    #[error("failed to download audio stream: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("audio decode failed: {0}")]
    Decode(String),

    #[error("audio output error: {0}")]
    Output(String),
}

// Why one track could not be started
#[derive(Debug, Error)]
pub enum TrackError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CommandError {
    #[error("unrecognized command '{0}' (type 'h' for help)")]
    Unknown(String),

    #[error("invalid volume '{0}': enter a whole number between 0 and 100")]
    InvalidVolume(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot start playback: {0}")]
    EngineUnavailable(String),

    #[error("queue is empty, nothing to play")]
    EmptyQueue,
}

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("library I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("library file {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("'{0}' is not a valid YouTube URL")]
    InvalidUrl(String),

    #[error("name cannot be empty")]
    EmptyName,

    #[error("no entry at position {0}")]
    NotFound(usize),

    #[error("a playlist named '{0}' already exists")]
    DuplicatePlaylist(String),

    #[error("a playlist needs at least one song")]
    EmptyPlaylist,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine the user config directory")]
    NoConfigDir,

    #[error("config I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file {path} is invalid: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
