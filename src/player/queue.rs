// ==========================================
// TRACK QUEUE MODULE
// ==========================================
// This module holds the ordered list of tracks a playback session walks
// through. It handles:
// - The Track record (display name + YouTube reference)
// - A cursor over the tracks (current_index)
// - Moving the cursor forward/backward
// - Detecting when the whole queue has been played
//
// Key Concept: the cursor may sit one past the last track.
// - current_index == len means "exhausted", not "out of bounds"
// - Nothing is ever removed during playback, so previous/next are just
//   index arithmetic over an immutable Vec

use serde::{Deserialize, Serialize};

use crate::error::QueueError;

// ==========================================
// TRACK STRUCT
// ==========================================
// A named reference to a remote audio source.
//
// Fields:
// - name: what the user typed when saving the song, shown in notices
// - reference: a YouTube watch URL, handed to the stream resolver as-is
//
// The library files store the reference under "url", so the serde name
// stays compatible with songs.json written by earlier versions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    #[serde(rename = "url")]
    pub reference: String,
}

impl Track {
    pub fn new(name: impl Into<String>, reference: impl Into<String>) -> Self {
        Track {
            name: name.into(),
            reference: reference.into(),
        }
    }
}

// Two tracks are the same track when they point at the same source,
// whatever they were named.
impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.reference == other.reference
    }
}

impl Eq for Track {}

// ==========================================
// TRACK QUEUE STRUCT
// ==========================================
// Invariant: 0 <= current_index <= tracks.len()
#[derive(Debug, Clone, PartialEq)]
pub struct TrackQueue {
    tracks: Vec<Track>,
    current_index: usize,
}

impl TrackQueue {
    pub fn new(tracks: Vec<Track>) -> Self {
        TrackQueue {
            tracks,
            current_index: 0,
        }
    }

    // ==========================================
    // NAVIGATION: current()
    // ==========================================
    // Returns the track under the cursor.
    //
    // Fails with QueueError::Exhausted once the cursor has moved past the
    // last track (or immediately, for an empty queue).
    pub fn current(&self) -> Result<&Track, QueueError> {
        self.tracks.get(self.current_index).ok_or(QueueError::Exhausted)
    }

    // ==========================================
    // NAVIGATION: advance()
    // ==========================================
    // Moves the cursor one track forward.
    //
    // Stops at len: advancing an exhausted queue leaves it exhausted.
    pub fn advance(&mut self) {
        if self.current_index < self.tracks.len() {
            self.current_index += 1;
        }
    }

    // ==========================================
    // NAVIGATION: retreat()
    // ==========================================
    // Moves the cursor one track back.
    //
    // Returns: bool
    // - true: cursor moved
    // - false: already at the first track, nothing changed
    //
    // The false case is a boundary the caller reports to the user,
    // not an error.
    pub fn retreat(&mut self) -> bool {
        if self.current_index > 0 {
            self.current_index -= 1;
            true
        } else {
            false
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.current_index >= self.tracks.len()
    }

    // Same tracks, cursor back at the start. Used when the user asks to
    // replay a finished queue.
    pub fn rewound(&self) -> Self {
        TrackQueue::new(self.tracks.clone())
    }

    // The track after the current one, for "Up next" in the status line
    pub fn peek_next(&self) -> Option<&Track> {
        self.tracks.get(self.current_index + 1)
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }
}
