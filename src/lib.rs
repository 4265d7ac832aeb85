// YouTube Tool: a terminal player for saved YouTube songs and playlists
// The binary in main.rs wires these modules together; tests live next to
// the code they cover.

pub mod config;
pub mod error;
pub mod library;
pub mod player;
pub mod ui;
pub mod youtube;
