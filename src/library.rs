// ==========================================
// LIBRARY STORE
// ==========================================
// Saved songs and playlists, kept as two JSON files in the data directory:
// - songs.json:     [{"name": ..., "url": ...}, ...]
// - playlists.json: [{"name": ..., "songs": [...], "created_at": ...}, ...]
//
// Everything is loaded once on open() and written back after each change.
// Indices are 0-based here; the menus add 1 for display.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::LibraryError;
use crate::player::queue::Track;
use crate::youtube::extractor::is_youtube_url;

const SONGS_FILE: &str = "songs.json";
const PLAYLISTS_FILE: &str = "playlists.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub name: String,
    pub songs: Vec<Track>,
    // Older files have no timestamp
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

pub struct LibraryStore {
    songs_path: PathBuf,
    playlists_path: PathBuf,
    songs: Vec<Track>,
    playlists: Vec<Playlist>,
}

impl LibraryStore {
    pub fn open(dir: &Path) -> Result<Self, LibraryError> {
        fs::create_dir_all(dir).map_err(|source| LibraryError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let songs_path = dir.join(SONGS_FILE);
        let playlists_path = dir.join(PLAYLISTS_FILE);
        let songs = read_json(&songs_path)?;
        let playlists = read_json(&playlists_path)?;

        tracing::debug!(
            songs = songs.len(),
            playlists = playlists.len(),
            "library loaded from {}",
            dir.display()
        );

        Ok(LibraryStore {
            songs_path,
            playlists_path,
            songs,
            playlists,
        })
    }

    // ==========================================
    // SONGS
    // ==========================================

    pub fn songs(&self) -> &[Track] {
        &self.songs
    }

    pub fn add_song(&mut self, name: &str, url: &str) -> Result<&Track, LibraryError> {
        let name = name.trim();
        let url = url.trim();
        if name.is_empty() {
            return Err(LibraryError::EmptyName);
        }
        if !is_youtube_url(url) {
            return Err(LibraryError::InvalidUrl(url.to_string()));
        }

        self.songs.push(Track::new(name, url));
        self.save_songs()?;
        tracing::info!(name, "song saved");
        Ok(&self.songs[self.songs.len() - 1])
    }

    pub fn remove_song(&mut self, index: usize) -> Result<Track, LibraryError> {
        if index >= self.songs.len() {
            return Err(LibraryError::NotFound(index));
        }
        let removed = self.songs.remove(index);
        self.save_songs()?;
        tracing::info!(name = %removed.name, "song removed");
        Ok(removed)
    }

    // None or blank keeps the old value. The URL is checked even when only
    // the name changes, which is harmless for songs saved through add_song.
    pub fn edit_song(
        &mut self,
        index: usize,
        name: Option<&str>,
        url: Option<&str>,
    ) -> Result<&Track, LibraryError> {
        let current = self.songs.get(index).ok_or(LibraryError::NotFound(index))?;

        let name = match name.map(str::trim) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => current.name.clone(),
        };
        let url = match url.map(str::trim) {
            Some(u) if !u.is_empty() => u.to_string(),
            _ => current.reference.clone(),
        };
        if !is_youtube_url(&url) {
            return Err(LibraryError::InvalidUrl(url));
        }

        self.songs[index] = Track::new(name, url);
        self.save_songs()?;
        Ok(&self.songs[index])
    }

    // Case-insensitive substring match on the name, with original positions
    pub fn search_songs(&self, term: &str) -> Vec<(usize, &Track)> {
        let term = term.trim().to_lowercase();
        self.songs
            .iter()
            .enumerate()
            .filter(|(_, song)| song.name.to_lowercase().contains(&term))
            .collect()
    }

    // ==========================================
    // PLAYLISTS
    // ==========================================

    pub fn playlists(&self) -> &[Playlist] {
        &self.playlists
    }

    pub fn create_playlist(&mut self, name: &str, songs: Vec<Track>) -> Result<&Playlist, LibraryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LibraryError::EmptyName);
        }
        if songs.is_empty() {
            return Err(LibraryError::EmptyPlaylist);
        }
        let folded = name.to_lowercase();
        if self.playlists.iter().any(|p| p.name.to_lowercase() == folded) {
            return Err(LibraryError::DuplicatePlaylist(name.to_string()));
        }

        self.playlists.push(Playlist {
            name: name.to_string(),
            songs,
            created_at: Utc::now(),
        });
        self.save_playlists()?;
        tracing::info!(name, "playlist created");
        Ok(&self.playlists[self.playlists.len() - 1])
    }

    pub fn delete_playlist(&mut self, index: usize) -> Result<Playlist, LibraryError> {
        if index >= self.playlists.len() {
            return Err(LibraryError::NotFound(index));
        }
        let removed = self.playlists.remove(index);
        self.save_playlists()?;
        tracing::info!(name = %removed.name, "playlist deleted");
        Ok(removed)
    }

    fn save_songs(&self) -> Result<(), LibraryError> {
        write_json(&self.songs_path, &self.songs)
    }

    fn save_playlists(&self) -> Result<(), LibraryError> {
        write_json(&self.playlists_path, &self.playlists)
    }
}

// Missing file = empty list
fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>, LibraryError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(LibraryError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    serde_json::from_str(&raw).map_err(|source| LibraryError::Json {
        path: path.to_path_buf(),
        source,
    })
}

// 4-space indentation, written to a temp file and renamed into place so a
// crash mid-write never leaves a truncated library.
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), LibraryError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut serializer)
        .map_err(|source| LibraryError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    buf.push(b'\n');

    let tmp = path.with_extension("json.tmp");
    let io_err = |source: std::io::Error| LibraryError::Io {
        path: path.to_path_buf(),
        source,
    };
    fs::write(&tmp, &buf).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL_A: &str = "https://www.youtube.com/watch?v=aaaaaaaaaaa";
    const URL_B: &str = "https://youtu.be/bbbbbbbbbbb";

    #[test]
    fn empty_directory_opens_an_empty_library() {
        let dir = tempfile::tempdir().unwrap();
        let library = LibraryStore::open(dir.path()).unwrap();
        assert!(library.songs().is_empty());
        assert!(library.playlists().is_empty());
    }

    #[test]
    fn saved_songs_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let mut library = LibraryStore::open(dir.path()).unwrap();
        library.add_song("  Intro ", URL_A).unwrap();
        library.add_song("Outro", URL_B).unwrap();

        let reopened = LibraryStore::open(dir.path()).unwrap();
        assert_eq!(reopened.songs().len(), 2);
        assert_eq!(reopened.songs()[0].name, "Intro");
        assert_eq!(reopened.songs()[1].reference, URL_B);
    }

    #[test]
    fn reads_legacy_songs_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(SONGS_FILE),
            format!("[\n    {{\n        \"name\": \"Old\",\n        \"url\": \"{URL_A}\"\n    }}\n]"),
        )
        .unwrap();

        let library = LibraryStore::open(dir.path()).unwrap();
        assert_eq!(library.songs(), &[Track::new("Old", URL_A)]);
    }

    #[test]
    fn writes_four_space_json_with_url_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut library = LibraryStore::open(dir.path()).unwrap();
        library.add_song("Intro", URL_A).unwrap();

        let raw = fs::read_to_string(dir.path().join(SONGS_FILE)).unwrap();
        assert!(raw.contains("\n        \"name\": \"Intro\""));
        assert!(raw.contains("\"url\""));
        assert!(!dir.path().join("songs.json.tmp").exists());
    }

    #[test]
    fn add_song_validates_input() {
        let dir = tempfile::tempdir().unwrap();
        let mut library = LibraryStore::open(dir.path()).unwrap();

        assert!(matches!(library.add_song(" ", URL_A), Err(LibraryError::EmptyName)));
        assert!(matches!(
            library.add_song("x", "https://example.com/song.mp3"),
            Err(LibraryError::InvalidUrl(_))
        ));
        assert!(library.songs().is_empty());
    }

    #[test]
    fn remove_song_checks_the_index() {
        let dir = tempfile::tempdir().unwrap();
        let mut library = LibraryStore::open(dir.path()).unwrap();
        library.add_song("Intro", URL_A).unwrap();

        assert!(matches!(library.remove_song(1), Err(LibraryError::NotFound(1))));
        let removed = library.remove_song(0).unwrap();
        assert_eq!(removed.name, "Intro");
        assert!(LibraryStore::open(dir.path()).unwrap().songs().is_empty());
    }

    #[test]
    fn blank_edit_fields_keep_old_values() {
        let dir = tempfile::tempdir().unwrap();
        let mut library = LibraryStore::open(dir.path()).unwrap();
        library.add_song("Intro", URL_A).unwrap();

        let edited = library.edit_song(0, Some("Opening"), Some("  ")).unwrap();
        assert_eq!(edited.name, "Opening");
        assert_eq!(edited.reference, URL_A);

        let edited = library.edit_song(0, None, Some(URL_B)).unwrap();
        assert_eq!(edited.name, "Opening");
        assert_eq!(edited.reference, URL_B);
    }

    #[test]
    fn edit_rejects_bad_url_and_keeps_the_song() {
        let dir = tempfile::tempdir().unwrap();
        let mut library = LibraryStore::open(dir.path()).unwrap();
        library.add_song("Intro", URL_A).unwrap();

        assert!(matches!(
            library.edit_song(0, Some("New"), Some("not a url")),
            Err(LibraryError::InvalidUrl(_))
        ));
        assert_eq!(library.songs()[0].name, "Intro");
        assert!(matches!(library.edit_song(3, None, None), Err(LibraryError::NotFound(3))));
    }

    #[test]
    fn search_is_case_insensitive_and_keeps_positions() {
        let dir = tempfile::tempdir().unwrap();
        let mut library = LibraryStore::open(dir.path()).unwrap();
        library.add_song("Morning Jazz", URL_A).unwrap();
        library.add_song("Night Drive", URL_B).unwrap();
        library.add_song("jazz at night", URL_A).unwrap();

        let hits: Vec<usize> = library.search_songs("JAZZ").iter().map(|(i, _)| *i).collect();
        assert_eq!(hits, vec![0, 2]);
        assert!(library.search_songs("polka").is_empty());
    }

    #[test]
    fn playlists_are_created_and_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let mut library = LibraryStore::open(dir.path()).unwrap();
        let tracks = vec![Track::new("Intro", URL_A), Track::new("Outro", URL_B)];

        library.create_playlist("Road trip", tracks.clone()).unwrap();
        let reopened = LibraryStore::open(dir.path()).unwrap();
        assert_eq!(reopened.playlists().len(), 1);
        assert_eq!(reopened.playlists()[0].songs, tracks);

        let deleted = library.delete_playlist(0).unwrap();
        assert_eq!(deleted.name, "Road trip");
        assert!(matches!(library.delete_playlist(0), Err(LibraryError::NotFound(0))));
    }

    #[test]
    fn playlist_rules_are_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let mut library = LibraryStore::open(dir.path()).unwrap();
        let tracks = vec![Track::new("Intro", URL_A)];

        assert!(matches!(
            library.create_playlist("", tracks.clone()),
            Err(LibraryError::EmptyName)
        ));
        assert!(matches!(
            library.create_playlist("Empty", Vec::new()),
            Err(LibraryError::EmptyPlaylist)
        ));
        library.create_playlist("Mix", tracks.clone()).unwrap();
        assert!(matches!(
            library.create_playlist("mix", tracks),
            Err(LibraryError::DuplicatePlaylist(_))
        ));
    }

    #[test]
    fn duplicate_playlist_names_ignore_non_ascii_case() {
        let dir = tempfile::tempdir().unwrap();
        let mut library = LibraryStore::open(dir.path()).unwrap();
        let tracks = vec![Track::new("Intro", URL_A)];

        library.create_playlist("Über", tracks.clone()).unwrap();
        assert!(matches!(
            library.create_playlist("über", tracks.clone()),
            Err(LibraryError::DuplicatePlaylist(_))
        ));
        assert!(matches!(
            library.create_playlist("ÜBER", tracks),
            Err(LibraryError::DuplicatePlaylist(_))
        ));
        assert_eq!(library.playlists().len(), 1);
    }

    #[test]
    fn playlist_without_timestamp_still_loads() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(PLAYLISTS_FILE),
            format!(r#"[{{"name": "Old", "songs": [{{"name": "a", "url": "{URL_A}"}}]}}]"#),
        )
        .unwrap();

        let library = LibraryStore::open(dir.path()).unwrap();
        assert_eq!(library.playlists()[0].name, "Old");
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(SONGS_FILE), "[{").unwrap();
        assert!(matches!(
            LibraryStore::open(dir.path()),
            Err(LibraryError::Json { .. })
        ));
    }
}
