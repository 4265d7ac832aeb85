// Main application: menus on top of the library and the playback session
// Handles the main menu, the library submenus and the replay prompt.
//
// Everything here is line based: print a menu, read a choice, act on it.
// Failures inside a menu are shown to the user and the menu continues;
// only setup errors bubble out of App::new.

use anyhow::Context;
use std::path::Path;

use crate::config::{AppConfig, PlayerConfig};
use crate::library::LibraryStore;
use crate::player::audio::RodioEngine;
use crate::player::queue::{Track, TrackQueue};
use crate::player::session::{PlaybackSession, SessionOutcome};
use crate::ui::console::{Console, Printer};
use crate::youtube::connectivity::{self, Connectivity};
use crate::youtube::extractor::{is_youtube_url, YtDlpResolver};
use crate::youtube::resolver::CachedResolver;

const COOKIES_FILE: &str = "cookies.txt";

pub struct App {
    console: Console,
    printer: Printer,
    library: LibraryStore,
    resolver: CachedResolver<YtDlpResolver>,
    engine: RodioEngine,
    config: PlayerConfig,
    connectivity: Connectivity,
}

impl App {
    pub fn new(config: &AppConfig, data_dir: &Path) -> anyhow::Result<Self> {
        let library = LibraryStore::open(data_dir)
            .with_context(|| format!("failed to open the library in {}", data_dir.display()))?;

        // Optional cookies.txt export for age-restricted videos
        let extractor =
            YtDlpResolver::new(&config.player).with_cookies(Some(data_dir.join(COOKIES_FILE)));

        Ok(App {
            console: Console::new(),
            printer: Printer,
            library,
            resolver: CachedResolver::new(
                extractor,
                config.player.resolver_cache_size,
                config.player.resolver_cache_ttl(),
            ),
            engine: RodioEngine::new(&config.player),
            config: config.player.clone(),
            connectivity: Connectivity::Offline,
        })
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        self.printer.heading("YouTube Tool");
        self.check_tools().await;

        loop {
            self.printer.heading("Select an option:");
            self.printer.option("1. Play saved songs");
            self.printer.option("2. Play a playlist");
            self.printer.option("3. Play a song from YouTube");
            self.printer.option("4. Manage library");
            self.printer.option("5. Exit");

            let Some(choice) = self.console.ask("Enter your choice: ").await else {
                break;
            };
            match choice.as_str() {
                "1" => self.saved_songs_menu().await,
                "2" => self.playlist_menu().await,
                "3" => self.play_url().await,
                "4" => self.library_menu().await,
                "5" | "q" | "exit" => break,
                _ => self.printer.error("Invalid choice. Please choose again."),
            }
        }

        tracing::info!("exiting");
        self.printer.info("Thank you for using the YouTube Tool.");
        Ok(())
    }

    // A missing yt-dlp or network is reported once here; tracks would fail anyway
    async fn check_tools(&mut self) {
        self.connectivity = self.check_connectivity().await;
        if self.connectivity.is_online() {
            self.printer.info("Status: ● Online");
        } else {
            self.printer.error("Status: ● Offline");
        }

        match self.resolver.inner().check_available().await {
            Ok(version) => tracing::info!(version = %version, "yt-dlp available"),
            Err(e) => {
                tracing::warn!(error = %e, "yt-dlp check failed");
                self.printer
                    .error(&format!("{e}. Install yt-dlp to play songs (pip install yt-dlp)."));
            }
        }
    }

    async fn check_connectivity(&self) -> Connectivity {
        let status = connectivity::check(
            &self.config.connectivity_host,
            self.config.connectivity_timeout(),
        )
        .await;
        tracing::info!(?status, host = %self.config.connectivity_host, "connectivity");
        status
    }

    // ==========================================
    // PLAYBACK
    // ==========================================
    async fn play(&mut self, tracks: Vec<Track>) {
        // The network may have come back since startup
        if !self.connectivity.is_online() {
            self.connectivity = self.check_connectivity().await;
            if !self.connectivity.is_online() {
                self.printer
                    .warn("You appear to be offline. Songs will likely fail to load.");
            }
        }

        let queue = TrackQueue::new(tracks);
        let mut session =
            match PlaybackSession::new(queue, &mut self.resolver, &self.engine, &self.config) {
                Ok(session) => session,
                Err(e) => {
                    tracing::error!(error = %e, "session refused to start");
                    self.printer.error(&e.to_string());
                    return;
                }
            };

        loop {
            match session.run(&mut self.console, &mut self.printer).await {
                SessionOutcome::Quit => return,
                SessionOutcome::Exhausted => {
                    let answer = self.console.ask("Play again? (y/n): ").await;
                    match answer.map(|a| a.to_lowercase()).as_deref() {
                        Some("y") | Some("yes") => session = session.replay(),
                        _ => return,
                    }
                }
            }
        }
    }

    async fn saved_songs_menu(&mut self) {
        loop {
            if self.library.songs().is_empty() {
                self.printer.warn("No songs saved yet.");
                return;
            }

            self.printer.heading("Choose a song to play:");
            self.list_songs();
            let Some(choice) = self
                .console
                .ask("Enter the number of the song, 'all' to play everything, or 'exit' to go back: ")
                .await
            else {
                return;
            };

            let tracks = match choice.to_lowercase().as_str() {
                "exit" | "" => return,
                "all" | "a" => self.library.songs().to_vec(),
                other => match parse_choice(other, self.library.songs().len()) {
                    Some(index) => vec![self.library.songs()[index].clone()],
                    None => {
                        self.printer.error("Invalid song number");
                        continue;
                    }
                },
            };
            self.play(tracks).await;
        }
    }

    async fn playlist_menu(&mut self) {
        loop {
            if self.library.playlists().is_empty() {
                self.printer
                    .warn("No playlists yet. Create one from the library menu.");
                return;
            }

            self.printer.heading("Choose a playlist:");
            self.list_playlists();
            let Some(choice) = self
                .console
                .ask("Enter the number of the playlist (or 'exit' to go back): ")
                .await
            else {
                return;
            };
            if choice.eq_ignore_ascii_case("exit") || choice.is_empty() {
                return;
            }

            match parse_choice(&choice, self.library.playlists().len()) {
                Some(index) => {
                    let songs = self.library.playlists()[index].songs.clone();
                    self.play(songs).await;
                }
                None => self.printer.error("Invalid playlist number"),
            }
        }
    }

    async fn play_url(&mut self) {
        let Some(url) = self.console.ask("Enter YouTube URL: ").await else {
            return;
        };
        if !is_youtube_url(&url) {
            self.printer.error("Enter a valid YouTube URL..");
            return;
        }
        self.play(vec![Track::new(url.clone(), url)]).await;
    }

    // ==========================================
    // LIBRARY MANAGEMENT
    // ==========================================
    async fn library_menu(&mut self) {
        loop {
            self.printer.heading("Music library:");
            self.printer.option("1. View saved songs");
            self.printer.option("2. Add a song");
            self.printer.option("3. Edit a song");
            self.printer.option("4. Remove a song");
            self.printer.option("5. Search songs");
            self.printer.option("6. Create a playlist");
            self.printer.option("7. Delete a playlist");
            self.printer.option("8. Back");

            let Some(choice) = self.console.ask("Enter your choice: ").await else {
                return;
            };
            match choice.as_str() {
                "1" => self.view_songs(),
                "2" => self.add_song().await,
                "3" => self.edit_song().await,
                "4" => self.remove_song().await,
                "5" => self.search_songs().await,
                "6" => self.create_playlist().await,
                "7" => self.delete_playlist().await,
                "8" | "exit" | "" => return,
                _ => self.printer.error("Invalid choice"),
            }
        }
    }

    fn list_songs(&self) {
        for (i, song) in self.library.songs().iter().enumerate() {
            self.printer.item(i + 1, &song.name);
        }
    }

    fn list_playlists(&self) {
        for (i, playlist) in self.library.playlists().iter().enumerate() {
            self.printer.item(
                i + 1,
                &format!(
                    "{} ({} songs, created {})",
                    playlist.name,
                    playlist.songs.len(),
                    playlist.created_at.format("%Y-%m-%d")
                ),
            );
        }
    }

    fn view_songs(&self) {
        if self.library.songs().is_empty() {
            self.printer.warn("No songs saved yet.");
            return;
        }
        self.printer.heading("Saved Songs:");
        self.list_songs();
    }

    async fn add_song(&mut self) {
        let Some(name) = self.console.ask("Enter name of song: ").await else {
            return;
        };
        let Some(url) = self.console.ask("Enter url of song: ").await else {
            return;
        };
        match self.library.add_song(&name, &url) {
            Ok(_) => self.printer.info("Song saved successfully!"),
            Err(e) => self.printer.error(&e.to_string()),
        }
    }

    // Asks for a song number from the saved list; None on bad input or EOF
    async fn pick_song(&mut self, action: &str) -> Option<usize> {
        if self.library.songs().is_empty() {
            self.printer.warn(&format!("No songs saved yet to {action}."));
            return None;
        }
        self.printer.heading("Saved Songs:");
        self.list_songs();

        let choice = self
            .console
            .ask(&format!("Enter the number of the song to {action}: "))
            .await?;
        let index = parse_choice(&choice, self.library.songs().len());
        if index.is_none() {
            self.printer.error("Invalid song number");
        }
        index
    }

    async fn edit_song(&mut self) {
        let Some(index) = self.pick_song("edit").await else {
            return;
        };
        let current = self.library.songs()[index].clone();
        self.printer
            .warn(&format!("Editing: {} ({})", current.name, current.reference));

        let Some(name) = self
            .console
            .ask(&format!("Enter new name (current: {}): ", current.name))
            .await
        else {
            return;
        };
        let Some(url) = self
            .console
            .ask(&format!("Enter new URL (current: {}): ", current.reference))
            .await
        else {
            return;
        };

        match self.library.edit_song(index, Some(name.as_str()), Some(url.as_str())) {
            Ok(_) => self.printer.info("Song updated successfully!"),
            Err(e) => self.printer.error(&format!("{e}. Song not updated.")),
        }
    }

    async fn remove_song(&mut self) {
        let Some(index) = self.pick_song("remove").await else {
            return;
        };
        match self.library.remove_song(index) {
            Ok(song) => self.printer.info(&format!("Removed {}", song.name)),
            Err(e) => self.printer.error(&e.to_string()),
        }
    }

    async fn search_songs(&mut self) {
        let Some(term) = self.console.ask("Search for: ").await else {
            return;
        };
        let hits = self.library.search_songs(&term);
        if hits.is_empty() {
            self.printer.warn("No matching songs.");
            return;
        }
        for (index, song) in hits {
            self.printer.item(index + 1, &song.name);
        }
    }

    async fn create_playlist(&mut self) {
        if self.library.songs().is_empty() {
            self.printer.warn("Save some songs before creating a playlist.");
            return;
        }
        let Some(name) = self.console.ask("Playlist name: ").await else {
            return;
        };

        self.printer.heading("Saved Songs:");
        self.list_songs();
        let Some(selection) = self
            .console
            .ask("Enter song numbers in play order (e.g. 3 1 2): ")
            .await
        else {
            return;
        };

        let songs: Vec<Track> = match parse_selection(&selection, self.library.songs().len()) {
            Ok(indices) => indices
                .into_iter()
                .map(|i| self.library.songs()[i].clone())
                .collect(),
            Err(bad) => {
                self.printer.error(&format!("Invalid song number '{bad}'"));
                return;
            }
        };

        match self.library.create_playlist(&name, songs) {
            Ok(playlist) => {
                let message = format!(
                    "Playlist '{}' created with {} songs",
                    playlist.name,
                    playlist.songs.len()
                );
                self.printer.info(&message);
            }
            Err(e) => self.printer.error(&e.to_string()),
        }
    }

    async fn delete_playlist(&mut self) {
        if self.library.playlists().is_empty() {
            self.printer.warn("No playlists to delete.");
            return;
        }
        self.printer.heading("Playlists:");
        self.list_playlists();

        let Some(choice) = self
            .console
            .ask("Enter the number of the playlist to delete: ")
            .await
        else {
            return;
        };
        let Some(index) = parse_choice(&choice, self.library.playlists().len()) else {
            self.printer.error("Invalid playlist number");
            return;
        };
        match self.library.delete_playlist(index) {
            Ok(playlist) => self.printer.info(&format!("Deleted playlist '{}'", playlist.name)),
            Err(e) => self.printer.error(&e.to_string()),
        }
    }
}

// "3" with 5 items -> Some(2). Menus count from 1.
fn parse_choice(input: &str, len: usize) -> Option<usize> {
    match input.trim().parse::<usize>() {
        Ok(n) if (1..=len).contains(&n) => Some(n - 1),
        _ => None,
    }
}

// "3 1, 2" -> [2, 0, 1]. Returns the first bad token on error.
fn parse_selection(input: &str, len: usize) -> Result<Vec<usize>, String> {
    input
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .map(|t| parse_choice(t, len).ok_or_else(|| t.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choices_are_one_based() {
        assert_eq!(parse_choice("1", 3), Some(0));
        assert_eq!(parse_choice(" 3 ", 3), Some(2));
        assert_eq!(parse_choice("0", 3), None);
        assert_eq!(parse_choice("4", 3), None);
        assert_eq!(parse_choice("two", 3), None);
        assert_eq!(parse_choice("1", 0), None);
    }

    #[test]
    fn selections_keep_order_and_allow_repeats() {
        assert_eq!(parse_selection("3 1, 2", 3), Ok(vec![2, 0, 1]));
        assert_eq!(parse_selection("1,1", 2), Ok(vec![0, 0]));
        assert_eq!(parse_selection("", 2), Ok(vec![]));
    }

    #[test]
    fn selection_reports_the_bad_token() {
        assert_eq!(parse_selection("1 9 2", 3), Err("9".to_string()));
        assert_eq!(parse_selection("1 x", 3), Err("x".to_string()));
    }
}
