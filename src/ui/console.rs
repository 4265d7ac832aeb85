// ==========================================
// CONSOLE
// ==========================================
// Line-based terminal I/O for the menus and the playback session.
// - Reading: async stdin lines, optionally bounded by a timeout so the
//   session can keep polling the engine while nobody types
// - Writing: colored messages via crossterm's Stylize
//
// stdout carries only what the user should see; diagnostics go to the log.

use async_trait::async_trait;
use crossterm::style::Stylize;
use std::io::Write;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::player::commands::HELP;
use crate::player::session::{CommandSource, Input, Notifier, PlaybackEvent, StatusReport};

pub struct Console {
    lines: Lines<BufReader<Stdin>>,
    closed: bool,
}

impl Console {
    pub fn new() -> Self {
        Console {
            lines: BufReader::new(tokio::io::stdin()).lines(),
            closed: false,
        }
    }

    // None once stdin is closed
    pub async fn read_line(&mut self) -> Option<String> {
        if self.closed {
            return None;
        }
        match self.lines.next_line().await {
            Ok(Some(line)) => Some(line),
            Ok(None) => {
                self.closed = true;
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to read stdin");
                self.closed = true;
                None
            }
        }
    }

    // next_line() is cancel safe, so a timeout never drops typed input
    pub async fn read_command(&mut self, wait: Duration) -> Input {
        if self.closed {
            return Input::Closed;
        }
        match tokio::time::timeout(wait, self.read_line()).await {
            Err(_) => Input::Timeout,
            Ok(Some(line)) => Input::Line(line),
            Ok(None) => Input::Closed,
        }
    }

    pub async fn ask(&mut self, prompt: &str) -> Option<String> {
        print!("{}", prompt.yellow());
        let _ = std::io::stdout().flush();
        self.read_line().await.map(|l| l.trim().to_string())
    }
}

impl Default for Console {
    fn default() -> Self {
        Console::new()
    }
}

// Output half of the terminal. Kept apart from Console so a session can
// read commands and print notices at the same time.
#[derive(Debug, Clone, Copy, Default)]
pub struct Printer;

impl Printer {
    pub fn heading(&self, text: &str) {
        println!("{}", "\n--------------------------------".yellow());
        println!("{}", text.yellow().bold());
    }

    pub fn item(&self, number: usize, text: &str) {
        println!("{}", format!("{number}. {text}").cyan());
    }

    pub fn option(&self, text: &str) {
        println!("{}", text.green());
    }

    pub fn info(&self, text: &str) {
        println!("{}", text.blue());
    }

    pub fn warn(&self, text: &str) {
        println!("{}", text.yellow());
    }

    pub fn error(&self, text: &str) {
        println!("{}", text.red());
    }
}

#[async_trait(?Send)]
impl CommandSource for Console {
    async fn next_command(&mut self, wait: Duration) -> Input {
        self.read_command(wait).await
    }
}

impl Notifier for Printer {
    fn notify(&mut self, event: &PlaybackEvent) {
        match event {
            PlaybackEvent::Loading { index, total, name } => {
                println!("{}", format!("Loading [{}/{}]: {}...", index + 1, total, name).yellow());
            }
            PlaybackEvent::TrackStarted { name, duration, .. } => {
                let length = if *duration > 0.0 {
                    format!(" ({})", format_time(*duration))
                } else {
                    String::new()
                };
                println!("{}", format!("Now playing: {name}{length}").blue().bold());
                println!("{}", "Type 'h' for commands".dark_grey());
            }
            PlaybackEvent::TrackFailed { name, reason, .. } => {
                self.error(&format!("Could not play {name}: {reason}. Skipping..."));
            }
            PlaybackEvent::TrackEnding { .. } => self.info("Track finished, playing next..."),
            PlaybackEvent::Paused => self.warn("Paused"),
            PlaybackEvent::Resumed => self.info("Resumed"),
            PlaybackEvent::Restarted { name } => self.info(&format!("Restarted: {name}")),
            PlaybackEvent::VolumeChanged(volume) => self.info(&format!("Volume: {volume}%")),
            PlaybackEvent::AutoAdvance(on) => {
                self.info(if *on { "Auto-advance on" } else { "Auto-advance off" })
            }
            PlaybackEvent::AtFirstTrack => self.warn("Already at the first track"),
            PlaybackEvent::Invalid(message) => self.error(message),
            PlaybackEvent::Status(report) => println!("{}", format_status(report).cyan()),
            PlaybackEvent::Help => println!("{}", HELP.green()),
            PlaybackEvent::QueueFinished => self.warn("Playback finished - queue is empty"),
            PlaybackEvent::Stopped => self.warn("Playback stopped"),
        }
    }
}

pub fn format_time(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let mins = (seconds / 60.0) as u64;
    let secs = (seconds % 60.0) as u64;
    format!("{:02}:{:02}", mins, secs)
}

fn format_status(report: &StatusReport) -> String {
    let position = if report.duration > 0.0 {
        format!("{} / {}", format_time(report.elapsed), format_time(report.duration))
    } else {
        format_time(report.elapsed)
    };

    let mut line = format!(
        "[{}/{}] {}  {}  vol {}%  auto {}",
        report.index + 1,
        report.total,
        report.name,
        position,
        report.volume,
        if report.auto_advance { "on" } else { "off" },
    );
    if report.paused {
        line.push_str("  (paused)");
    }
    if let Some(next) = &report.up_next {
        line.push_str(&format!("  next: {next}"));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_time(0.0), "00:00");
        assert_eq!(format_time(59.9), "00:59");
        assert_eq!(format_time(212.0), "03:32");
        assert_eq!(format_time(-3.0), "00:00");
    }

    #[test]
    fn status_line_shows_position_and_next() {
        let report = StatusReport {
            name: "Intro".into(),
            index: 0,
            total: 3,
            elapsed: 65.0,
            duration: 180.0,
            volume: 40,
            auto_advance: false,
            paused: true,
            up_next: Some("Verse".into()),
        };
        assert_eq!(
            format_status(&report),
            "[1/3] Intro  01:05 / 03:00  vol 40%  auto off  (paused)  next: Verse"
        );
    }

    #[test]
    fn status_line_without_duration_or_next() {
        let report = StatusReport {
            name: "Live".into(),
            index: 2,
            total: 3,
            elapsed: 5.0,
            duration: 0.0,
            volume: 50,
            auto_advance: true,
            paused: false,
            up_next: None,
        };
        assert_eq!(format_status(&report), "[3/3] Live  00:05  vol 50%  auto on");
    }
}
