// YouTube audio stream extractor
// Shells out to yt-dlp to turn a watch URL into a direct audio stream URL,
// with a per-call time budget and a bounded number of retries.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::config::PlayerConfig;
use crate::error::ResolveError;
use crate::youtube::resolver::{ResolvedStream, StreamResolver};

static YOUTUBE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^https?://(?:www\.)?(?:youtube\.com|youtu\.be)/.*$|^https?://(?:www\.)?youtube\.com/playlist\?list=.*$",
    )
    .expect("static regex is valid")
});

pub fn is_youtube_url(url: &str) -> bool {
    YOUTUBE_URL.is_match(url.trim())
}

// The subset of `yt-dlp -j` output we care about
#[derive(Debug, Deserialize)]
struct VideoInfo {
    url: Option<String>,
    title: Option<String>,
    duration: Option<f64>,
}

impl VideoInfo {
    fn into_stream(self) -> Result<ResolvedStream, ResolveError> {
        let url = self
            .url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| ResolveError::Malformed("no stream url in yt-dlp output".into()))?;

        Ok(ResolvedStream {
            url,
            duration: self.duration.filter(|d| *d > 0.0),
            title: self.title,
        })
    }
}

pub struct YtDlpResolver {
    program: String,
    format: String,
    timeout: Duration,
    retries: u32,
    retry_delay: Duration,
    cookies: Option<PathBuf>,
}

impl YtDlpResolver {
    pub fn new(config: &PlayerConfig) -> Self {
        YtDlpResolver {
            program: "yt-dlp".to_string(),
            format: config.audio_format.clone(),
            timeout: config.resolve_timeout(),
            retries: config.resolve_retries,
            retry_delay: config.retry_delay(),
            cookies: None,
        }
    }

    // Use a cookies.txt export for age-restricted or members-only videos
    pub fn with_cookies(mut self, cookies: Option<PathBuf>) -> Self {
        self.cookies = cookies.filter(|p| p.exists());
        self
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    // Run `yt-dlp --version` once so a missing binary is reported up front
    // instead of as a failure on every track.
    pub async fn check_available(&self) -> Result<String, ResolveError> {
        let output = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => ResolveError::NotInstalled,
                _ => ResolveError::Io(e),
            })?;

        if !output.status.success() {
            return Err(ResolveError::NotInstalled);
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn resolve_once(&self, reference: &str) -> Result<ResolvedStream, ResolveError> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-j")
            .arg("--no-playlist")
            .arg("--no-warnings")
            .arg("-f")
            .arg(&self.format);

        if let Some(cookies) = &self.cookies {
            cmd.arg("--cookies").arg(cookies);
        }

        cmd.arg(reference)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| ResolveError::Timeout {
                reference: reference.to_string(),
                timeout: self.timeout,
            })?
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => ResolveError::NotInstalled,
                _ => ResolveError::Io(e),
            })?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(ResolveError::Failed(first_error_line(&error)));
        }

        parse_video_info(&String::from_utf8_lossy(&output.stdout))
    }
}

#[async_trait(?Send)]
impl StreamResolver for YtDlpResolver {
    async fn resolve(&mut self, reference: &str) -> Result<ResolvedStream, ResolveError> {
        let mut attempt = 0;
        loop {
            tracing::info!(reference, attempt, "resolving audio stream");
            match self.resolve_once(reference).await {
                Ok(stream) => return Ok(stream),
                // Retrying cannot install yt-dlp
                Err(ResolveError::NotInstalled) => return Err(ResolveError::NotInstalled),
                Err(e) if attempt < self.retries => {
                    tracing::warn!(reference, error = %e, "resolve failed, retrying");
                    attempt += 1;
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

// yt-dlp prints one JSON document per video; with --no-playlist that is a
// single line, but stray lines before it are skipped.
fn parse_video_info(stdout: &str) -> Result<ResolvedStream, ResolveError> {
    let line = stdout
        .lines()
        .map(str::trim)
        .find(|l| l.starts_with('{'))
        .ok_or_else(|| ResolveError::Malformed("yt-dlp printed no JSON".into()))?;

    let info: VideoInfo =
        serde_json::from_str(line).map_err(|e| ResolveError::Malformed(e.to_string()))?;
    info.into_stream()
}

fn first_error_line(stderr: &str) -> String {
    stderr
        .lines()
        .map(str::trim)
        .find(|l| l.starts_with("ERROR"))
        .or_else(|| stderr.lines().map(str::trim).find(|l| !l.is_empty()))
        .unwrap_or("unknown error")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn youtube_urls_are_recognized() {
        assert!(is_youtube_url("https://youtu.be/kyjg5kX4pT0?si=QKSHUocD6HVORbBW"));
        assert!(is_youtube_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_youtube_url("http://youtube.com/playlist?list=PL123"));
        assert!(is_youtube_url("  https://youtube.com/watch?v=x  "));
    }

    #[test]
    fn other_urls_are_rejected() {
        for url in ["", "not_a_url", "https://google.com", "ftp://youtube.com/x", "youtube.com/watch?v=x"] {
            assert!(!is_youtube_url(url), "accepted {url:?}");
        }
    }

    #[test]
    fn parses_url_duration_and_title() {
        let stdout = r#"{"id": "abc", "title": "Song", "duration": 212.0, "url": "https://rr3.googlevideo.com/videoplayback?x=1"}"#;
        let stream = parse_video_info(stdout).unwrap();
        assert_eq!(stream.url, "https://rr3.googlevideo.com/videoplayback?x=1");
        assert_eq!(stream.duration, Some(212.0));
        assert_eq!(stream.title.as_deref(), Some("Song"));
    }

    #[test]
    fn zero_duration_is_unknown() {
        let stream = parse_video_info(r#"{"url": "https://x", "duration": 0}"#).unwrap();
        assert_eq!(stream.duration, None);
    }

    #[test]
    fn missing_url_is_malformed() {
        assert!(matches!(
            parse_video_info(r#"{"title": "no formats"}"#),
            Err(ResolveError::Malformed(_))
        ));
        assert!(matches!(parse_video_info(""), Err(ResolveError::Malformed(_))));
    }

    #[test]
    fn picks_the_error_line_from_stderr() {
        let stderr = "WARNING: something\nERROR: [youtube] abc: Video unavailable\n";
        assert_eq!(first_error_line(stderr), "ERROR: [youtube] abc: Video unavailable");
        assert_eq!(first_error_line("\n  plain failure\n"), "plain failure");
        assert_eq!(first_error_line(""), "unknown error");
    }

    #[tokio::test]
    async fn missing_binary_is_reported_as_not_installed() {
        let resolver = YtDlpResolver::new(&PlayerConfig::default())
            .with_program("yt-dlp-definitely-not-installed-here");
        assert!(matches!(
            resolver.check_available().await,
            Err(ResolveError::NotInstalled)
        ));
    }
}
