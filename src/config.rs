// ==========================================
// CONFIGURATION
// ==========================================
// Settings live in <config_dir>/yt-tool/config.json next to the library
// files. Every field has a default, so a missing file or a partial file
// both work. YT_TOOL_CONFIG_DIR points the whole app at another directory.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

const APP_DIR_NAME: &str = "yt-tool";
const CONFIG_FILE: &str = "config.json";
const CONFIG_DIR_ENV: &str = "YT_TOOL_CONFIG_DIR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    // Volume a new session starts with (0-100)
    pub default_volume: u8,
    // How close to the end of a track auto-advance fires
    pub near_end_threshold_secs: f64,
    // Upper bound on the wait for a command between near-end checks
    pub poll_interval_ms: u64,
    pub resolve_timeout_secs: u64,
    pub resolve_retries: u32,
    pub retry_delay_ms: u64,
    pub resolver_cache_size: u64,
    // Resolved stream URLs are signed and expire; cached ones are dropped
    // after this long
    pub resolver_cache_ttl_secs: u64,
    // yt-dlp format selector; rodio can decode m4a/aac but not opus
    pub audio_format: String,
    pub fetch_timeout_secs: u64,
    // host:port dialed once at startup to tell online from offline
    pub connectivity_host: String,
    pub connectivity_timeout_secs: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        PlayerConfig {
            default_volume: 50,
            near_end_threshold_secs: 5.0,
            poll_interval_ms: 500,
            resolve_timeout_secs: 20,
            resolve_retries: 1,
            retry_delay_ms: 2000,
            resolver_cache_size: 128,
            resolver_cache_ttl_secs: 1800,
            audio_format: "bestaudio[ext=m4a]/bestaudio/best".to_string(),
            fetch_timeout_secs: 60,
            connectivity_host: "8.8.8.8:53".to_string(),
            connectivity_timeout_secs: 3,
        }
    }
}

impl PlayerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn resolver_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.resolver_cache_ttl_secs)
    }

    pub fn connectivity_timeout(&self) -> Duration {
        Duration::from_secs(self.connectivity_timeout_secs)
    }

    // Out-of-range values in a hand-edited file are pulled back into range
    // instead of rejecting the whole file.
    fn sanitize(&mut self) {
        self.default_volume = self.default_volume.min(100);
        if !self.near_end_threshold_secs.is_finite() || self.near_end_threshold_secs < 0.0 {
            self.near_end_threshold_secs = PlayerConfig::default().near_end_threshold_secs;
        }
        if self.poll_interval_ms == 0 {
            self.poll_interval_ms = PlayerConfig::default().poll_interval_ms;
        }
        if self.resolver_cache_size == 0 {
            self.resolver_cache_size = 1;
        }
        if self.resolver_cache_ttl_secs == 0 {
            self.resolver_cache_ttl_secs = PlayerConfig::default().resolver_cache_ttl_secs;
        }
        if self.connectivity_timeout_secs == 0 {
            self.connectivity_timeout_secs = PlayerConfig::default().connectivity_timeout_secs;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub player: PlayerConfig,
}

impl AppConfig {
    // Resolve the directory holding config, library files, cookies and the log
    pub fn data_dir() -> Result<PathBuf, ConfigError> {
        if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
            if !dir.trim().is_empty() {
                return Ok(PathBuf::from(dir));
            }
        }

        dirs::config_dir()
            .map(|d| d.join(APP_DIR_NAME))
            .ok_or(ConfigError::NoConfigDir)
    }

    // Load config.json from `dir`, creating the directory if needed.
    // A missing file yields the defaults.
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let path = dir.join(CONFIG_FILE);
        let mut config = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str::<AppConfig>(&raw)
                .map_err(|source| ConfigError::Json { path: path.clone(), source })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no config file at {}, using defaults", path.display());
                AppConfig::default()
            }
            Err(source) => return Err(ConfigError::Io { path, source }),
        };

        config.player.sanitize();
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(dir.path()).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.player.default_volume, 50);
        assert_eq!(config.player.near_end_threshold_secs, 5.0);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            r#"{ "player": { "poll_interval_ms": 250, "near_end_threshold_secs": 3.0 } }"#,
        )
        .unwrap();

        let config = AppConfig::load(dir.path()).unwrap();
        assert_eq!(config.player.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.player.near_end_threshold_secs, 3.0);
        assert_eq!(config.player.resolver_cache_size, 128);
        assert_eq!(config.player.resolver_cache_ttl(), Duration::from_secs(1800));
        assert_eq!(config.player.connectivity_host, "8.8.8.8:53");
    }

    #[test]
    fn out_of_range_values_are_sanitized() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            r#"{ "player": { "default_volume": 250, "poll_interval_ms": 0, "near_end_threshold_secs": -1.0 } }"#,
        )
        .unwrap();

        let config = AppConfig::load(dir.path()).unwrap();
        assert_eq!(config.player.default_volume, 100);
        assert_eq!(config.player.poll_interval_ms, 500);
        assert_eq!(config.player.near_end_threshold_secs, 5.0);
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "{ not json").unwrap();
        assert!(matches!(
            AppConfig::load(dir.path()),
            Err(ConfigError::Json { .. })
        ));
    }
}
