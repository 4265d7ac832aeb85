// Main entry point for the YouTube Tool
// Sets up config and logging, then hands over to the menu-driven app.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

use yt_tool::config::AppConfig;
use yt_tool::ui::app::App;

const LOG_FILE: &str = "yt-tool.log";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Suppress ALSA error messages that pollute the terminal
    // These are non-critical audio buffer warnings from the audio system
    std::env::set_var("ALSA_PCM_NO_MMAP", "1");

    let data_dir = AppConfig::data_dir()?;
    let config = AppConfig::load(&data_dir)?;
    setup_logging(&data_dir);
    tracing::info!(dir = %data_dir.display(), "starting");

    let mut app = App::new(&config, &data_dir)?;
    app.run().await
}

// Logs go to a file so they never interleave with menus and prompts.
// RUST_LOG overrides the default filter.
fn setup_logging(dir: &Path) {
    let path = dir.join(LOG_FILE);
    let file = match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Logging disabled: cannot open {}: {}", path.display(), e);
            return;
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("yt_tool=info"));

    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .with_env_filter(filter)
        .init();
}
