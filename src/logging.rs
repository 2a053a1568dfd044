use std::error::Error;
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing::Subscriber;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding the log filter, e.g. `ZAZEN_LOG=zazen=debug`.
pub const LOG_ENV: &str = "ZAZEN_LOG";

pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// A subscriber appending plain-text lines to `path`.
pub fn file_subscriber(
    path: &Path,
    filter: EnvFilter,
) -> std::io::Result<impl Subscriber + Send + Sync> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .finish())
}

/// Install the global subscriber. The terminal belongs to the UI, so logs go to a file.
pub fn init(path: &Path) -> Result<(), Box<dyn Error>> {
    let subscriber = file_subscriber(path, env_filter())?;
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
