use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::meditation::{MeditationType, DURATION_OPTIONS};
use crate::session::SessionConfig;

const CONFIG_FILE: &str = "config.json";

/// Colour scheme for the terminal front end.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Theme {
    /// Tint each screen with the meditation type's colour.
    #[default]
    Calm,
    Plain,
}

/// Defaults applied to the setup screen on launch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub meditation_type: MeditationType,
    pub duration_minutes: u32,
    pub with_music: bool,
    pub with_ai_guidance: bool,
    pub volume: f32,
    pub theme: Theme,
}

impl Default for Config {
    fn default() -> Self {
        let session = SessionConfig::default();
        Self {
            meditation_type: session.meditation_type,
            duration_minutes: session.duration_minutes,
            with_music: session.with_music,
            with_ai_guidance: session.with_ai_guidance,
            volume: session.volume,
            theme: Theme::default(),
        }
    }
}

impl Config {
    /// Replace values a session would reject with their defaults.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if !DURATION_OPTIONS.contains(&self.duration_minutes) {
            warn!(minutes = self.duration_minutes, "unsupported duration in config");
            self.duration_minutes = defaults.duration_minutes;
        }
        if !(0.0..=1.0).contains(&self.volume) {
            warn!(volume = self.volume, "volume in config out of range");
            self.volume = defaults.volume;
        }
        self
    }

    /// Take the session fields from `session`, keeping the theme.
    pub fn with_session(&self, session: &SessionConfig) -> Self {
        Self {
            meditation_type: session.meditation_type,
            duration_minutes: session.duration_minutes,
            with_music: session.with_music,
            with_ai_guidance: session.with_ai_guidance,
            volume: session.volume,
            theme: self.theme,
        }
    }
}

impl From<&Config> for SessionConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            meditation_type: cfg.meditation_type,
            duration_minutes: cfg.duration_minutes,
            with_music: cfg.with_music,
            with_ai_guidance: cfg.with_ai_guidance,
            volume: cfg.volume,
            ..SessionConfig::default()
        }
    }
}

/// Where session defaults are kept between runs.
pub trait ConfigStore {
    /// Never fails: missing or corrupt files yield `Config::default()`.
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    /// Store at `<config dir>/zazen/config.json`, or the working directory
    /// when no home directory can be resolved.
    pub fn new() -> Self {
        let path = ProjectDirs::from("", "", "zazen")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Config::default(),
            Err(err) => {
                warn!(path = %self.path.display(), %err, "cannot read config, using defaults");
                return Config::default();
            }
        };
        let cfg: Config = serde_json::from_slice(&bytes).unwrap_or_else(|err| {
            warn!(path = %self.path.display(), %err, "ignoring unreadable config");
            Config::default()
        });
        cfg.sanitized()
    }

    /// Written to a sibling `.json.tmp` first, then renamed into place.
    fn save(&self, cfg: &Config) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).map_err(io::Error::other)?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, data)?;
        fs::rename(&staging, &self.path)?;
        debug!(path = %self.path.display(), "saved defaults");
        Ok(())
    }
}
