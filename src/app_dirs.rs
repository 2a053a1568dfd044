use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// `$HOME/.local/state/zazen`, or the platform's local data dir.
    pub fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(PathBuf::from(home).join(".local").join("state").join("zazen"))
        } else {
            ProjectDirs::from("", "", "zazen").map(|proj_dirs| proj_dirs.data_local_dir().to_path_buf())
        }
    }

    pub fn db_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("sessions.db"))
    }

    pub fn log_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("zazen.log"))
    }

    /// Optional user guidance scripts, read in place of the bundled ones.
    pub fn guidance_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "zazen").map(|pd| pd.config_dir().join("guidance.json"))
    }
}
