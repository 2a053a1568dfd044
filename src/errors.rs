use std::fmt;

/// Errors surfaced by the meditation engine and its collaborators.
///
/// Only `InvalidConfig` stops a session from starting; the audio and
/// guidance variants are absorbed by the engine and reported through
/// `SessionStatus`.
#[derive(Debug)]
pub enum SessionError {
    AudioUnavailable(String),
    GuidanceFetchFailed(String),
    InvalidConfig(String),
    InvalidTransition {
        from: &'static str,
        action: &'static str,
    },
    ClockAlreadyRunning,
    Store(rusqlite::Error),
}

impl SessionError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    pub fn audio_unavailable(message: impl Into<String>) -> Self {
        Self::AudioUnavailable(message.into())
    }

    pub fn guidance_failed(message: impl Into<String>) -> Self {
        Self::GuidanceFetchFailed(message.into())
    }

    /// Degraded modes never abort a session.
    pub fn is_degraded_mode(&self) -> bool {
        matches!(
            self,
            Self::AudioUnavailable(_) | Self::GuidanceFetchFailed(_)
        )
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AudioUnavailable(msg) => write!(f, "audio unavailable: {msg}"),
            Self::GuidanceFetchFailed(msg) => write!(f, "guidance unavailable: {msg}"),
            Self::InvalidConfig(msg) => write!(f, "invalid session config: {msg}"),
            Self::InvalidTransition { from, action } => {
                write!(f, "cannot {action} while {from}")
            }
            Self::ClockAlreadyRunning => write!(f, "session clock is already running"),
            Self::Store(err) => write!(f, "failed to store session: {err}"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for SessionError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Store(err)
    }
}
