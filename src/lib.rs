//! Meditation session engine: tone graphs, a countdown clock, rotating
//! guidance and the state machine that ties them together. The `zazen`
//! binary adds the terminal front end on top.
pub mod app_dirs;
pub mod audio;
pub mod clock;
pub mod config;
pub mod engine;
pub mod errors;
pub mod guidance;
pub mod logging;
pub mod meditation;
pub mod runtime;
pub mod session;
pub mod stats;
pub mod util;

pub use engine::{Activity, CompletionReason, Phase, SessionEngine, SessionEvent, SessionStatus};
pub use errors::SessionError;
pub use meditation::{AudioProfileKind, MeditationType};
pub use session::{SessionConfig, SessionRecord, StoredSession};
