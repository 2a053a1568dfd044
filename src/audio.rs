//! Procedural tones for meditation sessions.
//!
//! An [`AudioContext`] owns the mixer and sample clock. [`build_tone_graph`]
//! adds one voice per session and hands back an [`AudioGraphHandle`] that
//! owns it exclusively.
pub mod context;
pub mod device;
pub mod export;
pub mod nodes;
pub mod tone_graph;

pub use context::{AudioContext, DEFAULT_SAMPLE_RATE};
pub use device::{open_default_output, AudioDevice};
pub use export::render_to_wav;
pub use tone_graph::{build_tone_graph, AudioGraphHandle, GraphSnapshot, ToneGraph, ToneSynth};
