use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use super::nodes::{Biquad, GainParam, Oscillator, SILENCE};
use crate::errors::SessionError;
use crate::meditation::AudioProfileKind;

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

pub type VoiceId = u64;

/// How a gain stage reacts to the volume control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GainShape {
    /// Held level, rescaled on every volume change.
    Constant,
    /// Decaying strike: a volume change steps the level, the decay keeps its end time.
    Strike,
    /// Fixed envelope, never rescaled once scheduled.
    Envelope,
}

impl GainShape {
    pub fn decays(self) -> bool {
        matches!(self, Self::Strike | Self::Envelope)
    }
}

/// One oscillator → optional filter → gain path.
#[derive(Debug, Clone)]
pub struct Chain {
    pub oscillator: Oscillator,
    pub filter: Option<Biquad>,
    pub gain: GainParam,
    pub shape: GainShape,
    pub headroom: f32,
}

impl Chain {
    fn next(&mut self, sample_rate: f32, t: f64) -> f32 {
        let raw = self.oscillator.next(sample_rate);
        let shaped = match self.filter.as_mut() {
            Some(filter) => filter.process(raw),
            None => raw,
        };
        shaped * self.gain.value_at(t)
    }

    /// Envelopes that have decayed to silence stop their own oscillator.
    fn finish_if_decayed(&mut self, t: f64) -> bool {
        if self.oscillator.is_stopped() || !self.shape.decays() {
            return false;
        }
        if self.gain.is_settled(t) && self.gain.value_at(t) <= SILENCE {
            self.oscillator.stop();
            return true;
        }
        false
    }
}

/// All chains belonging to one tone graph.
#[derive(Debug)]
pub struct Voice {
    pub id: VoiceId,
    pub kind: AudioProfileKind,
    pub chains: Vec<Chain>,
    pub muted: bool,
}

impl Voice {
    pub fn live_generators(&self) -> usize {
        self.chains
            .iter()
            .map(|c| c.oscillator.live_generators())
            .sum()
    }

    pub fn stop(&mut self) {
        for chain in &mut self.chains {
            chain.oscillator.stop();
        }
    }
}

/// Shared render state: the sample clock plus every live voice.
#[derive(Debug)]
pub struct Mixer {
    sample_rate: u32,
    frames: u64,
    next_id: VoiceId,
    voices: Vec<Voice>,
}

impl Mixer {
    fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            frames: 0,
            next_id: 1,
            voices: Vec::new(),
        }
    }

    pub fn current_time(&self) -> f64 {
        self.frames as f64 / self.sample_rate as f64
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn add_voice(&mut self, kind: AudioProfileKind, chains: Vec<Chain>) -> VoiceId {
        let id = self.next_id;
        self.next_id += 1;
        self.voices.push(Voice {
            id,
            kind,
            chains,
            muted: false,
        });
        id
    }

    pub fn voice_mut(&mut self, id: VoiceId) -> Option<&mut Voice> {
        self.voices.iter_mut().find(|v| v.id == id)
    }

    pub fn voice(&self, id: VoiceId) -> Option<&Voice> {
        self.voices.iter().find(|v| v.id == id)
    }

    /// Stop and drop a voice. Returns false if it was already gone.
    pub fn remove_voice(&mut self, id: VoiceId) -> bool {
        match self.voices.iter().position(|v| v.id == id) {
            Some(pos) => {
                let mut voice = self.voices.swap_remove(pos);
                voice.stop();
                true
            }
            None => false,
        }
    }

    pub fn live_generators(&self) -> usize {
        self.voices.iter().map(Voice::live_generators).sum()
    }

    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    /// Mix every voice into `out` as mono samples, advancing the sample clock.
    pub fn render(&mut self, out: &mut [f32]) {
        let sample_rate = self.sample_rate as f32;
        for sample in out.iter_mut() {
            let t = self.current_time();
            let mut mix = 0.0;
            for voice in &mut self.voices {
                for chain in &mut voice.chains {
                    let s = chain.next(sample_rate, t);
                    if !voice.muted {
                        mix += s;
                    }
                }
            }
            *sample = mix;
            self.frames += 1;
        }

        let t = self.current_time();
        for voice in &mut self.voices {
            for chain in &mut voice.chains {
                if chain.finish_if_decayed(t) {
                    debug!(voice = voice.id, kind = %voice.kind, "envelope decayed, oscillator stopped");
                }
            }
        }
    }
}

pub type SharedMixer = Arc<Mutex<Mixer>>;

/// The audio subsystem handed to the tone graph builder.
///
/// Owned by the hosting front end and dropped with it. Clones share one
/// mixer, so a test can keep a clone to inspect what a session left behind.
#[derive(Debug, Clone)]
pub struct AudioContext {
    mixer: SharedMixer,
    unavailable: Option<String>,
}

impl AudioContext {
    /// A context that renders on demand, with no device attached.
    pub fn offline(sample_rate: u32) -> Self {
        Self {
            mixer: Arc::new(Mutex::new(Mixer::new(sample_rate))),
            unavailable: None,
        }
    }

    /// A context whose every graph construction fails.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            mixer: Arc::new(Mutex::new(Mixer::new(DEFAULT_SAMPLE_RATE))),
            unavailable: Some(reason.into()),
        }
    }

    pub fn is_available(&self) -> bool {
        self.unavailable.is_none()
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        self.unavailable.as_deref()
    }

    pub fn shared_mixer(&self) -> SharedMixer {
        Arc::clone(&self.mixer)
    }

    /// Lock the mixer, recovering it if a render thread panicked mid-block.
    pub fn lock(&self) -> MutexGuard<'_, Mixer> {
        lock_mixer(&self.mixer)
    }

    pub(crate) fn check_available(&self) -> Result<(), SessionError> {
        match &self.unavailable {
            Some(reason) => Err(SessionError::audio_unavailable(reason.clone())),
            None => Ok(()),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.lock().sample_rate()
    }

    pub fn current_time(&self) -> f64 {
        self.lock().current_time()
    }

    pub fn render(&self, out: &mut [f32]) {
        self.lock().render(out);
    }

    /// Render `seconds` of audio and return the samples.
    pub fn render_seconds(&self, seconds: f32) -> Vec<f32> {
        let frames = (seconds * self.sample_rate() as f32).round() as usize;
        let mut buf = vec![0.0; frames];
        self.render(&mut buf);
        buf
    }

    pub fn live_generators(&self) -> usize {
        self.lock().live_generators()
    }

    pub fn voice_count(&self) -> usize {
        self.lock().voice_count()
    }
}

pub(crate) fn lock_mixer(mixer: &SharedMixer) -> MutexGuard<'_, Mixer> {
    mixer
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
