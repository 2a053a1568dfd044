use tracing::{debug, info};

use super::context::{lock_mixer, AudioContext, Chain, GainShape, SharedMixer, VoiceId};
use super::nodes::{Biquad, FilterKind, GainParam, Modulator, Oscillator, Waveform, SILENCE};
use crate::errors::SessionError;
use crate::meditation::AudioProfileKind;

const BELL_FREQ: f32 = 440.0;
const BELL_Q: f32 = 30.0;
const BELL_HEADROOM: f32 = 0.1;
const BELL_DECAY_SECS: f64 = 4.0;

const OCEAN_FREQ: f32 = 60.0;
const OCEAN_CUTOFF: f32 = 200.0;
const OCEAN_HEADROOM: f32 = 0.05;
const OCEAN_LFO_FREQ: f32 = 0.1;
const OCEAN_LFO_DEPTH: f32 = 20.0;

/// C5, E5, G5
const CHIME_FREQS: [f32; 3] = [523.25, 659.25, 783.99];
const CHIME_HEADROOM: f32 = 0.05;
const CHIME_ATTACK_SECS: f64 = 0.1;
const CHIME_DECAY_SECS: f64 = 3.0;
const CHIME_STAGGER_SECS: f64 = 0.5;

/// A live tone graph as seen by the session engine.
pub trait ToneGraph: Send {
    fn kind(&self) -> AudioProfileKind;

    /// Retarget constant gain stages without rebuilding the graph.
    fn set_volume(&mut self, volume: f32);

    fn set_muted(&mut self, muted: bool);

    /// Halt every generator. Safe to call repeatedly.
    fn stop(&mut self);

    fn is_stopped(&self) -> bool;
}

/// Something that can build tone graphs: the audio subsystem, or a test double.
pub trait ToneSynth {
    fn build(
        &mut self,
        kind: AudioProfileKind,
        volume: f32,
    ) -> Result<Box<dyn ToneGraph>, SessionError>;
}

impl ToneSynth for AudioContext {
    fn build(
        &mut self,
        kind: AudioProfileKind,
        volume: f32,
    ) -> Result<Box<dyn ToneGraph>, SessionError> {
        build_tone_graph(self, kind, volume).map(|h| Box::new(h) as Box<dyn ToneGraph>)
    }
}

/// Point-in-time view of a handle's nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphSnapshot {
    pub live_generators: usize,
    pub gains: Vec<f32>,
    pub modulator_phases: Vec<f32>,
    pub muted: bool,
}

/// Exclusive owner of one voice in the context's mixer.
pub struct AudioGraphHandle {
    mixer: SharedMixer,
    voice: VoiceId,
    kind: AudioProfileKind,
    volume: f32,
    stopped: bool,
}

impl AudioGraphHandle {
    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        let mixer = lock_mixer(&self.mixer);
        let t = mixer.current_time();
        match mixer.voice(self.voice) {
            Some(voice) => GraphSnapshot {
                live_generators: voice.live_generators(),
                gains: voice.chains.iter().map(|c| c.gain.value_at(t)).collect(),
                modulator_phases: voice
                    .chains
                    .iter()
                    .filter_map(|c| c.oscillator.modulator().map(|m| m.phase()))
                    .collect(),
                muted: voice.muted,
            },
            None => GraphSnapshot {
                live_generators: 0,
                gains: Vec::new(),
                modulator_phases: Vec::new(),
                muted: false,
            },
        }
    }
}

impl ToneGraph for AudioGraphHandle {
    fn kind(&self) -> AudioProfileKind {
        self.kind
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        if self.stopped {
            return;
        }
        let mut mixer = lock_mixer(&self.mixer);
        let now = mixer.current_time();
        if let Some(voice) = mixer.voice_mut(self.voice) {
            for chain in voice.chains.iter_mut() {
                match chain.shape {
                    GainShape::Constant => chain.gain.set_value_at(volume * chain.headroom, now),
                    GainShape::Strike if !chain.oscillator.is_stopped() => {
                        chain.gain.set_value_at(volume * chain.headroom, now)
                    }
                    GainShape::Strike | GainShape::Envelope => {}
                }
            }
        }
        debug!(kind = %self.kind, volume, "tone volume changed");
    }

    fn set_muted(&mut self, muted: bool) {
        if self.stopped {
            return;
        }
        if let Some(voice) = lock_mixer(&self.mixer).voice_mut(self.voice) {
            voice.muted = muted;
        }
    }

    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        lock_mixer(&self.mixer).remove_voice(self.voice);
        info!(kind = %self.kind, "tone graph stopped");
    }

    fn is_stopped(&self) -> bool {
        self.stopped
    }
}

impl Drop for AudioGraphHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for AudioGraphHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioGraphHandle")
            .field("voice", &self.voice)
            .field("kind", &self.kind)
            .field("volume", &self.volume)
            .field("stopped", &self.stopped)
            .finish()
    }
}

/// Build and start the tone graph for `kind` at `volume`.
///
/// Nothing is added to the mixer unless construction succeeds.
pub fn build_tone_graph(
    ctx: &AudioContext,
    kind: AudioProfileKind,
    volume: f32,
) -> Result<AudioGraphHandle, SessionError> {
    ctx.check_available()?;
    if !(0.0..=1.0).contains(&volume) {
        return Err(SessionError::invalid_config(format!(
            "volume {volume} is outside 0.0..=1.0"
        )));
    }

    let mixer = ctx.shared_mixer();
    let voice = {
        let mut guard = lock_mixer(&mixer);
        let now = guard.current_time();
        let sample_rate = guard.sample_rate() as f32;
        let chains = match kind {
            AudioProfileKind::Bell => bell(now, sample_rate, volume),
            AudioProfileKind::Ocean => ocean(now, sample_rate, volume),
            AudioProfileKind::Chimes => chimes(now, volume),
        };
        guard.add_voice(kind, chains)
    };

    info!(%kind, volume, "tone graph started");
    Ok(AudioGraphHandle {
        mixer,
        voice,
        kind,
        volume,
        stopped: false,
    })
}

fn bell(now: f64, sample_rate: f32, volume: f32) -> Vec<Chain> {
    let mut gain = GainParam::new(0.0);
    gain.set_value_at(volume * BELL_HEADROOM, now);
    gain.exponential_ramp_to(SILENCE, now + BELL_DECAY_SECS);
    vec![Chain {
        oscillator: Oscillator::new(Waveform::Sine, BELL_FREQ),
        filter: Some(Biquad::new(
            FilterKind::BandPass,
            BELL_FREQ,
            BELL_Q,
            sample_rate,
        )),
        gain,
        shape: GainShape::Strike,
        headroom: BELL_HEADROOM,
    }]
}

fn ocean(now: f64, sample_rate: f32, volume: f32) -> Vec<Chain> {
    let mut gain = GainParam::new(0.0);
    gain.set_value_at(volume * OCEAN_HEADROOM, now);
    vec![Chain {
        oscillator: Oscillator::new(Waveform::Sawtooth, OCEAN_FREQ)
            .with_modulator(Modulator::new(OCEAN_LFO_FREQ, OCEAN_LFO_DEPTH)),
        filter: Some(Biquad::new(
            FilterKind::LowPass,
            OCEAN_CUTOFF,
            std::f32::consts::FRAC_1_SQRT_2,
            sample_rate,
        )),
        gain,
        shape: GainShape::Constant,
        headroom: OCEAN_HEADROOM,
    }]
}

fn chimes(now: f64, volume: f32) -> Vec<Chain> {
    CHIME_FREQS
        .iter()
        .enumerate()
        .map(|(i, &freq)| {
            let mut gain = GainParam::new(0.0);
            gain.set_value_at(0.0, now);
            gain.linear_ramp_to(volume * CHIME_HEADROOM, now + CHIME_ATTACK_SECS);
            gain.exponential_ramp_to(
                SILENCE,
                now + CHIME_DECAY_SECS + i as f64 * CHIME_STAGGER_SECS,
            );
            Chain {
                oscillator: Oscillator::new(Waveform::Sine, freq),
                filter: None,
                gain,
                shape: GainShape::Envelope,
                headroom: CHIME_HEADROOM,
            }
        })
        .collect()
}
