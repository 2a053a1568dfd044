//! Signal-generating and signal-shaping nodes used by the tone graphs.

use std::f32::consts::{PI, TAU};

/// Gain level treated as silence; decay envelopes ramp toward it.
pub const SILENCE: f32 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Sawtooth,
}

/// Low-frequency sine that offsets its carrier's frequency by `±depth` Hz.
#[derive(Debug, Clone)]
pub struct Modulator {
    pub frequency: f32,
    pub depth: f32,
    phase: f32,
    stopped: bool,
}

impl Modulator {
    pub fn new(frequency: f32, depth: f32) -> Self {
        Self {
            frequency,
            depth,
            phase: 0.0,
            stopped: false,
        }
    }

    fn next(&mut self, sample_rate: f32) -> f32 {
        if self.stopped {
            return 0.0;
        }
        let value = (self.phase * TAU).sin() * self.depth;
        self.phase = (self.phase + self.frequency / sample_rate).fract();
        value
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

#[derive(Debug, Clone)]
pub struct Oscillator {
    pub waveform: Waveform,
    pub frequency: f32,
    phase: f32,
    modulator: Option<Modulator>,
    stopped: bool,
}

impl Oscillator {
    pub fn new(waveform: Waveform, frequency: f32) -> Self {
        Self {
            waveform,
            frequency,
            phase: 0.0,
            modulator: None,
            stopped: false,
        }
    }

    pub fn with_modulator(mut self, modulator: Modulator) -> Self {
        self.modulator = Some(modulator);
        self
    }

    pub fn next(&mut self, sample_rate: f32) -> f32 {
        if self.stopped {
            return 0.0;
        }
        let offset = self
            .modulator
            .as_mut()
            .map_or(0.0, |m| m.next(sample_rate));
        let value = match self.waveform {
            Waveform::Sine => (self.phase * TAU).sin(),
            Waveform::Sawtooth => 2.0 * self.phase - 1.0,
        };
        let frequency = (self.frequency + offset).max(0.0);
        self.phase = (self.phase + frequency / sample_rate).fract();
        value
    }

    /// Stop the oscillator and its modulator. Stopped nodes never restart.
    pub fn stop(&mut self) {
        self.stopped = true;
        if let Some(m) = self.modulator.as_mut() {
            m.stopped = true;
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn modulator(&self) -> Option<&Modulator> {
        self.modulator.as_ref()
    }

    /// Generators still producing signal: the carrier plus any modulator.
    pub fn live_generators(&self) -> usize {
        let carrier = usize::from(!self.stopped);
        let lfo = self
            .modulator
            .as_ref()
            .map_or(0, |m| usize::from(!m.stopped));
        carrier + lfo
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    LowPass,
    BandPass,
}

/// Second-order IIR filter using the RBJ cookbook coefficients.
#[derive(Debug, Clone)]
pub struct Biquad {
    pub kind: FilterKind,
    pub frequency: f32,
    pub q: f32,
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    z1: f32,
    z2: f32,
}

impl Biquad {
    pub fn new(kind: FilterKind, frequency: f32, q: f32, sample_rate: f32) -> Self {
        let w0 = 2.0 * PI * frequency / sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * q);
        let a0 = 1.0 + alpha;

        let (b0, b1, b2) = match kind {
            FilterKind::LowPass => {
                let b1 = 1.0 - cos_w0;
                (b1 / 2.0, b1, b1 / 2.0)
            }
            // constant 0 dB peak gain
            FilterKind::BandPass => (alpha, 0.0, -alpha),
        };

        Self {
            kind,
            frequency,
            q,
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: -2.0 * cos_w0 / a0,
            a2: (1.0 - alpha) / a0,
            z1: 0.0,
            z2: 0.0,
        }
    }

    pub fn process(&mut self, input: f32) -> f32 {
        // transposed direct form II
        let out = self.b0 * input + self.z1;
        self.z1 = self.b1 * input - self.a1 * out + self.z2;
        self.z2 = self.b2 * input - self.a2 * out;
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Curve {
    Step,
    Linear,
    Exponential,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Automation {
    time: f64,
    value: f32,
    curve: Curve,
}

/// Gain value with a timeline of scheduled changes.
///
/// A ramp runs from the previous event's time and value to its own, so
/// `set(0.0, 0.0)` followed by `linear_ramp(1.0, 2.0)` reaches 0.5 at 1 s.
#[derive(Debug, Clone)]
pub struct GainParam {
    initial: f32,
    events: Vec<Automation>,
}

impl GainParam {
    pub fn new(initial: f32) -> Self {
        Self {
            initial,
            events: Vec::new(),
        }
    }

    pub fn set_value_at(&mut self, value: f32, time: f64) {
        self.insert(Automation {
            time,
            value,
            curve: Curve::Step,
        });
    }

    pub fn linear_ramp_to(&mut self, value: f32, end: f64) {
        self.insert(Automation {
            time: end,
            value,
            curve: Curve::Linear,
        });
    }

    /// Exponential ramps cannot pass through zero; `value` is floored at `SILENCE`.
    pub fn exponential_ramp_to(&mut self, value: f32, end: f64) {
        self.insert(Automation {
            time: end,
            value: value.max(SILENCE),
            curve: Curve::Exponential,
        });
    }

    fn insert(&mut self, event: Automation) {
        let pos = self
            .events
            .iter()
            .position(|e| e.time > event.time)
            .unwrap_or(self.events.len());
        self.events.insert(pos, event);
    }

    pub fn value_at(&self, t: f64) -> f32 {
        let (mut prev_time, mut prev_value) = (0.0, self.initial);
        for event in &self.events {
            if event.time <= t {
                prev_time = event.time;
                prev_value = event.value;
                continue;
            }
            let span = event.time - prev_time;
            let frac = if span > 0.0 {
                ((t - prev_time) / span) as f32
            } else {
                1.0
            };
            return match event.curve {
                Curve::Step => prev_value,
                Curve::Linear => prev_value + (event.value - prev_value) * frac,
                Curve::Exponential if prev_value > 0.0 => {
                    prev_value * (event.value / prev_value).powf(frac)
                }
                Curve::Exponential => prev_value,
            };
        }
        prev_value
    }

    /// True when no event is scheduled after `t`.
    pub fn is_settled(&self, t: f64) -> bool {
        self.events.last().map_or(true, |e| e.time <= t)
    }

    pub fn has_ramps(&self) -> bool {
        self.events.iter().any(|e| e.curve != Curve::Step)
    }
}
