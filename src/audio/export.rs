use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};

use super::context::{AudioContext, DEFAULT_SAMPLE_RATE};
use super::tone_graph::{build_tone_graph, ToneGraph};
use crate::errors::SessionError;
use crate::meditation::AudioProfileKind;

/// Render a profile offline into a mono 32-bit float WAV file.
///
/// Returns the number of frames written.
pub fn render_to_wav(
    kind: AudioProfileKind,
    volume: f32,
    seconds: f32,
    path: &Path,
) -> Result<usize, Box<dyn std::error::Error>> {
    if seconds <= 0.0 {
        return Err(Box::new(SessionError::invalid_config(
            "export length must be positive",
        )));
    }

    let ctx = AudioContext::offline(DEFAULT_SAMPLE_RATE);
    let mut graph = build_tone_graph(&ctx, kind, volume)?;
    let samples = ctx.render_seconds(seconds);
    graph.stop();

    let spec = WavSpec {
        channels: 1,
        sample_rate: DEFAULT_SAMPLE_RATE,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for sample in &samples {
        writer.write_sample(*sample)?;
    }
    writer.finalize()?;
    Ok(samples.len())
}
