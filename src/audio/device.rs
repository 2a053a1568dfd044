use tracing::warn;

use super::context::AudioContext;

/// Keeps the output stream alive for as long as the front end runs.
pub struct AudioDevice {
    pub description: String,
    #[cfg(feature = "playback")]
    _stream: Option<cpal::Stream>,
}

impl std::fmt::Debug for AudioDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioDevice")
            .field("description", &self.description)
            .finish()
    }
}

/// Open the default output device and a context that feeds it.
///
/// Never fails: without a device the returned context is unavailable and
/// sessions run silently.
pub fn open_default_output() -> (AudioContext, AudioDevice) {
    match open_stream() {
        Ok(pair) => pair,
        Err(reason) => {
            warn!(%reason, "audio output unavailable");
            (
                AudioContext::unavailable(reason.clone()),
                AudioDevice {
                    description: reason,
                    #[cfg(feature = "playback")]
                    _stream: None,
                },
            )
        }
    }
}

#[cfg(not(feature = "playback"))]
fn open_stream() -> Result<(AudioContext, AudioDevice), String> {
    Err("built without the `playback` feature".to_string())
}

#[cfg(feature = "playback")]
fn open_stream() -> Result<(AudioContext, AudioDevice), String> {
    use super::context::lock_mixer;
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use tracing::info;

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or("No audio output device found")?;
    let config = device
        .default_output_config()
        .map_err(|e| format!("Failed to get audio config: {e}"))?;

    let sample_rate = config.sample_rate().0;
    let channels = config.channels() as usize;
    let name = device.name().unwrap_or_else(|_| "Unknown".to_string());

    let ctx = AudioContext::offline(sample_rate);
    let mixer = ctx.shared_mixer();
    let mut mono: Vec<f32> = Vec::new();

    let stream = device
        .build_output_stream(
            &config.into(),
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let frames = data.len() / channels;
                mono.resize(frames, 0.0);
                lock_mixer(&mixer).render(&mut mono);
                for (frame, sample) in data.chunks_mut(channels).zip(mono.iter()) {
                    // hard clip as a safety limiter
                    let s = sample.clamp(-0.5, 0.5);
                    frame.iter_mut().for_each(|out| *out = s);
                }
            },
            |err| warn!(%err, "audio stream error"),
            None,
        )
        .map_err(|e| format!("Failed to build audio stream: {e}"))?;
    stream
        .play()
        .map_err(|e| format!("Failed to start audio stream: {e}"))?;

    let description = format!("{name} @ {sample_rate}Hz");
    info!(device = %description, "audio output opened");
    Ok((
        ctx,
        AudioDevice {
            description,
            _stream: Some(stream),
        },
    ))
}

#[cfg(all(test, not(feature = "playback")))]
mod tests {
    use super::*;

    #[test]
    fn without_playback_the_context_is_unavailable() {
        let (ctx, device) = open_default_output();
        assert!(!ctx.is_available());
        assert!(device.description.contains("playback"));
    }
}
