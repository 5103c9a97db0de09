//! Audio decoding and preprocessing.
//!
//! Turns raw audio bytes into the mono f32 waveform the embedding backends
//! consume. Resampling is left to the backend, since each model dictates its
//! own target rate.

mod decode;
#[cfg(feature = "onnx")]
pub mod resample;

pub use decode::decode_bytes;

use serde::{Deserialize, Serialize};

/// Error type for audio decoding
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Unsupported or malformed audio container: {0}")]
    UnsupportedContainer(String),

    #[error("No audio track found in container")]
    NoAudioTrack,

    #[error("Audio track is missing a sample rate")]
    MissingSampleRate,

    #[error("No audio samples decoded")]
    NoSamples,

    #[error("Decode failed: {0}")]
    DecodeFailed(String),
}

/// A decoded mono waveform tagged with its sample rate.
///
/// Produced once per audio upload and consumed by exactly one embedder call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Waveform {
    /// Mono samples as 32-bit floats
    pub samples: Vec<f32>,
    /// Sample rate in Hz, passed through from the source unchanged
    pub sample_rate: u32,
}

impl Waveform {
    /// Create a waveform from mono samples
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Duration in seconds
    pub fn duration_s(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// The raw sample bytes in little-endian order.
    ///
    /// Used by the deterministic backend to derive a stable seed, so the
    /// byte layout must not change between calls.
    pub fn sample_bytes(&self) -> Vec<u8> {
        self.samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }
}

/// Downmix interleaved multi-channel samples to mono by unweighted averaging
pub(crate) fn downmix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }

    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downmix_stereo() {
        let stereo = vec![1.0, 0.5, 0.8, 0.2, 0.6, 0.4];
        let mono = downmix_to_mono(&stereo, 2);
        assert_eq!(mono.len(), 3);
        assert!((mono[0] - 0.75).abs() < 1e-6);
        assert!((mono[1] - 0.5).abs() < 1e-6);
        assert!((mono[2] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_downmix_mono_passthrough() {
        let mono = vec![0.1, 0.2, 0.3];
        assert_eq!(downmix_to_mono(&mono, 1), mono);
    }

    #[test]
    fn test_downmix_four_channels() {
        let quad = vec![1.0, 1.0, 0.0, 0.0];
        let mono = downmix_to_mono(&quad, 4);
        assert_eq!(mono.len(), 1);
        assert!((mono[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_waveform_duration() {
        let wf = Waveform::new(vec![0.0; 8000], 16_000);
        assert!((wf.duration_s() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_sample_bytes_stable() {
        let wf = Waveform::new(vec![0.25, -1.0], 44_100);
        assert_eq!(wf.sample_bytes(), wf.sample_bytes());
        assert_eq!(wf.sample_bytes().len(), 8);
    }
}
