//! Sample-rate conversion for the learned backend.
//!
//! The acoustic model dictates its input rate (16 kHz for YamNet-family
//! models), so decoded waveforms are resampled here when the source rate
//! differs.

use rubato::{FftFixedIn, Resampler};

use crate::embedder::EmbedderError;

/// Resample mono samples from one rate to another.
///
/// FFT-based resampler processed in fixed-size chunks; the tail chunk is
/// zero-padded and the output trimmed back to the expected length.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, EmbedderError> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let ratio = to_rate as f64 / from_rate as f64;

    let mut resampler = FftFixedIn::<f32>::new(from_rate as usize, to_rate as usize, 1024, 1, 1)
        .map_err(|e| EmbedderError::Resample(format!("Resampler init failed: {e}")))?;

    let mut output = Vec::new();
    let chunk_size = resampler.input_frames_max();

    for chunk in samples.chunks(chunk_size) {
        let mut input = vec![chunk.to_vec()];

        if chunk.len() < chunk_size {
            input[0].resize(chunk_size, 0.0);
        }

        let resampled = resampler
            .process(&input, None)
            .map_err(|e| EmbedderError::Resample(format!("Resample failed: {e}")))?;

        if !resampled.is_empty() {
            output.extend_from_slice(&resampled[0]);
        }
    }

    let expected_len = (samples.len() as f64 * ratio) as usize;
    output.truncate(expected_len);

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resample_same_rate_is_identity() {
        let samples = vec![0.1, 0.2, 0.3];
        let out = resample(&samples, 16_000, 16_000).unwrap();
        assert_eq!(out, samples);
    }

    #[test]
    fn test_resample_empty() {
        let out = resample(&[], 44_100, 16_000).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_resample_halves_length() {
        let samples = vec![0.0; 32_000];
        let out = resample(&samples, 32_000, 16_000).unwrap();
        assert_eq!(out.len(), 16_000);
    }
}
