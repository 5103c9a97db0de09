//! Audio byte-buffer decoding using symphonia.
//!
//! Decodes any container symphonia can probe (WAV/PCM at minimum) into a
//! mono f32 waveform.

use std::io::Cursor;

use symphonia::core::audio::{AudioBufferRef, SampleBuffer};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use super::{downmix_to_mono, DecodeError, Waveform};

/// Decode an in-memory audio buffer to a mono waveform.
///
/// Multi-channel audio is downmixed by unweighted per-sample averaging. The
/// source sample rate is passed through unchanged.
pub fn decode_bytes(bytes: &[u8]) -> Result<Waveform, DecodeError> {
    let cursor = Cursor::new(bytes.to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    // No filename available for an in-memory buffer, so probe without a hint
    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| DecodeError::UnsupportedContainer(e.to_string()))?;

    let mut format = probed.format;

    // Find the first audio track
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(DecodeError::NoAudioTrack)?;

    let track_id = track.id;

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or(DecodeError::MissingSampleRate)?;

    let channels = track
        .codec_params
        .channels
        .map(|c| c.count())
        .unwrap_or(1)
        .max(1);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| DecodeError::DecodeFailed(format!("Failed to create decoder: {e}")))?;

    let mut samples: Vec<f32> = Vec::new();

    loop {
        match format.next_packet() {
            Ok(packet) => {
                if packet.track_id() != track_id {
                    continue;
                }

                match decoder.decode(&packet) {
                    Ok(decoded) => append_samples(&decoded, &mut samples),
                    Err(SymphoniaError::DecodeError(e)) => {
                        warn!(error = %e, "Decode error, skipping packet");
                        continue;
                    }
                    Err(e) => {
                        return Err(DecodeError::DecodeFailed(e.to_string()));
                    }
                }
            }
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                // End of stream
                break;
            }
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => {
                warn!(error = %e, "Error reading packet, stopping decode");
                break;
            }
        }
    }

    if samples.is_empty() {
        return Err(DecodeError::NoSamples);
    }

    let mono = downmix_to_mono(&samples, channels);

    debug!(
        sample_rate,
        channels,
        mono_samples = mono.len(),
        "Audio decoded"
    );

    Ok(Waveform::new(mono, sample_rate))
}

/// Append decoded samples to the output buffer as interleaved f32
fn append_samples(decoded: &AudioBufferRef, output: &mut Vec<f32>) {
    let mut sample_buf = SampleBuffer::<f32>::new(decoded.frames() as u64, *decoded.spec());
    sample_buf.copy_interleaved_ref(decoded.clone());
    output.extend_from_slice(sample_buf.samples());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes(channels: u16, sample_rate: u32, frames: &[Vec<f32>]) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for frame in frames {
                for &s in frame {
                    writer.write_sample(s).unwrap();
                }
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_decode_mono_wav() {
        let bytes = wav_bytes(1, 16_000, &[vec![0.5], vec![-0.5], vec![0.25]]);
        let wf = decode_bytes(&bytes).unwrap();
        assert_eq!(wf.sample_rate, 16_000);
        assert_eq!(wf.samples.len(), 3);
        assert!((wf.samples[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_decode_stereo_downmixes() {
        let bytes = wav_bytes(2, 44_100, &[vec![1.0, 0.0], vec![0.5, 0.5]]);
        let wf = decode_bytes(&bytes).unwrap();
        assert_eq!(wf.sample_rate, 44_100);
        assert_eq!(wf.samples.len(), 2);
        assert!((wf.samples[0] - 0.5).abs() < 1e-6);
        assert!((wf.samples[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let err = decode_bytes(b"definitely not audio").unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedContainer(_)));
    }

    #[test]
    fn test_decode_empty_fails() {
        assert!(decode_bytes(&[]).is_err());
    }

    #[test]
    fn test_decode_truncated_wav_fails() {
        let bytes = wav_bytes(1, 16_000, &vec![vec![0.5]; 64]);
        // Cut inside the header so probing cannot succeed
        let err = decode_bytes(&bytes[..8]).unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedContainer(_)));
    }
}
