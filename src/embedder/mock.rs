//! Deterministic embedding backend.
//!
//! Hashes the raw waveform bytes and seeds a deterministic generator from
//! the digest, so identical audio always yields an identical embedding and
//! different audio yields, with overwhelming probability, a different one.
//! No learned structure; exists so the rest of the pipeline is testable
//! without a model dependency.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

use crate::audio::Waveform;

use super::{Embedder, EmbedderError, Embedding};

/// Dimension of mock embeddings
pub const MOCK_EMBEDDING_DIM: usize = 1024;

/// Hash-seeded pseudo-random embedding backend
#[derive(Debug, Default, Clone, Copy)]
pub struct MockEmbedder;

impl MockEmbedder {
    pub fn new() -> Self {
        Self
    }
}

impl Embedder for MockEmbedder {
    fn extract(&self, waveform: &Waveform) -> Result<Embedding, EmbedderError> {
        let digest = Sha256::digest(waveform.sample_bytes());

        // Seed from the first 8 digest bytes, little-endian
        let mut seed_bytes = [0u8; 8];
        seed_bytes.copy_from_slice(&digest[..8]);
        let seed = u64::from_le_bytes(seed_bytes);

        let mut rng = StdRng::seed_from_u64(seed);
        let data: Vec<f32> = (0..MOCK_EMBEDDING_DIM).map(|_| rng.random()).collect();

        Ok(Embedding::new(data))
    }

    fn dimension(&self) -> usize {
        MOCK_EMBEDDING_DIM
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f32, sample_rate: u32, seconds: f32) -> Waveform {
        let n = (sample_rate as f32 * seconds) as usize;
        let samples = (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect();
        Waveform::new(samples, sample_rate)
    }

    #[test]
    fn test_deterministic_for_identical_audio() {
        let embedder = MockEmbedder::new();
        let wf = tone(440.0, 16_000, 0.5);

        let a = embedder.extract(&wf).unwrap();
        let b = embedder.extract(&wf).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_dimension() {
        let embedder = MockEmbedder::new();
        let wf = tone(440.0, 16_000, 0.1);
        let emb = embedder.extract(&wf).unwrap();
        assert_eq!(emb.len(), MOCK_EMBEDDING_DIM);
        assert_eq!(embedder.dimension(), MOCK_EMBEDDING_DIM);
    }

    #[test]
    fn test_different_audio_differs() {
        let embedder = MockEmbedder::new();
        let a = embedder.extract(&tone(440.0, 16_000, 0.5)).unwrap();
        let b = embedder.extract(&tone(880.0, 16_000, 0.5)).unwrap();

        assert_ne!(a, b);
        // Independent pseudo-random vectors are far from identical
        assert!(a.cosine_similarity(&b) < 0.99);
    }

    #[test]
    fn test_values_in_unit_interval() {
        let embedder = MockEmbedder::new();
        let emb = embedder.extract(&tone(440.0, 16_000, 0.1)).unwrap();
        assert!(emb.data().iter().all(|&v| (0.0..1.0).contains(&v)));
    }
}
