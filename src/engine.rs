//! Recognition engine orchestration: the library surface the surrounding
//! service calls into.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::audio;
use crate::config::EngineConfig;
use crate::embedder::{self, Embedder};
use crate::error::Result;
use crate::index::{IndexEntry, LabeledExample, Prediction, RebuildSummary};
use crate::registry::ClassifierRegistry;

/// The audio recognition engine.
///
/// Holds the process-wide embedding backend and the per-user index registry.
/// All operations take `&self` and are safe to call from many requests
/// concurrently.
pub struct RecognitionEngine {
    embedder: Arc<dyn Embedder>,
    registry: ClassifierRegistry,
}

impl std::fmt::Debug for RecognitionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecognitionEngine")
            .field("backend", &self.embedder.name())
            .field("dimension", &self.embedder.dimension())
            .finish()
    }
}

impl RecognitionEngine {
    /// Construct the engine from startup configuration.
    ///
    /// Loads the learned model when configured, which is expensive; call
    /// once per process.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let embedder = embedder::from_config(config)?;
        info!(
            backend = embedder.name(),
            dimension = embedder.dimension(),
            "Recognition engine initialized"
        );

        Ok(Self::with_embedder(embedder))
    }

    /// Construct the engine around an already-built backend
    pub fn with_embedder(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            registry: ClassifierRegistry::new(),
        }
    }

    /// The active embedding backend
    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// The per-user index registry
    pub fn registry(&self) -> &ClassifierRegistry {
        &self.registry
    }

    /// Decode and embed one training clip.
    ///
    /// Returns the labeled example for the caller to persist; no index is
    /// touched. Rebuilding is a separate, explicit step once the caller has
    /// gathered the user's full current example set from storage.
    pub fn ingest_training_sample(
        &self,
        audio_bytes: &[u8],
        sound_id: Option<&str>,
        kind: &str,
    ) -> Result<LabeledExample> {
        let waveform = audio::decode_bytes(audio_bytes)?;
        let embedding = self.embedder.extract(&waveform)?;

        debug!(
            ?sound_id,
            kind,
            duration_s = waveform.duration_s(),
            "Training sample ingested"
        );

        Ok(LabeledExample {
            embedding,
            sound_id: sound_id.map(String::from),
            kind: kind.to_string(),
        })
    }

    /// Replace the user's index with one fitted over their complete current
    /// example set.
    ///
    /// `sounds` maps sound identifiers to display names; examples whose
    /// sound id is absent from the map keep a null display name.
    pub fn rebuild_index(
        &self,
        user_id: &str,
        examples: Vec<LabeledExample>,
        sounds: &HashMap<String, String>,
    ) -> Result<RebuildSummary> {
        let samples = examples.len();

        let entries: Vec<IndexEntry> = examples
            .into_iter()
            .map(|example| {
                let sound_name = example
                    .sound_id
                    .as_ref()
                    .and_then(|id| sounds.get(id).cloned());
                IndexEntry {
                    embedding: example.embedding,
                    sound_id: example.sound_id,
                    sound_name,
                }
            })
            .collect();

        self.registry.rebuild(user_id, entries)?;

        info!(user_id, samples, sounds = sounds.len(), "Index rebuilt");

        Ok(RebuildSummary {
            samples,
            sounds: sounds.len(),
        })
    }

    /// Classify a clip against the user's current index.
    ///
    /// An empty or never-built index yields the unknown prediction rather
    /// than an error; a new user with no catalog is a normal state.
    pub fn classify(&self, user_id: &str, audio_bytes: &[u8]) -> Result<Prediction> {
        let waveform = audio::decode_bytes(audio_bytes)?;
        let embedding = self.embedder.extract(&waveform)?;

        let prediction = self.registry.get_or_create(user_id).predict(&embedding)?;

        debug!(
            user_id,
            label = %prediction.label,
            confidence = prediction.confidence,
            "Clip classified"
        );

        Ok(prediction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::MockEmbedder;
    use crate::index::UNKNOWN_LABEL;
    use std::io::Cursor;

    fn engine() -> RecognitionEngine {
        RecognitionEngine::with_embedder(Arc::new(MockEmbedder::new()))
    }

    fn tone_wav(freq: f32, sample_rate: u32, seconds: f32) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            let n = (sample_rate as f32 * seconds) as usize;
            for i in 0..n {
                let t = i as f32 / sample_rate as f32;
                writer
                    .write_sample(0.5 * (2.0 * std::f32::consts::PI * freq * t).sin())
                    .unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_ingest_produces_labeled_example() {
        let engine = engine();
        let wav = tone_wav(440.0, 16_000, 0.5);

        let example = engine
            .ingest_training_sample(&wav, Some("s1"), "positive")
            .unwrap();

        assert_eq!(example.sound_id.as_deref(), Some("s1"));
        assert_eq!(example.kind, "positive");
        assert_eq!(example.embedding.len(), engine.embedder().dimension());
    }

    #[test]
    fn test_ingest_does_not_touch_registry() {
        let engine = engine();
        let wav = tone_wav(440.0, 16_000, 0.25);

        engine
            .ingest_training_sample(&wav, Some("s1"), "positive")
            .unwrap();

        assert_eq!(engine.registry().user_count(), 0);
    }

    #[test]
    fn test_classify_without_training_is_unknown() {
        let engine = engine();
        let wav = tone_wav(440.0, 16_000, 0.25);

        let p = engine.classify("new-user", &wav).unwrap();
        assert_eq!(p.label, UNKNOWN_LABEL);
        assert_eq!(p.confidence, 0.0);
    }

    #[test]
    fn test_rebuild_summary_counts() {
        let engine = engine();
        let wav = tone_wav(440.0, 16_000, 0.25);

        let example = engine
            .ingest_training_sample(&wav, Some("s1"), "positive")
            .unwrap();

        let sounds = HashMap::from([("s1".to_string(), "Doorbell".to_string())]);
        let summary = engine
            .rebuild_index("user-1", vec![example], &sounds)
            .unwrap();

        assert_eq!(summary, RebuildSummary { samples: 1, sounds: 1 });
    }

    #[test]
    fn test_decode_failure_is_client_error_and_mutates_nothing() {
        let engine = engine();

        let err = engine.classify("user-1", b"not audio").unwrap_err();
        assert!(err.is_client_error());

        let err = engine
            .ingest_training_sample(b"not audio", None, "negative")
            .unwrap_err();
        assert!(err.is_client_error());

        // Both calls failed before reaching the registry
        assert_eq!(engine.registry().user_count(), 0);
    }
}
