//! Image captioning.
//!
//! A VGG16 feature encoder turns the image into a feature vector, then a
//! trained sequence model is driven by a greedy decoder over a fixed
//! vocabulary until it emits the end token or hits `max_length`.
//!
//! ```rust,ignore
//! let engine = CaptionEngine::load(&config)?;
//! let caption = engine.caption(&image, path)?;
//! println!("{}", caption.text);
//! ```

pub(crate) mod decoder;
pub(crate) mod encoder;
pub(crate) mod predictor;
pub(crate) mod preprocess;
pub(crate) mod vocabulary;

pub use decoder::{argmax, DecodedSequence, GreedyDecoder, StepPredictor};
pub use encoder::{FeatureEncoder, VggFeatureEncoder};
pub use predictor::OnnxStepPredictor;
pub use vocabulary::Vocabulary;

use std::path::Path;

use image::DynamicImage;

use crate::config::Config;
use crate::error::PipelineError;
use crate::types::{Caption, StopReason};

/// Feature encoder, step predictor and vocabulary, loaded once and shared.
pub struct CaptionEngine {
    encoder: Box<dyn FeatureEncoder>,
    predictor: Box<dyn StepPredictor>,
    vocabulary: Vocabulary,
    max_length: usize,
}

impl CaptionEngine {
    /// Assemble an engine from already-loaded parts.
    pub fn new(
        encoder: Box<dyn FeatureEncoder>,
        predictor: Box<dyn StepPredictor>,
        vocabulary: Vocabulary,
        max_length: usize,
    ) -> Self {
        Self {
            encoder,
            predictor,
            vocabulary,
            max_length,
        }
    }

    /// Load the ONNX models and vocabulary named in the config.
    pub fn load(config: &Config) -> Result<Self, PipelineError> {
        let encoder_path = config.model_path(&config.models.feature_extractor);
        let decoder_path = config.model_path(&config.models.caption_decoder);
        let vocabulary_path = config.model_path(&config.models.vocabulary);

        tracing::info!("Loading caption models from {:?}", config.model_dir());
        let encoder = VggFeatureEncoder::load(&encoder_path, config.caption.image_size)?;
        let predictor = OnnxStepPredictor::load(&decoder_path)?;
        let vocabulary = Vocabulary::load(
            &vocabulary_path,
            &config.caption.start_token,
            &config.caption.end_token,
        )?;
        tracing::info!("Caption models loaded");

        Ok(Self::new(
            Box::new(encoder),
            Box::new(predictor),
            vocabulary,
            config.caption.max_length,
        ))
    }

    /// Caption one decoded image.
    ///
    /// Feature extraction must succeed before any decoding happens; a failed
    /// encoder is reported as an error rather than decoded.
    pub fn caption(&self, image: &DynamicImage, path: &Path) -> Result<Caption, PipelineError> {
        let start = std::time::Instant::now();
        let features = self.encoder.encode(image, path)?;
        tracing::trace!("  Features: {} values in {:?}", features.len(), start.elapsed());

        let decoded = GreedyDecoder::new(&self.vocabulary, self.max_length).decode(
            self.predictor.as_ref(),
            &features,
            path,
        )?;

        if let StopReason::UnmappedId(id) = decoded.stop {
            tracing::warn!(
                "Caption for {:?} stopped early: predicted id {id} has no token",
                path
            );
        }

        let caption = Caption::from_tokens(
            decoded.tokens,
            decoded.stop,
            self.vocabulary.start_token(),
            self.vocabulary.end_token(),
        );
        tracing::debug!(
            "Captioned {:?} in {:?}: {:?}",
            path,
            start.elapsed(),
            caption.text
        );
        Ok(caption)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    struct FixedEncoder(Option<Vec<f32>>);

    impl FeatureEncoder for FixedEncoder {
        fn encode(&self, _: &DynamicImage, path: &Path) -> Result<Vec<f32>, PipelineError> {
            self.0.clone().ok_or_else(|| PipelineError::Caption {
                path: path.to_path_buf(),
                message: "encoder failed".into(),
            })
        }
    }

    /// Predicts "blue", "mug", then the end token, based on sequence fill.
    struct MugPredictor;

    impl StepPredictor for MugPredictor {
        fn predict(&self, _: &[f32], sequence: &[u32]) -> Result<Vec<f32>, PipelineError> {
            let filled = sequence.iter().filter(|&&id| id != 0).count();
            let next = match filled {
                1 => 3,
                2 => 4,
                _ => 2,
            };
            let mut dist = vec![0.01; 5];
            dist[next] = 0.9;
            Ok(dist)
        }
    }

    /// Fails the test if the decoder is ever reached.
    struct UnreachablePredictor;

    impl StepPredictor for UnreachablePredictor {
        fn predict(&self, _: &[f32], _: &[u32]) -> Result<Vec<f32>, PipelineError> {
            panic!("decoder must not run without features");
        }
    }

    fn vocab() -> Vocabulary {
        Vocabulary::from_entries(
            [("startseq", 1), ("endseq", 2), ("blue", 3), ("mug", 4)],
            "startseq",
            "endseq",
        )
        .unwrap()
    }

    fn image() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::new(8, 8))
    }

    #[test]
    fn test_caption_end_to_end_with_stubs() {
        let engine = CaptionEngine::new(
            Box::new(FixedEncoder(Some(vec![0.3; 16]))),
            Box::new(MugPredictor),
            vocab(),
            18,
        );
        let caption = engine.caption(&image(), Path::new("mug.jpg")).unwrap();
        assert_eq!(caption.text, "blue mug");
        assert_eq!(caption.tokens, ["startseq", "blue", "mug", "endseq"]);
        assert_eq!(caption.stop, StopReason::EndToken);
    }

    #[test]
    fn test_encoder_failure_skips_decoding() {
        let engine = CaptionEngine::new(
            Box::new(FixedEncoder(None)),
            Box::new(UnreachablePredictor),
            vocab(),
            18,
        );
        let err = engine.caption(&image(), Path::new("broken.jpg")).unwrap_err();
        assert!(err.to_string().contains("encoder failed"));
    }

    #[test]
    fn test_load_reports_missing_models() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.models.dir = dir.path().to_path_buf();

        let err = CaptionEngine::load(&config).err().unwrap();
        assert!(matches!(err, PipelineError::Model { .. }));
    }
}
