//! Prism Core - product photo analysis library.
//!
//! Prism takes product photos and produces the pieces of a catalog listing:
//! the dominant product color of each photo, a generated product title, and
//! a generated description.
//!
//! # Architecture
//!
//! ```text
//!                   ┌→ Background mask → k-means → dominant colors
//! Validate → Decode ┤
//!                   └→ VGG16 features → greedy decode → caption → prompt → LLM
//! ```
//!
//! All models are loaded once by [`Prism::new`] and shared read-only.
//!
//! # Usage
//!
//! ```rust,ignore
//! use prism_core::{Config, Prism};
//!
//! #[tokio::main]
//! async fn main() -> prism_core::Result<()> {
//!     let prism = Prism::new(Config::load()?).await?;
//!     let paths = vec!["./wallet.jpg".to_string()];
//!     let name = prism.generate_product_name(&paths).await?;
//!     println!("{name}");
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod caption;
pub mod color;
pub mod config;
pub mod error;
pub mod llm;
pub(crate) mod onnx;
pub mod pipeline;
pub mod types;

// Re-exports for convenient access
pub use caption::CaptionEngine;
pub use color::ColorExtractor;
pub use config::Config;
pub use error::{ConfigError, PipelineError, PipelineResult, PrismError, Result};
pub use llm::{GeminiProvider, ListingWriter, LlmProvider, WriterOptions};
pub use pipeline::{ImageDecoder, Validator};
pub use types::{Caption, ColorOutcome, Palette, PaletteEntry, StopReason};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::future::join_all;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prism processor - the main entry point shared by the server and CLI.
pub struct Prism {
    validator: Validator,
    decoder: ImageDecoder,
    captioner: Arc<CaptionEngine>,
    colors: Arc<ColorExtractor>,
    writer: ListingWriter,
}

impl Prism {
    /// Create a Prism instance, loading every model up front.
    ///
    /// Fails when the API key is missing or any model file cannot be loaded.
    pub async fn new(config: Config) -> Result<Self> {
        tracing::debug!("Initializing Prism v{}", VERSION);

        let provider = GeminiProvider::from_config(&config.llm.gemini, &config.limits)?;

        let load_config = config.clone();
        let (captioner, colors) = tokio::task::spawn_blocking(move || {
            let captioner = CaptionEngine::load(&load_config)?;
            let colors = ColorExtractor::load(&load_config)?;
            Ok::<_, PipelineError>((captioner, colors))
        })
        .await
        .map_err(|e| PipelineError::Model {
            message: format!("Model loading task failed: {e}"),
        })??;

        Ok(Self::from_parts(config, captioner, colors, Arc::new(provider)))
    }

    /// Assemble a Prism instance from already-built parts.
    pub fn from_parts(
        config: Config,
        captioner: CaptionEngine,
        colors: ColorExtractor,
        provider: Arc<dyn LlmProvider>,
    ) -> Self {
        Self {
            validator: Validator::new(config.limits.clone()),
            decoder: ImageDecoder::new(config.limits.clone()),
            captioner: Arc::new(captioner),
            colors: Arc::new(colors),
            writer: ListingWriter::new(provider, WriterOptions::from_config(&config)),
        }
    }

    /// Check every path of a request before any model runs.
    pub fn validate_images(&self, paths: &[String]) -> PipelineResult<Vec<PathBuf>> {
        self.validator.validate_all(paths)
    }

    /// Extract the color palette of each image.
    ///
    /// The whole batch is validated first. After that, each image succeeds
    /// or fails on its own; the output has one entry per input, in order.
    pub async fn extract_colors(&self, paths: &[String]) -> PipelineResult<Vec<ColorOutcome>> {
        let paths = self.validate_images(paths)?;
        let outcomes = join_all(paths.into_iter().map(|path| self.color_outcome(path))).await;

        let failed = outcomes
            .iter()
            .filter(|o| matches!(o, ColorOutcome::Failed { .. }))
            .count();
        tracing::info!(
            "Extracted colors for {} images ({} failed)",
            outcomes.len(),
            failed
        );
        Ok(outcomes)
    }

    /// Caption a single, already-validated image.
    pub async fn caption(&self, path: &Path) -> PipelineResult<Caption> {
        pipeline::caption_image(&self.decoder, &self.captioner, path).await
    }

    /// Generate a product title from the caption of the first image.
    pub async fn generate_product_name(&self, paths: &[String]) -> PipelineResult<String> {
        let caption = self.first_caption(paths).await?;
        tracing::info!(
            "Generating product name with {} from caption {:?}",
            self.writer.provider_name(),
            caption.text
        );
        self.writer.product_name(&caption.text).await
    }

    /// Generate a product description from the caption of the first image,
    /// the product title and optional hex colors.
    pub async fn generate_description(
        &self,
        paths: &[String],
        product_name: &str,
        colors: Option<&[String]>,
    ) -> PipelineResult<String> {
        let caption = self.first_caption(paths).await?;
        tracing::info!(
            "Generating description with {} for {:?}",
            self.writer.provider_name(),
            product_name
        );
        self.writer
            .description(&caption.text, product_name, colors)
            .await
    }

    /// Validate all paths, then caption only the first.
    async fn first_caption(&self, paths: &[String]) -> PipelineResult<Caption> {
        let paths = self.validate_images(paths)?;
        let first = paths.first().ok_or(PipelineError::EmptyImageList)?;
        self.caption(first).await
    }

    async fn color_outcome(&self, path: PathBuf) -> ColorOutcome {
        pipeline::color_outcome(&self.decoder, &self.colors, path).await
    }
}
