//! The `prism caption` and `prism colors` commands.
//!
//! These run the local models only, so they work without an API key.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use prism_core::pipeline::{caption_image, color_outcome};
use prism_core::{CaptionEngine, ColorExtractor, ColorOutcome, Config, ImageDecoder, Validator};

/// Arguments for the `caption` command.
#[derive(Args, Debug)]
pub struct CaptionArgs {
    /// Image to caption
    pub image: PathBuf,
}

/// Arguments for the `colors` command.
#[derive(Args, Debug)]
pub struct ColorsArgs {
    /// Images to analyze
    #[arg(required = true)]
    pub images: Vec<PathBuf>,
}

/// Print the caption text and why decoding stopped.
pub async fn caption(args: CaptionArgs, config: Config) -> anyhow::Result<()> {
    Validator::new(config.limits.clone()).validate(&args.image)?;
    let engine = Arc::new(CaptionEngine::load(&config)?);

    let decoder = ImageDecoder::new(config.limits.clone());
    let caption = caption_image(&decoder, &engine, &args.image).await?;

    println!("{}", caption.text);
    println!("stop: {}", serde_json::to_string(&caption.stop)?);
    Ok(())
}

/// Print one JSON line per image with its palette or failure reason.
pub async fn colors(args: ColorsArgs, config: Config) -> anyhow::Result<()> {
    let validator = Validator::new(config.limits.clone());
    for path in &args.images {
        validator.validate(path)?;
    }

    let extractor = Arc::new(ColorExtractor::load(&config)?);
    let decoder = ImageDecoder::new(config.limits.clone());

    let mut failed = 0usize;
    for path in args.images {
        let outcome = color_outcome(&decoder, &extractor, path).await;
        if matches!(outcome, ColorOutcome::Failed { .. }) {
            failed += 1;
        }
        println!("{}", serde_json::to_string(&outcome)?);
    }

    if failed > 0 {
        tracing::info!("{failed} image(s) had no extractable color");
    }
    Ok(())
}
