//! Core data types produced by Prism.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Why caption decoding stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "id", rename_all = "snake_case")]
pub enum StopReason {
    /// The end token was generated
    EndToken,
    /// `max_length` steps ran without an end token
    MaxLength,
    /// The predictor chose an id with no token; the sequence is partial
    UnmappedId(u32),
}

/// A generated image caption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Caption {
    /// Display text: the decoded tokens without the start/end tokens
    pub text: String,

    /// Full decoded sequence, including boundary tokens
    pub tokens: Vec<String>,

    /// Why decoding stopped
    pub stop: StopReason,
}

impl Caption {
    /// Build a caption from a decoded sequence, stripping boundary tokens
    /// from the display text.
    pub fn from_tokens(
        tokens: Vec<String>,
        stop: StopReason,
        start_token: &str,
        end_token: &str,
    ) -> Self {
        let text = tokens
            .iter()
            .filter(|t| t.as_str() != start_token && t.as_str() != end_token)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ");
        Self { text, tokens, stop }
    }
}

/// One k-means cluster of product pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaletteEntry {
    /// `#rrggbb` rendering of the centroid
    pub hex: String,

    /// Centroid truncated to integer channels
    pub rgb: [u8; 3],

    /// Share of clustered pixels assigned to this centroid (0.0..=1.0)
    pub frequency: f32,
}

/// Cluster centroids of one image, most frequent first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    pub entries: Vec<PaletteEntry>,

    /// Number of pixels that were clustered
    pub pixel_count: usize,
}

impl Palette {
    /// The most frequent cluster's color.
    pub fn dominant(&self) -> Option<&PaletteEntry> {
        self.entries.first()
    }
}

/// Per-image result of color extraction. Failures are kept per image so
/// one bad image never fails the batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ColorOutcome {
    Extracted { path: PathBuf, palette: Palette },
    Failed { path: PathBuf, reason: String },
}

impl ColorOutcome {
    /// Dominant hex color, or `None` when extraction failed.
    pub fn dominant_hex(&self) -> Option<&str> {
        match self {
            ColorOutcome::Extracted { palette, .. } => palette.dominant().map(|e| e.hex.as_str()),
            ColorOutcome::Failed { .. } => None,
        }
    }
}
