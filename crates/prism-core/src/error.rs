//! Error types for Prism.
//!
//! Errors are organized by concern so the HTTP layer can tell client input
//! problems (bad paths, unreadable images) apart from processing failures.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Prism operations.
#[derive(Error, Debug)]
pub enum PrismError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// The generative-language API key could not be resolved
    #[error("API key not set. Configure `{0}` in your environment or .env file.")]
    MissingApiKey(String),
}

/// Errors raised while serving a request or running a model.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The request carried no images
    #[error("The image list cannot be empty.")]
    EmptyImageList,

    /// Referenced path does not exist
    #[error("There is no file found at path: {0}")]
    FileNotFound(PathBuf),

    /// Path exists but does not hold a decodable image
    #[error("The file at path {0} is not a valid image.")]
    InvalidImage(PathBuf),

    /// File exceeds size limit
    #[error("File too large: {path} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        max_mb: u64,
    },

    /// Image decoding failed after validation
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Model artifact missing or failed to load
    #[error("Model error: {message}")]
    Model { message: String },

    /// Caption generation failed
    #[error("Caption error for {path}: {message}")]
    Caption { path: PathBuf, message: String },

    /// Color extraction failed for a single image
    #[error("Color extraction failed for {path}: {message}")]
    Color { path: PathBuf, message: String },

    /// Generative-language API call failed
    #[error("LLM error: {message}")]
    Llm {
        message: String,
        /// HTTP status code when the failure came from an HTTP response
        status_code: Option<u16>,
    },

    /// The LLM endpoint could not be reached (connect failure, DNS, or a
    /// transport-level timeout)
    #[error("LLM unreachable: {message}")]
    LlmUnreachable { message: String },

    /// Operation timed out
    #[error("Timeout in {stage} stage after {timeout_ms}ms")]
    Timeout { stage: String, timeout_ms: u64 },
}

impl PipelineError {
    /// Whether the error was caused by the caller's input rather than by
    /// processing. Client errors map to HTTP 400.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PipelineError::EmptyImageList
                | PipelineError::FileNotFound(_)
                | PipelineError::InvalidImage(_)
                | PipelineError::FileTooLarge { .. }
        )
    }
}

/// Convenience type alias for Prism results.
pub type Result<T> = std::result::Result<T, PrismError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
