//! Sub-configuration structs with defaults matching the shipped model artifacts.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

/// Locations of the model artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Directory containing every model file below
    pub dir: PathBuf,

    /// VGG16 feature encoder (ONNX)
    pub feature_extractor: String,

    /// Trained caption decoder (ONNX)
    pub caption_decoder: String,

    /// Serialized vocabulary (JSON object `token -> id`)
    pub vocabulary: String,

    /// U²-Net background-removal model (ONNX)
    pub background_remover: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("models"),
            feature_extractor: "feature_extractor.onnx".to_string(),
            caption_decoder: "caption_decoder.onnx".to_string(),
            vocabulary: "vocabulary.json".to_string(),
            background_remover: "u2net.onnx".to_string(),
        }
    }
}

/// Caption decoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionConfig {
    /// Maximum number of decoding steps; also the padded sequence length
    /// the decoder model was trained with.
    pub max_length: usize,

    /// Square input size of the feature encoder
    pub image_size: u32,

    /// Token that opens every sequence
    pub start_token: String,

    /// Token that terminates decoding
    pub end_token: String,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            max_length: 18,
            image_size: 224,
            start_token: "startseq".to_string(),
            end_token: "endseq".to_string(),
        }
    }
}

/// Dominant-color extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    /// Number of k-means clusters per image
    pub cluster_count: usize,

    /// Independent k-means++ restarts; the lowest-inertia run wins
    pub n_init: usize,

    /// Lloyd iterations per restart
    pub max_iterations: usize,

    /// Convergence tolerance, relative to the mean per-channel variance
    pub tolerance: f64,

    /// RNG seed for k-means++ initialisation
    pub seed: u64,

    /// Cap on clustered pixels per image (0 disables subsampling)
    pub max_samples: usize,

    /// Square input size of the background-removal model
    pub mask_size: u32,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            cluster_count: 2,
            n_init: 10,
            max_iterations: 300,
            tolerance: 1e-4,
            seed: 42,
            max_samples: 200_000,
            mask_size: 320,
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum file size in megabytes
    pub max_file_size_mb: u64,

    /// Decode timeout in milliseconds
    pub decode_timeout_ms: u64,

    /// LLM call timeout in milliseconds
    pub llm_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 50,
            decode_timeout_ms: 5000,
            llm_timeout_ms: 60000,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Generative-language provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Gemini configuration
    pub gemini: GeminiConfig,

    /// Max retry attempts for transient failures
    pub retry_attempts: u32,

    /// Base backoff delay in milliseconds
    pub retry_delay_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            gemini: GeminiConfig::default(),
            retry_attempts: 2,
            retry_delay_ms: 1000,
        }
    }
}

/// Gemini configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// API base endpoint
    pub endpoint: String,

    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name
    pub model: String,

    /// Maximum output tokens; provider default when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,

    /// Sampling temperature; provider default when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key: "${API_KEY}".to_string(),
            model: "gemini-1.5-flash".to_string(),
            max_output_tokens: None,
            temperature: None,
        }
    }
}
