//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.caption.max_length == 0 {
            return Err(ConfigError::ValidationError(
                "caption.max_length must be > 0".into(),
            ));
        }
        if self.caption.image_size == 0 {
            return Err(ConfigError::ValidationError(
                "caption.image_size must be > 0".into(),
            ));
        }
        if self.caption.start_token.trim().is_empty() || self.caption.end_token.trim().is_empty()
        {
            return Err(ConfigError::ValidationError(
                "caption.start_token and caption.end_token must not be empty".into(),
            ));
        }
        if self.caption.start_token == self.caption.end_token {
            return Err(ConfigError::ValidationError(
                "caption.start_token and caption.end_token must differ".into(),
            ));
        }
        if self.color.cluster_count == 0 {
            return Err(ConfigError::ValidationError(
                "color.cluster_count must be > 0".into(),
            ));
        }
        if self.color.n_init == 0 {
            return Err(ConfigError::ValidationError(
                "color.n_init must be > 0".into(),
            ));
        }
        if self.color.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "color.max_iterations must be > 0".into(),
            ));
        }
        if self.color.tolerance.is_nan() || self.color.tolerance < 0.0 {
            return Err(ConfigError::ValidationError(
                "color.tolerance must be >= 0".into(),
            ));
        }
        if self.color.max_samples != 0 && self.color.max_samples < self.color.cluster_count {
            return Err(ConfigError::ValidationError(
                "color.max_samples must be 0 or >= color.cluster_count".into(),
            ));
        }
        if self.color.mask_size == 0 {
            return Err(ConfigError::ValidationError(
                "color.mask_size must be > 0".into(),
            ));
        }
        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_size_mb must be > 0".into(),
            ));
        }
        if self.limits.decode_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.decode_timeout_ms must be > 0".into(),
            ));
        }
        if self.limits.llm_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.llm_timeout_ms must be > 0".into(),
            ));
        }
        if self.llm.gemini.model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "llm.gemini.model must not be empty".into(),
            ));
        }
        Ok(())
    }
}
