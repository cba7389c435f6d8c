//! Image decoding off the async runtime, bounded by a timeout.

use image::DynamicImage;
use std::path::Path;
use std::time::Duration;
use tokio::time::timeout;

use crate::config::LimitsConfig;
use crate::error::PipelineError;

/// Image decoder with a configurable timeout.
pub struct ImageDecoder {
    limits: LimitsConfig,
}

impl ImageDecoder {
    /// Create a new decoder with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Decode an image file on the blocking pool.
    pub async fn decode(&self, path: &Path) -> Result<DynamicImage, PipelineError> {
        let path_owned = path.to_path_buf();
        let timeout_duration = Duration::from_millis(self.limits.decode_timeout_ms);

        let decode_result = timeout(timeout_duration, async {
            tokio::task::spawn_blocking(move || Self::decode_sync(&path_owned)).await
        })
        .await;

        match decode_result {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(PipelineError::Decode {
                path: path.to_path_buf(),
                message: format!("Task join error: {}", e),
            }),
            Err(_) => Err(PipelineError::Timeout {
                stage: "decode".to_string(),
                timeout_ms: self.limits.decode_timeout_ms,
            }),
        }
    }

    /// Synchronous decode with content-based format detection.
    pub fn decode_sync(path: &Path) -> Result<DynamicImage, PipelineError> {
        let decode_error = |message: String| PipelineError::Decode {
            path: path.to_path_buf(),
            message,
        };

        let reader = image::ImageReader::open(path)
            .map_err(|e| decode_error(format!("Cannot open file: {}", e)))?
            .with_guessed_format()
            .map_err(|e| decode_error(format!("Cannot detect image format: {}", e)))?;

        reader.decode().map_err(|e| decode_error(e.to_string()))
    }
}
