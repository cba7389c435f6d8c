//! Input validation before any model runs.

use std::path::{Path, PathBuf};

use crate::config::LimitsConfig;
use crate::error::PipelineError;

/// Validates request image paths.
pub struct Validator {
    limits: LimitsConfig,
}

impl Validator {
    /// Create a new validator with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Validate every path of a request, failing on the first bad one.
    ///
    /// An empty list is itself an error.
    pub fn validate_all<S: AsRef<str>>(&self, paths: &[S]) -> Result<Vec<PathBuf>, PipelineError> {
        if paths.is_empty() {
            return Err(PipelineError::EmptyImageList);
        }
        paths
            .iter()
            .map(|p| {
                let path = PathBuf::from(p.as_ref());
                self.validate(&path)?;
                Ok(path)
            })
            .collect()
    }

    /// Validate a single path.
    ///
    /// Checks, in order:
    /// - the path exists
    /// - the file size is within limits
    /// - the header decodes to a supported format and dimensions
    pub fn validate(&self, path: &Path) -> Result<(), PipelineError> {
        if !path.exists() {
            return Err(PipelineError::FileNotFound(path.to_path_buf()));
        }

        let invalid = || PipelineError::InvalidImage(path.to_path_buf());

        let metadata = std::fs::metadata(path).map_err(|_| invalid())?;
        if !metadata.is_file() {
            return Err(invalid());
        }

        let max_bytes = self.limits.max_file_size_mb.saturating_mul(1024 * 1024);
        if metadata.len() > max_bytes {
            return Err(PipelineError::FileTooLarge {
                path: path.to_path_buf(),
                size_mb: metadata.len() / (1024 * 1024),
                max_mb: self.limits.max_file_size_mb,
            });
        }

        self.check_header(path)?;

        Ok(())
    }

    /// Decode just the header: the format must be supported and the
    /// dimensions readable.
    fn check_header(&self, path: &Path) -> Result<(), PipelineError> {
        let dimensions = image::ImageReader::open(path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|e| e.to_string())
            .and_then(|reader| reader.into_dimensions().map_err(|e| e.to_string()));

        match dimensions {
            Ok((width, height)) if width > 0 && height > 0 => Ok(()),
            Ok(_) => Err(PipelineError::InvalidImage(path.to_path_buf())),
            Err(e) => {
                tracing::debug!("Header decode failed for {:?}: {e}", path);
                Err(PipelineError::InvalidImage(path.to_path_buf()))
            }
        }
    }
}
