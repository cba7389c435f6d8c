//! Vocabulary index for caption decoding.
//!
//! Bidirectional mapping between caption tokens and the integer ids the
//! decoder model was trained on. Id `0` is reserved for padding.

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;

use crate::error::PipelineError;

/// Token ↔ id index, read-only after load.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    by_token: HashMap<String, u32>,
    by_id: HashMap<u32, String>,
    start_token: String,
    end_token: String,
    max_id: u32,
}

impl Vocabulary {
    /// Id used to right-pad sequences; never maps to a token.
    pub const PADDING_ID: u32 = 0;

    /// Load a vocabulary from a JSON file.
    ///
    /// Accepts either a bare `{"token": id, ...}` object or the JSON export of
    /// a Keras `Tokenizer`, whose `config.word_index` holds the same object
    /// encoded as a string.
    pub fn load(path: &Path, start_token: &str, end_token: &str) -> Result<Self, PipelineError> {
        let content = std::fs::read_to_string(path).map_err(|e| PipelineError::Model {
            message: format!("Failed to read vocabulary {:?}: {e}", path),
        })?;
        let root: Value = serde_json::from_str(&content).map_err(|e| PipelineError::Model {
            message: format!("Failed to parse vocabulary {:?}: {e}", path),
        })?;

        let word_index = match root.pointer("/config/word_index") {
            Some(Value::String(encoded)) => {
                serde_json::from_str::<HashMap<String, u32>>(encoded).map_err(|e| {
                    PipelineError::Model {
                        message: format!("Invalid word_index in {:?}: {e}", path),
                    }
                })?
            }
            Some(other) => serde_json::from_value::<HashMap<String, u32>>(other.clone())
                .map_err(|e| PipelineError::Model {
                    message: format!("Invalid word_index in {:?}: {e}", path),
                })?,
            None => serde_json::from_value::<HashMap<String, u32>>(root).map_err(|e| {
                PipelineError::Model {
                    message: format!("Vocabulary {:?} is not a token -> id object: {e}", path),
                }
            })?,
        };

        let vocabulary = Self::from_entries(word_index, start_token, end_token)?;
        tracing::info!(
            "Loaded vocabulary: {} tokens (max id {})",
            vocabulary.len(),
            vocabulary.max_id
        );
        Ok(vocabulary)
    }

    /// Build a vocabulary from `(token, id)` pairs.
    ///
    /// Fails when an id repeats, when a token uses the padding id, or when
    /// either boundary token is missing.
    pub fn from_entries<I, S>(
        entries: I,
        start_token: &str,
        end_token: &str,
    ) -> Result<Self, PipelineError>
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        let mut by_token = HashMap::new();
        let mut by_id = HashMap::new();
        let mut max_id = 0;

        for (token, id) in entries {
            let token = token.into();
            if id == Self::PADDING_ID {
                return Err(PipelineError::Model {
                    message: format!("Token {token:?} uses reserved padding id 0"),
                });
            }
            if let Some(existing) = by_id.insert(id, token.clone()) {
                return Err(PipelineError::Model {
                    message: format!("Tokens {existing:?} and {token:?} share id {id}"),
                });
            }
            max_id = max_id.max(id);
            by_token.insert(token, id);
        }

        for boundary in [start_token, end_token] {
            if !by_token.contains_key(boundary) {
                return Err(PipelineError::Model {
                    message: format!("Vocabulary is missing boundary token {boundary:?}"),
                });
            }
        }

        Ok(Self {
            by_token,
            by_id,
            start_token: start_token.to_string(),
            end_token: end_token.to_string(),
            max_id,
        })
    }

    /// Id for a token.
    pub fn id(&self, token: &str) -> Option<u32> {
        self.by_token.get(token).copied()
    }

    /// Token for an id.
    pub fn token(&self, id: u32) -> Option<&str> {
        self.by_id.get(&id).map(String::as_str)
    }

    /// Map tokens to ids, dropping tokens outside the vocabulary.
    pub fn encode<S: AsRef<str>>(&self, tokens: &[S]) -> Vec<u32> {
        tokens.iter().filter_map(|t| self.id(t.as_ref())).collect()
    }

    /// Token that opens every sequence.
    pub fn start_token(&self) -> &str {
        &self.start_token
    }

    /// Token that terminates decoding.
    pub fn end_token(&self) -> &str {
        &self.end_token
    }

    /// Number of tokens in the vocabulary.
    pub fn len(&self) -> usize {
        self.by_token.len()
    }

    /// Whether the vocabulary is empty.
    pub fn is_empty(&self) -> bool {
        self.by_token.is_empty()
    }
}
