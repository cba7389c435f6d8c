//! Greedy caption decoding.
//!
//! Turns an image feature vector into a token sequence by repeatedly asking
//! the step predictor for the next-token distribution and taking its arg-max.
//! The loop is an explicit state machine bounded by `max_length`: the state
//! is the accumulated sequence, one transition is one predictor call.

use std::path::Path;

use crate::error::PipelineError;
use crate::types::StopReason;

use super::vocabulary::Vocabulary;

/// Predicts the next-token distribution for a partial sequence.
///
/// `sequence` is always right-padded to the decoder's `max_length` with
/// [`Vocabulary::PADDING_ID`]. The returned vector is indexed by token id.
pub trait StepPredictor: Send + Sync {
    fn predict(&self, features: &[f32], sequence: &[u32]) -> Result<Vec<f32>, PipelineError>;
}

/// Output of a decoding run: the full sequence including the start token
/// and, if reached, the end token.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSequence {
    pub tokens: Vec<String>,
    pub stop: StopReason,
}

/// Decoder state between predictor calls.
struct DecodeState {
    tokens: Vec<String>,
    ids: Vec<u32>,
}

/// What a single transition produced.
enum Transition {
    Continue,
    Stop(StopReason),
}

impl DecodeState {
    fn new(vocabulary: &Vocabulary) -> Self {
        let start = vocabulary.start_token().to_string();
        let ids = vocabulary.encode(std::slice::from_ref(&start));
        Self {
            tokens: vec![start],
            ids,
        }
    }

    /// Current ids right-padded to `len`.
    fn padded_ids(&self, len: usize) -> Vec<u32> {
        let mut padded = self.ids.clone();
        padded.truncate(len);
        padded.resize(len, Vocabulary::PADDING_ID);
        padded
    }

    fn advance(&mut self, vocabulary: &Vocabulary, id: u32) -> Transition {
        let Some(token) = vocabulary.token(id) else {
            return Transition::Stop(StopReason::UnmappedId(id));
        };
        let is_end = token == vocabulary.end_token();
        self.tokens.push(token.to_string());
        self.ids.push(id);
        if is_end {
            Transition::Stop(StopReason::EndToken)
        } else {
            Transition::Continue
        }
    }
}

/// Greedy (arg-max) decoder over a fixed vocabulary.
pub struct GreedyDecoder<'a> {
    vocabulary: &'a Vocabulary,
    max_length: usize,
}

impl<'a> GreedyDecoder<'a> {
    pub fn new(vocabulary: &'a Vocabulary, max_length: usize) -> Self {
        Self {
            vocabulary,
            max_length,
        }
    }

    /// Decode a caption for one feature vector.
    ///
    /// Runs at most `max_length` predictor calls, so the result holds at most
    /// `max_length + 1` tokens. Deterministic for a deterministic predictor.
    pub fn decode(
        &self,
        predictor: &dyn StepPredictor,
        features: &[f32],
        path: &Path,
    ) -> Result<DecodedSequence, PipelineError> {
        let mut state = DecodeState::new(self.vocabulary);

        for step in 0..self.max_length {
            let padded = state.padded_ids(self.max_length);
            let distribution = predictor.predict(features, &padded).map_err(|e| {
                PipelineError::Caption {
                    path: path.to_path_buf(),
                    message: format!("Prediction failed at step {step}: {}", detail(e)),
                }
            })?;

            let id = argmax(&distribution).ok_or_else(|| PipelineError::Caption {
                path: path.to_path_buf(),
                message: format!(
                    "Malformed prediction at step {step}: {} values, empty or non-finite",
                    distribution.len()
                ),
            })?;

            if let Transition::Stop(stop) = state.advance(self.vocabulary, id as u32) {
                return Ok(DecodedSequence {
                    tokens: state.tokens,
                    stop,
                });
            }
        }

        Ok(DecodedSequence {
            tokens: state.tokens,
            stop: StopReason::MaxLength,
        })
    }
}

fn detail(error: PipelineError) -> String {
    match error {
        PipelineError::Model { message } | PipelineError::Caption { message, .. } => message,
        other => other.to_string(),
    }
}

/// Index of the largest value; the lowest index wins ties.
///
/// Returns `None` for an empty slice or one containing NaN/infinite values.
pub fn argmax(values: &[f32]) -> Option<usize> {
    if values.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}
