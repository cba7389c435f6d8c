//! Which LLM failures get another attempt, and how long to wait first.

use crate::error::PipelineError;
use std::time::Duration;

/// Longest wait between two attempts.
const MAX_BACKOFF_MS: u64 = 30_000;

/// Transient failures: our own timeout, an unreachable endpoint, HTTP 429
/// and HTTP 5xx. Everything else (bad key, bad request, unparsable reply)
/// would fail the same way again.
pub fn is_retryable(error: &PipelineError) -> bool {
    match error {
        PipelineError::Timeout { .. } | PipelineError::LlmUnreachable { .. } => true,
        PipelineError::Llm {
            status_code: Some(code),
            ..
        } => is_transient_status(*code),
        _ => false,
    }
}

fn is_transient_status(code: u16) -> bool {
    code == 429 || (500..600).contains(&code)
}

/// Delay before retry number `attempt` (zero-based): doubles from
/// `base_delay_ms` and stops growing at 30s.
pub fn backoff_duration(attempt: u32, base_delay_ms: u64) -> Duration {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    Duration::from_millis(base_delay_ms.saturating_mul(factor).min(MAX_BACKOFF_MS))
}
