//! Product copy generation: prompt building plus a retrying LLM call.

use super::prompt;
use super::provider::{LlmProvider, LlmRequest, LlmResponse};
use super::retry;
use crate::config::Config;
use crate::error::PipelineError;
use std::sync::Arc;
use std::time::Duration;

/// Retry and timeout settings for LLM calls.
#[derive(Debug, Clone)]
pub struct WriterOptions {
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    /// Maximum retries after the first attempt
    pub retry_attempts: u32,
    /// Base backoff delay in milliseconds
    pub retry_delay_ms: u64,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 60_000,
            retry_attempts: 2,
            retry_delay_ms: 1000,
        }
    }
}

impl WriterOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout_ms: config.limits.llm_timeout_ms,
            retry_attempts: config.llm.retry_attempts,
            retry_delay_ms: config.llm.retry_delay_ms,
        }
    }
}

/// Writes product titles and descriptions from image captions.
pub struct ListingWriter {
    provider: Arc<dyn LlmProvider>,
    options: WriterOptions,
}

impl ListingWriter {
    pub fn new(provider: Arc<dyn LlmProvider>, options: WriterOptions) -> Self {
        Self { provider, options }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Generate a product title for a caption. The model text is returned
    /// as-is.
    pub async fn product_name(&self, caption: &str) -> Result<String, PipelineError> {
        let request = LlmRequest::new(prompt::product_name_prompt(caption));
        Ok(self.generate(&request).await?.text)
    }

    /// Generate a product description for a caption and title.
    pub async fn description(
        &self,
        caption: &str,
        product_name: &str,
        colors: Option<&[String]>,
    ) -> Result<String, PipelineError> {
        let request = LlmRequest::new(prompt::description_prompt(caption, product_name, colors));
        Ok(self.generate(&request).await?.text)
    }

    /// Call the provider, retrying transient failures with backoff.
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, PipelineError> {
        let timeout_ms = self.options.timeout_ms;
        let mut last_error = None;

        for attempt in 0..=self.options.retry_attempts {
            if attempt > 0 {
                let delay = retry::backoff_duration(attempt - 1, self.options.retry_delay_ms);
                tracing::debug!(
                    "Retry {attempt}/{} for {} after {delay:?}",
                    self.options.retry_attempts,
                    self.provider.name()
                );
                tokio::time::sleep(delay).await;
            }

            let error = match tokio::time::timeout(
                Duration::from_millis(timeout_ms),
                self.provider.generate(request),
            )
            .await
            {
                Ok(Ok(response)) => {
                    tracing::debug!(
                        "{} answered in {}ms (model {}, tokens {:?})",
                        self.provider.name(),
                        response.latency_ms,
                        response.model,
                        response.tokens_used
                    );
                    return Ok(response);
                }
                Ok(Err(e)) => e,
                Err(_) => PipelineError::Timeout {
                    stage: "llm".to_string(),
                    timeout_ms,
                },
            };

            tracing::warn!("{} call failed: {error}", self.provider.name());
            let retryable = retry::is_retryable(&error);
            last_error = Some(error);
            if !retryable {
                break;
            }
        }

        Err(last_error.unwrap_or_else(|| PipelineError::Llm {
            message: "no attempt was made".to_string(),
            status_code: None,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Returns a scripted result per call index and records prompts.
    struct MockProvider {
        response_fn: Box<dyn Fn(u32) -> Result<LlmResponse, PipelineError> + Send + Sync>,
        call_count: Arc<AtomicU32>,
        prompts: Arc<Mutex<Vec<String>>>,
        delay: Option<Duration>,
    }

    impl MockProvider {
        fn new(
            response_fn: impl Fn(u32) -> Result<LlmResponse, PipelineError> + Send + Sync + 'static,
        ) -> Self {
            Self {
                response_fn: Box::new(response_fn),
                call_count: Arc::new(AtomicU32::new(0)),
                prompts: Arc::new(Mutex::new(Vec::new())),
                delay: None,
            }
        }
    }

    #[async_trait]
    impl LlmProvider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, PipelineError> {
            let index = self.call_count.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(request.prompt.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            (self.response_fn)(index)
        }

        fn timeout(&self) -> Duration {
            Duration::from_secs(60)
        }
    }

    fn ok(text: &str) -> Result<LlmResponse, PipelineError> {
        Ok(LlmResponse {
            text: text.to_string(),
            model: "mock-model".to_string(),
            tokens_used: Some(42),
            latency_ms: 5,
        })
    }

    fn http_error(code: u16) -> Result<LlmResponse, PipelineError> {
        Err(PipelineError::Llm {
            message: format!("HTTP {code}"),
            status_code: Some(code),
        })
    }

    fn fast_options() -> WriterOptions {
        WriterOptions {
            timeout_ms: 1000,
            retry_attempts: 2,
            retry_delay_ms: 1,
        }
    }

    #[tokio::test]
    async fn test_product_name_returns_raw_text() {
        let provider = MockProvider::new(|_| ok("  [your brand name] Leather Wallet\n"));
        let prompts = provider.prompts.clone();
        let writer = ListingWriter::new(Arc::new(provider), fast_options());

        let name = writer.product_name("brown leather wallet").await.unwrap();
        assert_eq!(name, "  [your brand name] Leather Wallet\n");
        assert!(prompts.lock().unwrap()[0].contains("brown leather wallet"));
    }

    #[tokio::test]
    async fn test_description_prompt_reaches_provider() {
        let provider = MockProvider::new(|_| ok("About this item"));
        let prompts = provider.prompts.clone();
        let writer = ListingWriter::new(Arc::new(provider), fast_options());

        let colors = vec!["#112233".to_string()];
        writer
            .description("blue sneaker", "Runner", Some(&colors))
            .await
            .unwrap();
        let prompt = prompts.lock().unwrap()[0].clone();
        assert!(prompt.contains("Product Title: Runner"));
        assert!(prompt.contains("<strong>#112233</strong>"));
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let provider = MockProvider::new(|i| if i == 0 { http_error(503) } else { ok("Title") });
        let calls = provider.call_count.clone();
        let writer = ListingWriter::new(Arc::new(provider), fast_options());

        assert_eq!(writer.product_name("x").await.unwrap(), "Title");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_retried() {
        let provider = MockProvider::new(|i| {
            if i < 2 {
                Err(PipelineError::LlmUnreachable {
                    message: "error sending request for url (http://127.0.0.1:1/)".to_string(),
                })
            } else {
                ok("Title")
            }
        });
        let calls = provider.call_count.clone();
        let writer = ListingWriter::new(Arc::new(provider), fast_options());

        assert_eq!(writer.product_name("x").await.unwrap(), "Title");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_auth_failure_not_retried() {
        let provider = MockProvider::new(|_| http_error(401));
        let calls = provider.call_count.clone();
        let writer = ListingWriter::new(Arc::new(provider), fast_options());

        let err = writer.product_name("x").await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Llm {
                status_code: Some(401),
                ..
            }
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_retry_budget() {
        let provider = MockProvider::new(|_| http_error(429));
        let calls = provider.call_count.clone();
        let writer = ListingWriter::new(Arc::new(provider), fast_options());

        assert!(writer.product_name("x").await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let mut provider = MockProvider::new(|_| ok("late"));
        provider.delay = Some(Duration::from_millis(200));
        let options = WriterOptions {
            timeout_ms: 20,
            retry_attempts: 0,
            retry_delay_ms: 1,
        };
        let writer = ListingWriter::new(Arc::new(provider), options);

        let err = writer.product_name("x").await.unwrap_err();
        assert!(matches!(err, PipelineError::Timeout { .. }));
    }
}
