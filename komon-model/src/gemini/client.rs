//! Gemini client implementation.

use super::config::GeminiConfig;
use super::convert::{self, GenerateContentResponse};
use crate::retry::{RequestFailure, RetryConfig, parse_retry_after, retry_request};
use async_stream::try_stream;
use async_trait::async_trait;
use komon_core::{KomonError, Llm, LlmRequest, LlmResponseStream};
use reqwest::Client;
use reqwest::header::RETRY_AFTER;

/// Gemini model over the `generateContent` REST endpoint.
///
/// The endpoint is always called in non-streaming mode; the returned stream
/// yields a single complete response.
pub struct GeminiModel {
    client: Client,
    config: GeminiConfig,
    retry_config: RetryConfig,
}

impl GeminiModel {
    pub fn new(config: GeminiConfig) -> Result<Self, KomonError> {
        if config.api_key.is_empty() {
            return Err(KomonError::Config("Gemini API key is empty".to_string()));
        }
        let client = Client::builder()
            .build()
            .map_err(|e| KomonError::Model(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config, retry_config: RetryConfig::default() })
    }

    pub fn from_api_key(
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, KomonError> {
        Self::new(GeminiConfig::new(api_key, model))
    }

    #[must_use]
    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn api_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.effective_base_url().trim_end_matches('/'),
            self.config.model
        )
    }
}

/// Timeouts and connection failures are retried; other transport errors are not.
fn transport_failure(error: reqwest::Error) -> RequestFailure {
    let retryable = error.is_timeout() || error.is_connect();
    let error = KomonError::Model(format!("Gemini API request failed: {}", error));
    if retryable { RequestFailure::transient(error) } else { RequestFailure::permanent(error) }
}

#[async_trait]
impl Llm for GeminiModel {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn generate_content(
        &self,
        request: LlmRequest,
        _stream: bool,
    ) -> Result<LlmResponseStream, KomonError> {
        let api_url = self.api_url();
        let api_key = self.config.api_key.clone();
        let body = convert::build_request(
            &request,
            self.config.temperature,
            self.config.max_output_tokens,
        );
        let client = self.client.clone();
        let retry_config = self.retry_config.clone();
        let model = self.config.model.clone();

        let response_stream = try_stream! {
            tracing::debug!(model = %model, contents = body.contents.len(), "calling Gemini");

            let response_text = retry_request(&retry_config, || {
                let client = client.clone();
                let api_url = api_url.clone();
                let api_key = api_key.clone();
                let body = body.clone();
                async move {
                    let response = client
                        .post(&api_url)
                        .header("x-goog-api-key", api_key)
                        .json(&body)
                        .send()
                        .await
                        .map_err(transport_failure)?;

                    let status = response.status();
                    let retry_after = response
                        .headers()
                        .get(RETRY_AFTER)
                        .and_then(|value| value.to_str().ok())
                        .and_then(parse_retry_after);
                    let text = response.text().await.map_err(|e| {
                        RequestFailure::transient(KomonError::Model(format!(
                            "Failed to read response: {}",
                            e
                        )))
                    })?;

                    if !status.is_success() {
                        let error =
                            KomonError::Model(format!("Gemini API error ({}): {}", status, text));
                        return Err(RequestFailure::from_status(status.as_u16(), error)
                            .with_retry_after(retry_after));
                    }

                    Ok(text)
                }
            })
            .await?;

            let parsed: GenerateContentResponse = serde_json::from_str(&response_text)
                .map_err(|e| KomonError::Model(format!(
                    "Failed to parse response: {} - {}",
                    e, response_text
                )))?;

            yield convert::from_response(&parsed);
        };

        Ok(Box::pin(response_stream))
    }
}
