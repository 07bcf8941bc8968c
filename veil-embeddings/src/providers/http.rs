//! OpenAI-compatible `/embeddings` client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;
use veil_core::config::EmbeddingConfig;
use veil_core::errors::{ConfigError, GenerationError, VeilResult};
use veil_core::traits::EmbeddingProvider;

/// Async embeddings client. Timeouts and retries are applied by the caller's
/// guard, so this client makes exactly one request per call.
pub struct HttpEmbeddingProvider {
    client: Client,
    endpoint: String,
    model: String,
    dimensions: usize,
    name: String,
}

impl HttpEmbeddingProvider {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: Option<&str>,
        dimensions: usize,
    ) -> VeilResult<Self> {
        if base_url.trim().is_empty() {
            return Err(invalid("embedding.endpoint", "must not be empty"));
        }
        if model.trim().is_empty() {
            return Err(invalid("embedding.model", "must not be empty"));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {}", key.trim()))
                .map_err(|_| invalid("embedding.api_key_env", "API key is not a valid header value"))?;
            headers.insert(AUTHORIZATION, value);
        }
        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| ConfigError::ResourceLoad {
                resource: "embedding http client".to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model: model.to_string(),
            dimensions,
            name: format!("http:{model}"),
        })
    }

    /// Build from config, reading the API key from `api_key_env` when set.
    pub fn from_config(config: &EmbeddingConfig, dimensions: usize) -> VeilResult<Self> {
        let endpoint = config
            .endpoint
            .as_deref()
            .ok_or_else(|| invalid("embedding.endpoint", "required for the http provider"))?;
        let model = config
            .model
            .as_deref()
            .ok_or_else(|| invalid("embedding.model", "required for the http provider"))?;
        let api_key = config
            .api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok());
        Self::new(endpoint, model, api_key.as_deref(), dimensions)
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed(&self, text: &str) -> VeilResult<Vec<f32>> {
        let body = EmbeddingRequest {
            model: &self.model,
            input: [text],
            dimensions: self.dimensions,
        };
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| unavailable(format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            debug!(event = "embedding_http_error", status = status.as_u16());
            return Err(status_error(status));
        }

        let mut parsed: EmbeddingResponse = resp
            .json()
            .await
            .map_err(|e| unavailable(format!("malformed response: {e}")))?;
        parsed.data.sort_by_key(|entry| entry.index);
        parsed
            .data
            .into_iter()
            .next()
            .map(|entry| entry.embedding)
            .ok_or_else(|| unavailable("response carried no embedding".to_string()))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn status_error(status: StatusCode) -> veil_core::VeilError {
    // Client errors are configuration problems and will not heal on retry.
    if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
        return ConfigError::ResourceLoad {
            resource: "embedding endpoint".to_string(),
            reason: format!("rejected with status {status}"),
        }
        .into();
    }
    unavailable(format!("status {status}"))
}

fn unavailable(reason: String) -> veil_core::VeilError {
    GenerationError::EmbeddingUnavailable { reason }.into()
}

fn invalid(field: &str, reason: &str) -> veil_core::VeilError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
    dimensions: usize,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingEntry>,
}

#[derive(Deserialize)]
struct EmbeddingEntry {
    index: usize,
    embedding: Vec<f32>,
}
