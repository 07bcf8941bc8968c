//! OpenAI-compatible streaming chat completions over SSE.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;
use veil_core::errors::{ConfigError, GenerationError, VeilResult};
use veil_core::models::{CompletionRequest, ModelEvent};
use veil_core::traits::LanguageModel;

use crate::prompt::render_system_message;

/// Streaming chat client. One HTTP request per `stream` call; deadlines and
/// retries belong to the orchestrator.
pub struct HttpChatModel {
    client: Client,
    endpoint: String,
    model: String,
    name: String,
}

impl HttpChatModel {
    pub fn new(base_url: &str, model: &str, api_key: Option<&str>) -> VeilResult<Self> {
        if base_url.trim().is_empty() {
            return Err(invalid("model.endpoint", "must not be empty"));
        }
        if model.trim().is_empty() {
            return Err(invalid("model.name", "must not be empty"));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
        if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {}", key.trim()))
                .map_err(|_| invalid("model.api_key", "API key is not a valid header value"))?;
            headers.insert(AUTHORIZATION, value);
        }
        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| ConfigError::ResourceLoad {
                resource: "chat http client".to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.to_string(),
            name: format!("http:{model}"),
        })
    }
}

#[async_trait]
impl LanguageModel for HttpChatModel {
    async fn stream(
        &self,
        request: CompletionRequest,
        sink: mpsc::Sender<ModelEvent>,
    ) -> VeilResult<()> {
        let system = render_system_message(&request);
        let mut messages = Vec::with_capacity(request.history.len() + 2);
        messages.push(ChatMessage {
            role: "system",
            content: &system,
        });
        for m in &request.history {
            messages.push(ChatMessage {
                role: m.role.as_str(),
                content: &m.content,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.user_text,
        });
        let body = ChatRequest {
            model: &self.model,
            messages,
            stream: true,
            max_tokens: request.max_output_tokens,
            temperature: request.temperature,
        };

        let mut resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| unavailable(format!("request failed: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            debug!(event = "model_http_error", status = status.as_u16());
            return Err(status_error(status));
        }

        // Bytes until a full line is available; a chunk may end mid-character.
        let mut buffer: Vec<u8> = Vec::new();
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| unavailable(format!("stream interrupted: {e}")))?
        {
            buffer.extend_from_slice(&chunk);
            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let raw: Vec<u8> = buffer.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&raw);
                match parse_sse_line(line.trim_end_matches(|c: char| c == '\r' || c == '\n'))? {
                    SseLine::Token(token) => {
                        if sink.send(ModelEvent::Token(token)).await.is_err() {
                            return Ok(());
                        }
                    }
                    SseLine::Done => {
                        let _ = sink.send(ModelEvent::Done).await;
                        return Ok(());
                    }
                    SseLine::Skip => {}
                }
            }
        }
        // No `[DONE]`: the consumer sees the channel close without `Done`.
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// One parsed server-sent-events line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseLine {
    Token(String),
    Done,
    /// Blank lines, comments, non-data fields, role-only or empty deltas.
    Skip,
}

pub fn parse_sse_line(line: &str) -> VeilResult<SseLine> {
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(SseLine::Skip);
    };
    let data = data.trim();
    if data.is_empty() {
        return Ok(SseLine::Skip);
    }
    if data == "[DONE]" {
        return Ok(SseLine::Done);
    }

    let chunk: StreamChunk =
        serde_json::from_str(data).map_err(|e| GenerationError::StreamProtocol {
            reason: format!("malformed stream chunk: {e}"),
        })?;
    if let Some(error) = chunk.error {
        return Err(unavailable(format!("provider error: {error}")));
    }
    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
        .filter(|t| !t.is_empty())
        .map_or(SseLine::Skip, SseLine::Token))
}

fn status_error(status: StatusCode) -> veil_core::VeilError {
    if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
        return ConfigError::ResourceLoad {
            resource: "chat endpoint".to_string(),
            reason: format!("rejected with status {status}"),
        }
        .into();
    }
    unavailable(format!("status {status}"))
}

fn unavailable(reason: String) -> veil_core::VeilError {
    GenerationError::ModelUnavailable { reason }.into()
}

fn invalid(field: &str, reason: &str) -> veil_core::VeilError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_is_normalised() {
        let m = HttpChatModel::new("http://localhost:8080/v1/", "small", None).unwrap();
        assert_eq!(m.endpoint, "http://localhost:8080/v1/chat/completions");
        assert_eq!(m.name(), "http:small");
    }

    #[test]
    fn parses_token_lines() {
        let line = r#"data: {"choices":[{"index":0,"delta":{"content":"Hel"}}]}"#;
        assert_eq!(parse_sse_line(line).unwrap(), SseLine::Token("Hel".to_string()));
    }

    #[test]
    fn done_and_skips() {
        assert_eq!(parse_sse_line("data: [DONE]").unwrap(), SseLine::Done);
        assert_eq!(parse_sse_line("").unwrap(), SseLine::Skip);
        assert_eq!(parse_sse_line(": keep-alive").unwrap(), SseLine::Skip);
        assert_eq!(parse_sse_line("event: message").unwrap(), SseLine::Skip);
        let role_only = r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#;
        assert_eq!(parse_sse_line(role_only).unwrap(), SseLine::Skip);
        let finish = r#"data: {"choices":[{"delta":{},"finish_reason":"stop"}]}"#;
        assert_eq!(parse_sse_line(finish).unwrap(), SseLine::Skip);
    }

    #[test]
    fn malformed_chunk_is_a_protocol_error() {
        let err = parse_sse_line("data: {not json").unwrap_err();
        assert_eq!(err.kind(), "stream_protocol");
        assert!(!err.is_retryable());
    }

    #[test]
    fn provider_error_in_stream_is_retryable() {
        let err = parse_sse_line(r#"data: {"error":{"message":"overloaded"}}"#).unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn status_classification() {
        assert!(status_error(StatusCode::BAD_GATEWAY).is_retryable());
        assert!(status_error(StatusCode::TOO_MANY_REQUESTS).is_retryable());
        assert!(!status_error(StatusCode::FORBIDDEN).is_retryable());
    }
}
