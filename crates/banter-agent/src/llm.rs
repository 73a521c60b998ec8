//! OpenAI-compatible chat completion client.
//!
//! Speaks the `/chat/completions` dialect so any compatible provider works.
//! Streaming uses server-sent events: `data:` lines carrying delta chunks,
//! closed by a `[DONE]` sentinel.

use crate::error::AgentError;
use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Buffered deltas between the SSE reader task and the consumer.
const STREAM_CHANNEL_CAPACITY: usize = 64;

/// One turn of model context.
#[derive(Debug, Clone, Serialize)]
pub struct PromptMessage {
    pub role: String,
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Chat model seam. Production wires [`OpenAiChatModel`]; tests wire a
/// scripted stub.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Requests a streamed completion. Text deltas arrive on the returned
    /// receiver in model order; an `Err` item ends the stream.
    async fn stream_chat(
        &self,
        messages: &[PromptMessage],
    ) -> Result<mpsc::Receiver<Result<String, AgentError>>, AgentError>;

    /// Requests a whole completion atomically.
    async fn complete_chat(&self, messages: &[PromptMessage]) -> Result<String, AgentError>;
}

/// Connection settings for an OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Base URL up to and including the version segment, e.g.
    /// `https://api.openai.com/v1`.
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: 512,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [PromptMessage],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

/// Production [`ChatModel`] over HTTP.
#[derive(Debug, Clone)]
pub struct OpenAiChatModel {
    config: OpenAiConfig,
    http: reqwest::Client,
}

impl OpenAiChatModel {
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    async fn post(
        &self,
        messages: &[PromptMessage],
        stream: bool,
    ) -> Result<reqwest::Response, AgentError> {
        let body = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            stream,
        };

        let response = self
            .http
            .post(self.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AgentError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn stream_chat(
        &self,
        messages: &[PromptMessage],
    ) -> Result<mpsc::Receiver<Result<String, AgentError>>, AgentError> {
        let response = self.post(messages, true).await?;
        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);

        tokio::spawn(async move {
            let mut body = response.bytes_stream();
            let mut pending = String::new();

            'outer: while let Some(chunk) = body.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        let _ = tx.send(Err(AgentError::Stream(e.to_string()))).await;
                        return;
                    }
                };
                pending.push_str(&String::from_utf8_lossy(&chunk));

                // SSE frames are newline-delimited; hold back the last
                // partial line until its terminator arrives.
                while let Some(newline) = pending.find('\n') {
                    let line = pending[..newline].trim().to_string();
                    pending.drain(..=newline);
                    match parse_sse_line(&line) {
                        SseLine::Delta(text) => {
                            if tx.send(Ok(text)).await.is_err() {
                                return;
                            }
                        }
                        SseLine::Done => break 'outer,
                        SseLine::Skip => {}
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn complete_chat(&self, messages: &[PromptMessage]) -> Result<String, AgentError> {
        let response = self.post(messages, false).await?;
        let parsed: ChatCompletionResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or(AgentError::EmptyCompletion)
    }
}

enum SseLine {
    Delta(String),
    Done,
    Skip,
}

fn parse_sse_line(line: &str) -> SseLine {
    let Some(payload) = line.strip_prefix("data:") else {
        return SseLine::Skip;
    };
    let payload = payload.trim();
    if payload == "[DONE]" {
        return SseLine::Done;
    }
    match serde_json::from_str::<StreamChunk>(payload) {
        Ok(chunk) => {
            let text = chunk
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.delta.content)
                .unwrap_or_default();
            if text.is_empty() {
                SseLine::Skip
            } else {
                SseLine::Delta(text)
            }
        }
        Err(e) => {
            tracing::debug!(error = %e, "skipping unparseable stream line");
            SseLine::Skip
        }
    }
}
