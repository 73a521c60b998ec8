//! Streaming response generation with retry and fallback.

use crate::error::AgentError;
use crate::history::{ConversationStore, HistoryRole};
use crate::llm::{ChatModel, PromptMessage};
use crate::segment::SentenceSplitter;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Default persona for the voice agent.
const DEFAULT_SYSTEM_PROMPT: &str = "You are a friendly voice assistant. \
Keep answers short and conversational; they will be spoken aloud.";

/// Spoken when generation cannot produce a real answer. The pick is
/// deterministic on the transcript so repeated failures do not jitter.
const FAILURE_LINES: &[&str] = &[
    "Sorry, I ran into a problem answering that. Could you try again?",
    "I didn't manage to put an answer together. Mind saying that again?",
    "Something went wrong on my end. Please try once more.",
];

/// Spoken when there is nothing to answer.
const EMPTY_TRANSCRIPT_LINES: &[&str] = &[
    "I didn't catch that. Could you say it again?",
    "Sorry, I missed that. One more time?",
];

/// Generation tuning.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub system_prompt: String,
    /// Total attempts before falling back, including the first.
    pub max_attempts: u32,
    /// Backoff between attempts is this delay times the attempt index.
    pub retry_base_delay: Duration,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_attempts: 3,
            retry_base_delay: Duration::from_millis(500),
        }
    }
}

/// Turns one finalized user transcript into a sentence-chunked reply.
///
/// Generation never propagates an error: every failure path ends in a
/// fallback line, so the caller always has something to speak.
pub struct ResponseGenerator {
    model: Arc<dyn ChatModel>,
    history: Arc<ConversationStore>,
    config: GeneratorConfig,
}

impl ResponseGenerator {
    pub fn new(
        model: Arc<dyn ChatModel>,
        history: Arc<ConversationStore>,
        config: GeneratorConfig,
    ) -> Self {
        Self {
            model,
            history,
            config,
        }
    }

    /// Shared history store, for session teardown.
    pub fn history(&self) -> Arc<ConversationStore> {
        Arc::clone(&self.history)
    }

    /// Generates a reply, invoking `on_sentence` once per detected sentence
    /// boundary, in order, before this future resolves. Each callback runs to
    /// completion before the next chunk is processed, preserving spoken
    /// order.
    pub async fn generate_streaming<F, Fut>(
        &self,
        transcript: &str,
        room: Option<&str>,
        mut on_sentence: F,
    ) -> String
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = ()>,
    {
        if transcript.trim().is_empty() {
            let line = pick(EMPTY_TRANSCRIPT_LINES, transcript);
            on_sentence(line.clone()).await;
            return line;
        }

        let messages = self.build_context(transcript, room);
        let mut attempt = 1u32;
        loop {
            match self.stream_once(&messages, &mut on_sentence).await {
                Ok(reply) => {
                    if let Some(room) = room {
                        self.record(room, transcript, &reply);
                    }
                    return reply;
                }
                Err(e) if e.is_retryable() && attempt < self.config.max_attempts => {
                    tracing::warn!(attempt, error = %e, "generation attempt failed, backing off");
                    tokio::time::sleep(self.config.retry_base_delay * attempt).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(error = %e, "generation failed, speaking fallback");
                    let line = pick(FAILURE_LINES, transcript);
                    on_sentence(line.clone()).await;
                    return line;
                }
            }
        }
    }

    /// Non-streaming variant with the same retry and fallback contract; the
    /// whole reply is returned atomically.
    pub async fn generate(&self, transcript: &str, room: Option<&str>) -> String {
        if transcript.trim().is_empty() {
            return pick(EMPTY_TRANSCRIPT_LINES, transcript);
        }

        let messages = self.build_context(transcript, room);
        let mut attempt = 1u32;
        loop {
            match self.model.complete_chat(&messages).await {
                Ok(reply) => {
                    if let Some(room) = room {
                        self.record(room, transcript, &reply);
                    }
                    return reply;
                }
                Err(e) if e.is_retryable() && attempt < self.config.max_attempts => {
                    tracing::warn!(attempt, error = %e, "completion attempt failed, backing off");
                    tokio::time::sleep(self.config.retry_base_delay * attempt).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(error = %e, "completion failed, returning fallback");
                    return pick(FAILURE_LINES, transcript);
                }
            }
        }
    }

    async fn stream_once<F, Fut>(
        &self,
        messages: &[PromptMessage],
        on_sentence: &mut F,
    ) -> Result<String, AgentError>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = ()>,
    {
        let mut deltas = self.model.stream_chat(messages).await?;
        let mut splitter = SentenceSplitter::new();
        let mut reply = String::new();

        while let Some(delta) = deltas.recv().await {
            let delta = delta?;
            reply.push_str(&delta);
            for sentence in splitter.push(&delta) {
                on_sentence(sentence).await;
            }
        }
        if let Some(rest) = splitter.finish() {
            on_sentence(rest).await;
        }
        Ok(reply)
    }

    fn build_context(&self, transcript: &str, room: Option<&str>) -> Vec<PromptMessage> {
        let mut messages = vec![PromptMessage::system(&self.config.system_prompt)];
        if let Some(room) = room {
            for turn in self.history.get(room) {
                messages.push(match turn.role {
                    HistoryRole::User => PromptMessage::user(turn.content),
                    HistoryRole::Assistant => PromptMessage::assistant(turn.content),
                });
            }
        }
        messages.push(PromptMessage::user(transcript));
        messages
    }

    fn record(&self, room: &str, transcript: &str, reply: &str) {
        self.history.append(room, HistoryRole::User, transcript);
        self.history.append(room, HistoryRole::Assistant, reply);
    }
}

fn pick(lines: &[&str], transcript: &str) -> String {
    lines[transcript.chars().count() % lines.len()].to_string()
}
