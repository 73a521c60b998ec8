//! Voice-agent response pipeline for the Banter platform.
//!
//! Turns one finalized user transcript into an AI reply that is split at
//! sentence boundaries and handed out incrementally, so speech synthesis can
//! start before the model finishes. Generation never fails outward: errors
//! are retried with backoff and then absorbed into a deterministic fallback
//! line. Per-room conversation history gives the model its context.

pub mod error;
pub mod generator;
pub mod history;
pub mod llm;
pub mod segment;

pub use error::AgentError;
pub use generator::{GeneratorConfig, ResponseGenerator};
pub use history::{ConversationMessage, ConversationStore, HistoryRole, DEFAULT_HISTORY_CAP};
pub use llm::{ChatModel, OpenAiChatModel, OpenAiConfig, PromptMessage};
pub use segment::SentenceSplitter;
