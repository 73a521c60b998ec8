//! Shared data model for the Banter platform.
//!
//! Defines the chat-channel wire payload exchanged over the room data
//! channel and the client-side transcript entry model. Pure data; no I/O
//! lives in this crate.

pub mod entry;
pub mod wire;

pub use entry::{ChatEntry, ChatRole, Delivery, EntryStatus};
pub use wire::{WireMessage, WireRole, TOPIC_CHAT, TOPIC_STATUS};
