//! LiveKit integration for the Banter platform.
//!
//! Humans join rooms over WebRTC through the browser SDK; the agent joins
//! as a server-side participant. This crate mints join tokens, manages
//! rooms through the LiveKit server API, and carries the agent's seat in a
//! room: outbound chat frames on the data channel and finalized speech
//! transcripts coming back from the platform's transcription.

pub mod agent;
pub mod config;
pub mod error;
pub mod service;

pub use agent::{AgentRoomClient, DataFrame, FinalTranscript};
pub use config::LiveKitConfig;
pub use error::VoiceError;
pub use service::RoomService;
