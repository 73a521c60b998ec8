//! Client-side error taxonomy.

use crate::token::TokenError;
use banter_transcript::SendError;
use thiserror::Error;

/// Errors surfaced to the embedding application.
///
/// Connectivity and token failures block further connect actions until the
/// user retries; a microphone failure is reported distinctly because the
/// room connection itself may have succeeded; send failures are per-message
/// and recovered through the send pipeline's retry path.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("failed to connect to the room: {0}")]
    Connect(String),
    #[error("microphone unavailable: {0}")]
    Microphone(String),
    #[error(transparent)]
    Send(#[from] SendError),
}
