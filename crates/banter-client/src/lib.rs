//! Client session plumbing for the Banter platform.
//!
//! Owns what the conversational core needs from the client side of the
//! house: fetching a join token from the backend, the connect/disconnect
//! lifecycle with its single in-flight action guard, and routing raw
//! data-channel events into the transcript reconciler. Rendering and the
//! media transport implementation belong to the embedding application.

pub mod error;
pub mod session;
pub mod token;

pub use error::ClientError;
pub use session::{ChatSession, RoomTransport, SessionPhase};
pub use token::{TokenClient, TokenError, TokenGrant, TokenRequest};
