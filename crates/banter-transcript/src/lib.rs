//! Client-side chat state for the Banter platform.
//!
//! Two cooperating pieces: the transcript reconciler, which folds the raw
//! stream of inbound data-channel events into a coherent conversation, and
//! the outbound send pipeline, which turns typed text into an optimistic
//! local entry plus an asynchronous publish.
//!
//! Rendering and the media transport itself live elsewhere; this crate only
//! owns the conversation state machine.

pub mod outbound;
pub mod reconciler;

pub use outbound::{DataPublisher, SendError, SendPipeline};
pub use reconciler::{InboundEvent, ReconcileOutcome, Transcript};
