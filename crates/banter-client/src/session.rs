//! Client session lifecycle.
//!
//! A [`ChatSession`] ties the token exchange, the room transport, and the
//! chat state together. Connect and disconnect share a single in-flight
//! guard: while one action is pending, further requests are ignored. The
//! guard is explicit session state rather than a process-wide flag, so
//! independent sessions can coexist.

use crate::error::ClientError;
use crate::token::{TokenClient, TokenRequest};
use async_trait::async_trait;
use banter_transcript::{DataPublisher, InboundEvent, ReconcileOutcome, SendPipeline, Transcript};
use banter_types::{ChatEntry, Delivery, WireMessage};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Connection phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

/// The media transport as the session sees it. Implemented by the embedding
/// application over the platform SDK; publishing is inherited from
/// [`DataPublisher`].
#[async_trait]
pub trait RoomTransport: DataPublisher {
    async fn connect(&self, url: &str, token: &str) -> Result<(), ClientError>;

    async fn disconnect(&self) -> Result<(), ClientError>;

    /// Enables the local microphone. May fail independently of the room
    /// connection.
    async fn enable_microphone(&self) -> Result<(), ClientError>;
}

/// One user's chat session against one room.
pub struct ChatSession<T> {
    token_client: TokenClient,
    transport: Arc<T>,
    transcript: Arc<Mutex<Transcript>>,
    pipeline: SendPipeline<T>,
    phase: Mutex<SessionPhase>,
    action_in_flight: AtomicBool,
}

impl<T: RoomTransport> ChatSession<T> {
    pub fn new(
        token_client: TokenClient,
        transport: Arc<T>,
        local_identity: impl Into<String>,
    ) -> Self {
        let transcript = Arc::new(Mutex::new(Transcript::new()));
        let pipeline = SendPipeline::new(Arc::clone(&transcript), Arc::clone(&transport))
            .with_identity(local_identity);
        Self {
            token_client,
            transport,
            transcript,
            pipeline,
            phase: Mutex::new(SessionPhase::Disconnected),
            action_in_flight: AtomicBool::new(false),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        *lock(&self.phase)
    }

    /// Shared chat state, for rendering layers.
    pub fn transcript(&self) -> Arc<Mutex<Transcript>> {
        Arc::clone(&self.transcript)
    }

    /// Snapshot of the current conversation.
    pub fn entries(&self) -> Arc<[ChatEntry]> {
        lock(&self.transcript).entries()
    }

    pub fn awaiting_reply(&self) -> bool {
        lock(&self.transcript).awaiting_reply()
    }

    /// Fetches a token and connects the transport.
    ///
    /// Returns `Ok(false)` when another connect/disconnect is already in
    /// flight and this request was ignored. A microphone failure is returned
    /// as [`ClientError::Microphone`] while the connection itself stays up.
    pub async fn connect(&self, request: &TokenRequest) -> Result<bool, ClientError> {
        if self.action_in_flight.swap(true, Ordering::SeqCst) {
            tracing::debug!("connect ignored, another session action is in flight");
            return Ok(false);
        }
        let result = self.connect_inner(request).await;
        self.action_in_flight.store(false, Ordering::SeqCst);
        result.map(|()| true)
    }

    async fn connect_inner(&self, request: &TokenRequest) -> Result<(), ClientError> {
        *lock(&self.phase) = SessionPhase::Connecting;

        let grant = match self.token_client.fetch(request).await {
            Ok(grant) => grant,
            Err(e) => {
                *lock(&self.phase) = SessionPhase::Disconnected;
                return Err(e.into());
            }
        };

        if let Err(e) = self.transport.connect(&grant.live_url, &grant.token).await {
            *lock(&self.phase) = SessionPhase::Disconnected;
            return Err(e);
        }
        *lock(&self.phase) = SessionPhase::Connected;
        tracing::info!(room = %request.room_name, "connected to room");

        if let Err(e) = self.transport.enable_microphone().await {
            // The room connection survives; the caller reports this apart
            // from connection errors.
            tracing::warn!(error = %e, "microphone enable failed after connect");
            return Err(e);
        }
        Ok(())
    }

    /// Disconnects the transport. Returns `Ok(false)` when ignored because
    /// another action is in flight.
    pub async fn disconnect(&self) -> Result<bool, ClientError> {
        if self.action_in_flight.swap(true, Ordering::SeqCst) {
            tracing::debug!("disconnect ignored, another session action is in flight");
            return Ok(false);
        }
        *lock(&self.phase) = SessionPhase::Disconnecting;
        let result = self.transport.disconnect().await;
        *lock(&self.phase) = SessionPhase::Disconnected;
        self.action_in_flight.store(false, Ordering::SeqCst);
        result.map(|()| true)
    }

    /// Sends a typed message through the outbound pipeline.
    pub async fn send(&self, text: &str) -> Result<(), ClientError> {
        self.pipeline.send(text, None).await.map_err(Into::into)
    }

    /// Replays a failed entry.
    pub async fn retry(&self, entry_id: &str) -> Result<(), ClientError> {
        self.pipeline
            .send_retry(entry_id)
            .await
            .map_err(Into::into)
    }

    /// Routes one raw data-channel event into the reconciler.
    ///
    /// Undecodable payloads are dropped silently; the return value reports
    /// what the reconciler did with the event.
    pub fn handle_data(
        &self,
        raw: &[u8],
        transport_identity: Option<&str>,
        delivery: Delivery,
    ) -> Option<ReconcileOutcome> {
        let payload = match WireMessage::decode(raw) {
            Some(payload) => payload,
            None => {
                tracing::trace!(len = raw.len(), "dropping undecodable data payload");
                return None;
            }
        };
        let mut event = InboundEvent::new(payload).with_delivery(delivery);
        if let Some(identity) = transport_identity {
            event = event.with_identity(identity);
        }
        Some(lock(&self.transcript).apply(event))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
