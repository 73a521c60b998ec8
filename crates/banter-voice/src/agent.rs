use crate::error::VoiceError;
use banter_types::WireMessage;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;
use tracing::info;

/// Default capacity for the per-room event channels.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// A finalized speech transcript from a room participant, ready for the
/// response generator. Interim fragments never reach this type; the
/// platform's transcription settles them first.
#[derive(Debug, Clone)]
pub struct FinalTranscript {
    pub room_name: String,
    pub participant_identity: String,
    pub text: String,
}

/// An encoded payload bound for the room data channel.
#[derive(Debug, Clone)]
pub struct DataFrame {
    pub payload: Vec<u8>,
    pub reliable: bool,
}

/// The agent's seat in a LiveKit room.
///
/// With the `livekit` client crate linked this would wrap a `livekit::Room`;
/// here it holds the join credentials and the room's event plumbing, and the
/// transport layer bridges [`DataFrame`]s onto the wire.
#[derive(Debug)]
pub struct AgentRoomClient {
    pub room_name: String,
    pub room_url: String,
    pub token: String,
    connected: AtomicBool,
    transcript_tx: broadcast::Sender<FinalTranscript>,
    outbound_tx: broadcast::Sender<DataFrame>,
}

impl AgentRoomClient {
    /// Joins a room as the agent participant.
    pub async fn connect(url: &str, token: &str, room_name: &str) -> Result<Self, VoiceError> {
        info!(
            room = room_name,
            url, "agent joining room with token length {}",
            token.len()
        );

        let (transcript_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (outbound_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            room_name: room_name.to_string(),
            room_url: url.to_string(),
            token: token.to_string(),
            connected: AtomicBool::new(true),
            transcript_tx,
            outbound_tx,
        })
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Publishes a chat payload to the room data channel.
    pub async fn publish_wire(
        &self,
        message: &WireMessage,
        reliable: bool,
    ) -> Result<(), VoiceError> {
        if !self.is_connected() {
            return Err(VoiceError::NotConnected(self.room_name.clone()));
        }

        let payload = message.encode()?;
        tracing::debug!(
            room = %self.room_name,
            bytes = payload.len(),
            reliable,
            "publishing data frame"
        );
        // No receivers just means nobody is bridging this room right now.
        let _ = self.outbound_tx.send(DataFrame { payload, reliable });
        Ok(())
    }

    /// Feeds one finalized transcript into the room, as the platform's
    /// transcription hook does when a participant stops speaking.
    pub fn ingest_transcript(
        &self,
        participant_identity: &str,
        text: &str,
    ) -> Result<(), VoiceError> {
        if !self.is_connected() {
            return Err(VoiceError::NotConnected(self.room_name.clone()));
        }

        let event = FinalTranscript {
            room_name: self.room_name.clone(),
            participant_identity: participant_identity.to_string(),
            text: text.to_string(),
        };
        let _ = self.transcript_tx.send(event);
        Ok(())
    }

    /// Subscribes to finalized transcripts from this room.
    pub fn subscribe_transcripts(&self) -> broadcast::Receiver<FinalTranscript> {
        self.transcript_tx.subscribe()
    }

    /// Subscribes to outbound data frames, for the transport bridge.
    pub fn subscribe_outbound(&self) -> broadcast::Receiver<DataFrame> {
        self.outbound_tx.subscribe()
    }

    /// Leaves the room. Later publishes and ingests fail with
    /// [`VoiceError::NotConnected`]; already-subscribed receivers drain
    /// whatever was sent before the disconnect.
    pub fn disconnect(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            info!(room = %self.room_name, "agent leaving room");
        }
    }
}
