//! Per-room agent pipeline.
//!
//! Each started room gets one agent seat and one background task that turns
//! finalized transcripts into spoken sentences on the data channel. The task
//! handles one transcript at a time, so generations for the same room never
//! overlap; concurrent rooms are fully independent.

use banter_agent::{ConversationStore, ResponseGenerator};
use banter_types::WireMessage;
use banter_voice::{AgentRoomClient, FinalTranscript, RoomService, VoiceError};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Identity the agent participant joins rooms under.
const AGENT_IDENTITY: &str = "banter-agent";
const AGENT_NAME: &str = "Banter";

struct RoomSession {
    agent: Arc<AgentRoomClient>,
    task: JoinHandle<()>,
}

/// Registry of live room pipelines.
///
/// Uses `std::sync::RwLock` for the same reason the history store does: all
/// acquisitions are brief map operations that never span an `.await`.
#[derive(Clone, Default)]
pub struct RoomSessions {
    inner: Arc<RwLock<HashMap<String, RoomSession>>>,
}

impl RoomSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// The live agent for a room, if its pipeline is running.
    pub fn agent(&self, room_name: &str) -> Option<Arc<AgentRoomClient>> {
        self.read().get(room_name).map(|s| Arc::clone(&s.agent))
    }

    pub fn active_rooms(&self) -> usize {
        self.read().len()
    }

    /// Ensures a room has a live agent pipeline, reusing a running one.
    pub async fn ensure_started(
        &self,
        room_name: &str,
        service: &RoomService,
        generator: Arc<ResponseGenerator>,
    ) -> Result<Arc<AgentRoomClient>, VoiceError> {
        if let Some(existing) = self.agent(room_name) {
            if existing.is_connected() {
                tracing::debug!(room = room_name, "reusing running agent pipeline");
                return Ok(existing);
            }
        }

        let token = service.generate_join_token(room_name, AGENT_IDENTITY, AGENT_NAME)?;

        // LiveKit auto-creates rooms on join, so a failure here only matters
        // as a signal.
        if let Err(e) = service.create_room(room_name).await {
            tracing::warn!(room = room_name, error = %e, "room create failed, relying on auto-create");
        }

        let agent =
            Arc::new(AgentRoomClient::connect(service.public_url(), &token, room_name).await?);

        // Subscribe before spawning so no transcript between registration and
        // task startup is lost.
        let transcripts = agent.subscribe_transcripts();
        let task = tokio::spawn(run_agent_loop(
            Arc::clone(&agent),
            generator,
            transcripts,
        ));

        if let Some(previous) = self.write().insert(
            room_name.to_string(),
            RoomSession {
                agent: Arc::clone(&agent),
                task,
            },
        ) {
            previous.agent.disconnect();
            previous.task.abort();
        }

        tracing::info!(room = room_name, "agent pipeline started");
        Ok(agent)
    }

    /// Stops a room's pipeline and drops its conversation history.
    pub fn stop(&self, room_name: &str, history: &ConversationStore) {
        if let Some(session) = self.write().remove(room_name) {
            session.agent.disconnect();
            session.task.abort();
            history.clear(room_name);
            tracing::info!(room = room_name, "agent pipeline stopped");
        }
    }

    /// Stops every pipeline; used on shutdown.
    pub fn stop_all(&self, history: &ConversationStore) {
        let rooms: Vec<String> = self.read().keys().cloned().collect();
        for room in rooms {
            self.stop(&room, history);
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, RoomSession>> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, RoomSession>> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Consumes finalized transcripts for one room, one at a time, and speaks
/// each reply sentence over the data channel as soon as it is available.
async fn run_agent_loop(
    agent: Arc<AgentRoomClient>,
    generator: Arc<ResponseGenerator>,
    mut transcripts: broadcast::Receiver<FinalTranscript>,
) {
    loop {
        match transcripts.recv().await {
            Ok(event) => handle_transcript(&agent, &generator, event).await,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(room = %agent.room_name, skipped, "transcript stream lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn handle_transcript(
    agent: &Arc<AgentRoomClient>,
    generator: &ResponseGenerator,
    event: FinalTranscript,
) {
    tracing::info!(
        room = %event.room_name,
        from = %event.participant_identity,
        chars = event.text.len(),
        "handling finalized transcript"
    );

    let reply = generator
        .generate_streaming(&event.text, Some(&event.room_name), |sentence| {
            let agent = Arc::clone(agent);
            async move {
                let message = WireMessage::agent_chat(sentence, now_ms());
                if let Err(e) = agent.publish_wire(&message, true).await {
                    // The room is gone; the remaining sentences have nowhere
                    // to go and are dropped.
                    tracing::warn!(room = %agent.room_name, error = %e, "dropping agent sentence");
                }
            }
        })
        .await;

    tracing::debug!(room = %event.room_name, chars = reply.len(), "agent reply complete");
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
