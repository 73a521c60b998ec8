//! Banter server library logic.

pub mod api;
pub mod config;
pub mod pipeline;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use banter_agent::{ConversationStore, OpenAiChatModel, ResponseGenerator};
use banter_voice::RoomService;
use pipeline::RoomSessions;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
pub struct AppState {
    /// LiveKit token minting and room management.
    pub room_service: Arc<RoomService>,
    /// The response generator backing every room's agent.
    pub generator: Arc<ResponseGenerator>,
    /// Per-room conversation history.
    pub history: Arc<ConversationStore>,
    /// Live room pipelines.
    pub sessions: RoomSessions,
}

impl AppState {
    /// Builds the full state tree from loaded configuration.
    pub fn from_config(config: &config::Config) -> Self {
        let room_service = Arc::new(RoomService::new(config.livekit.to_livekit_config()));
        let history = Arc::new(ConversationStore::new(config.agent.history_cap));
        let model = Arc::new(OpenAiChatModel::new(config.agent.to_openai_config()));
        let generator = Arc::new(ResponseGenerator::new(
            model,
            Arc::clone(&history),
            config.agent.to_generator_config(),
        ));

        Self {
            room_service,
            generator,
            history,
            sessions: RoomSessions::new(),
        }
    }
}

/// Builds the application router with all routes.
pub fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(api::health_handler))
        .route("/start", post(api::start_handler))
        .layer(Extension(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
