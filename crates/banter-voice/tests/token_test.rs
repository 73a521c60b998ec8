use banter_voice::{LiveKitConfig, RoomService};

const DEFAULT_URL: &str = "http://localhost:7880";
const DEFAULT_KEY: &str = "devkey";
const DEFAULT_SECRET: &str = "secret";

#[tokio::test]
async fn generates_join_token() {
    let config = LiveKitConfig::new(DEFAULT_URL, DEFAULT_KEY, DEFAULT_SECRET);
    let service = RoomService::new(config);

    let token = service
        .generate_join_token("test-room", "user-123", "Test User")
        .expect("failed to generate token");

    assert!(!token.is_empty());
}

#[tokio::test]
async fn join_token_grants_data_publish() {
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
    use serde::Deserialize;

    let config = LiveKitConfig::new(DEFAULT_URL, DEFAULT_KEY, DEFAULT_SECRET);
    let service = RoomService::new(config);

    let token = service
        .generate_join_token("perm-room", "user-perm", "Perm User")
        .expect("failed to generate token");

    #[derive(Deserialize)]
    struct Claims {
        video: VideoClaims,
    }

    #[derive(Deserialize)]
    struct VideoClaims {
        room: String,
        #[serde(rename = "roomJoin")]
        room_join: bool,
        #[serde(rename = "canPublish")]
        can_publish: bool,
        #[serde(rename = "canSubscribe")]
        can_subscribe: bool,
        #[serde(rename = "canPublishData")]
        can_publish_data: bool,
    }

    let validation = Validation::new(Algorithm::HS256);
    let key = DecodingKey::from_secret(DEFAULT_SECRET.as_bytes());
    let token_data = decode::<Claims>(&token, &key, &validation).expect("failed to decode token");

    assert_eq!(token_data.claims.video.room, "perm-room");
    assert!(token_data.claims.video.room_join);
    assert!(token_data.claims.video.can_publish);
    assert!(token_data.claims.video.can_subscribe);
    assert!(
        token_data.claims.video.can_publish_data,
        "chat requires data publish"
    );
}

#[test]
fn public_url_falls_back_to_internal() {
    let service = RoomService::new(LiveKitConfig::new(DEFAULT_URL, DEFAULT_KEY, DEFAULT_SECRET));
    assert_eq!(service.public_url(), DEFAULT_URL);

    let mut config = LiveKitConfig::new(DEFAULT_URL, DEFAULT_KEY, DEFAULT_SECRET);
    config.public_url = "wss://live.example.com".to_string();
    let service = RoomService::new(config);
    assert_eq!(service.public_url(), "wss://live.example.com");
}

#[test]
fn disabled_without_url() {
    let service = RoomService::new(LiveKitConfig::default());
    assert!(!service.is_enabled());

    let service = RoomService::new(LiveKitConfig::new(DEFAULT_URL, DEFAULT_KEY, DEFAULT_SECRET));
    assert!(service.is_enabled());
}
