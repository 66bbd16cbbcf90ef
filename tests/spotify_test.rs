use std::sync::Arc;

use folio::{
    config::SpotifyConfig,
    error::UpstreamError,
    management::{TokenRefresher, TokenStore},
    spotify::{SpotifyAuth, SpotifyClient},
    types::{PlaybackSnapshot, UserToken},
    utils,
};
use reqwest::Client;
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_string_contains, header, method, path, query_param},
};

// base64("client-123:secret")
const BASIC_AUTH: &str = "Basic Y2xpZW50LTEyMzpzZWNyZXQ=";

fn spotify_config(server: &MockServer) -> SpotifyConfig {
    SpotifyConfig {
        client_id: "client-123".to_string(),
        client_secret: "secret".to_string(),
        redirect_uri: "http://127.0.0.1:3000/spotify/auth/callback".to_string(),
        auth_url: format!("{}/authorize", server.uri()),
        token_url: format!("{}/api/token", server.uri()),
        api_url: format!("{}/v1", server.uri()),
    }
}

// Helper building a player client whose token store refreshes against the mock
fn setup(server: &MockServer) -> (SpotifyClient, Arc<TokenStore>) {
    let http = Client::new();
    let auth = SpotifyAuth::new(http.clone(), spotify_config(server));
    let tokens = Arc::new(TokenStore::new(Arc::new(auth)));
    let client = SpotifyClient::new(http, &format!("{}/v1", server.uri()), Arc::clone(&tokens));
    (client, tokens)
}

fn track_json(id: &str, name: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": name,
        "type": "track",
        "duration_ms": 180000,
        "artists": [{ "name": "Artist" }],
        "album": { "name": "Album", "images": [{ "url": "https://img/1" }] },
        "external_urls": { "spotify": format!("https://open.spotify.com/track/{}", id) }
    })
}

#[tokio::test]
async fn test_currently_playing_normalizes_track() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/me/player/currently-playing"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "is_playing": true,
            "progress_ms": 42000,
            "item": track_json("t1", "First")
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, tokens) = setup(&server);
    tokens.set_token("user-1", "access-1", Some("refresh-1"));

    let snapshot = client.currently_playing("user-1").await.unwrap();
    let track = snapshot.track().expect("track snapshot");
    assert_eq!(track.track_id, "t1");
    assert_eq!(track.name, "First");
    assert_eq!(track.progress, 42000);
    assert_eq!(track.duration, 180000);
    assert_eq!(track.image.as_deref(), Some("https://img/1"));
    assert!(snapshot.is_authenticated());
}

#[tokio::test]
async fn test_currently_playing_no_content_is_not_playing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/me/player/currently-playing"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let (client, tokens) = setup(&server);
    tokens.set_token("user-1", "access-1", None);

    let snapshot = client.currently_playing("user-1").await.unwrap();
    assert_eq!(snapshot, PlaybackSnapshot::not_playing());
    assert!(snapshot.is_authenticated());
    assert!(!snapshot.is_playing());
}

#[tokio::test]
async fn test_unknown_user_makes_no_upstream_call() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let (client, _) = setup(&server);

    let snapshot = client.currently_playing("ghost").await.unwrap();
    assert_eq!(snapshot, PlaybackSnapshot::unauthenticated());

    let recent = client.recently_played("ghost", 3).await.unwrap();
    assert!(!recent.authenticated);
    assert!(recent.tracks.is_empty());
}

#[tokio::test]
async fn test_rejected_token_is_purged() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/me/player/currently-playing"))
        .respond_with(ResponseTemplate::new(401).set_body_string("The access token expired"))
        .mount(&server)
        .await;

    let (client, tokens) = setup(&server);
    tokens.set_token("user-1", "access-1", Some("refresh-1"));

    let err = client.currently_playing("user-1").await.unwrap_err();
    assert!(matches!(err, UpstreamError::Unauthorized(_)));
    assert!(!tokens.contains("user-1"));

    // the next request sees an unauthenticated user
    let snapshot = client.currently_playing("user-1").await.unwrap();
    assert!(!snapshot.is_authenticated());
}

#[tokio::test]
async fn test_upstream_failure_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/me/player/currently-playing"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let (client, tokens) = setup(&server);
    tokens.set_token("user-1", "access-1", None);

    let err = client.currently_playing("user-1").await.unwrap_err();
    assert!(matches!(err, UpstreamError::Status { status: 502, .. }));
    // server errors do not cost the user their credentials
    assert!(tokens.contains("user-1"));
}

#[tokio::test]
async fn test_expiring_token_is_refreshed_before_the_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .and(header("authorization", BASIC_AUTH))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-2",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/me/player/currently-playing"))
        .and(header("authorization", "Bearer access-2"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let (client, tokens) = setup(&server);
    tokens.insert(
        "user-1",
        UserToken {
            access_token: "access-1".to_string(),
            refresh_token: Some("refresh-1".to_string()),
            expires_at: utils::now_ms() + 60_000,
        },
    );

    let snapshot = client.currently_playing("user-1").await.unwrap();
    assert_eq!(snapshot, PlaybackSnapshot::not_playing());

    let record = tokens.get("user-1").unwrap();
    assert_eq!(record.access_token, "access-2");
    assert_eq!(record.refresh_token.as_deref(), Some("refresh-1"));
}

#[tokio::test]
async fn test_recently_played_clamps_limit_and_skips_episodes() {
    let server = MockServer::start().await;
    let mut episode = track_json("e1", "Episode");
    episode["type"] = json!("episode");

    Mock::given(method("GET"))
        .and(path("/v1/me/player/recently-played"))
        .and(query_param("limit", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                { "track": track_json("t2", "Second"), "played_at": "2024-05-01T11:58:00.000Z" },
                { "track": episode, "played_at": "2024-05-01T11:50:00.000Z" },
                { "track": track_json("t1", "First"), "played_at": "2024-05-01T11:40:00.000Z" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, tokens) = setup(&server);
    tokens.set_token("user-1", "access-1", None);

    let recent = client.recently_played("user-1", 500).await.unwrap();
    assert!(recent.authenticated);
    let names: Vec<&str> = recent.tracks.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Second", "First"]);
    assert_eq!(recent.tracks[0].played_at, "2024-05-01T11:58:00.000Z");
}

#[tokio::test]
async fn test_exchange_code_and_lookup_user() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .and(header("authorization", BASIC_AUTH))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-1",
            "refresh_token": "refresh-1",
            "expires_in": 3600,
            "scope": "user-read-currently-playing"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/me"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "spotify-user" })))
        .mount(&server)
        .await;

    let auth = SpotifyAuth::new(Client::new(), spotify_config(&server));
    let grant = auth.exchange_code("abc").await.unwrap();
    assert_eq!(grant.access_token, "access-1");
    assert_eq!(grant.refresh_token.as_deref(), Some("refresh-1"));

    assert_eq!(auth.current_user_id("access-1").await.unwrap(), "spotify-user");
}

#[tokio::test]
async fn test_refresh_rejection_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "invalid_grant" })))
        .mount(&server)
        .await;

    let auth = SpotifyAuth::new(Client::new(), spotify_config(&server));
    let err = auth.refresh_access_token("revoked").await.unwrap_err();
    assert!(matches!(err, UpstreamError::Status { status: 400, .. }));
}
