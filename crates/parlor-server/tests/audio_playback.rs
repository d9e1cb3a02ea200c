//! Audio playback endpoint tests.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use parlor_server::config::Config;
use parlor_server::{app, AppState};
use std::sync::Arc;
use tower::ServiceExt;

fn setup_app() -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::from_config(&Config::default()));
    (app(state.clone()), state)
}

#[tokio::test]
async fn cached_audio_is_served_with_no_store() {
    let (app, state) = setup_app();
    let id = state.audio.insert(vec![0x49, 0x44, 0x33, 0x04], "audio/mpeg");

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/audio/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "audio/mpeg"
    );
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "no-store"
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(bytes.as_ref(), [0x49, 0x44, 0x33, 0x04]);
}

#[tokio::test]
async fn expired_audio_handles_are_not_found() {
    let (app, state) = setup_app();
    let stale = chrono::Utc::now() - chrono::Duration::seconds(parlor_voice::AUDIO_TTL_SECONDS + 1);
    let id = state.audio.insert_at(vec![0u8; 8], "audio/mpeg", stale);

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/audio/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_audio_handles_are_not_found() {
    let (app, _) = setup_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/audio/not-a-real-handle")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
