//! Webhook surface tests: every telephony endpoint must answer 200 with
//! a well-formed TwiML document, even with no providers configured.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use parlor_server::config::Config;
use parlor_server::{app, AppState};
use std::sync::Arc;
use tower::ServiceExt;

fn setup_app() -> (axum::Router, Arc<AppState>) {
    // Default config: no TTS, calendar, assistant, or messaging
    // credentials, so everything degrades to offline fallbacks.
    let state = Arc::new(AppState::from_config(&Config::default()));
    (app(state.clone()), state)
}

fn form_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method("POST")
        .header(
            header::CONTENT_TYPE,
            "application/x-www-form-urlencoded",
        )
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn health_check_returns_ok() {
    let (app, _) = setup_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn incoming_call_greets_inside_a_gather() {
    let (app, state) = setup_app();

    let response = app
        .oneshot(form_request(
            "/incoming-call",
            "CallSid=CA100&From=%2B15551234567",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/xml"
    );
    let body = body_string(response).await;
    assert!(body.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response>"));
    assert!(body.contains("action=\"/process-speech\""));
    // No TTS credentials: the greeting degrades to a plain Say.
    assert!(body.contains("Thank you for calling Luna Hair Studio!"));
    assert_eq!(state.sessions.len(), 1);
}

#[tokio::test]
async fn repeated_incoming_call_webhook_reuses_the_session() {
    let (app, state) = setup_app();

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(form_request(
                "/incoming-call",
                "CallSid=CA100&From=%2B15551234567",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(state.sessions.len(), 1);
    let handle = state.sessions.get_or_create("CA100");
    let session = handle.lock().await;
    // Greeting seeded once, not duplicated by the redelivery.
    assert_eq!(session.history.len(), 1);
}

#[tokio::test]
async fn empty_speech_result_reprompts_without_advancing_the_session() {
    let (app, state) = setup_app();

    app.clone()
        .oneshot(form_request(
            "/incoming-call",
            "CallSid=CA200&From=%2B15551234567",
        ))
        .await
        .unwrap();

    let response = app
        .oneshot(form_request(
            "/process-speech",
            "CallSid=CA200&From=%2B15551234567&SpeechResult=",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("didn't catch that"));
    assert!(body.contains("<Gather"));

    let handle = state.sessions.get_or_create("CA200");
    let session = handle.lock().await;
    assert_eq!(session.history.len(), 1, "silence must not add turns");
}

#[tokio::test]
async fn info_question_answers_and_keeps_gathering() {
    let (app, _) = setup_app();

    let response = app
        .oneshot(form_request(
            "/process-speech",
            "CallSid=CA300&From=%2B15551234567&SpeechResult=what%20are%20your%20hours",
        ))
        .await
        .unwrap();

    let body = body_string(response).await;
    assert!(body.contains("9 AM to 7 PM"));
    assert!(body.contains("<Gather"));
}

#[tokio::test]
async fn completed_booking_says_goodbye_and_hangs_up() {
    let (app, state) = setup_app();

    for utterance in ["book%20a%20haircut", "Wednesday", "Ann"] {
        let body = format!(
            "CallSid=CA400&From=%2B15551234567&SpeechResult={}",
            utterance
        );
        let response = app
            .clone()
            .oneshot(form_request("/process-speech", &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        if utterance == "Ann" {
            let xml = body_string(response).await;
            assert!(xml.contains("<Hangup/>"));
            assert!(!xml.contains("<Gather"));
        }
    }

    // The finished call releases its session.
    assert!(state.sessions.is_empty());
}
