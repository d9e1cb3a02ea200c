//! Telephony webhook handlers driving the call loop.
//!
//! Every handler answers with a TwiML document, never an error status:
//! the telephony provider treats non-2xx responses as a dead call, so
//! failures degrade to a spoken fallback instead.

use crate::twiml::Twiml;
use crate::AppState;
use axum::extract::{Extension, Form};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use parlor_types::{Speaker, Stage, TurnOutcome};
use serde::Deserialize;
use std::sync::Arc;

const REPROMPT_LINE: &str = "I'm sorry, I didn't catch that. Could you say it again?";
const NO_INPUT_LINE: &str = "I didn't hear anything. Feel free to call back anytime. Goodbye!";
const TECHNICAL_DIFFICULTY_LINE: &str =
    "I'm sorry, we're having technical difficulty right now. Please call back in a few minutes.";

/// Form fields posted by the telephony provider on every webhook.
#[derive(Debug, Default, Deserialize)]
pub struct TelephonyForm {
    #[serde(rename = "CallSid", default)]
    pub call_sid: String,
    #[serde(rename = "From", default)]
    pub from: String,
    #[serde(rename = "SpeechResult", default)]
    pub speech_result: String,
}

/// Handler for `POST /incoming-call`. Opens the session and plays the
/// greeting inside a speech Gather.
pub async fn incoming_call_handler(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<TelephonyForm>,
) -> Response {
    tracing::info!(call_sid = %form.call_sid, from = %form.from, "incoming call");

    let greeting = state.business.greeting.clone();
    {
        let handle = state.sessions.get_or_create(&form.call_sid);
        let mut session = handle.lock().await;
        session.touch();
        // Re-delivered webhooks reuse the session; only the first one
        // seeds the greeting into the transcript.
        if session.history.is_empty() {
            session.push_turn(Speaker::Assistant, &greeting);
        }
    }

    let base = base_url(&state, &headers);
    // Call start never terminates, even on a synthesis failure: the
    // greeting degrades to plain text and the call proceeds.
    let prompt = speak(&state, &base, &greeting).await.or_say(&greeting);
    let body = Twiml::new()
        .gather("/process-speech", |g| prompt.apply(g))
        .say(NO_INPUT_LINE)
        .hangup()
        .build();
    xml_response(body)
}

/// Handler for `POST /process-speech`. Runs one conversation turn and
/// answers with either another Gather or a goodbye plus Hangup.
pub async fn process_speech_handler(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<TelephonyForm>,
) -> Response {
    let base = base_url(&state, &headers);
    let utterance = form.speech_result.trim();

    // Empty transcription: reprompt without touching the session, so a
    // stray silence never advances or corrupts the slot-filling state.
    if utterance.is_empty() {
        let prompt = speak(&state, &base, REPROMPT_LINE)
            .await
            .or_say(REPROMPT_LINE);
        let body = Twiml::new()
            .gather("/process-speech", |g| prompt.apply(g))
            .say(NO_INPUT_LINE)
            .hangup()
            .build();
        return xml_response(body);
    }

    tracing::info!(call_sid = %form.call_sid, utterance, "caller turn");
    let outcome = run_turn(&state, &form.call_sid, &form.from, utterance).await;
    let reply = speak(&state, &base, &outcome.reply).await;

    // A provider-side synthesis failure would fail identically on every
    // retry within this call, so the turn fails fast into a fixed line
    // and the call terminates instead of looping.
    if matches!(reply, SpokenReply::Failed) {
        state.sessions.delete(&form.call_sid);
        let body = Twiml::new().say(TECHNICAL_DIFFICULTY_LINE).hangup().build();
        return xml_response(body);
    }

    let body = if outcome.end_call {
        let goodbye = state.business.goodbye.clone();
        reply
            .apply(Twiml::new())
            .say(&goodbye)
            .hangup()
            .build()
    } else {
        Twiml::new()
            .gather("/process-speech", |g| reply.apply(g))
            .say(NO_INPUT_LINE)
            .hangup()
            .build()
    };
    xml_response(body)
}

/// Runs one full conversation turn against the session identified by
/// `call_sid`. Exposed so integration tests can drive the dialog without
/// going through TwiML parsing.
pub async fn run_turn(
    state: &AppState,
    call_sid: &str,
    from: &str,
    utterance: &str,
) -> TurnOutcome {
    let handle = state.sessions.get_or_create(call_sid);
    let mut session = handle.lock().await;
    session.touch();
    session.push_turn(Speaker::Caller, utterance);

    let now = state.calendar.business_now();
    let outcome = state.policy.handle_turn(&mut session, utterance, now).await;
    session.push_turn(Speaker::Assistant, &outcome.reply);

    if outcome.end_call && session.stage == Stage::Complete && session.begin_persist() {
        let appointment = session.appointment.clone();
        drop(session);
        let phone = confirmation_recipient(from, appointment.phone.as_deref());

        match state.calendar.create_event(&appointment, now).await {
            Ok(event_id) => {
                tracing::info!(call_sid, event_id = %event_id, "appointment written to calendar")
            }
            Err(e) => tracing::warn!(call_sid, error = %e, "calendar write failed"),
        }
        match state.notify.send_confirmation(&appointment, &phone, now).await {
            Ok(true) => tracing::info!(call_sid, "confirmation message sent"),
            Ok(false) => tracing::debug!(call_sid, "confirmation skipped"),
            Err(e) => tracing::warn!(call_sid, error = %e, "confirmation send failed"),
        }
    } else {
        drop(session);
    }

    if outcome.end_call {
        state.sessions.delete(call_sid);
    }
    outcome
}

/// How a reply reaches the caller's ear.
pub enum SpokenReply {
    /// Synthesized audio, served from the cache.
    Play(String),
    /// Plain `<Say>` text; the degraded mode when no synthesis
    /// credentials are configured.
    Say(String),
    /// The configured provider failed mid-call.
    Failed,
}

impl SpokenReply {
    /// Downgrades a provider failure to plain text, for prompts that
    /// must never take the call down.
    fn or_say(self, text: &str) -> SpokenReply {
        match self {
            SpokenReply::Failed => SpokenReply::Say(text.to_string()),
            other => other,
        }
    }

    fn apply(&self, twiml: Twiml) -> Twiml {
        match self {
            SpokenReply::Play(url) => twiml.play(url),
            SpokenReply::Say(text) => twiml.say(text),
            SpokenReply::Failed => twiml,
        }
    }
}

/// Synthesizes `text` and caches the audio, returning the playback URL.
///
/// A missing configuration is not a failure: the deployment simply runs
/// without a synthesis provider and replies fall back to `<Say>`. A
/// configured provider erroring is reported as [`SpokenReply::Failed`]
/// so the turn handler can decide whether the call survives.
async fn speak(state: &AppState, base_url: &str, text: &str) -> SpokenReply {
    match state.tts.synthesize(text).await {
        Ok(bytes) => {
            let id = state.audio.insert(bytes, "audio/mpeg");
            SpokenReply::Play(format!("{}/audio/{}", base_url, id))
        }
        Err(parlor_voice::VoiceError::Config(reason)) => {
            tracing::debug!(reason, "synthesis not configured, using plain text");
            SpokenReply::Say(text.to_string())
        }
        Err(e) => {
            tracing::warn!(error = %e, "speech synthesis failed");
            SpokenReply::Failed
        }
    }
}

/// Picks where the confirmation goes: the telephony-supplied caller
/// address wins over any number dictated during the conversation, so a
/// caller reciting someone else's number still gets the confirmation on
/// the line that actually called.
fn confirmation_recipient(from: &str, collected_phone: Option<&str>) -> String {
    if !from.trim().is_empty() {
        return from.to_string();
    }
    collected_phone
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or("")
        .to_string()
}

/// Resolves the externally reachable base URL for audio links: the
/// configured public URL when set, otherwise the forwarded request host.
fn base_url(state: &AppState, headers: &HeaderMap) -> String {
    if !state.public_url.is_empty() {
        return state.public_url.trim_end_matches('/').to_string();
    }
    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("https");
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    format!("{}://{}", proto, host)
}

fn xml_response(body: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/xml")],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_line_wins_over_a_dictated_number() {
        let recipient = confirmation_recipient("+15550001111", Some("+15559999999"));
        assert_eq!(recipient, "+15550001111");
    }

    #[test]
    fn dictated_number_covers_a_missing_caller_address() {
        assert_eq!(
            confirmation_recipient("", Some("+15559999999")),
            "+15559999999"
        );
        assert_eq!(confirmation_recipient("  ", Some("+15559999999")), "+15559999999");
    }

    #[test]
    fn no_address_at_all_yields_empty() {
        assert_eq!(confirmation_recipient("", None), "");
        assert_eq!(confirmation_recipient("", Some("   ")), "");
    }
}
