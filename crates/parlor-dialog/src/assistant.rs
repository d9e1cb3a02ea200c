//! Variant B: LLM-assisted structured extraction.
//!
//! One assistant call per turn, given the running conversation and the
//! current appointment record. The assistant must return a well-formed
//! JSON object; anything else is treated as assistant failure and the
//! turn falls back to a fixed apology without mutating any fields.

use crate::error::DialogError;
use chrono::NaiveDateTime;
use parlor_nlp::{extract_datetime, format_iso, normalize_email, normalize_name, normalize_phone};
use parlor_types::{CallSession, ExtractedFields, Field, Speaker, Stage, TurnOutcome};
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::time::Duration;

/// The assistant variant collects this field set before completing.
pub const ASSISTANT_REQUIRED_FIELDS: &[Field] = &[
    Field::Name,
    Field::Email,
    Field::Service,
    Field::Gender,
    Field::Time,
];

/// Bound on one assistant round trip; beyond this the turn fails over to
/// the apology path rather than hanging the call.
const ASSISTANT_TIMEOUT: Duration = Duration::from_secs(15);

const APOLOGY_LINE: &str =
    "I'm sorry, I had trouble understanding that. Could you please repeat what you need?";

const SYSTEM_PROMPT: &str = "You are Luna, the friendly front-desk assistant for Luna Hair \
Studio. Collect the caller's appointment details (name, email, service, gender, and exact \
appointment time). Keep replies under two sentences, confirm what you heard, and politely \
request whichever detail is missing. Remind callers about salon hours (Tue-Sat, 9am-7pm) when \
needed and never promise availability; just acknowledge you'll confirm it.\n\
You MUST respond with valid JSON only, shaped exactly like this:\n\
{\"reply\": \"your response text\", \"collected\": {\"name\": null, \"email\": null, \
\"service\": null, \"gender\": null, \"phone\": null, \"datetime\": null}, \"notes\": null}\n\
Always include the \"reply\" and \"collected\" fields. Only set a collected field when you \
actually extracted it from the caller's words. \"datetime\" must be an ISO 8601 timestamp.";

#[derive(Clone, Deserialize)]
pub struct AssistantConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Country code assumed for bare 10-digit phone numbers.
    #[serde(default = "default_country_code")]
    pub default_country_code: String,
}

fn default_model() -> String {
    "gpt-4.1-nano".to_string()
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_country_code() -> String {
    "1".to_string()
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            base_url: default_base_url(),
            default_country_code: default_country_code(),
        }
    }
}

impl fmt::Debug for AssistantConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssistantConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("default_country_code", &self.default_country_code)
            .finish()
    }
}

/// Fields the assistant claims to have extracted, as raw strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CollectedFields {
    pub name: Option<String>,
    pub email: Option<String>,
    pub service: Option<String>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub datetime: Option<String>,
}

/// The structured turn reply the assistant must produce.
#[derive(Debug, Clone, Deserialize)]
pub struct AssistantPayload {
    pub reply: String,
    #[serde(default)]
    pub collected: CollectedFields,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Parses the assistant's raw completion text. Non-JSON output is a
/// malformed reply, never passed through as the spoken response.
pub fn parse_payload(raw: &str) -> Result<AssistantPayload, DialogError> {
    serde_json::from_str(raw.trim())
        .map_err(|e| DialogError::MalformedReply(format!("{}: {:?}", e, raw)))
}

/// Normalizes extracted raw strings into canonical field values. A
/// datetime that fails to parse is discarded entirely, treated as
/// not-extracted.
pub fn normalize_collected(
    collected: &CollectedFields,
    default_country_code: &str,
    now: NaiveDateTime,
) -> ExtractedFields {
    let start = collected
        .datetime
        .as_deref()
        .and_then(|t| extract_datetime(t, now));
    ExtractedFields {
        name: collected.name.as_deref().and_then(normalize_name),
        email: collected.email.as_deref().and_then(normalize_email),
        phone: collected
            .phone
            .as_deref()
            .and_then(|p| normalize_phone(p, default_country_code)),
        gender: collected
            .gender
            .as_deref()
            .map(|g| g.trim().to_lowercase())
            .filter(|g| !g.is_empty()),
        service: collected
            .service
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty()),
        datetime: start.map(format_iso),
        start,
    }
}

/// HTTP client for the chat-completions assistant endpoint.
#[derive(Clone)]
pub struct AssistantClient {
    config: AssistantConfig,
    http: reqwest::Client,
}

impl fmt::Debug for AssistantClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssistantClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AssistantClient {
    pub fn new(config: AssistantConfig) -> Self {
        // Construction happens once at startup; a client without the
        // bounded timeout must never come into existence.
        let http = reqwest::Client::builder()
            .timeout(ASSISTANT_TIMEOUT)
            .build()
            .expect("failed to build assistant HTTP client");
        Self { config, http }
    }

    pub fn is_enabled(&self) -> bool {
        !self.config.api_key.is_empty()
    }

    /// Runs one assistant turn over the session's conversation history
    /// (which already contains the latest caller utterance).
    pub async fn complete(&self, session: &CallSession) -> Result<AssistantPayload, DialogError> {
        if !self.is_enabled() {
            return Err(DialogError::Config("api_key is not set".to_string()));
        }

        let mut messages = vec![json!({ "role": "system", "content": SYSTEM_PROMPT })];
        let known = serde_json::to_string(&session.appointment).unwrap_or_default();
        messages.push(json!({
            "role": "system",
            "content": format!("Appointment details collected so far: {}", known),
        }));
        for turn in &session.history {
            let role = match turn.speaker {
                Speaker::Caller => "user",
                Speaker::Assistant => "assistant",
            };
            messages.push(json!({ "role": role, "content": turn.text }));
        }

        let body = json!({
            "model": self.config.model,
            "temperature": 0.3,
            "top_p": 0.9,
            "messages": messages,
            "response_format": { "type": "json_object" },
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DialogError::Assistant(format!(
                        "assistant timed out after {} seconds",
                        ASSISTANT_TIMEOUT.as_secs()
                    ))
                } else {
                    DialogError::Assistant(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(DialogError::Assistant(format!(
                "assistant returned {}",
                response.status()
            )));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| DialogError::Assistant(e.to_string()))?;
        let content = payload
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                DialogError::MalformedReply("completion has no message content".to_string())
            })?;
        parse_payload(content)
    }
}

/// LLM-assisted conversation policy.
#[derive(Debug, Clone)]
pub struct AssistantPolicy {
    client: AssistantClient,
    default_country_code: String,
}

impl AssistantPolicy {
    pub fn new(config: AssistantConfig) -> Self {
        let default_country_code = config.default_country_code.clone();
        Self {
            client: AssistantClient::new(config),
            default_country_code,
        }
    }

    pub async fn handle_turn(
        &self,
        session: &mut CallSession,
        _utterance: &str,
        now: NaiveDateTime,
    ) -> TurnOutcome {
        session.stage = Stage::Collecting;
        session.last_intent = Some(parlor_types::Intent::Booking);

        let payload = match self.client.complete(session).await {
            Ok(payload) => payload,
            Err(e) => {
                // Assistant failure never marks fields or ends the call.
                tracing::warn!(error = %e, call_id = %session.id, "assistant turn failed");
                return TurnOutcome::reply(APOLOGY_LINE);
            }
        };

        if let Some(notes) = payload.notes.as_deref() {
            tracing::debug!(call_id = %session.id, notes, "assistant notes");
        }

        let normalized = normalize_collected(&payload.collected, &self.default_country_code, now);
        session.merge_fields(&normalized);

        let mut reply = payload.reply.trim().to_string();
        if reply.is_empty() {
            reply = APOLOGY_LINE.to_string();
        }

        if session.appointment.is_complete(ASSISTANT_REQUIRED_FIELDS) {
            session.stage = Stage::Complete;
            reply.push_str(&format!(
                " To confirm: a {} for {} on {}. You will receive a confirmation message shortly.",
                session.appointment.service.as_deref().unwrap_or("service"),
                session.appointment.name.as_deref().unwrap_or("you"),
                session
                    .appointment
                    .start
                    .map(crate::keyword::speak_datetime)
                    .or_else(|| session.appointment.time_text.clone())
                    .unwrap_or_else(|| "your requested time".to_string()),
            ));
            return TurnOutcome::ending(reply);
        }

        TurnOutcome::reply(reply)
    }
}
