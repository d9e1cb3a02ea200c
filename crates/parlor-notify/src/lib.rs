//! Appointment-confirmation messaging over the telephony provider's
//! WhatsApp messaging API.
//!
//! Sending is strictly best-effort: by the time a confirmation fires the
//! call has already ended and the caller has heard the spoken
//! confirmation, so failures are logged and never retried inline.

use chrono::{Duration, NaiveDateTime};
use parlor_nlp::{extract_datetime, normalize_phone};
use parlor_types::Appointment;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// Bound on one messaging API request.
const SEND_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(15);

const MESSAGES_API_BASE: &str = "https://api.twilio.com/2010-04-01";
const CALENDAR_RENDER_URL: &str = "https://calendar.google.com/calendar/render";

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("messaging provider error: {0}")]
    Provider(String),
}

#[derive(Clone, Deserialize)]
pub struct NotifyConfig {
    #[serde(default)]
    pub account_sid: String,
    #[serde(default)]
    pub auth_token: String,
    /// The provider-side sender, e.g. "+15550001111".
    #[serde(default)]
    pub from_number: String,
    /// Demo redirect: when set, every confirmation goes to this number
    /// instead of the caller's.
    #[serde(default)]
    pub demo_number: Option<String>,
    #[serde(default = "default_business_name")]
    pub business_name: String,
    #[serde(default = "default_country_code")]
    pub default_country_code: String,
}

fn default_business_name() -> String {
    "Luna Hair Studio".to_string()
}

fn default_country_code() -> String {
    "1".to_string()
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            account_sid: String::new(),
            auth_token: String::new(),
            from_number: String::new(),
            demo_number: None,
            business_name: default_business_name(),
            default_country_code: default_country_code(),
        }
    }
}

impl fmt::Debug for NotifyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifyConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"[REDACTED]")
            .field("from_number", &self.from_number)
            .field("demo_number", &self.demo_number)
            .field("business_name", &self.business_name)
            .field("default_country_code", &self.default_country_code)
            .finish()
    }
}

/// Confirmation sender.
pub struct NotifyClient {
    config: NotifyConfig,
    http: reqwest::Client,
}

impl fmt::Debug for NotifyClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifyClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl NotifyClient {
    pub fn new(config: NotifyConfig) -> Self {
        // Construction happens once at startup; a client without the
        // bounded timeout must never come into existence.
        let http = reqwest::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .expect("failed to build messaging HTTP client");
        Self { config, http }
    }

    pub fn is_enabled(&self) -> bool {
        !self.config.account_sid.is_empty()
            && !self.config.auth_token.is_empty()
            && !self.config.from_number.is_empty()
    }

    /// Sends the appointment confirmation. Returns `Ok(false)` when
    /// skipped (no recipient, provider unconfigured) so callers can log
    /// without treating it as a failure.
    pub async fn send_confirmation(
        &self,
        appointment: &Appointment,
        to_number: &str,
        reference_now: NaiveDateTime,
    ) -> Result<bool, NotifyError> {
        let Some(recipient) = self.resolve_recipient(to_number) else {
            tracing::warn!("confirmation skipped: missing recipient phone number");
            return Ok(false);
        };
        if !self.is_enabled() {
            tracing::warn!("confirmation skipped: messaging credentials are not configured");
            return Ok(false);
        }

        let body = self.message_body(appointment, reference_now);
        let to = whatsapp_address(&recipient);
        let from = whatsapp_address(&self.config.from_number);

        let url = format!(
            "{}/Accounts/{}/Messages.json",
            MESSAGES_API_BASE, self.config.account_sid
        );
        let response = self
            .http
            .post(url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[("Body", body.as_str()), ("To", to.as_str()), ("From", from.as_str())])
            .send()
            .await
            .map_err(|e| NotifyError::Provider(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifyError::Provider(format!(
                "message send returned {}",
                response.status()
            )));
        }

        tracing::info!(to = %to, "appointment confirmation sent");
        Ok(true)
    }

    fn resolve_recipient(&self, to_number: &str) -> Option<String> {
        if let Some(demo) = self.config.demo_number.as_deref().filter(|d| !d.is_empty()) {
            tracing::info!(original = to_number, demo, "redirecting confirmation to demo number");
            return normalize_phone(demo, &self.config.default_country_code);
        }
        normalize_phone(to_number, &self.config.default_country_code)
    }

    fn message_body(&self, appointment: &Appointment, reference_now: NaiveDateTime) -> String {
        let name = appointment.name.as_deref().unwrap_or("Friend");
        let service = appointment.service.as_deref().unwrap_or("appointment");
        let start = resolve_start(appointment, reference_now);
        let when = start.format("%A, %B %-d at %-I:%M %p").to_string();
        let link = calendar_link(appointment, reference_now, &self.config.business_name);

        format!(
            "{} confirmation\n{}, your {} is booked for {}.\nAdd to calendar: {}",
            self.config.business_name, name, service, when, link
        )
    }
}

fn whatsapp_address(number: &str) -> String {
    if number.starts_with("whatsapp:") {
        number.to_string()
    } else {
        format!("whatsapp:{}", number)
    }
}

fn resolve_start(appointment: &Appointment, reference_now: NaiveDateTime) -> NaiveDateTime {
    appointment
        .start
        .or_else(|| {
            appointment
                .time_text
                .as_deref()
                .and_then(|t| extract_datetime(t, reference_now))
        })
        .unwrap_or(reference_now)
}

/// Builds a pre-filled add-to-calendar link for the confirmation message.
pub fn calendar_link(
    appointment: &Appointment,
    reference_now: NaiveDateTime,
    business_name: &str,
) -> String {
    let start = resolve_start(appointment, reference_now);
    let end = start + Duration::minutes(appointment.duration_minutes());
    let compact = |t: NaiveDateTime| t.format("%Y%m%dT%H%M%S").to_string();

    let service = appointment.service.as_deref().unwrap_or("Salon Service");
    let name = appointment.name.as_deref().unwrap_or("our guest");
    let url = reqwest::Url::parse_with_params(
        CALENDAR_RENDER_URL,
        &[
            ("action", "TEMPLATE"),
            ("text", &format!("Hair Appointment - {}", service)),
            ("dates", &format!("{}/{}", compact(start), compact(end))),
            (
                "details",
                &format!("Hair appointment for {} at {}", name, business_name),
            ),
            ("location", business_name),
        ],
    );
    url.map(String::from)
        .unwrap_or_else(|_| CALENDAR_RENDER_URL.to_string())
}
