//! HTTP client for the hosted calendar API (Google Calendar v3 wire shape).

use crate::error::CalendarError;
use crate::slots::{candidate_slots, mark_availability, BusyInterval};
use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime};
use parlor_nlp::{default_fallback_start, extract_datetime};
use parlor_types::{Appointment, Slot};
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::sync::RwLock;
use std::time::Instant;

/// Bound on every outbound calendar request.
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(15);

/// Refresh the cached access token this long before its reported expiry.
const TOKEN_EXPIRY_MARGIN_SECS: u64 = 60;

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const API_BASE: &str = "https://www.googleapis.com/calendar/v3";

#[derive(Clone, Deserialize)]
pub struct CalendarConfig {
    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub refresh_token: String,
    /// IANA timezone name sent with event payloads.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Offset of business-local wall-clock time from UTC, in minutes.
    #[serde(default = "default_utc_offset")]
    pub utc_offset_minutes: i32,
}

fn default_calendar_id() -> String {
    "primary".to_string()
}

fn default_timezone() -> String {
    "America/New_York".to_string()
}

fn default_utc_offset() -> i32 {
    -4 * 60
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            calendar_id: default_calendar_id(),
            client_id: String::new(),
            client_secret: String::new(),
            refresh_token: String::new(),
            timezone: default_timezone(),
            utc_offset_minutes: default_utc_offset(),
        }
    }
}

impl fmt::Debug for CalendarConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalendarConfig")
            .field("calendar_id", &self.calendar_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("timezone", &self.timezone)
            .field("utc_offset_minutes", &self.utc_offset_minutes)
            .finish()
    }
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Client for free/busy queries and event creation.
pub struct CalendarClient {
    config: CalendarConfig,
    http: reqwest::Client,
    token: RwLock<Option<CachedToken>>,
}

impl fmt::Debug for CalendarClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalendarClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

#[derive(Deserialize)]
struct BusyWindow {
    start: String,
    end: String,
}

impl CalendarClient {
    pub fn new(config: CalendarConfig) -> Self {
        // Construction happens once at startup; a client without the
        // bounded timeout must never come into existence.
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build calendar HTTP client");
        Self {
            config,
            http,
            token: RwLock::new(None),
        }
    }

    /// Whether credentials are present. When disabled, availability
    /// degrades to optimistic and event creation fails with a config error.
    pub fn is_enabled(&self) -> bool {
        !self.config.refresh_token.is_empty()
            && !self.config.client_id.is_empty()
            && !self.config.client_secret.is_empty()
    }

    pub fn timezone(&self) -> &str {
        &self.config.timezone
    }

    /// Current business-local wall-clock time.
    pub fn business_now(&self) -> NaiveDateTime {
        (chrono::Utc::now() + Duration::minutes(self.config.utc_offset_minutes as i64))
            .naive_utc()
    }

    /// Proposes candidate appointment slots, checking them against the
    /// calendar in one batched free/busy query. Provider failure degrades
    /// to treating every candidate as free.
    pub async fn propose_slots(
        &self,
        duration_minutes: i64,
        reference_now: NaiveDateTime,
    ) -> Vec<Slot> {
        let mut slots = candidate_slots(reference_now, duration_minutes);

        let span_start = slots.iter().map(|s| s.start).min();
        let span_end = slots.iter().map(|s| s.end).max();
        let (Some(span_start), Some(span_end)) = (span_start, span_end) else {
            return slots;
        };

        match self.query_busy(span_start, span_end).await {
            Ok(busy) => mark_availability(&mut slots, &busy),
            Err(e) => {
                tracing::warn!(error = %e, "availability check failed, proposing all candidates");
            }
        }
        slots
    }

    /// Queries busy intervals for the given business-local span.
    pub async fn query_busy(
        &self,
        span_start: NaiveDateTime,
        span_end: NaiveDateTime,
    ) -> Result<Vec<BusyInterval>, CalendarError> {
        let token = self.access_token().await?;
        let body = json!({
            "timeMin": self.to_rfc3339(span_start)?,
            "timeMax": self.to_rfc3339(span_end)?,
            "items": [{ "id": self.config.calendar_id }],
        });

        let response = self
            .http
            .post(format!("{}/freeBusy", API_BASE))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| CalendarError::Provider(format!("free/busy request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(CalendarError::Provider(format!(
                "free/busy query returned {}",
                response.status()
            )));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CalendarError::InvalidResponse(e.to_string()))?;

        let windows: Vec<BusyWindow> = payload
            .pointer(&format!("/calendars/{}/busy", self.config.calendar_id))
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| CalendarError::InvalidResponse(e.to_string()))?
            .unwrap_or_default();

        windows
            .into_iter()
            .map(|w| {
                Ok(BusyInterval {
                    start: self.from_rfc3339(&w.start)?,
                    end: self.from_rfc3339(&w.end)?,
                })
            })
            .collect()
    }

    /// Creates a calendar event for a completed booking and returns the
    /// provider's event id.
    ///
    /// The stored time phrase is re-parsed here; if it still fails, the
    /// deterministic default slot is substituted rather than refusing the
    /// write.
    pub async fn create_event(
        &self,
        appointment: &Appointment,
        reference_now: NaiveDateTime,
    ) -> Result<String, CalendarError> {
        let service = appointment
            .service
            .as_deref()
            .ok_or_else(|| CalendarError::Config("booking has no service".to_string()))?;
        let name = appointment
            .name
            .as_deref()
            .ok_or_else(|| CalendarError::Config("booking has no name".to_string()))?;

        let start = appointment
            .start
            .or_else(|| {
                appointment
                    .time_text
                    .as_deref()
                    .and_then(|t| extract_datetime(t, reference_now))
            })
            .unwrap_or_else(|| default_fallback_start(reference_now));
        let end = start + Duration::minutes(appointment.duration_minutes());

        let token = self.access_token().await?;
        let body = json!({
            "summary": format!("{} - {}", service, name),
            "description": format!("Booked by {} via the Parlor voice assistant.", name),
            "start": {
                "dateTime": self.to_rfc3339(start)?,
                "timeZone": self.config.timezone,
            },
            "end": {
                "dateTime": self.to_rfc3339(end)?,
                "timeZone": self.config.timezone,
            },
            "reminders": {
                "useDefault": false,
                "overrides": [
                    { "method": "popup", "minutes": 60 },
                    { "method": "email", "minutes": 24 * 60 },
                ],
            },
        });

        let response = self
            .http
            .post(format!(
                "{}/calendars/{}/events",
                API_BASE, self.config.calendar_id
            ))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| CalendarError::Provider(format!("event insert failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(CalendarError::Provider(format!(
                "event insert returned {}",
                response.status()
            )));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CalendarError::InvalidResponse(e.to_string()))?;
        payload
            .get("id")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| CalendarError::InvalidResponse("event response has no id".to_string()))
    }

    async fn access_token(&self) -> Result<String, CalendarError> {
        if !self.is_enabled() {
            return Err(CalendarError::Config(
                "calendar credentials are not configured".to_string(),
            ));
        }

        {
            let cached = self.token.read().expect("token cache poisoned");
            if let Some(token) = cached.as_ref() {
                if token.expires_at > Instant::now() {
                    return Ok(token.access_token.clone());
                }
            }
        }

        let response = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("refresh_token", self.config.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| CalendarError::Auth(format!("token refresh failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(CalendarError::Auth(format!(
                "token refresh returned {}",
                response.status()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| CalendarError::InvalidResponse(e.to_string()))?;

        let lifetime = token.expires_in.saturating_sub(TOKEN_EXPIRY_MARGIN_SECS).max(1);
        let mut cached = self.token.write().expect("token cache poisoned");
        *cached = Some(CachedToken {
            access_token: token.access_token.clone(),
            expires_at: Instant::now() + std::time::Duration::from_secs(lifetime),
        });
        Ok(token.access_token)
    }

    fn offset(&self) -> Result<FixedOffset, CalendarError> {
        FixedOffset::east_opt(self.config.utc_offset_minutes * 60).ok_or_else(|| {
            CalendarError::Config(format!(
                "invalid utc_offset_minutes: {}",
                self.config.utc_offset_minutes
            ))
        })
    }

    fn to_rfc3339(&self, local: NaiveDateTime) -> Result<String, CalendarError> {
        let offset = self.offset()?;
        local
            .and_local_timezone(offset)
            .single()
            .map(|dt| dt.to_rfc3339())
            .ok_or_else(|| {
                CalendarError::Config("wall-clock time is ambiguous in fixed offset".to_string())
            })
    }

    fn from_rfc3339(&self, value: &str) -> Result<NaiveDateTime, CalendarError> {
        let offset = self.offset()?;
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&offset).naive_local())
            .map_err(|e| CalendarError::InvalidResponse(format!("bad timestamp {}: {}", value, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> NaiveDateTime {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn unconfigured_client_proposes_optimistically() {
        let client = CalendarClient::new(CalendarConfig::default());
        assert!(!client.is_enabled());

        let slots = client.propose_slots(60, t("2026-08-25T10:00:00")).await;
        assert_eq!(slots.len(), 2);
        assert!(slots.iter().all(|s| s.free));
    }

    #[tokio::test]
    async fn event_creation_without_credentials_is_a_config_error() {
        let client = CalendarClient::new(CalendarConfig::default());
        let appointment = Appointment {
            service: Some("haircut".to_string()),
            name: Some("Ann".to_string()),
            time_text: Some("whenever".to_string()),
            ..Default::default()
        };
        let err = client
            .create_event(&appointment, t("2026-08-25T10:00:00"))
            .await
            .unwrap_err();
        assert!(matches!(err, CalendarError::Config(_)));
    }

    #[test]
    fn rfc3339_round_trip_uses_the_configured_offset() {
        let client = CalendarClient::new(CalendarConfig {
            utc_offset_minutes: -240,
            ..Default::default()
        });
        let local = t("2026-09-02T15:00:00");
        let encoded = client.to_rfc3339(local).unwrap();
        assert_eq!(encoded, "2026-09-02T15:00:00-04:00");
        assert_eq!(client.from_rfc3339(&encoded).unwrap(), local);
    }
}
