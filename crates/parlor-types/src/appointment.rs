//! The slot-filling appointment record embedded in each call session.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Default appointment length when the service has no specific duration.
pub const DEFAULT_DURATION_MINUTES: i64 = 60;

/// The collectable appointment fields. Which of these are required is a
/// policy decision made by the conversation variant in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    Email,
    Phone,
    Gender,
    Service,
    Time,
}

/// A proposed appointment window pending caller confirmation.
///
/// Times are business-local wall-clock values; `free` reflects the last
/// availability check and is advisory, not authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub free: bool,
}

/// Fields extracted from a single utterance, already normalized. `None`
/// means "not mentioned this turn", never "clear the field".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub service: Option<String>,
    /// Canonical datetime text (ISO 8601) when a parse succeeded.
    pub datetime: Option<String>,
    /// The parsed business-local start time, when available.
    pub start: Option<NaiveDateTime>,
}

/// The booking record being filled over the course of a call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub service: Option<String>,
    /// The caller's time phrasing, verbatim. May be unparseable; the
    /// calendar write re-parses and substitutes a default if needed.
    pub time_text: Option<String>,
    /// Parsed business-local start time, when a parse succeeded.
    pub start: Option<NaiveDateTime>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub duration_minutes: Option<i64>,
    /// Availability-checked proposals offered to the caller, if any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidate_slots: Vec<Slot>,
}

/// A value counts as filled iff it is non-empty after trimming.
pub fn filled(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

impl Appointment {
    pub fn field_filled(&self, field: Field) -> bool {
        match field {
            Field::Name => filled(&self.name),
            Field::Email => filled(&self.email),
            Field::Phone => filled(&self.phone),
            Field::Gender => filled(&self.gender),
            Field::Service => filled(&self.service),
            Field::Time => self.start.is_some() || filled(&self.time_text),
        }
    }

    /// True when every field in `required` is filled.
    pub fn is_complete(&self, required: &[Field]) -> bool {
        required.iter().all(|f| self.field_filled(*f))
    }

    pub fn duration_minutes(&self) -> i64 {
        self.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES)
    }

    /// Merges extracted fields, overwriting only with non-empty values.
    pub fn merge(&mut self, partial: &ExtractedFields) {
        merge_field(&mut self.name, &partial.name);
        merge_field(&mut self.email, &partial.email);
        merge_field(&mut self.phone, &partial.phone);
        merge_field(&mut self.gender, &partial.gender);
        merge_field(&mut self.service, &partial.service);
        merge_field(&mut self.time_text, &partial.datetime);
        if let Some(start) = partial.start {
            self.start = Some(start);
        }
    }
}

fn merge_field(target: &mut Option<String>, incoming: &Option<String>) {
    if filled(incoming) {
        *target = incoming.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completeness_is_the_and_over_required_fields() {
        let mut appt = Appointment {
            service: Some("haircut".to_string()),
            time_text: Some("Wednesday at 3".to_string()),
            ..Default::default()
        };
        let required = [Field::Service, Field::Time, Field::Name];
        assert!(!appt.is_complete(&required));

        appt.name = Some("Ann".to_string());
        assert!(appt.is_complete(&required));
    }

    #[test]
    fn whitespace_only_fields_are_not_filled() {
        let appt = Appointment {
            name: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(!appt.field_filled(Field::Name));
    }

    #[test]
    fn time_counts_as_filled_with_either_raw_text_or_parsed_start() {
        let mut appt = Appointment::default();
        assert!(!appt.field_filled(Field::Time));

        appt.time_text = Some("sometime thursday".to_string());
        assert!(appt.field_filled(Field::Time));

        let mut appt = Appointment {
            start: "2026-09-02T15:00:00".parse().ok(),
            ..Default::default()
        };
        assert!(appt.field_filled(Field::Time));
        appt.start = None;
        assert!(!appt.field_filled(Field::Time));
    }

    #[test]
    fn duration_falls_back_to_global_default() {
        let appt = Appointment::default();
        assert_eq!(appt.duration_minutes(), DEFAULT_DURATION_MINUTES);

        let appt = Appointment {
            duration_minutes: Some(120),
            ..Default::default()
        };
        assert_eq!(appt.duration_minutes(), 120);
    }
}
