//! Variant A: rule-based keyword intent router with a sequential
//! service -> time -> name booking sub-flow, one question per turn.

use crate::intent::detect_intent;
use chrono::{Datelike, NaiveDateTime, Timelike};
use parlor_calendar::CalendarClient;
use parlor_nlp::extract_datetime;
use parlor_types::appointment::filled;
use parlor_types::{CallSession, Field, Intent, Slot, Stage, TurnOutcome};
use std::sync::Arc;

/// The keyword variant collects exactly these fields, in this order.
pub const KEYWORD_REQUIRED_FIELDS: &[Field] = &[Field::Service, Field::Time, Field::Name];

const SERVICES: [&str; 7] = [
    "haircut",
    "color",
    "balayage",
    "trim",
    "blowout",
    "treatment",
    "cut",
];

const INFO_LINE: &str = "We offer haircuts, color treatments, and blowouts. Prices start at \
     sixty five dollars and we are open from 9 AM to 7 PM Tuesday through Saturday. Would you \
     like to book a slot?";
const CANCEL_LINE: &str = "I can help with cancellations or reschedules. Please tell me the \
     name on the appointment and the time you would like to change.";
const MESSAGE_LINE: &str = "Sure, please tell me your name, number, and what this is \
     regarding, and I will pass the message along.";
const CLARIFY_LINE: &str = "I want to make sure I get this right. Could you rephrase or tell \
     me if you want to book, ask a question, or leave a message?";
const ASK_SERVICE_LINE: &str = "Absolutely. Which service would you like to schedule? We \
     offer haircuts, color sessions, and blowouts.";
const ASK_NAME_LINE: &str = "Perfect. What name should I put on that appointment?";
const NO_SLOTS_LINE: &str = "Thanks. I don't see those exact slots free. What day or time \
     generally works for you?";
const ALL_SET_LINE: &str = "You are all set. I will send over the confirmation right away.";

fn duration_for(service: &str) -> i64 {
    if service == "color" {
        120
    } else {
        60
    }
}

/// Rule-based conversation policy.
#[derive(Debug, Clone)]
pub struct KeywordPolicy {
    calendar: Arc<CalendarClient>,
}

impl KeywordPolicy {
    pub fn new(calendar: Arc<CalendarClient>) -> Self {
        Self { calendar }
    }

    pub async fn handle_turn(
        &self,
        session: &mut CallSession,
        utterance: &str,
        now: NaiveDateTime,
    ) -> TurnOutcome {
        let intent = detect_intent(utterance, session, KEYWORD_REQUIRED_FIELDS);
        match intent {
            Intent::Booking => self.booking_flow(session, utterance, now).await,
            Intent::Info => {
                session.last_intent = Some(Intent::Info);
                TurnOutcome::reply(INFO_LINE)
            }
            Intent::Cancel => {
                session.last_intent = Some(Intent::Cancel);
                TurnOutcome::reply(CANCEL_LINE)
            }
            Intent::Message => {
                session.last_intent = Some(Intent::Message);
                TurnOutcome::reply(MESSAGE_LINE)
            }
            Intent::Fallback => TurnOutcome::reply(CLARIFY_LINE),
        }
    }

    /// One question per turn, in the fixed order service -> time -> name.
    async fn booking_flow(
        &self,
        session: &mut CallSession,
        utterance: &str,
        now: NaiveDateTime,
    ) -> TurnOutcome {
        session.last_intent = Some(Intent::Booking);
        session.stage = Stage::Collecting;
        let normalized = utterance.to_lowercase();

        if !filled(&session.appointment.service) {
            let Some(service) = detect_service(&normalized) else {
                return TurnOutcome::reply(ASK_SERVICE_LINE);
            };
            session.appointment.service = Some(service.to_string());
            session.appointment.duration_minutes = Some(duration_for(service));

            let slots = self.calendar.propose_slots(duration_for(service), now).await;
            let free: Vec<Slot> = slots.into_iter().filter(|s| s.free).collect();
            if free.is_empty() {
                return TurnOutcome::reply(NO_SLOTS_LINE);
            }

            let phrases = free
                .iter()
                .map(|s| speak_datetime(s.start))
                .collect::<Vec<_>>()
                .join(" or ");
            session.appointment.candidate_slots = free;
            return TurnOutcome::reply(format!(
                "Great, a {}. I can offer {}. Which works for you?",
                service, phrases
            ));
        }

        if !session.appointment.field_filled(Field::Time) {
            let chosen = pick_candidate(&session.appointment.candidate_slots, &normalized)
                .or_else(|| extract_datetime(utterance, now));
            match chosen {
                Some(start) => {
                    session.appointment.start = Some(start);
                    session.appointment.time_text = Some(speak_datetime(start));
                }
                None => {
                    // Stored verbatim; the calendar write re-parses and
                    // substitutes a default if this never becomes usable.
                    let raw = utterance.trim();
                    session.appointment.time_text = Some(if raw.is_empty() {
                        "unspecified time".to_string()
                    } else {
                        raw.to_string()
                    });
                }
            }
            return TurnOutcome::reply(ASK_NAME_LINE);
        }

        if !filled(&session.appointment.name) {
            let name = utterance.trim();
            session.appointment.name = Some(if name.is_empty() {
                "guest".to_string()
            } else {
                name.to_string()
            });
            session.stage = Stage::Complete;

            let when = session
                .appointment
                .start
                .map(speak_datetime)
                .or_else(|| session.appointment.time_text.clone())
                .unwrap_or_else(|| "your requested time".to_string());
            return TurnOutcome::ending(format!(
                "Amazing, {}. I have you down for a {} on {}. You will get a confirmation \
                 shortly. Anything else I can help with?",
                session.appointment.name.as_deref().unwrap_or("guest"),
                session.appointment.service.as_deref().unwrap_or("service"),
                when
            ));
        }

        session.stage = Stage::Complete;
        TurnOutcome::ending(ALL_SET_LINE)
    }
}

fn detect_service(normalized: &str) -> Option<&'static str> {
    SERVICES.iter().copied().find(|s| normalized.contains(s))
}

const WEEKDAY_NAMES: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

/// Matches an utterance against previously proposed slots by weekday name
/// or an anchored spoken hour ("Wednesday works", "the 3 o'clock one",
/// "3pm is fine").
///
/// Naming a weekday that is not among the candidates returns `None`, so
/// explicit requests like "Friday at 3pm" reach the datetime extractor
/// instead of being captured by a candidate that shares a digit.
fn pick_candidate(candidates: &[Slot], normalized: &str) -> Option<NaiveDateTime> {
    for slot in candidates {
        let weekday = slot.start.format("%A").to_string().to_lowercase();
        if normalized.contains(&weekday) {
            return Some(slot.start);
        }
    }
    if WEEKDAY_NAMES.iter().any(|day| normalized.contains(day)) {
        return None;
    }

    for slot in candidates {
        let hour_12 = match slot.start.hour() % 12 {
            0 => 12,
            h => h,
        };
        let meridiem = if slot.start.hour() < 12 { "am" } else { "pm" };
        let spoken = [
            format!("{}{}", hour_12, meridiem),
            format!("{} {}", hour_12, meridiem),
            format!("{} o'clock", hour_12),
            format!("at {}", hour_12),
        ];
        if spoken.iter().any(|t| normalized.contains(t.as_str())) {
            return Some(slot.start);
        }
    }
    None
}

/// Formats a timestamp the way it should be spoken aloud:
/// "Wednesday, September 2 at 3:00 PM".
pub fn speak_datetime(value: NaiveDateTime) -> String {
    let hour_12 = match value.hour() % 12 {
        0 => 12,
        h => h,
    };
    let meridiem = if value.hour() < 12 { "AM" } else { "PM" };
    format!(
        "{}, {} {} at {}:{:02} {}",
        value.format("%A"),
        value.format("%B"),
        value.day(),
        hour_12,
        value.minute(),
        meridiem
    )
}
