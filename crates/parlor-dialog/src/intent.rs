//! Keyword-based intent classification.

use parlor_types::{CallSession, Field, Intent};

const BOOKING_WORDS: [&str; 4] = ["book", "appointment", "schedule", "reserve"];
const INFO_WORDS: [&str; 5] = ["price", "cost", "service", "hours", "open"];
const CANCEL_WORDS: [&str; 4] = ["cancel", "reschedule", "change", "move"];
const MESSAGE_WORDS: [&str; 2] = ["message", "voicemail"];

/// Classifies an utterance.
///
/// Once a booking has started and is still incomplete, every utterance is
/// a continuation of the booking flow regardless of keywords: short
/// replies like "Thursday" must not be re-classified from scratch.
/// Otherwise vocabularies match in priority order, first hit wins.
pub fn detect_intent(utterance: &str, session: &CallSession, required: &[Field]) -> Intent {
    if session.last_intent == Some(Intent::Booking) && !session.appointment.is_complete(required) {
        return Intent::Booking;
    }

    let normalized = utterance.to_lowercase();
    if contains_any(&normalized, &BOOKING_WORDS) {
        Intent::Booking
    } else if contains_any(&normalized, &INFO_WORDS) {
        Intent::Info
    } else if contains_any(&normalized, &CANCEL_WORDS) {
        Intent::Cancel
    } else if contains_any(&normalized, &MESSAGE_WORDS) {
        Intent::Message
    } else {
        Intent::Fallback
    }
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyword::KEYWORD_REQUIRED_FIELDS;

    #[test]
    fn keywords_route_in_priority_order() {
        let session = CallSession::new("CA1");
        let detect = |text: &str| detect_intent(text, &session, KEYWORD_REQUIRED_FIELDS);

        assert_eq!(detect("I'd like to book a haircut"), Intent::Booking);
        assert_eq!(detect("what are your prices?"), Intent::Info);
        assert_eq!(detect("I need to cancel"), Intent::Cancel);
        assert_eq!(detect("can I leave a message"), Intent::Message);
        assert_eq!(detect("ummm"), Intent::Fallback);
    }

    #[test]
    fn booking_intent_is_sticky_while_incomplete() {
        let mut session = CallSession::new("CA1");
        session.last_intent = Some(Intent::Booking);
        session.appointment.service = Some("haircut".to_string());

        // Even a cancel keyword stays in the booking flow.
        assert_eq!(
            detect_intent("actually cancel that", &session, KEYWORD_REQUIRED_FIELDS),
            Intent::Booking
        );
    }

    #[test]
    fn completed_booking_releases_the_sticky_intent() {
        let mut session = CallSession::new("CA1");
        session.last_intent = Some(Intent::Booking);
        session.appointment.service = Some("haircut".to_string());
        session.appointment.time_text = Some("Wednesday at 3".to_string());
        session.appointment.name = Some("Ann".to_string());

        assert_eq!(
            detect_intent("cancel it", &session, KEYWORD_REQUIRED_FIELDS),
            Intent::Cancel
        );
    }
}
