//! Deterministic candidate slots and the busy-interval overlap test.

use chrono::{Duration, NaiveDateTime, Weekday};
use parlor_nlp::next_weekday_at;
use parlor_types::Slot;

/// A busy window reported by the calendar provider, in business-local time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BusyInterval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Fixed weekday/hour rules for proposed appointment starts: next
/// Wednesday at 3 PM and next Thursday at 5 PM.
const CANDIDATE_RULES: [(Weekday, u32, u32); 2] = [(Weekday::Wed, 15, 0), (Weekday::Thu, 17, 0)];

/// Builds the candidate slots for an appointment of `duration_minutes`,
/// all marked free; availability is applied separately.
pub fn candidate_slots(reference_now: NaiveDateTime, duration_minutes: i64) -> Vec<Slot> {
    CANDIDATE_RULES
        .iter()
        .map(|&(weekday, hour, minute)| {
            let start = next_weekday_at(reference_now, weekday, hour, minute);
            Slot {
                start,
                end: start + Duration::minutes(duration_minutes),
                free: true,
            }
        })
        .collect()
}

/// Marks each slot free iff it overlaps no busy interval. Intervals are
/// half-open: a slot ending exactly when a busy window starts does not
/// conflict.
pub fn mark_availability(slots: &mut [Slot], busy: &[BusyInterval]) {
    for slot in slots.iter_mut() {
        slot.free = !busy
            .iter()
            .any(|b| slot.start < b.end && slot.end > b.start);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> NaiveDateTime {
        s.parse().unwrap()
    }

    fn slot(start: &str, end: &str) -> Slot {
        Slot {
            start: t(start),
            end: t(end),
            free: true,
        }
    }

    #[test]
    fn overlapping_busy_interval_marks_slot_unavailable() {
        let mut slots = vec![slot("2026-09-02T10:00:00", "2026-09-02T11:00:00")];
        let busy = [BusyInterval {
            start: t("2026-09-02T10:30:00"),
            end: t("2026-09-02T10:45:00"),
        }];
        mark_availability(&mut slots, &busy);
        assert!(!slots[0].free);
    }

    #[test]
    fn adjacent_busy_interval_does_not_conflict() {
        let mut slots = vec![slot("2026-09-02T10:00:00", "2026-09-02T11:00:00")];
        let busy = [BusyInterval {
            start: t("2026-09-02T11:00:00"),
            end: t("2026-09-02T12:00:00"),
        }];
        mark_availability(&mut slots, &busy);
        assert!(slots[0].free);
    }

    #[test]
    fn no_busy_intervals_leaves_everything_free() {
        let mut slots = vec![
            slot("2026-09-02T15:00:00", "2026-09-02T16:00:00"),
            slot("2026-09-03T17:00:00", "2026-09-03T18:00:00"),
        ];
        mark_availability(&mut slots, &[]);
        assert!(slots.iter().all(|s| s.free));
    }

    #[test]
    fn candidates_follow_the_fixed_weekday_rules() {
        // A Tuesday morning.
        let now = t("2026-08-25T10:00:00");
        let slots = candidate_slots(now, 120);
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].start, t("2026-08-26T15:00:00"));
        assert_eq!(slots[0].end, t("2026-08-26T17:00:00"));
        assert_eq!(slots[1].start, t("2026-08-27T17:00:00"));
        assert_eq!(slots[1].end, t("2026-08-27T19:00:00"));
    }
}
