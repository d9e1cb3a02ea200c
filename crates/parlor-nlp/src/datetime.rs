//! Natural-language date/time extraction.
//!
//! All times are business-local wall-clock values (`NaiveDateTime`); the
//! caller supplies `reference_now` in the same frame. Extraction is
//! side-effect free and deterministic for a fixed reference instant.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

/// Hour used when a phrase names a day but no time ("next Wednesday").
const DEFAULT_HOUR: u32 = 12;

/// Extracts an absolute timestamp from a free-form phrase.
///
/// Accepts machine-formatted ISO 8601 timestamps round-trip, relative
/// day words ("today", "tomorrow"), weekday names (resolved to the next
/// upcoming occurrence, never a past one), and clock times ("3pm",
/// "3:30 pm", "15:00", "at 3"). Returns `None` when neither a day nor a
/// time can be recognized.
pub fn extract_datetime(text: &str, reference_now: NaiveDateTime) -> Option<NaiveDateTime> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(parsed) = parse_machine_timestamp(trimmed) {
        return Some(parsed);
    }

    let lowered = trimmed.to_lowercase();
    let tokens: Vec<&str> = lowered
        .split(|c: char| c.is_whitespace() || matches!(c, ',' | '.' | '!' | '?'))
        .filter(|t| !t.is_empty())
        .collect();

    let date = find_date(&tokens, reference_now);
    let time = find_time(&tokens);

    match (date, time) {
        (Some(date), Some(time)) => Some(date.and_time(time)),
        (Some(date), None) => {
            date.and_hms_opt(DEFAULT_HOUR, 0, 0)
        }
        (None, Some(time)) => {
            // Time only: today if still ahead of us, otherwise tomorrow.
            let today = reference_now.date().and_time(time);
            if today > reference_now {
                Some(today)
            } else {
                Some(today + Duration::days(1))
            }
        }
        (None, None) => None,
    }
}

/// Formats a timestamp in the extractor's canonical form, which
/// [`extract_datetime`] accepts back unchanged.
pub fn format_iso(value: NaiveDateTime) -> String {
    value.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// The next occurrence of `weekday` at the given wall-clock time, always
/// strictly in the future (1..=7 days ahead of `reference_now`'s date).
pub fn next_weekday_at(
    reference_now: NaiveDateTime,
    weekday: Weekday,
    hour: u32,
    minute: u32,
) -> NaiveDateTime {
    let today = reference_now.date();
    let mut days_ahead = (weekday.num_days_from_monday() as i64
        - today.weekday().num_days_from_monday() as i64)
        .rem_euclid(7);
    if days_ahead == 0 {
        days_ahead = 7;
    }
    (today + Duration::days(days_ahead))
        .and_hms_opt(hour, minute, 0)
        .expect("valid wall-clock time")
}

/// Deterministic default used when a stored time phrase still fails to
/// parse at calendar-write time: next Wednesday at 15:00.
pub fn default_fallback_start(reference_now: NaiveDateTime) -> NaiveDateTime {
    next_weekday_at(reference_now, Weekday::Wed, 15, 0)
}

fn parse_machine_timestamp(text: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = text.parse::<NaiveDateTime>() {
        return Some(dt);
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M").ok()
}

fn find_date(tokens: &[&str], reference_now: NaiveDateTime) -> Option<NaiveDate> {
    for token in tokens {
        match *token {
            "today" | "tonight" => return Some(reference_now.date()),
            "tomorrow" => return Some(reference_now.date() + Duration::days(1)),
            _ => {}
        }
        if let Some(weekday) = weekday_from_token(token) {
            return Some(next_weekday_at(reference_now, weekday, 0, 0).date());
        }
    }
    None
}

fn weekday_from_token(token: &str) -> Option<Weekday> {
    match token {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" | "tues" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" | "thurs" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

fn find_time(tokens: &[&str]) -> Option<NaiveTime> {
    for (i, token) in tokens.iter().enumerate() {
        match *token {
            "noon" | "midday" => return NaiveTime::from_hms_opt(12, 0, 0),
            "midnight" => return NaiveTime::from_hms_opt(0, 0, 0),
            _ => {}
        }

        // "3pm", "3:30pm"
        if let Some(stripped) = token.strip_suffix("pm") {
            if let Some((h, m)) = parse_clock(stripped) {
                return to_time(h, m, Some(Meridiem::Pm));
            }
        }
        if let Some(stripped) = token.strip_suffix("am") {
            if let Some((h, m)) = parse_clock(stripped) {
                return to_time(h, m, Some(Meridiem::Am));
            }
        }

        if let Some((h, m)) = parse_clock(token) {
            // "3 pm" / "3:30 am" with the meridiem as its own token.
            let meridiem = match tokens.get(i + 1).copied() {
                Some("pm") | Some("p") => Some(Meridiem::Pm),
                Some("am") | Some("a") => Some(Meridiem::Am),
                _ => None,
            };
            if meridiem.is_some() {
                return to_time(h, m, meridiem);
            }
            // 24-hour clock, written with minutes ("15:00").
            if token.contains(':') {
                return to_time(h, m, None);
            }
            // Bare hour after "at" ("at 3"). Callers are booking within
            // business hours, so small hours read as afternoon.
            if i > 0 && tokens[i - 1] == "at" {
                let meridiem = if (1..=7).contains(&h) {
                    Some(Meridiem::Pm)
                } else {
                    None
                };
                return to_time(h, m, meridiem);
            }
        }
    }
    None
}

#[derive(Clone, Copy, PartialEq)]
enum Meridiem {
    Am,
    Pm,
}

/// Parses "3" or "3:30" into (hour, minute). Rejects anything non-numeric.
fn parse_clock(token: &str) -> Option<(u32, u32)> {
    if token.is_empty() {
        return None;
    }
    let (hour_part, minute_part) = match token.split_once(':') {
        Some((h, m)) => (h, Some(m)),
        None => (token, None),
    };
    let hour: u32 = hour_part.parse().ok()?;
    let minute: u32 = match minute_part {
        Some(m) => m.parse().ok()?,
        None => 0,
    };
    (hour <= 23 && minute <= 59).then_some((hour, minute))
}

fn to_time(hour: u32, minute: u32, meridiem: Option<Meridiem>) -> Option<NaiveTime> {
    let hour = match meridiem {
        Some(Meridiem::Pm) if hour < 12 => hour + 12,
        Some(Meridiem::Am) if hour == 12 => 0,
        _ => hour,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> NaiveDateTime {
        // A Tuesday.
        "2026-08-25T10:00:00".parse().unwrap()
    }

    #[test]
    fn bare_weekday_resolves_to_next_upcoming_occurrence() {
        let parsed = extract_datetime("Wednesday", now()).unwrap();
        assert_eq!(format_iso(parsed), "2026-08-26T12:00:00");
    }

    #[test]
    fn same_weekday_lands_a_full_week_ahead_never_today() {
        let parsed = extract_datetime("tuesday", now()).unwrap();
        assert_eq!(format_iso(parsed), "2026-09-01T12:00:00");
    }

    #[test]
    fn tomorrow_with_clock_time() {
        let parsed = extract_datetime("tomorrow at 3pm", now()).unwrap();
        assert_eq!(format_iso(parsed), "2026-08-26T15:00:00");
    }

    #[test]
    fn weekday_with_minutes_and_split_meridiem() {
        let parsed = extract_datetime("next Thursday at 5:30 pm please", now()).unwrap();
        assert_eq!(format_iso(parsed), "2026-08-27T17:30:00");
    }

    #[test]
    fn time_only_in_the_past_rolls_to_tomorrow() {
        let parsed = extract_datetime("9am", now()).unwrap();
        assert_eq!(format_iso(parsed), "2026-08-26T09:00:00");

        let parsed = extract_datetime("11am", now()).unwrap();
        assert_eq!(format_iso(parsed), "2026-08-25T11:00:00");
    }

    #[test]
    fn twenty_four_hour_clock_is_accepted() {
        let parsed = extract_datetime("friday 15:00", now()).unwrap();
        assert_eq!(format_iso(parsed), "2026-08-28T15:00:00");
    }

    #[test]
    fn canonical_output_reparses_to_the_same_instant() {
        let first = extract_datetime("tomorrow at 3pm", now()).unwrap();
        let reparsed = extract_datetime(&format_iso(first), now()).unwrap();
        assert_eq!(first, reparsed);
    }

    #[test]
    fn rfc3339_passes_through() {
        let parsed = extract_datetime("2026-09-02T15:00:00-04:00", now()).unwrap();
        assert_eq!(format_iso(parsed), "2026-09-02T15:00:00");
    }

    #[test]
    fn unparseable_input_yields_none() {
        assert_eq!(extract_datetime("whenever works for you", now()), None);
        assert_eq!(extract_datetime("", now()), None);
        assert_eq!(extract_datetime("   ", now()), None);
    }

    #[test]
    fn fallback_start_is_next_wednesday_afternoon() {
        let fallback = default_fallback_start(now());
        assert_eq!(format_iso(fallback), "2026-08-26T15:00:00");
    }
}
