//! Tolerant parsing of free-form caller speech into structured fields.
//!
//! The datetime extractor turns phrases like "tomorrow at 3pm" or "next
//! Wednesday" into an absolute business-local timestamp, biased toward
//! future dates. Ambiguous input yields `None`; callers choose their own
//! fallback policy rather than the extractor guessing silently.

pub mod datetime;
pub mod fields;

pub use datetime::{default_fallback_start, extract_datetime, format_iso, next_weekday_at};
pub use fields::{normalize_email, normalize_name, normalize_phone};
