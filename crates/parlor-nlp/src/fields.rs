//! Normalization of extracted contact fields.
//!
//! Applied to assistant-extracted values before they are merged into the
//! appointment record, so downstream consumers (calendar, messaging) see
//! one canonical form.

/// Title-cases each space-delimited token: "ann marie" -> "Ann Marie".
pub fn normalize_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let name = trimmed
        .split_whitespace()
        .map(|token| {
            let mut chars = token.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    Some(name)
}

/// Trims and lowercases. Anything without an `@` is rejected.
pub fn normalize_email(raw: &str) -> Option<String> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return None;
    }
    Some(email)
}

/// Normalizes a phone number to `+`-prefixed digits-only canonical form.
///
/// A bare 10-digit number gets the default country code; an 11-digit
/// number already starting with the country code just gains the `+`.
pub fn normalize_phone(raw: &str, default_country_code: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }

    if trimmed.starts_with('+') {
        return Some(format!("+{}", digits));
    }
    if digits.len() == 10 {
        return Some(format!("+{}{}", default_country_code, digits));
    }
    if digits.len() == 11 && digits.starts_with(default_country_code) {
        return Some(format!("+{}", digits));
    }
    Some(format!("+{}", digits))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_title_cased_per_token() {
        assert_eq!(normalize_name("ann marie").as_deref(), Some("Ann Marie"));
        assert_eq!(normalize_name("  BOB  ").as_deref(), Some("Bob"));
        assert_eq!(normalize_name(""), None);
        assert_eq!(normalize_name("   "), None);
    }

    #[test]
    fn emails_are_trimmed_and_lowercased() {
        assert_eq!(
            normalize_email("  Ann@Example.COM ").as_deref(),
            Some("ann@example.com")
        );
        assert_eq!(normalize_email("not-an-email"), None);
        assert_eq!(normalize_email(""), None);
    }

    #[test]
    fn ten_digit_phone_gains_default_country_code() {
        assert_eq!(
            normalize_phone("(555) 123-4567", "1").as_deref(),
            Some("+15551234567")
        );
    }

    #[test]
    fn eleven_digit_phone_with_country_code_gains_plus_only() {
        assert_eq!(
            normalize_phone("1 555 123 4567", "1").as_deref(),
            Some("+15551234567")
        );
    }

    #[test]
    fn plus_prefixed_numbers_keep_their_digits() {
        assert_eq!(
            normalize_phone("+44 20 7946 0958", "1").as_deref(),
            Some("+442079460958")
        );
    }

    #[test]
    fn digitless_input_is_rejected() {
        assert_eq!(normalize_phone("call me maybe", "1"), None);
    }
}
