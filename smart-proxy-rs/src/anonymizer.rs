//! # PII Anonymizer
//!
//! Redacts personally identifiable information from JSON payloads before they are handed to
//! any backend client. Mapping keys and sequence order are preserved; only string leaves change.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b").expect("email pattern")
});

// 13 to 16 contiguous digits, 4-4-4-(1..4) groups with one separator throughout, or 4-6-5
static CREDIT_CARD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"\b(?:\d{13,16}",
        r"|\d{4}(?: \d{4}){2} \d{1,4}",
        r"|\d{4}(?:-\d{4}){2}-\d{1,4}",
        r"|\d{4}[ -]\d{6}[ -]\d{5})\b",
    ))
    .expect("card pattern")
});

static SSN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").expect("ssn pattern"));

static PHONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"\+\d{1,3}[\s.-]?(?:\(\d{3}\)|\d{3})[\s.-]?\d{3}[\s.-]?\d{4}\b",
        r"|(?:\b\d{1,3}[\s.-])?(?:\(\d{3}\)|\b\d{3})[\s.-]?\d{3}[\s.-]?\d{4}\b",
    ))
    .expect("phone pattern")
});

/// Pattern table, in application order. Longer digit runs go first so a card number is never
/// half-claimed by the phone pattern.
static PATTERNS: Lazy<[(&'static Lazy<Regex>, &'static str); 4]> = Lazy::new(|| {
    [
        (&EMAIL, "[EMAIL]"),
        (&CREDIT_CARD, "[CREDIT_CARD]"),
        (&SSN, "[SSN]"),
        (&PHONE, "[PHONE]"),
    ]
});

/// Replace every recognized PII match in `text` with its category label
pub fn anonymize_text(text: &str) -> String {
    let mut out = text.to_string();
    for (pattern, label) in PATTERNS.iter() {
        if pattern.is_match(&out) {
            out = pattern.replace_all(&out, *label).into_owned();
        }
    }
    out
}

/// Return a redacted copy of `value`
pub fn anonymize(value: &Value) -> Value {
    let mut copy = value.clone();
    anonymize_in_place(&mut copy);
    copy
}

/// Redact string leaves of `value` in place
pub fn anonymize_in_place(value: &mut Value) {
    match value {
        Value::String(s) => {
            let redacted = anonymize_text(s);
            if redacted != *s {
                *s = redacted;
            }
        }
        Value::Array(items) => {
            for item in items {
                anonymize_in_place(item);
            }
        }
        Value::Object(map) => {
            for (_, item) in map.iter_mut() {
                anonymize_in_place(item);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_email() {
        let out = anonymize_text("My email is test@example.com");
        assert_eq!(out, "My email is [EMAIL]");

        let out = anonymize_text("Write to John.Doe+bank@Mail.Example.ORG today");
        assert_eq!(out, "Write to [EMAIL] today");
    }

    #[test]
    fn test_phone_shapes() {
        for phone in [
            "555-123-4567",
            "555.123.4567",
            "(555) 123-4567",
            "+1 555 123 4567",
            "+44 (555) 123-4567",
            "1-555-123-4567",
        ] {
            let out = anonymize_text(&format!("call {} now", phone));
            assert_eq!(out, "call [PHONE] now", "phone shape {}", phone);
        }
    }

    #[test]
    fn test_ssn_and_card() {
        assert_eq!(anonymize_text("ssn 123-45-6789"), "ssn [SSN]");
        assert_eq!(anonymize_text("card 4111 1111 1111 1111"), "card [CREDIT_CARD]");
        assert_eq!(anonymize_text("card 4111-1111-1111-1111."), "card [CREDIT_CARD].");
        assert_eq!(anonymize_text("amex 378282246310005"), "amex [CREDIT_CARD]");
    }

    #[test]
    fn test_adjacent_numbers_keep_their_own_labels() {
        assert_eq!(
            anonymize_text("phones 555-123-4567 555-765-4321"),
            "phones [PHONE] [PHONE]"
        );
        assert_eq!(anonymize_text("ssn 123-45-6789 1234"), "ssn [SSN] 1234");
        assert_eq!(anonymize_text("call 555-123-4567 1234 now"), "call [PHONE] 1234 now");
        assert_eq!(
            anonymize_text("cards 4111 1111 1111 1111 5500 0000 0000 0004"),
            "cards [CREDIT_CARD] [CREDIT_CARD]"
        );
        assert_eq!(
            anonymize_text("4111-1111-1111-1111 123-45-6789"),
            "[CREDIT_CARD] [SSN]"
        );
    }

    #[test]
    fn test_mixed_separators_are_not_a_card() {
        let out = anonymize_text("ref 4111 1111-1111 1111");
        assert!(!out.contains("[CREDIT_CARD]"));
        assert_eq!(anonymize_text("amex 3782 822463 10005"), "amex [CREDIT_CARD]");
    }

    #[test]
    fn test_all_categories_in_one_string() {
        let out = anonymize_text("a@b.io, 555-123-4567, 123-45-6789, 4111111111111111");
        assert_eq!(out, "[EMAIL], [PHONE], [SSN], [CREDIT_CARD]");
    }

    #[test]
    fn test_plain_numbers_untouched() {
        let text = "Order 42 shipped in 2024 for $1,250.00";
        assert_eq!(anonymize_text(text), text);
    }

    #[test]
    fn test_structure_preserved() {
        let input = json!({
            "zeta": "reach me at me@home.net",
            "alpha": [1, true, null, "555-123-4567", {"nested": "123-45-6789"}],
            "mid": 3.5
        });

        let out = anonymize(&input);
        assert_eq!(
            out,
            json!({
                "zeta": "reach me at [EMAIL]",
                "alpha": [1, true, null, "[PHONE]", {"nested": "[SSN]"}],
                "mid": 3.5
            })
        );

        let keys: Vec<&String> = out.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_idempotent() {
        let input = json!(["x@y.com", "+1 555 123 4567", "123-45-6789", "4111 1111 1111 1111"]);
        let once = anonymize(&input);
        let twice = anonymize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_scalars_pass_through() {
        for value in [json!(null), json!(true), json!(12345678901234u64), json!(-1.5)] {
            assert_eq!(anonymize(&value), value);
        }
    }
}
