// Attack payload generators for parcelprobe
//
// Every generator takes the canonical document it derives from and returns a
// new one built through the field mutator. Nothing here holds state between
// calls: randomness comes from the caller's RNG, dates from the caller's clock
// (or today's date for the convenience wrappers).

use chrono::{Duration, NaiveDate, Utc};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde_json::{json, Value};

use crate::document::{mutate_field, Document, MutationError};

/// Table named by the default injection string.
pub const SQL_INJECTION_TABLE: &str = "users";
/// `sql_injection_for(SQL_INJECTION_TABLE)`.
pub const SQL_INJECTION_PAYLOAD: &str = "'; DROP TABLE users; --";
pub const XSS_PAYLOAD: &str = "<script>alert('xss')</script>";

pub const DEFAULT_TARGET_FIELD: &str = "contactPerson.name";
pub const DESCRIPTION_FIELD: &str = "packageDetails.description";
pub const PARCEL_COUNT_FIELD: &str = "numberOfParcels";
pub const SCHEDULED_DATE_FIELD: &str = "scheduledDate";
pub const CONTACT_NAME_FIELD: &str = "contactPerson.name";
pub const CONTACT_PHONE_FIELD: &str = "contactPerson.phone";

pub const DEFAULT_OVERSIZE: usize = 10_000;
pub const OVERSIZE_FILL: char = 'A';
pub const PHONE_PREFIX: &str = "+20";
pub const PHONE_DIGITS: usize = 9;
const DATE_FORMAT: &str = "%Y-%m-%d";

/// SQL injection string dropping `table`.
pub fn sql_injection_for(table: &str) -> String {
    format!("'; DROP TABLE {}; --", table)
}

pub fn with_sql_injection(base: &Document, field_path: &str) -> Result<Document, MutationError> {
    with_sql_injection_on(base, field_path, SQL_INJECTION_TABLE)
}

/// Like [`with_sql_injection`], dropping `table` instead of the default one.
pub fn with_sql_injection_on(base: &Document, field_path: &str, table: &str) -> Result<Document, MutationError> {
    mutate_field(base, field_path, sql_injection_for(table))
}

pub fn with_xss(base: &Document, field_path: &str) -> Result<Document, MutationError> {
    mutate_field(base, field_path, XSS_PAYLOAD)
}

/// Put `size` repetitions of `'A'` at `field_path`. Size 0 sets an empty string.
pub fn with_oversized_field(base: &Document, field_path: &str, size: usize) -> Result<Document, MutationError> {
    let filler: String = std::iter::repeat(OVERSIZE_FILL).take(size).collect();
    mutate_field(base, field_path, filler)
}

/// Oversized `packageDetails.description`, created when the base lacks it.
pub fn with_oversized_description(base: &Document, size: usize) -> Result<Document, MutationError> {
    with_oversized_field(base, DESCRIPTION_FIELD, size)
}

pub fn with_invalid_parcel_count(base: &Document, value: impl Into<Value>) -> Result<Document, MutationError> {
    mutate_field(base, PARCEL_COUNT_FIELD, value)
}

/// Out-of-range and wrong-typed parcel counts.
pub fn invalid_parcel_counts() -> Vec<Value> {
    vec![json!(-1), json!(0), json!(1_000_000_000), json!("three"), Value::Null]
}

/// `scheduledDate` set to `today` shifted by `days` (negative for the past).
pub fn with_scheduled_date_from(base: &Document, today: NaiveDate, days: i64) -> Result<Document, MutationError> {
    let date = today + Duration::days(days);
    mutate_field(base, SCHEDULED_DATE_FIELD, date.format(DATE_FORMAT).to_string())
}

pub fn with_future_date(base: &Document, days: i64) -> Result<Document, MutationError> {
    with_scheduled_date_from(base, Utc::now().date_naive(), days)
}

pub fn with_past_date(base: &Document, days: i64) -> Result<Document, MutationError> {
    with_scheduled_date_from(base, Utc::now().date_naive(), -days)
}

pub fn random_string<R: Rng + ?Sized>(rng: &mut R, length: usize) -> String {
    (0..length).map(|_| rng.sample(Alphanumeric) as char).collect()
}

/// `+20` followed by nine random digits.
pub fn random_phone<R: Rng + ?Sized>(rng: &mut R) -> String {
    let digits: String = (0..PHONE_DIGITS)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect();
    format!("{}{}", PHONE_PREFIX, digits)
}

/// Randomised contact name and phone.
pub fn with_random_contact<R: Rng + ?Sized>(base: &Document, rng: &mut R) -> Result<Document, MutationError> {
    let named = mutate_field(base, CONTACT_NAME_FIELD, random_string(rng, 10))?;
    mutate_field(&named, CONTACT_PHONE_FIELD, random_phone(rng))
}

/// Injection strings for email-style inputs.
pub fn sql_injection_payloads() -> Vec<&'static str> {
    vec![
        "' OR '1'='1",
        "' OR '1'='1'--",
        "admin'--",
        "' OR 1=1#",
        "'; DROP TABLE users; --",
        "' UNION SELECT NULL,NULL,NULL--",
        "' AND SLEEP(5)--",
        "'; WAITFOR DELAY '0:0:5'--",
        "test@example.com' OR '1'='1",
        "test@example.com'; SELECT pg_sleep(5)--",
        "\" OR \"\"=\"",
        "{\"$gt\": \"\"}",
    ]
}

/// Malformed emails grouped by the kind of input they exercise.
pub fn special_char_payloads() -> Vec<(&'static str, Vec<String>)> {
    vec![
        (
            "special_characters",
            vec![
                "user<>@example.com".to_string(),
                "user;@example.com".to_string(),
                "user\"quoted\"@example.com".to_string(),
                "user@exa mple.com".to_string(),
                "user@example..com".to_string(),
            ],
        ),
        (
            "unicode",
            vec![
                "üser@exämple.com".to_string(),
                "user@例え.jp".to_string(),
                "user\u{202e}moc.elpmaxe@".to_string(),
            ],
        ),
        (
            "null_bytes",
            vec![
                "user\u{0}@example.com".to_string(),
                "user@example.com\u{0}".to_string(),
                "user%00@example.com".to_string(),
            ],
        ),
        (
            "malformed_format",
            vec![
                "".to_string(),
                "plainaddress".to_string(),
                "@example.com".to_string(),
                "user@".to_string(),
                "user@@example.com".to_string(),
            ],
        ),
        (
            "oversized",
            vec![format!("{}@example.com", "a".repeat(320))],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::get_field;
    use crate::fixtures::Fixtures;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use regex::Regex;

    fn pickup() -> Document {
        Fixtures::bundled().unwrap().valid_pickup().unwrap()
    }

    #[test]
    fn sql_injection_targets_nested_field() {
        let base = pickup();
        let payload = with_sql_injection(&base, "contactPerson.name").unwrap();
        assert_eq!(get_field(&payload, "contactPerson.name"), Some(&json!(SQL_INJECTION_PAYLOAD)));
        assert_ne!(base, payload);
        assert_eq!(sql_injection_for("pickups"), "'; DROP TABLE pickups; --");
    }

    #[test]
    fn default_injection_drops_the_users_table() {
        assert_eq!(sql_injection_for(SQL_INJECTION_TABLE), SQL_INJECTION_PAYLOAD);

        let payload = with_sql_injection_on(&pickup(), DEFAULT_TARGET_FIELD, "pickups").unwrap();
        assert_eq!(get_field(&payload, DEFAULT_TARGET_FIELD), Some(&json!("'; DROP TABLE pickups; --")));
    }

    #[test]
    fn xss_targets_top_level_field() {
        let payload = with_xss(&pickup(), "businessLocationId").unwrap();
        assert_eq!(payload["businessLocationId"], json!(XSS_PAYLOAD));
    }

    #[test]
    fn oversized_description_is_created() {
        let base = pickup();
        assert!(base.get("packageDetails").is_none());
        let payload = with_oversized_description(&base, DEFAULT_OVERSIZE).unwrap();
        let description = get_field(&payload, DESCRIPTION_FIELD).and_then(Value::as_str).unwrap();
        assert_eq!(description.len(), DEFAULT_OVERSIZE);
        assert!(description.chars().all(|c| c == 'A'));
    }

    #[test]
    fn oversized_zero_is_empty_not_absent() {
        let payload = with_oversized_description(&pickup(), 0).unwrap();
        assert_eq!(get_field(&payload, DESCRIPTION_FIELD), Some(&json!("")));
    }

    #[test]
    fn invalid_parcel_counts_cover_types() {
        let base = pickup();
        for value in invalid_parcel_counts() {
            let payload = with_invalid_parcel_count(&base, value.clone()).unwrap();
            assert_eq!(payload[PARCEL_COUNT_FIELD], value);
        }
        assert!(invalid_parcel_counts().iter().any(Value::is_string));
    }

    #[test]
    fn scheduled_date_shifts() {
        let today = NaiveDate::from_ymd_opt(2026, 2, 27).unwrap();
        let future = with_scheduled_date_from(&pickup(), today, 2).unwrap();
        assert_eq!(future[SCHEDULED_DATE_FIELD], json!("2026-03-01"));
        let past = with_scheduled_date_from(&pickup(), today, -1).unwrap();
        assert_eq!(past[SCHEDULED_DATE_FIELD], json!("2026-02-26"));
    }

    #[test]
    fn past_date_is_before_future_date() {
        let base = pickup();
        let past = with_past_date(&base, 1).unwrap();
        let future = with_future_date(&base, 2).unwrap();
        let past = past[SCHEDULED_DATE_FIELD].as_str().unwrap().to_string();
        let future = future[SCHEDULED_DATE_FIELD].as_str().unwrap().to_string();
        assert!(past < future);
    }

    #[test]
    fn random_contact_respects_phone_format() {
        let mut rng = StdRng::seed_from_u64(7);
        let phone_format = Regex::new(r"^\+20\d{9}$").unwrap();
        let base = pickup();
        for _ in 0..20 {
            let payload = with_random_contact(&base, &mut rng).unwrap();
            let phone = get_field(&payload, CONTACT_PHONE_FIELD).and_then(Value::as_str).unwrap();
            let name = get_field(&payload, CONTACT_NAME_FIELD).and_then(Value::as_str).unwrap();
            assert!(phone_format.is_match(phone), "bad phone {}", phone);
            assert_eq!(name.len(), 10);
            assert!(name.chars().all(|c| c.is_ascii_alphanumeric()));
        }
        assert_eq!(get_field(&base, CONTACT_PHONE_FIELD), Some(&json!("+201001234567")));
    }

    #[test]
    fn catalogues_are_populated() {
        assert!(sql_injection_payloads().contains(&SQL_INJECTION_PAYLOAD));
        let categories: Vec<&str> = special_char_payloads().iter().map(|(c, _)| *c).collect();
        assert_eq!(categories, vec!["special_characters", "unicode", "null_bytes", "malformed_format", "oversized"]);
        assert!(special_char_payloads().iter().all(|(_, p)| !p.is_empty()));
    }
}
