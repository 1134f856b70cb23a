// Response analysis for parcelprobe
// Heuristics for database errors and stack traces leaking through error bodies

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ProbeError;

lazy_static! {
    static ref LEAK_PATTERNS: Vec<(&'static str, Regex)> = vec![
        ("SQL syntax error", Regex::new(r"(?i)you have an error in your sql syntax|syntax error at or near|unclosed quotation mark").unwrap()),
        ("database driver error", Regex::new(r"(?i)\b(ORA-\d{5}|SQLSTATE\[|PG::\w+Error|SqlException|sqlite3?\.\w*Error)").unwrap()),
        ("MongoDB error", Regex::new(r"(?i)\b(MongoError|MongoServerError|CastError: Cast to ObjectId)").unwrap()),
        ("stack trace", Regex::new(r"(?m)(^\s+at [\w.$<>]+ \(.*:\d+:\d+\)|Traceback \(most recent call last\)|\.java:\d+\))").unwrap()),
    ];
}

/// Name the first leak signature found in a response body.
pub fn detect_leak(body: &str) -> Option<&'static str> {
    LEAK_PATTERNS
        .iter()
        .find(|(_, pattern)| pattern.is_match(body))
        .map(|(name, _)| *name)
}

pub fn expect_no_leak(body: &str) -> Result<(), ProbeError> {
    match detect_leak(body) {
        Some(kind) => Err(ProbeError::InformationLeak(kind.to_string())),
        None => Ok(()),
    }
}
