// Verdicts and response assertions for parcelprobe
// Turns observed status codes and error codes into pass/fail decisions

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::error::ProbeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// The probe's expectation held.
    Secure,
    /// The probe observed the weakness it looks for.
    Vulnerable,
    /// The probe could not decide (transport failure, unparsable body, ...).
    Uncertain,
    /// The probe was not run.
    Skipped,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Secure => write!(f, "SECURE"),
            Verdict::Vulnerable => write!(f, "VULNERABLE"),
            Verdict::Uncertain => write!(f, "UNCERTAIN"),
            Verdict::Skipped => write!(f, "SKIPPED"),
        }
    }
}

fn describe(expected: &[u16]) -> String {
    let codes: Vec<String> = expected.iter().map(u16::to_string).collect();
    match codes.len() {
        1 => codes[0].clone(),
        _ => format!("one of [{}]", codes.join(", ")),
    }
}

pub fn expect_status(actual: u16, expected: &[u16]) -> Result<(), ProbeError> {
    if expected.contains(&actual) {
        Ok(())
    } else {
        Err(ProbeError::UnexpectedStatus { expected: describe(expected), actual })
    }
}

/// The request must be rejected as a client error (4xx).
pub fn expect_client_error(actual: u16) -> Result<(), ProbeError> {
    if (400..500).contains(&actual) {
        Ok(())
    } else {
        Err(ProbeError::UnexpectedStatus { expected: "4xx".to_string(), actual })
    }
}

/// The request may be accepted or rejected, but must not crash the server.
pub fn expect_no_server_error(actual: u16) -> Result<(), ProbeError> {
    if actual < 500 {
        Ok(())
    } else {
        Err(ProbeError::UnexpectedStatus { expected: "< 500".to_string(), actual })
    }
}

pub fn expect_rejected(actual: u16) -> Result<(), ProbeError> {
    if actual >= 400 {
        Ok(())
    } else {
        Err(ProbeError::UnexpectedStatus { expected: ">= 400".to_string(), actual })
    }
}

/// Render an `errorCode` field the way it appears in responses, empty when absent.
pub fn error_code_text(code: Option<&Value>) -> String {
    match code {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

pub fn expect_error_code(body: &Value, expected: i64) -> Result<(), ProbeError> {
    let actual = body.get("errorCode");
    let matches = match actual {
        Some(Value::Number(n)) => n.as_i64() == Some(expected),
        Some(Value::String(s)) => s.trim() == expected.to_string(),
        _ => false,
    };
    if matches {
        Ok(())
    } else {
        Err(ProbeError::UnexpectedErrorCode {
            expected,
            actual: match actual {
                None => "<missing>".to_string(),
                Some(v) => error_code_text(Some(v)),
            },
        })
    }
}

/// Status plus application error code: what an attacker can tell apart.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResponsePattern {
    pub status: u16,
    pub error_code: String,
}

impl ResponsePattern {
    pub fn new(status: u16, body: Option<&Value>) -> Self {
        Self {
            status,
            error_code: error_code_text(body.and_then(|b| b.get("errorCode"))),
        }
    }
}

impl fmt::Display for ResponsePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.error_code.is_empty() {
            write!(f, "{}", self.status)
        } else {
            write!(f, "{} (errorCode {})", self.status, self.error_code)
        }
    }
}

/// Every malformed input must be answered the same way.
pub fn expect_consistent(patterns: &BTreeSet<ResponsePattern>) -> Result<(), ProbeError> {
    if patterns.len() == 1 {
        Ok(())
    } else {
        Err(ProbeError::InconsistentResponses(patterns.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_expectations() {
        assert!(expect_status(401, &[401]).is_ok());
        assert!(expect_status(404, &[400, 401, 403, 404]).is_ok());

        match expect_status(200, &[401]) {
            Err(ProbeError::UnexpectedStatus { expected, actual }) => {
                assert_eq!(expected, "401");
                assert_eq!(actual, 200);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        let err = expect_status(500, &[400, 422]).unwrap_err();
        assert_eq!(err.to_string(), "unexpected status: expected one of [400, 422], got 500");
    }

    #[test]
    fn status_ranges() {
        assert!(expect_client_error(422).is_ok());
        assert!(expect_client_error(500).is_err());
        assert!(expect_client_error(201).is_err());
        assert!(expect_no_server_error(404).is_ok());
        assert!(expect_no_server_error(503).is_err());
        assert!(expect_rejected(400).is_ok());
        assert!(expect_rejected(201).is_err());
    }

    #[test]
    fn error_codes_match_numbers_and_strings() {
        assert!(expect_error_code(&json!({"errorCode": 1028}), 1028).is_ok());
        assert!(expect_error_code(&json!({"errorCode": "1028"}), 1028).is_ok());
        match expect_error_code(&json!({"message": "nope"}), 1028) {
            Err(ProbeError::UnexpectedErrorCode { actual, .. }) => assert_eq!(actual, "<missing>"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(expect_error_code(&json!({"errorCode": 1001}), 1028).is_err());
    }

    #[test]
    fn pattern_consistency() {
        let mut patterns = BTreeSet::new();
        patterns.insert(ResponsePattern::new(400, Some(&json!({"errorCode": 1100}))));
        patterns.insert(ResponsePattern::new(400, Some(&json!({"errorCode": 1100, "message": "x"}))));
        assert!(expect_consistent(&patterns).is_ok());

        patterns.insert(ResponsePattern::new(400, None));
        assert!(matches!(expect_consistent(&patterns), Err(ProbeError::InconsistentResponses(2))));
        assert!(expect_consistent(&BTreeSet::new()).is_err());
    }

    #[test]
    fn pattern_display() {
        assert_eq!(ResponsePattern::new(422, None).to_string(), "422");
        assert_eq!(ResponsePattern::new(400, Some(&json!({"errorCode": "E1"}))).to_string(), "400 (errorCode E1)");
    }

    #[test]
    fn verdict_display() {
        assert_eq!(Verdict::Secure.to_string(), "SECURE");
        assert_eq!(Verdict::Vulnerable.to_string(), "VULNERABLE");
        assert_eq!(serde_json::to_value(Verdict::Uncertain).unwrap(), json!("UNCERTAIN"));
    }
}
