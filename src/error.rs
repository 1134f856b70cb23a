// Error taxonomy for parcelprobe
// Assertion failures are security findings, transport failures are not

use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::document::MutationError;
use crate::fixtures::FixtureError;
use crate::verdict::Verdict;

/// How two responses that should be indistinguishable differed.
#[derive(Debug, Clone, PartialEq)]
pub enum Mismatch {
    Status { first: u16, second: u16 },
    Structure { first: Vec<String>, second: Vec<String> },
    Content { first: Value, second: Value },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::Status { first, second } => {
                write!(f, "status codes differ: {} vs {}", first, second)
            }
            Mismatch::Structure { first, second } => write!(
                f,
                "response structure differs: [{}] vs [{}]",
                first.join(", "),
                second.join(", ")
            ),
            Mismatch::Content { first, second } => {
                write!(f, "response content differs: {} vs {}", first, second)
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("network failure calling {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected status: expected {expected}, got {actual}")]
    UnexpectedStatus { expected: String, actual: u16 },

    #[error("{0}")]
    ResponseMismatch(Mismatch),

    #[error("malformed response body (status {status}): {reason}")]
    MalformedBody { status: u16, reason: String },

    #[error("inconsistent error responses: {0} distinct patterns")]
    InconsistentResponses(usize),

    #[error("response time difference {diff_ms}ms suggests enumeration (limit {limit_ms}ms)")]
    TimingLeak { diff_ms: u128, limit_ms: u128 },

    #[error("no rate limiting detected after {0} requests")]
    RateLimitMissing(usize),

    #[error("unexpected errorCode: expected {expected}, got {actual}")]
    UnexpectedErrorCode { expected: i64, actual: String },

    #[error("information leak in response: {0}")]
    InformationLeak(String),

    #[error("{0}")]
    Assertion(String),

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error(transparent)]
    Mutation(#[from] MutationError),

    #[error(transparent)]
    Fixture(#[from] FixtureError),

    #[error("skipped: {0}")]
    Skipped(String),
}

impl ProbeError {
    /// Verdict a probe gets when it ends with this error.
    pub fn verdict(&self) -> Verdict {
        match self {
            ProbeError::UnexpectedStatus { .. }
            | ProbeError::ResponseMismatch(_)
            | ProbeError::InconsistentResponses(_)
            | ProbeError::TimingLeak { .. }
            | ProbeError::RateLimitMissing(_)
            | ProbeError::UnexpectedErrorCode { .. }
            | ProbeError::InformationLeak(_)
            | ProbeError::Assertion(_) => Verdict::Vulnerable,
            ProbeError::Skipped(_) => Verdict::Skipped,
            ProbeError::Network { .. }
            | ProbeError::MalformedBody { .. }
            | ProbeError::InvalidToken(_)
            | ProbeError::Client(_)
            | ProbeError::Mutation(_)
            | ProbeError::Fixture(_) => Verdict::Uncertain,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ProbeError::Network { source, .. } if source.is_timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn assertion_failures_are_findings() {
        let err = ProbeError::UnexpectedStatus { expected: "401".into(), actual: 200 };
        assert_eq!(err.verdict(), Verdict::Vulnerable);
        assert_eq!(ProbeError::RateLimitMissing(100).verdict(), Verdict::Vulnerable);
    }

    #[test]
    fn transport_failures_are_uncertain() {
        let err = ProbeError::MalformedBody { status: 502, reason: "not json".into() };
        assert_eq!(err.verdict(), Verdict::Uncertain);
        assert_eq!(ProbeError::Skipped("no token".into()).verdict(), Verdict::Skipped);
    }

    #[test]
    fn mismatch_messages_name_both_sides() {
        let msg = Mismatch::Status { first: 200, second: 404 }.to_string();
        assert_eq!(msg, "status codes differ: 200 vs 404");

        let msg = Mismatch::Structure {
            first: vec!["message".into(), "success".into()],
            second: vec!["error".into()],
        }
        .to_string();
        assert!(msg.contains("[message, success] vs [error]"));

        let msg = Mismatch::Content { first: json!({"a": 1}), second: json!({"a": 2}) }.to_string();
        assert!(msg.contains(r#"{"a":1}"#));
    }
}
