// Account enumeration probe for parcelprobe
// A known and an unknown identity must be indistinguishable in status, shape and timing

use std::time::Duration;

use log::info;
use serde_json::{json, Value};

use crate::auth::AuthStrategy;
use crate::comparator::compare_shape;
use crate::document::mutate_field;
use crate::engine::{ProbeClient, ProbeResponse};
use crate::error::ProbeError;
use crate::models::Endpoint;

pub const DEFAULT_TIMING_LIMIT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub identity: String,
    pub status: u16,
    pub body: Value,
    pub elapsed: Duration,
}

impl Observation {
    pub fn from_response(identity: &str, resp: &ProbeResponse) -> Self {
        Self {
            identity: identity.to_string(),
            status: resp.status,
            body: resp.json_opt().unwrap_or(Value::Null),
            elapsed: resp.elapsed,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumerationReport {
    pub known: Observation,
    pub unknown: Observation,
    pub timing_gap: Duration,
}

/// Compare two observations; the timing gap must stay below `timing_limit`.
pub fn assess(known: Observation, unknown: Observation, timing_limit: Duration) -> Result<EnumerationReport, ProbeError> {
    compare_shape((known.status, &known.body), (unknown.status, &unknown.body))?;

    let timing_gap = if known.elapsed > unknown.elapsed {
        known.elapsed - unknown.elapsed
    } else {
        unknown.elapsed - known.elapsed
    };
    if timing_gap >= timing_limit {
        return Err(ProbeError::TimingLeak {
            diff_ms: timing_gap.as_millis(),
            limit_ms: timing_limit.as_millis(),
        });
    }
    Ok(EnumerationReport { known, unknown, timing_gap })
}

async fn observe(
    client: &ProbeClient,
    endpoint: &Endpoint,
    auth: &dyn AuthStrategy,
    field: &str,
    identity: &str,
) -> Result<Observation, ProbeError> {
    let body = mutate_field(&json!({}), field, identity)?;
    let resp = client.send(&endpoint.request(Some(body)), auth).await?;
    info!(
        "{} -> status {} in {:.3}s, body {}",
        identity,
        resp.status,
        resp.elapsed.as_secs_f64(),
        resp.body
    );
    Ok(Observation::from_response(identity, &resp))
}

/// Send `{field: known}` and `{field: unknown}` to `endpoint` and assess.
pub async fn probe_identity_enumeration(
    client: &ProbeClient,
    endpoint: &Endpoint,
    auth: &dyn AuthStrategy,
    field: &str,
    known: &str,
    unknown: &str,
    timing_limit: Duration,
) -> Result<EnumerationReport, ProbeError> {
    let known_obs = observe(client, endpoint, auth, field, known).await?;
    let unknown_obs = observe(client, endpoint, auth, field, unknown).await?;
    assess(known_obs, unknown_obs, timing_limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Mismatch;

    fn obs(identity: &str, status: u16, body: Value, millis: u64) -> Observation {
        Observation {
            identity: identity.to_string(),
            status,
            body,
            elapsed: Duration::from_millis(millis),
        }
    }

    #[test]
    fn indistinguishable_responses_pass() {
        let body = json!({"success": true, "message": "If the email exists, a reset link was sent"});
        let report = assess(
            obs("known@example.com", 200, body.clone(), 180),
            obs("nobody@example.com", 200, body, 240),
            DEFAULT_TIMING_LIMIT,
        )
        .unwrap();
        assert_eq!(report.timing_gap, Duration::from_millis(60));
    }

    #[test]
    fn differing_status_leaks_existence() {
        let err = assess(
            obs("known@example.com", 200, json!({"success": true}), 100),
            obs("nobody@example.com", 404, json!({"success": false}), 100),
            DEFAULT_TIMING_LIMIT,
        )
        .unwrap_err();
        assert!(matches!(err, ProbeError::ResponseMismatch(Mismatch::Status { first: 200, second: 404 })));
    }

    #[test]
    fn differing_keys_leak_existence() {
        let err = assess(
            obs("known@example.com", 400, json!({"message": "x"}), 100),
            obs("nobody@example.com", 400, json!({"message": "y", "errorCode": 1001}), 100),
            DEFAULT_TIMING_LIMIT,
        )
        .unwrap_err();
        assert!(matches!(err, ProbeError::ResponseMismatch(Mismatch::Structure { .. })));
    }

    #[test]
    fn slow_known_identity_is_a_timing_leak() {
        let err = assess(
            obs("known@example.com", 200, json!({}), 1500),
            obs("nobody@example.com", 200, json!({}), 200),
            DEFAULT_TIMING_LIMIT,
        )
        .unwrap_err();
        assert!(matches!(err, ProbeError::TimingLeak { diff_ms: 1300, limit_ms: 1000 }));
    }
}
