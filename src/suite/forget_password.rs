// Password-reset probes: enumeration, auth consistency, injection, input validation, rate limiting

use std::collections::BTreeSet;

use log::{info, warn};
use serde_json::json;

use crate::auth::NoAuth;
use crate::comparator::compare_with_and_without_auth;
use crate::document::mutate_field;
use crate::enumeration::probe_identity_enumeration;
use crate::error::ProbeError;
use crate::models::Endpoint;
use crate::payloads::{special_char_payloads, sql_injection_payloads};
use crate::rate_limit::probe_rate_limit;
use crate::reporting::ResultCollector;
use crate::response_analysis::expect_no_leak;
use crate::verdict::{expect_consistent, expect_no_server_error, expect_status, ResponsePattern};

use super::ProbeContext;

pub const SUITE: &str = "forget_password";
pub const EMAIL_FIELD: &str = "email";
/// Statuses an input-validation failure may legitimately produce.
pub const REJECTION_STATUSES: [u16; 4] = [400, 401, 403, 422];

pub async fn run(ctx: &ProbeContext, collector: &mut ResultCollector) {
    collector.record(SUITE, "email_enumeration", email_enumeration(ctx).await);
    collector.record(SUITE, "auth_consistency", auth_consistency(ctx).await);
    collector.record(SUITE, "sql_injection", sql_injection(ctx).await);
    collector.record(SUITE, "special_chars_validation", special_chars_validation(ctx).await);
    // last: a triggered limit would skew everything after it
    collector.record(SUITE, "rate_limit", rate_limit(ctx).await);
}

pub async fn email_enumeration(ctx: &ProbeContext) -> Result<String, ProbeError> {
    let report = probe_identity_enumeration(
        &ctx.client,
        &Endpoint::forget_password(),
        &NoAuth,
        EMAIL_FIELD,
        &ctx.config.known_email,
        &ctx.config.unknown_email,
        ctx.config.timing_limit,
    )
    .await?;
    Ok(format!(
        "known and unknown emails both answered {} (timing gap {:.3}s)",
        report.known.status,
        report.timing_gap.as_secs_f64()
    ))
}

/// Attaching a token must not change what the reset endpoint reveals.
pub async fn auth_consistency(ctx: &ProbeContext) -> Result<String, ProbeError> {
    let credential = ctx.config.credential()?;
    let body = mutate_field(&json!({}), EMAIL_FIELD, ctx.config.unknown_email.as_str())?;
    let request = Endpoint::forget_password().request(Some(body));

    let comparison = compare_with_and_without_auth(&ctx.client, &request, &credential).await?;
    Ok(format!("status {} with identical bodies", comparison.status))
}

/// Send every payload as the email; each must be rejected with the same
/// status/errorCode pattern and without leaking internals.
///
/// Patterns are only compared when at least one JSON answer came back: with
/// no answer at all the last transport error is returned, and with only
/// non-JSON answers the result is a malformed body.
async fn probe_email_catalogue(
    ctx: &ProbeContext,
    probe: &str,
    payloads: Vec<String>,
) -> Result<BTreeSet<ResponsePattern>, ProbeError> {
    let endpoint = Endpoint::forget_password();
    let mut patterns = BTreeSet::new();
    let mut received = 0usize;
    let mut last_status = None;
    let mut last_failure = None;

    for payload in payloads {
        let body = mutate_field(&json!({}), EMAIL_FIELD, payload.as_str())?;
        let request = endpoint.request(Some(body));
        let resp = match ctx.client.send(&request, &NoAuth).await {
            Ok(resp) => resp,
            Err(e @ ProbeError::Network { .. }) => {
                warn!("request failed for payload {:?}: {}", payload, e);
                last_failure = Some(e);
                continue;
            }
            Err(e) => return Err(e),
        };
        info!("payload {:?}: status {}", payload, resp.status);
        received += 1;
        last_status = Some(resp.status);

        match resp.json_opt() {
            Some(body) => {
                patterns.insert(ResponsePattern::new(resp.status, Some(&body)));
            }
            None => info!("response was not JSON"),
        }
        let checked = expect_no_server_error(resp.status)
            .and_then(|_| expect_status(resp.status, &REJECTION_STATUSES))
            .and_then(|_| expect_no_leak(&resp.body));
        ctx.keep_on_failure(probe, &request, &resp, checked)?;
    }

    if received == 0 {
        return Err(last_failure.unwrap_or_else(|| ProbeError::Skipped("no payloads to send".to_string())));
    }
    if patterns.is_empty() {
        return Err(ProbeError::MalformedBody {
            status: last_status.unwrap_or_default(),
            reason: format!("none of {} responses was JSON", received),
        });
    }
    expect_consistent(&patterns)?;
    Ok(patterns)
}

pub async fn sql_injection(ctx: &ProbeContext) -> Result<String, ProbeError> {
    let payloads: Vec<String> = sql_injection_payloads().into_iter().map(str::to_string).collect();
    let count = payloads.len();
    let patterns = probe_email_catalogue(ctx, "sql_injection", payloads).await?;
    Ok(format!("{} payloads answered consistently: {}", count, describe(&patterns)))
}

pub async fn special_chars_validation(ctx: &ProbeContext) -> Result<String, ProbeError> {
    let mut payloads = Vec::new();
    for (category, category_payloads) in special_char_payloads() {
        info!("queueing {} {} payloads", category_payloads.len(), category);
        payloads.extend(category_payloads);
    }
    let count = payloads.len();
    let patterns = probe_email_catalogue(ctx, "special_chars_validation", payloads).await?;
    Ok(format!("{} malformed emails answered consistently: {}", count, describe(&patterns)))
}

pub async fn rate_limit(ctx: &ProbeContext) -> Result<String, ProbeError> {
    let body = mutate_field(&json!({}), EMAIL_FIELD, ctx.config.unknown_email.as_str())?;
    let request = Endpoint::forget_password().request(Some(body));

    let report = probe_rate_limit(&ctx.client, &request, &NoAuth, ctx.config.rate_limit).await?;
    report.require_throttling()?;
    Ok(format!(
        "throttled after {} requests in {:.2}s (reset: {})",
        report.attempts,
        report.elapsed.as_secs_f64(),
        report.reset_after.as_deref().unwrap_or("not advertised")
    ))
}

fn describe(patterns: &BTreeSet<ResponsePattern>) -> String {
    patterns.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}
