// Pickup creation probes: authentication, input validation and fuzzing, wallet deduction

use log::{info, warn};
use serde_json::Value;

use crate::auth::{AuthStrategy, HeaderProfile, NoAuth};
use crate::document::{mutate_field, remove_field, Document};
use crate::engine::ProbeResponse;
use crate::error::ProbeError;
use crate::models::{Endpoint, Method, ProbeRequest};
use crate::payloads::{
    invalid_parcel_counts, with_future_date, with_invalid_parcel_count, with_oversized_description, with_past_date,
    with_random_contact, with_sql_injection, with_xss, DEFAULT_OVERSIZE, DEFAULT_TARGET_FIELD,
};
use crate::reporting::ResultCollector;
use crate::response_analysis::expect_no_leak;
use crate::verdict::{expect_client_error, expect_no_server_error, expect_rejected, expect_status};

use super::ProbeContext;

pub const SUITE: &str = "pickups";
pub const INVALID_TOKEN: &str = "this_is_invalid_token";
pub const INVALID_EMAIL: &str = "not.a.valid.email@@invalid";
/// Days ahead every probe schedules its pickup, so only the field under test is invalid.
pub const SCHEDULE_LEAD_DAYS: i64 = 2;

pub async fn run(ctx: &ProbeContext, collector: &mut ResultCollector) {
    collector.record(SUITE, "auth_missing_token", missing_token(ctx).await);
    collector.record(SUITE, "auth_invalid_token", invalid_token(ctx).await);
    collector.record(SUITE, "lookup_requires_auth", lookup_requires_auth(ctx).await);
    collector.record(SUITE, "requires_valid_business_location", requires_valid_business_location(ctx).await);
    collector.record(SUITE, "requires_contact_person", requires_contact_person(ctx).await);
    collector.record(SUITE, "email_validation", email_validation(ctx).await);
    collector.record(SUITE, "input_length_fuzzing", input_length_fuzzing(ctx).await);
    collector.record(SUITE, "invalid_parcel_counts", rejects_invalid_parcel_counts(ctx).await);
    collector.record(SUITE, "past_scheduled_date", rejects_past_date(ctx).await);
    collector.record(SUITE, "wallet_deduction", wallet_deduction(ctx).await);
}

/// The valid pickup fixture, scheduled [`SCHEDULE_LEAD_DAYS`] from today.
pub fn base_pickup(ctx: &ProbeContext) -> Result<Document, ProbeError> {
    Ok(with_future_date(&ctx.fixtures.valid_pickup()?, SCHEDULE_LEAD_DAYS)?)
}

async fn create(ctx: &ProbeContext, body: Document, auth: &dyn AuthStrategy) -> Result<(ProbeRequest, ProbeResponse), ProbeError> {
    let request = Endpoint::create_pickup().request(Some(body));
    let resp = ctx.client.send(&request, auth).await?;
    Ok((request, resp))
}

pub async fn missing_token(ctx: &ProbeContext) -> Result<String, ProbeError> {
    let (request, resp) = create(ctx, base_pickup(ctx)?, &NoAuth).await?;
    ctx.keep_on_failure("auth_missing_token", &request, &resp, expect_status(resp.status, &[401]))?;
    Ok(format!("request without token rejected with {}", resp.status))
}

pub async fn invalid_token(ctx: &ProbeContext) -> Result<String, ProbeError> {
    let auth = ctx.config.credential_for(INVALID_TOKEN);
    let (request, resp) = create(ctx, base_pickup(ctx)?, &auth).await?;
    ctx.keep_on_failure("auth_invalid_token", &request, &resp, expect_status(resp.status, &[401]))?;
    Ok(format!("invalid token rejected with {}", resp.status))
}

pub async fn lookup_requires_auth(ctx: &ProbeContext) -> Result<String, ProbeError> {
    let request = Endpoint::get_pickup(&ctx.config.pickup_id).request(None);
    let resp = ctx.client.send(&request, &NoAuth).await?;
    ctx.keep_on_failure("lookup_requires_auth", &request, &resp, expect_status(resp.status, &[401, 403]))?;
    Ok(format!("unauthenticated lookup rejected with {}", resp.status))
}

pub async fn requires_valid_business_location(ctx: &ProbeContext) -> Result<String, ProbeError> {
    let auth = ctx.config.credential()?;
    let pickup = mutate_field(&base_pickup(ctx)?, "businessLocationId", "invalid_id")?;
    let pickup = remove_field(&pickup, "contactPerson")?;

    let (request, resp) = create(ctx, pickup, &auth).await?;
    let checked = expect_status(resp.status, &[400, 401, 403, 404]);
    ctx.keep_on_failure("requires_valid_business_location", &request, &resp, checked)?;
    Ok(format!("invalid businessLocationId rejected with {}", resp.status))
}

/// A pickup without a contact person must be rejected.
pub async fn requires_contact_person(ctx: &ProbeContext) -> Result<String, ProbeError> {
    let auth = ctx.config.credential()?;
    let pickup = with_future_date(&ctx.fixtures.invalid_pickup_missing_contact()?, SCHEDULE_LEAD_DAYS)?;

    let (request, resp) = create(ctx, pickup, &auth).await?;
    ctx.keep_on_failure("requires_contact_person", &request, &resp, expect_client_error(resp.status))?;
    Ok(format!("pickup without contact person rejected with {}", resp.status))
}

/// Both the mutated valid pickup and the bad-email fixture must be rejected.
pub async fn email_validation(ctx: &ProbeContext) -> Result<String, ProbeError> {
    let auth = ctx.config.credential()?;
    let cases = [
        ("mutated contact email", mutate_field(&base_pickup(ctx)?, "contactPerson.email", INVALID_EMAIL)?),
        (
            "bad-email fixture",
            with_future_date(&ctx.fixtures.invalid_pickup_bad_email()?, SCHEDULE_LEAD_DAYS)?,
        ),
    ];

    let mut statuses = Vec::with_capacity(cases.len());
    for (label, pickup) in cases {
        let (request, resp) = create(ctx, pickup, &auth).await?;
        info!("{}: status {}", label, resp.status);
        ctx.keep_on_failure("email_validation", &request, &resp, expect_client_error(resp.status))?;
        statuses.push(format!("{} -> {}", label, resp.status));
    }
    Ok(format!("malformed contact email rejected ({})", statuses.join(", ")))
}

/// Oversized, SQLi and XSS inputs must not crash the server or leak internals;
/// a negative parcel count must be rejected.
pub async fn input_length_fuzzing(ctx: &ProbeContext) -> Result<String, ProbeError> {
    let auth = ctx.config.credential()?;
    let base = base_pickup(ctx)?;

    let cases = [
        ("oversized description", with_oversized_description(&base, DEFAULT_OVERSIZE)?),
        ("sql injection", with_sql_injection(&base, DEFAULT_TARGET_FIELD)?),
        ("xss", with_xss(&base, DEFAULT_TARGET_FIELD)?),
    ];
    let mut statuses = Vec::with_capacity(cases.len() + 1);
    for (label, payload) in cases {
        let (request, resp) = create(ctx, payload, &auth).await?;
        info!("{}: status {}", label, resp.status);
        let checked = expect_no_server_error(resp.status).and_then(|_| expect_no_leak(&resp.body));
        ctx.keep_on_failure("input_length_fuzzing", &request, &resp, checked)?;
        statuses.push(format!("{} -> {}", label, resp.status));
    }

    let (request, resp) = create(ctx, with_invalid_parcel_count(&base, -1)?, &auth).await?;
    ctx.keep_on_failure("input_length_fuzzing", &request, &resp, expect_rejected(resp.status))?;
    statuses.push(format!("negative parcels -> {}", resp.status));

    Ok(statuses.join(", "))
}

pub async fn rejects_invalid_parcel_counts(ctx: &ProbeContext) -> Result<String, ProbeError> {
    let auth = ctx.config.credential()?;
    let base = base_pickup(ctx)?;

    let mut checked = 0;
    for value in invalid_parcel_counts() {
        let (request, resp) = create(ctx, with_invalid_parcel_count(&base, value.clone())?, &auth).await?;
        info!("numberOfParcels = {}: status {}", value, resp.status);
        let outcome = expect_client_error(resp.status).map_err(|e| match e {
            ProbeError::UnexpectedStatus { expected, actual } => ProbeError::UnexpectedStatus {
                expected: format!("{} for numberOfParcels = {}", expected, value),
                actual,
            },
            other => other,
        });
        ctx.keep_on_failure("invalid_parcel_counts", &request, &resp, outcome)?;
        checked += 1;
    }
    Ok(format!("{} invalid parcel counts rejected", checked))
}

pub async fn rejects_past_date(ctx: &ProbeContext) -> Result<String, ProbeError> {
    let auth = ctx.config.credential()?;
    let pickup = with_past_date(&ctx.fixtures.valid_pickup()?, 1)?;

    let (request, resp) = create(ctx, pickup, &auth).await?;
    ctx.keep_on_failure("past_scheduled_date", &request, &resp, expect_client_error(resp.status))?;
    Ok(format!("pickup scheduled in the past rejected with {}", resp.status))
}

async fn wallet_balance(ctx: &ProbeContext, wallet_url: &str, auth: &dyn AuthStrategy) -> Result<f64, ProbeError> {
    let url = format!("{}/balance", wallet_url.trim_end_matches('/'));
    let request = Endpoint::new(Method::GET, url, HeaderProfile::Pickups).request(None);
    let resp = ctx.client.send(&request, auth).await?;
    expect_status(resp.status, &[200])?;
    resp.json()?
        .get("balance")
        .and_then(Value::as_f64)
        .ok_or_else(|| ProbeError::MalformedBody {
            status: resp.status,
            reason: "missing numeric 'balance'".to_string(),
        })
}

/// Creating a pickup must never increase the wallet balance. Opt-in: it
/// creates a real pickup and needs a sandbox account.
pub async fn wallet_deduction(ctx: &ProbeContext) -> Result<String, ProbeError> {
    if !ctx.config.wallet_test {
        return Err(ProbeError::Skipped("wallet probe disabled".to_string()));
    }
    let Some(wallet_url) = ctx.config.wallet_url.as_deref() else {
        return Err(ProbeError::Skipped("no wallet API configured (API_WALLET_URL)".to_string()));
    };
    let auth = ctx.config.credential()?;

    let before = wallet_balance(ctx, wallet_url, &auth).await?;

    let pickup = with_random_contact(&base_pickup(ctx)?, &mut rand::rng())?;
    let (_, created) = create(ctx, pickup, &auth).await?;
    expect_status(created.status, &[200, 201])?;

    let after = wallet_balance(ctx, wallet_url, &auth).await?;
    if after > before {
        warn!("wallet balance grew from {} to {} after creating a pickup", before, after);
        return Err(ProbeError::Assertion(format!(
            "wallet balance increased after pickup creation: {} -> {}",
            before, after
        )));
    }
    Ok(format!("wallet balance {} -> {}", before, after))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SuiteConfig;
    use crate::document::get_field;
    use crate::fixtures::Fixtures;
    use chrono::{NaiveDate, Utc};

    fn context() -> ProbeContext {
        ProbeContext::new(SuiteConfig::new("http://localhost:8080"), Fixtures::bundled().unwrap()).unwrap()
    }

    fn scheduled(doc: &Document) -> NaiveDate {
        let text = get_field(doc, "scheduledDate").and_then(Value::as_str).unwrap();
        NaiveDate::parse_from_str(text, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn base_pickup_is_scheduled_after_today() {
        let ctx = context();
        let base = base_pickup(&ctx).unwrap();
        let today = Utc::now().date_naive();

        assert!(scheduled(&base) > today);
        assert_eq!(scheduled(&base), today + chrono::Duration::days(SCHEDULE_LEAD_DAYS));
    }

    #[test]
    fn base_pickup_keeps_the_fixture_fields() {
        let ctx = context();
        let fixture = ctx.fixtures.valid_pickup().unwrap();
        let base = base_pickup(&ctx).unwrap();

        assert_eq!(base.get("contactPerson"), fixture.get("contactPerson"));
        assert_eq!(base.get("businessLocationId"), fixture.get("businessLocationId"));
        assert_eq!(ctx.fixtures.valid_pickup().unwrap(), fixture);
    }
}
