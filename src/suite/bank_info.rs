// Bank-info update probes: token tampering and direct OTP overwrite

use log::info;

use crate::auth::{tamper_token, token_claim, NoAuth, BUSINESS_ID_CLAIM};
use crate::document::mutate_field;
use crate::error::ProbeError;
use crate::models::Endpoint;
use crate::reporting::ResultCollector;
use crate::verdict::{expect_error_code, expect_status};

use super::ProbeContext;

pub const SUITE: &str = "bank_info";
/// Application error code for a token that failed verification.
pub const INVALID_TOKEN_ERROR_CODE: i64 = 1028;
pub const OTP_FIELD: &str = "bankInfo.paymentInfoOtp";
pub const FORGED_OTP: &str = "999999";

pub async fn run(ctx: &ProbeContext, collector: &mut ResultCollector) {
    collector.record(SUITE, "auth_missing_token", missing_token(ctx).await);
    collector.record(SUITE, "token_tampering", token_tampering(ctx).await);
    collector.record(SUITE, "otp_direct_update", otp_direct_update(ctx).await);
}

pub async fn missing_token(ctx: &ProbeContext) -> Result<String, ProbeError> {
    let request = Endpoint::add_bank_info().request(Some(ctx.fixtures.valid_bank_info()?));
    let resp = ctx.client.send(&request, &NoAuth).await?;
    ctx.keep_on_failure("auth_missing_token", &request, &resp, expect_status(resp.status, &[401]))?;
    Ok(format!("request without token rejected with {}", resp.status))
}

/// A token whose `businessId` claim was rewritten must be rejected as invalid.
pub async fn token_tampering(ctx: &ProbeContext) -> Result<String, ProbeError> {
    let original = ctx.config.credential()?;
    let tampered = tamper_token(&original.token)?;
    let forged_id = token_claim(&tampered, BUSINESS_ID_CLAIM).unwrap_or_default();
    info!(
        "{} rewritten from {:?} to {:?}",
        BUSINESS_ID_CLAIM,
        token_claim(&original.token, BUSINESS_ID_CLAIM),
        forged_id
    );

    let request = Endpoint::add_bank_info().request(Some(ctx.fixtures.valid_bank_info()?));
    let resp = ctx.client.send(&request, &ctx.config.credential_for(&tampered)).await?;
    info!("tampered token: status {}, body {}", resp.status, resp.body);

    let checked = expect_status(resp.status, &[401])
        .and_then(|_| resp.json())
        .and_then(|body| expect_error_code(&body, INVALID_TOKEN_ERROR_CODE));
    ctx.keep_on_failure("token_tampering", &request, &resp, checked)?;
    Ok(format!(
        "token with {} '{}' rejected with 401 / errorCode {}",
        BUSINESS_ID_CLAIM, forged_id, INVALID_TOKEN_ERROR_CODE
    ))
}

/// The OTP that guards bank-detail changes must not be settable by the client.
pub async fn otp_direct_update(ctx: &ProbeContext) -> Result<String, ProbeError> {
    let auth = ctx.config.credential()?;
    let payload = mutate_field(&ctx.fixtures.valid_bank_info()?, OTP_FIELD, FORGED_OTP)?;

    let request = Endpoint::add_bank_info().request(Some(payload));
    let resp = ctx.client.send(&request, &auth).await?;
    match resp.json_opt() {
        Some(body) => info!("direct OTP update: status {}, body {}", resp.status, body),
        None => info!("direct OTP update: status {}, text {}", resp.status, resp.body),
    }

    ctx.keep_on_failure("otp_direct_update", &request, &resp, expect_status(resp.status, &[403]))?;
    Ok("direct OTP update forbidden".to_string())
}
