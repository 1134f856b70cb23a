// Dual-mode response comparison for parcelprobe
//
// Sends the same request with and without a credential. On endpoints where
// authentication must not change the response (password reset, for instance),
// any observable difference tells an attacker something about the account,
// so every difference is reported as a mismatch.

use std::collections::BTreeSet;

use log::info;
use serde_json::Value;

use crate::auth::{AuthStrategy, NoAuth};
use crate::engine::{ProbeClient, ProbeResponse};
use crate::error::{Mismatch, ProbeError};
use crate::models::ProbeRequest;

/// Outcome of a comparison that found no difference.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub status: u16,
    pub with_auth: Value,
    pub without_auth: Value,
}

/// Top-level keys of a JSON object; empty for any other value.
pub fn top_level_keys(value: &Value) -> BTreeSet<String> {
    value
        .as_object()
        .map(|obj| obj.keys().cloned().collect())
        .unwrap_or_default()
}

/// Fail on a status or top-level key difference.
pub fn compare_shape(first: (u16, &Value), second: (u16, &Value)) -> Result<(), ProbeError> {
    if first.0 != second.0 {
        return Err(ProbeError::ResponseMismatch(Mismatch::Status {
            first: first.0,
            second: second.0,
        }));
    }
    let first_keys = top_level_keys(first.1);
    let second_keys = top_level_keys(second.1);
    if first_keys != second_keys {
        return Err(ProbeError::ResponseMismatch(Mismatch::Structure {
            first: first_keys.into_iter().collect(),
            second: second_keys.into_iter().collect(),
        }));
    }
    Ok(())
}

/// Compare an authenticated and an unauthenticated response.
///
/// Checks status, then top-level keys, then the full body.
pub fn compare_responses(with_auth: &ProbeResponse, without_auth: &ProbeResponse) -> Result<Comparison, ProbeError> {
    if with_auth.status != without_auth.status {
        return Err(ProbeError::ResponseMismatch(Mismatch::Status {
            first: with_auth.status,
            second: without_auth.status,
        }));
    }
    let auth_json = with_auth.json()?;
    let no_auth_json = without_auth.json()?;

    compare_shape((with_auth.status, &auth_json), (without_auth.status, &no_auth_json))?;
    if auth_json != no_auth_json {
        return Err(ProbeError::ResponseMismatch(Mismatch::Content {
            first: auth_json,
            second: no_auth_json,
        }));
    }

    Ok(Comparison {
        status: with_auth.status,
        with_auth: auth_json,
        without_auth: no_auth_json,
    })
}

/// Send `request` once with `credential` and once without, and compare.
pub async fn compare_with_and_without_auth(
    client: &ProbeClient,
    request: &ProbeRequest,
    credential: &dyn AuthStrategy,
) -> Result<Comparison, ProbeError> {
    let with_auth = client.send(request, credential).await?;
    let without_auth = client.send(request, &NoAuth).await?;

    if let Some(body) = &request.body {
        info!("comparing auth/no-auth responses for payload {}", body);
    }
    info!("auth response status: {}", with_auth.status);
    info!("no-auth response status: {}", without_auth.status);

    compare_responses(&with_auth, &without_auth)
}
