// Header profiles and authentication strategies for parcelprobe
// Supports raw and bearer tokens, unauthenticated requests, and JWT tampering

use base64::{engine::general_purpose, Engine as _};
use serde_json::Value;

use crate::document::{get_field, mutate_field};
use crate::error::ProbeError;

pub const USER_AGENT: &str = "parcelprobe-security-suite";
pub const BUSINESS_ID_CLAIM: &str = "businessId";

/// Static header sets, one per endpoint family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderProfile {
    Pickups,
    BankInfo,
    ForgetPassword,
}

const COMMON_HEADERS: &[(&str, &str)] = &[
    ("accept", "application/json, text/plain, */*"),
    ("content-type", "application/json"),
    ("user-agent", USER_AGENT),
];

impl HeaderProfile {
    pub fn static_headers(&self) -> Vec<(&'static str, &'static str)> {
        let mut headers = COMMON_HEADERS.to_vec();
        match self {
            HeaderProfile::Pickups => {}
            HeaderProfile::BankInfo => headers.push(("accept-language", "en")),
            HeaderProfile::ForgetPassword => headers.push(("cache-control", "no-cache")),
        }
        headers
    }
}

pub trait AuthStrategy {
    fn apply_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder;

    /// Whether this strategy attaches any credential.
    fn is_authenticated(&self) -> bool {
        true
    }
}

/// How the token is written into the `Authorization` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenScheme {
    /// `Authorization: <token>`
    #[default]
    Raw,
    /// `Authorization: Bearer <token>`
    Bearer,
}

impl std::str::FromStr for TokenScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "raw" => Ok(TokenScheme::Raw),
            "bearer" => Ok(TokenScheme::Bearer),
            other => Err(format!("unknown token scheme '{}' (expected raw or bearer)", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAuth {
    pub token: String,
    pub scheme: TokenScheme,
}

impl TokenAuth {
    pub fn new(token: impl Into<String>, scheme: TokenScheme) -> Self {
        Self { token: token.into(), scheme }
    }

    pub fn raw(token: impl Into<String>) -> Self {
        Self::new(token, TokenScheme::Raw)
    }
}

impl AuthStrategy for TokenAuth {
    fn apply_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.scheme {
            TokenScheme::Raw => req.header(reqwest::header::AUTHORIZATION, self.token.as_str()),
            TokenScheme::Bearer => req.bearer_auth(&self.token),
        }
    }
}

/// Sends requests without any `Authorization` header.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuth;

impl AuthStrategy for NoAuth {
    fn apply_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req
    }

    fn is_authenticated(&self) -> bool {
        false
    }
}

fn split_jwt(token: &str) -> Result<(&str, [&str; 3]), ProbeError> {
    let (prefix, raw) = match token.strip_prefix("Bearer ") {
        Some(rest) => ("Bearer ", rest),
        None => ("", token),
    };
    let parts: Vec<&str> = raw.split('.').collect();
    match parts.as_slice() {
        [header, payload, signature] => Ok((prefix, [*header, *payload, *signature])),
        _ => Err(ProbeError::InvalidToken(format!(
            "expected 3 dot-separated segments, found {}",
            parts.len()
        ))),
    }
}

fn decode_claims(payload: &str) -> Result<Value, ProbeError> {
    let decoded = general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| ProbeError::InvalidToken(format!("payload is not base64url: {}", e)))?;
    let claims: Value = serde_json::from_slice(&decoded)
        .map_err(|e| ProbeError::InvalidToken(format!("payload is not JSON: {}", e)))?;
    if !claims.is_object() {
        return Err(ProbeError::InvalidToken("payload is not a JSON object".to_string()));
    }
    Ok(claims)
}

/// Read a string claim from a JWT payload.
pub fn token_claim(token: &str, claim: &str) -> Option<String> {
    let (_, [_, payload, _]) = split_jwt(token).ok()?;
    let claims = decode_claims(payload).ok()?;
    get_field(&claims, claim).and_then(Value::as_str).map(str::to_string)
}

/// Rewrite the `businessId` claim of a JWT while keeping its original
/// signature, producing a token the server must reject.
pub fn tamper_token(token: &str) -> Result<String, ProbeError> {
    let (prefix, [header, payload, signature]) = split_jwt(token)?;
    let claims = decode_claims(payload)?;

    let forged_id = match get_field(&claims, BUSINESS_ID_CLAIM).and_then(Value::as_str) {
        Some(id) => format!("tampered-{}", id),
        None => "tampered-business".to_string(),
    };
    let tampered = mutate_field(&claims, BUSINESS_ID_CLAIM, forged_id)?;
    let encoded = general_purpose::URL_SAFE_NO_PAD.encode(tampered.to_string());

    Ok(format!("{}{}.{}.{}", prefix, header, encoded, signature))
}
