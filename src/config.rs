// Run configuration for parcelprobe
// Filled from CLI flags and their environment fallbacks in main.rs

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::auth::{TokenAuth, TokenScheme};
use crate::enumeration::DEFAULT_TIMING_LIMIT;
use crate::engine::DEFAULT_TIMEOUT;
use crate::error::ProbeError;
use crate::rate_limit::RateLimitPolicy;

pub const DEFAULT_FIXTURES_DIR: &str = "config/testdata";
pub const DEFAULT_REPORTS_DIR: &str = "reports";
pub const DEFAULT_KNOWN_EMAIL: &str = "known.user@example.com";
pub const DEFAULT_UNKNOWN_EMAIL: &str = "nonexistent.user@example.com";
pub const DEFAULT_PICKUP_ID: &str = "000000000000";

/// The probe suites, one per endpoint family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SuiteKind {
    Pickups,
    BankInfo,
    ForgetPassword,
}

impl SuiteKind {
    pub const ALL: [SuiteKind; 3] = [SuiteKind::Pickups, SuiteKind::BankInfo, SuiteKind::ForgetPassword];

    pub fn name(&self) -> &'static str {
        match self {
            SuiteKind::Pickups => "pickups",
            SuiteKind::BankInfo => "bank-info",
            SuiteKind::ForgetPassword => "forget-password",
        }
    }
}

impl FromStr for SuiteKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SuiteKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| format!("unknown suite '{}' (expected pickups, bank-info or forget-password)", s))
    }
}

#[derive(Debug, Clone)]
pub struct SuiteConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub token_scheme: TokenScheme,
    pub origin: Option<String>,
    pub timeout: Duration,
    pub fixtures_dir: Option<PathBuf>,
    pub reports_dir: PathBuf,
    /// Keep request/response pairs of failed checks under the reports directory.
    pub save_artifacts: bool,
    pub wallet_url: Option<String>,
    pub wallet_test: bool,
    pub known_email: String,
    pub unknown_email: String,
    pub pickup_id: String,
    pub rate_limit: RateLimitPolicy,
    pub timing_limit: Duration,
    pub suites: Vec<SuiteKind>,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            token: None,
            token_scheme: TokenScheme::Raw,
            origin: None,
            timeout: DEFAULT_TIMEOUT,
            fixtures_dir: None,
            reports_dir: PathBuf::from(DEFAULT_REPORTS_DIR),
            save_artifacts: false,
            wallet_url: None,
            wallet_test: false,
            known_email: DEFAULT_KNOWN_EMAIL.to_string(),
            unknown_email: DEFAULT_UNKNOWN_EMAIL.to_string(),
            pickup_id: DEFAULT_PICKUP_ID.to_string(),
            rate_limit: RateLimitPolicy::default(),
            timing_limit: DEFAULT_TIMING_LIMIT,
            suites: SuiteKind::ALL.to_vec(),
        }
    }
}

impl SuiteConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(format!("base URL must start with http:// or https://, got '{}'", self.base_url));
        }
        if self.timeout.is_zero() {
            return Err("timeout must be greater than zero".to_string());
        }
        if self.rate_limit.max_attempts == 0 {
            return Err("max attempts must be greater than zero".to_string());
        }
        if self.suites.is_empty() {
            return Err("no suites selected".to_string());
        }
        Ok(())
    }

    /// The operator's credential, or a skip when none was configured.
    pub fn credential(&self) -> Result<TokenAuth, ProbeError> {
        match self.token.as_deref().filter(|t| !t.is_empty()) {
            Some(token) => Ok(TokenAuth::new(token, self.token_scheme)),
            None => Err(ProbeError::Skipped("no token configured (TEST_USER_TOKEN)".to_string())),
        }
    }

    /// A credential using `token` with the configured scheme.
    pub fn credential_for(&self, token: &str) -> TokenAuth {
        TokenAuth::new(token, self.token_scheme)
    }
}
