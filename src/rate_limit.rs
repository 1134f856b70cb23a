// Rate-limit probe for parcelprobe
//
// Replays one request until the target answers 429 or the attempt ceiling is
// reached. Requests are strictly sequential with a fixed pause between them.
// A timed-out request counts as an attempt that was not throttled.

use std::time::{Duration, Instant};

use log::{info, warn};
use tokio::time::sleep;

use crate::auth::AuthStrategy;
use crate::engine::ProbeClient;
use crate::error::ProbeError;
use crate::models::ProbeRequest;

pub const TOO_MANY_REQUESTS: u16 = 429;
pub const DEFAULT_MAX_ATTEMPTS: usize = 100;
pub const DEFAULT_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_attempts: usize,
    pub delay: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_DELAY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitReport {
    pub attempts: usize,
    /// 1-based attempt that received the first 429.
    pub threshold: Option<usize>,
    pub timeouts: usize,
    pub elapsed: Duration,
    /// `X-RateLimit-Reset` or `Retry-After` from the 429 response.
    pub reset_after: Option<String>,
}

impl RateLimitReport {
    pub fn throttled(&self) -> bool {
        self.threshold.is_some()
    }

    pub fn require_throttling(&self) -> Result<(), ProbeError> {
        if self.throttled() {
            Ok(())
        } else {
            Err(ProbeError::RateLimitMissing(self.attempts))
        }
    }
}

pub async fn probe_rate_limit(
    client: &ProbeClient,
    request: &ProbeRequest,
    auth: &dyn AuthStrategy,
    policy: RateLimitPolicy,
) -> Result<RateLimitReport, ProbeError> {
    let started = Instant::now();
    let mut report = RateLimitReport {
        attempts: 0,
        threshold: None,
        timeouts: 0,
        elapsed: Duration::ZERO,
        reset_after: None,
    };

    for attempt in 1..=policy.max_attempts {
        report.attempts = attempt;
        match client.send(request, auth).await {
            Ok(resp) => {
                info!("request {}: status {}", attempt, resp.status);
                if resp.status == TOO_MANY_REQUESTS {
                    report.threshold = Some(attempt);
                    report.reset_after = resp
                        .header("x-ratelimit-reset")
                        .or_else(|| resp.header("retry-after"))
                        .map(str::to_string);
                    info!(
                        "rate limit hit after {} requests ({:.2}s)",
                        attempt,
                        started.elapsed().as_secs_f64()
                    );
                    break;
                }
            }
            Err(e) if e.is_timeout() => {
                warn!("request {} timed out; treating as not throttled", attempt);
                report.timeouts += 1;
            }
            Err(e) => return Err(e),
        }
        if attempt < policy.max_attempts && !policy.delay.is_zero() {
            sleep(policy.delay).await;
        }
    }

    report.elapsed = started.elapsed();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy() {
        let policy = RateLimitPolicy::default();
        assert_eq!(policy.max_attempts, 100);
        assert_eq!(policy.delay, Duration::from_millis(100));
    }

    #[test]
    fn report_requires_a_429() {
        let mut report = RateLimitReport {
            attempts: 100,
            threshold: None,
            timeouts: 0,
            elapsed: Duration::from_secs(12),
            reset_after: None,
        };
        assert!(matches!(report.require_throttling(), Err(ProbeError::RateLimitMissing(100))));

        report.threshold = Some(6);
        assert!(report.throttled());
        assert!(report.require_throttling().is_ok());
    }
}
