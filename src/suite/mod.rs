// Probe suites for parcelprobe
//
// One module per endpoint family. Every probe is an async function returning
// `Result<String, ProbeError>`: the detail line on success, the finding (or the
// reason it could not run) otherwise. Suites run their probes one after another
// and hand each result to the collector.

pub mod bank_info;
pub mod forget_password;
pub mod pickups;

use log::{debug, info, warn};

use crate::config::{SuiteConfig, SuiteKind};
use crate::engine::{ProbeClient, ProbeResponse};
use crate::error::ProbeError;
use crate::fixtures::Fixtures;
use crate::models::ProbeRequest;
use crate::reporting::{save_test_artifacts, ResultCollector};

/// Subdirectory of the reports directory holding per-probe exchanges.
pub const ARTIFACTS_DIR: &str = "artifacts";

/// Everything a probe needs: the client, canonical fixtures and the run configuration.
pub struct ProbeContext {
    pub client: ProbeClient,
    pub fixtures: Fixtures,
    pub config: SuiteConfig,
}

impl ProbeContext {
    pub fn new(config: SuiteConfig, fixtures: Fixtures) -> Result<Self, ProbeError> {
        let mut client = ProbeClient::new(&config.base_url, config.timeout)?;
        if let Some(origin) = &config.origin {
            client = client.with_origin(origin.as_str());
        }
        Ok(Self { client, fixtures, config })
    }

    /// Pass `outcome` through; when it is a finding and artifacts are enabled,
    /// keep the request and response behind it under `<reports>/artifacts/<probe>/`.
    pub fn keep_on_failure<T>(
        &self,
        probe: &str,
        request: &ProbeRequest,
        response: &ProbeResponse,
        outcome: Result<T, ProbeError>,
    ) -> Result<T, ProbeError> {
        if let Err(e) = &outcome {
            if self.config.save_artifacts {
                self.save_exchange(probe, request, response, e);
            }
        }
        outcome
    }

    fn save_exchange(&self, probe: &str, request: &ProbeRequest, response: &ProbeResponse, error: &ProbeError) {
        let body = request.body.as_ref().map(|b| b.to_string()).unwrap_or_default();
        let summary = format!(
            "{} {}\nstatus {} in {:?}\nfinding: {}\n",
            request.method,
            self.client.url(&request.path),
            response.status,
            response.elapsed,
            error
        );
        let dir = self.config.reports_dir.join(ARTIFACTS_DIR);
        let artifacts = [("request.json", body.as_str()), ("response.txt", response.body.as_str()), ("summary.txt", summary.as_str())];
        match save_test_artifacts(&dir, probe, &artifacts) {
            Ok(path) => debug!("artifacts for {} saved to {}", probe, path.display()),
            Err(e) => warn!("failed to save artifacts for {}: {}", probe, e),
        }
    }
}

pub async fn run_suite(ctx: &ProbeContext, kind: SuiteKind, collector: &mut ResultCollector) {
    info!("running {} suite against {}", kind.name(), ctx.client.base_url());
    match kind {
        SuiteKind::Pickups => pickups::run(ctx, collector).await,
        SuiteKind::BankInfo => bank_info::run(ctx, collector).await,
        SuiteKind::ForgetPassword => forget_password::run(ctx, collector).await,
    }
}

/// Run every configured suite in order.
pub async fn run_all(ctx: &ProbeContext, collector: &mut ResultCollector) {
    for kind in ctx.config.suites.clone() {
        run_suite(ctx, kind, collector).await;
    }
}
