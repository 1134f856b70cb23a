// HTTP probe client for parcelprobe
// One reqwest client, fixed per-request timeout, requests sent strictly one at a time

use std::time::{Duration, Instant};

use log::debug;
use reqwest::header::HeaderMap;
use reqwest::Client;
use serde_json::Value;

use crate::auth::AuthStrategy;
use crate::error::ProbeError;
use crate::models::ProbeRequest;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

pub struct ProbeClient {
    pub client: Client,
    base_url: String,
    origin: Option<String>,
    timeout: Duration,
}

/// What came back for one request.
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
    pub elapsed: Duration,
}

impl ProbeResponse {
    pub fn json(&self) -> Result<Value, ProbeError> {
        serde_json::from_str(&self.body).map_err(|e| ProbeError::MalformedBody {
            status: self.status,
            reason: e.to_string(),
        })
    }

    /// The body as JSON when it parses, `None` otherwise.
    pub fn json_opt(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn error_code(&self) -> Option<Value> {
        self.json_opt().and_then(|body| body.get("errorCode").cloned())
    }
}

impl ProbeClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ProbeError> {
        let client = Client::builder()
            .pool_max_idle_per_host(10)
            .timeout(timeout)
            .build()
            .map_err(ProbeError::Client)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            origin: None,
            timeout,
        })
    }

    /// Send an `origin` header with every request.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Absolute URLs pass through; anything else is appended to the base URL.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    pub async fn send(&self, request: &ProbeRequest, auth: &dyn AuthStrategy) -> Result<ProbeResponse, ProbeError> {
        let url = self.url(&request.path);
        let mut req = self.client.request(request.method.into(), &url);
        for (name, value) in request.profile.static_headers() {
            req = req.header(name, value);
        }
        if let Some(origin) = &self.origin {
            req = req.header(reqwest::header::ORIGIN, origin.as_str());
        }
        req = auth.apply_auth(req);
        if let Some(body) = &request.body {
            req = req.json(body);
        }

        let started = Instant::now();
        let network = |source| ProbeError::Network { url: url.clone(), source };
        let resp = req.send().await.map_err(network)?;
        let status = resp.status().as_u16();
        let headers = resp.headers().clone();
        let body = resp.text().await.map_err(network)?;
        let elapsed = started.elapsed();

        debug!(
            "{} {} (auth: {}) -> {} in {:?}",
            request.method,
            url,
            auth.is_authenticated(),
            status,
            elapsed
        );
        Ok(ProbeResponse { status, headers, body, elapsed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(body: &str) -> ProbeResponse {
        ProbeResponse {
            status: 400,
            headers: HeaderMap::new(),
            body: body.to_string(),
            elapsed: Duration::from_millis(5),
        }
    }

    #[test]
    fn url_joins_paths() {
        let client = ProbeClient::new("https://api.example.com/api/v2/", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(client.base_url(), "https://api.example.com/api/v2");
        assert_eq!(client.url("/pickups"), "https://api.example.com/api/v2/pickups");
        assert_eq!(client.url("pickups/1"), "https://api.example.com/api/v2/pickups/1");
        assert_eq!(client.url("https://wallet.example.com/balance"), "https://wallet.example.com/balance");
    }

    #[test]
    fn json_body_parsing() {
        let ok = response(r#"{"errorCode": 1028, "message": "bad token"}"#);
        assert_eq!(ok.json().unwrap()["message"], "bad token");
        assert_eq!(ok.error_code(), Some(serde_json::json!(1028)));

        let bad = response("<html>Bad Gateway</html>");
        assert!(matches!(bad.json(), Err(ProbeError::MalformedBody { status: 400, .. })));
        assert_eq!(bad.json_opt(), None);
        assert_eq!(bad.error_code(), None);
    }
}
