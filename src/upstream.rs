use reqwest::{StatusCode, Url};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::metrics::{UPSTREAM_ERRORS, UPSTREAM_LATENCY, UPSTREAM_UP};
use crate::throttle::LoadpointId;

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("invalid evcc base url {0:?}")]
    BaseUrl(String),

    #[error("evcc unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),

    #[error("evcc answered {status}")]
    Rejected { status: StatusCode, body: String },

    #[error("evcc sent an unreadable body: {0}")]
    BadBody(#[from] serde_json::Error),
}

/// Thin client for the evcc REST API.
///
/// Responses are relayed as-is; this type only decides whether a call
/// succeeded. It also remembers whether the last contact with evcc worked,
/// which `/health` reports.
pub struct EvccClient {
    client: reqwest::Client,
    base: Url,
    healthy: AtomicBool, // last call or probe got a non-5xx answer
}

impl EvccClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, UpstreamError> {
        let base = Url::parse(base_url).map_err(|_| UpstreamError::BaseUrl(base_url.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(UpstreamError::BaseUrl(base_url.to_string()));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        let evcc = Self {
            client,
            base,
            healthy: AtomicBool::new(true),
        };
        // gauge starts in step with the flag
        evcc.set_healthy(true);
        Ok(evcc)
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    pub fn set_healthy(&self, healthy: bool) {
        let was_healthy = self.healthy.swap(healthy, Ordering::Relaxed);
        UPSTREAM_UP.set(if healthy { 1.0 } else { 0.0 });

        // log status changes only
        if was_healthy != healthy {
            if healthy {
                info!(url = self.base_url(), "evcc is reachable again");
            } else {
                warn!(url = self.base_url(), "evcc is unreachable");
            }
        }
    }

    // GET /state without relaying anything, same health rule as real calls
    pub async fn probe(&self) -> bool {
        let healthy = match self.endpoint(&["state"]) {
            Ok(url) => match self.client.get(url).send().await {
                Ok(res) => answered_healthy(res.status()),
                Err(_) => false,
            },
            Err(_) => false,
        };
        self.set_healthy(healthy);
        healthy
    }

    // base + percent-encoded segments
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, UpstreamError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| UpstreamError::BaseUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    // GET /state, parsed so we can hand it back as JSON
    pub async fn state(&self) -> Result<serde_json::Value, UpstreamError> {
        let url = self.endpoint(&["state"])?;
        let body = self.send(self.client.get(url)).await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn set_mode(&self, lp: LoadpointId, mode: &str) -> Result<String, UpstreamError> {
        let lp = lp.to_string();
        let url = self.endpoint(&["loadpoints", &lp, "mode", mode])?;
        self.send(self.client.post(url)).await
    }

    pub async fn set_max_current(&self, lp: LoadpointId, amps: u32) -> Result<String, UpstreamError> {
        let lp = lp.to_string();
        let amps = amps.to_string();
        let url = self.endpoint(&["loadpoints", &lp, "maxcurrent", &amps])?;
        self.send(self.client.post(url)).await
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, UpstreamError> {
        let start = Instant::now();
        let result = request.send().await;
        UPSTREAM_LATENCY.observe(start.elapsed().as_secs_f64());

        let res = match result {
            Ok(res) => res,
            Err(e) => {
                UPSTREAM_ERRORS.inc();
                self.set_healthy(false);
                warn!(error = %e, "evcc request failed");
                return Err(e.into());
            }
        };
        let status = res.status();
        self.set_healthy(answered_healthy(status));

        let body = res.text().await?;
        if status.is_client_error() || status.is_server_error() {
            UPSTREAM_ERRORS.inc();
            warn!(%status, "evcc rejected request");
            return Err(UpstreamError::Rejected { status, body });
        }
        debug!(%status, bytes = body.len(), "evcc ok");
        Ok(body)
    }
}

// A 4xx is evcc refusing one command, a 5xx means evcc itself is broken
fn answered_healthy(status: StatusCode) -> bool {
    !status.is_server_error()
}

// Probe evcc periodically so /health shows reachability without user traffic
pub async fn health_checker(upstream: Arc<EvccClient>, check_interval: Duration) {
    let mut interval = interval(check_interval);
    info!(?check_interval, "evcc health checker started");

    loop {
        interval.tick().await;
        upstream.probe().await;
    }
}
