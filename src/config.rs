use clap::Parser;
use std::time::Duration;

use crate::throttle::LoadpointId;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5080;

// CLI argument structure, every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "evcc-gateway")]
#[command(about = "Throttling control proxy for an evcc charge controller")]
pub struct Args {
    // Interface to listen on (FLASK_HOST is still honoured)
    #[arg(long, env = "GATEWAY_HOST")]
    pub host: Option<String>,

    // Port to run the server on (FLASK_PORT is still honoured)
    #[arg(short, long, env = "GATEWAY_PORT")]
    pub port: Option<u16>,

    // evcc API base url
    // Example: "http://192.168.1.20:7070/api"
    #[arg(short = 'u', long, env = "EVCC_BASE_URL", default_value = "http://127.0.0.1:7070/api")]
    pub evcc_url: String,

    // Loadpoint used when a request has no ?lp=
    #[arg(long, env = "DEFAULT_LP_ID", default_value_t = 1)]
    pub default_lp: LoadpointId,

    // Minimum seconds between two different modes on one loadpoint
    #[arg(short = 'c', long, env = "MODE_COOLDOWN_SECONDS", default_value_t = 120)]
    pub mode_cooldown: u64,

    // Timeout for each call to evcc, in seconds
    #[arg(long, env = "EVCC_TIMEOUT_SECONDS", default_value_t = 5)]
    pub upstream_timeout: u64,

    // Upstream health check interval
    #[arg(long, env = "EVCC_HEALTH_INTERVAL_SECONDS", default_value_t = 30)]
    pub health_interval: u64,
}

impl Args {
    pub fn bind_addr(&self) -> String {
        self.bind_addr_with(|key| std::env::var(key).ok())
    }

    // flag / GATEWAY_* first, then the older FLASK_* names, then defaults
    pub fn bind_addr_with(&self, lookup: impl Fn(&str) -> Option<String>) -> String {
        let host = self
            .host
            .clone()
            .or_else(|| lookup("FLASK_HOST"))
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = self
            .port
            .or_else(|| lookup("FLASK_PORT").and_then(|p| p.trim().parse().ok()))
            .unwrap_or(DEFAULT_PORT);
        if host.contains(':') && !host.starts_with('[') {
            format!("[{}]:{}", host, port) // bare IPv6
        } else {
            format!("{}:{}", host, port)
        }
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.mode_cooldown)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout)
    }

    pub fn health_interval(&self) -> Duration {
        Duration::from_secs(self.health_interval.max(1))
    }
}

// "host:7070/api/" -> "http://host:7070/api"
pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}
