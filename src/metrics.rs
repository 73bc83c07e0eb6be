use lazy_static::lazy_static;
use prometheus::{
    Counter, Encoder, Gauge, Histogram, TextEncoder, register_counter, register_gauge,
    register_histogram,
};


lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("evcc_gateway_requests_total", "Total number of control requests").unwrap();
    pub static ref MODE_CHANGES: Counter =
        register_counter!("evcc_gateway_mode_changes_total", "Mode changes confirmed by evcc").unwrap();
    pub static ref MODE_THROTTLED: Counter =
        register_counter!("evcc_gateway_mode_throttled_total", "Mode changes rejected by the cooldown").unwrap();
    pub static ref UPSTREAM_ERRORS: Counter =
        register_counter!("evcc_gateway_upstream_errors_total", "Failed or rejected evcc calls").unwrap();
    pub static ref UPSTREAM_LATENCY: Histogram = register_histogram!(
        "evcc_gateway_upstream_latency_seconds",
        "evcc call latency in seconds"
    )
    .unwrap();
    pub static ref UPSTREAM_UP: Gauge =
        register_gauge!("evcc_gateway_upstream_up", "1 if the last evcc contact succeeded").unwrap();
}

// Text exposition of the default registry
pub fn render() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
