use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
pub static PROMETHEUS_REGISTRY: OnceLock<Registry> = OnceLock::new();
pub static TV_CODES_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static OAUTH_TOKENS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Installs the `metrics` recorder used by the HTTP middleware and registers
/// the pairing counters. Calling it twice is an error.
pub fn init_metrics() -> Result<(), anyhow::Error> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {}", e))?;

    if METRICS_HANDLE.set(handle).is_err() {
        return Err(anyhow::anyhow!("Metrics handle already initialized"));
    }

    let registry = Registry::new();

    let tv_codes = IntCounterVec::new(
        Opts::new("tv_codes_total", "TV pairing code lifecycle events"),
        &["event"],
    )?;
    let oauth_tokens = IntCounterVec::new(
        Opts::new("oauth_tokens_total", "Access token issuance and rotation events"),
        &["event"],
    )?;

    registry.register(Box::new(tv_codes.clone()))?;
    registry.register(Box::new(oauth_tokens.clone()))?;

    let _ = PROMETHEUS_REGISTRY.set(registry);
    let _ = TV_CODES_TOTAL.set(tv_codes);
    let _ = OAUTH_TOKENS_TOTAL.set(oauth_tokens);
    Ok(())
}

pub fn get_metrics() -> String {
    let mut output = METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string());

    if let Some(registry) = PROMETHEUS_REGISTRY.get() {
        let mut buffer = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&registry.gather(), &mut buffer) {
            tracing::error!("Failed to encode metrics: {}", e);
        }
        if let Ok(custom_metrics) = String::from_utf8(buffer) {
            output.push_str(&custom_metrics);
        }
    }

    output
}

/// `generated`, `activated`, `consumed` or `purged`.
pub fn record_tv_code_event(event: &str) {
    record_tv_code_events(event, 1);
}

pub fn record_tv_code_events(event: &str, count: u64) {
    if let Some(counter) = TV_CODES_TOTAL.get() {
        counter.with_label_values(&[event]).inc_by(count);
    }
}

/// `issued`, `rotated` or `rejected`.
pub fn record_token_event(event: &str) {
    if let Some(counter) = OAUTH_TOKENS_TOTAL.get() {
        counter.with_label_values(&[event]).inc();
    }
}
