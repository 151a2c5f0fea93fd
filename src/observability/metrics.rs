//! Prometheus metrics.
//!
//! A run is a short-lived process, so metrics are rendered once at exit
//! and pushed to a Prometheus push gateway when one is configured.

use crate::config::MetricsSettings;
use crate::{Error, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

/// Metrics configuration.
#[derive(Debug, Clone, Default)]
pub struct MetricsConfig {
    /// Whether metrics are recorded.
    pub enabled: bool,
    /// Push gateway endpoint.
    pub push_gateway: Option<String>,
}

impl MetricsConfig {
    /// Builds metrics configuration from config settings.
    #[must_use]
    pub fn from_settings(settings: &MetricsSettings) -> Self {
        let push_gateway = settings
            .push_gateway
            .as_ref()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        Self {
            enabled: settings.enabled,
            push_gateway,
        }
    }
}

/// Metrics handle for flushing on shutdown.
#[derive(Debug)]
pub struct MetricsHandle {
    prometheus: PrometheusHandle,
    push_gateway: Option<String>,
}

impl MetricsHandle {
    /// Renders the current metrics in Prometheus text format.
    #[must_use]
    pub fn render(&self) -> String {
        self.prometheus.render()
    }
}

/// Installs the Prometheus recorder as the global metrics recorder.
///
/// Returns `None` when metrics are disabled; the `metrics` macros are
/// then no-ops.
///
/// # Errors
///
/// Returns an error if a global recorder is already installed.
pub fn install_prometheus(config: &MetricsConfig) -> Result<Option<MetricsHandle>> {
    if !config.enabled {
        return Ok(None);
    }

    let prometheus = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| Error::OperationFailed {
            operation: "metrics_recorder_install".to_string(),
            cause: e.to_string(),
        })?;

    Ok(Some(MetricsHandle {
        prometheus,
        push_gateway: config.push_gateway.clone(),
    }))
}

/// Pushes metrics to the push gateway if configured.
pub fn flush(handle: &MetricsHandle) {
    let Some(endpoint) = &handle.push_gateway else {
        tracing::debug!("No push gateway configured, skipping flush");
        return;
    };

    let mut payload = handle.render();
    // The push gateway rejects payloads without a final newline
    if !payload.ends_with('\n') {
        payload.push('\n');
    }

    tracing::debug!(
        bytes = payload.len(),
        endpoint = %endpoint,
        "Pushing metrics to push gateway"
    );

    let response = Client::new()
        .put(endpoint)
        .header(CONTENT_TYPE, "text/plain; version=0.0.4")
        .timeout(Duration::from_secs(5))
        .body(payload)
        .send();

    match response {
        Ok(resp) => {
            if resp.status().is_success() {
                tracing::debug!(status = %resp.status(), "Metrics pushed successfully");
            } else {
                tracing::warn!(status = %resp.status(), "Metrics push failed");
            }
        },
        Err(err) => {
            tracing::warn!("Failed to push metrics: {err}");
        },
    }
}
