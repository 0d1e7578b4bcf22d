//! Metrics for the enrichment pipeline
//!
//! Metric names live in [`MetricName`]; recording helpers are grouped per
//! pipeline stage. Without an installed recorder every call is a no-op, so
//! library code and tests never need to initialize anything.

use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Geocoding
    GeocodeAttempts,
    GeocodeResolved,
    GeocodeNoMatch,
    GeocodeExhausted,
    GeocodeRetryDelays,

    // Join
    JoinMatched,
    JoinUnmatched,

    // Derivation
    DeriveIssues,

    // Export
    ExportRows,

    // Run
    RunDuration,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::GeocodeAttempts => "voter_geocode_attempts_total",
            MetricName::GeocodeResolved => "voter_geocode_resolved_total",
            MetricName::GeocodeNoMatch => "voter_geocode_no_match_total",
            MetricName::GeocodeExhausted => "voter_geocode_exhausted_total",
            MetricName::GeocodeRetryDelays => "voter_geocode_retry_delays_total",
            MetricName::JoinMatched => "voter_join_matched_total",
            MetricName::JoinUnmatched => "voter_join_unmatched_total",
            MetricName::DeriveIssues => "voter_derive_issues_total",
            MetricName::ExportRows => "voter_export_rows_total",
            MetricName::RunDuration => "voter_run_duration_seconds",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static METRICS_HANDLE: OnceLock<metrics_exporter_prometheus::PrometheusHandle> = OnceLock::new();

/// Installs the Prometheus recorder. Call once from the binary.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    let handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))?;
    METRICS_HANDLE.set(handle).ok();
    info!("Metrics system initialized");
    Ok(())
}

/// Renders the current metric values, if a recorder was installed.
pub fn render() -> Option<String> {
    METRICS_HANDLE.get().map(|handle| handle.render())
}

/// Pushes everything recorded so far to a Prometheus Pushgateway.
///
/// Failures are logged and swallowed; metrics never fail a run.
pub async fn push_to_gateway(pushgateway_url: &str, instance: &str) {
    let Some(body) = render() else {
        return;
    };
    let push_url = format!(
        "{}/metrics/job/voter_demographics/instance/{}",
        pushgateway_url.trim_end_matches('/'),
        instance
    );

    let result = reqwest::Client::new()
        .post(&push_url)
        .header("Content-Type", "text/plain; version=0.0.4")
        .body(body)
        .send()
        .await;

    match result {
        Ok(r) if r.status().is_success() => {
            info!("Pushed metrics to Pushgateway for instance={}", instance);
        }
        Ok(r) => {
            warn!(
                "Pushgateway push responded with status {} for instance={}",
                r.status().as_u16(),
                instance
            );
        }
        Err(e) => {
            warn!("Failed to push metrics to Pushgateway: {}", e);
        }
    }
}

pub mod geocode {
    use super::MetricName;

    pub fn attempt() {
        ::metrics::counter!(MetricName::GeocodeAttempts.as_str()).increment(1);
    }

    pub fn resolved() {
        ::metrics::counter!(MetricName::GeocodeResolved.as_str()).increment(1);
    }

    pub fn no_match() {
        ::metrics::counter!(MetricName::GeocodeNoMatch.as_str()).increment(1);
    }

    pub fn exhausted() {
        ::metrics::counter!(MetricName::GeocodeExhausted.as_str()).increment(1);
    }

    pub fn retry_delay() {
        ::metrics::counter!(MetricName::GeocodeRetryDelays.as_str()).increment(1);
    }
}

pub mod join {
    use super::MetricName;

    pub fn matched(rows: usize) {
        ::metrics::counter!(MetricName::JoinMatched.as_str()).increment(rows as u64);
    }

    pub fn unmatched(rows: usize) {
        ::metrics::counter!(MetricName::JoinUnmatched.as_str()).increment(rows as u64);
    }
}

pub mod derive {
    use super::MetricName;

    pub fn issue(kind: &'static str) {
        ::metrics::counter!(MetricName::DeriveIssues.as_str(), "kind" => kind).increment(1);
    }
}

pub mod export {
    use super::MetricName;

    pub fn rows_written(format: &'static str, rows: usize) {
        ::metrics::counter!(MetricName::ExportRows.as_str(), "format" => format)
            .increment(rows as u64);
    }
}

pub fn run_finished(duration: Duration) {
    ::metrics::histogram!(MetricName::RunDuration.as_str()).record(duration.as_secs_f64());
}
