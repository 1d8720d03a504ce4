use crate::constants::PUSHGATEWAY_JOB;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::{info, warn};

/// Installs the Prometheus recorder that backs the `metrics` macros.
///
/// Returns `None` if a recorder is already installed.
pub fn init_metrics() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Prometheus recorder install failed (possibly already installed): {}", e);
            None
        }
    }
}

pub fn push_url(base: &str, instance: &str) -> String {
    format!("{}/metrics/job/{}/instance/{}", base.trim_end_matches('/'), PUSHGATEWAY_JOB, instance)
}

/// Pushes the current metrics snapshot to a Pushgateway. Failures are only logged.
pub async fn push_to_gateway(base: &str, instance: &str, handle: &PrometheusHandle) {
    let url = push_url(base, instance);
    let body = handle.render();

    let client = reqwest::Client::new();
    let res = client
        .post(&url)
        .header("Content-Type", "text/plain; version=0.0.4")
        .body(body)
        .send()
        .await;

    match res {
        Ok(r) if r.status().is_success() => {
            info!("Pushed metrics to Pushgateway for instance={}", instance);
        }
        Ok(r) => {
            warn!("Pushgateway push responded with status {} for instance={}", r.status().as_u16(), instance);
        }
        Err(e) => {
            warn!("Failed to push metrics to Pushgateway for instance={}: {}", instance, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_url_trims_trailing_slash() {
        assert_eq!(
            push_url("http://localhost:9091/", "2021-01"),
            "http://localhost:9091/metrics/job/ride_duration/instance/2021-01"
        );
    }
}
