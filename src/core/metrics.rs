use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled || PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

pub(crate) fn attempt_started(resumed: bool) {
    let kind = if resumed { "resumed" } else { "new" };
    metrics::counter!("cbt_attempts_started_total", "kind" => kind).increment(1);
}

pub(crate) fn attempt_finished(reason: &'static str, percentage: i32) {
    metrics::counter!("cbt_attempts_finished_total", "reason" => reason).increment(1);
    metrics::histogram!("cbt_attempt_percentage").record(f64::from(percentage));
}

pub(crate) fn attendance_check_in(verified: bool) {
    let label = if verified { "true" } else { "false" };
    metrics::counter!("attendance_checkins_total", "verified" => label).increment(1);
}
