//! Prometheus request metrics plus visit gauges.

use actix_web_prom::{PrometheusMetrics, PrometheusMetricsBuilder};
use prometheus::{IntCounter, IntGauge, Registry};

/// Instruments updated by the visit sweeper.
#[derive(Clone)]
pub(crate) struct VisitMetrics {
    open_visits: IntGauge,
    evicted_visits: IntCounter,
}

/// Build the request middleware and the visit instruments over one registry
/// exposed at `/metrics`.
///
/// # Errors
/// Returns [`std::io::Error`] when a collector cannot be registered.
pub(crate) fn build_metrics() -> std::io::Result<(PrometheusMetrics, VisitMetrics)> {
    let registry = Registry::new();
    let open_visits = IntGauge::new("thdc_open_visits", "Visits currently held in memory")
        .map_err(registration_error)?;
    let evicted_visits = IntCounter::new(
        "thdc_visits_evicted_total",
        "Visits dropped after idling past their lifetime",
    )
    .map_err(registration_error)?;
    registry
        .register(Box::new(open_visits.clone()))
        .map_err(registration_error)?;
    registry
        .register(Box::new(evicted_visits.clone()))
        .map_err(registration_error)?;

    let middleware = PrometheusMetricsBuilder::new("thdc")
        .registry(registry)
        .endpoint("/metrics")
        .build()
        .map_err(|err| std::io::Error::other(format!("configure Prometheus metrics: {err}")))?;

    Ok((
        middleware,
        VisitMetrics {
            open_visits,
            evicted_visits,
        },
    ))
}

impl VisitMetrics {
    /// Record the outcome of one sweep.
    pub(crate) fn record_sweep(&self, open: usize, evicted: usize) {
        self.open_visits.set(i64::try_from(open).unwrap_or(i64::MAX));
        self.evicted_visits
            .inc_by(u64::try_from(evicted).unwrap_or(u64::MAX));
    }
}

fn registration_error(err: prometheus::Error) -> std::io::Error {
    std::io::Error::other(format!("visit metrics registration failed: {err}"))
}
