//! Liveness and readiness probes.
//!
//! The server moves through three phases. It is `starting` until the listener
//! is bound and the Firebase adapters are wired, `serving` afterwards, and
//! `draining` once shutdown begins. Readiness holds only while serving;
//! liveness fails only while draining.

use std::sync::atomic::{AtomicU8, Ordering};

use actix_web::{HttpResponse, get, http::header, web};
use serde::Serialize;
use tracing::debug;

/// Lifecycle phase reported by the probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Phase {
    Starting = 0,
    Serving = 1,
    Draining = 2,
}

impl Phase {
    const fn from_repr(raw: u8) -> Self {
        match raw {
            0 => Self::Starting,
            1 => Self::Serving,
            _ => Self::Draining,
        }
    }
}

/// Phase shared between the server lifecycle and the probe handlers.
#[derive(Debug)]
pub struct HealthState(AtomicU8);

impl Default for HealthState {
    fn default() -> Self {
        Self(AtomicU8::new(Phase::Starting as u8))
    }
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        Phase::from_repr(self.0.load(Ordering::Acquire))
    }

    /// Enter `serving`, unless shutdown has already begun.
    pub fn mark_serving(&self) {
        if let Err(current) = self.0.compare_exchange(
            Phase::Starting as u8,
            Phase::Serving as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            debug!(phase = ?Phase::from_repr(current), "serving phase skipped");
        }
    }

    pub fn begin_draining(&self) {
        self.0.store(Phase::Draining as u8, Ordering::Release);
    }
}

#[derive(Serialize)]
struct ProbeBody {
    phase: Phase,
}

fn probe_response(phase: Phase, passes: bool) -> HttpResponse {
    let mut response = if passes {
        HttpResponse::Ok()
    } else {
        HttpResponse::ServiceUnavailable()
    };
    response
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .json(ProbeBody { phase })
}

/// Readiness probe.
#[utoipa::path(
    get,
    path = "/health/ready",
    tags = ["health"],
    security([]),
    responses(
        (status = 200, description = "Accepting visits"),
        (status = 503, description = "Starting up or draining")
    )
)]
#[get("/health/ready")]
pub async fn ready(state: web::Data<HealthState>) -> HttpResponse {
    let phase = state.phase();
    probe_response(phase, phase == Phase::Serving)
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health/live",
    tags = ["health"],
    security([]),
    responses(
        (status = 200, description = "Process is alive"),
        (status = 503, description = "Draining for shutdown")
    )
)]
#[get("/health/live")]
pub async fn live(state: web::Data<HealthState>) -> HttpResponse {
    let phase = state.phase();
    probe_response(phase, phase != Phase::Draining)
}
