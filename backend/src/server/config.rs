//! Everything `create_server` needs, gathered before any socket is bound.

use std::net::SocketAddr;
use std::time::Duration;

use thdc_backend::domain::DEFAULT_VISIT_TTL;
use thdc_backend::inbound::http::session_config::SessionSettings;
use thdc_backend::outbound::firebase::FirebaseSettings;

use super::settings::DEFAULT_SWEEP_INTERVAL;

/// Server wiring: cookie policy, listener, adapters and visit lifetime.
///
/// Without [`ServerConfig::with_firebase`] the ports are served by the
/// in-memory fixtures.
pub struct ServerConfig {
    pub(crate) session: SessionSettings,
    pub(crate) bind_addr: SocketAddr,
    pub(crate) firebase: Option<FirebaseSettings>,
    pub(crate) visit_ttl: Duration,
    pub(crate) sweep_interval: Duration,
}

impl ServerConfig {
    #[must_use]
    pub fn new(session: SessionSettings, bind_addr: SocketAddr) -> Self {
        Self {
            session,
            bind_addr,
            firebase: None,
            visit_ttl: DEFAULT_VISIT_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    #[must_use]
    pub fn with_firebase(self, settings: FirebaseSettings) -> Self {
        Self {
            firebase: Some(settings),
            ..self
        }
    }

    /// Idle visits are dropped after `ttl`, checked every `sweep_interval`.
    #[must_use]
    pub fn with_visit_lifetime(self, ttl: Duration, sweep_interval: Duration) -> Self {
        Self {
            visit_ttl: ttl,
            sweep_interval,
            ..self
        }
    }
}
