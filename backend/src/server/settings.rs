//! Server settings loaded via OrthoConfig.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use thdc_backend::domain::DEFAULT_VISIT_TTL;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_STORE: &str = "fixture";
pub(super) const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Which adapters back the identity and registration ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Firebase Authentication and Firestore.
    Firebase,
    /// In-memory fixtures for local runs.
    Fixture,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "firebase" => Ok(Self::Firebase),
            "fixture" => Ok(Self::Fixture),
            other => Err(format!("unknown store '{other}'; expected firebase|fixture")),
        }
    }
}

/// Configuration values controlling the HTTP server.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "THDC")]
pub struct ServerSettings {
    /// Socket address to listen on.
    #[ortho_config(default = DEFAULT_BIND_ADDR.to_owned())]
    pub bind_addr: String,
    /// `firebase` or `fixture`.
    #[ortho_config(default = DEFAULT_STORE.to_owned())]
    pub store: String,
    /// Idle lifetime of a visit in seconds.
    pub visit_ttl_secs: Option<u64>,
    /// Interval between idle-visit sweeps in seconds.
    pub sweep_interval_secs: Option<u64>,
}

impl ServerSettings {
    /// Configured bind address; `0.0.0.0:8080` unless overridden.
    pub fn bind_addr(&self) -> std::io::Result<SocketAddr> {
        let raw = self.bind_addr.as_str();
        raw.parse().map_err(|err| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid THDC_BIND_ADDR '{raw}': {err}"),
            )
        })
    }

    /// Configured backend; the fixtures unless overridden.
    pub fn store(&self) -> std::io::Result<StoreBackend> {
        StoreBackend::from_str(&self.store)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err))
    }

    /// Configured visit lifetime; zero is treated as unset.
    pub fn visit_ttl(&self) -> Duration {
        self.visit_ttl_secs
            .filter(|secs| *secs > 0)
            .map_or(DEFAULT_VISIT_TTL, Duration::from_secs)
    }

    /// Configured sweep interval; zero is treated as unset.
    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval_secs
            .filter(|secs| *secs > 0)
            .map_or(DEFAULT_SWEEP_INTERVAL, Duration::from_secs)
    }
}
