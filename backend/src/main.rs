//! `thdc-backend`: serves the THDC registration API.

mod server;

use std::io;

use actix_web::web;
use mockable::DefaultEnv;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use server::{ServerConfig, ServerSettings, StoreBackend, create_server};
use thdc_backend::inbound::http::health::HealthState;
use thdc_backend::inbound::http::session_config::{BuildMode, session_settings_from_env};
use thdc_backend::outbound::firebase::FirebaseSettings;

fn startup_error(stage: &str, err: impl std::fmt::Display) -> io::Error {
    io::Error::other(format!("{stage}: {err}"))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    if let Err(err) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %err, "tracing init failed");
    }

    let env = DefaultEnv::new();
    let settings =
        ServerSettings::load().map_err(|err| startup_error("failed to load settings", err))?;
    let session = session_settings_from_env(&env, BuildMode::from_debug_assertions())
        .map_err(|err| startup_error("invalid session configuration", err))?;
    let bind_addr = settings.bind_addr()?;

    let mut config = ServerConfig::new(session, bind_addr)
        .with_visit_lifetime(settings.visit_ttl(), settings.sweep_interval());
    match settings.store()? {
        StoreBackend::Firebase => {
            let firebase = FirebaseSettings::from_env(&env)
                .map_err(|err| startup_error("invalid firebase configuration", err))?;
            config = config.with_firebase(firebase);
        }
        StoreBackend::Fixture => warn!("THDC_STORE=fixture; registrations stay in memory"),
    }

    let server = create_server(web::Data::new(HealthState::new()), config)?;
    info!(addr = %bind_addr, "listening");
    server.await
}
