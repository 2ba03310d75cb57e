//! Builders for HTTP state from the configured adapters.

use std::sync::Arc;

use mockable::DefaultClock;
use tracing::info;

use thdc_backend::domain::ports::{
    FixtureIdentityProviderFactory, FixtureRegistrationStore, IdentityProviderFactory,
    RegistrationStore,
};
use thdc_backend::domain::{AppId, CollectionPath, CustomToken, VisitRegistry};
use thdc_backend::inbound::http::state::HttpState;
use thdc_backend::outbound::firebase::{
    FirebaseIdentityProviderFactory, FirebaseSettings, FirestoreRegistrationStore,
};

use super::ServerConfig;

/// Application namespace used when running on fixtures.
const FIXTURE_APP_ID: &str = "thdc-local";

struct Ports {
    providers: Arc<dyn IdentityProviderFactory>,
    store: Arc<dyn RegistrationStore>,
    app_id: AppId,
    initial_token: Option<CustomToken>,
}

fn firebase_ports(settings: &FirebaseSettings) -> std::io::Result<Ports> {
    let client_error =
        |err: reqwest::Error| std::io::Error::other(format!("firebase client setup failed: {err}"));
    let providers = FirebaseIdentityProviderFactory::from_settings(settings).map_err(client_error)?;
    let store = FirestoreRegistrationStore::from_settings(settings).map_err(client_error)?;
    info!(
        project_id = %settings.project_id,
        app_id = %settings.app_id.as_ref(),
        "using firebase adapters"
    );
    Ok(Ports {
        providers: Arc::new(providers),
        store: Arc::new(store),
        app_id: settings.app_id.clone(),
        initial_token: settings.initial_auth_token.clone(),
    })
}

fn fixture_ports() -> std::io::Result<Ports> {
    let app_id = AppId::new(FIXTURE_APP_ID)
        .map_err(|err| std::io::Error::other(format!("fixture app id invalid: {err}")))?;
    info!(app_id = FIXTURE_APP_ID, "using in-memory fixture adapters");
    Ok(Ports {
        providers: Arc::new(FixtureIdentityProviderFactory::default()),
        store: Arc::new(FixtureRegistrationStore::default()),
        app_id,
        initial_token: None,
    })
}

/// Build the shared HTTP state, backed by Firebase when configured and by
/// fixtures otherwise.
///
/// # Errors
/// Returns [`std::io::Error`] when an HTTP client cannot be constructed.
pub(super) fn build_http_state(config: &ServerConfig) -> std::io::Result<HttpState> {
    let ports = match &config.firebase {
        Some(settings) => firebase_ports(settings)?,
        None => fixture_ports()?,
    };
    let registry = VisitRegistry::new(
        ports.providers,
        ports.store,
        CollectionPath::registrations(&ports.app_id),
        Arc::new(DefaultClock),
    )
    .with_initial_token(ports.initial_token)
    .with_ttl(config.visit_ttl);
    Ok(HttpState::new(Arc::new(registry)))
}
