//! Shared fixtures for inbound HTTP tests.

use std::sync::Arc;

use actix_session::SessionMiddleware;
use actix_session::storage::CookieSessionStore;
use actix_web::cookie::{Cookie, Key, SameSite};
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, web};

use crate::domain::ports::{FixtureIdentityProviderFactory, FixtureRegistrationStore};
use crate::domain::{AppId, CollectionPath, VisitRegistry};

use super::error::json_error_handler;
use super::session_config::{SESSION_COOKIE, SessionSettings};
use super::state::HttpState;

pub const TEST_APP_ID: &str = "thdc-test";

/// Cookie session over plain HTTP with a throwaway key.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionSettings {
        key: Key::generate(),
        cookie_secure: false,
        same_site: SameSite::Lax,
    }
    .middleware()
}

/// Visits backed by `providers` and `store`, writing under [`TEST_APP_ID`].
pub fn fixture_state(
    providers: FixtureIdentityProviderFactory,
    store: Arc<FixtureRegistrationStore>,
) -> HttpState {
    let app_id = AppId::new(TEST_APP_ID).expect("test app id");
    HttpState::new(Arc::new(VisitRegistry::new(
        Arc::new(providers),
        store,
        CollectionPath::registrations(&app_id),
        Arc::new(mockable::DefaultClock),
    )))
}

/// The `/api/v1` routes over `state`, with sessions and JSON errors wired
/// the way the server wires them.
pub fn test_app(
    state: HttpState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(state))
        .app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .wrap(test_session_middleware())
        .service(web::scope("/api/v1").configure(super::configure_api))
}

pub fn session_cookie(res: &ServiceResponse) -> Cookie<'static> {
    res.response()
        .cookies()
        .find(|cookie| cookie.name() == SESSION_COOKIE)
        .expect("session cookie set")
        .into_owned()
}
