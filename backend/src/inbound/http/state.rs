//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain services and remain testable without I/O.

use std::sync::Arc;

use crate::domain::{Error, SiteContent, Visit, VisitRegistry};

use super::session::VisitCookie;

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub visits: Arc<VisitRegistry>,
    pub content: Arc<SiteContent>,
}

impl HttpState {
    /// Construct state around a visit registry.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    ///
    /// use thdc_backend::domain::ports::{
    ///     FixtureIdentityProviderFactory, FixtureRegistrationStore,
    /// };
    /// use thdc_backend::domain::{AppId, CollectionPath, VisitRegistry};
    /// use thdc_backend::inbound::http::state::HttpState;
    ///
    /// let registry = VisitRegistry::new(
    ///     Arc::new(FixtureIdentityProviderFactory::default()),
    ///     Arc::new(FixtureRegistrationStore::default()),
    ///     CollectionPath::registrations(&AppId::new("thdc").expect("app id")),
    ///     Arc::new(mockable::DefaultClock),
    /// );
    /// let state = HttpState::new(Arc::new(registry));
    /// assert!(state.visits.is_empty());
    /// ```
    pub fn new(visits: Arc<VisitRegistry>) -> Self {
        Self {
            visits,
            content: Arc::new(SiteContent::current()),
        }
    }

    /// Visit bound to the caller's session.
    ///
    /// A session pointing at a closed or evicted visit is cleared and
    /// answered with `401`.
    pub fn current_visit(&self, session: &VisitCookie) -> Result<Arc<Visit>, Error> {
        let id = session.require_visit()?;
        match self.visits.get(id) {
            Some(visit) => Ok(visit),
            None => {
                session.forget();
                Err(Error::unauthorized("visit has expired; open a new one"))
            }
        }
    }
}
