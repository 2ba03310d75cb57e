//! Visit lifecycle: one bootstrapper and one registration flow per
//! application load.
//!
//! Visits live in memory. They end when the browser closes them or after
//! sitting idle past the registry's TTL; either way the bootstrapper's
//! listener is released.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::ports::{IdentityProviderFactory, RegistrationStore};
use super::{CollectionPath, CustomToken, IdentityHandle, RegistrationFlow, SessionBootstrapper};

/// Default idle lifetime of a visit.
pub const DEFAULT_VISIT_TTL: Duration = Duration::from_secs(30 * 60);

/// Identifier of one visit, carried in the session cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisitId(Uuid);

impl VisitId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for VisitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for VisitId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A live application load.
pub struct Visit {
    id: VisitId,
    bootstrapper: SessionBootstrapper,
    flow: RegistrationFlow,
}

impl Visit {
    pub fn id(&self) -> VisitId {
        self.id
    }

    pub fn identity(&self) -> IdentityHandle {
        self.bootstrapper.identity()
    }

    pub fn flow(&self) -> &RegistrationFlow {
        &self.flow
    }

    fn shutdown(&self) {
        self.bootstrapper.shutdown();
    }
}

struct VisitEntry {
    visit: Arc<Visit>,
    last_seen: DateTime<Utc>,
}

/// In-memory table of live visits.
pub struct VisitRegistry {
    providers: Arc<dyn IdentityProviderFactory>,
    store: Arc<dyn RegistrationStore>,
    collection: CollectionPath,
    initial_token: Option<CustomToken>,
    clock: Arc<dyn Clock>,
    ttl: TimeDelta,
    visits: Mutex<HashMap<VisitId, VisitEntry>>,
}

impl VisitRegistry {
    pub fn new(
        providers: Arc<dyn IdentityProviderFactory>,
        store: Arc<dyn RegistrationStore>,
        collection: CollectionPath,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            providers,
            store,
            collection,
            initial_token: None,
            clock,
            ttl: TimeDelta::from_std(DEFAULT_VISIT_TTL).unwrap_or(TimeDelta::MAX),
            visits: Mutex::new(HashMap::new()),
        }
    }

    /// Sign every new visit in with this token first.
    pub fn with_initial_token(mut self, token: Option<CustomToken>) -> Self {
        self.initial_token = token;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);
        self
    }

    fn visits(&self) -> MutexGuard<'_, HashMap<VisitId, VisitEntry>> {
        self.visits.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a visit: a fresh provider, a bootstrapper and an idle form.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn open(&self) -> Arc<Visit> {
        let id = VisitId::random();
        let bootstrapper =
            SessionBootstrapper::start(self.providers.create(), self.initial_token.clone());
        let flow = RegistrationFlow::new(
            Arc::new(bootstrapper.identity()),
            Arc::clone(&self.store),
            self.collection.clone(),
        );
        let visit = Arc::new(Visit {
            id,
            bootstrapper,
            flow,
        });

        self.visits().insert(
            id,
            VisitEntry {
                visit: Arc::clone(&visit),
                last_seen: self.clock.utc(),
            },
        );
        info!(visit_id = %id, "visit opened");
        visit
    }

    /// Look up a visit and mark it as seen.
    pub fn get(&self, id: VisitId) -> Option<Arc<Visit>> {
        let now = self.clock.utc();
        let mut visits = self.visits();
        let entry = visits.get_mut(&id)?;
        entry.last_seen = now;
        Some(Arc::clone(&entry.visit))
    }

    /// End a visit. Returns `false` when it was already gone.
    pub fn close(&self, id: VisitId) -> bool {
        let removed = self.visits().remove(&id);
        match removed {
            Some(entry) => {
                entry.visit.shutdown();
                info!(visit_id = %id, "visit closed");
                true
            }
            None => false,
        }
    }

    /// Drop visits idle for longer than the TTL. Returns how many went.
    pub fn evict_idle(&self) -> usize {
        let cutoff = self
            .clock
            .utc()
            .checked_sub_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let expired: Vec<Arc<Visit>> = {
            let mut visits = self.visits();
            let ids: Vec<VisitId> = visits
                .iter()
                .filter(|(_, entry)| entry.last_seen < cutoff)
                .map(|(id, _)| *id)
                .collect();
            ids.into_iter()
                .filter_map(|id| visits.remove(&id))
                .map(|entry| entry.visit)
                .collect()
        };

        for visit in &expired {
            visit.shutdown();
            debug!(visit_id = %visit.id(), "idle visit evicted");
        }
        if !expired.is_empty() {
            info!(evicted = expired.len(), "evicted idle visits");
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.visits().len()
    }

    pub fn is_empty(&self) -> bool {
        self.visits().is_empty()
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::AppId;
    use crate::domain::ports::{
        CurrentIdentity, FixtureIdentityProviderFactory, FixtureRegistrationStore,
    };
    use chrono::{Local, TimeZone};
    use rstest::{fixture, rstest};

    struct SteppingClock(Mutex<DateTime<Utc>>);

    impl SteppingClock {
        fn advance(&self, by: TimeDelta) {
            let mut now = self.0.lock().unwrap_or_else(PoisonError::into_inner);
            *now += by;
        }
    }

    impl Clock for SteppingClock {
        fn local(&self) -> DateTime<Local> {
            self.utc().with_timezone(&Local)
        }

        fn utc(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    #[fixture]
    fn clock() -> Arc<SteppingClock> {
        let start = Utc
            .with_ymd_and_hms(2026, 3, 1, 9, 0, 0)
            .single()
            .expect("valid timestamp");
        Arc::new(SteppingClock(Mutex::new(start)))
    }

    fn registry(clock: Arc<SteppingClock>) -> VisitRegistry {
        VisitRegistry::new(
            Arc::new(FixtureIdentityProviderFactory::default()),
            Arc::new(FixtureRegistrationStore::default()),
            CollectionPath::registrations(&AppId::new("thdc").expect("app id")),
            clock,
        )
        .with_ttl(Duration::from_secs(60))
    }

    #[rstest]
    #[tokio::test]
    async fn opened_visit_signs_in_and_is_retrievable(clock: Arc<SteppingClock>) {
        let registry = registry(clock);
        let visit = registry.open();

        let identity = visit.identity().resolved().await.expect("identity");
        let found = registry.get(visit.id()).expect("visit registered");

        assert_eq!(found.identity().current(), Some(identity));
        assert_eq!(registry.len(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn visits_get_distinct_identities(clock: Arc<SteppingClock>) {
        let registry = registry(clock);
        let first = registry.open().identity().resolved().await.expect("first");
        let second = registry.open().identity().resolved().await.expect("second");
        assert_ne!(first.user_id(), second.user_id());
    }

    #[rstest]
    #[tokio::test]
    async fn close_removes_visit_once(clock: Arc<SteppingClock>) {
        let registry = registry(clock);
        let visit = registry.open();

        assert!(registry.close(visit.id()));
        assert!(!registry.close(visit.id()));
        assert!(registry.get(visit.id()).is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn evict_idle_keeps_recently_seen_visits(clock: Arc<SteppingClock>) {
        let registry = registry(clock.clone());
        let stale = registry.open();
        let fresh = registry.open();

        clock.advance(TimeDelta::seconds(45));
        registry.get(fresh.id()).expect("fresh visit");
        clock.advance(TimeDelta::seconds(30));

        assert_eq!(registry.evict_idle(), 1);
        assert!(registry.get(stale.id()).is_none());
        assert!(registry.get(fresh.id()).is_some());
    }

    #[rstest]
    #[case("not-a-uuid", false)]
    #[case("6f1c1a5e-8d5b-4c43-9b7e-2f2c5a0d9e11", true)]
    fn visit_ids_parse_from_uuid_text(#[case] raw: &str, #[case] ok: bool) {
        assert_eq!(raw.parse::<VisitId>().is_ok(), ok);
    }
}
