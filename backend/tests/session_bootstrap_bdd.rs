//! Behaviour tests for per-visit sign-in.
//
// rstest-bdd generates guard variables with double underscores, which trips
// the non_snake_case lint under -D warnings.
#![allow(non_snake_case)]

use std::cell::RefCell;
use std::sync::Arc;
use std::time::Duration;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tokio::runtime::Runtime;

use thdc_backend::domain::ports::{CurrentIdentity, FixtureIdentityProvider};
use thdc_backend::domain::{CustomToken, SessionBootstrapper, SessionIdentity};

const SETTLE: Duration = Duration::from_millis(20);
const RESOLVE_TIMEOUT: Duration = Duration::from_secs(1);

// Fields drop in order: the visit's tasks are aborted before the runtime goes.
struct BootstrapWorld {
    bootstrapper: RefCell<Option<SessionBootstrapper>>,
    provider: RefCell<Option<Arc<FixtureIdentityProvider>>>,
    runtime: Runtime,
}

impl BootstrapWorld {
    fn new() -> Self {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("tokio runtime");
        Self {
            bootstrapper: RefCell::new(None),
            provider: RefCell::new(None),
            runtime,
        }
    }

    fn use_provider(&self, provider: FixtureIdentityProvider) {
        *self.provider.borrow_mut() = Some(Arc::new(provider));
    }

    fn provider(&self) -> Arc<FixtureIdentityProvider> {
        self.provider
            .borrow()
            .clone()
            .expect("identity service configured")
    }

    fn start(&self, token: Option<CustomToken>) {
        let _guard = self.runtime.enter();
        let bootstrapper = SessionBootstrapper::start(self.provider(), token);
        *self.bootstrapper.borrow_mut() = Some(bootstrapper);
    }

    fn resolved(&self) -> SessionIdentity {
        let handle = self
            .bootstrapper
            .borrow()
            .as_ref()
            .expect("visit started")
            .identity();
        self.runtime
            .block_on(async { tokio::time::timeout(RESOLVE_TIMEOUT, handle.resolved()).await })
            .expect("sign-in resolved in time")
            .expect("identity published")
    }

    fn current_after_settling(&self) -> Option<SessionIdentity> {
        self.runtime
            .block_on(async { tokio::time::sleep(SETTLE).await });
        self.bootstrapper
            .borrow()
            .as_ref()
            .expect("visit started")
            .identity()
            .current()
    }
}

#[fixture]
fn world() -> BootstrapWorld {
    BootstrapWorld::new()
}

#[given("an identity service that accepts anonymous sign-in")]
fn an_identity_service_that_accepts_anonymous_sign_in(world: &BootstrapWorld) {
    world.use_provider(FixtureIdentityProvider::new());
}

#[given("an identity service that rejects custom tokens")]
fn an_identity_service_that_rejects_custom_tokens(world: &BootstrapWorld) {
    world.use_provider(FixtureIdentityProvider::new().rejecting_custom_tokens());
}

#[given("an identity service that is unavailable")]
fn an_identity_service_that_is_unavailable(world: &BootstrapWorld) {
    world.use_provider(
        FixtureIdentityProvider::new()
            .rejecting_custom_tokens()
            .rejecting_anonymous(),
    );
}

#[given("an identity service that is slow to respond")]
fn an_identity_service_that_is_slow_to_respond(world: &BootstrapWorld) {
    world.use_provider(FixtureIdentityProvider::new().held());
}

#[when("a visit starts without a custom token")]
fn a_visit_starts_without_a_custom_token(world: &BootstrapWorld) {
    world.start(None);
}

#[when("a visit starts with the custom token \"{token}\"")]
fn a_visit_starts_with_the_custom_token(world: &BootstrapWorld, token: String) {
    world.start(Some(CustomToken::new(token).expect("non-empty token")));
}

#[when("the identity service responds")]
fn the_identity_service_responds(world: &BootstrapWorld) {
    world.provider().release();
}

#[then("the visit resolves an anonymous identity")]
fn the_visit_resolves_an_anonymous_identity(world: &BootstrapWorld) {
    let identity = world.resolved();
    assert!(
        identity.user_id().as_ref().starts_with("anon-"),
        "unexpected uid {}",
        identity.user_id()
    );
}

#[then("the visit resolves a custom-token identity")]
fn the_visit_resolves_a_custom_token_identity(world: &BootstrapWorld) {
    let identity = world.resolved();
    assert!(
        identity.user_id().as_ref().starts_with("custom-"),
        "unexpected uid {}",
        identity.user_id()
    );
}

#[then("the visit has no identity")]
fn the_visit_has_no_identity(world: &BootstrapWorld) {
    assert!(world.current_after_settling().is_none());
}

#[scenario(path = "tests/features/session_bootstrap.feature")]
fn session_bootstrap_scenarios(world: BootstrapWorld) {
    drop(world);
}
