//! Port for the identity collaborator issuing session identities.
//!
//! Providers publish every identity they sign in through an
//! [`IdentityChannel`]; the session bootstrapper subscribes before it signs in
//! so no change is missed.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use uuid::Uuid;

use crate::domain::{CustomToken, SessionIdentity, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by identity provider adapters.
    pub enum IdentityProviderError {
        /// The identity service could not be reached.
        Transport { message: String } => "identity provider unreachable: {message}",
        /// The identity service refused the sign-in.
        Rejected { message: String } => "identity provider rejected sign-in: {message}",
        /// The identity service answered with an unexpected payload.
        Decode { message: String } => "identity provider response malformed: {message}",
    }
}

/// Identity collaborator for one application load.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Sign in without credentials.
    async fn sign_in_anonymously(&self) -> Result<SessionIdentity, IdentityProviderError>;

    /// Sign in with a pre-provisioned custom token.
    async fn sign_in_with_custom_token(
        &self,
        token: &CustomToken,
    ) -> Result<SessionIdentity, IdentityProviderError>;

    /// Observe identity changes. The receiver starts at the current value.
    fn subscribe(&self) -> watch::Receiver<Option<SessionIdentity>>;
}

/// Builds a fresh provider for every visit.
pub trait IdentityProviderFactory: Send + Sync {
    fn create(&self) -> Arc<dyn IdentityProvider>;
}

/// Last-value broadcast of a provider's signed-in identity.
#[derive(Debug, Clone)]
pub struct IdentityChannel {
    tx: Arc<watch::Sender<Option<SessionIdentity>>>,
}

impl Default for IdentityChannel {
    fn default() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }
}

impl IdentityChannel {
    /// Replace the current identity and notify subscribers.
    pub fn publish(&self, identity: SessionIdentity) {
        self.tx.send_replace(Some(identity));
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<SessionIdentity>> {
        self.tx.subscribe()
    }
}

/// In-process provider minting random uids.
///
/// Sign-ins can be held behind a gate so callers can observe the window
/// before an identity exists.
#[derive(Debug)]
pub struct FixtureIdentityProvider {
    channel: IdentityChannel,
    reject_anonymous: bool,
    reject_custom_tokens: bool,
    gate: watch::Sender<bool>,
}

impl Default for FixtureIdentityProvider {
    fn default() -> Self {
        let (gate, _rx) = watch::channel(true);
        Self {
            channel: IdentityChannel::default(),
            reject_anonymous: false,
            reject_custom_tokens: false,
            gate,
        }
    }
}

impl FixtureIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse anonymous sign-in.
    pub fn rejecting_anonymous(mut self) -> Self {
        self.reject_anonymous = true;
        self
    }

    /// Refuse every custom token.
    pub fn rejecting_custom_tokens(mut self) -> Self {
        self.reject_custom_tokens = true;
        self
    }

    /// Hold sign-ins until [`Self::release`] is called.
    pub fn held(self) -> Self {
        self.gate.send_replace(false);
        self
    }

    /// Let held sign-ins complete.
    pub fn release(&self) {
        self.gate.send_replace(true);
    }

    async fn wait_for_gate(&self) {
        let mut rx = self.gate.subscribe();
        // The sender lives as long as `self`, so the wait cannot fail.
        let _ = rx.wait_for(|open| *open).await;
    }

    fn mint(&self, prefix: &str) -> Result<SessionIdentity, IdentityProviderError> {
        let user_id = UserId::new(format!("{prefix}-{}", Uuid::new_v4().simple()))
            .map_err(|err| IdentityProviderError::decode(err.to_string()))?;
        let identity = SessionIdentity::new(user_id);
        self.channel.publish(identity.clone());
        Ok(identity)
    }
}

#[async_trait]
impl IdentityProvider for FixtureIdentityProvider {
    async fn sign_in_anonymously(&self) -> Result<SessionIdentity, IdentityProviderError> {
        self.wait_for_gate().await;
        if self.reject_anonymous {
            return Err(IdentityProviderError::rejected("anonymous sign-in disabled"));
        }
        self.mint("anon")
    }

    async fn sign_in_with_custom_token(
        &self,
        _token: &CustomToken,
    ) -> Result<SessionIdentity, IdentityProviderError> {
        self.wait_for_gate().await;
        if self.reject_custom_tokens {
            return Err(IdentityProviderError::rejected("INVALID_CUSTOM_TOKEN"));
        }
        self.mint("custom")
    }

    fn subscribe(&self) -> watch::Receiver<Option<SessionIdentity>> {
        self.channel.subscribe()
    }
}

/// Factory producing [`FixtureIdentityProvider`]s with shared settings.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureIdentityProviderFactory {
    reject_anonymous: bool,
    reject_custom_tokens: bool,
}

impl FixtureIdentityProviderFactory {
    pub fn rejecting_custom_tokens(mut self) -> Self {
        self.reject_custom_tokens = true;
        self
    }

    pub fn rejecting_anonymous(mut self) -> Self {
        self.reject_anonymous = true;
        self
    }
}

impl IdentityProviderFactory for FixtureIdentityProviderFactory {
    fn create(&self) -> Arc<dyn IdentityProvider> {
        let mut provider = FixtureIdentityProvider::new();
        if self.reject_anonymous {
            provider = provider.rejecting_anonymous();
        }
        if self.reject_custom_tokens {
            provider = provider.rejecting_custom_tokens();
        }
        Arc::new(provider)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;

    fn token() -> CustomToken {
        CustomToken::new("tok").expect("token")
    }

    #[tokio::test]
    async fn anonymous_sign_in_publishes_identity() {
        let provider = FixtureIdentityProvider::new();
        let rx = provider.subscribe();
        assert!(rx.borrow().is_none());

        let identity = provider.sign_in_anonymously().await.expect("sign in");

        assert!(identity.user_id().as_ref().starts_with("anon-"));
        assert_eq!(rx.borrow().as_ref(), Some(&identity));
    }

    #[tokio::test]
    async fn rejecting_custom_tokens_leaves_identity_unset() {
        let provider = FixtureIdentityProvider::new().rejecting_custom_tokens();
        let err = provider
            .sign_in_with_custom_token(&token())
            .await
            .expect_err("custom token refused");
        assert!(matches!(err, IdentityProviderError::Rejected { .. }));
        assert!(provider.subscribe().borrow().is_none());
    }

    #[tokio::test]
    async fn held_sign_in_waits_for_release() {
        let provider = Arc::new(FixtureIdentityProvider::new().held());
        let task = tokio::spawn({
            let provider = Arc::clone(&provider);
            async move { provider.sign_in_anonymously().await }
        });
        tokio::task::yield_now().await;
        assert!(provider.subscribe().borrow().is_none());

        provider.release();
        let identity = task.await.expect("join").expect("sign in");
        assert_eq!(provider.subscribe().borrow().as_ref(), Some(&identity));
    }

    #[test]
    fn factory_creates_independent_providers() {
        let factory = FixtureIdentityProviderFactory::default();
        let first = factory.create();
        let second = factory.create();
        assert!(!Arc::ptr_eq(&first, &second));
    }
}
