//! Establishes one session identity per visit.
//!
//! [`SessionBootstrapper::start`] subscribes to the provider's identity stream
//! before signing in, so the first identity is never missed. The exposed
//! identity only changes when the provider reports a change.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::ports::{CurrentIdentity, IdentityProvider};
use super::{CustomToken, SessionIdentity};

/// Sign in once: custom token first when supplied, anonymous otherwise or as
/// the fallback.
///
/// Failures are logged and reported as `None`; callers never see the cause.
pub async fn sign_in(
    provider: &dyn IdentityProvider,
    token: Option<&CustomToken>,
) -> Option<SessionIdentity> {
    if let Some(token) = token {
        match provider.sign_in_with_custom_token(token).await {
            Ok(identity) => {
                info!(user_id = %identity.user_id(), "signed in with custom token");
                return Some(identity);
            }
            Err(err) => {
                warn!(
                    error = %err,
                    kind = err.kind(),
                    "custom token sign-in failed; falling back to anonymous"
                );
            }
        }
    }

    match provider.sign_in_anonymously().await {
        Ok(identity) => {
            info!(user_id = %identity.user_id(), "signed in anonymously");
            Some(identity)
        }
        Err(err) => {
            error!(error = %err, kind = err.kind(), "anonymous sign-in failed");
            None
        }
    }
}

/// Read handle onto a bootstrapper's identity.
#[derive(Debug, Clone)]
pub struct IdentityHandle {
    rx: watch::Receiver<Option<SessionIdentity>>,
}

impl IdentityHandle {
    /// Wait until an identity exists.
    ///
    /// Returns `None` if the bootstrapper is torn down first.
    pub async fn resolved(&self) -> Option<SessionIdentity> {
        let mut rx = self.rx.clone();
        rx.wait_for(Option::is_some)
            .await
            .ok()
            .and_then(|identity| identity.clone())
    }
}

impl CurrentIdentity for IdentityHandle {
    fn current(&self) -> Option<SessionIdentity> {
        self.rx.borrow().clone()
    }
}

/// Owns the sign-in attempt and the identity listener for one visit.
///
/// Dropping the bootstrapper aborts both tasks.
pub struct SessionBootstrapper {
    // Keeps the provider alive for as long as the visit holds its identity.
    _provider: Arc<dyn IdentityProvider>,
    identity: IdentityHandle,
    listener: JoinHandle<()>,
    sign_in: JoinHandle<()>,
}

impl SessionBootstrapper {
    /// Subscribe to `provider` and start signing in.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(provider: Arc<dyn IdentityProvider>, token: Option<CustomToken>) -> Self {
        let mut upstream = provider.subscribe();
        let (tx, rx) = watch::channel(upstream.borrow_and_update().clone());

        let listener = tokio::spawn(async move {
            while upstream.changed().await.is_ok() {
                let next = upstream.borrow_and_update().clone();
                debug!(
                    user_id = ?next.as_ref().map(|identity| identity.user_id().to_string()),
                    "identity changed"
                );
                tx.send_replace(next);
            }
        });

        let sign_in = tokio::spawn({
            let provider = Arc::clone(&provider);
            async move {
                self::sign_in(provider.as_ref(), token.as_ref()).await;
            }
        });

        Self {
            _provider: provider,
            identity: IdentityHandle { rx },
            listener,
            sign_in,
        }
    }

    /// Cloneable handle to the current identity.
    pub fn identity(&self) -> IdentityHandle {
        self.identity.clone()
    }

    /// Stop listening and abandon any sign-in still in flight.
    pub fn shutdown(&self) {
        self.sign_in.abort();
        self.listener.abort();
    }
}

impl Drop for SessionBootstrapper {
    fn drop(&mut self) {
        self.shutdown();
    }
}
