//! Read-only view of the identity a visit currently holds.

use crate::domain::SessionIdentity;

/// Supplies the identity to attribute a submission to.
#[cfg_attr(test, mockall::automock)]
pub trait CurrentIdentity: Send + Sync {
    /// Identity in effect right now, if sign-in has resolved.
    fn current(&self) -> Option<SessionIdentity>;
}

/// Constant identity source for callers that resolved sign-in elsewhere.
#[derive(Debug, Clone, Default)]
pub struct FixedIdentity(Option<SessionIdentity>);

impl FixedIdentity {
    pub fn new(identity: Option<SessionIdentity>) -> Self {
        Self(identity)
    }
}

impl CurrentIdentity for FixedIdentity {
    fn current(&self) -> Option<SessionIdentity> {
        self.0.clone()
    }
}
