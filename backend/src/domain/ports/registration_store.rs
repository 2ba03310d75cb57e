//! Port for the document store receiving registrations.
//!
//! Adapters append one document per submission into the addressed collection
//! and stamp it with a server-assigned creation time.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use mockable::{Clock, DefaultClock};
use tokio::sync::watch;

use crate::domain::{
    CollectionPath, DocumentId, RegistrationRecord, RegistrationSubmission, StoredRegistration,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised when appending registrations.
    pub enum RegistrationStoreError {
        /// The store could not be reached.
        Transport { message: String } => "registration store unreachable: {message}",
        /// Security rules or credentials refused the write.
        Permission { message: String } => "registration store denied the write: {message}",
        /// The project ran out of quota.
        Quota { message: String } => "registration store quota exhausted: {message}",
        /// The store refused the write for another reason.
        Rejected { message: String } => "registration store rejected the write: {message}",
        /// The store answered with an unexpected payload.
        Decode { message: String } => "registration store response malformed: {message}",
    }
}

/// Append-only registration persistence.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    /// Append one registration document with a generated id.
    ///
    /// Resolves only once the store confirms the write.
    async fn append(
        &self,
        collection: &CollectionPath,
        submission: &RegistrationSubmission,
    ) -> Result<StoredRegistration, RegistrationStoreError>;
}

/// A document held by [`FixtureRegistrationStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub collection: CollectionPath,
    pub record: RegistrationRecord,
}

/// In-memory store used by local runs and tests.
pub struct FixtureRegistrationStore {
    clock: Arc<dyn Clock>,
    entries: Mutex<Vec<StoredEntry>>,
    failures: Mutex<VecDeque<RegistrationStoreError>>,
    gate: watch::Sender<bool>,
}

impl Default for FixtureRegistrationStore {
    fn default() -> Self {
        Self::new(Arc::new(DefaultClock))
    }
}

impl FixtureRegistrationStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let (gate, _rx) = watch::channel(true);
        Self {
            clock,
            entries: Mutex::new(Vec::new()),
            failures: Mutex::new(VecDeque::new()),
            gate,
        }
    }

    /// Fail the next append with `error`. Queued failures apply in order.
    pub fn fail_next(&self, error: RegistrationStoreError) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(error);
    }

    /// Hold appends until [`Self::release`] is called.
    pub fn hold(&self) {
        self.gate.send_replace(false);
    }

    pub fn release(&self) {
        self.gate.send_replace(true);
    }

    /// Documents appended so far, oldest first.
    pub fn entries(&self) -> Vec<StoredEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl RegistrationStore for FixtureRegistrationStore {
    async fn append(
        &self,
        collection: &CollectionPath,
        submission: &RegistrationSubmission,
    ) -> Result<StoredRegistration, RegistrationStoreError> {
        let mut gate = self.gate.subscribe();
        // The sender lives as long as `self`, so the wait cannot fail.
        let _ = gate.wait_for(|open| *open).await;

        let failure = self
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        if let Some(error) = failure {
            return Err(error);
        }

        let stored = StoredRegistration {
            id: DocumentId::auto(),
            created_at: self.clock.utc(),
        };
        let entry = StoredEntry {
            collection: collection.clone(),
            record: RegistrationRecord {
                id: stored.id.clone(),
                details: submission.details().clone(),
                user_id: submission.user_id().clone(),
                created_at: stored.created_at,
            },
        };
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
        Ok(stored)
    }
}
