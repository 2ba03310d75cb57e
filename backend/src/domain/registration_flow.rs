//! Registration submission state machine.
//!
//! ```text
//! idle ──submit──▶ submitting ──ack──▶ success ──register_another──▶ idle
//!                      │
//!                      └──failure──▶ error ──submit──▶ submitting
//! ```
//!
//! The in-flight guard, identity check and validation run under the same lock
//! that moves the status to `submitting`, so one visit issues at most one
//! write at a time. The write itself runs on a spawned task: dropping the
//! caller's future never strands the flow in `submitting`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};

use super::ports::{CurrentIdentity, RegistrationStore, RegistrationStoreError};
use super::{
    CollectionPath, DraftPatch, Error, RegistrationDetails, RegistrationDraft,
    RegistrationSubmission, RegistrationValidationError, StoredRegistration, TraceId,
};

/// Message shown whenever a write fails, whatever the cause.
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again later.";

/// Lifecycle of the registration form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FormStatus {
    #[default]
    Idle,
    Submitting,
    Success,
    Error,
}

/// Point-in-time view of the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSnapshot {
    pub status: FormStatus,
    pub draft: RegistrationDraft,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Reasons a flow operation was refused without touching the store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowRefusal {
    #[error("a submission is already in flight")]
    AlreadySubmitting,
    #[error("the form has been submitted; start a new registration first")]
    NotEditable,
    #[error("session identity is not ready yet")]
    IdentityNotReady,
    #[error(transparent)]
    Invalid(#[from] RegistrationValidationError),
    #[error("no completed registration to reset")]
    NotInSuccess,
}

impl From<FlowRefusal> for Error {
    fn from(refusal: FlowRefusal) -> Self {
        match &refusal {
            FlowRefusal::AlreadySubmitting
            | FlowRefusal::NotEditable
            | FlowRefusal::NotInSuccess => Error::conflict(refusal.to_string()),
            FlowRefusal::IdentityNotReady => Error::service_unavailable(refusal.to_string()),
            FlowRefusal::Invalid(err) => Error::invalid_request(err.to_string()).with_details(
                json!({ "field": err.field().as_str(), "code": err.code() }),
            ),
        }
    }
}

/// Result of a submission that reached the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Registered(StoredRegistration),
    Failed(RegistrationStoreError),
}

#[derive(Debug, Default)]
struct FlowState {
    status: FormStatus,
    draft: RegistrationDraft,
}

fn lock(state: &Mutex<FlowState>) -> MutexGuard<'_, FlowState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The registration form of one visit.
///
/// # Examples
/// ```
/// # use std::sync::Arc;
/// use thdc_backend::domain::{AppId, CollectionPath, FormStatus, RegistrationFlow};
/// use thdc_backend::domain::ports::{FixedIdentity, FixtureRegistrationStore};
///
/// let flow = RegistrationFlow::new(
///     Arc::new(FixedIdentity::default()),
///     Arc::new(FixtureRegistrationStore::default()),
///     CollectionPath::registrations(&AppId::new("thdc").expect("app id")),
/// );
/// assert_eq!(flow.snapshot().status, FormStatus::Idle);
/// ```
#[derive(Clone)]
pub struct RegistrationFlow {
    identity: Arc<dyn CurrentIdentity>,
    store: Arc<dyn RegistrationStore>,
    collection: CollectionPath,
    state: Arc<Mutex<FlowState>>,
}

impl RegistrationFlow {
    pub fn new(
        identity: Arc<dyn CurrentIdentity>,
        store: Arc<dyn RegistrationStore>,
        collection: CollectionPath,
    ) -> Self {
        Self {
            identity,
            store,
            collection,
            state: Arc::new(Mutex::new(FlowState::default())),
        }
    }

    pub fn snapshot(&self) -> FormSnapshot {
        let state = lock(&self.state);
        FormSnapshot {
            status: state.status,
            draft: state.draft.clone(),
            error_message: (state.status == FormStatus::Error)
                .then(|| GENERIC_FAILURE_MESSAGE.to_owned()),
        }
    }

    /// Apply a partial draft update.
    pub fn edit(&self, patch: DraftPatch) -> Result<FormSnapshot, FlowRefusal> {
        {
            let mut state = lock(&self.state);
            if state.status == FormStatus::Success {
                return Err(FlowRefusal::NotEditable);
            }
            patch.apply_to(&mut state.draft);
        }
        Ok(self.snapshot())
    }

    /// Leave the confirmation view with a blank form.
    pub fn register_another(&self) -> Result<FormSnapshot, FlowRefusal> {
        {
            let mut state = lock(&self.state);
            if state.status != FormStatus::Success {
                return Err(FlowRefusal::NotInSuccess);
            }
            state.status = FormStatus::Idle;
            state.draft = RegistrationDraft::default();
        }
        Ok(self.snapshot())
    }

    /// Validate the draft and append it to the store.
    ///
    /// Refusals leave the flow untouched. Once the write is issued the call
    /// resolves to [`SubmitOutcome`]; store failures are never surfaced as
    /// refusals.
    pub async fn submit(&self) -> Result<SubmitOutcome, FlowRefusal> {
        let submission = self.begin_submission()?;

        let store = Arc::clone(&self.store);
        let state = Arc::clone(&self.state);
        let collection = self.collection.clone();
        let write = async move {
            let result = store.append(&collection, &submission).await;
            let mut state = lock(&state);
            match result {
                Ok(stored) => {
                    info!(
                        document_id = %stored.id,
                        user_id = %submission.user_id(),
                        "registration stored"
                    );
                    state.status = FormStatus::Success;
                    state.draft = RegistrationDraft::default();
                    SubmitOutcome::Registered(stored)
                }
                Err(err) => {
                    error!(
                        error = %err,
                        kind = err.kind(),
                        user_id = %submission.user_id(),
                        "registration write failed"
                    );
                    state.status = FormStatus::Error;
                    SubmitOutcome::Failed(err)
                }
            }
        };

        match tokio::spawn(TraceId::carry(write)).await {
            Ok(outcome) => Ok(outcome),
            Err(join_err) => {
                error!(error = %join_err, "registration write task failed");
                let mut state = lock(&self.state);
                if state.status == FormStatus::Submitting {
                    state.status = FormStatus::Error;
                }
                Ok(SubmitOutcome::Failed(RegistrationStoreError::rejected(
                    join_err.to_string(),
                )))
            }
        }
    }

    fn begin_submission(&self) -> Result<RegistrationSubmission, FlowRefusal> {
        let mut state = lock(&self.state);
        match state.status {
            FormStatus::Submitting => return Err(FlowRefusal::AlreadySubmitting),
            FormStatus::Success => return Err(FlowRefusal::NotEditable),
            FormStatus::Idle | FormStatus::Error => {}
        }

        let Some(identity) = self.identity.current() else {
            warn!("registration submitted before session identity was ready");
            return Err(FlowRefusal::IdentityNotReady);
        };
        let details = RegistrationDetails::try_from_draft(&state.draft)?;

        state.status = FormStatus::Submitting;
        Ok(RegistrationSubmission::new(details, identity))
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ports::{
        FixedIdentity, FixtureRegistrationStore, MockCurrentIdentity, MockRegistrationStore,
    };
    use crate::domain::{AppId, ErrorCode, Role, SessionIdentity, UserId};
    use chrono::Utc;
    use rstest::{fixture, rstest};

    fn u123() -> SessionIdentity {
        SessionIdentity::new(UserId::new("u123").expect("user id"))
    }

    #[fixture]
    fn collection() -> CollectionPath {
        CollectionPath::registrations(&AppId::new("thdc").expect("app id"))
    }

    fn jane_patch() -> DraftPatch {
        DraftPatch {
            name: Some("Dr. Jane Smith".into()),
            email: Some("jane@example.com".into()),
            organization: Some("University of Test".into()),
            role: Some(Role::Researcher),
            interest: Some(String::new()),
        }
    }

    fn flow_with(
        identity: Option<SessionIdentity>,
        store: Arc<dyn RegistrationStore>,
        collection: CollectionPath,
    ) -> RegistrationFlow {
        RegistrationFlow::new(Arc::new(FixedIdentity::new(identity)), store, collection)
    }

    #[rstest]
    #[tokio::test]
    async fn successful_submit_stores_one_record_and_resets(collection: CollectionPath) {
        let store = Arc::new(FixtureRegistrationStore::default());
        let flow = flow_with(Some(u123()), store.clone(), collection.clone());
        flow.edit(jane_patch()).expect("edit in idle");
        let started = Utc::now();

        let outcome = flow.submit().await.expect("submission accepted");

        assert!(matches!(outcome, SubmitOutcome::Registered(_)));
        let entries = store.entries();
        assert_eq!(entries.len(), 1);
        let entry = entries.first().expect("entry");
        assert_eq!(entry.collection, collection);
        assert_eq!(entry.record.user_id.as_ref(), "u123");
        assert_eq!(entry.record.details.name(), "Dr. Jane Smith");
        assert_eq!(entry.record.details.role(), Role::Researcher);
        assert!(entry.record.created_at >= started);

        let snapshot = flow.snapshot();
        assert_eq!(snapshot.status, FormStatus::Success);
        assert_eq!(snapshot.draft, RegistrationDraft::default());
        assert!(snapshot.error_message.is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn failed_write_keeps_draft_and_shows_generic_message(collection: CollectionPath) {
        let mut store = MockRegistrationStore::new();
        store
            .expect_append()
            .times(1)
            .returning(|_, _| Err(RegistrationStoreError::permission("PERMISSION_DENIED")));
        let flow = flow_with(Some(u123()), Arc::new(store), collection);
        flow.edit(jane_patch()).expect("edit");
        let before = flow.snapshot().draft;

        let outcome = flow.submit().await.expect("submission accepted");

        assert!(matches!(
            outcome,
            SubmitOutcome::Failed(RegistrationStoreError::Permission { .. })
        ));
        let snapshot = flow.snapshot();
        assert_eq!(snapshot.status, FormStatus::Error);
        assert_eq!(snapshot.draft, before);
        assert_eq!(
            snapshot.error_message.as_deref(),
            Some(GENERIC_FAILURE_MESSAGE)
        );
    }

    #[rstest]
    #[tokio::test]
    async fn submit_without_identity_writes_nothing(collection: CollectionPath) {
        let mut store = MockRegistrationStore::new();
        store.expect_append().never();
        let mut identity = MockCurrentIdentity::new();
        identity.expect_current().returning(|| None);
        let flow = RegistrationFlow::new(Arc::new(identity), Arc::new(store), collection);
        flow.edit(jane_patch()).expect("edit");

        let refusal = flow.submit().await.expect_err("identity missing");

        assert_eq!(refusal, FlowRefusal::IdentityNotReady);
        assert_eq!(flow.snapshot().status, FormStatus::Idle);
    }

    #[rstest]
    #[tokio::test]
    async fn invalid_draft_is_refused_before_any_write(collection: CollectionPath) {
        let mut store = MockRegistrationStore::new();
        store.expect_append().never();
        let flow = flow_with(Some(u123()), Arc::new(store), collection);
        flow.edit(DraftPatch {
            email: Some("not-an-email".into()),
            ..jane_patch()
        })
        .expect("edit");

        let refusal = flow.submit().await.expect_err("invalid email");

        assert_eq!(
            refusal,
            FlowRefusal::Invalid(RegistrationValidationError::MalformedEmail)
        );
        assert_eq!(flow.snapshot().status, FormStatus::Idle);
    }

    #[rstest]
    #[tokio::test]
    async fn error_state_can_be_resubmitted(collection: CollectionPath) {
        let store = Arc::new(FixtureRegistrationStore::default());
        store.fail_next(RegistrationStoreError::transport("offline"));
        let flow = flow_with(Some(u123()), store.clone(), collection);
        flow.edit(jane_patch()).expect("edit");

        flow.submit().await.expect("first attempt accepted");
        assert_eq!(flow.snapshot().status, FormStatus::Error);

        flow.submit().await.expect("retry accepted");
        assert_eq!(flow.snapshot().status, FormStatus::Success);
        assert_eq!(store.entries().len(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn concurrent_submit_is_refused_while_in_flight(collection: CollectionPath) {
        let store = Arc::new(FixtureRegistrationStore::default());
        store.hold();
        let flow = flow_with(Some(u123()), store.clone(), collection);
        flow.edit(jane_patch()).expect("edit");

        let first = tokio::spawn({
            let flow = flow.clone();
            async move { flow.submit().await }
        });
        while flow.snapshot().status != FormStatus::Submitting {
            tokio::task::yield_now().await;
        }

        let second = flow.submit().await.expect_err("guarded");
        assert_eq!(second, FlowRefusal::AlreadySubmitting);

        store.release();
        let outcome = first.await.expect("join").expect("first accepted");
        assert!(matches!(outcome, SubmitOutcome::Registered(_)));
        assert_eq!(store.entries().len(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn success_state_refuses_edits_and_submits(collection: CollectionPath) {
        let flow = flow_with(
            Some(u123()),
            Arc::new(FixtureRegistrationStore::default()),
            collection,
        );
        flow.edit(jane_patch()).expect("edit");
        flow.submit().await.expect("submitted");

        assert_eq!(
            flow.edit(DraftPatch::default()),
            Err(FlowRefusal::NotEditable)
        );
        assert_eq!(
            flow.submit().await.expect_err("not editable"),
            FlowRefusal::NotEditable
        );

        let snapshot = flow.register_another().expect("reset from success");
        assert_eq!(snapshot.status, FormStatus::Idle);
        assert_eq!(snapshot.draft, RegistrationDraft::default());
    }

    #[rstest]
    fn register_another_outside_success_is_refused(collection: CollectionPath) {
        let flow = flow_with(
            None,
            Arc::new(FixtureRegistrationStore::default()),
            collection,
        );
        assert_eq!(flow.register_another(), Err(FlowRefusal::NotInSuccess));
    }

    #[rstest]
    #[case(FlowRefusal::AlreadySubmitting, ErrorCode::Conflict)]
    #[case(FlowRefusal::NotEditable, ErrorCode::Conflict)]
    #[case(FlowRefusal::NotInSuccess, ErrorCode::Conflict)]
    #[case(FlowRefusal::IdentityNotReady, ErrorCode::ServiceUnavailable)]
    #[case(
        FlowRefusal::Invalid(RegistrationValidationError::MalformedEmail),
        ErrorCode::InvalidRequest
    )]
    fn refusals_map_to_error_codes(#[case] refusal: FlowRefusal, #[case] expected: ErrorCode) {
        assert_eq!(Error::from(refusal).code(), expected);
    }

    #[test]
    fn invalid_refusal_carries_field_details() {
        let error = Error::from(FlowRefusal::Invalid(RegistrationValidationError::Missing(
            crate::domain::RegistrationField::Organization,
        )));
        assert_eq!(
            error.details(),
            Some(&json!({ "field": "organization", "code": "missing" }))
        );
    }
}
