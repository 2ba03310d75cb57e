//! Domain primitives, services and ports.
//!
//! Purpose: model the registration form, the per-visit session identity and
//! the visit lifecycle without depending on HTTP or Firebase. Adapters reach
//! the outside world only through the traits in [`ports`].
//!
//! Public surface:
//! - Error / ErrorCode: transport-agnostic error payload.
//! - SessionBootstrapper / IdentityHandle: one identity per visit.
//! - RegistrationFlow / FormSnapshot / FlowRefusal: the form state machine.
//! - VisitRegistry / Visit / VisitId: live visits and their teardown.
//! - SiteContent: static landing page data.

pub mod content;
pub mod error;
pub mod identity;
pub mod ports;
pub mod registration;
pub mod registration_flow;
pub mod session_bootstrap;
pub mod trace_id;
pub mod visits;

pub use self::content::{CONTACT_EMAIL, PAPER_URL, SiteContent, TeamMember};
pub use self::error::{Error, ErrorCode};
pub use self::identity::{
    AccessToken, CustomToken, IdentityValidationError, SessionIdentity, UserId,
};
pub use self::registration::{
    AUTO_ID_LEN, AppId, AppIdValidationError, CollectionPath, DocumentId, DraftPatch,
    REGISTRATIONS_COLLECTION, RegistrationDetails, RegistrationDraft, RegistrationField,
    RegistrationRecord, RegistrationSubmission, RegistrationValidationError, Role,
    StoredRegistration, UnknownRoleError,
};
pub use self::registration_flow::{
    FlowRefusal, FormSnapshot, FormStatus, GENERIC_FAILURE_MESSAGE, RegistrationFlow,
    SubmitOutcome,
};
pub use self::session_bootstrap::{IdentityHandle, SessionBootstrapper, sign_in};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::visits::{DEFAULT_VISIT_TTL, Visit, VisitId, VisitRegistry};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use thdc_backend::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<()> {
///     Err(Error::conflict("busy"))
/// }
/// # assert!(handler().is_err());
/// ```
pub type ApiResult<T> = Result<T, Error>;
