//! Registration form values, validated details, and stored records.
//!
//! The form draft keeps raw, possibly invalid input so a failed write can be
//! retried without re-entry. [`RegistrationDetails`] is the validated shape
//! that reaches the document store.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{SessionIdentity, UserId};

/// Primary role a registrant selects on the form.
///
/// Serialised as the label shown to users; that label is also what gets
/// stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "Clinician")]
    Clinician,
    #[default]
    #[serde(rename = "Researcher")]
    Researcher,
    #[serde(rename = "Public Health Official")]
    PublicHealthOfficial,
    #[serde(rename = "Vendor / Developer")]
    VendorDeveloper,
    #[serde(rename = "Member of Traveller Community")]
    TravellerCommunityMember,
    #[serde(rename = "Other")]
    Other,
}

impl Role {
    /// Every selectable role, in form order.
    pub const ALL: [Self; 6] = [
        Self::Clinician,
        Self::Researcher,
        Self::PublicHealthOfficial,
        Self::VendorDeveloper,
        Self::TravellerCommunityMember,
        Self::Other,
    ];

    /// Label shown in the role selector.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Clinician => "Clinician",
            Self::Researcher => "Researcher",
            Self::PublicHealthOfficial => "Public Health Official",
            Self::VendorDeveloper => "Vendor / Developer",
            Self::TravellerCommunityMember => "Member of Traveller Community",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when parsing an unknown role label.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRoleError(pub String);

impl FromStr for Role {
    type Err = UnknownRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.label() == s)
            .ok_or_else(|| UnknownRoleError(s.to_owned()))
    }
}

/// In-progress form values.
///
/// # Examples
/// ```
/// use thdc_backend::domain::{RegistrationDraft, Role};
///
/// let draft = RegistrationDraft::default();
/// assert_eq!(draft.role, Role::Researcher);
/// assert!(draft.name.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationDraft {
    pub name: String,
    pub email: String,
    pub organization: String,
    pub role: Role,
    pub interest: String,
}

/// Partial update of a draft; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interest: Option<String>,
}

impl DraftPatch {
    /// Apply the present fields onto `draft`.
    pub fn apply_to(self, draft: &mut RegistrationDraft) {
        let Self {
            name,
            email,
            organization,
            role,
            interest,
        } = self;
        if let Some(name) = name {
            draft.name = name;
        }
        if let Some(email) = email {
            draft.email = email;
        }
        if let Some(organization) = organization {
            draft.organization = organization;
        }
        if let Some(role) = role {
            draft.role = role;
        }
        if let Some(interest) = interest {
            draft.interest = interest;
        }
    }
}

/// Required form fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RegistrationField {
    Name,
    Email,
    Organization,
}

impl RegistrationField {
    /// Wire name of the field.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Organization => "organization",
        }
    }
}

impl fmt::Display for RegistrationField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation failures for a draft.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationValidationError {
    /// A required field was blank once trimmed.
    #[error("{0} must not be empty")]
    Missing(RegistrationField),
    /// The email address is not email-shaped.
    #[error("email must be a valid email address")]
    MalformedEmail,
}

impl RegistrationValidationError {
    /// Field the error refers to.
    pub const fn field(&self) -> RegistrationField {
        match self {
            Self::Missing(field) => *field,
            Self::MalformedEmail => RegistrationField::Email,
        }
    }

    /// Stable machine-readable code for adapters.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Missing(_) => "missing",
            Self::MalformedEmail => "malformed_email",
        }
    }
}

/// Validated registration fields.
///
/// ## Invariants
/// - `name`, `email`, and `organization` are trimmed and non-empty.
/// - `email` has one `@`, a non-empty local part and domain, and no
///   whitespace.
/// - `interest` is kept exactly as entered and may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationDetails {
    name: String,
    email: String,
    organization: String,
    role: Role,
    interest: String,
}

impl RegistrationDetails {
    /// Validate a draft.
    ///
    /// # Examples
    /// ```
    /// use thdc_backend::domain::{RegistrationDetails, RegistrationDraft};
    ///
    /// let draft = RegistrationDraft {
    ///     name: "Dr. Jane Smith".into(),
    ///     email: "jane@example.com".into(),
    ///     organization: "University of Test".into(),
    ///     ..RegistrationDraft::default()
    /// };
    /// let details = RegistrationDetails::try_from_draft(&draft).expect("valid draft");
    /// assert_eq!(details.email(), "jane@example.com");
    /// ```
    pub fn try_from_draft(draft: &RegistrationDraft) -> Result<Self, RegistrationValidationError> {
        let name = required(&draft.name, RegistrationField::Name)?;
        let email = required(&draft.email, RegistrationField::Email)?;
        if !is_email_shaped(email) {
            return Err(RegistrationValidationError::MalformedEmail);
        }
        let organization = required(&draft.organization, RegistrationField::Organization)?;

        Ok(Self {
            name: name.to_owned(),
            email: email.to_owned(),
            organization: organization.to_owned(),
            role: draft.role,
            interest: draft.interest.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn interest(&self) -> &str {
        &self.interest
    }
}

fn required(value: &str, field: RegistrationField) -> Result<&str, RegistrationValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(RegistrationValidationError::Missing(field))
    } else {
        Ok(trimmed)
    }
}

fn is_email_shaped(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}

/// Tenant-scoped application identifier used in the collection path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppId(String);

/// Error returned for malformed application identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AppIdValidationError {
    #[error("app id must not be empty")]
    Empty,
    #[error("app id must not contain '/'")]
    ContainsSeparator,
}

impl AppId {
    /// Validate and construct an [`AppId`].
    pub fn new(id: impl Into<String>) -> Result<Self, AppIdValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(AppIdValidationError::Empty);
        }
        if id.contains('/') {
            return Err(AppIdValidationError::ContainsSeparator);
        }
        Ok(Self(id))
    }
}

impl AsRef<str> for AppId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

/// Collection name receiving registrations.
pub const REGISTRATIONS_COLLECTION: &str = "thdc_registrations";

/// Hierarchical address of a document collection.
///
/// # Examples
/// ```
/// use thdc_backend::domain::{AppId, CollectionPath};
///
/// let app = AppId::new("thdc-site").expect("app id");
/// let path = CollectionPath::registrations(&app);
/// assert_eq!(path.to_string(), "artifacts/thdc-site/public/data/thdc_registrations");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionPath(Vec<String>);

impl CollectionPath {
    /// Public registrations collection for an application.
    pub fn registrations(app_id: &AppId) -> Self {
        Self(vec![
            "artifacts".to_owned(),
            app_id.as_ref().to_owned(),
            "public".to_owned(),
            "data".to_owned(),
            REGISTRATIONS_COLLECTION.to_owned(),
        ])
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// One append request: validated fields plus the submitting identity.
#[derive(Debug, Clone)]
pub struct RegistrationSubmission {
    details: RegistrationDetails,
    identity: SessionIdentity,
}

impl RegistrationSubmission {
    pub fn new(details: RegistrationDetails, identity: SessionIdentity) -> Self {
        Self { details, identity }
    }

    pub fn details(&self) -> &RegistrationDetails {
        &self.details
    }

    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    /// Attribution stored as `userId`.
    pub fn user_id(&self) -> &UserId {
        self.identity.user_id()
    }
}

/// Store-generated document handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

/// Length of client-generated document ids.
pub const AUTO_ID_LEN: usize = 20;

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Random alphanumeric id in the shape the document store generates.
    pub fn auto() -> Self {
        use rand::Rng;
        use rand::distributions::Alphanumeric;

        let id: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(AUTO_ID_LEN)
            .map(char::from)
            .collect();
        Self(id)
    }
}

impl AsRef<str> for DocumentId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Acknowledgement of a confirmed append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRegistration {
    pub id: DocumentId,
    /// Server-assigned creation time.
    pub created_at: DateTime<Utc>,
}

/// A persisted registration as the store holds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRecord {
    pub id: DocumentId,
    #[serde(flatten)]
    pub details: RegistrationDetails,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}
