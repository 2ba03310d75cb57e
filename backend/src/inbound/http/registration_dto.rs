//! Registration form DTOs and parsing helpers.

use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::domain::{DraftPatch, Error, FormSnapshot, FormStatus, RegistrationDraft, Role};

/// Partial form update for `PATCH /api/v1/registration/draft`.
///
/// Absent fields keep their current value.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DraftPatchRequest {
    #[schema(example = "Dr. Jane Smith")]
    pub name: Option<String>,
    #[schema(example = "jane@example.com")]
    pub email: Option<String>,
    #[schema(example = "University of Test")]
    pub organization: Option<String>,
    /// One of the role labels listed by `GET /api/v1/content`.
    #[schema(example = "Researcher")]
    pub role: Option<String>,
    pub interest: Option<String>,
}

impl TryFrom<DraftPatchRequest> for DraftPatch {
    type Error = Error;

    fn try_from(value: DraftPatchRequest) -> Result<Self, Self::Error> {
        let role = value
            .role
            .map(|label| {
                label.parse::<Role>().map_err(|err| {
                    Error::invalid_request(err.to_string())
                        .with_details(json!({ "field": "role", "code": "unknown_role" }))
                })
            })
            .transpose()?;
        Ok(Self {
            name: value.name,
            email: value.email,
            organization: value.organization,
            role,
            interest: value.interest,
        })
    }
}

/// Current form values.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DraftResponse {
    pub name: String,
    pub email: String,
    pub organization: String,
    #[schema(example = "Researcher")]
    pub role: String,
    pub interest: String,
}

impl From<RegistrationDraft> for DraftResponse {
    fn from(draft: RegistrationDraft) -> Self {
        Self {
            name: draft.name,
            email: draft.email,
            organization: draft.organization,
            role: draft.role.label().to_owned(),
            interest: draft.interest,
        }
    }
}

/// Form lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum FormStatusResponse {
    Idle,
    Submitting,
    Success,
    Error,
}

impl From<FormStatus> for FormStatusResponse {
    fn from(status: FormStatus) -> Self {
        match status {
            FormStatus::Idle => Self::Idle,
            FormStatus::Submitting => Self::Submitting,
            FormStatus::Success => Self::Success,
            FormStatus::Error => Self::Error,
        }
    }
}

/// Snapshot of the registration form.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormSnapshotResponse {
    pub status: FormStatusResponse,
    pub draft: DraftResponse,
    /// Generic message shown while the status is `error`.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "Something went wrong. Please try again later.")]
    pub error_message: Option<String>,
}

impl From<FormSnapshot> for FormSnapshotResponse {
    fn from(snapshot: FormSnapshot) -> Self {
        Self {
            status: snapshot.status.into(),
            draft: snapshot.draft.into(),
            error_message: snapshot.error_message,
        }
    }
}
