//! Wire DTOs for the Identity Toolkit and Firestore REST APIs.
//!
//! Adapters decode into these transport shapes first and map into domain
//! types in one pass.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::RegistrationSubmission;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SignUpRequest {
    pub(super) return_secure_token: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CustomTokenRequest<'a> {
    pub(super) token: &'a str,
    pub(super) return_secure_token: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct LookupRequest<'a> {
    pub(super) id_token: &'a str,
}

/// Response of `accounts:signUp` and `accounts:signInWithCustomToken`.
///
/// `localId` is only present on sign-up.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SignInResponse {
    pub(super) id_token: String,
    #[serde(default)]
    pub(super) local_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct LookupResponse {
    #[serde(default)]
    pub(super) users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct LookupUser {
    pub(super) local_id: String,
}

/// Google API error envelope shared by both services.
#[derive(Debug, Deserialize)]
pub(super) struct GoogleErrorEnvelope {
    pub(super) error: GoogleError,
}

#[derive(Debug, Deserialize)]
pub(super) struct GoogleError {
    #[serde(default)]
    pub(super) message: String,
    #[serde(default)]
    pub(super) status: Option<String>,
}

/// Parse a Google error body, tolerating bodies of any other shape.
pub(super) fn parse_google_error(body: &[u8]) -> Option<GoogleError> {
    serde_json::from_slice::<GoogleErrorEnvelope>(body)
        .ok()
        .map(|envelope| envelope.error)
}

#[derive(Debug, Serialize)]
pub(super) struct CommitRequest {
    pub(super) writes: Vec<Write>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct Write {
    pub(super) update: Document,
    pub(super) update_transforms: Vec<FieldTransform>,
    pub(super) current_document: Precondition,
}

#[derive(Debug, Serialize)]
pub(super) struct Document {
    pub(super) name: String,
    pub(super) fields: BTreeMap<&'static str, Value>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub(super) enum Value {
    StringValue(String),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct FieldTransform {
    pub(super) field_path: &'static str,
    pub(super) set_to_server_value: &'static str,
}

#[derive(Debug, Serialize)]
pub(super) struct Precondition {
    pub(super) exists: bool,
}

impl Write {
    /// Create-only write of `submission` at `document_name`; the server
    /// stamps `createdAt`.
    pub(super) fn create_registration(
        document_name: String,
        submission: &RegistrationSubmission,
    ) -> Self {
        let details = submission.details();
        let fields = BTreeMap::from([
            ("name", Value::StringValue(details.name().to_owned())),
            ("email", Value::StringValue(details.email().to_owned())),
            (
                "organization",
                Value::StringValue(details.organization().to_owned()),
            ),
            ("role", Value::StringValue(details.role().label().to_owned())),
            ("interest", Value::StringValue(details.interest().to_owned())),
            (
                "userId",
                Value::StringValue(submission.user_id().as_ref().to_owned()),
            ),
        ]);
        Self {
            update: Document {
                name: document_name,
                fields,
            },
            update_transforms: vec![FieldTransform {
                field_path: "createdAt",
                set_to_server_value: "REQUEST_TIME",
            }],
            current_document: Precondition { exists: false },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CommitResponse {
    #[serde(default)]
    pub(super) write_results: Vec<WriteResult>,
    pub(super) commit_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct WriteResult {
    #[serde(default)]
    pub(super) transform_results: Vec<TransformResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct TransformResult {
    pub(super) timestamp_value: Option<DateTime<Utc>>,
}

impl CommitResponse {
    /// Server timestamp applied to `createdAt`, falling back to the commit
    /// time.
    pub(super) fn created_at(&self) -> Option<DateTime<Utc>> {
        self.write_results
            .first()
            .and_then(|result| result.transform_results.first())
            .and_then(|transform| transform.timestamp_value)
            .or(self.commit_time)
    }
}
