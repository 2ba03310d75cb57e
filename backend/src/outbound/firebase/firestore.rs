//! Reqwest-backed Firestore adapter for the registrations collection.
//!
//! Each append is a single `documents:commit` with a create-only precondition.
//! The document id is generated locally, so a retried commit cannot
//! overwrite an earlier registration.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{DATE, HeaderMap};
use reqwest::{Client, StatusCode, Url};
use tracing::debug;

use super::body_preview;
use super::dto::{CommitRequest, CommitResponse, Write, parse_google_error};
use super::settings::FirebaseSettings;
use crate::domain::ports::{RegistrationStore, RegistrationStoreError};
use crate::domain::{CollectionPath, DocumentId, RegistrationSubmission, StoredRegistration};

/// Append-only registration store backed by Firestore.
pub struct FirestoreRegistrationStore {
    client: Client,
    firestore_url: Url,
    documents_root: String,
}

impl FirestoreRegistrationStore {
    /// Build a store for `project_id` rooted at `firestore_url`.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn from_settings(settings: &FirebaseSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(settings.request_timeout).build()?;
        Ok(Self::new(
            client,
            &settings.firestore_url,
            &settings.project_id,
        ))
    }

    /// Build a store over an existing client.
    pub fn new(client: Client, firestore_url: &Url, project_id: &str) -> Self {
        Self {
            client,
            firestore_url: firestore_url.clone(),
            documents_root: format!("projects/{project_id}/databases/(default)/documents"),
        }
    }

    fn commit_url(&self) -> Result<Url, RegistrationStoreError> {
        self.firestore_url
            .join(&format!("{}:commit", self.documents_root))
            .map_err(|err| RegistrationStoreError::rejected(format!("bad commit endpoint: {err}")))
    }

    fn document_name(&self, collection: &CollectionPath, id: &DocumentId) -> String {
        format!("{}/{collection}/{id}", self.documents_root)
    }
}

#[async_trait]
impl RegistrationStore for FirestoreRegistrationStore {
    async fn append(
        &self,
        collection: &CollectionPath,
        submission: &RegistrationSubmission,
    ) -> Result<StoredRegistration, RegistrationStoreError> {
        let id = DocumentId::auto();
        let body = CommitRequest {
            writes: vec![Write::create_registration(
                self.document_name(collection, &id),
                submission,
            )],
        };

        let mut request = self.client.post(self.commit_url()?).json(&body);
        if let Some(token) = submission.identity().access_token() {
            request = request.bearer_auth(token.expose());
        }
        let response = request.send().await.map_err(map_transport_error)?;

        let status = response.status();
        let served_at = date_header(response.headers());
        let bytes = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, bytes.as_ref()));
        }

        let created_at = acknowledged_at(bytes.as_ref(), served_at);
        debug!(document_id = %id, user_id = %submission.user_id(), "registration committed");
        Ok(StoredRegistration { id, created_at })
    }
}

/// A 2xx commit is durable; the body only refines the timestamp.
fn acknowledged_at(body: &[u8], served_at: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let committed = match serde_json::from_slice::<CommitResponse>(body) {
        Ok(decoded) => decoded.created_at(),
        Err(err) => {
            debug!(error = %err, "unreadable commit payload");
            None
        }
    };
    committed.or(served_at).unwrap_or_else(Utc::now)
}

fn date_header(headers: &HeaderMap) -> Option<DateTime<Utc>> {
    let raw = headers.get(DATE)?.to_str().ok()?;
    DateTime::parse_from_rfc2822(raw)
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

fn map_transport_error(error: reqwest::Error) -> RegistrationStoreError {
    RegistrationStoreError::transport(error.without_url().to_string())
}

fn map_status_error(status: StatusCode, body: &[u8]) -> RegistrationStoreError {
    let google = parse_google_error(body);
    let reason = google
        .as_ref()
        .map(|error| error.message.clone())
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| body_preview(body));
    let message = if reason.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {reason}", status.as_u16())
    };

    let google_status = google.and_then(|error| error.status);
    match (status, google_status.as_deref()) {
        (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _)
        | (_, Some("PERMISSION_DENIED" | "UNAUTHENTICATED")) => {
            RegistrationStoreError::permission(message)
        }
        (StatusCode::TOO_MANY_REQUESTS, _) | (_, Some("RESOURCE_EXHAUSTED")) => {
            RegistrationStoreError::quota(message)
        }
        (
            StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT,
            _,
        ) => RegistrationStoreError::transport(message),
        _ => RegistrationStoreError::rejected(message),
    }
}
