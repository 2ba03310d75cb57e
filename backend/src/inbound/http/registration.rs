//! Registration form handlers.
//!
//! ```text
//! GET   /api/v1/registration
//! PATCH /api/v1/registration/draft {"name":"Dr. Jane Smith"}
//! POST  /api/v1/registration/submit
//! POST  /api/v1/registration/reset
//! ```
//!
//! A submission that reaches the store always answers `200` with the form
//! snapshot; a failed write shows up as status `error` with the generic
//! message. Only refusals become error responses.

use actix_web::{get, patch, post, web};
use tracing::debug;

use crate::domain::{DraftPatch, SubmitOutcome};
use crate::inbound::http::ApiResult;
use crate::inbound::http::registration_dto::{DraftPatchRequest, FormSnapshotResponse};
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::VisitCookie;
use crate::inbound::http::state::HttpState;

/// Current form snapshot.
#[utoipa::path(
    get,
    path = "/api/v1/registration",
    responses(
        (status = 200, description = "Form snapshot", body = FormSnapshotResponse),
        (status = 401, description = "No active visit", body = ErrorSchema)
    ),
    tags = ["registration"],
    operation_id = "getRegistration"
)]
#[get("/registration")]
pub async fn get_registration(
    state: web::Data<HttpState>,
    session: VisitCookie,
) -> ApiResult<web::Json<FormSnapshotResponse>> {
    let visit = state.current_visit(&session)?;
    Ok(web::Json(visit.flow().snapshot().into()))
}

/// Apply a partial draft update.
#[utoipa::path(
    patch,
    path = "/api/v1/registration/draft",
    request_body = DraftPatchRequest,
    responses(
        (status = 200, description = "Updated form snapshot", body = FormSnapshotResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "No active visit", body = ErrorSchema),
        (status = 409, description = "Form already submitted", body = ErrorSchema)
    ),
    tags = ["registration"],
    operation_id = "editRegistrationDraft"
)]
#[patch("/registration/draft")]
pub async fn edit_draft(
    state: web::Data<HttpState>,
    session: VisitCookie,
    payload: web::Json<DraftPatchRequest>,
) -> ApiResult<web::Json<FormSnapshotResponse>> {
    let visit = state.current_visit(&session)?;
    let patch = DraftPatch::try_from(payload.into_inner())?;
    let snapshot = visit.flow().edit(patch)?;
    Ok(web::Json(snapshot.into()))
}

/// Submit the current draft.
#[utoipa::path(
    post,
    path = "/api/v1/registration/submit",
    responses(
        (
            status = 200,
            description = "Write attempted; status is `success` or `error`",
            body = FormSnapshotResponse
        ),
        (status = 400, description = "Draft failed validation", body = ErrorSchema),
        (status = 401, description = "No active visit", body = ErrorSchema),
        (status = 409, description = "Submission in flight or form already submitted", body = ErrorSchema),
        (status = 503, description = "Session identity not ready yet", body = ErrorSchema)
    ),
    tags = ["registration"],
    operation_id = "submitRegistration"
)]
#[post("/registration/submit")]
pub async fn submit(
    state: web::Data<HttpState>,
    session: VisitCookie,
) -> ApiResult<web::Json<FormSnapshotResponse>> {
    let visit = state.current_visit(&session)?;
    match visit.flow().submit().await? {
        SubmitOutcome::Registered(stored) => {
            debug!(visit_id = %visit.id(), document_id = %stored.id, "submission confirmed");
        }
        SubmitOutcome::Failed(_) => {
            debug!(visit_id = %visit.id(), "submission failed; form kept for retry");
        }
    }
    Ok(web::Json(visit.flow().snapshot().into()))
}

/// Leave the confirmation view with a blank form.
#[utoipa::path(
    post,
    path = "/api/v1/registration/reset",
    responses(
        (status = 200, description = "Blank form snapshot", body = FormSnapshotResponse),
        (status = 401, description = "No active visit", body = ErrorSchema),
        (status = 409, description = "Nothing to reset", body = ErrorSchema)
    ),
    tags = ["registration"],
    operation_id = "registerAnother"
)]
#[post("/registration/reset")]
pub async fn register_another(
    state: web::Data<HttpState>,
    session: VisitCookie,
) -> ApiResult<web::Json<FormSnapshotResponse>> {
    let visit = state.current_visit(&session)?;
    let snapshot = visit.flow().register_another()?;
    Ok(web::Json(snapshot.into()))
}

#[cfg(test)]
#[path = "registration_tests.rs"]
mod tests;
