//! Visit lifecycle handlers.
//!
//! ```text
//! POST   /api/v1/visits
//! GET    /api/v1/visits/current
//! DELETE /api/v1/visits/current
//! ```
//!
//! Opening a visit replaces any visit already bound to the session, the same
//! way a page reload starts the form afresh.

use actix_web::{HttpResponse, delete, get, post, web};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::ports::CurrentIdentity;
use crate::domain::{Error, Visit};
use crate::inbound::http::ApiResult;
use crate::inbound::http::registration_dto::FormSnapshotResponse;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::VisitCookie;
use crate::inbound::http::state::HttpState;

/// Sign-in state of the visit.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IdentityResponse {
    /// `false` until sign-in resolves; submissions are refused until then.
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// A visit together with its form.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VisitResponse {
    #[schema(example = "6f1c1a5e-8d5b-4c43-9b7e-2f2c5a0d9e11")]
    pub visit_id: String,
    pub identity: IdentityResponse,
    pub form: FormSnapshotResponse,
}

impl From<&Visit> for VisitResponse {
    fn from(visit: &Visit) -> Self {
        let identity = visit.identity().current();
        Self {
            visit_id: visit.id().to_string(),
            identity: IdentityResponse {
                ready: identity.is_some(),
                user_id: identity.map(|identity| identity.user_id().to_string()),
            },
            form: visit.flow().snapshot().into(),
        }
    }
}

/// Open a visit and bind it to the session cookie.
#[utoipa::path(
    post,
    path = "/api/v1/visits",
    responses(
        (
            status = 201,
            description = "Visit opened; sign-in continues in the background",
            body = VisitResponse,
            headers(("Set-Cookie" = String, description = "Session cookie"))
        ),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["visits"],
    operation_id = "openVisit",
    security([])
)]
#[post("/visits")]
pub async fn open_visit(
    state: web::Data<HttpState>,
    session: VisitCookie,
) -> ApiResult<HttpResponse> {
    if let Some(previous) = session.visit()? {
        state.visits.close(previous);
    }
    let visit = state.visits.open();
    session.bind(visit.id())?;
    Ok(HttpResponse::Created().json(VisitResponse::from(visit.as_ref())))
}

/// Describe the visit bound to the session.
#[utoipa::path(
    get,
    path = "/api/v1/visits/current",
    responses(
        (status = 200, description = "Current visit", body = VisitResponse),
        (status = 401, description = "No active visit", body = ErrorSchema)
    ),
    tags = ["visits"],
    operation_id = "currentVisit"
)]
#[get("/visits/current")]
pub async fn current_visit(
    state: web::Data<HttpState>,
    session: VisitCookie,
) -> ApiResult<web::Json<VisitResponse>> {
    let visit = state.current_visit(&session)?;
    Ok(web::Json(VisitResponse::from(visit.as_ref())))
}

/// Tear the visit down and release its identity listener.
#[utoipa::path(
    delete,
    path = "/api/v1/visits/current",
    responses(
        (status = 204, description = "Visit closed (or none was open)"),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["visits"],
    operation_id = "closeVisit"
)]
#[delete("/visits/current")]
pub async fn close_visit(
    state: web::Data<HttpState>,
    session: VisitCookie,
) -> Result<HttpResponse, Error> {
    if let Some(id) = session.visit()? {
        state.visits.close(id);
        session.forget();
    }
    Ok(HttpResponse::NoContent().finish())
}
