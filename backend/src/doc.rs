//! The registration API's OpenAPI document.
//!
//! Swagger UI serves it at `/docs` in debug builds, and
//! `cargo run --bin openapi-dump` exports it.

use crate::inbound::http::content::{SiteContentResponse, TeamMemberResponse};
use crate::inbound::http::registration_dto::{
    DraftPatchRequest, DraftResponse, FormSnapshotResponse, FormStatusResponse,
};
use crate::inbound::http::schemas::{ErrorCodeSchema, ErrorSchema};
use crate::inbound::http::session_config::SESSION_COOKIE;
use crate::inbound::http::visits::{IdentityResponse, VisitResponse};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::openapi::{Components, OpenApi as Document};
use utoipa::{Modify, OpenApi};

/// Declares the visit cookie as the API's credential.
struct VisitCookieScheme;

impl Modify for VisitCookieScheme {
    fn modify(&self, doc: &mut Document) {
        doc.components
            .get_or_insert_with(Components::default)
            .add_security_scheme(
                "SessionCookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    SESSION_COOKIE,
                    "Issued by POST /api/v1/visits; names the caller's visit.",
                ))),
            );
    }
}

/// OpenAPI document for `/api/v1` and the health probes.
#[derive(OpenApi)]
#[openapi(
    modifiers(&VisitCookieScheme),
    info(
        title = "THDC registration API",
        description = "Registration of interest for the Travel Health Data Commons."
    ),
    servers(
        (url = "/", description = "Same origin as the registration site")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::visits::open_visit,
        crate::inbound::http::visits::current_visit,
        crate::inbound::http::visits::close_visit,
        crate::inbound::http::registration::get_registration,
        crate::inbound::http::registration::edit_draft,
        crate::inbound::http::registration::submit,
        crate::inbound::http::registration::register_another,
        crate::inbound::http::content::site_content,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        ErrorSchema,
        ErrorCodeSchema,
        DraftPatchRequest,
        DraftResponse,
        FormStatusResponse,
        FormSnapshotResponse,
        IdentityResponse,
        VisitResponse,
        TeamMemberResponse,
        SiteContentResponse,
    )),
    tags(
        (name = "visits", description = "Binding a browser session to a signed-in visit"),
        (name = "registration", description = "The registration form and its submission"),
        (name = "content", description = "Static site content"),
        (name = "health", description = "Liveness and readiness probes")
    )
)]
pub struct ApiDoc;
