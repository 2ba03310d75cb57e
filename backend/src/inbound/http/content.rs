//! Static landing page content.
//!
//! ```text
//! GET /api/v1/content
//! ```

use actix_web::{get, web};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{SiteContent, TeamMember};
use crate::inbound::http::state::HttpState;

/// One founding team member.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeamMemberResponse {
    #[schema(example = "Andrea Farnham")]
    pub name: String,
    #[schema(example = "Founding member")]
    pub role: String,
    pub institution: String,
    pub bio: String,
}

impl From<&TeamMember> for TeamMemberResponse {
    fn from(member: &TeamMember) -> Self {
        Self {
            name: member.name.to_owned(),
            role: member.role.to_owned(),
            institution: member.institution.to_owned(),
            bio: member.bio.to_owned(),
        }
    }
}

/// Reference paper, contact address, team roster and role options.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SiteContentResponse {
    #[schema(example = "https://doi.org/10.5281/zenodo.17969781")]
    pub paper_url: String,
    #[schema(example = "contact@thdc.org")]
    pub contact_email: String,
    pub team: Vec<TeamMemberResponse>,
    /// Role labels accepted by the registration form, in display order.
    pub roles: Vec<String>,
}

impl From<&SiteContent> for SiteContentResponse {
    fn from(content: &SiteContent) -> Self {
        Self {
            paper_url: content.paper_url.to_owned(),
            contact_email: content.contact_email.to_owned(),
            team: content.team.iter().map(TeamMemberResponse::from).collect(),
            roles: content
                .roles
                .iter()
                .map(|role| role.label().to_owned())
                .collect(),
        }
    }
}

/// Static site content.
#[utoipa::path(
    get,
    path = "/api/v1/content",
    responses(
        (status = 200, description = "Site content", body = SiteContentResponse)
    ),
    tags = ["content"],
    operation_id = "siteContent",
    security([])
)]
#[get("/content")]
pub async fn site_content(state: web::Data<HttpState>) -> web::Json<SiteContentResponse> {
    web::Json(SiteContentResponse::from(state.content.as_ref()))
}
