//! Static site content rendered by the front end.

use serde::Serialize;

use super::Role;

/// Reference paper describing the commons.
pub const PAPER_URL: &str = "https://doi.org/10.5281/zenodo.17969781";

/// Public contact address.
pub const CONTACT_EMAIL: &str = "contact@thdc.org";

/// One founding team member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub name: &'static str,
    pub role: &'static str,
    pub institution: &'static str,
    pub bio: &'static str,
}

const FOUNDING_MEMBER: &str = "Founding member";

static TEAM: [TeamMember; 5] = [
    TeamMember {
        name: "Andrés Colubri",
        role: FOUNDING_MEMBER,
        institution: "UMass Chan Medical School / Broad Institute",
        bio: "Lead researcher focused on computational epidemiology and digital health tools for surveillance.",
    },
    TeamMember {
        name: "Andrea Farnham",
        role: FOUNDING_MEMBER,
        institution: "University of Zürich",
        bio: "Focuses on epidemiology and the impact of travel on public health.",
    },
    TeamMember {
        name: "Regina C. LaRocque",
        role: FOUNDING_MEMBER,
        institution: "Massachusetts General Hospital",
        bio: "Focuses on travel medicine, infectious diseases, and clinical care.",
    },
    TeamMember {
        name: "José Muñoz",
        role: FOUNDING_MEMBER,
        institution: "Hospital Clínic de Barcelona / Universitat de Barcelona / ISGlobal",
        bio: "Leading expert in tropical medicine and international health.",
    },
    TeamMember {
        name: "Patricia Schlagenhauf",
        role: FOUNDING_MEMBER,
        institution: "University of Zürich / WHO Collaborating Centre for Travellers' Health",
        bio: "Renowned expert in travel medicine, malaria prevention, and global health guidelines.",
    },
];

/// Everything the landing page needs besides the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteContent {
    pub paper_url: &'static str,
    pub contact_email: &'static str,
    pub team: &'static [TeamMember],
    /// Role options for the registration form, in display order.
    pub roles: Vec<Role>,
}

impl SiteContent {
    pub fn current() -> Self {
        Self {
            paper_url: PAPER_URL,
            contact_email: CONTACT_EMAIL,
            team: &TEAM,
            roles: Role::ALL.to_vec(),
        }
    }
}
