//! THDC registration backend.
//!
//! A hexagonal service: `domain` holds the session bootstrapper, the
//! registration flow and their ports; `inbound` exposes them over HTTP;
//! `outbound` implements the ports against Firebase.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use domain::TraceId;
