//! HTTP inbound adapter exposing REST endpoints.

pub mod content;
pub mod error;
pub mod health;
pub mod registration;
pub mod registration_dto;
pub mod schemas;
pub mod session;
pub mod session_config;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod visits;

use actix_web::web;

pub use error::{ApiResult, json_error_handler};

/// Register every `/api/v1` handler on `cfg`.
///
/// # Examples
/// ```
/// use actix_web::{App, web};
/// use thdc_backend::inbound::http::configure_api;
///
/// let _app = App::new().service(web::scope("/api/v1").configure(configure_api));
/// ```
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.service(visits::open_visit)
        .service(visits::current_visit)
        .service(visits::close_visit)
        .service(registration::get_registration)
        .service(registration::edit_draft)
        .service(registration::submit)
        .service(registration::register_another)
        .service(content::site_content);
}
