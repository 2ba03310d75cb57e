//! Request correlation.
//!
//! [`trace_requests`] gives every request a fresh [`TraceId`], opens a
//! tracing span and a task-local scope for it, and echoes the id back in the
//! `trace-id` response header. Domain errors built while the scope is open
//! carry the same id in their JSON body.

use actix_web::body::{BoxBody, MessageBody};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::middleware::Next;
use tracing::{Instrument, error, info_span};

use crate::domain::{TRACE_ID_HEADER, TraceId};

/// Middleware function; install with `actix_web::middleware::from_fn`.
///
/// # Examples
/// ```
/// use actix_web::App;
/// use actix_web::middleware::from_fn;
/// use thdc_backend::middleware::trace_requests;
///
/// let app = App::new().wrap(from_fn(trace_requests));
/// ```
///
/// # Errors
///
/// Propagates the wrapped service's error unchanged.
pub async fn trace_requests(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<BoxBody>, actix_web::Error> {
    let trace_id = TraceId::generate();
    let span = info_span!(
        "request",
        trace_id = %trace_id,
        method = %req.method(),
        path = %req.path(),
    );

    let mut res = TraceId::scope(trace_id, next.call(req))
        .instrument(span)
        .await?
        .map_into_boxed_body();
    match HeaderValue::from_str(&trace_id.to_string()) {
        Ok(value) => {
            res.headers_mut()
                .insert(HeaderName::from_static(TRACE_ID_HEADER), value);
        }
        Err(err) => error!(error = %err, "trace id is not a valid header value"),
    }
    Ok(res)
}
