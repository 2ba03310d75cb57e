//! Errors the domain hands to adapters.
//!
//! An [`Error`] names a failure category and a message for the visitor. It
//! never carries a status code; the HTTP adapter picks one from the
//! [`ErrorCode`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::TraceId;

/// Failure category, serialised in `snake_case`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Malformed body or a registration field that failed validation.
    InvalidRequest,
    /// The session has no visit.
    Unauthorized,
    NotFound,
    /// The form is not in a state that allows the request.
    Conflict,
    /// The visitor's identity is not ready yet.
    ServiceUnavailable,
    InternalError,
}

/// Error payload shared by every JSON endpoint.
///
/// Built inside a traced request, the error picks up that request's
/// [`TraceId`].
///
/// # Examples
/// ```
/// use thdc_backend::domain::{Error, ErrorCode};
/// use serde_json::json;
///
/// let err = Error::invalid_request("email is not a valid address")
///     .with_details(json!({ "field": "email", "code": "malformed" }));
/// assert_eq!(err.code(), ErrorCode::InvalidRequest);
/// assert_eq!(err.details().map(|d| &d["field"]), Some(&json!("email")));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Error {
    code: ErrorCode,
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    trace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

macro_rules! constructors {
    ($($name:ident => $code:ident),+ $(,)?) => {
        $(
            #[doc = concat!("Build an [`ErrorCode::", stringify!($code), "`] error.")]
            pub fn $name(message: impl Into<String>) -> Self {
                Self::new(ErrorCode::$code, message)
            }
        )+
    };
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            trace_id: TraceId::current().map(|id| id.to_string()),
            details: None,
        }
    }

    constructors! {
        invalid_request => InvalidRequest,
        unauthorized => Unauthorized,
        not_found => NotFound,
        conflict => Conflict,
        service_unavailable => ServiceUnavailable,
        internal => InternalError,
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Id of the request that produced the error, if it was traced.
    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    /// Machine-readable context, such as the offending registration field.
    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    #[must_use]
    pub fn with_trace_id(self, id: impl Into<String>) -> Self {
        Self {
            trace_id: Some(id.into()),
            ..self
        }
    }

    #[must_use]
    pub fn with_details(self, details: Value) -> Self {
        Self {
            details: Some(details),
            ..self
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for Error {}
