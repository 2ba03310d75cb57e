//! OpenAPI shapes for domain types.
//!
//! The domain does not depend on utoipa, so its error payload is described
//! here by mirror types registered under the domain names.

use utoipa::ToSchema;

/// Failure category of an [`crate::domain::Error`].
#[derive(ToSchema)]
#[schema(as = crate::domain::ErrorCode, rename_all = "snake_case")]
pub enum ErrorCodeSchema {
    /// Malformed body, or a registration field failed validation (400).
    InvalidRequest,
    /// No visit is bound to the session cookie (401).
    Unauthorized,
    NotFound,
    /// The form is submitting, or already registered (409).
    Conflict,
    /// Anonymous sign-in has not produced an identity (503).
    ServiceUnavailable,
    InternalError,
}

/// Error payload returned by every `/api/v1` endpoint.
#[derive(ToSchema)]
#[schema(as = crate::domain::Error, rename_all = "camelCase")]
#[expect(dead_code, reason = "only read by the OpenAPI derive")]
pub struct ErrorSchema {
    #[schema(example = "invalid_request")]
    code: ErrorCodeSchema,
    #[schema(example = "email is not a valid address")]
    message: String,
    /// Same value as the `trace-id` response header.
    #[schema(example = "9d2c4f0e-1b7a-4e55-8c3d-6a0f5e2b7c19")]
    trace_id: Option<String>,
    /// For validation failures, `{ "field": ..., "code": ... }`.
    #[schema(value_type = Option<Object>, example = json!({ "field": "email", "code": "malformed" }))]
    details: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use utoipa::PartialSchema;

    fn schema_json<T: PartialSchema>() -> Value {
        serde_json::to_value(T::schema()).expect("schema JSON")
    }

    #[test]
    fn codes_match_the_wire_names() {
        use crate::domain::ErrorCode;

        let schema = schema_json::<ErrorCodeSchema>().to_string();
        for code in [
            ErrorCode::InvalidRequest,
            ErrorCode::Unauthorized,
            ErrorCode::NotFound,
            ErrorCode::Conflict,
            ErrorCode::ServiceUnavailable,
            ErrorCode::InternalError,
        ] {
            let wire = serde_json::to_value(code).expect("code JSON");
            assert!(schema.contains(&wire.to_string()), "schema lacks {wire}");
        }
        assert_eq!(ErrorCodeSchema::name(), "crate.domain.ErrorCode");
    }

    #[test]
    fn error_fields_are_camel_case_and_optional_where_skipped() {
        let schema = schema_json::<ErrorSchema>();
        let properties = schema["properties"].as_object().expect("properties");
        for field in ["code", "message", "traceId", "details"] {
            assert!(properties.contains_key(field), "missing {field}");
        }
        let required = &schema["required"];
        assert!(required.to_string().contains("\"code\""));
        assert!(!required.to_string().contains("traceId"));
        assert_eq!(ErrorSchema::name(), "crate.domain.Error");
    }
}
