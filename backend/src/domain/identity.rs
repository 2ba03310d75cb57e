//! Session identity primitives.
//!
//! An identity is issued by the identity collaborator without credentials and
//! only attributes a registration to the session that submitted it. Bearer
//! tokens ride along so outbound adapters can authorise the write; they never
//! leave the process through `Debug`, serde, or logs.

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Validation errors for identity primitives.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityValidationError {
    /// The user id was empty.
    #[error("user id must not be empty")]
    EmptyUserId,
    /// The user id carried leading or trailing whitespace.
    #[error("user id must not contain surrounding whitespace")]
    PaddedUserId,
    /// A token was blank.
    #[error("token must not be empty")]
    EmptyToken,
}

/// Opaque identifier of an authenticated session.
///
/// ## Invariants
/// - Non-empty and free of surrounding whitespace. No other shape is assumed;
///   anonymous uids are provider-defined.
///
/// # Examples
/// ```
/// use thdc_backend::domain::UserId;
///
/// let id = UserId::new("u123").expect("valid id");
/// assert_eq!(id.as_ref(), "u123");
/// assert!(UserId::new(" u123").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Validate and construct a [`UserId`].
    pub fn new(id: impl Into<String>) -> Result<Self, IdentityValidationError> {
        let id = id.into();
        if id.is_empty() {
            return Err(IdentityValidationError::EmptyUserId);
        }
        if id.trim() != id {
            return Err(IdentityValidationError::PaddedUserId);
        }
        Ok(Self(id))
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl TryFrom<String> for UserId {
    type Error = IdentityValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Bearer token proving the session to the document store.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(Zeroizing<String>);

impl AccessToken {
    /// Wrap a non-empty bearer token.
    pub fn new(token: impl Into<String>) -> Result<Self, IdentityValidationError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(IdentityValidationError::EmptyToken);
        }
        Ok(Self(Zeroizing::new(token)))
    }

    /// Raw token for an `Authorization` header.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(..)")
    }
}

/// Pre-provisioned sign-in token supplied by the hosting environment.
#[derive(Clone, PartialEq, Eq)]
pub struct CustomToken(Zeroizing<String>);

impl CustomToken {
    /// Wrap a non-empty custom token.
    pub fn new(token: impl Into<String>) -> Result<Self, IdentityValidationError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(IdentityValidationError::EmptyToken);
        }
        Ok(Self(Zeroizing::new(token)))
    }

    /// Raw token for the sign-in request body.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for CustomToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomToken(..)")
    }
}

/// The identity a visit holds once sign-in resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    user_id: UserId,
    access_token: Option<AccessToken>,
}

impl SessionIdentity {
    /// Identity without a bearer token, as issued by local fixtures.
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            access_token: None,
        }
    }

    /// Attach the bearer token returned by the identity collaborator.
    pub fn with_access_token(mut self, token: AccessToken) -> Self {
        self.access_token = Some(token);
        self
    }

    /// Identifier stored on each registration as `userId`.
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Bearer token, when the collaborator issued one.
    pub fn access_token(&self) -> Option<&AccessToken> {
        self.access_token.as_ref()
    }
}
