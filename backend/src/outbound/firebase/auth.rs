//! Reqwest-backed Firebase Authentication adapter.
//!
//! Talks to the Identity Toolkit REST API. Anonymous sign-in is a single
//! `accounts:signUp`; custom tokens need an extra `accounts:lookup` because
//! that response omits the uid.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tracing::debug;

use super::dto::{
    CustomTokenRequest, LookupRequest, LookupResponse, SignInResponse, SignUpRequest,
    parse_google_error,
};
use super::body_preview;
use super::settings::{ApiKey, FirebaseSettings};
use crate::domain::ports::{
    IdentityChannel, IdentityProvider, IdentityProviderError, IdentityProviderFactory,
};
use crate::domain::{AccessToken, CustomToken, IdentityValidationError, SessionIdentity, UserId};

const SIGN_UP: &str = "./accounts:signUp";
const SIGN_IN_WITH_CUSTOM_TOKEN: &str = "./accounts:signInWithCustomToken";
const LOOKUP: &str = "./accounts:lookup";

/// Identity provider for one visit.
pub struct FirebaseIdentityProvider {
    client: Client,
    auth_url: Url,
    api_key: ApiKey,
    channel: IdentityChannel,
}

impl FirebaseIdentityProvider {
    /// Build a provider sharing `client`'s connection pool.
    pub fn new(client: Client, auth_url: Url, api_key: ApiKey) -> Self {
        Self {
            client,
            auth_url,
            api_key,
            channel: IdentityChannel::default(),
        }
    }

    async fn call<Req, Res>(&self, endpoint: &str, body: &Req) -> Result<Res, IdentityProviderError>
    where
        Req: Serialize + Sync,
        Res: DeserializeOwned,
    {
        let url = self
            .auth_url
            .join(endpoint)
            .map_err(|err| IdentityProviderError::transport(format!("bad endpoint: {err}")))?;
        let response = self
            .client
            .post(url)
            .query(&[("key", self.api_key.expose())])
            .json(body)
            .send()
            .await
            .map_err(|err| IdentityProviderError::transport(err.without_url().to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| IdentityProviderError::transport(err.without_url().to_string()))?;
        if !status.is_success() {
            return Err(map_status_error(status, bytes.as_ref()));
        }
        serde_json::from_slice(bytes.as_ref()).map_err(|err| {
            IdentityProviderError::decode(format!("invalid {endpoint} payload: {err}"))
        })
    }

    fn publish(
        &self,
        user_id: String,
        id_token: String,
    ) -> Result<SessionIdentity, IdentityProviderError> {
        let undecodable =
            |err: IdentityValidationError| IdentityProviderError::decode(err.to_string());
        let user_id = UserId::new(user_id).map_err(undecodable)?;
        let token = AccessToken::new(id_token).map_err(undecodable)?;
        let identity = SessionIdentity::new(user_id).with_access_token(token);
        debug!(user_id = %identity.user_id(), "firebase sign-in resolved");
        self.channel.publish(identity.clone());
        Ok(identity)
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentityProvider {
    async fn sign_in_anonymously(&self) -> Result<SessionIdentity, IdentityProviderError> {
        let response: SignInResponse = self
            .call(
                SIGN_UP,
                &SignUpRequest {
                    return_secure_token: true,
                },
            )
            .await?;
        let user_id = response
            .local_id
            .ok_or_else(|| IdentityProviderError::decode("sign-up response lacks localId"))?;
        self.publish(user_id, response.id_token)
    }

    async fn sign_in_with_custom_token(
        &self,
        token: &CustomToken,
    ) -> Result<SessionIdentity, IdentityProviderError> {
        let response: SignInResponse = self
            .call(
                SIGN_IN_WITH_CUSTOM_TOKEN,
                &CustomTokenRequest {
                    token: token.expose(),
                    return_secure_token: true,
                },
            )
            .await?;
        let user_id = match response.local_id {
            Some(id) => id,
            None => {
                let lookup: LookupResponse = self
                    .call(
                        LOOKUP,
                        &LookupRequest {
                            id_token: response.id_token.as_str(),
                        },
                    )
                    .await?;
                lookup
                    .users
                    .into_iter()
                    .next()
                    .map(|user| user.local_id)
                    .ok_or_else(|| IdentityProviderError::decode("lookup returned no users"))?
            }
        };
        self.publish(user_id, response.id_token)
    }

    fn subscribe(&self) -> watch::Receiver<Option<SessionIdentity>> {
        self.channel.subscribe()
    }
}

/// Builds one [`FirebaseIdentityProvider`] per visit over a shared client.
#[derive(Clone)]
pub struct FirebaseIdentityProviderFactory {
    client: Client,
    auth_url: Url,
    api_key: ApiKey,
}

impl FirebaseIdentityProviderFactory {
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn from_settings(settings: &FirebaseSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(settings.request_timeout).build()?;
        Ok(Self {
            client,
            auth_url: settings.auth_url.clone(),
            api_key: settings.api_key.clone(),
        })
    }
}

impl IdentityProviderFactory for FirebaseIdentityProviderFactory {
    fn create(&self) -> Arc<dyn IdentityProvider> {
        Arc::new(FirebaseIdentityProvider::new(
            self.client.clone(),
            self.auth_url.clone(),
            self.api_key.clone(),
        ))
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> IdentityProviderError {
    let message = match parse_google_error(body) {
        Some(error) if !error.message.is_empty() => {
            format!("status {}: {}", status.as_u16(), error.message)
        }
        _ => {
            let preview = body_preview(body);
            if preview.is_empty() {
                format!("status {}", status.as_u16())
            } else {
                format!("status {}: {preview}", status.as_u16())
            }
        }
    };
    if status.is_server_error() {
        IdentityProviderError::transport(message)
    } else {
        IdentityProviderError::rejected(message)
    }
}
