//! Firebase project configuration read from the environment.
//!
//! Settings are validated once at startup. A missing API key, project id or
//! application namespace aborts the process instead of silently writing to a
//! default namespace.

use std::fmt;
use std::time::Duration;

use mockable::Env;
use reqwest::Url;
use zeroize::Zeroizing;

use crate::domain::{AppId, CustomToken};

pub(crate) const API_KEY_ENV: &str = "THDC_FIREBASE_API_KEY";
pub(crate) const PROJECT_ID_ENV: &str = "THDC_FIREBASE_PROJECT_ID";
pub(crate) const APP_ID_ENV: &str = "THDC_APP_ID";
pub(crate) const AUTH_DOMAIN_ENV: &str = "THDC_FIREBASE_AUTH_DOMAIN";
pub(crate) const STORAGE_BUCKET_ENV: &str = "THDC_FIREBASE_STORAGE_BUCKET";
pub(crate) const MESSAGING_SENDER_ID_ENV: &str = "THDC_FIREBASE_MESSAGING_SENDER_ID";
pub(crate) const WEB_APP_ID_ENV: &str = "THDC_FIREBASE_APP_ID_WEB";
pub(crate) const MEASUREMENT_ID_ENV: &str = "THDC_FIREBASE_MEASUREMENT_ID";
pub(crate) const INITIAL_AUTH_TOKEN_ENV: &str = "THDC_INITIAL_AUTH_TOKEN";
pub(crate) const AUTH_URL_ENV: &str = "THDC_FIREBASE_AUTH_URL";
pub(crate) const FIRESTORE_URL_ENV: &str = "THDC_FIREBASE_FIRESTORE_URL";
pub(crate) const TIMEOUT_ENV: &str = "THDC_FIREBASE_TIMEOUT_SECS";

const DEFAULT_AUTH_URL: &str = "https://identitytoolkit.googleapis.com/v1/";
const DEFAULT_FIRESTORE_URL: &str = "https://firestore.googleapis.com/v1/";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Errors raised while reading Firebase settings.
#[derive(Debug, thiserror::Error)]
pub enum FirebaseConfigError {
    #[error("missing required environment variable: {name}")]
    MissingEnv { name: &'static str },
    #[error("invalid value for {name}: {reason}")]
    InvalidEnv { name: &'static str, reason: String },
}

/// Web API key; redacted from debug output.
#[derive(Clone)]
pub struct ApiKey(Zeroizing<String>);

impl ApiKey {
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Validated Firebase settings.
#[derive(Debug, Clone)]
pub struct FirebaseSettings {
    pub api_key: ApiKey,
    pub project_id: String,
    pub app_id: AppId,
    pub auth_domain: Option<String>,
    pub storage_bucket: Option<String>,
    pub messaging_sender_id: Option<String>,
    pub web_app_id: Option<String>,
    pub measurement_id: Option<String>,
    pub initial_auth_token: Option<CustomToken>,
    /// Identity Toolkit base URL, ending in `/`.
    pub auth_url: Url,
    /// Firestore REST base URL, ending in `/`.
    pub firestore_url: Url,
    pub request_timeout: Duration,
}

impl FirebaseSettings {
    /// Read and validate settings from `env`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use mockable::MockEnv;
    /// use thdc_backend::outbound::firebase::FirebaseSettings;
    ///
    /// let mut env = MockEnv::new();
    /// env.expect_string().returning(|name| match name {
    ///     "THDC_FIREBASE_API_KEY" => Some("key".to_owned()),
    ///     "THDC_FIREBASE_PROJECT_ID" => Some("thdc-project".to_owned()),
    ///     "THDC_APP_ID" => Some("thdc".to_owned()),
    ///     _ => None,
    /// });
    ///
    /// let settings = FirebaseSettings::from_env(&env).expect("valid settings");
    /// assert_eq!(settings.project_id, "thdc-project");
    /// ```
    pub fn from_env<E: Env>(env: &E) -> Result<Self, FirebaseConfigError> {
        let api_key = ApiKey(Zeroizing::new(required(env, API_KEY_ENV)?));
        let project_id = required(env, PROJECT_ID_ENV)?;
        let app_id =
            AppId::new(required(env, APP_ID_ENV)?).map_err(|err| FirebaseConfigError::InvalidEnv {
                name: APP_ID_ENV,
                reason: err.to_string(),
            })?;
        let initial_auth_token = optional(env, INITIAL_AUTH_TOKEN_ENV)
            .map(CustomToken::new)
            .transpose()
            .map_err(|err| FirebaseConfigError::InvalidEnv {
                name: INITIAL_AUTH_TOKEN_ENV,
                reason: err.to_string(),
            })?;

        Ok(Self {
            api_key,
            project_id,
            app_id,
            auth_domain: optional(env, AUTH_DOMAIN_ENV),
            storage_bucket: optional(env, STORAGE_BUCKET_ENV),
            messaging_sender_id: optional(env, MESSAGING_SENDER_ID_ENV),
            web_app_id: optional(env, WEB_APP_ID_ENV),
            measurement_id: optional(env, MEASUREMENT_ID_ENV),
            initial_auth_token,
            auth_url: base_url(env, AUTH_URL_ENV, DEFAULT_AUTH_URL)?,
            firestore_url: base_url(env, FIRESTORE_URL_ENV, DEFAULT_FIRESTORE_URL)?,
            request_timeout: timeout(env)?,
        })
    }
}

/// Trimmed value of `name`; blank counts as unset.
fn optional<E: Env>(env: &E, name: &'static str) -> Option<String> {
    env.string(name)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn required<E: Env>(env: &E, name: &'static str) -> Result<String, FirebaseConfigError> {
    optional(env, name).ok_or(FirebaseConfigError::MissingEnv { name })
}

fn base_url<E: Env>(
    env: &E,
    name: &'static str,
    default: &str,
) -> Result<Url, FirebaseConfigError> {
    let mut raw = optional(env, name).unwrap_or_else(|| default.to_owned());
    // `Url::join` drops the last segment unless the base ends in a slash.
    if !raw.ends_with('/') {
        raw.push('/');
    }
    let url = Url::parse(&raw).map_err(|err| FirebaseConfigError::InvalidEnv {
        name,
        reason: err.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(FirebaseConfigError::InvalidEnv {
            name,
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}

fn timeout<E: Env>(env: &E) -> Result<Duration, FirebaseConfigError> {
    let Some(raw) = optional(env, TIMEOUT_ENV) else {
        return Ok(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    };
    match raw.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(FirebaseConfigError::InvalidEnv {
            name: TIMEOUT_ENV,
            reason: format!("expected a positive number of seconds, got '{raw}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use std::collections::HashMap;

    use mockable::MockEnv;
    use rstest::{fixture, rstest};

    use super::*;

    fn mock_env(vars: HashMap<&'static str, &'static str>) -> MockEnv {
        let mut env = MockEnv::new();
        env.expect_string()
            .times(0..)
            .returning(move |key| vars.get(key).map(|value| (*value).to_owned()));
        env
    }

    #[fixture]
    fn required_vars() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            (API_KEY_ENV, "AIza-test"),
            (PROJECT_ID_ENV, "thdc-project"),
            (APP_ID_ENV, "thdc"),
        ])
    }

    #[rstest]
    fn defaults_point_at_google_endpoints(required_vars: HashMap<&'static str, &'static str>) {
        let settings = FirebaseSettings::from_env(&mock_env(required_vars)).expect("settings");
        assert_eq!(settings.auth_url.as_str(), DEFAULT_AUTH_URL);
        assert_eq!(settings.firestore_url.as_str(), DEFAULT_FIRESTORE_URL);
        assert_eq!(settings.request_timeout, Duration::from_secs(10));
        assert_eq!(settings.app_id.as_ref(), "thdc");
        assert!(settings.initial_auth_token.is_none());
        assert!(settings.auth_domain.is_none());
    }

    #[rstest]
    #[case(API_KEY_ENV)]
    #[case(PROJECT_ID_ENV)]
    #[case(APP_ID_ENV)]
    fn missing_required_variable_fails(
        mut required_vars: HashMap<&'static str, &'static str>,
        #[case] missing: &'static str,
    ) {
        required_vars.remove(missing);
        let err = FirebaseSettings::from_env(&mock_env(required_vars)).expect_err("must fail");
        assert!(matches!(err, FirebaseConfigError::MissingEnv { name } if name == missing));
    }

    #[rstest]
    fn blank_required_variable_counts_as_missing(
        mut required_vars: HashMap<&'static str, &'static str>,
    ) {
        required_vars.insert(APP_ID_ENV, "   ");
        let err = FirebaseSettings::from_env(&mock_env(required_vars)).expect_err("must fail");
        assert!(matches!(err, FirebaseConfigError::MissingEnv { name: APP_ID_ENV }));
    }

    #[rstest]
    fn app_id_with_separator_is_invalid(mut required_vars: HashMap<&'static str, &'static str>) {
        required_vars.insert(APP_ID_ENV, "a/b");
        let err = FirebaseSettings::from_env(&mock_env(required_vars)).expect_err("must fail");
        assert!(matches!(err, FirebaseConfigError::InvalidEnv { name: APP_ID_ENV, .. }));
    }

    #[rstest]
    fn emulator_overrides_gain_trailing_slash(
        mut required_vars: HashMap<&'static str, &'static str>,
    ) {
        required_vars.insert(
            AUTH_URL_ENV,
            "http://127.0.0.1:9099/identitytoolkit.googleapis.com/v1",
        );
        required_vars.insert(FIRESTORE_URL_ENV, "http://127.0.0.1:8081/v1/");
        let settings = FirebaseSettings::from_env(&mock_env(required_vars)).expect("settings");
        assert_eq!(
            settings.auth_url.as_str(),
            "http://127.0.0.1:9099/identitytoolkit.googleapis.com/v1/"
        );
        assert_eq!(settings.firestore_url.as_str(), "http://127.0.0.1:8081/v1/");
    }

    #[rstest]
    #[case(AUTH_URL_ENV, "ftp://example.com")]
    #[case(FIRESTORE_URL_ENV, "not a url")]
    #[case(TIMEOUT_ENV, "0")]
    #[case(TIMEOUT_ENV, "soon")]
    fn invalid_optional_values_fail(
        mut required_vars: HashMap<&'static str, &'static str>,
        #[case] name: &'static str,
        #[case] value: &'static str,
    ) {
        required_vars.insert(name, value);
        let err = FirebaseSettings::from_env(&mock_env(required_vars)).expect_err("must fail");
        assert!(matches!(err, FirebaseConfigError::InvalidEnv { name: n, .. } if n == name));
    }

    #[rstest]
    fn optional_web_config_is_carried(mut required_vars: HashMap<&'static str, &'static str>) {
        required_vars.insert(AUTH_DOMAIN_ENV, "thdc.firebaseapp.com");
        required_vars.insert(MEASUREMENT_ID_ENV, "G-TEST");
        required_vars.insert(INITIAL_AUTH_TOKEN_ENV, "custom-token");
        let settings = FirebaseSettings::from_env(&mock_env(required_vars)).expect("settings");
        assert_eq!(settings.auth_domain.as_deref(), Some("thdc.firebaseapp.com"));
        assert_eq!(settings.measurement_id.as_deref(), Some("G-TEST"));
        assert_eq!(
            settings.initial_auth_token.as_ref().map(CustomToken::expose),
            Some("custom-token")
        );
    }

    #[rstest]
    fn debug_output_hides_api_key(required_vars: HashMap<&'static str, &'static str>) {
        let settings = FirebaseSettings::from_env(&mock_env(required_vars)).expect("settings");
        let rendered = format!("{settings:?}");
        assert!(!rendered.contains("AIza-test"));
    }
}
