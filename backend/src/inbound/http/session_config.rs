//! Session cookie policy, read from the environment at start-up.
//!
//! The cookie carries only a visit id, yet it is still signed and encrypted
//! with a key from `SESSION_KEY_FILE`. Release builds refuse to start unless
//! every toggle is set to a valid value and the key is long enough. Debug
//! builds log a warning and fall back to a default instead.

use std::path::PathBuf;

use actix_session::SessionMiddleware;
use actix_session::config::{CookieContentSecurity, PersistentSession};
use actix_session::storage::CookieSessionStore;
use actix_web::cookie::time::Duration;
use actix_web::cookie::{Key, SameSite};
use mockable::Env;
use tracing::warn;
use zeroize::Zeroizing;

/// Name of the cookie binding a browser to its visit.
pub const SESSION_COOKIE: &str = "session";
pub const COOKIE_SECURE_ENV: &str = "SESSION_COOKIE_SECURE";
pub const SAMESITE_ENV: &str = "SESSION_SAMESITE";
pub const ALLOW_EPHEMERAL_ENV: &str = "SESSION_ALLOW_EPHEMERAL";
pub const KEY_FILE_ENV: &str = "SESSION_KEY_FILE";

const SESSION_COOKIE_TTL: Duration = Duration::hours(2);
const DEFAULT_KEY_PATH: &str = "/var/run/secrets/session_key";
pub(crate) const SESSION_KEY_MIN_LEN: usize = 64;
// `Key::derive_from` panics below this length.
const DERIVABLE_KEY_LEN: usize = 32;

/// How strictly the environment is checked.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BuildMode {
    /// Missing or invalid toggles fall back to defaults with a warning.
    Debug,
    /// Every toggle must be present and valid.
    Release,
}

impl BuildMode {
    #[must_use]
    pub fn from_debug_assertions() -> Self {
        if cfg!(debug_assertions) {
            Self::Debug
        } else {
            Self::Release
        }
    }
}

/// Validated cookie policy.
#[derive(Clone)]
pub struct SessionSettings {
    pub key: Key,
    pub cookie_secure: bool,
    pub same_site: SameSite,
}

impl SessionSettings {
    /// Encrypted, HTTP-only cookie session honouring these settings.
    pub fn middleware(&self) -> SessionMiddleware<CookieSessionStore> {
        SessionMiddleware::builder(CookieSessionStore::default(), self.key.clone())
            .cookie_name(SESSION_COOKIE.to_owned())
            .cookie_path("/".to_owned())
            .cookie_secure(self.cookie_secure)
            .cookie_http_only(true)
            .cookie_content_security(CookieContentSecurity::Private)
            .cookie_same_site(self.same_site)
            .session_lifecycle(PersistentSession::default().session_ttl(SESSION_COOKIE_TTL))
            .build()
    }
}

/// Why a release build refused its session configuration.
#[derive(thiserror::Error, Debug)]
pub enum SessionConfigError {
    #[error("{name} must be set")]
    MissingEnv { name: &'static str },
    #[error("{name}='{value}' is not one of {expected}")]
    InvalidEnv {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("cannot read session key {path}: {source}")]
    KeyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("session key {path} has {length} bytes; at least {min_len} are required")]
    KeyTooShort {
        path: PathBuf,
        length: usize,
        min_len: usize,
    },
    #[error("SESSION_SAMESITE=None needs SESSION_COOKIE_SECURE=1")]
    InsecureSameSiteNone,
    #[error("SESSION_ALLOW_EPHEMERAL must be 0 in release builds")]
    EphemeralNotAllowed,
}

/// Read the cookie policy from `env`.
///
/// # Examples
///
/// ```rust
/// use mockable::MockEnv;
/// use thdc_backend::inbound::http::session_config::{BuildMode, session_settings_from_env};
///
/// let mut env = MockEnv::new();
/// env.expect_string().returning(|_| None);
///
/// let settings = session_settings_from_env(&env, BuildMode::Debug).expect("debug defaults");
/// assert!(settings.cookie_secure);
/// ```
///
/// # Errors
///
/// Release builds only; see [`SessionConfigError`].
pub fn session_settings_from_env<E: Env>(
    env: &E,
    mode: BuildMode,
) -> Result<SessionSettings, SessionConfigError> {
    let lookup = Lookup { env, mode };
    let cookie_secure = lookup.flag(COOKIE_SECURE_ENV, true)?;
    let same_site = lookup.same_site(cookie_secure)?;
    let allow_ephemeral = lookup.flag(ALLOW_EPHEMERAL_ENV, false)?;
    if allow_ephemeral && mode == BuildMode::Release {
        return Err(SessionConfigError::EphemeralNotAllowed);
    }
    let key = lookup.key(allow_ephemeral)?;
    Ok(SessionSettings {
        key,
        cookie_secure,
        same_site,
    })
}

struct Lookup<'a, E> {
    env: &'a E,
    mode: BuildMode,
}

impl<E: Env> Lookup<'_, E> {
    fn lenient(&self) -> bool {
        self.mode == BuildMode::Debug
    }

    /// `fallback` in debug builds, the error otherwise.
    fn or_fallback<T: std::fmt::Debug>(
        &self,
        name: &'static str,
        fallback: T,
        err: SessionConfigError,
    ) -> Result<T, SessionConfigError> {
        if self.lenient() {
            warn!(variable = name, reason = %err, fallback = ?fallback, "session setting defaulted");
            Ok(fallback)
        } else {
            Err(err)
        }
    }

    fn flag(&self, name: &'static str, fallback: bool) -> Result<bool, SessionConfigError> {
        match self.env.string(name) {
            None => self.or_fallback(name, fallback, SessionConfigError::MissingEnv { name }),
            Some(value) => match parse_bool(&value) {
                Some(flag) => Ok(flag),
                None => self.or_fallback(
                    name,
                    fallback,
                    SessionConfigError::InvalidEnv {
                        name,
                        value,
                        expected: "1|0|true|false|yes|no|y|n",
                    },
                ),
            },
        }
    }

    fn same_site(&self, cookie_secure: bool) -> Result<SameSite, SessionConfigError> {
        let fallback = if self.lenient() {
            SameSite::Lax
        } else {
            SameSite::Strict
        };
        let Some(value) = self.env.string(SAMESITE_ENV) else {
            return self.or_fallback(
                SAMESITE_ENV,
                fallback,
                SessionConfigError::MissingEnv { name: SAMESITE_ENV },
            );
        };
        match parse_same_site(&value) {
            Some(SameSite::None) if !cookie_secure => {
                if self.lenient() {
                    warn!("SESSION_SAMESITE=None on an insecure cookie; browsers may drop it");
                    Ok(SameSite::None)
                } else {
                    Err(SessionConfigError::InsecureSameSiteNone)
                }
            }
            Some(policy) => Ok(policy),
            None => self.or_fallback(
                SAMESITE_ENV,
                fallback,
                SessionConfigError::InvalidEnv {
                    name: SAMESITE_ENV,
                    value,
                    expected: "Strict|Lax|None",
                },
            ),
        }
    }

    fn key(&self, allow_ephemeral: bool) -> Result<Key, SessionConfigError> {
        let path = PathBuf::from(
            self.env
                .string(KEY_FILE_ENV)
                .unwrap_or_else(|| DEFAULT_KEY_PATH.to_owned()),
        );
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => Zeroizing::new(bytes),
            Err(source) if self.lenient() || allow_ephemeral => {
                warn!(path = %path.display(), error = %source, "using a throwaway session key");
                return Ok(Key::generate());
            }
            Err(source) => return Err(SessionConfigError::KeyRead { path, source }),
        };

        let length = bytes.len();
        if length < SESSION_KEY_MIN_LEN && !self.lenient() {
            return Err(SessionConfigError::KeyTooShort {
                path,
                length,
                min_len: SESSION_KEY_MIN_LEN,
            });
        }
        if length < DERIVABLE_KEY_LEN {
            warn!(path = %path.display(), length, "session key too short; using a throwaway key");
            return Ok(Key::generate());
        }
        Ok(Key::derive_from(&bytes))
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" => Some(true),
        "0" | "false" | "no" | "n" => Some(false),
        _ => None,
    }
}

fn parse_same_site(value: &str) -> Option<SameSite> {
    match value.to_ascii_lowercase().as_str() {
        "strict" => Some(SameSite::Strict),
        "lax" => Some(SameSite::Lax),
        "none" => Some(SameSite::None),
        _ => None,
    }
}
