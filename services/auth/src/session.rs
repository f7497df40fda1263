//! Cookie sessions
//!
//! The session identity travels in an HS256-signed JWT stored in an
//! HTTP-only cookie. Expiry slides: once less than half of the lifetime is
//! left, the next request gets a freshly issued cookie.

use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::Utc;
use cookie::time::Duration as CookieDuration;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::models::SessionIdentity;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "internado_session";

/// Session lifetime used when none is configured
pub const DEFAULT_EXPIRE_MINUTES: i64 = 30;

const MIN_SECRET_LEN: usize = 32;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session configuration error: {0}")]
    Config(String),

    #[error("Session token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

/// Session configuration
#[derive(Clone)]
pub struct SessionConfig {
    /// HMAC secret for signing session tokens
    pub secret: String,
    /// Sliding expiry in minutes (default: 30)
    pub expire_minutes: i64,
    /// Whether to mark the cookie `Secure`
    pub secure_cookie: bool,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("secret", &"<redacted>")
            .field("expire_minutes", &self.expire_minutes)
            .field("secure_cookie", &self.secure_cookie)
            .finish()
    }
}

impl SessionConfig {
    /// Create a new SessionConfig from environment variables
    ///
    /// # Environment Variables
    /// - `SESSION_SECRET`: signing secret, at least 32 bytes (required)
    /// - `SESSION_EXPIRE_MINUTES`: sliding expiry in minutes (default: 30)
    /// - `SESSION_COOKIE_SECURE`: `true` to send the cookie over HTTPS only (default: false)
    pub fn from_env() -> Result<Self, SessionError> {
        let secret = std::env::var("SESSION_SECRET")
            .map_err(|_| SessionError::Config("SESSION_SECRET environment variable not set".into()))?;

        let expire_minutes = std::env::var("SESSION_EXPIRE_MINUTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|m: &i64| *m > 0)
            .unwrap_or(DEFAULT_EXPIRE_MINUTES);

        let secure_cookie = std::env::var("SESSION_COOKIE_SECURE")
            .map(|s| s.eq_ignore_ascii_case("true") || s == "1")
            .unwrap_or(false);

        Ok(Self {
            secret,
            expire_minutes,
            secure_cookie,
        })
    }
}

/// Claims stored in the session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User ID
    pub sub: i32,
    pub name: String,
    pub email: String,
    pub role: String,
    /// Issued at time
    pub iat: i64,
    /// Expiration time
    pub exp: i64,
    /// Whether the cookie outlives the browser session
    pub persistent: bool,
}

impl SessionClaims {
    pub fn identity(&self) -> SessionIdentity {
        SessionIdentity {
            subject_id: self.sub,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role.clone(),
        }
    }
}

/// Issues, decodes and ends cookie sessions
#[derive(Clone)]
pub struct SessionIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    config: SessionConfig,
}

impl SessionIssuer {
    pub fn new(config: SessionConfig) -> Result<Self, SessionError> {
        if config.secret.len() < MIN_SECRET_LEN {
            return Err(SessionError::Config(format!(
                "session secret must be at least {} bytes",
                MIN_SECRET_LEN
            )));
        }
        if config.expire_minutes <= 0 {
            return Err(SessionError::Config(
                "session expiry must be positive".to_string(),
            ));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            config,
        })
    }

    pub fn expire_minutes(&self) -> i64 {
        self.config.expire_minutes
    }

    /// Sign a session for `identity` and wrap it in the session cookie
    pub fn issue(
        &self,
        identity: &SessionIdentity,
        persistent: bool,
    ) -> Result<Cookie<'static>, SessionError> {
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: identity.subject_id,
            name: identity.name.clone(),
            email: identity.email.clone(),
            role: identity.role.clone(),
            iat: now,
            exp: now + self.config.expire_minutes * 60,
            persistent,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        info!("Issued session for user {}", identity.subject_id);

        Ok(self.cookie(token, persistent))
    }

    /// Re-issue a session that is past half of its lifetime
    pub fn refresh(&self, claims: &SessionClaims) -> Result<Cookie<'static>, SessionError> {
        self.issue(&claims.identity(), claims.persistent)
    }

    /// Verify signature and expiry of a session token
    pub fn decode(&self, token: &str) -> Result<SessionClaims, SessionError> {
        let data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }

    /// True once less than half of the lifetime remains
    pub fn needs_refresh(&self, claims: &SessionClaims) -> bool {
        let remaining = claims.exp - Utc::now().timestamp();
        remaining * 2 < self.config.expire_minutes * 60
    }

    /// Cookie that makes the browser drop the session
    pub fn end(&self) -> Cookie<'static> {
        let mut cookie = self.cookie(String::new(), false);
        cookie.make_removal();
        cookie
    }

    fn cookie(&self, value: String, persistent: bool) -> Cookie<'static> {
        let mut cookie = Cookie::build((SESSION_COOKIE, value))
            .path("/")
            .http_only(true)
            .secure(self.config.secure_cookie)
            .same_site(SameSite::Lax)
            .build();

        if persistent {
            cookie.set_max_age(CookieDuration::minutes(self.config.expire_minutes));
        }

        cookie
    }
}
