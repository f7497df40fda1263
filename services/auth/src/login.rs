//! Username/password login with lockout
//!
//! Steps run in a fixed order and stop at the first failure:
//! lock check, user lookup, active flag, password. Every rejection is
//! appended to the attempt log; a success wipes the user's history.

use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    attempts::{LOCKOUT_WINDOW_MINUTES, LoginAttemptTracker},
    authz::AppRole,
    error::AuthResult,
    hasher::{DEFAULT_WORK_FACTOR, PasswordHasher, decoy_hash, verify_blocking},
    models::{FailureKind, NewLoginAttempt, SessionIdentity, identity::NO_ROLE},
    repositories::CredentialStore,
};

/// Landing page for roles outside the authorization table
const DEFAULT_LANDING: &str = "/dashboard";

/// Why a login was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Locked,
    InvalidCredentials,
    Disabled,
    WrongPassword { remaining: u32 },
}

impl Rejection {
    /// Message shown to the person at the login form
    pub fn message(&self) -> String {
        match self {
            Rejection::Locked => format!(
                "Account locked after multiple failed attempts. Retry in {} minutes.",
                LOCKOUT_WINDOW_MINUTES
            ),
            Rejection::InvalidCredentials => "Invalid username or password.".to_string(),
            Rejection::Disabled => "Account disabled. Contact the administrator.".to_string(),
            Rejection::WrongPassword { remaining } => format!(
                "Invalid username or password. Attempts remaining: {}",
                remaining
            ),
        }
    }

    /// Classification stored with the failed attempt
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Rejection::Locked => FailureKind::AccountLocked,
            Rejection::InvalidCredentials => FailureKind::UnknownUser,
            Rejection::Disabled => FailureKind::AccountDisabled,
            Rejection::WrongPassword { .. } => FailureKind::InvalidPassword,
        }
    }
}

/// Result of a login attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Authenticated {
        identity: SessionIdentity,
        landing: &'static str,
    },
    Rejected(Rejection),
}

/// Runs the login flow against a credential store
#[derive(Clone)]
pub struct LoginService {
    store: Arc<dyn CredentialStore>,
    hasher: Arc<dyn PasswordHasher>,
    tracker: LoginAttemptTracker,
    decoy_hash: String,
}

impl LoginService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: Arc<dyn PasswordHasher>,
        tracker: LoginAttemptTracker,
    ) -> Self {
        Self {
            store,
            hasher,
            tracker,
            decoy_hash: decoy_hash(DEFAULT_WORK_FACTOR),
        }
    }

    /// Match the cost of the decoy verification to the configured work factor
    pub fn with_work_factor(mut self, work_factor: u32) -> Self {
        self.decoy_hash = decoy_hash(work_factor);
        self
    }

    pub fn tracker(&self) -> &LoginAttemptTracker {
        &self.tracker
    }

    /// Authenticate `username` with `password`.
    ///
    /// Only a failed user lookup is returned as an error; everything else
    /// ends in a [`LoginOutcome`].
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        ip: Option<&str>,
    ) -> AuthResult<LoginOutcome> {
        if self.tracker.is_locked(username).await {
            warn!("Login refused for locked account: {}", username);
            return Ok(self.reject(Rejection::Locked, username, ip, None).await);
        }

        let Some(user) = self.store.find_user_by_username(username).await? else {
            warn!("Login failed, unknown user: {}", username);
            verify_blocking(
                self.hasher.clone(),
                password.to_string(),
                self.decoy_hash.clone(),
            )
            .await;
            return Ok(self
                .reject(Rejection::InvalidCredentials, username, ip, None)
                .await);
        };

        if !user.active {
            warn!("Login refused for disabled account: {}", username);
            return Ok(self
                .reject(Rejection::Disabled, username, ip, Some(user.id))
                .await);
        }

        let verified = verify_blocking(
            self.hasher.clone(),
            password.to_string(),
            user.password_hash.clone(),
        )
        .await;

        if !verified {
            warn!("Login failed, wrong password for: {}", username);
            self.note_failure(
                NewLoginAttempt::new(username, ip)
                    .with_kind(FailureKind::InvalidPassword)
                    .with_user(user.id),
            )
            .await;
            let remaining = self.tracker.remaining_attempts(username).await;
            return Ok(LoginOutcome::Rejected(Rejection::WrongPassword { remaining }));
        }

        if let Err(e) = self.tracker.clear(username).await {
            warn!("Could not clear login attempts for {}: {}", username, e);
        }

        let role = self.role_name(user.role_id).await;
        let landing = AppRole::from_claim(&role)
            .map(|r| r.landing_path())
            .unwrap_or(DEFAULT_LANDING);

        info!("User {} logged in with role {}", username, role);

        Ok(LoginOutcome::Authenticated {
            identity: SessionIdentity {
                subject_id: user.id,
                name: user.username,
                email: user.email,
                role,
            },
            landing,
        })
    }

    async fn reject(
        &self,
        rejection: Rejection,
        username: &str,
        ip: Option<&str>,
        user_id: Option<i32>,
    ) -> LoginOutcome {
        let mut attempt = NewLoginAttempt::new(username, ip).with_kind(rejection.failure_kind());
        if let Some(id) = user_id {
            attempt = attempt.with_user(id);
        }
        self.note_failure(attempt).await;
        LoginOutcome::Rejected(rejection)
    }

    /// The rejection stands even if the attempt cannot be written
    async fn note_failure(&self, attempt: NewLoginAttempt) {
        let username = attempt.username.clone();
        if let Err(e) = self.tracker.record(attempt).await {
            warn!("Could not record failed login for {}: {}", username, e);
        }
    }

    async fn role_name(&self, role_id: i32) -> String {
        match self.store.find_role_by_id(role_id).await {
            Ok(Some(role)) => role.name,
            Ok(None) => NO_ROLE.to_string(),
            Err(e) => {
                warn!("Could not resolve role {}: {}", role_id, e);
                NO_ROLE.to_string()
            }
        }
    }
}
