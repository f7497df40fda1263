//! Failed login attempt log entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Why a login attempt was rejected
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    #[default]
    InvalidCredentials,
    AccountLocked,
    UnknownUser,
    AccountDisabled,
    InvalidPassword,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::InvalidCredentials => "InvalidCredentials",
            FailureKind::AccountLocked => "AccountLocked",
            FailureKind::UnknownUser => "UnknownUser",
            FailureKind::AccountDisabled => "AccountDisabled",
            FailureKind::InvalidPassword => "InvalidPassword",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted failed login attempt. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LoginAttempt {
    pub id: i64,
    pub username: String,
    pub ip_address: Option<String>,
    pub error_kind: String,
    pub attempted_at: DateTime<Utc>,
    pub user_id: Option<i32>,
}

/// Failed attempt about to be appended to the log
#[derive(Debug, Clone)]
pub struct NewLoginAttempt {
    pub username: String,
    pub ip_address: Option<String>,
    pub kind: FailureKind,
    pub attempted_at: DateTime<Utc>,
    pub user_id: Option<i32>,
}

impl NewLoginAttempt {
    /// Attempt stamped with the current UTC time and the default classification
    pub fn new(username: impl Into<String>, ip_address: Option<&str>) -> Self {
        Self {
            username: username.into(),
            ip_address: ip_address.map(str::to_owned),
            kind: FailureKind::default(),
            attempted_at: Utc::now(),
            user_id: None,
        }
    }

    pub fn with_kind(mut self, kind: FailureKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_user(mut self, user_id: i32) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn at(mut self, attempted_at: DateTime<Utc>) -> Self {
        self.attempted_at = attempted_at;
        self
    }
}
