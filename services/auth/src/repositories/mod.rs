//! Credential store abstraction and its adapters
//!
//! The authentication core only talks to [`CredentialStore`]. Each adapter
//! maps its own schema onto the canonical [`User`] shape so that field name
//! or column type differences never leak past this module.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::DatabaseResult;

use crate::models::{NewLoginAttempt, NewUser, Role, User};

pub use memory::MemoryCredentialStore;
pub use postgres::PgCredentialStore;

/// Persistence operations consumed by the login and lockout flow.
///
/// All operations are request scoped; single statements are atomic and no
/// multi-statement transaction is required.
#[async_trait]
pub trait CredentialStore: Send + Sync + 'static {
    /// Exact, case-sensitive username match
    async fn find_user_by_username(&self, username: &str) -> DatabaseResult<Option<User>>;

    /// Append one failed attempt to the log
    async fn insert_login_attempt(&self, attempt: &NewLoginAttempt) -> DatabaseResult<()>;

    /// Number of attempts for `username` at or after `since`
    async fn count_login_attempts(&self, username: &str, since: DateTime<Utc>)
    -> DatabaseResult<u32>;

    /// Remove every attempt for `username`, returning how many were deleted
    async fn delete_login_attempts(&self, username: &str) -> DatabaseResult<u64>;

    /// Remove every attempt strictly older than `before`
    async fn delete_login_attempts_before(&self, before: DateTime<Utc>) -> DatabaseResult<u64>;

    async fn find_role_by_id(&self, id: i32) -> DatabaseResult<Option<Role>>;

    async fn find_role_by_name(&self, name: &str) -> DatabaseResult<Option<Role>>;

    async fn insert_user(&self, new_user: &NewUser) -> DatabaseResult<User>;

    /// Whether the store currently answers queries
    async fn health_check(&self) -> bool;
}
