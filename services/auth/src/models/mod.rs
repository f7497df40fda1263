//! Credential store models

pub mod identity;
pub mod login_attempt;
pub mod role;
pub mod user;

// Re-export for convenience
pub use identity::SessionIdentity;
pub use login_attempt::{FailureKind, LoginAttempt, NewLoginAttempt};
pub use role::Role;
pub use user::{LoginCredentials, NewUser, User};
