//! Identity carried by an authenticated session

use serde::{Deserialize, Serialize};

/// Role name used when the user's role reference cannot be resolved
pub const NO_ROLE: &str = "No Role";

/// Session identity, built at login and attached to every later request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub subject_id: i32,
    pub name: String,
    pub email: String,
    pub role: String,
}
