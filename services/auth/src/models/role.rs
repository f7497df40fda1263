//! Role model and related functionality

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Role entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
}
