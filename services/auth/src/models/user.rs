//! User model and related functionality

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User entity as seen by the authentication core.
///
/// `password_hash` is always the base64 encoding of the UTF-8 bytes of the
/// textual hash; store adapters convert from whatever the column holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role_id: i32,
    pub active: bool,
    pub registered_at: DateTime<Utc>,
    /// Legacy counter, never written by the login flow
    pub failed_attempts: i32,
    /// Legacy lockout column, never written by the login flow
    pub locked_until: Option<DateTime<Utc>>,
}

/// New user creation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub username: String,
    pub email: String,
    /// Already hashed, in the storage encoding
    pub password_hash: String,
    pub role_id: i32,
    pub active: bool,
}

/// Login form credentials
#[derive(Clone, Deserialize)]
pub struct LoginCredentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, deserialize_with = "deserialize_checkbox")]
    pub remember_me: bool,
    #[serde(default, alias = "ReturnUrl")]
    pub return_url: Option<String>,
}

/// HTML checkboxes post `on`, `true` or nothing at all.
fn deserialize_checkbox<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(matches!(
        value.as_deref().map(str::to_ascii_lowercase).as_deref(),
        Some("on" | "true" | "1" | "yes")
    ))
}

impl std::fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("remember_me", &self.remember_me)
            .field("return_url", &self.return_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_hides_password() {
        let credentials = LoginCredentials {
            username: "jdoe".to_string(),
            password: "Secreto#2024".to_string(),
            remember_me: false,
            return_url: None,
        };

        let printed = format!("{:?}", credentials);
        assert!(printed.contains("jdoe"));
        assert!(!printed.contains("Secreto#2024"));
    }

    #[test]
    fn test_checkbox_values() {
        let checked: LoginCredentials =
            serde_json::from_str(r#"{"username":"a","password":"b","remember_me":"on"}"#).unwrap();
        assert!(checked.remember_me);

        let unchecked: LoginCredentials =
            serde_json::from_str(r#"{"username":"a","password":"b"}"#).unwrap();
        assert!(!unchecked.remember_me);
    }
}
