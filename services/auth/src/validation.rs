//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

use crate::models::LoginCredentials;

/// Column width of `users.username`
pub const MAX_USERNAME_LEN: usize = 60;

pub const MAX_PASSWORD_LEN: usize = 128;

/// Validate a submitted login form.
///
/// Only shape is checked here; whether the username exists is the login
/// flow's business.
pub fn validate_login(credentials: &LoginCredentials) -> Result<(), String> {
    validate_login_username(&credentials.username)?;

    if credentials.password.is_empty() {
        return Err("Password is required".to_string());
    }

    if credentials.password.len() > MAX_PASSWORD_LEN {
        return Err(format!(
            "Password must be at most {} characters long",
            MAX_PASSWORD_LEN
        ));
    }

    Ok(())
}

/// Validate a username as typed on the login form
pub fn validate_login_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }

    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(format!(
            "Username must be at most {} characters long",
            MAX_USERNAME_LEN
        ));
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX
        .get_or_init(|| Regex::new(r"^[^\s\p{Cc}]+$").expect("Failed to compile username regex"));

    if !regex.is_match(username) {
        return Err("Username cannot contain spaces or control characters".to_string());
    }

    Ok(())
}

/// Strength rules for passwords chosen by operators (e.g. the bootstrap admin)
pub fn validate_new_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    if password.len() < 8 {
        return Err("Password must be at least 8 characters long".to_string());
    }

    if password.len() > MAX_PASSWORD_LEN {
        return Err(format!(
            "Password must be at most {} characters long",
            MAX_PASSWORD_LEN
        ));
    }

    let mut has_upper = false;
    let mut has_lower = false;
    let mut has_digit = false;

    for c in password.chars() {
        if c.is_uppercase() {
            has_upper = true;
        } else if c.is_lowercase() {
            has_lower = true;
        } else if c.is_ascii_digit() {
            has_digit = true;
        }
    }

    if !has_upper {
        return Err("Password must contain at least one uppercase letter".to_string());
    }

    if !has_lower {
        return Err("Password must contain at least one lowercase letter".to_string());
    }

    if !has_digit {
        return Err("Password must contain at least one digit".to_string());
    }

    Ok(())
}
