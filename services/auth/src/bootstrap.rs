//! First-start administrator account

use anyhow::{Context, Result, anyhow};
use std::sync::Arc;
use tracing::info;

use crate::{
    authz::AppRole,
    hasher::{PasswordHasher, hash_blocking},
    models::NewUser,
    repositories::CredentialStore,
    validation::validate_new_password,
};

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_EMAIL: &str = "admin@internado.local";

/// Create the `admin` account unless one already exists.
///
/// Returns `true` when the account was created.
pub async fn ensure_admin(
    store: &dyn CredentialStore,
    hasher: Arc<dyn PasswordHasher>,
    password: &str,
    work_factor: u32,
) -> Result<bool> {
    if store.find_user_by_username(ADMIN_USERNAME).await?.is_some() {
        return Ok(false);
    }

    validate_new_password(password)
        .map_err(|e| anyhow!("ADMIN_BOOTSTRAP_PASSWORD rejected: {}", e))?;

    let role = store
        .find_role_by_name(AppRole::PRIVILEGED.as_str())
        .await?
        .with_context(|| format!("role {} is missing", AppRole::PRIVILEGED))?;

    let password_hash = hash_blocking(hasher, password.to_string(), work_factor).await?;

    store
        .insert_user(&NewUser {
            name: "Administrador del Sistema".to_string(),
            username: ADMIN_USERNAME.to_string(),
            email: ADMIN_EMAIL.to_string(),
            password_hash,
            role_id: role.id,
            active: true,
        })
        .await?;

    info!("Created bootstrap administrator account '{}'", ADMIN_USERNAME);
    Ok(true)
}
