//! In-memory credential store for local development and tests

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{DatabaseError, DatabaseResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use super::CredentialStore;
use crate::models::{LoginAttempt, NewLoginAttempt, NewUser, Role, User};

#[derive(Debug, Default)]
struct Tables {
    roles: Vec<Role>,
    users: Vec<User>,
    attempts: Vec<LoginAttempt>,
    next_user_id: i32,
    next_attempt_id: i64,
}

/// Credential store kept entirely in process memory.
///
/// Mirrors the constraints of the SQL schema (unique username and email,
/// role references must exist, `ON DELETE SET NULL` on attempts).
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    tables: Arc<Mutex<Tables>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with the four application roles
    pub fn with_default_roles() -> Self {
        let roles = [
            (1, "Administrador", "Acceso total al sistema"),
            (2, "Docente", "Calificaciones y asistencia"),
            (3, "Medico", "Expedientes medicos y medicamentos"),
            (4, "Direccion", "Residentes, habitaciones y reportes"),
        ]
        .into_iter()
        .map(|(id, name, description)| Role {
            id,
            name: name.to_string(),
            description: Some(description.to_string()),
        })
        .collect();

        Self {
            tables: Arc::new(Mutex::new(Tables {
                roles,
                ..Tables::default()
            })),
            unavailable: Arc::default(),
        }
    }

    /// Simulate the store going away; every call fails while set
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Snapshot of the attempt log, oldest first
    pub async fn attempts(&self) -> Vec<LoginAttempt> {
        self.tables.lock().await.attempts.clone()
    }

    /// Remove a user; their attempts keep the username but lose the back-reference
    pub async fn delete_user(&self, id: i32) -> bool {
        let mut tables = self.tables.lock().await;
        let before = tables.users.len();
        tables.users.retain(|u| u.id != id);

        for attempt in tables.attempts.iter_mut().filter(|a| a.user_id == Some(id)) {
            attempt.user_id = None;
        }

        tables.users.len() != before
    }

    fn check_available(&self) -> DatabaseResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DatabaseError::Unavailable(
                "in-memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_user_by_username(&self, username: &str) -> DatabaseResult<Option<User>> {
        self.check_available()?;
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.username == username).cloned())
    }

    async fn insert_login_attempt(&self, attempt: &NewLoginAttempt) -> DatabaseResult<()> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;
        tables.next_attempt_id += 1;
        let id = tables.next_attempt_id;

        tables.attempts.push(LoginAttempt {
            id,
            username: attempt.username.clone(),
            ip_address: attempt.ip_address.clone(),
            error_kind: attempt.kind.as_str().to_string(),
            attempted_at: attempt.attempted_at,
            user_id: attempt.user_id,
        });

        Ok(())
    }

    async fn count_login_attempts(
        &self,
        username: &str,
        since: DateTime<Utc>,
    ) -> DatabaseResult<u32> {
        self.check_available()?;
        let tables = self.tables.lock().await;
        let count = tables
            .attempts
            .iter()
            .filter(|a| a.username == username && a.attempted_at >= since)
            .count();

        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn delete_login_attempts(&self, username: &str) -> DatabaseResult<u64> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;
        let before = tables.attempts.len();
        tables.attempts.retain(|a| a.username != username);
        Ok((before - tables.attempts.len()) as u64)
    }

    async fn delete_login_attempts_before(&self, before: DateTime<Utc>) -> DatabaseResult<u64> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;
        let len = tables.attempts.len();
        tables.attempts.retain(|a| a.attempted_at >= before);
        Ok((len - tables.attempts.len()) as u64)
    }

    async fn find_role_by_id(&self, id: i32) -> DatabaseResult<Option<Role>> {
        self.check_available()?;
        let tables = self.tables.lock().await;
        Ok(tables.roles.iter().find(|r| r.id == id).cloned())
    }

    async fn find_role_by_name(&self, name: &str) -> DatabaseResult<Option<Role>> {
        self.check_available()?;
        let tables = self.tables.lock().await;
        Ok(tables.roles.iter().find(|r| r.name == name).cloned())
    }

    async fn insert_user(&self, new_user: &NewUser) -> DatabaseResult<User> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;

        if tables
            .users
            .iter()
            .any(|u| u.username == new_user.username || u.email == new_user.email)
        {
            return Err(DatabaseError::Configuration(format!(
                "duplicate username or email for {}",
                new_user.username
            )));
        }

        if !tables.roles.iter().any(|r| r.id == new_user.role_id) {
            return Err(DatabaseError::Configuration(format!(
                "unknown role id {}",
                new_user.role_id
            )));
        }

        tables.next_user_id += 1;
        let user = User {
            id: tables.next_user_id,
            name: new_user.name.clone(),
            username: new_user.username.clone(),
            email: new_user.email.clone(),
            password_hash: new_user.password_hash.clone(),
            role_id: new_user.role_id,
            active: new_user.active,
            registered_at: Utc::now(),
            failed_attempts: 0,
            locked_until: None,
        };
        tables.users.push(user.clone());

        Ok(user)
    }

    async fn health_check(&self) -> bool {
        self.check_available().is_ok()
    }
}
