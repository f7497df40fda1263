//! Authentication and authorization core for the Internado web application
//!
//! Username/password login against a relational credential store, derived
//! account lockout, cookie sessions with sliding expiry, and a path based
//! role gate in front of every authenticated request.

pub mod attempts;
pub mod authz;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod hasher;
pub mod login;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod session;
pub mod validation;

use std::sync::Arc;

use crate::{
    attempts::LoginAttemptTracker, hasher::PasswordHasher, login::LoginService,
    repositories::CredentialStore, session::SessionIssuer,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CredentialStore>,
    pub login_service: LoginService,
    pub session_issuer: SessionIssuer,
}

impl AppState {
    /// Wire the login flow and session issuer over one credential store
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: Arc<dyn PasswordHasher>,
        session_issuer: SessionIssuer,
        work_factor: u32,
    ) -> Self {
        let tracker = LoginAttemptTracker::new(store.clone());
        let login_service =
            LoginService::new(store.clone(), hasher, tracker).with_work_factor(work_factor);

        Self {
            store,
            login_service,
            session_issuer,
        }
    }
}
