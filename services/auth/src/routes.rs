//! Authentication service routes

use axum::{
    Extension, Form, Json, Router,
    extract::{ConnectInfo, Query, State},
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Redirect},
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    AppState,
    error::{AuthError, AuthResult},
    login::LoginOutcome,
    middleware::{LOGIN_PATH, require_session, role_gate, session_layer},
    models::{LoginCredentials, SessionIdentity},
    validation::{MAX_PASSWORD_LEN, MAX_USERNAME_LEN, validate_login},
};

/// Query string of the login page
#[derive(Debug, Deserialize)]
pub struct LoginPageQuery {
    #[serde(rename = "ReturnUrl", alias = "return_url")]
    pub return_url: Option<String>,
}

/// Shape of the login form, for whatever renders it
#[derive(Debug, Serialize)]
pub struct LoginForm {
    pub action: &'static str,
    pub fields: Vec<FormField>,
    pub return_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FormField {
    pub name: &'static str,
    pub kind: &'static str,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

/// Create the router for the authentication service
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(LOGIN_PATH, get(login_page).post(login))
        .route("/account/logout", post(logout))
        .route("/dashboard", get(dashboard))
        .fallback(not_found)
        .layer(from_fn(role_gate))
        .layer(from_fn(require_session))
        .layer(from_fn_with_state(state.clone(), session_layer))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = state.store.health_check().await;
    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(serde_json::json!({
            "status": if database { "ok" } else { "degraded" },
            "service": "internado-auth",
            "database": database,
        })),
    )
}

pub async fn login_page(Query(query): Query<LoginPageQuery>) -> Json<LoginForm> {
    Json(LoginForm {
        action: LOGIN_PATH,
        fields: vec![
            FormField {
                name: "username",
                kind: "text",
                required: true,
                max_length: Some(MAX_USERNAME_LEN),
            },
            FormField {
                name: "password",
                kind: "password",
                required: true,
                max_length: Some(MAX_PASSWORD_LEN),
            },
            FormField {
                name: "remember_me",
                kind: "checkbox",
                required: false,
                max_length: None,
            },
        ],
        return_url: query.return_url.filter(|url| is_local_url(url)),
    })
}

/// User login endpoint
pub async fn login(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    jar: CookieJar,
    Form(credentials): Form<LoginCredentials>,
) -> AuthResult<(CookieJar, Redirect)> {
    validate_login(&credentials).map_err(AuthError::Validation)?;

    let ip = connect_info.map(|ConnectInfo(addr)| addr.ip().to_string());
    info!("Login attempt for user: {}", credentials.username);

    let outcome = state
        .login_service
        .login(&credentials.username, &credentials.password, ip.as_deref())
        .await?;

    match outcome {
        LoginOutcome::Authenticated { identity, landing } => {
            let cookie = state
                .session_issuer
                .issue(&identity, credentials.remember_me)?;

            let target = credentials
                .return_url
                .as_deref()
                .filter(|url| is_local_url(url))
                .unwrap_or(landing);

            Ok((jar.add(cookie), Redirect::to(target)))
        }
        LoginOutcome::Rejected(rejection) => Err(AuthError::Rejected(rejection)),
    }
}

/// End the session and go back to the login page
pub async fn logout(
    State(state): State<AppState>,
    Extension(identity): Extension<SessionIdentity>,
    jar: CookieJar,
) -> (CookieJar, Redirect) {
    info!("User {} logged out", identity.name);
    (jar.add(state.session_issuer.end()), Redirect::to(LOGIN_PATH))
}

pub async fn dashboard(Extension(identity): Extension<SessionIdentity>) -> Json<SessionIdentity> {
    Json(identity)
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Not found" })),
    )
}

/// Only same-site paths are followed after login; `//host` and `/\host`
/// would be read by browsers as another origin.
fn is_local_url(url: &str) -> bool {
    url.starts_with('/') && !url.starts_with("//") && !url.starts_with("/\\")
}
