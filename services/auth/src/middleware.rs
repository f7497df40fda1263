//! Request pipeline: session cookie, login challenge, role gate

use axum::{
    body::Body,
    extract::State,
    http::{Request, header::SET_COOKIE},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{debug, warn};

use crate::{
    AppState,
    authz::{authorize, is_static_asset},
    error::AuthError,
    models::SessionIdentity,
    session::SESSION_COOKIE,
};

/// Login page the challenge redirects to
pub const LOGIN_PATH: &str = "/account/login";

/// Routes reachable without a session, matched exactly
const PUBLIC_ROUTES: &[&str] = &[LOGIN_PATH, "/health"];

/// Exact match against the anonymous routes, ignoring case and a trailing `/`
fn is_public_route(path: &str) -> bool {
    let path = path.to_lowercase();
    let path = path.strip_suffix('/').unwrap_or(path.as_str());
    PUBLIC_ROUTES.contains(&path)
}

/// True for paths served to anonymous callers
pub fn is_public_path(path: &str) -> bool {
    is_public_route(path) || is_static_asset(&path.to_lowercase())
}

/// Decode the session cookie and attach the identity to the request.
///
/// Bad or expired cookies leave the request anonymous. Sessions past half
/// their lifetime are re-issued on the way out, unless the handler already
/// set or removed the session cookie itself.
pub async fn session_layer(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let claims = jar
        .get(SESSION_COOKIE)
        .and_then(|cookie| match state.session_issuer.decode(cookie.value()) {
            Ok(claims) => Some(claims),
            Err(e) => {
                debug!("Ignoring session cookie: {}", e);
                None
            }
        });

    let Some(claims) = claims else {
        return next.run(req).await;
    };

    req.extensions_mut().insert(claims.identity());
    let response = next.run(req).await;

    if !state.session_issuer.needs_refresh(&claims) || sets_session_cookie(&response) {
        return response;
    }

    match state.session_issuer.refresh(&claims) {
        Ok(cookie) => {
            debug!("Refreshed session for user {}", claims.sub);
            (jar.add(cookie), response).into_response()
        }
        Err(e) => {
            warn!("Could not refresh session for user {}: {}", claims.sub, e);
            response
        }
    }
}

fn sets_session_cookie(response: &Response) -> bool {
    let prefix = format!("{}=", SESSION_COOKIE);
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.starts_with(&prefix))
}

/// Send anonymous callers of protected paths to the login page
pub async fn require_session(req: Request<Body>, next: Next) -> Response {
    if req.extensions().get::<SessionIdentity>().is_some() || is_public_path(req.uri().path()) {
        return next.run(req).await;
    }

    let target = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    debug!("Challenging anonymous request for {}", target);

    Redirect::to(&login_redirect(target)).into_response()
}

/// `/account/login?ReturnUrl=<target>`
pub fn login_redirect(target: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(target.as_bytes()).collect();
    format!("{}?ReturnUrl={}", LOGIN_PATH, encoded)
}

/// Check authenticated requests against the role policy table.
///
/// Only the exact anonymous routes skip the table; static assets go through
/// it and are allowed as common pages.
pub async fn role_gate(req: Request<Body>, next: Next) -> Result<Response, AuthError> {
    let path = req.uri().path();

    if let Some(identity) = req.extensions().get::<SessionIdentity>() {
        if !is_public_route(path) && !authorize(path, &identity.role).is_allowed() {
            warn!(
                "Access denied for {} (role {}) to {}",
                identity.name, identity.role, path
            );
            return Err(AuthError::Forbidden);
        }
    }

    Ok(next.run(req).await)
}
