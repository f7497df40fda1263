//! End-to-end tests of the HTTP surface against the in-memory store

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use std::sync::Arc;
use tower::ServiceExt;

use internado_auth::{
    AppState,
    authz::DENIED_MESSAGE,
    hasher::{BcryptHasher, PasswordHasher},
    login::Rejection,
    models::NewUser,
    repositories::{CredentialStore, MemoryCredentialStore},
    routes::create_router,
    session::{SESSION_COOKIE, SessionClaims, SessionConfig, SessionIssuer},
};

const SECRET: &str = "integration-secret-0123456789abcdef";
const PASSWORD: &str = "Secret123";

struct TestApp {
    store: MemoryCredentialStore,
    router: Router,
}

impl TestApp {
    async fn new() -> Self {
        let store = MemoryCredentialStore::with_default_roles();
        for (username, role_id) in [("docente", 2), ("direccion", 4), ("admin", 1)] {
            store
                .insert_user(&NewUser {
                    name: username.to_string(),
                    username: username.to_string(),
                    email: format!("{}@internado.local", username),
                    password_hash: BcryptHasher.hash(PASSWORD, 4).unwrap(),
                    role_id,
                    active: true,
                })
                .await
                .unwrap();
        }

        let issuer = SessionIssuer::new(SessionConfig {
            secret: SECRET.to_string(),
            expire_minutes: 30,
            secure_cookie: false,
        })
        .unwrap();

        let state = AppState::new(
            Arc::new(store.clone()),
            Arc::new(BcryptHasher),
            issuer,
            4,
        );

        Self {
            store,
            router: create_router(state),
        }
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn post_login(&self, form: &str) -> Response {
        self.send(
            Request::post("/account/login")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form.to_string()))
                .unwrap(),
        )
        .await
    }

    /// Log in and return the `name=value` pair of the session cookie
    async fn session_for(&self, username: &str) -> String {
        let response = self
            .post_login(&format!("username={}&password={}", username, PASSWORD))
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        session_cookie(&response).expect("login should set a session cookie")
    }

    async fn get(&self, path: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::get(path);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }
}

fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{}=", SESSION_COOKIE)))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

#[tokio::test]
async fn test_login_redirects_to_role_landing_with_cookie() {
    let app = TestApp::new().await;

    let response = app
        .post_login(&format!("username=docente&password={}", PASSWORD))
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/calificaciones");

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
    assert!(!set_cookie.contains("Max-Age"));
}

#[tokio::test]
async fn test_remember_me_sets_max_age() {
    let app = TestApp::new().await;

    let response = app
        .post_login(&format!(
            "username=docente&password={}&remember_me=on",
            PASSWORD
        ))
        .await;

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert!(set_cookie.contains("Max-Age=1800"));
}

#[tokio::test]
async fn test_local_return_url_is_followed() {
    let app = TestApp::new().await;

    let response = app
        .post_login(&format!(
            "username=direccion&password={}&ReturnUrl=%2Freportes%2Fmensual",
            PASSWORD
        ))
        .await;
    assert_eq!(location(&response), "/reportes/mensual");

    let response = app
        .post_login(&format!(
            "username=direccion&password={}&return_url=%2F%2Fevil.example",
            PASSWORD
        ))
        .await;
    assert_eq!(location(&response), "/dashboard");
}

#[tokio::test]
async fn test_dashboard_returns_session_identity() {
    let app = TestApp::new().await;
    let cookie = app.session_for("docente").await;

    let response = app.get("/dashboard", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let identity = body_json(response).await;
    assert_eq!(identity["name"], "docente");
    assert_eq!(identity["email"], "docente@internado.local");
    assert_eq!(identity["role"], "Docente");
}

#[tokio::test]
async fn test_wrong_password_reports_remaining_attempts() {
    let app = TestApp::new().await;

    let response = app.post_login("username=docente&password=wrong").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(response).await;
    assert_eq!(
        body["error"],
        Rejection::WrongPassword { remaining: 4 }.message()
    );
}

#[tokio::test]
async fn test_lockout_after_five_failures() {
    let app = TestApp::new().await;

    for _ in 0..5 {
        let response = app.post_login("username=docente&password=wrong").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let response = app
        .post_login(&format!("username=docente&password={}", PASSWORD))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(session_cookie(&response).is_none());
    assert_eq!(body_json(response).await["error"], Rejection::Locked.message());

    // Another user is unaffected
    let response = app
        .post_login(&format!("username=direccion&password={}", PASSWORD))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_unknown_user_is_generic_rejection() {
    let app = TestApp::new().await;

    let response = app.post_login("username=nadie&password=whatever").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await["error"],
        Rejection::InvalidCredentials.message()
    );

    let attempts = app.store.attempts().await;
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].username, "nadie");
}

#[tokio::test]
async fn test_invalid_form_is_bad_request() {
    let app = TestApp::new().await;

    let response = app.post_login("username=&password=x").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.post_login("username=j%20doe&password=x").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert!(app.store.attempts().await.is_empty());
}

#[tokio::test]
async fn test_anonymous_request_is_challenged() {
    let app = TestApp::new().await;

    let response = app.get("/reportes?mes=3", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        "/account/login?ReturnUrl=%2Freportes%3Fmes%3D3"
    );
}

#[tokio::test]
async fn test_tampered_cookie_is_anonymous() {
    let app = TestApp::new().await;
    let cookie = app.session_for("admin").await;
    let tampered = format!("{}x", cookie);

    let response = app.get("/dashboard", Some(&tampered)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).starts_with("/account/login"));
}

#[tokio::test]
async fn test_role_gate() {
    let app = TestApp::new().await;

    let docente = app.session_for("docente").await;
    let response = app.get("/reportes", Some(&docente)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_text(response).await, DENIED_MESSAGE);

    // Allowed through the gate, but nothing serves the path here
    let direccion = app.session_for("direccion").await;
    let response = app.get("/reportes", Some(&direccion)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let admin = app.session_for("admin").await;
    let response = app.get("/usuarios", Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_paths_extending_public_routes_are_protected() {
    let app = TestApp::new().await;

    for path in ["/healthrecords/export", "/account/loginhistory", "/cssfoo"] {
        let response = app.get(path, None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{}", path);
        assert!(location(&response).starts_with("/account/login?ReturnUrl="));
    }

    let docente = app.session_for("docente").await;
    for path in ["/healthrecords/export", "/account/loginhistory"] {
        let response = app.get(path, Some(&docente)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{}", path);
    }

    // Real assets and the login page stay reachable for a signed-in user
    let response = app.get("/css/site.css", Some(&docente)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = app.get("/account/login", Some(&docente)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_logout_removes_cookie() {
    let app = TestApp::new().await;
    let cookie = app.session_for("docente").await;

    let response = app
        .send(
            Request::post("/account/logout")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/account/login");

    let removal = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert!(removal.starts_with(&format!("{}=;", SESSION_COOKIE)));
    assert!(removal.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_aging_session_is_reissued() {
    let app = TestApp::new().await;

    let now = Utc::now().timestamp();
    let claims = SessionClaims {
        sub: 1,
        name: "docente".to_string(),
        email: "docente@internado.local".to_string(),
        role: "Docente".to_string(),
        iat: now - 20 * 60,
        exp: now + 10 * 60,
        persistent: false,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();
    let cookie = format!("{}={}", SESSION_COOKIE, token);

    let response = app.get("/dashboard", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let refreshed = session_cookie(&response).expect("session should be re-issued");
    assert_ne!(refreshed, cookie);

    // A fresh session is left alone
    let fresh = app.session_for("docente").await;
    let response = app.get("/dashboard", Some(&fresh)).await;
    assert!(session_cookie(&response).is_none());
}

#[tokio::test]
async fn test_store_outage() {
    let app = TestApp::new().await;
    app.store.set_unavailable(true);

    let response = app
        .post_login(&format!("username=docente&password={}", PASSWORD))
        .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = app.get("/health", None).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["database"], false);
}

#[tokio::test]
async fn test_health_and_login_page_are_public() {
    let app = TestApp::new().await;

    let response = app.get("/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");

    let response = app.get("/account/login?ReturnUrl=%2Fmedico", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let form = body_json(response).await;
    assert_eq!(form["return_url"], "/medico");
    assert_eq!(form["fields"][0]["name"], "username");
}
