use anyhow::Result;
use sqlx::migrate::Migrator;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use common::database;
use internado_auth::{
    AppState, bootstrap,
    config::Settings,
    hasher::BcryptHasher,
    repositories::{CredentialStore, PgCredentialStore},
    routes,
    session::SessionIssuer,
};

static MIGRATOR: Migrator = sqlx::migrate!();

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("Starting authentication service");

    let settings = Settings::from_env()?;

    // Initialize database connection pool
    let pool = database::init_pool(&settings.database).await?;

    if database::health_check(&pool).await {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    database::run_migrations(&pool, &MIGRATOR).await?;

    let store: Arc<dyn CredentialStore> = Arc::new(PgCredentialStore::new(pool));
    let hasher = Arc::new(BcryptHasher);

    match settings.admin_password.as_deref() {
        Some(password) => {
            if bootstrap::ensure_admin(
                store.as_ref(),
                hasher.clone(),
                password,
                settings.work_factor,
            )
            .await?
            {
                info!("Bootstrap administrator created");
            }
        }
        None => info!("ADMIN_BOOTSTRAP_PASSWORD not set, skipping admin bootstrap"),
    }

    let session_issuer = SessionIssuer::new(settings.session.clone())?;
    let app_state = AppState::new(store, hasher, session_issuer, settings.work_factor);

    // Keep the scheduler alive for the lifetime of the server
    let _pruner = match settings.prune_schedule.as_deref() {
        Some(schedule) => Some(
            app_state
                .login_service
                .tracker()
                .start_pruning(schedule)
                .await?,
        ),
        None => {
            warn!("Login attempt pruning disabled");
            None
        }
    };

    info!("Authentication service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = TcpListener::bind(settings.listen_addr).await?;
    info!("Authentication service listening on {}", settings.listen_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
