//! Process-wide settings, read once at startup

use anyhow::{Context, Result, bail};
use common::database::DatabaseConfig;
use std::{env, net::SocketAddr};

use crate::hasher::{DEFAULT_WORK_FACTOR, MAX_WORK_FACTOR, MIN_WORK_FACTOR};
use crate::session::SessionConfig;

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";

/// Every thirty minutes, on the minute
pub const DEFAULT_PRUNE_SCHEDULE: &str = "0 */30 * * * *";

#[derive(Debug, Clone)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    /// bcrypt cost for newly hashed passwords
    pub work_factor: u32,
    pub listen_addr: SocketAddr,
    /// Cron expression for attempt pruning; `None` disables the job
    pub prune_schedule: Option<String>,
    /// Password for the `admin` account created on first start
    pub admin_password: Option<String>,
}

impl Settings {
    /// Load settings from environment variables
    ///
    /// # Environment Variables
    /// - `PASSWORD_WORK_FACTOR`: bcrypt cost, 4 to 31 (default: 10)
    /// - `LISTEN_ADDR`: socket address to bind (default: `0.0.0.0:3000`)
    /// - `ATTEMPT_PRUNE_SCHEDULE`: cron expression, empty to disable (default: every 30 minutes)
    /// - `ADMIN_BOOTSTRAP_PASSWORD`: password for the initial admin account (optional)
    ///
    /// plus the variables read by [`DatabaseConfig::from_env`] and
    /// [`SessionConfig::from_env`].
    pub fn from_env() -> Result<Self> {
        let database = DatabaseConfig::from_env()?;
        let session = SessionConfig::from_env()?;

        let work_factor = match env::var("PASSWORD_WORK_FACTOR") {
            Ok(raw) => raw
                .trim()
                .parse::<u32>()
                .with_context(|| format!("PASSWORD_WORK_FACTOR is not a number: {}", raw))?,
            Err(_) => DEFAULT_WORK_FACTOR,
        };
        if !(MIN_WORK_FACTOR..=MAX_WORK_FACTOR).contains(&work_factor) {
            bail!(
                "PASSWORD_WORK_FACTOR must be between {} and {}, got {}",
                MIN_WORK_FACTOR,
                MAX_WORK_FACTOR,
                work_factor
            );
        }

        let listen_addr = env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_string())
            .parse::<SocketAddr>()
            .context("LISTEN_ADDR is not a valid socket address")?;

        let prune_schedule = match env::var("ATTEMPT_PRUNE_SCHEDULE") {
            Ok(s) if s.trim().is_empty() => None,
            Ok(s) => Some(s.trim().to_string()),
            Err(_) => Some(DEFAULT_PRUNE_SCHEDULE.to_string()),
        };

        let admin_password = env::var("ADMIN_BOOTSTRAP_PASSWORD")
            .ok()
            .filter(|p| !p.is_empty());

        Ok(Self {
            database,
            session,
            work_factor,
            listen_addr,
            prune_schedule,
            admin_password,
        })
    }
}
