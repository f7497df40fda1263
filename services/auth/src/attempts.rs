//! Failed login tracking and derived account lockout
//!
//! Lockout is never stored: an account is locked while the number of failed
//! attempts recorded for its username in the last [`LOCKOUT_WINDOW_MINUTES`]
//! reaches [`MAX_LOGIN_ATTEMPTS`]. Check and insert are not coordinated, so
//! two concurrent failures may both slip past the check. That is accepted;
//! the count is re-derived on every call.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use common::DatabaseResult;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, error, info, warn};

use crate::models::NewLoginAttempt;
use crate::repositories::CredentialStore;

/// Failed attempts that lock an account
pub const MAX_LOGIN_ATTEMPTS: u32 = 5;

/// Lookback used when counting failed attempts
pub const LOCKOUT_WINDOW_MINUTES: i64 = 15;

/// Tracks failed logins per username against the attempt log
#[derive(Clone)]
pub struct LoginAttemptTracker {
    store: Arc<dyn CredentialStore>,
}

impl LoginAttemptTracker {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    fn window_start(now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::minutes(LOCKOUT_WINDOW_MINUTES)
    }

    /// Append a failed attempt with the default classification
    pub async fn record_failure(&self, username: &str, ip: Option<&str>) -> DatabaseResult<()> {
        self.record(NewLoginAttempt::new(username, ip)).await
    }

    /// Append a fully described failed attempt.
    ///
    /// Errors are handed back so the caller can log them; they must not
    /// change an already decided rejection.
    pub async fn record(&self, attempt: NewLoginAttempt) -> DatabaseResult<()> {
        debug!(
            "Recording failed login for {} ({})",
            attempt.username, attempt.kind
        );
        self.store.insert_login_attempt(&attempt).await
    }

    /// Failed attempts inside the current window.
    ///
    /// Fails open: when the store cannot be queried the count is zero. This
    /// keeps logins possible during store trouble at the cost of disabling
    /// throttling for that period.
    pub async fn recent_failure_count(&self, username: &str) -> u32 {
        let since = Self::window_start(Utc::now());
        match self.store.count_login_attempts(username, since).await {
            Ok(count) => count,
            Err(e) => {
                warn!(
                    "Could not count login attempts for {}, treating as zero: {}",
                    username, e
                );
                0
            }
        }
    }

    pub async fn is_locked(&self, username: &str) -> bool {
        self.recent_failure_count(username).await >= MAX_LOGIN_ATTEMPTS
    }

    /// Attempts left before lockout, saturating at zero
    pub async fn remaining_attempts(&self, username: &str) -> u32 {
        MAX_LOGIN_ATTEMPTS.saturating_sub(self.recent_failure_count(username).await)
    }

    /// Forget every attempt for `username`. Safe to repeat.
    pub async fn clear(&self, username: &str) -> DatabaseResult<u64> {
        let removed = self.store.delete_login_attempts(username).await?;
        if removed > 0 {
            debug!("Cleared {} failed login(s) for {}", removed, username);
        }
        Ok(removed)
    }

    /// Drop attempts that can no longer influence a lockout
    pub async fn prune_expired(&self) -> DatabaseResult<u64> {
        let removed = self
            .store
            .delete_login_attempts_before(Self::window_start(Utc::now()))
            .await?;
        info!("Pruned {} expired login attempt(s)", removed);
        Ok(removed)
    }

    /// Schedule [`prune_expired`](Self::prune_expired) on a cron expression.
    ///
    /// The returned scheduler must be kept alive for the job to keep firing.
    pub async fn start_pruning(&self, schedule: &str) -> Result<JobScheduler> {
        let tracker = self.clone();

        let scheduler = JobScheduler::new().await?;

        let job = Job::new_async(schedule, move |_, _| {
            let tracker = tracker.clone();
            Box::pin(async move {
                if let Err(e) = tracker.prune_expired().await {
                    error!("Failed to prune login attempts: {}", e);
                }
            })
        })?;

        scheduler.add(job).await?;
        scheduler.start().await?;

        info!("Started login attempt pruning with schedule: {}", schedule);
        Ok(scheduler)
    }
}
