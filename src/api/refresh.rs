//! The account-refresh polling protocol.
//!
//! Triggering a refresh starts an asynchronous job on the backend with no
//! completion callback; the only observable is the user-status endpoint's
//! `isRefreshing` flag. The poller is therefore an explicit
//! states-and-transitions loop with a bounded deadline: trigger, then poll
//! at a fixed interval until the flag clears or the deadline passes.
//! Hitting the deadline is a terminal non-success outcome, not an error -
//! partial progress is valid and reported.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use crate::api::client::MintClient;
use crate::api::ApiError;

/// Default seconds between status polls.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Default overall deadline for a refresh wait.
const DEFAULT_DEADLINE_SECS: u64 = 60;

/// Lifecycle of one refresh job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshJobStatus {
    NotStarted,
    InProgress,
    Complete,
    TimedOut,
}

/// Pacing for [`MintClient::refresh_accounts`].
#[derive(Debug, Clone)]
pub struct RefreshOptions {
    pub poll_interval: Duration,
    /// Upper bound on the whole wait, measured from the trigger.
    pub deadline: Duration,
}

impl Default for RefreshOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            deadline: Duration::from_secs(DEFAULT_DEADLINE_SECS),
        }
    }
}

/// One observation of the user-status endpoint. Besides the global flag
/// the backend includes assorted per-account detail; it is kept verbatim
/// so a timed-out caller can still report partial progress.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshStatus {
    #[serde(rename = "isRefreshing")]
    pub is_refreshing: bool,
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

/// Terminal report of a refresh wait.
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub status: RefreshJobStatus,
    /// The last status observation, present whenever at least one poll
    /// answered.
    pub last_status: Option<RefreshStatus>,
    pub polls: u32,
    pub elapsed: Duration,
}

impl RefreshOutcome {
    pub fn completed(&self) -> bool {
        self.status == RefreshJobStatus::Complete
    }
}

/// Poll until the backend reports the refresh finished or the deadline
/// elapses. The trigger has already been issued; at least one poll always
/// follows it, so even a zero deadline observes the job once.
pub(crate) async fn poll_until_refreshed(
    client: &MintClient,
    options: &RefreshOptions,
) -> Result<RefreshOutcome, ApiError> {
    let started = tokio::time::Instant::now();
    let mut job = RefreshJobStatus::InProgress;
    let mut polls = 0u32;
    let mut last_status = None;

    while job == RefreshJobStatus::InProgress {
        tokio::time::sleep(options.poll_interval).await;
        let status = client.fetch_refresh_status().await?;
        polls += 1;
        debug!(polls, is_refreshing = status.is_refreshing, "Refresh poll");

        if !status.is_refreshing {
            job = RefreshJobStatus::Complete;
        } else if started.elapsed() >= options.deadline {
            job = RefreshJobStatus::TimedOut;
        }
        last_status = Some(status);
    }

    let elapsed = started.elapsed();
    info!(status = ?job, polls, ?elapsed, "Account refresh wait finished");
    Ok(RefreshOutcome {
        status: job,
        last_status,
        polls,
        elapsed,
    })
}
