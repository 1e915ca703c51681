//! The finalize sequence ending every session
//!
//! Five ordered steps, each attempted whatever happened to the previous one:
//!
//! 1. progress push at the current position, flagged as paused
//! 2. short delay
//! 3. stop push at the same position, explicitly not failed
//! 4. short delay
//! 5. direct position / percentage write into the item's user data
//!
//! Some servers only keep a resume point after an explicit pause, others
//! ignore the position carried by the stop event. The order is fixed.

use crate::client::MediaServerClient;
use crate::error::ClientError;
use crate::registry::SessionRegistry;
use crate::session::{SessionHandle, SessionSnapshot};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default pause between two finalize pushes
pub const DEFAULT_STEP_DELAY: Duration = Duration::from_millis(500);

/// The three remote writes of the finalize sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalizeStep {
    PausedProgress,
    Stop,
    UserData,
}

impl fmt::Display for FinalizeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FinalizeStep::PausedProgress => "paused progress",
            FinalizeStep::Stop => "stop",
            FinalizeStep::UserData => "user data",
        };
        f.write_str(name)
    }
}

/// What happened during one finalize sequence
#[derive(Debug, Clone)]
pub struct FinalizeReport {
    /// Position (seconds) sent by every step
    pub position: u64,
    /// Steps that failed, in execution order
    pub step_errors: Vec<(FinalizeStep, ClientError)>,
}

impl FinalizeReport {
    pub fn failed(&self, step: FinalizeStep) -> bool {
        self.step_errors.iter().any(|(s, _)| *s == step)
    }

    /// At least one of the persisting writes (stop or user data) succeeded
    pub fn persisted(&self) -> bool {
        !(self.failed(FinalizeStep::Stop) && self.failed(FinalizeStep::UserData))
    }

    /// One line summary of the failed steps
    pub fn error_summary(&self) -> String {
        self.step_errors
            .iter()
            .map(|(step, err)| format!("{}: {}", step, err))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Run the five steps for `snapshot`
///
/// The snapshot is the one returned by
/// [`SessionHandle::claim_finalize`]; its position is used unchanged for the
/// paused progress, the stop and the user-data write.
pub async fn run_steps(
    client: &dyn MediaServerClient,
    snapshot: &SessionSnapshot,
    step_delay: Duration,
) -> FinalizeReport {
    let mut step_errors = Vec::new();

    debug!(
        server = %snapshot.server,
        session = %snapshot.session_token,
        position = snapshot.position,
        "Finalizing session"
    );

    match client.push_progress(snapshot, true).await {
        Ok(()) => info!(
            server = %snapshot.server,
            "Playback paused at {}",
            format_position(snapshot.position)
        ),
        Err(e) => {
            warn!(server = %snapshot.server, "Paused progress push failed: {}", e);
            step_errors.push((FinalizeStep::PausedProgress, e));
        }
    }

    tokio::time::sleep(step_delay).await;

    match client.push_stop(snapshot).await {
        Ok(()) => info!(server = %snapshot.server, "Playback session ended"),
        Err(e) => {
            warn!(server = %snapshot.server, "Stop push failed: {}", e);
            step_errors.push((FinalizeStep::Stop, e));
        }
    }

    tokio::time::sleep(step_delay).await;

    match client.push_user_data_position(snapshot).await {
        Ok(()) => info!(
            server = %snapshot.server,
            "Resume position saved ({:.1}%)",
            snapshot.played_percentage()
        ),
        Err(e) => {
            warn!(server = %snapshot.server, "User data update failed: {}", e);
            step_errors.push((FinalizeStep::UserData, e));
        }
    }

    FinalizeReport {
        position: snapshot.position,
        step_errors,
    }
}

/// Claim, finalize and deregister a session
///
/// Returns `None` when another party already claimed the session; in that
/// case nothing is sent. Otherwise the session ends `Stopped` or `Failed`
/// and is removed from the registry after the last step.
pub async fn finalize_session(
    client: &dyn MediaServerClient,
    session: &SessionHandle,
    registry: &SessionRegistry,
    step_delay: Duration,
) -> Option<FinalizeReport> {
    let snapshot = session.claim_finalize()?;
    let report = run_steps(client, &snapshot, step_delay).await;

    session.complete_finalize(report.persisted());
    registry.remove(&snapshot.session_token);

    Some(report)
}

/// Format a position in seconds as `m:ss`
pub fn format_position(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
