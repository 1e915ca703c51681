//! Shutdown signal and interrupt coordinator
//!
//! The signal is a write-once flag: raising it twice is harmless and it is
//! never lowered. Drivers poll it during their tick wait; the coordinator
//! reacts to it by finalizing every registered session on its own, without
//! waiting for the drivers' tick loops. Sessions whose driver is already
//! finalizing are only awaited.

use crate::finalize::{finalize_session, DEFAULT_STEP_DELAY};
use crate::registry::SessionRegistry;
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Process wide shutdown request, shared by cloning
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    token: CancellationToken,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal; idempotent
    pub fn raise(&self) {
        self.token.cancel();
    }

    pub fn is_raised(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the signal has been raised
    pub async fn raised(&self) {
        self.token.cancelled().await
    }
}

/// Counters of one graceful shutdown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ShutdownSummary {
    /// Sessions found in the registry when the signal was handled
    pub attempted: usize,
    /// Sessions whose progress reached the server
    pub persisted: usize,
    /// Sessions where every persisting write failed
    pub failed: usize,
    /// Sessions already being finalized by their own driver
    pub skipped: usize,
}

impl ShutdownSummary {
    /// Add the counters of a later pass
    pub fn merge(&mut self, other: ShutdownSummary) {
        self.attempted += other.attempted;
        self.persisted += other.persisted;
        self.failed += other.failed;
        self.skipped += other.skipped;
    }
}

/// Turns the shutdown signal into a graceful shutdown of every session
#[derive(Debug, Clone)]
pub struct InterruptCoordinator {
    signal: ShutdownSignal,
    registry: Arc<SessionRegistry>,
    step_delay: Duration,
}

impl InterruptCoordinator {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self::with_signal(ShutdownSignal::new(), registry)
    }

    pub fn with_signal(signal: ShutdownSignal, registry: Arc<SessionRegistry>) -> Self {
        Self {
            signal,
            registry,
            step_delay: DEFAULT_STEP_DELAY,
        }
    }

    /// Pause between two finalize pushes
    pub fn with_step_delay(mut self, step_delay: Duration) -> Self {
        self.step_delay = step_delay;
        self
    }

    pub fn signal(&self) -> ShutdownSignal {
        self.signal.clone()
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Raise the signal on Ctrl+C
    ///
    /// The listener task only flips the signal; the shutdown work itself is
    /// done by whoever awaits [`ShutdownSignal::raised`].
    pub fn install_ctrl_c(&self) -> JoinHandle<()> {
        let signal = self.signal.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Interrupt received, saving playback progress...");
                    signal.raise();
                }
                Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
            }
        })
    }

    /// Finalize every registered session concurrently
    ///
    /// Each session runs in its own task so a failing or panicking finalize
    /// never holds back the others. Failures are only logged. A session
    /// whose driver already claimed the finalize is not sent anything, but
    /// this still returns only once that session is terminal.
    pub async fn graceful_shutdown(&self) -> ShutdownSummary {
        let sessions = self.registry.snapshot();
        let mut summary = ShutdownSummary {
            attempted: sessions.len(),
            ..Default::default()
        };

        if sessions.is_empty() {
            return summary;
        }

        info!("Saving progress of {} active session(s)", sessions.len());

        let tasks = sessions.into_iter().map(|entry| {
            let registry = self.registry.clone();
            let step_delay = self.step_delay;
            tokio::spawn(async move {
                let report = finalize_session(
                    entry.client.as_ref(),
                    &entry.session,
                    &registry,
                    step_delay,
                )
                .await;
                if report.is_none() {
                    let state = entry.session.wait_terminal().await;
                    debug!(
                        server = %entry.session.server(),
                        "Session finalized by its driver: {:?}",
                        state
                    );
                }
                report
            })
        });

        for result in join_all(tasks).await {
            match result {
                Ok(Some(report)) if report.persisted() => summary.persisted += 1,
                Ok(Some(report)) => {
                    warn!("Progress could not be saved: {}", report.error_summary());
                    summary.failed += 1;
                }
                Ok(None) => summary.skipped += 1,
                Err(e) => {
                    warn!("Finalize task aborted: {}", e);
                    summary.failed += 1;
                }
            }
        }

        info!(
            persisted = summary.persisted,
            failed = summary.failed,
            skipped = summary.skipped,
            "Playback progress saved"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_is_sticky_and_idempotent() {
        let signal = ShutdownSignal::new();
        let observer = signal.clone();
        assert!(!observer.is_raised());

        signal.raise();
        signal.raise();
        assert!(observer.is_raised());
    }

    #[tokio::test]
    async fn test_raised_resolves_after_raise() {
        let signal = ShutdownSignal::new();
        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move { signal.raised().await })
        };
        signal.raise();
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_graceful_shutdown_with_empty_registry() {
        let coordinator = InterruptCoordinator::new(Arc::new(SessionRegistry::new()));
        let summary = coordinator.graceful_shutdown().await;
        assert_eq!(summary, ShutdownSummary::default());
    }
}
