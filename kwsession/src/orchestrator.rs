//! Orchestrator: one driver per configured server, run concurrently

use crate::client::{ClientFactory, ServerIdentity};
use crate::driver::{Outcome, PlaybackSettings, SessionDriver};
use crate::error::SessionError;
use crate::registry::SessionRegistry;
use crate::shutdown::{InterruptCoordinator, ShutdownSignal, ShutdownSummary};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinError;
use tracing::{info, warn};

/// Outcome of one configured server
#[derive(Debug, Clone, Serialize)]
pub struct ReportEntry {
    pub identity: ServerIdentity,
    pub outcome: Outcome,
}

/// Aggregate result of a run, one entry per identity in configuration order
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub entries: Vec<ReportEntry>,
    /// Present when the run was ended by the shutdown signal
    pub shutdown: Option<ShutdownSummary>,
}

impl RunReport {
    pub fn total(&self) -> usize {
        self.entries.len()
    }

    pub fn success_count(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_success()).count()
    }

    /// Failed identities with their reason
    pub fn failures(&self) -> impl Iterator<Item = (&ServerIdentity, &SessionError)> {
        self.entries
            .iter()
            .filter_map(|e| e.outcome.error().map(|err| (&e.identity, err)))
    }

    pub fn was_interrupted(&self) -> bool {
        self.shutdown.is_some()
    }
}

/// Spawns and supervises the session drivers
pub struct Orchestrator {
    factory: Arc<dyn ClientFactory>,
    registry: Arc<SessionRegistry>,
    coordinator: InterruptCoordinator,
    settings: PlaybackSettings,
}

impl Orchestrator {
    pub fn new(factory: Arc<dyn ClientFactory>, settings: PlaybackSettings) -> Self {
        Self::with_signal(factory, settings, ShutdownSignal::new())
    }

    /// Use an existing shutdown signal (e.g. one already wired to Ctrl+C)
    pub fn with_signal(
        factory: Arc<dyn ClientFactory>,
        settings: PlaybackSettings,
        signal: ShutdownSignal,
    ) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        let coordinator = InterruptCoordinator::with_signal(signal, registry.clone())
            .with_step_delay(settings.finalize_step_delay);
        Self {
            factory,
            registry,
            coordinator,
            settings,
        }
    }

    pub fn signal(&self) -> ShutdownSignal {
        self.coordinator.signal()
    }

    pub fn coordinator(&self) -> &InterruptCoordinator {
        &self.coordinator
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Run one driver per identity until they all finish, or until the
    /// shutdown signal has been handled
    ///
    /// The report always holds exactly one entry per identity.
    pub async fn run(&self, identities: Vec<ServerIdentity>) -> RunReport {
        let signal = self.signal();
        let mut outcomes: Vec<Option<Outcome>> = vec![None; identities.len()];
        let mut slots = Vec::new();
        let mut handles = Vec::new();

        info!("Starting playback on {} server(s)", identities.len());

        for (index, identity) in identities.iter().enumerate() {
            let client = match self.factory.connect(identity) {
                Ok(client) => client,
                Err(e) => {
                    warn!(server = %identity.name, "Cannot create client: {}", e);
                    outcomes[index] = Some(Outcome::Failed(SessionError::Client(e.to_string())));
                    continue;
                }
            };

            let driver = SessionDriver::new(
                client,
                self.registry.clone(),
                signal.clone(),
                self.settings.clone(),
            );
            let identity = identity.clone();
            info!(server = %identity.name, "Task {} created", index + 1);
            slots.push(index);
            handles.push(tokio::spawn(async move { driver.run(&identity).await }));
        }

        let aborts: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();
        let mut drivers = Box::pin(join_all(handles));
        let mut shutdown = None;

        let results = tokio::select! {
            results = &mut drivers => results,
            _ = signal.raised() => {
                let mut summary = self.coordinator.graceful_shutdown().await;
                let results = match tokio::time::timeout(self.settings.shutdown_drain, &mut drivers).await {
                    Ok(results) => results,
                    Err(_) => {
                        warn!("Some sessions did not stop in time, aborting them");
                        // Claim what is still playing and wait for every
                        // finalize under way before touching the drivers
                        summary.merge(self.coordinator.graceful_shutdown().await);
                        for abort in &aborts {
                            abort.abort();
                        }
                        let results = drivers.await;
                        if !self.registry.is_empty() {
                            summary.merge(self.coordinator.graceful_shutdown().await);
                        }
                        results
                    }
                };
                shutdown = Some(summary);
                results
            }
        };

        for (index, result) in slots.into_iter().zip(results) {
            outcomes[index] = Some(join_outcome(result));
        }

        let entries = identities
            .into_iter()
            .zip(outcomes)
            .map(|(identity, outcome)| ReportEntry {
                identity,
                outcome: outcome.unwrap_or_else(|| {
                    Outcome::Failed(SessionError::Interrupted("driver never ran".to_string()))
                }),
            })
            .collect();

        let report = RunReport { entries, shutdown };
        info!(
            "Done! Success: {}/{}",
            report.success_count(),
            report.total()
        );
        report
    }
}

fn join_outcome(result: Result<Outcome, JoinError>) -> Outcome {
    match result {
        Ok(outcome) => outcome,
        Err(e) if e.is_cancelled() => Outcome::Failed(SessionError::Interrupted(
            "driver aborted after shutdown drain".to_string(),
        )),
        Err(e) => Outcome::Failed(SessionError::Panicked(e.to_string())),
    }
}
