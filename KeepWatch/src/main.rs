//! KeepWatch : maintient les entrées "reprendre la lecture" des serveurs Emby
//!
//! Usage : `keepwatch [CONFIG_DIR]`

mod logging;
mod settings;

use anyhow::{Context, Result};
use kwconfig::Config;
use kwemby::{EmbyClientFactory, EmbyConfigExt};
use kwsession::{Orchestrator, Outcome, RunReport};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Ancien fichier de configuration importé au premier lancement
const LEGACY_CONFIG_FILE: &str = "emby.json";

#[tokio::main]
async fn main() -> Result<()> {
    let config_dir = std::env::args().nth(1).unwrap_or_default();
    let config = Config::load_config(&config_dir).context("cannot load configuration")?;

    logging::init_logging(&config.get_log_min_level());

    let mut servers = config.get_servers()?;
    if servers.is_empty() && Path::new(LEGACY_CONFIG_FILE).exists() {
        let added = config
            .import_legacy_json(LEGACY_CONFIG_FILE)
            .context("cannot import legacy emby.json")?;
        info!("📥 Imported {} server(s) from {}", added, LEGACY_CONFIG_FILE);
        servers = config.get_servers()?;
    }

    if servers.is_empty() {
        warn!("No server configured in {}/config.yaml", config.dir());
        return Ok(());
    }

    let factory = Arc::new(EmbyClientFactory::new(config.get_emby_api_options()?));
    let orchestrator = Orchestrator::new(factory, settings::playback_settings(&config));
    orchestrator.coordinator().install_ctrl_c();

    let identities: Vec<_> = servers.into_iter().map(settings::identity).collect();
    info!(
        "▶️ Starting playback on {} server(s), press Ctrl+C to stop and save progress",
        identities.len()
    );

    let report = orchestrator.run(identities).await;
    print_report(&report);

    Ok(())
}

fn print_report(report: &RunReport) {
    for entry in &report.entries {
        match &entry.outcome {
            Outcome::Success(summary) => info!(
                server = %entry.identity.name,
                "✅ {} watched up to {}s of {}s{}",
                summary.media_name,
                summary.position,
                summary.target,
                if summary.interrupted { " (interrupted)" } else { "" }
            ),
            Outcome::Failed(reason) => {
                error!(server = %entry.identity.name, "❌ {}", reason)
            }
        }
    }

    if let Some(shutdown) = &report.shutdown {
        info!(
            "🛑 Shutdown: {} session(s) saved, {} failed, {} already finalized",
            shutdown.persisted, shutdown.failed, shutdown.skipped
        );
    }

    info!(
        "🏁 {}/{} session(s) succeeded",
        report.success_count(),
        report.total()
    );

    match serde_json::to_string(report) {
        Ok(json) => tracing::debug!(report = %json, "Run report"),
        Err(e) => warn!("Cannot serialize run report: {}", e),
    }
}
