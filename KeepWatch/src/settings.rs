//! Traduction de la configuration en paramètres du moteur de sessions

use kwconfig::{Config, ServerEntry};
use kwsession::{PlaybackSettings, ServerIdentity};
use std::time::Duration;

/// Paramètres de lecture lus dans la section `playback`
pub fn playback_settings(config: &Config) -> PlaybackSettings {
    PlaybackSettings {
        tick_interval: Duration::from_secs(config.get_tick_interval_secs().max(1)),
        min_watch: Duration::from_secs(config.get_min_watch_secs()),
        max_watch: Duration::from_secs(config.get_max_watch_secs()),
        poll_interval: Duration::from_millis(config.get_poll_interval_ms()),
        finalize_step_delay: Duration::from_millis(config.get_finalize_step_delay_ms()),
        shutdown_drain: Duration::from_secs(config.get_shutdown_drain_secs()),
        verify_saved_position: config.get_verify_saved_position(),
    }
}

/// Identité de session d'un serveur configuré
pub fn identity(entry: ServerEntry) -> ServerIdentity {
    let identity = ServerIdentity::new(entry.url, entry.username, entry.password);
    match entry.name {
        Some(name) if !name.trim().is_empty() => identity.with_name(name),
        _ => identity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playback_settings_from_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config::load_config(&dir.path().to_string_lossy()).unwrap();
        config.set_max_watch_secs(900).unwrap();

        let settings = playback_settings(&config);
        assert_eq!(settings.tick_interval, Duration::from_secs(60));
        assert_eq!(settings.min_watch, Duration::from_secs(300));
        assert_eq!(settings.max_watch, Duration::from_secs(900));
        assert_eq!(settings.effective_poll_interval(), Duration::from_secs(1));
        assert_eq!(settings.finalize_step_delay, Duration::from_millis(500));
        assert!(!settings.verify_saved_position);
    }

    #[test]
    fn test_identity_name() {
        let mut entry = ServerEntry::new("http://a", "alice", "pw");
        assert_eq!(identity(entry.clone()).name, "http://a");

        entry.name = Some("salon".into());
        let named = identity(entry);
        assert_eq!(named.name, "salon");
        assert_eq!(named.password, "pw");
    }
}
