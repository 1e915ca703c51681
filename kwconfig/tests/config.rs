use kwconfig::{Config, ServerEntry};
use std::fs;
use tempfile::TempDir;

fn load(dir: &TempDir) -> anyhow::Result<Config> {
    Config::load_config(&dir.path().to_string_lossy())
}

#[test]
fn defaults_without_config_file() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let config = load(&dir)?;

    assert_eq!(config.get_tick_interval_secs(), 60);
    assert_eq!(config.get_min_watch_secs(), 300);
    assert_eq!(config.get_max_watch_secs(), 1800);
    assert_eq!(config.get_poll_interval_ms(), 1000);
    assert_eq!(config.get_finalize_step_delay_ms(), 500);
    assert_eq!(config.get_shutdown_drain_secs(), 5);
    assert!(!config.get_verify_saved_position());
    assert_eq!(config.get_request_timeout_secs(), 30);
    assert!(config.get_accept_invalid_certs());
    assert_eq!(config.get_client_name(), "EmbyClient");
    assert_eq!(config.get_client_version(), "4.8.0");
    assert_eq!(config.get_log_min_level(), "info");
    assert!(config.get_servers()?.is_empty());

    // Le document fusionné est écrit sur disque
    assert!(dir.path().join("config.yaml").exists());
    Ok(())
}

#[test]
fn config_file_overrides_defaults() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    fs::write(
        dir.path().join("config.yaml"),
        r#"
playback:
  max_watch_secs: 600
  verify_saved_position: true
servers:
  - url: http://emby.local:8096
    username: alice
    password: secret
    name: living-room
  - url: https://other.example.org
    username: bob
"#,
    )?;

    let config = load(&dir)?;
    assert_eq!(config.get_max_watch_secs(), 600);
    assert_eq!(config.get_min_watch_secs(), 300);
    assert!(config.get_verify_saved_position());

    let servers = config.get_servers()?;
    assert_eq!(servers.len(), 2);
    assert_eq!(servers[0].display_name(), "living-room");
    assert_eq!(servers[0].password, "secret");
    assert_eq!(servers[1].display_name(), "https://other.example.org");
    assert_eq!(servers[1].password, "");
    Ok(())
}

#[test]
fn invalid_numbers_fall_back_to_defaults() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    fs::write(
        dir.path().join("config.yaml"),
        "playback:\n  tick_interval_secs: soon\n  min_watch_secs: -5\n",
    )?;

    let config = load(&dir)?;
    assert_eq!(config.get_tick_interval_secs(), 60);
    assert_eq!(config.get_min_watch_secs(), 300);
    Ok(())
}

#[test]
fn setters_are_persisted() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let config = load(&dir)?;
    config.set_min_watch_secs(120)?;
    config.set_client_device("Bedroom")?;

    let reloaded = load(&dir)?;
    assert_eq!(reloaded.get_min_watch_secs(), 120);
    assert_eq!(reloaded.get_client_device(), "Bedroom");
    Ok(())
}

#[test]
fn device_id_is_generated_once() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let config = load(&dir)?;

    let first = config.get_device_id()?;
    assert!(!first.is_empty());
    assert_eq!(config.get_device_id()?, first);

    let reloaded = load(&dir)?;
    assert_eq!(reloaded.get_device_id()?, first);
    Ok(())
}

#[test]
fn legacy_import_skips_known_servers() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    fs::write(
        dir.path().join("config.yaml"),
        "servers:\n  - url: http://a\n    username: alice\n    password: pa\n",
    )?;
    let legacy = dir.path().join("emby.json");
    fs::write(
        &legacy,
        r#"{"servers": ["http://a", "http://b"], "usernames": ["alice", "bob"], "passwords": ["pa", ""]}"#,
    )?;

    let config = load(&dir)?;
    let added = config.import_legacy_json(&legacy)?;
    assert_eq!(added, 1);

    let servers = config.get_servers()?;
    assert_eq!(
        servers,
        vec![
            ServerEntry::new("http://a", "alice", "pa"),
            ServerEntry::new("http://b", "bob", ""),
        ]
    );
    Ok(())
}
