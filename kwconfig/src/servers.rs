//! Comptes des serveurs à maintenir actifs

use crate::encryption;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// Un compte configuré sur un serveur
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEntry {
    /// URL de base du serveur
    pub url: String,
    pub username: String,
    /// Mot de passe, en clair ou au format `encrypted:...`
    #[serde(default)]
    pub password: String,
    /// Nom affiché dans les logs, l'URL par défaut
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ServerEntry {
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            username: username.into(),
            password: password.into(),
            name: None,
        }
    }

    /// Nom affiché du serveur
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.url)
    }

    /// Copie avec le mot de passe en clair
    pub fn decrypted(&self) -> Result<Self> {
        let password = encryption::get_password(&self.password)
            .with_context(|| format!("cannot decrypt password of {}", self.display_name()))?;
        Ok(Self {
            password,
            ..self.clone()
        })
    }

    /// Copie avec le mot de passe chiffré
    pub fn encrypted(&self) -> Result<Self> {
        if encryption::is_encrypted(&self.password) || self.password.is_empty() {
            return Ok(self.clone());
        }
        Ok(Self {
            password: encryption::encrypt_password(&self.password)?,
            ..self.clone()
        })
    }
}

impl fmt::Debug for ServerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerEntry")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"***")
            .field("name", &self.name)
            .finish()
    }
}

/// Ancien format `emby.json` : trois listes parallèles
#[derive(Debug, Deserialize)]
struct LegacyFile {
    servers: Vec<String>,
    usernames: Vec<String>,
    passwords: Vec<String>,
}

/// Lit un fichier `emby.json` de l'ancien format
///
/// Les trois listes sont associées par position. Des listes de longueurs
/// différentes sont refusées plutôt que tronquées silencieusement.
pub fn import_legacy_json(path: impl AsRef<Path>) -> Result<Vec<ServerEntry>> {
    let path = path.as_ref();
    let content =
        fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    let legacy: LegacyFile = serde_json::from_str(&content)
        .with_context(|| format!("invalid legacy file {}", path.display()))?;

    if legacy.servers.len() != legacy.usernames.len()
        || legacy.servers.len() != legacy.passwords.len()
    {
        return Err(anyhow!(
            "legacy file {} has {} servers, {} usernames and {} passwords",
            path.display(),
            legacy.servers.len(),
            legacy.usernames.len(),
            legacy.passwords.len()
        ));
    }

    Ok(legacy
        .servers
        .into_iter()
        .zip(legacy.usernames)
        .zip(legacy.passwords)
        .map(|((url, username), password)| ServerEntry::new(url, username, password))
        .collect())
}
