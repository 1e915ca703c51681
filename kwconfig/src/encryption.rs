//! Chiffrement des mots de passe stockés dans la configuration
//!
//! La clé AES-256-GCM est dérivée de l'identifiant de la machine : un fichier
//! copié sur une autre machine ne peut pas être déchiffré.
//!
//! Format stocké : `encrypted:` suivi de `base64(nonce(12) || ciphertext)`.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use anyhow::{Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};

/// Préfixe des mots de passe chiffrés
pub const ENCRYPTED_PREFIX: &str = "encrypted:";

const KEY_SALT: &[u8] = b"keepwatch-config-encryption-v1";
const NONCE_SALT: &[u8] = b"keepwatch-nonce-v1";
const NONCE_LEN: usize = 12;

/// Identifiant stable de la machine
fn machine_id() -> Result<String> {
    #[cfg(target_os = "linux")]
    {
        for path in ["/etc/machine-id", "/var/lib/dbus/machine-id"] {
            if let Ok(id) = std::fs::read_to_string(path) {
                let id = id.trim();
                if !id.is_empty() {
                    return Ok(id.to_string());
                }
            }
        }
        Err(anyhow!("Failed to read machine-id"))
    }

    #[cfg(target_os = "macos")]
    {
        let output = std::process::Command::new("ioreg")
            .args(["-d2", "-c", "IOPlatformExpertDevice"])
            .output()?;
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .find(|line| line.contains("IOPlatformUUID"))
            .and_then(|line| line.split('"').nth(3))
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Failed to extract IOPlatformUUID from ioreg"))
    }

    #[cfg(target_os = "windows")]
    {
        let output = std::process::Command::new("wmic")
            .args(["csproduct", "get", "UUID"])
            .output()?;
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .nth(1)
            .map(|line| line.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| anyhow!("Failed to extract UUID from wmic"))
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        Err(anyhow!("Unsupported platform for machine id extraction"))
    }
}

fn derive_key(seed: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(KEY_SALT);
    let mut key = [0u8; 32];
    key.copy_from_slice(&hasher.finalize());
    key
}

fn cipher(seed: &str) -> Result<Aes256Gcm> {
    Aes256Gcm::new_from_slice(&derive_key(seed)).map_err(|e| anyhow!("Failed to create cipher: {}", e))
}

/// Chiffre avec une clé dérivée de `seed`
///
/// Le nonce est dérivé du mot de passe : le même mot de passe donne
/// toujours la même valeur, le fichier n'est donc pas réécrit inutilement.
pub(crate) fn encrypt_with_seed(password: &str, seed: &str) -> Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.update(NONCE_SALT);
    let digest = hasher.finalize();
    let nonce_bytes = &digest[..NONCE_LEN];

    let ciphertext = cipher(seed)?
        .encrypt(Nonce::from_slice(nonce_bytes), password.as_bytes())
        .map_err(|e| anyhow!("Encryption failed: {}", e))?;

    let mut combined = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    combined.extend_from_slice(nonce_bytes);
    combined.extend_from_slice(&ciphertext);

    Ok(format!("{}{}", ENCRYPTED_PREFIX, STANDARD.encode(&combined)))
}

pub(crate) fn decrypt_with_seed(encrypted: &str, seed: &str) -> Result<String> {
    let data = encrypted
        .strip_prefix(ENCRYPTED_PREFIX)
        .ok_or_else(|| anyhow!("Invalid encrypted password format (missing prefix)"))?;
    let combined = STANDARD
        .decode(data)
        .map_err(|e| anyhow!("Invalid base64: {}", e))?;

    if combined.len() < NONCE_LEN {
        return Err(anyhow!("Invalid ciphertext (too short)"));
    }
    let (nonce, ciphertext) = combined.split_at(NONCE_LEN);

    let plaintext = cipher(seed)?
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|e| anyhow!("Decryption failed (wrong machine or corrupted data): {}", e))?;

    String::from_utf8(plaintext).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
}

/// Chiffre un mot de passe avec la clé de la machine
///
/// ```rust,ignore
/// let stored = kwconfig::encryption::encrypt_password("secret")?;
/// assert!(stored.starts_with("encrypted:"));
/// ```
pub fn encrypt_password(password: &str) -> Result<String> {
    encrypt_with_seed(password, &machine_id()?)
}

/// Déchiffre une valeur `encrypted:...` avec la clé de la machine
pub fn decrypt_password(encrypted: &str) -> Result<String> {
    decrypt_with_seed(encrypted, &machine_id()?)
}

/// Vérifie si une valeur est un mot de passe chiffré
pub fn is_encrypted(value: &str) -> bool {
    value.starts_with(ENCRYPTED_PREFIX)
}

/// Retourne le mot de passe en clair, qu'il soit stocké chiffré ou non
pub fn get_password(value: &str) -> Result<String> {
    if is_encrypted(value) {
        decrypt_password(value)
    } else {
        Ok(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_encrypt_decrypt() {
        let encrypted = encrypt_with_seed("SuperSecret123!", SEED).unwrap();
        assert!(is_encrypted(&encrypted));
        assert!(!encrypted.contains("SuperSecret123!"));

        let decrypted = decrypt_with_seed(&encrypted, SEED).unwrap();
        assert_eq!(decrypted, "SuperSecret123!");
    }

    #[test]
    fn test_encryption_is_deterministic() {
        let a = encrypt_with_seed("secret", SEED).unwrap();
        let b = encrypt_with_seed("secret", SEED).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_other_machine_cannot_decrypt() {
        let encrypted = encrypt_with_seed("secret", SEED).unwrap();
        assert!(decrypt_with_seed(&encrypted, "another-machine").is_err());
    }

    #[test]
    fn test_invalid_values() {
        assert!(decrypt_with_seed("plaintext", SEED).is_err());
        assert!(decrypt_with_seed("encrypted:!!!", SEED).is_err());
        assert!(decrypt_with_seed("encrypted:AAAA", SEED).is_err());
    }

    #[test]
    fn test_get_password_plaintext() {
        assert!(!is_encrypted("plaintext"));
        assert_eq!(get_password("plaintext").unwrap(), "plaintext");
    }
}
