//! Extension pour lire les paramètres du client Emby depuis kwconfig
//!
//! Ce module fournit le trait `EmbyConfigExt` qui construit les options
//! HTTP du client à partir de la section `client` de la configuration.

use crate::api::{ApiOptions, DeviceInfo};
use anyhow::Result;
use kwconfig::Config;
use std::time::Duration;

/// Trait d'extension de `kwconfig::Config` pour le client Emby
///
/// # Exemple
///
/// ```rust,ignore
/// use kwconfig::Config;
/// use kwemby::{EmbyClientFactory, EmbyConfigExt};
///
/// let config = Config::load_config("")?;
/// let factory = EmbyClientFactory::new(config.get_emby_api_options()?);
/// ```
pub trait EmbyConfigExt {
    /// Identification annoncée au serveur (`client.name`, `client.device`, ...)
    ///
    /// L'identifiant d'appareil est généré puis sauvegardé à la première lecture.
    fn get_emby_device_info(&self) -> Result<DeviceInfo>;

    /// Options complètes du client HTTP
    fn get_emby_api_options(&self) -> Result<ApiOptions>;
}

impl EmbyConfigExt for Config {
    fn get_emby_device_info(&self) -> Result<DeviceInfo> {
        Ok(DeviceInfo {
            client: self.get_client_name(),
            device: self.get_client_device(),
            device_id: self.get_device_id()?,
            version: self.get_client_version(),
        })
    }

    fn get_emby_api_options(&self) -> Result<ApiOptions> {
        Ok(ApiOptions {
            timeout: Duration::from_secs(self.get_request_timeout_secs().max(1)),
            accept_invalid_certs: self.get_accept_invalid_certs(),
            device: self.get_emby_device_info()?,
        })
    }
}
