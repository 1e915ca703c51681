//! # KWEmby - Client Emby pour KeepWatch
//!
//! Cette crate implémente [`kwsession::MediaServerClient`] au-dessus de l'API
//! REST d'Emby : authentification, liste des films, rapports de lecture et
//! écriture directe de la position de reprise.
//!
//! ## Exemple
//!
//! ```rust,ignore
//! use kwemby::{ApiOptions, EmbyClientFactory};
//! use kwsession::{Orchestrator, PlaybackSettings};
//! use std::sync::Arc;
//!
//! let factory = Arc::new(EmbyClientFactory::new(ApiOptions::default()));
//! let orchestrator = Orchestrator::new(factory, PlaybackSettings::default());
//! ```

pub mod api;
pub mod client;
pub mod config_ext;
pub mod error;
pub mod models;

pub use api::{ApiOptions, DeviceInfo, EmbyApi};
pub use client::{EmbyClient, EmbyClientFactory};
pub use config_ext::EmbyConfigExt;
pub use error::{EmbyError, Result};
