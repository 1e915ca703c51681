//! # KWSession
//!
//! Concurrent playback session engine for KeepWatch.
//!
//! One [`SessionDriver`] per configured server simulates a playback: it logs
//! in, picks an item, announces the playback, reports progress on every tick
//! and finally runs the finalize sequence that makes the server keep a
//! resume point ("continue watching").
//!
//! The [`Orchestrator`] runs every driver concurrently and aggregates their
//! outcomes. When the [`ShutdownSignal`] is raised, the
//! [`InterruptCoordinator`] finalizes every session still present in the
//! [`SessionRegistry`], independently of the drivers, so that progress is
//! saved even if a driver is stuck in a slow network call.
//!
//! Remote calls go through the [`MediaServerClient`] trait; see the `kwemby`
//! crate for the Emby implementation.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kwsession::{Orchestrator, PlaybackSettings, ServerIdentity};
//!
//! let orchestrator = Orchestrator::new(factory, PlaybackSettings::default());
//! orchestrator.coordinator().install_ctrl_c();
//!
//! let report = orchestrator
//!     .run(vec![ServerIdentity::new("http://emby.local:8096", "alice", "secret")])
//!     .await;
//! println!("{}/{} succeeded", report.success_count(), report.total());
//! ```

pub mod client;
pub mod driver;
pub mod error;
pub mod finalize;
pub mod orchestrator;
pub mod registry;
pub mod session;
pub mod shutdown;

pub use client::{AuthInfo, ClientFactory, MediaItem, MediaServerClient, ServerIdentity};
pub use driver::{Outcome, PlaybackSettings, SessionDriver, SessionSummary};
pub use error::{ClientError, SessionError};
pub use finalize::{FinalizeReport, FinalizeStep};
pub use orchestrator::{Orchestrator, ReportEntry, RunReport};
pub use registry::{RegisteredSession, SessionRegistry};
pub use session::{SessionHandle, SessionSnapshot, SessionState, TICKS_PER_SECOND};
pub use shutdown::{InterruptCoordinator, ShutdownSignal, ShutdownSummary};
