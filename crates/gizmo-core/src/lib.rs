//! # Gizmo Core Library
//!
//! Token economy for the Gizmo browser: users earn tokens by browsing and
//! watching rewarded ads, and spend them on gated features.
//!
//! ## Architecture
//!
//! - **Incentive Engine**: a pure state machine over the token balance and
//!   incentive settings; eligibility for an ad offer is recomputed after every
//!   command
//! - **Incentive Service**: the single writer. Commits commands in memory
//!   under one lock, then persists touched records on an ordered background
//!   writer
//! - **Storage**: asynchronous key-value stores (SQLite, in-memory) and
//!   TOML-based configuration
//!
//! ## Key Components
//!
//! - [`IncentiveService`]: command surface used by UI and CLI
//! - [`IncentiveEngine`]: pure state machine
//! - [`ActivityReporter`]: once-per-minute browsing tick
//! - [`KeyValueStore`]: storage collaborator trait
//! - [`Config`]: application configuration management

pub mod clock;
pub mod error;
pub mod events;
pub mod incentive;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, SpendError, StorageError};
pub use events::Event;
pub use incentive::{
    ActivityReporter, AdOffer, IncentiveEngine, IncentiveService, IncentiveSettings,
    IncentiveSnapshot, Setting, TokenAccount,
};
pub use storage::{Config, KeyValueStore, MemoryStore, SqliteStore};
