mod activity;
mod engine;
pub mod policy;
mod records;
mod service;

pub use activity::ActivityReporter;
pub use engine::{AdOffer, Changed, IncentiveEngine, IncentiveSnapshot, Setting, Transition};
pub use policy::{is_ad_eligible, AD_COOLDOWN_MINUTES, MIN_SESSION_MINUTES, REWARD_TOKENS};
pub use records::{IncentiveSettings, TokenAccount, BALANCE_KEY, SETTINGS_KEY};
pub use service::IncentiveService;
