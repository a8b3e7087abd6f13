use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::incentive::Setting;

/// Every committed transition in the engine produces one or more Events.
/// UI surfaces render them; the CLI prints them as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    ActivityRecorded {
        browsing_minutes: u32,
        at: DateTime<Utc>,
    },
    /// The gating conditions all hold; an ad offer may be presented.
    AdEligible {
        browsing_minutes: u32,
        at: DateTime<Utc>,
    },
    TokensEarned {
        amount: u64,
        balance: u64,
        at: DateTime<Utc>,
    },
    AdDismissed {
        at: DateTime<Utc>,
    },
    TokensSpent {
        amount: u64,
        balance: u64,
        at: DateTime<Utc>,
    },
    BalanceReset {
        previous_balance: u64,
        at: DateTime<Utc>,
    },
    SettingChanged {
        setting: Setting,
        enabled: bool,
        at: DateTime<Utc>,
    },
}
