//! Persisted records and their text encodings.
//!
//! The balance and the settings live under two independent keys. Either may
//! be missing (first run) or stale relative to the other (crash between the
//! two writes); each is decoded on its own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

pub const BALANCE_KEY: &str = "browser_token_balance";
pub const SETTINGS_KEY: &str = "browser_token_settings";

/// Spendable token balance. Never negative by construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAccount {
    pub balance: u64,
}

/// Feature toggles plus the inputs of the eligibility predicate.
///
/// Stored as a JSON object with camelCase keys and epoch-millisecond
/// timestamps. Missing fields fall back to their defaults individually.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncentiveSettings {
    #[serde(rename = "tokensEnabled")]
    pub tokens_enabled: bool,
    #[serde(rename = "adBlockingEnabled")]
    pub ad_blocking_enabled: bool,
    /// Last time an ad was shown or dismissed.
    #[serde(rename = "lastAdDisplayTime", with = "chrono::serde::ts_milliseconds")]
    pub last_ad_display_at: DateTime<Utc>,
    #[serde(rename = "lastTokenEarnTime", with = "chrono::serde::ts_milliseconds")]
    pub last_token_earn_at: DateTime<Utc>,
    /// Whole activity minutes since the last reward.
    #[serde(rename = "browsingTimeMinutes")]
    pub browsing_minutes: u32,
}

impl Default for IncentiveSettings {
    fn default() -> Self {
        Self {
            tokens_enabled: true,
            ad_blocking_enabled: true,
            last_ad_display_at: DateTime::<Utc>::UNIX_EPOCH,
            last_token_earn_at: DateTime::<Utc>::UNIX_EPOCH,
            browsing_minutes: 0,
        }
    }
}

impl TokenAccount {
    pub fn encode(&self) -> String {
        self.balance.to_string()
    }

    pub fn decode(text: &str) -> Result<Self> {
        let balance = text.trim().parse::<u64>().map_err(|e| CoreError::Decode {
            key: BALANCE_KEY.to_string(),
            message: format!("'{text}' is not a non-negative integer: {e}"),
        })?;
        Ok(Self { balance })
    }
}

impl IncentiveSettings {
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| CoreError::Decode {
            key: SETTINGS_KEY.to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn balance_text_is_plain_decimal() {
        let account = TokenAccount { balance: 42 };
        assert_eq!(account.encode(), "42");
        assert_eq!(TokenAccount::decode(" 42\n").unwrap(), account);
    }

    #[test]
    fn balance_rejects_negative_and_garbage() {
        assert!(matches!(
            TokenAccount::decode("-3"),
            Err(CoreError::Decode { .. })
        ));
        assert!(TokenAccount::decode("lots").is_err());
        assert!(TokenAccount::decode("").is_err());
    }

    #[test]
    fn settings_json_uses_storage_field_names() {
        let settings = IncentiveSettings {
            tokens_enabled: false,
            ad_blocking_enabled: true,
            last_ad_display_at: Utc.timestamp_millis_opt(1_700_000_000_123).unwrap(),
            last_token_earn_at: DateTime::<Utc>::UNIX_EPOCH,
            browsing_minutes: 7,
        };
        let json: serde_json::Value =
            serde_json::from_str(&settings.encode().unwrap()).unwrap();
        assert_eq!(json["tokensEnabled"], false);
        assert_eq!(json["adBlockingEnabled"], true);
        assert_eq!(json["lastAdDisplayTime"], 1_700_000_000_123i64);
        assert_eq!(json["lastTokenEarnTime"], 0);
        assert_eq!(json["browsingTimeMinutes"], 7);
    }

    #[test]
    fn settings_missing_fields_take_defaults() {
        let settings = IncentiveSettings::decode(r#"{"browsingTimeMinutes": 3}"#).unwrap();
        assert_eq!(settings.browsing_minutes, 3);
        assert!(settings.tokens_enabled);
        assert!(settings.ad_blocking_enabled);
        assert_eq!(settings.last_ad_display_at, DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn settings_reject_malformed_json() {
        assert!(matches!(
            IncentiveSettings::decode("{not json"),
            Err(CoreError::Decode { .. })
        ));
    }
}
