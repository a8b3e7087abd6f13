//! Fixed reward policy and the eligibility predicate.

use chrono::{DateTime, Duration, Utc};

use super::records::IncentiveSettings;

/// Minimum gap between two ad offers. Eligibility needs strictly more than this.
pub const AD_COOLDOWN_MINUTES: i64 = 30;

/// Browsing minutes needed since the last reward before an ad may be offered.
pub const MIN_SESSION_MINUTES: u32 = 5;

/// Tokens granted per watched ad.
pub const REWARD_TOKENS: u64 = 5;

pub fn ad_cooldown() -> Duration {
    Duration::minutes(AD_COOLDOWN_MINUTES)
}

/// Level-triggered eligibility: a pure function of the settings and `now`.
pub fn is_ad_eligible(settings: &IncentiveSettings, now: DateTime<Utc>) -> bool {
    settings.tokens_enabled
        && now.signed_duration_since(settings.last_ad_display_at) > ad_cooldown()
        && settings.browsing_minutes >= MIN_SESSION_MINUTES
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_at(last_ad: DateTime<Utc>, minutes: u32) -> IncentiveSettings {
        IncentiveSettings {
            last_ad_display_at: last_ad,
            browsing_minutes: minutes,
            ..IncentiveSettings::default()
        }
    }

    #[test]
    fn defaults_are_not_eligible_until_session_threshold() {
        let now = Utc::now();
        assert!(!is_ad_eligible(&IncentiveSettings::default(), now));
        let settings = settings_at(DateTime::<Utc>::UNIX_EPOCH, MIN_SESSION_MINUTES);
        assert!(is_ad_eligible(&settings, now));
    }

    #[test]
    fn exactly_thirty_minutes_is_still_cooling_down() {
        let last = Utc::now();
        let settings = settings_at(last, MIN_SESSION_MINUTES);
        assert!(!is_ad_eligible(&settings, last + ad_cooldown()));
        assert!(is_ad_eligible(
            &settings,
            last + ad_cooldown() + Duration::milliseconds(1)
        ));
    }

    #[test]
    fn exactly_five_minutes_meets_threshold() {
        let now = Utc::now();
        let epoch = DateTime::<Utc>::UNIX_EPOCH;
        assert!(!is_ad_eligible(&settings_at(epoch, MIN_SESSION_MINUTES - 1), now));
        assert!(is_ad_eligible(&settings_at(epoch, MIN_SESSION_MINUTES), now));
    }

    #[test]
    fn disabled_tokens_never_eligible() {
        let mut settings = settings_at(DateTime::<Utc>::UNIX_EPOCH, 100);
        settings.tokens_enabled = false;
        assert!(!is_ad_eligible(&settings, Utc::now()));
    }

    #[test]
    fn ad_blocking_flag_is_ignored() {
        let mut settings = settings_at(DateTime::<Utc>::UNIX_EPOCH, MIN_SESSION_MINUTES);
        settings.ad_blocking_enabled = false;
        assert!(is_ad_eligible(&settings, Utc::now()));
    }
}
