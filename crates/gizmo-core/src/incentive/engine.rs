//! Incentive engine implementation.
//!
//! The engine is a pure, synchronous state machine over the token account and
//! the incentive settings. It never reads the clock: every command takes the
//! current instant, which keeps boundary behaviour testable.
//!
//! ## Ad offer lifecycle
//!
//! ```text
//! Idle -> Eligible -> Idle (earn | dismiss)
//! ```
//!
//! Eligibility is recomputed from absolute timestamps at the end of every
//! command, so the offer state can never lag behind the committed settings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::policy::{self, REWARD_TOKENS};
use super::records::{IncentiveSettings, TokenAccount};
use crate::error::SpendError;
use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdOffer {
    Idle,
    Eligible,
}

/// A boolean preference the user can toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Setting {
    Tokens,
    AdBlocking,
}

/// Which persisted records a transition touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Changed {
    pub balance: bool,
    pub settings: bool,
}

/// Result of one committed command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transition {
    pub events: Vec<Event>,
    pub changed: Changed,
}

/// Read-only view handed to UI surfaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncentiveSnapshot {
    pub balance: u64,
    pub tokens_enabled: bool,
    pub ad_blocking_enabled: bool,
    pub ad_eligible: bool,
    pub offer: AdOffer,
    pub browsing_minutes: u32,
    pub last_ad_display_at: DateTime<Utc>,
    pub last_token_earn_at: DateTime<Utc>,
}

/// Core incentive engine.
#[derive(Debug, Clone, PartialEq)]
pub struct IncentiveEngine {
    account: TokenAccount,
    settings: IncentiveSettings,
    offer: AdOffer,
}

impl Default for IncentiveEngine {
    fn default() -> Self {
        Self {
            account: TokenAccount::default(),
            settings: IncentiveSettings::default(),
            offer: AdOffer::Idle,
        }
    }
}

impl IncentiveEngine {
    /// Build an engine from loaded records, evaluating eligibility at `now`.
    pub fn new(account: TokenAccount, settings: IncentiveSettings, now: DateTime<Utc>) -> Self {
        let mut engine = Self {
            account,
            settings,
            offer: AdOffer::Idle,
        };
        engine.recompute_eligibility(now, &mut Transition::default());
        engine
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn balance(&self) -> u64 {
        self.account.balance
    }

    pub fn account(&self) -> &TokenAccount {
        &self.account
    }

    pub fn settings(&self) -> &IncentiveSettings {
        &self.settings
    }

    pub fn offer(&self) -> AdOffer {
        self.offer
    }

    /// Eligibility as of the last committed command.
    pub fn is_ad_eligible(&self) -> bool {
        self.offer == AdOffer::Eligible
    }

    pub fn snapshot(&self) -> IncentiveSnapshot {
        IncentiveSnapshot {
            balance: self.account.balance,
            tokens_enabled: self.settings.tokens_enabled,
            ad_blocking_enabled: self.settings.ad_blocking_enabled,
            ad_eligible: self.is_ad_eligible(),
            offer: self.offer,
            browsing_minutes: self.settings.browsing_minutes,
            last_ad_display_at: self.settings.last_ad_display_at,
            last_token_earn_at: self.settings.last_token_earn_at,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Count one completed minute of active browsing.
    pub fn record_activity(&mut self, now: DateTime<Utc>) -> Transition {
        self.settings.browsing_minutes = self.settings.browsing_minutes.saturating_add(1);
        let mut transition = Transition {
            events: vec![Event::ActivityRecorded {
                browsing_minutes: self.settings.browsing_minutes,
                at: now,
            }],
            changed: Changed {
                balance: false,
                settings: true,
            },
        };
        self.recompute_eligibility(now, &mut transition);
        transition
    }

    /// Re-check eligibility against `now` without touching stored fields.
    pub fn request_ad(&mut self, now: DateTime<Utc>) -> Transition {
        let mut transition = Transition::default();
        self.recompute_eligibility(now, &mut transition);
        transition
    }

    /// Grant the reward for a watched ad and restart the cooldown.
    pub fn earn(&mut self, now: DateTime<Utc>) -> Transition {
        self.account.balance = self.account.balance.saturating_add(REWARD_TOKENS);
        self.settings.last_token_earn_at = now;
        self.settings.last_ad_display_at = now;
        self.settings.browsing_minutes = 0;
        let mut transition = Transition {
            events: vec![Event::TokensEarned {
                amount: REWARD_TOKENS,
                balance: self.account.balance,
                at: now,
            }],
            changed: Changed {
                balance: true,
                settings: true,
            },
        };
        self.recompute_eligibility(now, &mut transition);
        transition
    }

    /// Close the offer without a reward. Restarts the cooldown but keeps the
    /// browsing counter.
    pub fn dismiss(&mut self, now: DateTime<Utc>) -> Transition {
        self.settings.last_ad_display_at = now;
        let mut transition = Transition {
            events: vec![Event::AdDismissed { at: now }],
            changed: Changed {
                balance: false,
                settings: true,
            },
        };
        self.recompute_eligibility(now, &mut transition);
        transition
    }

    pub fn spend(&mut self, amount: u64, now: DateTime<Utc>) -> Result<Transition, SpendError> {
        if amount == 0 {
            return Err(SpendError::InvalidAmount);
        }
        if amount > self.account.balance {
            return Err(SpendError::InsufficientBalance {
                balance: self.account.balance,
                requested: amount,
            });
        }
        self.account.balance -= amount;
        let mut transition = Transition {
            events: vec![Event::TokensSpent {
                amount,
                balance: self.account.balance,
                at: now,
            }],
            changed: Changed {
                balance: true,
                settings: false,
            },
        };
        self.recompute_eligibility(now, &mut transition);
        Ok(transition)
    }

    /// Zero the balance. Settings are left alone.
    pub fn reset(&mut self, now: DateTime<Utc>) -> Transition {
        let previous_balance = self.account.balance;
        self.account.balance = 0;
        let mut transition = Transition {
            events: vec![Event::BalanceReset {
                previous_balance,
                at: now,
            }],
            changed: Changed {
                balance: true,
                settings: false,
            },
        };
        self.recompute_eligibility(now, &mut transition);
        transition
    }

    pub fn set_tokens_enabled(&mut self, enabled: bool, now: DateTime<Utc>) -> Transition {
        self.settings.tokens_enabled = enabled;
        self.setting_changed(Setting::Tokens, enabled, now)
    }

    pub fn set_ad_blocking_enabled(&mut self, enabled: bool, now: DateTime<Utc>) -> Transition {
        self.settings.ad_blocking_enabled = enabled;
        self.setting_changed(Setting::AdBlocking, enabled, now)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn setting_changed(&mut self, setting: Setting, enabled: bool, now: DateTime<Utc>) -> Transition {
        let mut transition = Transition {
            events: vec![Event::SettingChanged {
                setting,
                enabled,
                at: now,
            }],
            changed: Changed {
                balance: false,
                settings: true,
            },
        };
        self.recompute_eligibility(now, &mut transition);
        transition
    }

    fn recompute_eligibility(&mut self, now: DateTime<Utc>, transition: &mut Transition) {
        let next = if policy::is_ad_eligible(&self.settings, now) {
            AdOffer::Eligible
        } else {
            AdOffer::Idle
        };
        if self.offer == AdOffer::Idle && next == AdOffer::Eligible {
            transition.events.push(Event::AdEligible {
                browsing_minutes: self.settings.browsing_minutes,
                at: now,
            });
        }
        self.offer = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::incentive::policy::{ad_cooldown, MIN_SESSION_MINUTES};
    use chrono::Duration;
    use proptest::prelude::*;

    fn start() -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH + Duration::days(20_000)
    }

    fn engine_with_balance(balance: u64) -> IncentiveEngine {
        IncentiveEngine::new(
            TokenAccount { balance },
            IncentiveSettings::default(),
            start(),
        )
    }

    #[test]
    fn reward_cycle_scenario() {
        let mut engine = IncentiveEngine::new(
            TokenAccount::default(),
            IncentiveSettings::default(),
            start(),
        );
        let mut now = start();

        for _ in 0..5 {
            now += Duration::minutes(1);
            engine.record_activity(now);
        }
        assert!(engine.is_ad_eligible());

        let t = engine.earn(now);
        assert_eq!(engine.balance(), 5);
        assert_eq!(engine.settings().browsing_minutes, 0);
        assert!(!engine.is_ad_eligible());
        assert!(t.changed.balance && t.changed.settings);

        for _ in 0..4 {
            now += Duration::minutes(1);
            engine.record_activity(now);
        }
        assert!(!engine.is_ad_eligible());

        now += Duration::minutes(1);
        engine.record_activity(now);
        assert!(!engine.is_ad_eligible(), "cooldown has not elapsed yet");
    }

    #[test]
    fn eligibility_event_fires_once_per_episode() {
        let mut engine = engine_with_balance(0);
        let now = start();
        for _ in 0..4 {
            engine.record_activity(now);
        }
        let fifth = engine.record_activity(now);
        assert!(matches!(fifth.events.last(), Some(Event::AdEligible { browsing_minutes: 5, .. })));

        let sixth = engine.record_activity(now);
        assert_eq!(sixth.events.len(), 1, "already eligible, no second AdEligible");
    }

    #[test]
    fn cooldown_boundary_is_strict() {
        let mut engine = engine_with_balance(0);
        let shown = start();
        engine.dismiss(shown);
        for _ in 0..MIN_SESSION_MINUTES {
            engine.record_activity(shown);
        }
        assert!(!engine.is_ad_eligible());

        engine.request_ad(shown + ad_cooldown());
        assert!(!engine.is_ad_eligible(), "exactly 30 minutes is not enough");

        let t = engine.request_ad(shown + ad_cooldown() + Duration::seconds(1));
        assert!(engine.is_ad_eligible());
        assert_eq!(t.changed, Changed::default());
        assert!(matches!(t.events.as_slice(), [Event::AdEligible { .. }]));
    }

    #[test]
    fn dismiss_restarts_cooldown_but_keeps_counter() {
        let mut engine = engine_with_balance(3);
        let now = start();
        for _ in 0..6 {
            engine.record_activity(now);
        }
        assert!(engine.is_ad_eligible());

        engine.dismiss(now);
        assert!(!engine.is_ad_eligible());
        assert_eq!(engine.settings().browsing_minutes, 6);
        assert_eq!(engine.balance(), 3);
        assert_eq!(engine.settings().last_ad_display_at, now);
        assert_eq!(
            engine.settings().last_token_earn_at,
            DateTime::<Utc>::UNIX_EPOCH
        );
    }

    #[test]
    fn disabling_tokens_hides_eligible_offer_immediately() {
        let mut engine = engine_with_balance(0);
        let now = start();
        for _ in 0..5 {
            engine.record_activity(now);
        }
        assert!(engine.is_ad_eligible());

        engine.set_tokens_enabled(false, now);
        assert!(!engine.is_ad_eligible());
        assert_eq!(engine.offer(), AdOffer::Idle);

        let t = engine.set_tokens_enabled(true, now);
        assert!(engine.is_ad_eligible());
        assert!(matches!(t.events.last(), Some(Event::AdEligible { .. })));
    }

    #[test]
    fn ad_blocking_toggle_does_not_affect_eligibility() {
        let mut engine = engine_with_balance(0);
        let now = start();
        for _ in 0..5 {
            engine.record_activity(now);
        }
        let t = engine.set_ad_blocking_enabled(false, now);
        assert!(engine.is_ad_eligible());
        assert!(!engine.settings().ad_blocking_enabled);
        assert!(t.changed.settings && !t.changed.balance);
    }

    #[test]
    fn double_earn_adds_twice_the_reward() {
        let mut engine = engine_with_balance(10);
        let now = start();
        let first = engine.earn(now);
        assert!(!engine.is_ad_eligible());
        let second = engine.earn(now);
        assert!(!engine.is_ad_eligible());
        assert_eq!(engine.balance(), 10 + 2 * REWARD_TOKENS);
        for t in [first, second] {
            assert!(!t.events.iter().any(|e| matches!(e, Event::AdEligible { .. })));
        }
    }

    #[test]
    fn spend_more_than_balance_fails_without_mutation() {
        let mut engine = engine_with_balance(5);
        let err = engine.spend(10, start()).unwrap_err();
        assert_eq!(
            err,
            SpendError::InsufficientBalance {
                balance: 5,
                requested: 10
            }
        );
        assert_eq!(engine.balance(), 5);
    }

    #[test]
    fn spend_zero_is_invalid() {
        let mut engine = engine_with_balance(5);
        assert_eq!(engine.spend(0, start()), Err(SpendError::InvalidAmount));
        assert_eq!(engine.balance(), 5);
    }

    #[test]
    fn spend_exact_balance_empties_account() {
        let mut engine = engine_with_balance(5);
        let t = engine.spend(5, start()).unwrap();
        assert_eq!(engine.balance(), 0);
        assert!(t.changed.balance && !t.changed.settings);
    }

    #[test]
    fn reset_keeps_settings() {
        let mut engine = engine_with_balance(42);
        let now = start();
        engine.set_tokens_enabled(false, now);
        engine.record_activity(now);
        let before = engine.settings().clone();

        let t = engine.reset(now);
        assert_eq!(engine.balance(), 0);
        assert_eq!(engine.settings(), &before);
        assert!(matches!(
            t.events.as_slice(),
            [Event::BalanceReset { previous_balance: 42, .. }]
        ));
    }

    #[test]
    fn loaded_state_is_evaluated_on_construction() {
        let settings = IncentiveSettings {
            browsing_minutes: 9,
            ..IncentiveSettings::default()
        };
        let engine = IncentiveEngine::new(TokenAccount::default(), settings, start());
        assert!(engine.is_ad_eligible());
        assert!(engine.snapshot().ad_eligible);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Activity,
        Earn,
        Dismiss,
        Spend(u64),
        Reset,
        Tokens(bool),
        Advance(i64),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            4 => Just(Op::Activity),
            1 => Just(Op::Earn),
            1 => Just(Op::Dismiss),
            1 => (0u64..30).prop_map(Op::Spend),
            1 => Just(Op::Reset),
            1 => any::<bool>().prop_map(Op::Tokens),
            2 => (0i64..45).prop_map(Op::Advance),
        ]
    }

    proptest! {
        #[test]
        fn invariants_hold_for_any_command_sequence(ops in proptest::collection::vec(op(), 0..60)) {
            let mut engine = engine_with_balance(0);
            let mut now = start();
            let mut minutes_since_earn = 0u32;

            for op in ops {
                let before = engine.balance();
                match op {
                    Op::Activity => {
                        engine.record_activity(now);
                        minutes_since_earn += 1;
                    }
                    Op::Earn => {
                        engine.earn(now);
                        minutes_since_earn = 0;
                        prop_assert_eq!(engine.balance(), before + REWARD_TOKENS);
                    }
                    Op::Dismiss => {
                        engine.dismiss(now);
                    }
                    Op::Spend(amount) => match engine.spend(amount, now) {
                        Ok(_) => prop_assert_eq!(engine.balance(), before - amount),
                        Err(_) => prop_assert_eq!(engine.balance(), before),
                    },
                    Op::Reset => {
                        engine.reset(now);
                        prop_assert_eq!(engine.balance(), 0);
                    }
                    Op::Tokens(enabled) => {
                        engine.set_tokens_enabled(enabled, now);
                    }
                    Op::Advance(minutes) => {
                        now += Duration::minutes(minutes);
                        engine.request_ad(now);
                    }
                }

                prop_assert_eq!(engine.settings().browsing_minutes, minutes_since_earn);
                prop_assert_eq!(
                    engine.is_ad_eligible(),
                    policy::is_ad_eligible(engine.settings(), now)
                );
            }
        }
    }
}
