use clap::Subcommand;
use gizmo_core::{Config, CoreError, SpendError};
use serde_json::json;

use super::{finish, open_service, print_json};

#[derive(Subcommand)]
pub enum TokensAction {
    /// Print balance, settings and ad eligibility as JSON
    Status,
    /// Record completed minutes of active browsing
    Activity {
        /// Number of whole minutes to record
        #[arg(long, default_value_t = 1)]
        minutes: u32,
    },
    /// Re-check whether an ad may be shown now
    RequestAd,
    /// Reward a watched ad
    Earn,
    /// Close the ad offer without a reward
    Dismiss,
    /// Spend tokens
    Spend {
        /// Tokens to debit; must not exceed the balance
        amount: u64,
    },
    /// Zero the balance (settings are kept)
    Reset,
}

pub async fn run(action: TokensAction, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let service = open_service(config).await?;

    match action {
        TokensAction::Status => {
            print_json(&service.snapshot())?;
        }
        TokensAction::Activity { minutes } => {
            let mut events = Vec::new();
            for _ in 0..minutes {
                events.extend(service.record_activity());
            }
            finish(&service, events).await?;
        }
        TokensAction::RequestAd => {
            let eligible = service.request_ad();
            print_json(&json!({ "ad_eligible": eligible, "state": service.snapshot() }))?;
        }
        TokensAction::Earn => {
            let events = service.earn();
            finish(&service, events).await?;
        }
        TokensAction::Dismiss => {
            let events = service.dismiss();
            finish(&service, events).await?;
        }
        TokensAction::Spend { amount } => match service.spend(amount) {
            Ok(events) => finish(&service, events).await?,
            Err(e) => {
                let reason = match e {
                    SpendError::InsufficientBalance { .. } => "insufficient_balance",
                    SpendError::InvalidAmount => "invalid_amount",
                };
                print_json(&json!({
                    "type": "SpendRejected",
                    "reason": reason,
                    "requested": amount,
                    "balance": service.balance(),
                }))?;
                return Err(Box::new(CoreError::Spend(e)));
            }
        },
        TokensAction::Reset => {
            let events = service.reset();
            finish(&service, events).await?;
        }
    }
    Ok(())
}
