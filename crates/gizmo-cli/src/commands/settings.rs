use clap::{Subcommand, ValueEnum};
use gizmo_core::Config;

use super::{finish, open_service};

#[derive(Clone, Copy, ValueEnum)]
pub enum Switch {
    On,
    Off,
}

impl From<Switch> for bool {
    fn from(switch: Switch) -> Self {
        matches!(switch, Switch::On)
    }
}

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Turn the token economy (and ad offers) on or off
    Tokens { state: Switch },
    /// Turn ad blocking on or off
    AdBlocking { state: Switch },
}

pub async fn run(action: SettingsAction, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let service = open_service(config).await?;
    let events = match action {
        SettingsAction::Tokens { state } => service.set_tokens_enabled(state.into()),
        SettingsAction::AdBlocking { state } => service.set_ad_blocking_enabled(state.into()),
    };
    finish(&service, events).await
}
