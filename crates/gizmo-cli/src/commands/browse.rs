use std::sync::Arc;

use clap::Args;
use gizmo_core::{ActivityReporter, Config};
use tracing::info;

use super::{open_service, print_json};

#[derive(Args)]
pub struct BrowseArgs {
    /// Activity minutes to report before stopping
    #[arg(long, default_value_t = 5)]
    pub minutes: u32,
}

/// Run the activity reporter for a fixed number of ticks.
///
/// Each tick lasts `activity.tick_secs` seconds of real time.
pub async fn run(args: BrowseArgs, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let service = open_service(config).await?;
    let mut updates = service.subscribe();
    let target = updates
        .borrow_and_update()
        .browsing_minutes
        .saturating_add(args.minutes);
    let mut was_eligible = service.is_ad_eligible();

    let reporter = ActivityReporter::start(Arc::clone(&service), config.activity.tick());
    while service.snapshot().browsing_minutes < target {
        updates.changed().await?;
        let snapshot = updates.borrow_and_update().clone();
        eprintln!("browsing: {} minute(s) recorded", snapshot.browsing_minutes);
        if snapshot.ad_eligible && !was_eligible {
            info!(browsing_minutes = snapshot.browsing_minutes, "ad offer available");
            eprintln!("an ad is ready: run `gizmo-cli tokens earn` or `gizmo-cli tokens dismiss`");
        }
        was_eligible = snapshot.ad_eligible;
    }
    reporter.stop();

    service.flush().await;
    print_json(&service.snapshot())
}
