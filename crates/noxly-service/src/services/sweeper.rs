//! Background removal of pending usages left past their window

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use super::context::ServiceContext;
use super::redemption::RedemptionService;

/// Purge expired pending usages every `period` until the handle is aborted
pub fn spawn_usage_sweeper(ctx: ServiceContext, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(period_secs = period.as_secs(), "Usage sweeper started");

        loop {
            ticker.tick().await;
            match RedemptionService::new(&ctx).purge_expired().await {
                Ok(0) => {}
                Ok(purged) => info!(purged, "Expired pending usages removed"),
                Err(e) => warn!(error = %e, "Usage sweep failed"),
            }
        }
    })
}
