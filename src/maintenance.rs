//! Periodic maintenance, standing in for an external job scheduler.
//!
//! Only the empty-cart reaper runs on a timer; the price-bump job is
//! operator-triggered over HTTP.

use std::time::Duration;

use crate::events::StoreEvent;
use crate::{store, AppState};

pub fn spawn(state: AppState) {
    let interval = Duration::from_secs(state.config.reaper_interval_secs);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match store::carts::reap_empty_carts(&state.db).await {
                Ok(0) => {}
                Ok(count) => {
                    tracing::info!(count, "reaped empty carts");
                    state
                        .events
                        .publish(StoreEvent::EmptyCartsReaped { count })
                        .await;
                }
                Err(e) => tracing::warn!(error = %e, "empty-cart reaper failed"),
            }
        }
    });
}
