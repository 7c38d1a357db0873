//! Subscriptions, the main `select!` loop, and the tick pipeline.

use std::time::Duration;

use hyperliquid_rust_sdk::{Message, Subscription};
use tokio::sync::mpsc::unbounded_channel;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::errors::Result;
use crate::helpers::to_h160;

use super::super::differ::compute_diff;
use super::super::emitter::BulkExecutor;
use super::super::quoting::compute_desired_orders;
use super::MarketMaker;

/// With no WebSocket traffic for this long, force a reconciliation.
const WS_STALE_AFTER: Duration = Duration::from_secs(60);

impl<E: BulkExecutor> MarketMaker<E> {
    /// Subscribe to all feeds and run the tick loop until shutdown.
    pub async fn run(&mut self) -> Result<()> {
        // One channel feeds every subscription; the loop below is the only
        // consumer and the only place shared state is touched.
        let (sender, mut receiver) = unbounded_channel::<Message>();

        self.info_client
            .subscribe(
                Subscription::OrderUpdates {
                    user: to_h160(self.user_address),
                },
                sender.clone(),
            )
            .await?;
        self.info_client
            .subscribe(
                Subscription::UserFills {
                    user: to_h160(self.user_address),
                },
                sender.clone(),
            )
            .await?;
        self.info_client
            .subscribe(
                Subscription::WebData2 {
                    user: to_h160(self.user_address),
                },
                sender.clone(),
            )
            .await?;
        self.info_client
            .subscribe(Subscription::AllMids, sender.clone())
            .await?;
        self.info_client
            .subscribe(
                Subscription::L2Book {
                    coin: self.coin.clone(),
                },
                sender.clone(),
            )
            .await?;
        drop(sender);

        let mut tick_interval =
            tokio::time::interval(Duration::from_secs_f64(self.config.tuning.interval_s));
        // An emit that outruns the interval delays the next tick, it never
        // stacks a burst of catch-up ticks.
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(coin = %self.coin, interval_s = self.config.tuning.interval_s, "market maker running");

        loop {
            tokio::select! {
                maybe_message = receiver.recv() => match maybe_message {
                    Some(message) => {
                        self.handle_message(message);
                    }
                    None => {
                        warn!("websocket channel closed, stopping");
                        break;
                    }
                },

                _ = tick_interval.tick() => {
                    self.tick_count += 1;

                    if self.last_ws_event.elapsed() > WS_STALE_AFTER {
                        warn!(
                            stale_secs = self.last_ws_event.elapsed().as_secs(),
                            "no websocket traffic, forcing reconciliation"
                        );
                        self.last_ws_event = std::time::Instant::now();
                        if let Err(e) = self.reconcile().await {
                            error!(error = %e, "forced reconciliation failed");
                        }
                    }

                    self.tick().await;

                    if self.tick_count % self.config.tuning.reconcile_every == 0 {
                        if let Err(e) = self.reconcile().await {
                            error!(error = %e, "reconciliation failed");
                        }
                    }
                },

                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown signal received");
                    break;
                }
            }
        }

        Ok(())
    }

    /// One iteration of the quoting pipeline.
    pub(crate) async fn tick(&mut self) {
        self.boundary_level = self.compute_boundary_level();

        let desired = compute_desired_orders(
            &self.grid,
            self.boundary_level,
            self.inventory.effective_token(),
            self.inventory.effective_usdc(),
            self.config.strategy.order_sz,
            self.config.tuning.min_notional,
        );
        let current = self.order_state.snapshot();
        let diff = compute_diff(
            &desired,
            &current,
            self.config.tuning.dead_zone_bps,
            self.config.tuning.price_tolerance_bps,
            self.config.tuning.size_tolerance_pct,
        );

        let result = self
            .emitter
            .emit(diff, &mut self.rate_limit, &mut self.order_state)
            .await;

        info!(
            tick = self.tick_count,
            boundary = self.boundary_level,
            desired = desired.len(),
            current = current.len(),
            placed = result.n_placed,
            modified = result.n_modified,
            cancelled = result.n_cancelled,
            errors = result.n_errors,
            cancel_only = result.cancel_only_mode,
            state_orders = self.order_state.len(),
            status = %self.rate_limit.status_line(),
            "tick"
        );
    }
}
