//! Orchestrator: startup seeding, subscription routing, tick loop and
//! periodic reconciliation.
//!
//! Split into submodules:
//! - `event_loop`: subscriptions, the `select!` loop, the tick pipeline
//! - `handlers`: WebSocket message handlers
//! - `reconcile`: REST-based state reconciliation
//!
//! All mutable state lives on this struct and is only touched from the
//! event loop; WebSocket callbacks reach it exclusively through the message
//! channel, so no locking is needed anywhere in the pipeline.

mod event_loop;
mod handlers;
mod reconcile;

#[cfg(test)]
mod tests;

use std::time::Instant;

use alloy::primitives::Address;
use hyperliquid_rust_sdk::InfoClient;
use tracing::info;

use crate::consts::SPOT_ASSET_OFFSET;
use crate::errors::{MakerError, Result};
use crate::helpers::to_h160;

use super::config::MakerConfig;
use super::emitter::{BatchEmitter, BulkExecutor};
use super::grid::{PricingGrid, DEFAULT_TICK};
use super::inventory::Inventory;
use super::order_state::{OrderState, Side};
use super::rate_limit::RateLimitBudget;

/// The running market maker for a single spot market.
pub struct MarketMaker<E> {
    pub(crate) config: MakerConfig,
    pub(crate) info_client: InfoClient,
    pub(crate) user_address: Address,
    /// Spot pair name, resolved once from config.
    pub(crate) coin: String,
    /// Base token name, for balance rows (e.g. "PURR" for "PURR/USDC").
    pub(crate) base_token: String,
    /// Spot asset id (`spot_index + 10_000`), resolved from metadata.
    pub(crate) asset_id: u32,
    pub(crate) grid: PricingGrid,
    pub(crate) inventory: Inventory,
    pub(crate) order_state: OrderState,
    pub(crate) rate_limit: RateLimitBudget,
    pub(crate) emitter: BatchEmitter<E>,
    /// Lowest ask level; everything strictly below is a bid candidate.
    pub(crate) boundary_level: usize,
    pub(crate) tick_count: u64,
    /// Timestamp of the last WebSocket message, for the staleness fallback.
    pub(crate) last_ws_event: Instant,
}

impl<E: BulkExecutor> MarketMaker<E> {
    /// Build and seed a market maker from exchange state.
    ///
    /// Resolves the asset id and base token from spot metadata, constructs
    /// the grid, then seeds order state, inventory and the rate-limit budget
    /// from REST. Fails fast on any startup error; the process owner decides
    /// whether to retry.
    pub async fn new(
        config: MakerConfig,
        info_client: InfoClient,
        executor: E,
        user_address: Address,
    ) -> Result<Self> {
        config.validate()?;
        let coin = config.market.coin.clone();

        // Resolve coin → asset id and base token name for balance lookups.
        let spot_meta = info_client.spot_meta().await?;
        let spot_entry = spot_meta
            .universe
            .iter()
            .find(|entry| entry.name == coin)
            .ok_or_else(|| MakerError::CoinNotFound(coin.clone()))?;
        let asset_id = spot_entry.index as u32 + SPOT_ASSET_OFFSET;
        let base_token_index = spot_entry.tokens[0];
        let base_token = spot_meta
            .tokens
            .iter()
            .find(|token| token.index == base_token_index)
            .map(|token| token.name.clone())
            .ok_or_else(|| MakerError::CoinNotFound(coin.clone()))?;

        let grid = PricingGrid::new(config.strategy.start_px, config.strategy.n_orders, DEFAULT_TICK)?;

        // Seed order state from resting orders; rows that don't map onto the
        // grid belong to some other session and are left for reconciliation.
        let mut order_state = OrderState::new();
        let open_orders = info_client.open_orders(user_address).await?;
        for order in open_orders.iter().filter(|o| o.coin == coin) {
            let px: f64 = order.limit_px.parse().unwrap_or(0.0);
            let sz: f64 = order.sz.parse().unwrap_or(0.0);
            let Some(side) = Side::parse(&order.side) else {
                continue;
            };
            if let Some(level) = grid.level_for_price(px) {
                order_state.on_place_confirmed(order.oid, side, level, px, sz);
            }
        }

        // Seed inventory from spot balances.
        let balances = info_client.user_token_balances(user_address).await?;
        let mut account_token = 0.0;
        let mut account_usdc = 0.0;
        for balance in balances.balances {
            if balance.coin == base_token {
                account_token = balance.total.parse().unwrap_or(0.0);
            } else if balance.coin == "USDC" {
                account_usdc = balance.total.parse().unwrap_or(0.0);
            }
        }
        let inventory = Inventory::new(
            config.allocation.allocated_token,
            config.allocation.allocated_usdc,
            account_token,
            account_usdc,
        );

        // Seed the budget from exchange truth.
        let mut rate_limit = RateLimitBudget::new();
        let limits = info_client.user_rate_limit(user_address).await?;
        rate_limit.sync_from_exchange(
            limits.cum_vlm.parse().unwrap_or(0.0),
            limits.n_requests_used,
        );

        let emitter = BatchEmitter::new(coin.clone(), executor);

        let mut maker = Self {
            config,
            info_client,
            user_address,
            coin,
            base_token,
            asset_id,
            grid,
            inventory,
            order_state,
            rate_limit,
            emitter,
            boundary_level: 0,
            tick_count: 0,
            last_ws_event: Instant::now(),
        };
        maker.boundary_level = maker.compute_boundary_level();

        info!(
            coin = %maker.coin,
            asset_id = maker.asset_id,
            boundary = maker.boundary_level,
            seeded_orders = maker.order_state.len(),
            token = maker.inventory.effective_token(),
            usdc = maker.inventory.effective_usdc(),
            "startup seeding complete"
        );
        Ok(maker)
    }

    /// Derive the boundary level from current state.
    ///
    /// The boundary is the lowest resting ask. With no asks: the configured
    /// seed when set, otherwise the level count the allocated token balance
    /// would fill, so a fully-sold book quotes bids across the whole grid.
    pub(crate) fn compute_boundary_level(&self) -> usize {
        let lowest_ask = self
            .order_state
            .orders()
            .filter(|o| o.side == Side::Sell)
            .map(|o| o.level_index)
            .min();
        match lowest_ask {
            Some(level) => level,
            None if self.config.strategy.n_seeded_levels > 0 => self.config.strategy.n_seeded_levels,
            None => {
                let tranches =
                    (self.config.allocation.allocated_token / self.config.strategy.order_sz).round();
                (tranches as usize).min(self.grid.len())
            }
        }
    }
}
