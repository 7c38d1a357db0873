//! Periodic REST reconciliation: the exchange is the source of truth.
//!
//! Local tracking drifts: a fill raced a cancel, a response got lost, the
//! socket dropped. Every `reconcile_every` ticks (and on demand when the
//! feed goes stale) the tracked book is compared against `open_orders`:
//! orphans (resting on the exchange, unknown locally) are cancelled, ghosts
//! (tracked locally, gone on the exchange) are dropped. Balances and the
//! rate-limit budget are overwritten from exchange truth at the same time.

use std::collections::HashSet;

use tracing::{info, warn};

use crate::errors::Result;

use super::super::differ::OrderDiff;
use super::super::emitter::BulkExecutor;
use super::MarketMaker;

impl<E: BulkExecutor> MarketMaker<E> {
    pub(crate) async fn reconcile(&mut self) -> Result<()> {
        // Orders.
        let open_orders = self.info_client.open_orders(self.user_address).await?;
        let exchange_oids: HashSet<u64> = open_orders
            .iter()
            .filter(|o| o.coin == self.coin)
            .map(|o| o.oid)
            .collect();
        let n_exchange = exchange_oids.len();

        let result = self.order_state.reconcile(&exchange_oids);

        if !result.orphaned.is_empty() {
            warn!(n = result.orphaned.len(), "cancelling orphaned orders");
            let cancels = OrderDiff::cancels_only(result.orphaned.iter().copied().collect());
            self.emitter
                .emit(cancels, &mut self.rate_limit, &mut self.order_state)
                .await;
        }
        if !result.ghost.is_empty() {
            info!(n = result.ghost.len(), "removing ghost orders");
            for oid in &result.ghost {
                self.order_state.remove_ghost(*oid);
            }
        }

        // Balances.
        let balances = self.info_client.user_token_balances(self.user_address).await?;
        let mut token = 0.0;
        let mut usdc = 0.0;
        for balance in balances.balances {
            if balance.coin == self.base_token {
                token = balance.total.parse().unwrap_or(0.0);
            } else if balance.coin == "USDC" {
                usdc = balance.total.parse().unwrap_or(0.0);
            }
        }
        self.inventory.on_balance_update(token, usdc);

        // Budget: overwrite local drift with exchange truth. Failure here is
        // non-fatal, the local model keeps running until the next pass.
        match self.info_client.user_rate_limit(self.user_address).await {
            Ok(limits) => {
                self.rate_limit
                    .sync_from_exchange(limits.cum_vlm.parse().unwrap_or(0.0), limits.n_requests_used);
            }
            Err(e) => warn!(error = %e, "rate limit re-sync failed"),
        }

        info!(
            state_orders = self.order_state.len(),
            exchange_orders = n_exchange,
            orphans = result.orphaned.len(),
            ghosts = result.ghost.len(),
            token,
            usdc,
            "reconciliation complete"
        );
        Ok(())
    }
}
