//! WebSocket message handlers.
//!
//! Every handler runs on the event loop; the SDK delivers messages over the
//! channel established in `run`, never by calling into us from its own
//! threads. Order updates and the synchronous batch responses for the same
//! action can arrive in either order; the order-state operations are
//! idempotent for exactly that reason.

use std::time::Instant;

use hyperliquid_rust_sdk::{Message, OrderUpdates, UserFills};
use tracing::{debug, info, warn};

use super::super::emitter::BulkExecutor;
use super::super::order_state::Side;
use super::MarketMaker;

impl<E: BulkExecutor> MarketMaker<E> {
    /// Route an incoming WebSocket message.
    pub(crate) fn handle_message(&mut self, message: Message) {
        self.last_ws_event = Instant::now();
        match message {
            Message::OrderUpdates(updates) => self.handle_order_updates(updates),
            Message::UserFills(fills) => self.handle_user_fills(fills),
            Message::WebData2(_) => {
                // Liveness signal only; authoritative balances come from
                // reconciliation because this payload carries none for spot.
                debug!("webData2 heartbeat");
            }
            Message::AllMids(_) | Message::L2Book(_) => {}
            Message::NoData => warn!("websocket reported no data"),
            _ => {}
        }
    }

    /// Track order lifecycle transitions reported by the exchange.
    ///
    /// The status lives at the top level of each update; the order body is
    /// nested under `order`.
    fn handle_order_updates(&mut self, updates: OrderUpdates) {
        for update in updates.data {
            if update.order.coin != self.coin {
                continue;
            }
            let oid = update.order.oid;

            match update.status.as_str() {
                "open" | "resting" => {
                    let Some(side) = Side::parse(&update.order.side) else {
                        continue;
                    };
                    let px: f64 = update.order.limit_px.parse().unwrap_or(0.0);
                    let sz: f64 = update.order.sz.parse().unwrap_or(0.0);
                    if let Some(level) = self.grid.level_for_price(px) {
                        self.order_state.on_place_confirmed(oid, side, level, px, sz);
                    } else {
                        debug!(oid, px, "resting order off-grid, not tracking");
                    }
                }
                "canceled" | "marginCanceled" => {
                    self.order_state.remove_ghost(oid);
                }
                status if status.contains("Cannot modify") => {
                    self.order_state.on_modify_response(oid, None, status);
                }
                _ => {}
            }
        }
    }

    /// Apply fills to order state, inventory and the rate-limit budget.
    ///
    /// Snapshot messages replay historical fills and are skipped outright;
    /// live duplicates (e.g. after a reconnect) die on tid dedup.
    fn handle_user_fills(&mut self, fills: UserFills) {
        if fills.data.is_snapshot.unwrap_or(false) {
            debug!(n = fills.data.fills.len(), "skipping fills snapshot");
            return;
        }
        for fill in fills.data.fills {
            if fill.coin != self.coin {
                continue;
            }
            let px: f64 = fill.px.parse().unwrap_or(0.0);
            let sz: f64 = fill.sz.parse().unwrap_or(0.0);

            let Some(result) = self.order_state.on_fill(fill.tid, fill.oid, sz) else {
                continue;
            };

            // Fill volume feeds the budget back before inventory shifts.
            self.rate_limit.on_fill(px * sz);
            match result.side {
                Side::Sell => self.inventory.on_ask_fill(px, sz),
                Side::Buy => self.inventory.on_bid_fill(px, sz),
            }

            info!(
                side = result.side.as_str(),
                oid = fill.oid,
                px,
                sz,
                fully_filled = result.fully_filled,
                token = self.inventory.effective_token(),
                usdc = self.inventory.effective_usdc(),
                "fill"
            );
        }
    }
}
