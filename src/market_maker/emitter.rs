//! Budget-aware, prioritized batch order emission.
//!
//! The only module that performs exchange I/O for order mutations. An
//! [`OrderDiff`] is executed as at most three batch calls (cancels, then
//! modifies, then places), each costing a single request against the
//! rate-limit budget regardless of batch size. When the budget cannot cover
//! the tick plus a safety margin the emitter degrades to cancel-only mode;
//! when a tick wants more than the per-tick mutation cap, places are trimmed
//! first, then modifies, and cancels never.
//!
//! Every order goes out with ALO time-in-force so an order that would cross
//! the book is rejected by the exchange instead of taking.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use hyperliquid_rust_sdk::{
    ClientCancelRequest, ClientLimit, ClientModifyRequest, ClientOrder, ClientOrderRequest,
    ExchangeClient, ExchangeDataStatus, ExchangeResponseStatus,
};
use tracing::{debug, warn};

use crate::errors::Result;

use super::differ::OrderDiff;
use super::order_state::{OrderState, Side};
use super::quoting::DesiredOrder;
use super::rate_limit::RateLimitBudget;

/// Budget headroom required to emit anything beyond cancels.
pub(crate) const EMIT_SAFETY_MARGIN: u64 = 100;
/// Hard cap on individual mutations per tick.
pub(crate) const MAX_MUTATIONS_PER_TICK: usize = 20;
/// Cooldown after an "Insufficient spot balance" rejection.
const BALANCE_COOLDOWN: Duration = Duration::from_secs(60);
/// Cooldown after a run of generic rejections.
const REJECT_COOLDOWN: Duration = Duration::from_secs(10);
/// Generic rejections in a row before the side cools down.
const CONSECUTIVE_REJECT_THRESHOLD: u32 = 3;

const ALO_TIF: &str = "Alo";

/// True when the error text is the exchange refusing an ALO order that would
/// have crossed the spread. Expected under this strategy, never escalated.
fn is_alo_rejection(error: &str) -> bool {
    error.contains("Post-only would take")
}

/// Summary of a single `emit` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitResult {
    pub n_cancelled: usize,
    pub n_modified: usize,
    pub n_placed: usize,
    pub n_errors: usize,
    pub cancel_only_mode: bool,
}

/// The three batch endpoints the emitter needs from the exchange.
///
/// Abstracted behind a trait so tests can script responses without a
/// network; [`HyperliquidExecutor`] is the production implementation.
#[async_trait]
pub trait BulkExecutor: Send + Sync {
    async fn bulk_place(&self, orders: Vec<ClientOrderRequest>) -> Result<ExchangeResponseStatus>;
    async fn bulk_modify(
        &self,
        modifies: Vec<ClientModifyRequest>,
    ) -> Result<ExchangeResponseStatus>;
    async fn bulk_cancel(
        &self,
        cancels: Vec<ClientCancelRequest>,
    ) -> Result<ExchangeResponseStatus>;
}

/// Production executor backed by the SDK's `ExchangeClient`.
pub struct HyperliquidExecutor {
    client: ExchangeClient,
}

impl HyperliquidExecutor {
    pub fn new(client: ExchangeClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BulkExecutor for HyperliquidExecutor {
    async fn bulk_place(&self, orders: Vec<ClientOrderRequest>) -> Result<ExchangeResponseStatus> {
        Ok(self.client.bulk_order(orders, None).await?)
    }

    async fn bulk_modify(
        &self,
        modifies: Vec<ClientModifyRequest>,
    ) -> Result<ExchangeResponseStatus> {
        Ok(self.client.bulk_modify(modifies, None).await?)
    }

    async fn bulk_cancel(
        &self,
        cancels: Vec<ClientCancelRequest>,
    ) -> Result<ExchangeResponseStatus> {
        Ok(self.client.bulk_cancel(cancels, None).await?)
    }
}

/// Extract the per-order statuses from a batch response.
///
/// An API-level rejection yields no statuses; callers treat missing entries
/// per their own rules.
fn parse_statuses(response: ExchangeResponseStatus) -> Vec<ExchangeDataStatus> {
    match response {
        ExchangeResponseStatus::Ok(resp) => resp.data.map(|d| d.statuses).unwrap_or_default(),
        ExchangeResponseStatus::Err(e) => {
            warn!(error = %e, "batch request rejected by exchange");
            Vec::new()
        }
    }
}

/// Budget-gated, prioritized batch order emitter for one spot market.
pub struct BatchEmitter<E> {
    coin: String,
    executor: E,
    /// Per-side cooldown expiry; entries are lazily removed once expired.
    cooldowns: HashMap<Side, Instant>,
    consecutive_rejects: HashMap<Side, u32>,
}

impl<E: BulkExecutor> BatchEmitter<E> {
    pub fn new(coin: impl Into<String>, executor: E) -> Self {
        Self {
            coin: coin.into(),
            executor,
            cooldowns: HashMap::new(),
            consecutive_rejects: HashMap::new(),
        }
    }

    fn is_cooled_down(&mut self, side: Side, now: Instant) -> bool {
        match self.cooldowns.get(&side) {
            Some(&expiry) if now < expiry => true,
            Some(_) => {
                self.cooldowns.remove(&side);
                false
            }
            None => false,
        }
    }

    fn set_cooldown(&mut self, side: Side, duration: Duration) {
        self.cooldowns.insert(side, Instant::now() + duration);
    }

    fn clear_cooldown(&mut self, side: Side) {
        self.cooldowns.remove(&side);
    }

    fn order_request(&self, desired: &DesiredOrder) -> ClientOrderRequest {
        ClientOrderRequest {
            asset: self.coin.clone(),
            is_buy: desired.side == Side::Buy,
            reduce_only: false,
            limit_px: desired.price,
            sz: desired.size,
            cloid: None,
            order_type: ClientOrder::Limit(ClientLimit {
                tif: ALO_TIF.to_string(),
            }),
        }
    }

    /// Execute an [`OrderDiff`] against the exchange.
    ///
    /// Flow: cooldown filter → budget gate → priority trim → cross-side
    /// assertion → cancels → modifies → places. The order state and budget
    /// are mutated in place as responses come back.
    pub async fn emit(
        &mut self,
        diff: OrderDiff,
        budget: &mut RateLimitBudget,
        state: &mut OrderState,
    ) -> EmitResult {
        if diff.is_empty() {
            return EmitResult::default();
        }

        let OrderDiff {
            mut modifies,
            mut places,
            cancels,
        } = diff;

        // Cooldown filter on new placements.
        let now = Instant::now();
        let buy_cooled = self.is_cooled_down(Side::Buy, now);
        let sell_cooled = self.is_cooled_down(Side::Sell, now);
        places.retain(|p| match p.side {
            Side::Buy => !buy_cooled,
            Side::Sell => !sell_cooled,
        });

        // Budget gate: without headroom for the whole tick plus margin,
        // fall back to freeing levels only.
        let total = cancels.len() + modifies.len() + places.len();
        let cancel_only = budget.remaining() < total as u64 + EMIT_SAFETY_MARGIN;
        if cancel_only {
            warn!(
                remaining = budget.remaining(),
                wanted = total,
                "rate-limit budget low, entering cancel-only mode"
            );
            modifies.clear();
            places.clear();
        } else {
            // Per-tick cap: trim places first, then modifies, never cancels.
            let total = cancels.len() + modifies.len() + places.len();
            if total > MAX_MUTATIONS_PER_TICK {
                let room = MAX_MUTATIONS_PER_TICK.saturating_sub(cancels.len());
                if room == 0 {
                    modifies.clear();
                    places.clear();
                } else if modifies.len() <= room {
                    places.truncate(room - modifies.len());
                } else {
                    modifies.truncate(room);
                    places.clear();
                }
            }
        }

        // The exchange silently rejects cross-side modifies; reaching this
        // point with one means the differ's keying is broken.
        for (oid, desired) in &modifies {
            if let Some(tracked) = state.get(*oid) {
                assert_eq!(
                    tracked.side, desired.side,
                    "cross-side modify attempted for oid={oid}"
                );
            }
        }

        let mut result = EmitResult {
            cancel_only_mode: cancel_only,
            ..EmitResult::default()
        };

        if !cancels.is_empty() {
            let (ok, err) = self.execute_cancels(&cancels, budget, state).await;
            result.n_cancelled += ok;
            result.n_errors += err;
        }
        if !modifies.is_empty() {
            let (ok, err) = self.execute_modifies(&modifies, budget, state).await;
            result.n_modified += ok;
            result.n_errors += err;
        }
        if !places.is_empty() {
            let (ok, err) = self.execute_places(&places, budget, state).await;
            result.n_placed += ok;
            result.n_errors += err;
        }

        result
    }

    async fn execute_cancels(
        &mut self,
        oids: &[u64],
        budget: &mut RateLimitBudget,
        state: &mut OrderState,
    ) -> (usize, usize) {
        let reqs = oids
            .iter()
            .map(|&oid| ClientCancelRequest {
                asset: self.coin.clone(),
                oid,
            })
            .collect();

        let response = self.executor.bulk_cancel(reqs).await;
        budget.on_request(1);

        let statuses = match response {
            Ok(resp) => parse_statuses(resp),
            Err(e) => {
                // Transport failure: leave state alone, reconciliation heals.
                warn!(error = %e, "bulk cancel transport error");
                return (0, oids.len());
            }
        };

        let mut ok = 0;
        let mut err = 0;
        for (i, &oid) in oids.iter().enumerate() {
            match statuses.get(i) {
                Some(ExchangeDataStatus::Error(e)) => {
                    err += 1;
                    debug!(oid, error = %e, "cancel rejected");
                }
                _ => ok += 1,
            }
            // A cancel error means the order is already gone; either way it
            // must leave local state.
            state.remove_ghost(oid);
        }
        (ok, err)
    }

    async fn execute_modifies(
        &mut self,
        modifies: &[(u64, DesiredOrder)],
        budget: &mut RateLimitBudget,
        state: &mut OrderState,
    ) -> (usize, usize) {
        let reqs = modifies
            .iter()
            .map(|(oid, desired)| ClientModifyRequest {
                oid: *oid,
                order: self.order_request(desired),
            })
            .collect();

        let response = self.executor.bulk_modify(reqs).await;
        budget.on_request(1);

        let statuses = match response {
            Ok(resp) => parse_statuses(resp),
            Err(e) => {
                warn!(error = %e, "bulk modify transport error");
                return (0, modifies.len());
            }
        };

        let mut ok = 0;
        let mut err = 0;
        for (i, (original_oid, desired)) in modifies.iter().enumerate() {
            match statuses.get(i) {
                Some(ExchangeDataStatus::Resting(order)) => {
                    state.on_modify_response(*original_oid, Some(order.oid), "resting");
                    state.update_price_size(order.oid, desired.price, desired.size);
                    ok += 1;
                }
                Some(ExchangeDataStatus::Error(e)) => {
                    // "Cannot modify" marks a ghost and removes it inside
                    // on_modify_response; other errors leave the order for
                    // reconciliation.
                    state.on_modify_response(*original_oid, None, e);
                    err += 1;
                }
                other => {
                    warn!(oid = original_oid, status = ?other, "unhandled modify status");
                    state.remove_ghost(*original_oid);
                    err += 1;
                }
            }
        }
        (ok, err)
    }

    async fn execute_places(
        &mut self,
        places: &[DesiredOrder],
        budget: &mut RateLimitBudget,
        state: &mut OrderState,
    ) -> (usize, usize) {
        let reqs = places.iter().map(|d| self.order_request(d)).collect();

        let response = self.executor.bulk_place(reqs).await;
        budget.on_request(1);

        let statuses = match response {
            Ok(resp) => parse_statuses(resp),
            Err(e) => {
                warn!(error = %e, "bulk place transport error");
                return (0, places.len());
            }
        };

        let mut ok = 0;
        let mut err = 0;
        for (i, desired) in places.iter().enumerate() {
            match statuses.get(i) {
                Some(ExchangeDataStatus::Resting(order)) => {
                    state.on_place_confirmed(
                        order.oid,
                        desired.side,
                        desired.level_index,
                        desired.price,
                        desired.size,
                    );
                    self.clear_cooldown(desired.side);
                    self.consecutive_rejects.insert(desired.side, 0);
                    ok += 1;
                }
                Some(ExchangeDataStatus::Error(e)) => {
                    if e.contains("Insufficient spot balance") {
                        warn!(
                            side = desired.side.as_str(),
                            "insufficient balance, cooling side down"
                        );
                        self.set_cooldown(desired.side, BALANCE_COOLDOWN);
                    } else if is_alo_rejection(e) {
                        // The book moved through our level; retry next tick.
                        debug!(side = desired.side.as_str(), level = desired.level_index, "ALO cross rejection");
                    } else {
                        let count = self.consecutive_rejects.entry(desired.side).or_insert(0);
                        *count += 1;
                        warn!(side = desired.side.as_str(), count = *count, error = %e, "order rejected");
                        if *count >= CONSECUTIVE_REJECT_THRESHOLD {
                            *count = 0;
                            self.set_cooldown(desired.side, REJECT_COOLDOWN);
                        }
                    }
                    err += 1;
                }
                other => {
                    warn!(
                        side = desired.side.as_str(),
                        level = desired.level_index,
                        status = ?other,
                        "unhandled place status"
                    );
                    err += 1;
                }
            }
        }
        (ok, err)
    }
}
