//! Single source of truth for resting orders.
//!
//! Orders are tracked under two indices at once: by exchange order id and by
//! grid slot `(side, level_index)`. The slot index is what the differ matches
//! on; the oid index is what fills and cancels arrive with. Every mutation
//! keeps the two in lockstep, including the OID swap a modify response can
//! carry.
//!
//! No I/O here: this module receives events, it never fetches them. Unknown
//! oids and replayed events are silent no-ops so the WebSocket stream and the
//! synchronous API responses can race each other safely.

use std::collections::{HashMap, HashSet};

use crate::consts::EPSILON;

/// Upper bound for the trade-id dedup set.
const SEEN_TIDS_CAP: usize = 5000;

/// Side of an order (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Convert from the exchange's side string ("B" or "A"/"S").
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "B" => Some(Side::Buy),
            "A" | "S" => Some(Side::Sell),
            _ => None,
        }
    }

    /// The opposite side.
    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Lowercase label for log lines.
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

/// Lifecycle status of a tracked order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderStatus {
    #[default]
    Resting,
    PendingPlace,
    PendingModify,
    PendingCancel,
}

/// A resting order tracked by the order state manager.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedOrder {
    pub oid: u64,
    pub side: Side,
    pub level_index: usize,
    pub price: f64,
    pub size: f64,
    pub status: OrderStatus,
}

impl TrackedOrder {
    /// Create a new tracked order in `Resting` state.
    pub fn new(oid: u64, side: Side, level_index: usize, price: f64, size: f64) -> Self {
        Self {
            oid,
            side,
            level_index,
            price,
            size,
            status: OrderStatus::Resting,
        }
    }
}

/// Returned by [`OrderState::on_fill`] so the caller can update inventory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillResult {
    pub side: Side,
    pub price: f64,
    pub size: f64,
    pub fully_filled: bool,
}

/// Result of reconciling tracked state against exchange state.
///
/// Orphans rest on the exchange but are untracked locally (candidates for
/// cancellation); ghosts are tracked locally but gone from the exchange
/// (candidates for removal). The caller decides what to do with each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileResult {
    pub orphaned: HashSet<u64>,
    pub ghost: HashSet<u64>,
}

/// Dual-indexed order tracker with fill dedup and reconciliation.
#[derive(Debug)]
pub struct OrderState {
    by_oid: HashMap<u64, TrackedOrder>,
    by_key: HashMap<(Side, usize), u64>,
    seen_tids: HashSet<u64>,
    seen_tids_cap: usize,
}

impl Default for OrderState {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderState {
    /// Create an empty tracker with the default dedup capacity.
    pub fn new() -> Self {
        Self::with_tid_capacity(SEEN_TIDS_CAP)
    }

    /// Create an empty tracker with a custom dedup capacity.
    pub fn with_tid_capacity(seen_tids_cap: usize) -> Self {
        Self {
            by_oid: HashMap::new(),
            by_key: HashMap::new(),
            seen_tids: HashSet::new(),
            seen_tids_cap,
        }
    }

    /// Record a newly confirmed resting order.
    ///
    /// If an order already occupies `(side, level_index)`, the prior occupant
    /// is evicted from both indices first. Replaying the same oid is
    /// idempotent.
    pub fn on_place_confirmed(
        &mut self,
        oid: u64,
        side: Side,
        level_index: usize,
        price: f64,
        size: f64,
    ) {
        let key = (side, level_index);
        if let Some(prior_oid) = self.by_key.get(&key) {
            self.by_oid.remove(prior_oid);
        }
        self.by_oid
            .insert(oid, TrackedOrder::new(oid, side, level_index, price, size));
        self.by_key.insert(key, oid);
    }

    /// Handle a modify response from the exchange.
    ///
    /// - `"resting"` with a changed oid → atomic re-key in the oid index;
    ///   the slot index is untouched.
    /// - a status containing `"Cannot modify"` → the order is a ghost
    ///   (already gone on the exchange); remove it from both indices.
    /// - unknown `original_oid` → no-op.
    pub fn on_modify_response(&mut self, original_oid: u64, new_oid: Option<u64>, status: &str) {
        if status.contains("Cannot modify") {
            self.remove_ghost(original_oid);
            return;
        }

        match new_oid {
            Some(new_oid) if new_oid != original_oid => {
                if let Some(mut order) = self.by_oid.remove(&original_oid) {
                    order.oid = new_oid;
                    order.status = OrderStatus::Resting;
                    self.by_key.insert((order.side, order.level_index), new_oid);
                    self.by_oid.insert(new_oid, order);
                }
            }
            _ => {
                if let Some(order) = self.by_oid.get_mut(&original_oid) {
                    order.status = OrderStatus::Resting;
                }
            }
        }
    }

    /// Refresh a tracked order's price and size after a confirmed modify.
    /// No-op for unknown oids.
    pub fn update_price_size(&mut self, oid: u64, price: f64, size: f64) {
        if let Some(order) = self.by_oid.get_mut(&oid) {
            order.price = price;
            order.size = size;
        }
    }

    /// Process a fill event, deduplicating by trade id.
    ///
    /// Returns the fill details on the first occurrence of a tid, or `None`
    /// for duplicates and unknown oids. Fully-filled orders leave both
    /// indices; partial fills reduce the tracked size in place.
    pub fn on_fill(&mut self, tid: u64, oid: u64, fill_sz: f64) -> Option<FillResult> {
        if !self.seen_tids.insert(tid) {
            return None;
        }
        if self.seen_tids.len() > self.seen_tids_cap {
            self.prune_seen_tids();
        }

        let (side, price, size) = {
            let order = self.by_oid.get(&oid)?;
            (order.side, order.price, order.size)
        };
        let fully_filled = fill_sz >= size - EPSILON;

        if fully_filled {
            if let Some(order) = self.by_oid.remove(&oid) {
                self.by_key.remove(&(order.side, order.level_index));
            }
        } else if let Some(order) = self.by_oid.get_mut(&oid) {
            order.size -= fill_sz;
        }

        Some(FillResult {
            side,
            price,
            size: fill_sz,
            fully_filled,
        })
    }

    /// Keep the newest half of seen tids (tids increase monotonically).
    fn prune_seen_tids(&mut self) {
        let mut tids: Vec<u64> = self.seen_tids.drain().collect();
        tids.sort_unstable();
        let half = tids.len() / 2;
        self.seen_tids = tids[half..].iter().copied().collect();
    }

    /// Compare tracked state against the exchange's reported open orders.
    pub fn reconcile(&self, exchange_oids: &HashSet<u64>) -> ReconcileResult {
        let tracked: HashSet<u64> = self.by_oid.keys().copied().collect();
        ReconcileResult {
            orphaned: exchange_oids.difference(&tracked).copied().collect(),
            ghost: tracked.difference(exchange_oids).copied().collect(),
        }
    }

    /// Remove a ghost order from both indices. Idempotent.
    pub fn remove_ghost(&mut self, oid: u64) {
        if let Some(order) = self.by_oid.remove(&oid) {
            self.by_key.remove(&(order.side, order.level_index));
        }
    }

    /// Look up a tracked order by oid.
    pub fn get(&self, oid: u64) -> Option<&TrackedOrder> {
        self.by_oid.get(&oid)
    }

    /// Look up the order occupying a grid slot.
    pub fn get_at(&self, side: Side, level_index: usize) -> Option<&TrackedOrder> {
        self.by_key
            .get(&(side, level_index))
            .and_then(|oid| self.by_oid.get(oid))
    }

    /// Iterate over tracked orders in arbitrary order.
    pub fn orders(&self) -> impl Iterator<Item = &TrackedOrder> {
        self.by_oid.values()
    }

    /// Read-only snapshot of all tracked orders, ordered by oid so downstream
    /// diffing is deterministic.
    pub fn snapshot(&self) -> Vec<TrackedOrder> {
        let mut orders: Vec<TrackedOrder> = self.by_oid.values().cloned().collect();
        orders.sort_unstable_by_key(|o| o.oid);
        orders
    }

    /// Number of tracked orders.
    pub fn len(&self) -> usize {
        self.by_oid.len()
    }

    /// True when nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.by_oid.is_empty()
    }

    #[cfg(test)]
    fn assert_indices_agree(&self) {
        assert_eq!(self.by_oid.len(), self.by_key.len());
        for (oid, order) in &self.by_oid {
            assert_eq!(order.oid, *oid);
            assert_eq!(
                self.by_key.get(&(order.side, order.level_index)),
                Some(oid),
                "slot index must point back at oid {oid}"
            );
        }
        for ((side, level), oid) in &self.by_key {
            let order = self.by_oid.get(oid).expect("slot entry must be tracked");
            assert_eq!(order.side, *side);
            assert_eq!(order.level_index, *level);
        }
    }
}
