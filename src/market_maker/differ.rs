//! Order diffing: the minimum mutation set between desired and current.
//!
//! Two filters keep request spend down. The dead zone short-circuits the
//! whole tick when the size-weighted mid of the desired book has not drifted
//! from the current one; the per-order tolerances then skip matched pairs
//! whose price and size are close enough that a modify is not worth a
//! request. Matching is by `(side, level_index)`: buy and sell at the same
//! level are distinct keys, so a side flip at one level becomes cancel +
//! place, never a cross-side modify (the exchange silently rejects those).
//!
//! Pure function: no I/O, deterministic, output order follows input order.

use std::collections::{HashMap, HashSet};

use crate::helpers::{price_diff_bps, size_diff_pct};

use super::order_state::{Side, TrackedOrder};
use super::quoting::DesiredOrder;

/// Minimum mutations to converge current orders to desired orders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderDiff {
    pub modifies: Vec<(u64, DesiredOrder)>,
    pub places: Vec<DesiredOrder>,
    pub cancels: Vec<u64>,
}

impl OrderDiff {
    /// A diff containing only cancels (used by reconciliation for orphans).
    pub fn cancels_only(cancels: Vec<u64>) -> Self {
        Self {
            cancels,
            ..Self::default()
        }
    }

    /// True when there is nothing to do.
    pub fn is_empty(&self) -> bool {
        self.modifies.is_empty() && self.places.is_empty() && self.cancels.is_empty()
    }

    /// Total number of individual mutations.
    pub fn total(&self) -> usize {
        self.modifies.len() + self.places.len() + self.cancels.len()
    }
}

/// Size-weighted average price. Zero when total size is zero.
fn weighted_mid<I>(orders: I) -> f64
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let mut weighted_sum = 0.0;
    let mut total_size = 0.0;
    for (px, sz) in orders {
        weighted_sum += px * sz;
        total_size += sz;
    }
    if total_size == 0.0 {
        0.0
    } else {
        weighted_sum / total_size
    }
}

/// Compute the minimum mutation set to converge `current` → `desired`.
///
/// Tolerance comparisons are inclusive: a matched pair exactly at the
/// tolerance is skipped, so zero tolerances mean "exact match required" and
/// an identical book always yields an empty diff.
pub fn compute_diff(
    desired: &[DesiredOrder],
    current: &[TrackedOrder],
    dead_zone_bps: f64,
    price_tolerance_bps: f64,
    size_tolerance_pct: f64,
) -> OrderDiff {
    // Empty-side bypasses skip the dead-zone check entirely.
    if desired.is_empty() && current.is_empty() {
        return OrderDiff::default();
    }
    if current.is_empty() {
        return OrderDiff {
            places: desired.to_vec(),
            ..OrderDiff::default()
        };
    }
    if desired.is_empty() {
        return OrderDiff::cancels_only(current.iter().map(|c| c.oid).collect());
    }

    // Dead zone: suppress the whole tick when the weighted mid barely moved.
    let desired_mid = weighted_mid(desired.iter().map(|d| (d.price, d.size)));
    let current_mid = weighted_mid(current.iter().map(|c| (c.price, c.size)));
    if current_mid > 0.0 {
        let drift_bps = (desired_mid - current_mid).abs() / current_mid * 10_000.0;
        if drift_bps < dead_zone_bps {
            return OrderDiff::default();
        }
    }

    let current_by_key: HashMap<(Side, usize), &TrackedOrder> = current
        .iter()
        .map(|c| ((c.side, c.level_index), c))
        .collect();

    let mut diff = OrderDiff::default();
    let mut matched: HashSet<(Side, usize)> = HashSet::new();

    for d in desired {
        let key = (d.side, d.level_index);
        if let Some(c) = current_by_key.get(&key) {
            matched.insert(key);
            let px_diff = price_diff_bps(d.price, c.price);
            let sz_diff = size_diff_pct(d.size, c.size);
            if px_diff <= price_tolerance_bps && sz_diff <= size_tolerance_pct {
                continue;
            }
            diff.modifies.push((c.oid, d.clone()));
        } else {
            // A level occupied by the opposite side flips via cancel + place.
            let opposite = (d.side.opposite(), d.level_index);
            if let Some(c) = current_by_key.get(&opposite) {
                if !matched.contains(&opposite) {
                    matched.insert(opposite);
                    diff.cancels.push(c.oid);
                }
            }
            diff.places.push(d.clone());
        }
    }

    for c in current {
        if !matched.contains(&(c.side, c.level_index)) {
            diff.cancels.push(c.oid);
        }
    }

    diff
}
