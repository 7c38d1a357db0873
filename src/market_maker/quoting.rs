//! The quoting function: inventory in, desired orders out.
//!
//! This is the heart of the strategy. Token inventory is decomposed into
//! full tranches of `order_sz` quoted as asks ascending from the boundary
//! level; USDC funds bids walking down from one level below the boundary
//! until the money runs out. No oracle, no book state: the same inputs
//! always produce the same ladder.

use super::grid::PricingGrid;
use super::order_state::Side;

/// An order the quoting engine wants resting on the book.
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredOrder {
    pub side: Side,
    pub level_index: usize,
    pub price: f64,
    pub size: f64,
}

/// Compute the desired set of resting orders from inventory state.
///
/// Asks occupy `boundary_level` and above (truncated at the top of the
/// grid), bids occupy `boundary_level - 1` down to level 0. Each side ends
/// with at most one partial tranche. Orders whose notional falls below
/// `min_notional` are dropped from the final list.
pub fn compute_desired_orders(
    grid: &PricingGrid,
    boundary_level: usize,
    effective_token: f64,
    effective_usdc: f64,
    order_sz: f64,
    min_notional: f64,
) -> Vec<DesiredOrder> {
    let mut orders = Vec::new();
    if grid.is_empty() || order_sz <= 0.0 {
        return orders;
    }

    // Ask side: ascending from boundary_level.
    if effective_token > 0.0 {
        let n_full = (effective_token / order_sz).floor() as usize;
        let partial = (effective_token - n_full as f64 * order_sz).max(0.0);

        for i in 0..n_full {
            let level = boundary_level + i;
            if level >= grid.len() {
                break;
            }
            orders.push(DesiredOrder {
                side: Side::Sell,
                level_index: level,
                price: grid.levels()[level],
                size: order_sz,
            });
        }

        if partial > 0.0 {
            let level = boundary_level + n_full;
            if level < grid.len() {
                orders.push(DesiredOrder {
                    side: Side::Sell,
                    level_index: level,
                    price: grid.levels()[level],
                    size: partial,
                });
            }
        }
    }

    // Bid side: descending from boundary_level - 1.
    if effective_usdc > 0.0 {
        let mut available = effective_usdc;
        let top = boundary_level.min(grid.len());
        for level in (0..top).rev() {
            let px = grid.levels()[level];
            let cost = px * order_sz;
            if available >= cost {
                orders.push(DesiredOrder {
                    side: Side::Buy,
                    level_index: level,
                    price: px,
                    size: order_sz,
                });
                available -= cost;
            } else {
                if available > 0.0 && px > 0.0 {
                    orders.push(DesiredOrder {
                        side: Side::Buy,
                        level_index: level,
                        price: px,
                        size: available / px,
                    });
                }
                break;
            }
        }
    }

    if min_notional > 0.0 {
        orders.retain(|o| o.price * o.size >= min_notional);
    }

    orders
}
