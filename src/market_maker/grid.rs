//! Immutable geometric price ladder and price ↔ level lookup.
//!
//! The grid is the stable coordinate system of the whole pipeline: a level
//! index identifies the same quote slot across ticks even as inventory moves
//! the bid/ask boundary over it. Construction happens once at startup and
//! the ladder never changes afterwards.

use crate::errors::{MakerError, Result};
use crate::helpers::round_to_significant;

/// Default multiplicative spacing between levels (0.3%).
pub(crate) const DEFAULT_TICK: f64 = 0.003;

/// Rounding applied at each step of the grid recurrence.
fn default_round(px: f64) -> f64 {
    round_to_significant(px, 8)
}

/// Immutable geometric price grid.
///
/// Levels follow the recurrence `p_0 = start_px`,
/// `p_i = round(p_{i-1} * (1 + tick))`, strictly increasing. Construction
/// fails with [`MakerError::DegenerateGrid`] if rounding collapses two
/// adjacent levels to the same price.
#[derive(Debug, Clone)]
pub struct PricingGrid {
    levels: Vec<f64>,
    tick: f64,
}

impl PricingGrid {
    /// Build a grid with the default rounding (8 significant figures).
    pub fn new(start_px: f64, n_orders: usize, tick: f64) -> Result<Self> {
        Self::with_round_fn(start_px, n_orders, tick, default_round)
    }

    /// Build a grid with a custom per-step rounding function.
    pub fn with_round_fn(
        start_px: f64,
        n_orders: usize,
        tick: f64,
        round_fn: fn(f64) -> f64,
    ) -> Result<Self> {
        let mut levels = Vec::with_capacity(n_orders);
        if n_orders > 0 {
            levels.push(round_fn(start_px));
            for i in 1..n_orders {
                let next = round_fn(levels[i - 1] * (1.0 + tick));
                if next == levels[i - 1] {
                    return Err(MakerError::DegenerateGrid {
                        level: i,
                        price: next,
                    });
                }
                levels.push(next);
            }
        }
        Ok(Self { levels, tick })
    }

    /// The complete ordered price ladder, ascending.
    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    /// Number of levels in the grid.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// True when the grid has no levels.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Price at grid index `i`.
    pub fn price_at_level(&self, i: usize) -> Result<f64> {
        self.levels
            .get(i)
            .copied()
            .ok_or(MakerError::LevelOutOfRange {
                index: i,
                len: self.levels.len(),
            })
    }

    /// Nearest grid level index for `px`, or `None` when `px` lies outside
    /// the grid range by more than half the local spacing.
    ///
    /// Binary search; when `px` falls exactly between two levels the lower
    /// index wins.
    pub fn level_for_price(&self, px: f64) -> Option<usize> {
        let first = *self.levels.first()?;
        let last = *self.levels.last()?;

        let half_tick_low = first * self.tick / 2.0;
        let half_tick_high = last * self.tick / 2.0;
        if px < first - half_tick_low || px > last + half_tick_high {
            return None;
        }

        let idx = self.levels.partition_point(|&p| p < px);
        if idx == 0 {
            return Some(0);
        }
        if idx == self.levels.len() {
            return Some(self.levels.len() - 1);
        }

        let left = self.levels[idx - 1];
        let right = self.levels[idx];
        if px - left <= right - px {
            Some(idx - 1)
        } else {
            Some(idx)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(n: usize) -> PricingGrid {
        PricingGrid::new(1.0, n, DEFAULT_TICK).unwrap()
    }

    #[test]
    fn levels_are_strictly_increasing() {
        let g = grid(50);
        assert_eq!(g.len(), 50);
        assert_eq!(g.levels()[0], 1.0);
        for pair in g.levels().windows(2) {
            assert!(pair[0] < pair[1], "levels must be strictly increasing");
        }
    }

    #[test]
    fn recurrence_compounds_the_tick() {
        let g = grid(5);
        let expected = [1.0, 1.003, 1.006009, 1.009027, 1.0120541];
        for (i, &px) in expected.iter().enumerate() {
            assert!(
                (g.price_at_level(i).unwrap() - px).abs() < 1e-9,
                "level {i}: {} vs {px}",
                g.levels()[i]
            );
        }
    }

    #[test]
    fn degenerate_grid_rejected() {
        // Truncating to 2 significant figures collapses a 0.3% step.
        fn coarse(px: f64) -> f64 {
            round_to_significant(px, 2)
        }
        let err = PricingGrid::with_round_fn(1.0, 10, DEFAULT_TICK, coarse).unwrap_err();
        assert!(matches!(err, MakerError::DegenerateGrid { .. }));
    }

    #[test]
    fn price_at_level_out_of_range() {
        let g = grid(5);
        assert!(matches!(
            g.price_at_level(5),
            Err(MakerError::LevelOutOfRange { index: 5, len: 5 })
        ));
    }

    #[test]
    fn exact_prices_map_to_their_level() {
        let g = grid(20);
        for (i, &px) in g.levels().iter().enumerate() {
            assert_eq!(g.level_for_price(px), Some(i));
        }
    }

    #[test]
    fn nearest_level_wins() {
        let g = grid(5);
        // Slightly above level 1 but closer to it than to level 2.
        assert_eq!(g.level_for_price(1.0035), Some(1));
        // Closer to level 2.
        assert_eq!(g.level_for_price(1.0055), Some(2));
    }

    #[test]
    fn midpoint_ties_break_to_lower_index() {
        let g = PricingGrid::with_round_fn(1.0, 2, DEFAULT_TICK, |px| px).unwrap();
        let mid = (g.levels()[0] + g.levels()[1]) / 2.0;
        assert_eq!(g.level_for_price(mid), Some(0));
    }

    #[test]
    fn out_of_range_by_more_than_half_spacing_is_none() {
        let g = grid(5);
        let first = g.levels()[0];
        let last = *g.levels().last().unwrap();
        assert_eq!(g.level_for_price(first - first * DEFAULT_TICK), None);
        assert_eq!(g.level_for_price(last + last * DEFAULT_TICK), None);
        // Just inside the half-spacing margin still matches the endpoint.
        assert_eq!(
            g.level_for_price(first - first * DEFAULT_TICK / 2.0 * 0.9),
            Some(0)
        );
        assert_eq!(
            g.level_for_price(last + last * DEFAULT_TICK / 2.0 * 0.9),
            Some(4)
        );
    }
}
