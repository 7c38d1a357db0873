//! HIP-2 style spot market maker for Hyperliquid.
//!
//! Posts a geometric ladder of maker-only (ALO) limit orders whose sizes and
//! bid/ask boundary are derived entirely from the maker's own inventory, no
//! price oracle. Fills shift inventory, inventory shifts the boundary, and
//! the boundary shifts the quotes on the next tick.
//!
//! The pipeline is a cascade of pure stages feeding a single I/O stage:
//! [`market_maker::PricingGrid`] → [`market_maker::Inventory`] →
//! [`market_maker::compute_desired_orders`] → [`market_maker::compute_diff`]
//! → [`market_maker::BatchEmitter`], orchestrated by
//! [`market_maker::MarketMaker`].

#![deny(unreachable_pub)]

mod consts;
mod errors;
mod helpers;

pub mod market_maker;

pub use consts::{EPSILON, SPOT_ASSET_OFFSET};
pub use errors::{MakerError, Result};
pub use helpers::{price_diff_bps, round_to_significant, size_diff_pct};
pub use market_maker::{
    compute_desired_orders, compute_diff, BatchEmitter, BulkExecutor, DesiredOrder, EmitResult,
    FillResult, HyperliquidExecutor, Inventory, MakerConfig, MarketMaker, OrderDiff, OrderState,
    OrderStatus, PricingGrid, RateLimitBudget, ReconcileResult, Side, TrackedOrder,
};
