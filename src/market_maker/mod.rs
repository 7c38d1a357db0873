//! The market making engine: pure quoting pipeline plus its orchestration.
//!
//! Leaves first: [`grid`] and [`inventory`] feed [`quoting`], whose output is
//! diffed against [`order_state`] by [`differ`] and executed by [`emitter`]
//! under the [`rate_limit`] budget. [`orchestrator`] owns time and external
//! events and wires the stages together.

pub mod config;
pub mod differ;
pub mod emitter;
pub mod grid;
pub mod inventory;
pub mod order_state;
pub mod quoting;
pub mod rate_limit;

mod orchestrator;

pub use config::MakerConfig;
pub use differ::{compute_diff, OrderDiff};
pub use emitter::{BatchEmitter, BulkExecutor, EmitResult, HyperliquidExecutor};
pub use grid::PricingGrid;
pub use inventory::Inventory;
pub use order_state::{FillResult, OrderState, OrderStatus, ReconcileResult, Side, TrackedOrder};
pub use orchestrator::MarketMaker;
pub use quoting::{compute_desired_orders, DesiredOrder};
pub use rate_limit::RateLimitBudget;
