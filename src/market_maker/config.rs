//! TOML configuration surface for the market maker.
//!
//! Secrets never live here: the private key and wallet address come from the
//! environment (see the binary). Everything else is declarative config:
//! market selection, grid parameters, allocation ceilings and tuning knobs,
//! with defaults matching the strategy's intended cadence.

use serde::{Deserialize, Serialize};

use crate::errors::{MakerError, Result};

/// Top-level configuration, deserialized from a TOML file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MakerConfig {
    #[serde(default)]
    pub market: MarketConfig,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub allocation: AllocationConfig,
    #[serde(default)]
    pub tuning: TuningConfig,
}

/// Which market to quote and where.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MarketConfig {
    /// Spot pair name as the exchange knows it (e.g. "PURR/USDC" or "@142").
    #[serde(default)]
    pub coin: String,
    /// Run against testnet instead of mainnet.
    #[serde(default)]
    pub testnet: bool,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            coin: String::new(),
            testnet: true,
        }
    }
}

/// Grid shape and tranche size.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StrategyConfig {
    /// Price of grid level 0.
    #[serde(default)]
    pub start_px: f64,
    /// Number of grid levels.
    #[serde(default = "default_n_orders")]
    pub n_orders: usize,
    /// Size of one full order tranche, in tokens.
    #[serde(default)]
    pub order_sz: f64,
    /// Boundary seed when no asks are resting at startup (0 = derive from
    /// the allocated token balance).
    #[serde(default)]
    pub n_seeded_levels: usize,
}

fn default_n_orders() -> usize {
    100
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            start_px: 0.0,
            n_orders: default_n_orders(),
            order_sz: 0.0,
            n_seeded_levels: 0,
        }
    }
}

/// Operator ceilings on the balances the strategy may deploy.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AllocationConfig {
    #[serde(default)]
    pub allocated_token: f64,
    #[serde(default)]
    pub allocated_usdc: f64,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            allocated_token: 0.0,
            allocated_usdc: 0.0,
        }
    }
}

/// Tick cadence and diff thresholds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TuningConfig {
    /// Tick loop interval in seconds.
    #[serde(default = "default_interval_s")]
    pub interval_s: f64,
    /// Weighted-mid drift below which a whole tick emits nothing.
    #[serde(default = "default_dead_zone_bps")]
    pub dead_zone_bps: f64,
    /// Per-order price tolerance before a modify is emitted.
    #[serde(default = "default_price_tolerance_bps")]
    pub price_tolerance_bps: f64,
    /// Per-order size tolerance (percent) before a modify is emitted.
    #[serde(default = "default_size_tolerance_pct")]
    pub size_tolerance_pct: f64,
    /// Run REST reconciliation every N ticks.
    #[serde(default = "default_reconcile_every")]
    pub reconcile_every: u64,
    /// Drop orders whose price * size falls below this notional.
    #[serde(default)]
    pub min_notional: f64,
}

fn default_interval_s() -> f64 {
    3.0
}
fn default_dead_zone_bps() -> f64 {
    5.0
}
fn default_price_tolerance_bps() -> f64 {
    1.0
}
fn default_size_tolerance_pct() -> f64 {
    1.0
}
fn default_reconcile_every() -> u64 {
    20
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            interval_s: default_interval_s(),
            dead_zone_bps: default_dead_zone_bps(),
            price_tolerance_bps: default_price_tolerance_bps(),
            size_tolerance_pct: default_size_tolerance_pct(),
            reconcile_every: default_reconcile_every(),
            min_notional: 0.0,
        }
    }
}

impl MakerConfig {
    /// Parse a TOML document.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| MakerError::InvalidConfig(e.to_string()))
    }

    /// Validate required fields, collecting every failure into one error.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        if self.market.coin.is_empty() {
            errors.push("market.coin is required".to_string());
        }
        if self.strategy.start_px <= 0.0 {
            errors.push("strategy.start_px must be positive".to_string());
        }
        if self.strategy.order_sz <= 0.0 {
            errors.push("strategy.order_sz must be positive".to_string());
        }
        if self.strategy.n_orders == 0 {
            errors.push("strategy.n_orders must be a positive integer".to_string());
        }
        if self.allocation.allocated_token <= 0.0 {
            errors.push("allocation.allocated_token must be positive".to_string());
        }
        if self.allocation.allocated_usdc <= 0.0 {
            errors.push("allocation.allocated_usdc must be positive".to_string());
        }
        if self.tuning.interval_s <= 0.0 {
            errors.push("tuning.interval_s must be positive".to_string());
        }
        if self.tuning.reconcile_every == 0 {
            errors.push("tuning.reconcile_every must be a positive integer".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(MakerError::InvalidConfig(errors.join("\n  ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
        [market]
        coin = "PURR/USDC"
        testnet = false

        [strategy]
        start_px = 1.0
        n_orders = 50
        order_sz = 10.0
        n_seeded_levels = 5

        [allocation]
        allocated_token = 500.0
        allocated_usdc = 500.0

        [tuning]
        interval_s = 2.0
        dead_zone_bps = 4.0
        price_tolerance_bps = 0.5
        size_tolerance_pct = 2.0
        reconcile_every = 10
        min_notional = 1.0
    "#;

    #[test]
    fn full_config_parses_and_validates() {
        let config = MakerConfig::from_toml(FULL).unwrap();
        assert_eq!(config.market.coin, "PURR/USDC");
        assert!(!config.market.testnet);
        assert_eq!(config.strategy.n_orders, 50);
        assert_eq!(config.strategy.n_seeded_levels, 5);
        assert_eq!(config.tuning.reconcile_every, 10);
        assert_eq!(config.tuning.min_notional, 1.0);
        config.validate().unwrap();
    }

    #[test]
    fn tuning_defaults_apply_when_section_missing() {
        let config = MakerConfig::from_toml(
            r#"
            [market]
            coin = "@1"

            [strategy]
            start_px = 1.0
            n_orders = 10
            order_sz = 10.0

            [allocation]
            allocated_token = 100.0
            allocated_usdc = 100.0
        "#,
        )
        .unwrap();
        assert_eq!(config.tuning.interval_s, 3.0);
        assert_eq!(config.tuning.dead_zone_bps, 5.0);
        assert_eq!(config.tuning.price_tolerance_bps, 1.0);
        assert_eq!(config.tuning.size_tolerance_pct, 1.0);
        assert_eq!(config.tuning.reconcile_every, 20);
        assert_eq!(config.tuning.min_notional, 0.0);
        config.validate().unwrap();
    }

    #[test]
    fn validation_collects_all_failures() {
        let config = MakerConfig::default();
        let err = config.validate().unwrap_err();
        let text = err.to_string();
        assert!(text.contains("market.coin"));
        assert!(text.contains("strategy.start_px"));
        assert!(text.contains("strategy.order_sz"));
        assert!(text.contains("allocation.allocated_token"));
    }

    #[test]
    fn negative_sizes_rejected() {
        let mut config = MakerConfig::from_toml(FULL).unwrap();
        config.strategy.order_sz = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(MakerConfig::from_toml("[market\ncoin=").is_err());
    }
}
