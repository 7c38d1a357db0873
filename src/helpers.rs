//! Small float helpers shared across the quoting pipeline.

use alloy::primitives::Address;
use ethers_core::types::H160;

/// Convert our `alloy` wallet address into the `H160` type the SDK's info
/// endpoints expect.
pub fn to_h160(address: Address) -> H160 {
    H160::from_slice(address.as_slice())
}

/// Round `px` to `sig_figs` significant figures.
///
/// This is the default rounding applied at each step of the grid recurrence;
/// eight significant figures matches the exchange's spot price precision.
pub fn round_to_significant(px: f64, sig_figs: u32) -> f64 {
    if px == 0.0 {
        return 0.0;
    }
    let magnitude = px.abs().log10().floor() as i32 + 1;
    let decimals = sig_figs as i32 - magnitude;
    let factor = 10f64.powi(decimals);
    (px * factor).round() / factor
}

/// Absolute price difference in basis points, relative to `current`.
///
/// Returns `f64::INFINITY` when `current` is not a usable reference price, so
/// callers comparing against a tolerance always treat the pair as diverged.
pub fn price_diff_bps(desired: f64, current: f64) -> f64 {
    if current <= 0.0 {
        return f64::INFINITY;
    }
    (desired - current).abs() / current * 10_000.0
}

/// Absolute size difference as a percentage of `current`.
pub fn size_diff_pct(desired: f64, current: f64) -> f64 {
    if current <= 0.0 {
        return f64::INFINITY;
    }
    (desired - current).abs() / current * 100.0
}
