//! Local mirror of the exchange's address-level rate-limit budget.
//!
//! The exchange grants one request per USD of cumulative fill volume on top
//! of a 10,000 request initial buffer. This tracker follows that model
//! locally so the emitter can throttle proactively; local drift is corrected
//! by periodic re-sync from the `userRateLimit` endpoint.
//!
//! Pure state, no I/O, no async.

/// Initial request buffer granted per address.
const INITIAL_BUDGET: f64 = 10_000.0;

/// Budget floor below which the maker is in emergency (cancel-only) territory.
pub const SAFETY_MARGIN: u64 = 500;

/// Tracks the exchange budget model: `10_000 + cum_vlm - n_requests`.
#[derive(Debug, Clone, Default)]
pub struct RateLimitBudget {
    cum_vlm: f64,
    n_requests: u64,
}

impl RateLimitBudget {
    /// Fresh tracker; normally re-seeded from the exchange right away.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw budget value (may be negative).
    pub fn budget(&self) -> f64 {
        INITIAL_BUDGET + self.cum_vlm - self.n_requests as f64
    }

    /// Long-term utilization ratio (volume earned per request spent).
    pub fn ratio(&self) -> f64 {
        self.cum_vlm / self.n_requests.max(1) as f64
    }

    /// Current usable budget, clamped to zero.
    pub fn remaining(&self) -> u64 {
        self.budget().max(0.0) as u64
    }

    /// True when volume accrues at least as fast as requests.
    pub fn is_healthy(&self) -> bool {
        self.ratio() >= 1.0
    }

    /// True when the budget has dropped below the safety margin.
    pub fn is_emergency(&self) -> bool {
        self.remaining() < SAFETY_MARGIN
    }

    /// Record `n` API requests (a batch of any size costs 1).
    pub fn on_request(&mut self, n: u64) {
        self.n_requests += n;
    }

    /// Record maker fill volume in USD.
    pub fn on_fill(&mut self, volume_usd: f64) {
        self.cum_vlm += volume_usd;
    }

    /// Overwrite local state with exchange-reported values.
    pub fn sync_from_exchange(&mut self, cum_vlm: f64, n_requests: u64) {
        self.cum_vlm = cum_vlm;
        self.n_requests = n_requests;
    }

    /// Cumulative fill volume in USD.
    pub fn cum_vlm(&self) -> f64 {
        self.cum_vlm
    }

    /// Cumulative request count.
    pub fn n_requests(&self) -> u64 {
        self.n_requests
    }

    /// Formatted utilization string for the per-tick log line.
    pub fn status_line(&self) -> String {
        format!(
            "ratio={:.2} budget={} vol=${:.0} reqs={}",
            self.ratio(),
            self.remaining(),
            self.cum_vlm,
            self.n_requests
        )
    }
}
