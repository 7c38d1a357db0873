//! Allocation-aware balance tracking.
//!
//! Three layers per asset: `allocated` is the operator ceiling, `account` is
//! the exchange truth, and `effective = min(allocated, account)` is the only
//! view the quoting engine sees. The effective layer is recomputed after
//! every mutation so the invariant holds at all times.
//!
//! Account balances may go transiently negative between a fill and the next
//! reconciliation; that is expected and the min() clamp keeps quoting sane.

/// Token and USDC balance tracker for a single spot market.
#[derive(Debug, Clone)]
pub struct Inventory {
    allocated_token: f64,
    allocated_usdc: f64,
    account_token: f64,
    account_usdc: f64,
    effective_token: f64,
    effective_usdc: f64,
}

impl Inventory {
    /// Create a tracker from operator ceilings and current exchange balances.
    pub fn new(
        allocated_token: f64,
        allocated_usdc: f64,
        account_token: f64,
        account_usdc: f64,
    ) -> Self {
        let mut inv = Self {
            allocated_token,
            allocated_usdc,
            account_token,
            account_usdc,
            effective_token: 0.0,
            effective_usdc: 0.0,
        };
        inv.recompute_effective();
        inv
    }

    fn recompute_effective(&mut self) {
        self.effective_token = self.allocated_token.min(self.account_token);
        self.effective_usdc = self.allocated_usdc.min(self.account_usdc);
    }

    /// Update allocation ceilings (operator action).
    pub fn update_allocation(&mut self, token: f64, usdc: f64) {
        self.allocated_token = token;
        self.allocated_usdc = usdc;
        self.recompute_effective();
    }

    /// Process an ask-side fill: sold `sz` tokens at price `px`.
    pub fn on_ask_fill(&mut self, px: f64, sz: f64) {
        self.account_token -= sz;
        self.account_usdc += px * sz;
        self.recompute_effective();
    }

    /// Process a bid-side fill: bought `sz` tokens at price `px`.
    pub fn on_bid_fill(&mut self, px: f64, sz: f64) {
        self.account_token += sz;
        self.account_usdc -= px * sz;
        self.recompute_effective();
    }

    /// Authoritative balance overwrite from exchange reconciliation.
    pub fn on_balance_update(&mut self, token: f64, usdc: f64) {
        self.account_token = token;
        self.account_usdc = usdc;
        self.recompute_effective();
    }

    /// Token balance available to the quoting engine.
    pub fn effective_token(&self) -> f64 {
        self.effective_token
    }

    /// USDC balance available to the quoting engine.
    pub fn effective_usdc(&self) -> f64 {
        self.effective_usdc
    }

    /// Raw exchange token balance (for logging and drift checks).
    pub fn account_token(&self) -> f64 {
        self.account_token
    }

    /// Raw exchange USDC balance (for logging and drift checks).
    pub fn account_usdc(&self) -> f64 {
        self.account_usdc
    }
}
