use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, MakerError>;

/// Errors surfaced by the market maker.
///
/// Recoverable order-level conditions (rejects, ghosts, duplicate fills) are
/// handled locally and never reach this enum; what remains is fatal
/// construction/config problems and SDK transport failures.
#[derive(Error, Debug)]
pub enum MakerError {
    /// Rounding collapsed two adjacent grid levels to the same price.
    #[error(
        "degenerate grid: rounding collapsed level {level} to the same price \
         as the previous level ({price}); increase rounding precision or tick size"
    )]
    DegenerateGrid { level: usize, price: f64 },

    /// Grid level lookup outside `[0, len)`.
    #[error("level index {index} out of range [0, {len})")]
    LevelOutOfRange { index: usize, len: usize },

    /// The configured coin is not in the exchange's spot universe.
    #[error("coin {0:?} not found in spot metadata")]
    CoinNotFound(String),

    /// Configuration failed validation; the string lists every failure.
    #[error("config validation failed:\n  {0}")]
    InvalidConfig(String),

    /// Error propagated from the exchange SDK.
    #[error("sdk error: {0}")]
    Sdk(#[from] hyperliquid_rust_sdk::Error),
}
