//! Core utilities: configuration, errors, logging, input validation and
//! the exchange-rate client.

pub mod config;
pub mod error;
pub mod logging;
pub mod rates;
pub mod validation;

// Re-exports for convenience
pub use error::{AppError, AppResult};
pub use logging::init_logger;
pub use rates::{RatesClient, RatesError, UsdRates};
