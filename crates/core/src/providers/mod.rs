pub mod registry;
pub mod traits;

// Upstream quote provider implementations
pub mod alphavantage;
pub mod twelvedata;
pub mod yahoo;
