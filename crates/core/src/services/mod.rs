pub mod alert_service;
pub mod analysis_service;
pub mod notifier;
pub mod portfolio_service;
pub mod price_service;
pub mod valuation_service;
