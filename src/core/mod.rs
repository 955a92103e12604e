pub mod config;
pub mod error;
pub mod health;
pub mod logging;

pub use config::Config;
pub use error::{MonitorError, PriceError, SourceError, StoreError};
pub use health::HealthChecker;
