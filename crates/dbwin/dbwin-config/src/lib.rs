mod config;
pub use config::{ConfigError, MonitorConfig};
