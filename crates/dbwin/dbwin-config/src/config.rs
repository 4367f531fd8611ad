use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MonitorConfig {
    #[serde(default = "defaults::log_level")]
    pub log_level: String,
    #[serde(default = "defaults::poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default)]
    pub channel_capacity: usize,
    #[serde(default = "defaults::buffer_size")]
    pub buffer_size: usize,
    #[serde(default = "defaults::buffer_name")]
    pub buffer_name: String,
    #[serde(default = "defaults::buffer_ready_name")]
    pub buffer_ready_name: String,
    #[serde(default = "defaults::data_ready_name")]
    pub data_ready_name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

mod defaults {
    pub fn log_level() -> String {
        "info".into()
    }

    pub fn poll_interval_ms() -> u64 {
        100
    }

    pub fn buffer_size() -> usize {
        dbwin_events::DBWIN_BUFFER_SIZE
    }

    pub fn buffer_name() -> String {
        dbwin_events::DBWIN_BUFFER.into()
    }

    pub fn buffer_ready_name() -> String {
        dbwin_events::DBWIN_BUFFER_READY.into()
    }

    pub fn data_ready_name() -> String {
        dbwin_events::DBWIN_DATA_READY.into()
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            log_level: defaults::log_level(),
            poll_interval_ms: defaults::poll_interval_ms(),
            channel_capacity: 0,
            buffer_size: defaults::buffer_size(),
            buffer_name: defaults::buffer_name(),
            buffer_ready_name: defaults::buffer_ready_name(),
            data_ready_name: defaults::data_ready_name(),
        }
    }
}

impl MonitorConfig {
    pub fn load(path: impl AsRef<Path> + ToString) -> Result<Self, ConfigError> {
        let toml_to_str = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::parse(&toml_to_str)
    }

    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        let config: MonitorConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("poll_interval_ms must be positive"));
        }
        // header + terminator
        if self.buffer_size < dbwin_events::HEADER_SIZE + 1 {
            return Err(ConfigError::Invalid("buffer_size must be at least 5 bytes"));
        }
        if u32::try_from(self.buffer_size).is_err() {
            return Err(ConfigError::Invalid("buffer_size must fit in 32 bits"));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
