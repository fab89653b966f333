use crate::client::ClientSettings;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use core_logic::config::{
    default_probe_endpoints, DEFAULT_CHUNK_SIZE, DEFAULT_COOL_DOWN_SECS, DEFAULT_GAS_BUFFER_PERCENT,
    DEFAULT_GAS_MULTIPLIER, DEFAULT_PROBE_TIMEOUT_SECS, DEFAULT_TRANSFER_DELAY_SECS,
};
use core_logic::{FeeConfig, ProbeSettings};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_RPC_URL: &str = "https://bsc-dataseed.binance.org/";
pub const DEFAULT_CONTRACT: &str = "0x61e0336Ba3bEd95deD28b01ef9cD015d7F32437d";
pub const ENV_PREFIX: &str = "SPLITTER";

/// File / environment layer of the run configuration. CLI flags override it.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SplitterConfig {
    pub rpc_url: String,
    pub contract_address: String,
    pub target_address: Option<String>,
    pub gas_multiplier: f64,
    pub gas_limit: u64,
    pub gas_buffer_percent: u32,
    pub batch_size: usize,
    pub cool_down_secs: u64,
    pub transfer_delay_secs: u64,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub confirmation_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub probe_timeout_secs: u64,
    pub probe_endpoints: Vec<String>,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        let client = ClientSettings::default();
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            contract_address: DEFAULT_CONTRACT.to_string(),
            target_address: None,
            gas_multiplier: DEFAULT_GAS_MULTIPLIER,
            gas_limit: 0,
            gas_buffer_percent: DEFAULT_GAS_BUFFER_PERCENT,
            batch_size: DEFAULT_CHUNK_SIZE,
            cool_down_secs: DEFAULT_COOL_DOWN_SECS,
            transfer_delay_secs: DEFAULT_TRANSFER_DELAY_SECS,
            request_timeout_secs: client.request_timeout.as_secs(),
            connect_timeout_secs: client.connect_timeout.as_secs(),
            confirmation_timeout_secs: client.confirmation_timeout.as_secs(),
            poll_interval_ms: client.poll_interval.as_millis() as u64,
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
            probe_endpoints: default_probe_endpoints(),
        }
    }
}

impl SplitterConfig {
    /// Defaults, then the optional TOML file, then `SPLITTER_*` variables.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path));
        }
        let settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("probe_endpoints"),
            )
            .build()
            .with_context(|| format!("Failed to read configuration{}", describe(path)))?;

        settings
            .try_deserialize()
            .with_context(|| format!("Invalid configuration{}", describe(path)))
    }

    pub fn fee_config(&self) -> FeeConfig {
        FeeConfig {
            multiplier: self.gas_multiplier,
            fixed_gas_limit: self.gas_limit,
            gas_buffer_percent: self.gas_buffer_percent,
        }
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            confirmation_timeout: Duration::from_secs(self.confirmation_timeout_secs),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }

    pub fn probe_settings(&self) -> ProbeSettings {
        ProbeSettings {
            endpoints: self.probe_endpoints.clone(),
            timeout: Duration::from_secs(self.probe_timeout_secs),
        }
    }
}

fn describe(path: Option<&str>) -> String {
    path.map(|p| format!(" from {}", p)).unwrap_or_default()
}
