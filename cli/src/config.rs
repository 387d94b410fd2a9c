use std::{collections::HashMap, env, time::Duration};

use alloy::primitives::Address;
use collector_core::{credentials::KeyCredential, nonce::NonceSource};
use config::{Config, ConfigError, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    pub rpc: RpcConfig,
    pub gas_station: GasStationConfig,
    #[serde(default)]
    pub collector: CollectorSettings,
    #[serde(default)]
    pub log: LogConfig,
    pub destination: KeyCredential,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
    pub url: String,
    /// Static headers sent with every RPC request, e.g. provider API keys
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GasStationConfig {
    pub url: String,
    #[serde(default = "default_gas_station_timeout")]
    pub timeout_seconds: u64,
}

fn default_gas_station_timeout() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollectorSettings {
    pub concurrency: usize,
    pub poll_interval_seconds: u64,
    pub confirmation_timeout_seconds: u64,
    /// Upper bound for the whole run. Unset means no limit.
    pub run_timeout_seconds: Option<u64>,
    pub nonce: NonceSource,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            concurrency: 1,
            poll_interval_seconds: 10,
            confirmation_timeout_seconds: 120,
            run_timeout_seconds: None,
            nonce: NonceSource::default(),
        }
    }
}

impl CollectorSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_seconds)
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout_seconds.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub credential: KeyCredential,
    pub token: Address,
    /// Base-10 token amount; omitted or empty collects the whole balance
    #[serde(default)]
    pub amount: Option<String>,
}

pub fn get_config() -> Result<CollectorConfig, ConfigError> {
    let base_path = env::current_dir()
        .map_err(|e| ConfigError::Message(format!("Failed to determine the current directory: {e}")))?;
    let configuration_directory = base_path.join("configuration");

    // Detect the running environment
    let environment: Environment = env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(ConfigError::Message)?;

    let environment_filename = format!("collector_{}.yaml", environment.as_str());

    let config = Config::builder()
        .add_source(File::from(configuration_directory.join("collector_base.yaml")))
        .add_source(File::from(configuration_directory.join(environment_filename)).required(false))
        .add_source(config::Environment::with_prefix("app").separator("__"))
        .build()?;

    config.try_deserialize::<CollectorConfig>()
}

/// The possible runtime environment for our application.
pub enum Environment {
    Local,
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local`, `development`, or `production`.",
                other
            )),
        }
    }
}
