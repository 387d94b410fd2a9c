pub mod config;

pub use config::{
    CollectorConfig, CollectorSettings, GasStationConfig, LogConfig, LogFormat, RpcConfig,
    SourceConfig,
};
