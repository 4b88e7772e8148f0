//! Configuration for the bridge service

use std::collections::HashMap;
use std::time::Duration;

use alloy_primitives::Address;
use clap::{Parser, Subcommand};
use ethbridge::{RemoteRegistryConf, TxnProcessorConfig};
use tracing::Level;

use crate::error::ServiceError;

/// Ethereum transaction bridge
#[derive(Parser, Debug, Clone)]
#[command(name = "ethbridge")]
#[command(about = "Submits contract deployments and transactions to an Ethereum node", long_about = None)]
pub struct Config {
    /// Subcommand to run (defaults to `serve`)
    #[command(subcommand)]
    pub command: Option<Command>,

    /// JSON-RPC endpoint of the node
    #[arg(long, env = "ETH_RPC_URL", default_value = "http://localhost:8545")]
    pub rpc_url: String,

    /// Seconds to wait for a receipt before replying with a timeout
    #[arg(short = 'x', long, env = "MAX_TX_WAIT_TIME", default_value = "60")]
    pub max_tx_wait_time: u64,

    /// Query the node for the next nonce when a request carries none
    #[arg(short = 'P', long, env = "PREDICT_NONCES")]
    pub predict_nonces: bool,

    /// Add hex copies of numeric receipt fields
    #[arg(long, env = "HEX_VALUES_IN_RECEIPT")]
    pub hex_values: bool,

    /// Gap between receipt checks in milliseconds
    #[arg(long, env = "RECEIPT_POLL_INTERVAL_MS", default_value = "1000")]
    pub receipt_poll_interval_ms: u64,

    /// Per-request timeout for node calls in seconds
    #[arg(long, env = "RPC_TIMEOUT_SECS", default_value = "30")]
    pub rpc_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: Level,

    /// Registry URL prefix for contracts looked up by id
    #[arg(long, env = "FACTORY_URL_PREFIX")]
    pub factory_url_prefix: Option<String>,

    /// Registry URL prefix for contracts looked up by address
    #[arg(long, env = "INSTANCE_URL_PREFIX")]
    pub instance_url_prefix: Option<String>,

    /// Extra header sent to the registry, as NAME:VALUE (repeatable)
    #[arg(long = "registry-header", value_name = "NAME:VALUE", value_parser = parse_registry_header)]
    pub registry_headers: Vec<(String, String)>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Read requests from stdin, one JSON object per line, and write replies to stdout
    Serve,
    /// Look up a contract in the remote registry
    Lookup {
        /// Registry id of a deployable contract
        #[arg(long, conflicts_with = "address", required_unless_present = "address")]
        id: Option<String>,
        /// Address of a deployed contract instance
        #[arg(long)]
        address: Option<Address>,
    },
}

impl Config {
    pub fn processor_config(&self) -> TxnProcessorConfig {
        TxnProcessorConfig {
            max_wait: Duration::from_secs(self.max_tx_wait_time),
            poll_interval: Duration::from_millis(self.receipt_poll_interval_ms),
            predict_nonces: self.predict_nonces,
            hex_values_in_receipt: self.hex_values,
        }
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    pub fn registry_config(&self) -> RemoteRegistryConf {
        let mut headers: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in &self.registry_headers {
            headers.entry(name.clone()).or_default().push(value.clone());
        }
        RemoteRegistryConf {
            factory_url_prefix: self.factory_url_prefix.clone().unwrap_or_default(),
            instance_url_prefix: self.instance_url_prefix.clone().unwrap_or_default(),
            headers,
            ..Default::default()
        }
    }
}

/// What a `lookup` resolves against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupKey {
    Id(String),
    Address(Address),
}

impl LookupKey {
    /// The id wins when both are given
    pub fn from_args(id: Option<String>, address: Option<Address>) -> Result<Self, ServiceError> {
        match (id, address) {
            (Some(id), _) => Ok(LookupKey::Id(id)),
            (None, Some(address)) => Ok(LookupKey::Address(address)),
            (None, None) => Err(ServiceError::LookupKeyMissing),
        }
    }
}

impl std::fmt::Display for LookupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LookupKey::Id(id) => write!(f, "{}", id),
            LookupKey::Address(address) => write!(f, "{:#x}", address),
        }
    }
}

fn parse_registry_header(raw: &str) -> Result<(String, String), String> {
    match raw.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected NAME:VALUE, got '{}'", raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_parsing() {
        assert_eq!(
            parse_registry_header("x-api-key: secret").unwrap(),
            ("x-api-key".to_string(), "secret".to_string())
        );
        assert_eq!(
            parse_registry_header("authorization:Bearer a:b").unwrap().1,
            "Bearer a:b"
        );
        assert!(parse_registry_header("no-colon").is_err());
        assert!(parse_registry_header(":value").is_err());
    }

    #[test]
    fn test_processor_config_from_flags() {
        let config = Config::try_parse_from([
            "ethbridge",
            "-x",
            "5",
            "-P",
            "--hex-values",
            "--receipt-poll-interval-ms",
            "250",
        ])
        .unwrap();

        let conf = config.processor_config();
        assert_eq!(conf.max_wait, Duration::from_secs(5));
        assert_eq!(conf.poll_interval, Duration::from_millis(250));
        assert!(conf.predict_nonces);
        assert!(conf.hex_values_in_receipt);
        assert!(config.command.is_none(), "Serve is the default");
    }

    #[test]
    fn test_registry_headers_group_by_name() {
        let config = Config::try_parse_from([
            "ethbridge",
            "--factory-url-prefix",
            "http://registry/abis",
            "--registry-header",
            "x-a:1",
            "--registry-header",
            "x-a:2",
        ])
        .unwrap();

        let conf = config.registry_config();
        assert_eq!(conf.factory_url_prefix, "http://registry/abis");
        assert_eq!(conf.headers.get("x-a"), Some(&vec!["1".to_string(), "2".to_string()]));
    }

    #[test]
    fn test_lookup_key_selection() {
        let address = Address::repeat_byte(0xab);
        assert_eq!(
            LookupKey::from_args(Some("erc20".into()), None).unwrap(),
            LookupKey::Id("erc20".into())
        );
        let key = LookupKey::from_args(None, Some(address)).unwrap();
        assert_eq!(key, LookupKey::Address(address));
        assert_eq!(key.to_string(), format!("{:#x}", address));

        let err = LookupKey::from_args(None, None).unwrap_err();
        assert!(matches!(err, ServiceError::LookupKeyMissing));
        assert_eq!(err.to_string(), "lookup needs --id or --address");
    }

    #[test]
    fn test_lookup_needs_a_key() {
        assert!(Config::try_parse_from(["ethbridge", "lookup"]).is_err());
        assert!(Config::try_parse_from(["ethbridge", "lookup", "--id", "a", "--address", "0x00"]).is_err());

        let config = Config::try_parse_from(["ethbridge", "lookup", "--id", "erc20"]).unwrap();
        assert!(matches!(config.command, Some(Command::Lookup { id: Some(ref id), .. }) if id == "erc20"));
    }
}
