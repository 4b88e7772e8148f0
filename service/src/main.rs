//! Ethereum transaction bridge service
//!
//! Reads `DeployContract` / `SendTransaction` requests as JSON lines on
//! stdin, submits them through the configured node and writes one reply per
//! request to stdout. Logs go to stderr.

mod config;
mod error;
mod stdio;

use std::sync::Arc;

use alloy_primitives::{hex, Address};
use clap::Parser;
use config::{Command, Config, LookupKey};
use error::ServiceError;
use ethbridge::{HttpRpcClient, RemoteRegistry, TxnProcessor};
use serde_json::json;
use tokio::io::BufReader;
use tracing::{error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::parse();

    let _subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    match config.command.clone() {
        None | Some(Command::Serve) => run_serve(&config).await?,
        Some(Command::Lookup { id, address }) => {
            if let Err(e) = run_lookup(&config, id, address).await {
                error!("Lookup failed: {}", e);
                return Err(e.into());
            }
        }
    }

    Ok(())
}

async fn run_serve(config: &Config) -> Result<(), ServiceError> {
    info!("Ethereum transaction bridge");
    info!("RPC URL: {}", config.rpc_url);

    let conf = config.processor_config();
    info!(
        "Max wait: {}s, poll interval: {}ms, predict nonces: {}, hex values: {}",
        conf.max_wait.as_secs(),
        conf.poll_interval.as_millis(),
        conf.predict_nonces,
        conf.hex_values_in_receipt
    );

    let rpc = HttpRpcClient::new(config.rpc_url.clone(), config.rpc_timeout())?;
    let processor = Arc::new(TxnProcessor::new(conf, Arc::new(rpc)));

    let input = BufReader::new(tokio::io::stdin());
    let summary = stdio::serve(processor, input, tokio::io::stdout()).await?;

    info!(
        "Done: {} messages, {} submitted, {} unparseable, {} replies written",
        summary.messages, summary.submitted, summary.unparseable, summary.replies
    );
    Ok(())
}

async fn run_lookup(
    config: &Config,
    id: Option<String>,
    address: Option<Address>,
) -> Result<(), ServiceError> {
    let registry = RemoteRegistry::new(config.registry_config())?;

    let key = LookupKey::from_args(id, address)?;
    let artifact = match &key {
        LookupKey::Id(id) => registry.load_factory_by_id(id).await?,
        LookupKey::Address(address) => registry.load_factory_by_address(address).await?,
    };

    let artifact = match artifact {
        Some(artifact) => artifact,
        None => {
            warn!("No registry entry for {}", key);
            return Err(ServiceError::NotFound(key.to_string()));
        }
    };

    info!("Found {} ({} bytes of bytecode)", key, artifact.bytecode.len());
    let out = json!({
        "abi": artifact.abi,
        "bytecode": hex::encode_prefixed(&artifact.bytecode),
        "devdoc": artifact.devdoc,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
