use std::{sync::Arc, time::Duration};

use anyhow::Context;
use collector_core::{
    chain::{ChainClient, EvmChainConfig},
    context::RunContext,
    nonce::NonceProvider,
    signer::KeyProvider,
};
use collector_executors::{
    Collector, CollectorOptions, DestinationAccount, SourceAccount, Transactor,
};
use collector_gas_station::GasStationClientBuilder;
use erc20_collector::config::{self, CollectorConfig, LogFormat};
use futures::future::try_join_all;
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::get_config().context("Failed to load configuration")?;

    let subscriber = tracing_subscriber::registry().with(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "erc20_collector=info,collector_executors=debug,collector_core=info,collector_gas_station=info"
                .into()
        }),
    );

    match config.log.format {
        LogFormat::Json => subscriber
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => subscriber.with(tracing_subscriber::fmt::layer()).init(),
    }

    let http_client = reqwest::Client::builder()
        .build()
        .context("Failed to build HTTP client")?;

    let chain = EvmChainConfig {
        rpc_url: &config.rpc.url,
        headers: &config.rpc.headers,
    }
    .connect(http_client.clone())
    .await?;
    let chain_id = chain.chain_id();
    tracing::info!(chain_id, rpc_url = %chain.rpc_url(), "Chain client initialized");

    let gas_station = GasStationClientBuilder::new(&config.gas_station.url)?
        .with_timeout(Duration::from_secs(config.gas_station.timeout_seconds))
        .with_client(http_client)
        .build()?;
    tracing::info!(url = %gas_station.url(), "Gas station client initialized");

    let (destination, sources) = resolve_accounts(&config, chain_id).await?;
    tracing::info!(
        destination = %destination.address(),
        sources = sources.len(),
        "Accounts resolved"
    );

    let settings = &config.collector;
    let transactor = Transactor::new(
        Arc::new(chain),
        Arc::new(NonceProvider::new(settings.nonce.clone())),
    )
    .with_poll_interval(settings.poll_interval());

    let collector = Collector::new(
        transactor,
        Arc::new(gas_station),
        CollectorOptions {
            concurrency: settings.concurrency,
            confirmation_timeout: settings.confirmation_timeout(),
        },
    );

    let (root, cancel) = RunContext::new();
    let ctx = match settings.run_timeout() {
        Some(timeout) => root.with_timeout(timeout),
        None => root,
    };

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Shutdown signal received, cancelling collection");
                cancel.cancel();
            }
            Err(e) => tracing::warn!("Failed to listen for Ctrl+C: {}", e),
        }
    });

    let results = collector.collect(&ctx, &destination, sources).await;

    for result in &results {
        match result.transaction_hash {
            Some(hash) => println!(
                "{} {} {} {}",
                result.account.address(),
                result.account.token,
                result.status,
                hash
            ),
            None => println!(
                "{} {} {}",
                result.account.address(),
                result.account.token,
                result.status
            ),
        }
    }

    Ok(())
}

async fn resolve_accounts(
    config: &CollectorConfig,
    chain_id: u64,
) -> anyhow::Result<(DestinationAccount, Vec<SourceAccount>)> {
    let destination = DestinationAccount {
        key_provider: KeyProvider::from_credential(&config.destination, chain_id)
            .await
            .context("Failed to resolve destination key")?,
    };

    let sources = try_join_all(config.sources.iter().enumerate().map(
        |(index, source)| async move {
            let key_provider = KeyProvider::from_credential(&source.credential, chain_id)
                .await
                .with_context(|| format!("Failed to resolve key for source #{index}"))?;
            Ok::<_, anyhow::Error>(SourceAccount {
                key_provider,
                token: source.token,
                amount: source.amount.clone(),
            })
        },
    ))
    .await?;

    Ok((destination, sources))
}
