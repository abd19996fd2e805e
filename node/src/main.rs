use anyhow::{Context, Result};
use clap::{value_parser, Arg, Command};
use std::path::PathBuf;
use std::sync::Arc;
use tbw_core::TrueBlockWeight;
use tbw_storage::{NodeApi, SnapshotStore};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod settings;

use settings::AppConfig;

fn cli() -> Command {
    Command::new("tbw-node")
        .version(env!("CARGO_PKG_VERSION"))
        .about("True Block Weight payout calculator")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path"),
        )
        .arg(
            Arg::new("snapshot")
                .short('s')
                .long("snapshot")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .required(true)
                .help("Ledger snapshot (JSON) to compute payouts from"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("Write the payout proposal here instead of stdout"),
        )
        .arg(
            Arg::new("now")
                .long("now")
                .value_name("UNIX_SECONDS")
                .value_parser(value_parser!(i64))
                .help("Run time; bounds stake events of the newest block (defaults to the system clock)"),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();

    let config = AppConfig::load(matches.get_one::<String>("config").map(String::as_str))?;
    init_logging(&config)?;

    if let Some(path) = config.source() {
        info!("Loaded configuration from {}", path.display());
    }

    let snapshot_path = matches
        .get_one::<PathBuf>("snapshot")
        .context("--snapshot is required")?;
    let store = Arc::new(
        SnapshotStore::open(snapshot_path)
            .await
            .with_context(|| format!("failed to open snapshot {}", snapshot_path.display()))?,
    );

    let network = store.network_config().await?;
    let now = matches
        .get_one::<i64>("now")
        .map(|unix| network.chain_time(*unix));
    let window = config.run_window(now)?;
    let policy = config.payout_policy()?;

    let engine = TrueBlockWeight::new(store.clone(), store.clone(), policy)?
        .with_business_income(store.clone());
    let payouts = engine.run(&window).await?;

    match store.nonce(&window.delegate_address).await {
        Ok(nonce) => info!(
            delegate = %window.delegate_address,
            next_nonce = nonce.saturating_add(1),
            recipients = payouts.payouts.len(),
            "Payout proposal ready for execution"
        ),
        Err(err) => warn!(error = %err, "Delegate nonce unavailable"),
    }

    let rendered = serde_json::to_string_pretty(&payouts)?;
    match matches.get_one::<PathBuf>("output") {
        Some(path) => {
            tokio::fs::write(path, rendered.as_bytes())
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("Payout proposal written to {}", path.display());
        }
        None => println!("{rendered}"),
    }

    Ok(())
}

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.log_format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_requires_snapshot() {
        assert!(cli().try_get_matches_from(["tbw-node"]).is_err());

        let matches = cli()
            .try_get_matches_from(["tbw-node", "-s", "snap.json", "--now", "1700000000"])
            .unwrap();
        assert_eq!(
            matches.get_one::<PathBuf>("snapshot"),
            Some(&PathBuf::from("snap.json"))
        );
        assert_eq!(matches.get_one::<i64>("now"), Some(&1_700_000_000));
    }
}
