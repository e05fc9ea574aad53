//! Swap sync binary: one synchronization of the configured account against a ledger snapshot.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use swap_sync::memory::{LedgerSnapshot, MemoryLedger};
use swap_sync::metrics::METRICS;
use swap_sync::notify::TracingSink;
use swap_sync::{Config, MetadataStore, Session};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting swap sync");

    let config = Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "Falling back to default configuration");
        Config::default()
    });

    info!(
        account = ?config.account.as_ref().map(|a| a.as_str()),
        snapshot = %config.snapshot_path,
        "Configuration loaded"
    );

    let snapshot = LedgerSnapshot::load(Path::new(&config.snapshot_path))?;
    let ledger = Arc::new(MemoryLedger::from_snapshot(&snapshot));
    let metadata = metadata_store(&config, &snapshot)?;

    let session = Session::start(ledger, metadata, Arc::new(TracingSink), &config);
    let Some(account) = config.account.clone() else {
        warn!("No account configured; nothing to synchronize");
        session.shutdown().await;
        return Ok(());
    };

    let since = session.state().proposal_epoch();
    session.connect(Some(account))?;

    let timeout = Duration::from_secs(config.sync.pass_timeout_secs);
    let state = tokio::select! {
        result = tokio::time::timeout(timeout, session.synced(since)) => match result {
            Ok(state) => state,
            Err(_) => {
                warn!(timeout_secs = config.sync.pass_timeout_secs, "Sync did not settle in time");
                session.state()
            }
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
            session.state()
        }
    };

    println!("{}", serde_json::to_string_pretty(&state)?);
    info!(metrics = %METRICS.render(), "Sync metrics");

    session.shutdown().await;
    Ok(())
}

#[cfg(feature = "http-metadata")]
fn metadata_store(config: &Config, _snapshot: &LedgerSnapshot) -> Result<Arc<dyn MetadataStore>, swap_sync::Error> {
    let store = swap_sync::http_metadata::HttpMetadataStore::new(&config.metadata)?;
    info!(endpoint = %config.metadata.query_url(), "Using HTTP metadata store");
    Ok(Arc::new(store))
}

#[cfg(not(feature = "http-metadata"))]
fn metadata_store(_config: &Config, snapshot: &LedgerSnapshot) -> Result<Arc<dyn MetadataStore>, swap_sync::Error> {
    Ok(Arc::new(swap_sync::memory::MemoryMetadataStore::from_snapshot(snapshot)?))
}
