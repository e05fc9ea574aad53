//! Sessions seeded from a JSON ledger snapshot, as the binary runs them.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use swap_sync::memory::{LedgerSnapshot, MemoryLedger, MemoryMetadataStore};
use swap_sync::notify::TracingSink;
use swap_sync::{Config, Error, Session};
use swap_types::{Address, BidId, ProposalId};

const ALICE: &str = "0x00000000000000000000000000000000000a11ce";

fn snapshot_json() -> serde_json::Value {
    serde_json::json!({
        "proposals": [
            { "proposalId": 1, "owner": ALICE, "nftAddress": "0x00000000000000000000000000000000000000AA", "tokenId": 7 },
            { "proposalId": 2, "owner": "0x0000000000000000000000000000000000000b0b", "nftAddress": "0x00000000000000000000000000000000000000bb", "tokenId": "8" }
        ],
        "bids": [
            { "bidId": 1, "proposalId": 1, "bidder": "0x0000000000000000000000000000000000000b0b", "nftAddress": "0x00000000000000000000000000000000000000cc", "tokenId": "1" },
            { "bidId": 2, "proposalId": 1, "bidder": "0x0000000000000000000000000000000000000000", "nftAddress": "0x0000000000000000000000000000000000000000", "tokenId": "0" },
            { "bidId": 3, "proposalId": 1, "bidder": "0x0000000000000000000000000000000000000b0b", "nftAddress": "0x00000000000000000000000000000000000000dd", "tokenId": "2" },
            { "bidId": 4, "proposalId": 2, "bidder": ALICE, "nftAddress": "0x00000000000000000000000000000000000000ee", "tokenId": "3" }
        ],
        "metadata": {
            "0x00000000000000000000000000000000000000AA-07": { "title": "Punk", "description": "A punk", "imageUrl": "ipfs://punk" }
        }
    })
}

fn write_snapshot(name: &str) -> Result<PathBuf> {
    let path = std::env::temp_dir().join(format!("swap-sync-{}-{name}.json", std::process::id()));
    std::fs::write(&path, serde_json::to_vec_pretty(&snapshot_json())?)?;
    Ok(path)
}

#[tokio::test]
async fn test_snapshot_session_syncs_account() -> Result<()> {
    let path = write_snapshot("sync")?;
    let snapshot = LedgerSnapshot::load(&path)?;
    std::fs::remove_file(&path)?;

    let session = Session::start(
        Arc::new(MemoryLedger::from_snapshot(&snapshot)),
        Arc::new(MemoryMetadataStore::from_snapshot(&snapshot)?),
        Arc::new(TracingSink),
        &Config::default(),
    );
    let alice: Address = ALICE.parse()?;
    let since = session.state().proposal_epoch();
    session.connect(Some(alice))?;
    let state = tokio::time::timeout(Duration::from_secs(5), session.synced(since)).await?;

    assert_eq!(state.proposals.len(), 1);
    assert_eq!(state.proposals[0].proposal_id, ProposalId(1));
    assert_eq!(state.proposals[0].metadata.title, "Punk");
    assert_eq!(state.bid_index.bid_ids(ProposalId(1)), &[BidId(1), BidId(3)]);
    assert_eq!(state.my_bids.len(), 1);
    assert_eq!(state.my_bids[0].bid_id, BidId(4));

    let json = serde_json::to_value(&state)?;
    assert_eq!(json["proposals"][0]["imageUrl"], "ipfs://punk");
    assert_eq!(json["busy"]["acceptBid"], false);

    session.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_missing_snapshot_is_config_error() {
    let path = std::env::temp_dir().join("swap-sync-does-not-exist.json");
    let result = LedgerSnapshot::load(&path);
    assert!(matches!(result, Err(Error::Config(_))));
}

#[tokio::test]
async fn test_malformed_metadata_key_is_config_error() -> Result<()> {
    let mut json = snapshot_json();
    json["metadata"]["punk-without-token"] = serde_json::json!({ "title": "Orphan" });
    let snapshot: LedgerSnapshot = serde_json::from_value(json)?;

    let result = MemoryMetadataStore::from_snapshot(&snapshot);

    assert!(matches!(result, Err(Error::Config(_))));
    Ok(())
}
