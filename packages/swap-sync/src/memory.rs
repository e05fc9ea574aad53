//! In-memory ledger and metadata store.
//!
//! Mirrors the swap contract's observable behaviour: pre-incremented id
//! counters, consumed bid slots that read back as the null address, and owner
//! checks on every write. Used by the CLI (seeded from a JSON snapshot) and by
//! tests, which can also inject per-method failures and latency.

use crate::ledger::LedgerGateway;
use crate::metadata::MetadataStore;
use crate::Error;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::{Mutex, RwLock};
use std::time::Duration;
use swap_types::{
    metadata_key, Address, AssetMetadata, BidId, BidRecord, OwnBid, ProposalEntry, ProposalId,
    TokenId,
};
use tracing::info;

// --- Snapshot format ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSnapshot {
    #[serde(default)]
    pub proposals: Vec<StoredProposal>,
    #[serde(default)]
    pub bids: Vec<StoredBid>,
    /// Keyed by `metadata_key`.
    #[serde(default)]
    pub metadata: BTreeMap<String, AssetMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredProposal {
    pub proposal_id: ProposalId,
    pub owner: Address,
    pub nft_address: Address,
    pub token_id: TokenId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredBid {
    pub bid_id: BidId,
    pub proposal_id: ProposalId,
    pub bidder: Address,
    pub nft_address: Address,
    pub token_id: TokenId,
}

impl LedgerSnapshot {
    pub fn load(path: &Path) -> Result<Self, Error> {
        let data = std::fs::read(path).map_err(|e| {
            Error::Config(format!("Failed to read snapshot {}: {e}", path.display()))
        })?;
        let snapshot: Self = serde_json::from_slice(&data)
            .map_err(|e| Error::Config(format!("Failed to parse snapshot: {e}")))?;
        info!(
            path = %path.display(),
            proposals = snapshot.proposals.len(),
            bids = snapshot.bids.len(),
            documents = snapshot.metadata.len(),
            "Snapshot loaded"
        );
        Ok(snapshot)
    }
}

/// A write the ledger accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerWrite {
    AcceptBid { sender: Address, proposal_id: ProposalId, bid_id: BidId },
    RefuseBid { sender: Address, proposal_id: ProposalId, bid_id: BidId },
    DeleteBid { sender: Address, bid_id: BidId },
    DeleteProposal { sender: Address, proposal_id: ProposalId },
}

// --- Ledger ---

#[derive(Default)]
struct LedgerState {
    /// Open proposals only.
    proposals: BTreeMap<ProposalId, StoredProposal>,
    /// Every slot ever issued; consumed slots hold `BidRecord::empty_slot()`.
    bids: BTreeMap<BidId, BidRecord>,
    bid_refs: BTreeMap<ProposalId, Vec<BidId>>,
    last_proposal_id: u64,
    last_bid_id: u64,
    failing: HashSet<&'static str>,
    writes: Vec<LedgerWrite>,
}

/// In-memory swap ledger.
pub struct MemoryLedger {
    state: Mutex<LedgerState>,
    latency: RwLock<Duration>,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LedgerState::default()),
            latency: RwLock::new(Duration::ZERO),
        }
    }

    pub fn from_snapshot(snapshot: &LedgerSnapshot) -> Self {
        let ledger = Self::new();
        {
            let mut state = ledger.lock();
            for p in &snapshot.proposals {
                state.last_proposal_id = state.last_proposal_id.max(p.proposal_id.0);
                state.proposals.insert(p.proposal_id, p.clone());
            }
            for b in &snapshot.bids {
                state.last_bid_id = state.last_bid_id.max(b.bid_id.0);
                state.bids.insert(
                    b.bid_id,
                    BidRecord {
                        nft_address: b.nft_address.clone(),
                        token_id: b.token_id.clone(),
                        owner: b.bidder.clone(),
                        proposal_id: b.proposal_id,
                    },
                );
                state.bid_refs.entry(b.proposal_id).or_default().push(b.bid_id);
            }
        }
        ledger
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // --- Seeding ---

    pub fn create_proposal(&self, owner: &Address, nft_address: &Address, token_id: TokenId) -> ProposalId {
        let mut state = self.lock();
        state.last_proposal_id += 1;
        let proposal_id = ProposalId(state.last_proposal_id);
        state.proposals.insert(
            proposal_id,
            StoredProposal {
                proposal_id,
                owner: owner.clone(),
                nft_address: nft_address.clone(),
                token_id,
            },
        );
        proposal_id
    }

    pub fn place_bid(
        &self,
        bidder: &Address,
        proposal_id: ProposalId,
        nft_address: &Address,
        token_id: TokenId,
    ) -> BidId {
        let mut state = self.lock();
        state.last_bid_id += 1;
        let bid_id = BidId(state.last_bid_id);
        state.bids.insert(
            bid_id,
            BidRecord {
                nft_address: nft_address.clone(),
                token_id,
                owner: bidder.clone(),
                proposal_id,
            },
        );
        state.bid_refs.entry(proposal_id).or_default().push(bid_id);
        bid_id
    }

    // --- Fault injection / inspection ---

    /// Make every call to `method` (a `LedgerGateway` method name) fail.
    pub fn fail_method(&self, method: &'static str) {
        self.lock().failing.insert(method);
    }

    pub fn recover_method(&self, method: &'static str) {
        self.lock().failing.remove(method);
    }

    /// Delay every call by `latency` before it touches state.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.write().unwrap_or_else(|e| e.into_inner()) = latency;
    }

    pub fn writes(&self) -> Vec<LedgerWrite> {
        self.lock().writes.clone()
    }

    pub fn is_open(&self, proposal_id: ProposalId) -> bool {
        self.lock().proposals.contains_key(&proposal_id)
    }

    /// Enter a call: apply latency, then fail if `method` is poisoned.
    async fn enter(&self, method: &'static str) -> Result<(), Error> {
        let latency = *self.latency.read().unwrap_or_else(|e| e.into_inner());
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.lock().failing.contains(method) {
            return Err(Error::Ledger(format!("{method}: injected failure")));
        }
        Ok(())
    }
}

fn revert(reason: impl std::fmt::Display) -> Error {
    Error::Ledger(format!("execution reverted: {reason}"))
}

impl LedgerState {
    fn owned_proposal(&self, sender: &Address, proposal_id: ProposalId) -> Result<&StoredProposal, Error> {
        let proposal = self
            .proposals
            .get(&proposal_id)
            .ok_or_else(|| revert(format!("proposal {proposal_id} is not open")))?;
        if &proposal.owner != sender {
            return Err(revert(format!("{sender} does not own proposal {proposal_id}")));
        }
        Ok(proposal)
    }

    fn live_bid_on(&self, proposal_id: ProposalId, bid_id: BidId) -> Result<&BidRecord, Error> {
        match self.bids.get(&bid_id) {
            Some(bid) if !bid.is_sentinel() && bid.proposal_id == proposal_id => Ok(bid),
            _ => Err(revert(format!("bid {bid_id} is not open on proposal {proposal_id}"))),
        }
    }

    fn consume_bid(&mut self, bid_id: BidId) {
        self.bids.insert(bid_id, BidRecord::empty_slot());
    }
}

#[async_trait]
impl LedgerGateway for MemoryLedger {
    async fn proposal_count(&self) -> Result<u64, Error> {
        self.enter("proposal_count").await?;
        let state = self.lock();
        Ok(state.last_proposal_id + 1)
    }

    async fn my_proposals(&self, owner: &Address, bound: u64) -> Result<Vec<ProposalEntry>, Error> {
        self.enter("my_proposals").await?;
        let state = self.lock();
        Ok(state
            .proposals
            .values()
            .filter(|p| p.proposal_id.0 <= bound && &p.owner == owner)
            .map(|p| ProposalEntry {
                nft_address: p.nft_address.clone(),
                proposal_id: p.proposal_id,
                token_id: p.token_id.clone(),
            })
            .collect())
    }

    async fn bids_for_proposal(&self, proposal_id: ProposalId) -> Result<Vec<BidId>, Error> {
        self.enter("bids_for_proposal").await?;
        let state = self.lock();
        Ok(state.bid_refs.get(&proposal_id).cloned().unwrap_or_default())
    }

    async fn bid(&self, bid_id: BidId) -> Result<BidRecord, Error> {
        self.enter("bid").await?;
        let state = self.lock();
        // Unknown ids read as an empty slot, like an unset mapping entry.
        Ok(state.bids.get(&bid_id).cloned().unwrap_or_else(BidRecord::empty_slot))
    }

    async fn bid_count(&self) -> Result<u64, Error> {
        self.enter("bid_count").await?;
        let state = self.lock();
        Ok(state.last_bid_id + 1)
    }

    async fn my_bids(&self, bidder: &Address, bound: u64) -> Result<Vec<OwnBid>, Error> {
        self.enter("my_bids").await?;
        let state = self.lock();
        Ok(state
            .bids
            .iter()
            .filter(|(id, bid)| id.0 <= bound && &bid.owner == bidder)
            .map(|(id, bid)| OwnBid {
                nft_address: bid.nft_address.clone(),
                token_id: bid.token_id.clone(),
                bid_id: *id,
            })
            .collect())
    }

    async fn accept_bid(&self, sender: &Address, proposal_id: ProposalId, bid_id: BidId) -> Result<(), Error> {
        self.enter("accept_bid").await?;
        let mut state = self.lock();
        state.owned_proposal(sender, proposal_id)?;
        state.live_bid_on(proposal_id, bid_id)?;
        state.consume_bid(bid_id);
        state.proposals.remove(&proposal_id);
        state.writes.push(LedgerWrite::AcceptBid { sender: sender.clone(), proposal_id, bid_id });
        Ok(())
    }

    async fn refuse_bid(&self, sender: &Address, proposal_id: ProposalId, bid_id: BidId) -> Result<(), Error> {
        self.enter("refuse_bid").await?;
        let mut state = self.lock();
        state.owned_proposal(sender, proposal_id)?;
        state.live_bid_on(proposal_id, bid_id)?;
        state.consume_bid(bid_id);
        state.writes.push(LedgerWrite::RefuseBid { sender: sender.clone(), proposal_id, bid_id });
        Ok(())
    }

    async fn delete_bid(&self, sender: &Address, bid_id: BidId) -> Result<(), Error> {
        self.enter("delete_bid").await?;
        let mut state = self.lock();
        match state.bids.get(&bid_id) {
            Some(bid) if !bid.is_sentinel() && &bid.owner == sender => {}
            _ => return Err(revert(format!("{sender} has no open bid {bid_id}"))),
        }
        state.consume_bid(bid_id);
        state.writes.push(LedgerWrite::DeleteBid { sender: sender.clone(), bid_id });
        Ok(())
    }

    async fn delete_proposal(&self, sender: &Address, proposal_id: ProposalId) -> Result<(), Error> {
        self.enter("delete_proposal").await?;
        let mut state = self.lock();
        state.owned_proposal(sender, proposal_id)?;
        state.proposals.remove(&proposal_id);
        state.writes.push(LedgerWrite::DeleteProposal { sender: sender.clone(), proposal_id });
        Ok(())
    }
}

// --- Metadata ---

/// In-memory metadata store keyed by `metadata_key`.
#[derive(Default)]
pub struct MemoryMetadataStore {
    documents: RwLock<HashMap<String, AssetMetadata>>,
    unavailable: RwLock<bool>,
    latency: RwLock<Duration>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from a snapshot. Keys are `<address>-<token id>` in any casing or
    /// zero-padding; they are stored in the form `metadata_key` builds.
    pub fn from_snapshot(snapshot: &LedgerSnapshot) -> Result<Self, Error> {
        let store = Self::new();
        for (key, meta) in &snapshot.metadata {
            let (nft_address, token_id) = parse_metadata_key(key)?;
            store.insert(&nft_address, &token_id, meta.clone());
        }
        Ok(store)
    }

    pub fn insert(&self, nft_address: &Address, token_id: &TokenId, metadata: AssetMetadata) {
        self.documents
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(metadata_key(nft_address, token_id), metadata);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write().unwrap_or_else(|e| e.into_inner()) = unavailable;
    }

    /// Delay every lookup by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.write().unwrap_or_else(|e| e.into_inner()) = latency;
    }
}

fn parse_metadata_key(key: &str) -> Result<(Address, TokenId), Error> {
    let invalid = |reason: String| Error::Config(format!("metadata key {key:?}: {reason}"));
    let (address, token_id) = key
        .rsplit_once('-')
        .ok_or_else(|| invalid("expected <address>-<token id>".into()))?;
    let address = address.parse().map_err(|e: swap_types::TypeError| invalid(e.to_string()))?;
    let token_id = token_id.parse().map_err(|e: swap_types::TypeError| invalid(e.to_string()))?;
    Ok((address, token_id))
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn lookup(&self, key: &str) -> Result<Option<AssetMetadata>, Error> {
        let latency = *self.latency.read().unwrap_or_else(|e| e.into_inner());
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if *self.unavailable.read().unwrap_or_else(|e| e.into_inner()) {
            return Err(Error::Metadata("store unavailable".into()));
        }
        Ok(self
            .documents
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned())
    }
}

// --- Test helpers (shared across module tests) ---
