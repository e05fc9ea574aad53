use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use swap_sync::memory::{MemoryLedger, MemoryMetadataStore};
use swap_sync::notify::ChannelSink;
use swap_sync::{Config, LedgerGateway, Notification, Session, ViewState};
use swap_types::{Address, AssetMetadata, BidId, ProposalId, TokenId};
use tokio::sync::mpsc::UnboundedReceiver;

const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Harness {
    pub ledger: Arc<MemoryLedger>,
    pub metadata: Arc<MemoryMetadataStore>,
    pub session: Session,
    pub notifications: UnboundedReceiver<Notification>,
}

pub fn start() -> Harness {
    start_with(Config::default())
}

pub fn start_with(config: Config) -> Harness {
    let ledger = Arc::new(MemoryLedger::new());
    let metadata = Arc::new(MemoryMetadataStore::new());
    let (sink, notifications) = ChannelSink::new();
    let session = Session::start(ledger.clone(), metadata.clone(), Arc::new(sink), &config);
    Harness {
        ledger,
        metadata,
        session,
        notifications,
    }
}

/// Session whose ledger is `wrap` around the seeded in-memory ledger.
pub fn start_over(wrap: impl FnOnce(Arc<MemoryLedger>) -> Arc<dyn LedgerGateway>) -> Harness {
    let ledger = Arc::new(MemoryLedger::new());
    let metadata = Arc::new(MemoryMetadataStore::new());
    let (sink, notifications) = ChannelSink::new();
    let session = Session::start(wrap(ledger.clone()), metadata.clone(), Arc::new(sink), &Config::default());
    Harness {
        ledger,
        metadata,
        session,
        notifications,
    }
}

/// Deterministic non-null account address.
pub fn account(n: u8) -> Address {
    format!("0x{:040x}", 0xa000u64 + n as u64)
        .parse()
        .expect("valid address")
}

pub fn collection(n: u8) -> Address {
    format!("0x{:040x}", 0xc000u64 + n as u64)
        .parse()
        .expect("valid address")
}

pub fn metadata(n: u64) -> AssetMetadata {
    AssetMetadata {
        title: format!("Swap #{n}"),
        description: format!("Asset {n}"),
        image_url: format!("https://img.example/{n}.png"),
    }
}

impl Harness {
    /// Proposal by `owner` of `collection(n)` token `n`, with a metadata document.
    pub fn propose(&self, owner: &Address, n: u8) -> ProposalId {
        let nft = collection(n);
        let token = TokenId::from(n as u64);
        self.metadata.insert(&nft, &token, metadata(n as u64));
        self.ledger.create_proposal(owner, &nft, token)
    }

    /// Proposal whose asset has no metadata document.
    pub fn propose_undocumented(&self, owner: &Address, n: u8) -> ProposalId {
        self.ledger
            .create_proposal(owner, &collection(n), TokenId::from(n as u64))
    }

    /// Bid by `bidder` offering `collection(n)` token `n`.
    pub fn bid(&self, bidder: &Address, proposal_id: ProposalId, n: u8) -> BidId {
        self.ledger
            .place_bid(bidder, proposal_id, &collection(n), TokenId::from(n as u64))
    }

    pub async fn connect(&self, account: &Address) -> Result<ViewState> {
        let since = self.session.state().proposal_epoch();
        self.session.connect(Some(account.clone()))?;
        self.synced(since).await
    }

    pub async fn resync(&self) -> Result<ViewState> {
        let since = self.session.state().proposal_epoch();
        self.session.resync()?;
        self.synced(since).await
    }

    pub async fn synced(&self, since: u64) -> Result<ViewState> {
        Ok(tokio::time::timeout(SETTLE_TIMEOUT, self.session.synced(since)).await?)
    }

    pub fn proposal_ids(state: &ViewState) -> Vec<ProposalId> {
        state.proposals.iter().map(|p| p.proposal_id).collect()
    }
}
