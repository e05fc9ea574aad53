//! Proposal synchronization: the account's proposals, their metadata and their bids.

use crate::bid_resolver::{resolve_bids, BidIndex};
use crate::ledger::LedgerGateway;
use crate::metadata::MetadataStore;
use crate::metrics::METRICS;
use crate::store::Store;
use crate::Error;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;
use swap_types::{metadata_key, Address, Proposal, ProposalEntry, ProposalId};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Result of a committed pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassSummary {
    /// Proposals the ledger listed for the account.
    pub listed: usize,
    /// Proposals enriched with metadata and published to the view.
    pub enriched: usize,
    pub bids: usize,
}

pub struct ProposalSync {
    ledger: Arc<dyn LedgerGateway>,
    metadata: Arc<dyn MetadataStore>,
    bid_concurrency: usize,
}

impl ProposalSync {
    pub fn new(ledger: Arc<dyn LedgerGateway>, metadata: Arc<dyn MetadataStore>) -> Self {
        Self {
            ledger,
            metadata,
            bid_concurrency: 1,
        }
    }

    /// Resolve up to `limit` proposals' bid lists at once. 1 keeps resolution strictly sequential.
    pub fn with_bid_concurrency(mut self, limit: usize) -> Self {
        self.bid_concurrency = limit.max(1);
        self
    }

    /// Run one pass for `account`, publishing into `store` under `epoch`.
    ///
    /// Proposals are pushed as they resolve; the bid index is committed in one
    /// step at the end. On failure the partial proposal list stays and the
    /// error is recorded on the view.
    pub async fn run(&self, store: &Store, account: &Address, epoch: u64) -> Result<PassSummary, Error> {
        let start = Instant::now();
        METRICS.passes_started.fetch_add(1, Ordering::Relaxed);
        debug!(account = %account, epoch, "Proposal pass started");

        let result = self.sync(store, account, epoch).await;
        METRICS.record_pass_duration(start);

        match result {
            Ok((summary, index)) => {
                if store.finish_proposal_pass(epoch, index) {
                    METRICS.passes_completed.fetch_add(1, Ordering::Relaxed);
                    info!(
                        account = %account,
                        epoch,
                        listed = summary.listed,
                        enriched = summary.enriched,
                        bids = summary.bids,
                        "Proposal pass complete"
                    );
                    Ok(summary)
                } else {
                    METRICS.passes_superseded.fetch_add(1, Ordering::Relaxed);
                    debug!(epoch, "Proposal pass superseded before commit");
                    Err(Error::Cancelled)
                }
            }
            Err(Error::Cancelled) => {
                METRICS.passes_superseded.fetch_add(1, Ordering::Relaxed);
                debug!(epoch, "Proposal pass superseded");
                Err(Error::Cancelled)
            }
            Err(e) => {
                if store.fail_proposal_pass(epoch, &e) {
                    METRICS.passes_failed.fetch_add(1, Ordering::Relaxed);
                    error!(account = %account, epoch, error = %e, "Proposal pass failed");
                }
                Err(e)
            }
        }
    }

    async fn sync(&self, store: &Store, account: &Address, epoch: u64) -> Result<(PassSummary, BidIndex), Error> {
        let entries = self.list_proposals(account).await?;
        let mut proposal_ids = Vec::with_capacity(entries.len());
        let mut enriched = 0;

        for entry in &entries {
            proposal_ids.push(entry.proposal_id);
            if let Some(proposal) = self.enrich(entry).await? {
                if !store.push_proposal(epoch, proposal) {
                    return Err(Error::Cancelled);
                }
                enriched += 1;
            }
        }

        let index = self.build_bid_index(&proposal_ids).await?;
        let bids = proposal_ids.iter().map(|id| index.bids(*id).len()).sum();
        Ok((
            PassSummary {
                listed: entries.len(),
                enriched,
                bids,
            },
            index,
        ))
    }

    /// The account's open proposals. The counter is pre-incremented, so the bound is `count - 1`.
    pub async fn list_proposals(&self, account: &Address) -> Result<Vec<ProposalEntry>, Error> {
        let count = self.ledger.proposal_count().await?;
        if count == 0 {
            return Ok(Vec::new());
        }
        let entries = self.ledger.my_proposals(account, count - 1).await?;
        debug!(account = %account, count, listed = entries.len(), "Proposals listed");
        Ok(entries)
    }

    /// Attach metadata to a ledger proposal. `None` when the store has no document.
    async fn enrich(&self, entry: &ProposalEntry) -> Result<Option<Proposal>, Error> {
        let key = metadata_key(&entry.nft_address, &entry.token_id);
        match self.metadata.lookup(&key).await? {
            Some(metadata) => {
                METRICS.proposals_resolved.fetch_add(1, Ordering::Relaxed);
                Ok(Some(Proposal {
                    proposal_id: entry.proposal_id,
                    metadata,
                }))
            }
            None => {
                METRICS.metadata_gaps.fetch_add(1, Ordering::Relaxed);
                warn!(
                    gap = "metadata",
                    proposal_id = %entry.proposal_id,
                    key = %key,
                    "No metadata for ledger proposal, dropping it from the view"
                );
                Ok(None)
            }
        }
    }

    async fn build_bid_index(&self, proposal_ids: &[ProposalId]) -> Result<BidIndex, Error> {
        let mut index = BidIndex::default();

        if self.bid_concurrency <= 1 {
            for &proposal_id in proposal_ids {
                index.insert(proposal_id, resolve_bids(self.ledger.as_ref(), proposal_id).await?);
            }
            return Ok(index);
        }

        // Bounded fan-out. Results are keyed by proposal id, so completion order is irrelevant.
        // Dropping the set on an early return aborts the remaining tasks.
        let limit = Arc::new(Semaphore::new(self.bid_concurrency));
        let mut tasks = JoinSet::new();
        for &proposal_id in proposal_ids {
            let ledger = Arc::clone(&self.ledger);
            let limit = Arc::clone(&limit);
            tasks.spawn(async move {
                let _permit = limit.acquire_owned().await.map_err(|_| Error::Cancelled)?;
                let resolved = resolve_bids(ledger.as_ref(), proposal_id).await?;
                Ok::<_, Error>((proposal_id, resolved))
            });
        }
        while let Some(joined) = tasks.join_next().await {
            let (proposal_id, resolved) =
                joined.map_err(|e| Error::Ledger(format!("bid resolution task failed: {e}")))??;
            index.insert(proposal_id, resolved);
        }
        Ok(index)
    }
}
