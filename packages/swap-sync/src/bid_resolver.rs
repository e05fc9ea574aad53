//! Resolves a proposal's bid ids into bid records.

use crate::ledger::LedgerGateway;
use crate::metrics::METRICS;
use crate::Error;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::Ordering;
use swap_types::{BidId, BidRecord, ProposalId};
use tracing::{debug, warn};

/// Bids of one proposal with their ledger ids.
///
/// `bid_ids()[i]` is always the id of `bids()[i]`; the only way in is
/// [`ResolvedBids::push`], which appends to both sides together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedBids {
    bids: Vec<BidRecord>,
    bid_ids: Vec<BidId>,
}

impl ResolvedBids {
    pub fn push(&mut self, bid_id: BidId, record: BidRecord) {
        self.bids.push(record);
        self.bid_ids.push(bid_id);
    }

    pub fn bids(&self) -> &[BidRecord] {
        &self.bids
    }

    pub fn bid_ids(&self) -> &[BidId] {
        &self.bid_ids
    }

    pub fn bid_id(&self, index: usize) -> Option<BidId> {
        self.bid_ids.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.bids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty()
    }
}

/// Bid index for every proposal of a pass. Rebuilt from scratch on each pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BidIndex(BTreeMap<ProposalId, ResolvedBids>);

impl BidIndex {
    pub fn insert(&mut self, proposal_id: ProposalId, resolved: ResolvedBids) {
        self.0.insert(proposal_id, resolved);
    }

    pub fn get(&self, proposal_id: ProposalId) -> Option<&ResolvedBids> {
        self.0.get(&proposal_id)
    }

    /// Resolved bids for a proposal; empty when it has none or is unknown.
    pub fn bids(&self, proposal_id: ProposalId) -> &[BidRecord] {
        self.0.get(&proposal_id).map(ResolvedBids::bids).unwrap_or(&[])
    }

    pub fn bid_ids(&self, proposal_id: ProposalId) -> &[BidId] {
        self.0.get(&proposal_id).map(ResolvedBids::bid_ids).unwrap_or(&[])
    }

    pub fn bid_id(&self, proposal_id: ProposalId, index: usize) -> Option<BidId> {
        self.0.get(&proposal_id).and_then(|r| r.bid_id(index))
    }

    pub fn proposal_ids(&self) -> impl Iterator<Item = ProposalId> + '_ {
        self.0.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Fetch the bids referencing `proposal_id`, one at a time, dropping empty slots.
///
/// Any failed read aborts the whole proposal: no list with gaps is returned.
pub async fn resolve_bids(
    ledger: &dyn LedgerGateway,
    proposal_id: ProposalId,
) -> Result<ResolvedBids, Error> {
    let bid_ids = ledger.bids_for_proposal(proposal_id).await?;
    let mut resolved = ResolvedBids::default();

    for bid_id in bid_ids {
        let record = ledger.bid(bid_id).await?;
        if record.is_sentinel() {
            METRICS.sentinel_bids_skipped.fetch_add(1, Ordering::Relaxed);
            debug!(proposal_id = %proposal_id, bid_id = %bid_id, "Skipping empty bid slot");
            continue;
        }
        if record.proposal_id != proposal_id {
            warn!(
                proposal_id = %proposal_id,
                bid_id = %bid_id,
                targets = %record.proposal_id,
                "Bid back-reference does not match the proposal listing it"
            );
        }
        METRICS.bids_resolved.fetch_add(1, Ordering::Relaxed);
        resolved.push(bid_id, record);
    }

    debug!(proposal_id = %proposal_id, bids = resolved.len(), "Bids resolved");
    Ok(resolved)
}
