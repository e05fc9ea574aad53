//! Port to the swap ledger (proposal and bid registry).

use crate::Error;
use async_trait::async_trait;
use swap_types::{Address, BidId, BidRecord, OwnBid, ProposalEntry, ProposalId};

/// Count, read and write operations against the proposal/bid ledger.
///
/// Account-scoped reads and all writes name the acting account explicitly;
/// the gateway signs writes on that account's behalf and resolves once the
/// transaction is confirmed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Proposal counter. Pre-incremented: the highest issued id is `count - 1`.
    async fn proposal_count(&self) -> Result<u64, Error>;

    /// Open proposals owned by `owner` with ids up to `bound`.
    async fn my_proposals(&self, owner: &Address, bound: u64) -> Result<Vec<ProposalEntry>, Error>;

    /// Bid ids referencing a proposal, in ledger order. May include consumed slots.
    async fn bids_for_proposal(&self, proposal_id: ProposalId) -> Result<Vec<BidId>, Error>;

    async fn bid(&self, bid_id: BidId) -> Result<BidRecord, Error>;

    async fn bid_count(&self) -> Result<u64, Error>;

    /// Bids `bidder` placed on other accounts' proposals, ids up to `bound`.
    async fn my_bids(&self, bidder: &Address, bound: u64) -> Result<Vec<OwnBid>, Error>;

    async fn accept_bid(&self, sender: &Address, proposal_id: ProposalId, bid_id: BidId) -> Result<(), Error>;

    async fn refuse_bid(&self, sender: &Address, proposal_id: ProposalId, bid_id: BidId) -> Result<(), Error>;

    async fn delete_bid(&self, sender: &Address, bid_id: BidId) -> Result<(), Error>;

    async fn delete_proposal(&self, sender: &Address, proposal_id: ProposalId) -> Result<(), Error>;
}
