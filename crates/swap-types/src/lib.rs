//! Shared types for the NFT swap ledger.
//! No async and no I/O, so gateways, the sync engine and tests can all depend on it.

mod address;
mod error;
mod ids;
mod records;

pub use address::Address;
pub use error::TypeError;
pub use ids::{BidId, ProposalId, TokenId};
pub use records::{AssetMetadata, BidRecord, OwnBid, Proposal, ProposalEntry, metadata_key};
