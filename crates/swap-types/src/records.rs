//! Ledger records and enriched view records.

use crate::{Address, BidId, ProposalId, TokenId};
use serde::{Deserialize, Serialize};

/// One row of the ledger's "my proposals" listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalEntry {
    pub nft_address: Address,
    pub proposal_id: ProposalId,
    pub token_id: TokenId,
}

/// A resolved bid. A record whose `nft_address` is null is an empty slot, not a bid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidRecord {
    pub nft_address: Address,
    pub token_id: TokenId,
    pub owner: Address,
    pub proposal_id: ProposalId,
}

impl BidRecord {
    /// Placeholder the ledger returns for a never-filled or consumed slot.
    pub fn empty_slot() -> Self {
        Self {
            nft_address: Address::null(),
            token_id: TokenId::from(0),
            owner: Address::null(),
            proposal_id: ProposalId(0),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.nft_address.is_null()
    }
}

/// One row of the ledger's "my bids" listing: a bid the account placed on someone else's proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnBid {
    pub nft_address: Address,
    pub token_id: TokenId,
    pub bid_id: BidId,
}

/// Descriptive metadata held off-chain for an asset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetMetadata {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
}

/// Metadata of a proposal's asset, tagged with the ledger proposal it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub proposal_id: ProposalId,
    #[serde(flatten)]
    pub metadata: AssetMetadata,
}

/// Metadata store key: `<lower-case address>-<token id>`.
pub fn metadata_key(nft_address: &Address, token_id: &TokenId) -> String {
    format!("{nft_address}-{token_id}")
}
