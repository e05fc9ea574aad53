//! Opaque ledger identifiers.

use crate::TypeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ledger id of a proposal. Stops resolving once the proposal is deleted or fulfilled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProposalId(pub u64);

/// Ledger id of a bid. Stops resolving once the bid is accepted, refused or deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BidId(pub u64);

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for BidId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Token id of an NFT, kept as a decimal string (256-bit on the ledger).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "TokenIdRepr", into = "String")]
pub struct TokenId(String);

/// Snapshots and indexers write token ids either as JSON strings or as numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum TokenIdRepr {
    Text(String),
    Number(u64),
}

impl TryFrom<TokenIdRepr> for TokenId {
    type Error = TypeError;

    fn try_from(value: TokenIdRepr) -> Result<Self, Self::Error> {
        match value {
            TokenIdRepr::Text(s) => Self::try_from(s),
            TokenIdRepr::Number(n) => Ok(Self::from(n)),
        }
    }
}

impl TokenId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TokenId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let trimmed = value.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TypeError::InvalidTokenId(value));
        }
        // Canonical form: no leading zeros, so "007" and "7" build the same lookup key.
        let canonical = trimmed.trim_start_matches('0');
        let canonical = if canonical.is_empty() { "0" } else { canonical };
        Ok(Self(canonical.to_string()))
    }
}

impl FromStr for TokenId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_string())
    }
}

impl From<u64> for TokenId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl From<TokenId> for String {
    fn from(value: TokenId) -> Self {
        value.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
