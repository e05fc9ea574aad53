//! Error types for the sync engine.

use crate::store::CommandKind;
use std::fmt;
use swap_types::ProposalId;

/// Sync engine error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Configuration error.
    Config(String),
    /// Ledger read or write failed.
    Ledger(String),
    /// Metadata store unreachable or returned garbage.
    Metadata(String),
    /// A command of this kind is already in flight.
    Busy(CommandKind),
    /// No wallet account is active.
    NotConnected,
    /// Command needs a selected proposal.
    NoSelection,
    /// Proposal is not in the current view.
    UnknownProposal(ProposalId),
    /// No resolved bid at this position for the proposal.
    UnknownBid { proposal_id: ProposalId, index: usize },
    /// No own bid at this position.
    UnknownOwnBid(usize),
    /// Pass was superseded or the engine shut down.
    Cancelled,
}

impl Error {
    /// Gateway failure, as opposed to a rejected precondition.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Ledger(_) | Error::Metadata(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "config error: {msg}"),
            Error::Ledger(msg) => write!(f, "ledger error: {msg}"),
            Error::Metadata(msg) => write!(f, "metadata error: {msg}"),
            Error::Busy(kind) => write!(f, "{kind} already in progress"),
            Error::NotConnected => write!(f, "no wallet connected"),
            Error::NoSelection => write!(f, "no proposal selected"),
            Error::UnknownProposal(id) => write!(f, "proposal {id} is not in the current view"),
            Error::UnknownBid { proposal_id, index } => {
                write!(f, "no bid at position {index} for proposal {proposal_id}")
            }
            Error::UnknownOwnBid(index) => write!(f, "no own bid at position {index}"),
            Error::Cancelled => write!(f, "sync pass cancelled"),
        }
    }
}

impl std::error::Error for Error {}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::Config(e.to_string())
    }
}
