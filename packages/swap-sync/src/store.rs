//! View state container.
//!
//! [`ViewState`] lives in a `watch` channel owned by [`Store`]. Rendering
//! subscribes and reads snapshots; the sync passes and the action controller
//! change it only through the transition methods below.

use crate::bid_resolver::BidIndex;
use crate::Error;
use serde::Serialize;
use std::fmt;
use swap_types::{Address, BidId, BidRecord, OwnBid, Proposal, ProposalId};
use tokio::sync::watch;
use tracing::debug;

/// The four mutating commands, each with its own busy flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    AcceptBid,
    RefuseBid,
    DeleteBid,
    DeleteProposal,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CommandKind::AcceptBid => "accept bid",
            CommandKind::RefuseBid => "refuse bid",
            CommandKind::DeleteBid => "delete bid",
            CommandKind::DeleteProposal => "delete proposal",
        })
    }
}

/// One in-flight flag per command kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusyFlags {
    pub accept_bid: bool,
    pub refuse_bid: bool,
    pub delete_bid: bool,
    pub delete_proposal: bool,
}

impl BusyFlags {
    pub fn get(&self, kind: CommandKind) -> bool {
        match kind {
            CommandKind::AcceptBid => self.accept_bid,
            CommandKind::RefuseBid => self.refuse_bid,
            CommandKind::DeleteBid => self.delete_bid,
            CommandKind::DeleteProposal => self.delete_proposal,
        }
    }

    fn slot(&mut self, kind: CommandKind) -> &mut bool {
        match kind {
            CommandKind::AcceptBid => &mut self.accept_bid,
            CommandKind::RefuseBid => &mut self.refuse_bid,
            CommandKind::DeleteBid => &mut self.delete_bid,
            CommandKind::DeleteProposal => &mut self.delete_proposal,
        }
    }

    pub fn any(&self) -> bool {
        self.accept_bid || self.refuse_bid || self.delete_bid || self.delete_proposal
    }
}

/// Everything the view renders.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub account: Option<Address>,
    /// Grows one proposal at a time while `loading`; never shrinks within a pass.
    pub proposals: Vec<Proposal>,
    pub bid_index: BidIndex,
    pub my_bids: Vec<OwnBid>,
    pub loading: bool,
    pub bids_loading: bool,
    pub selected: Option<ProposalId>,
    pub error: Option<String>,
    pub busy: BusyFlags,
    #[serde(skip)]
    proposal_epoch: u64,
    #[serde(skip)]
    bid_epoch: u64,
    #[serde(skip)]
    account_epoch: u64,
}

impl ViewState {
    /// Stamp of the current proposal pass. Bumped by every account change and resync.
    pub fn proposal_epoch(&self) -> u64 {
        self.proposal_epoch
    }

    pub fn bid_epoch(&self) -> u64 {
        self.bid_epoch
    }

    /// Stamp of the current session. Bumped only by account changes.
    pub fn account_epoch(&self) -> u64 {
        self.account_epoch
    }

    pub fn proposal(&self, proposal_id: ProposalId) -> Option<&Proposal> {
        self.proposals.iter().find(|p| p.proposal_id == proposal_id)
    }

    pub fn selected_proposal(&self) -> Option<&Proposal> {
        self.selected.and_then(|id| self.proposal(id))
    }

    /// Resolved bids of the selected proposal, in ledger order.
    pub fn selected_bids(&self) -> &[BidRecord] {
        match self.selected {
            Some(id) => self.bid_index.bids(id),
            None => &[],
        }
    }

    pub fn bid_id_at(&self, proposal_id: ProposalId, index: usize) -> Option<BidId> {
        self.bid_index.bid_id(proposal_id, index)
    }

    /// Both sync passes have settled.
    pub fn is_settled(&self) -> bool {
        !self.loading && !self.bids_loading
    }
}

/// Owner of the [`ViewState`].
pub struct Store {
    tx: watch::Sender<ViewState>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ViewState::default());
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> ViewState {
        self.tx.borrow().clone()
    }

    pub fn read<R>(&self, f: impl FnOnce(&ViewState) -> R) -> R {
        f(&self.tx.borrow())
    }

    /// Wait until `pred` holds and return that state.
    pub async fn wait_for(&self, mut pred: impl FnMut(&ViewState) -> bool) -> ViewState {
        let mut rx = self.tx.subscribe();
        let state = match rx.wait_for(|s| pred(s)).await {
            Ok(state) => state.clone(),
            // Unreachable while `self` holds the sender.
            Err(_) => self.snapshot(),
        };
        state
    }

    // --- Account ---

    /// Wipe the view for a new (or no) account and invalidate every running pass.
    pub(crate) fn reset_for_account(&self, account: Option<Address>) {
        self.tx.send_modify(|s| {
            let connected = account.is_some();
            s.account = account;
            s.proposals.clear();
            s.bid_index = BidIndex::default();
            s.my_bids.clear();
            s.selected = None;
            s.error = None;
            s.loading = connected;
            s.bids_loading = connected;
            s.proposal_epoch += 1;
            s.bid_epoch += 1;
            s.account_epoch += 1;
        });
    }

    // --- Proposal pass ---

    /// Start a proposal pass; returns its epoch.
    ///
    /// Clears the bid index so no command can address a bid id from an older pass.
    pub(crate) fn begin_proposal_pass(&self) -> u64 {
        let mut epoch = 0;
        self.tx.send_modify(|s| {
            s.proposal_epoch += 1;
            s.proposals.clear();
            s.bid_index = BidIndex::default();
            s.loading = true;
            epoch = s.proposal_epoch;
        });
        epoch
    }

    /// Append an enriched proposal. `false` if the pass is stale.
    pub(crate) fn push_proposal(&self, epoch: u64, proposal: Proposal) -> bool {
        self.tx.send_if_modified(|s| {
            if s.proposal_epoch != epoch {
                return false;
            }
            s.proposals.push(proposal);
            true
        })
    }

    pub(crate) fn finish_proposal_pass(&self, epoch: u64, bid_index: BidIndex) -> bool {
        self.tx.send_if_modified(|s| {
            if s.proposal_epoch != epoch {
                return false;
            }
            s.bid_index = bid_index;
            s.loading = false;
            true
        })
    }

    /// Abort a pass: keep what was resolved so far, record the error.
    pub(crate) fn fail_proposal_pass(&self, epoch: u64, error: &Error) -> bool {
        self.tx.send_if_modified(|s| {
            if s.proposal_epoch != epoch {
                return false;
            }
            s.error = Some(error.to_string());
            s.loading = false;
            true
        })
    }

    // --- Own-bid pass ---

    pub(crate) fn begin_bid_pass(&self) -> u64 {
        let mut epoch = 0;
        self.tx.send_modify(|s| {
            s.bid_epoch += 1;
            s.my_bids.clear();
            s.bids_loading = true;
            epoch = s.bid_epoch;
        });
        epoch
    }

    pub(crate) fn finish_bid_pass(&self, epoch: u64, bids: Vec<OwnBid>) -> bool {
        self.tx.send_if_modified(|s| {
            if s.bid_epoch != epoch {
                return false;
            }
            s.my_bids = bids;
            s.bids_loading = false;
            true
        })
    }

    pub(crate) fn fail_bid_pass(&self, epoch: u64, error: &Error) -> bool {
        self.tx.send_if_modified(|s| {
            if s.bid_epoch != epoch {
                return false;
            }
            s.error = Some(error.to_string());
            s.bids_loading = false;
            true
        })
    }

    // --- Selection / errors ---

    pub(crate) fn select(&self, proposal_id: ProposalId) -> Result<(), Error> {
        let mut found = false;
        self.tx.send_if_modified(|s| {
            found = s.proposal(proposal_id).is_some();
            if found {
                s.selected = Some(proposal_id);
            }
            found
        });
        if found {
            Ok(())
        } else {
            Err(Error::UnknownProposal(proposal_id))
        }
    }

    pub(crate) fn close_selection(&self) {
        self.tx.send_if_modified(|s| s.selected.take().is_some());
    }

    pub(crate) fn record_error(&self, error: &Error) {
        self.tx.send_modify(|s| s.error = Some(error.to_string()));
    }

    // --- Busy flags ---

    /// Set the busy flag for `kind`, or fail if a command of that kind is in flight.
    pub(crate) fn begin_command(&self, kind: CommandKind) -> Result<BusyGuard<'_>, Error> {
        let mut acquired = false;
        self.tx.send_if_modified(|s| {
            let flag = s.busy.slot(kind);
            if *flag {
                return false;
            }
            *flag = true;
            acquired = true;
            true
        });
        if acquired {
            debug!(command = %kind, "Busy flag set");
            Ok(BusyGuard { store: self, kind })
        } else {
            Err(Error::Busy(kind))
        }
    }

    fn end_command(&self, kind: CommandKind) {
        self.tx.send_modify(|s| *s.busy.slot(kind) = false);
        debug!(command = %kind, "Busy flag cleared");
    }
}

/// RAII guard from [`Store::begin_command`]. Clears the busy flag on drop.
pub struct BusyGuard<'a> {
    store: &'a Store,
    kind: CommandKind,
}

impl BusyGuard<'_> {
    pub fn kind(&self) -> CommandKind {
        self.kind
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.store.end_command(self.kind);
    }
}
