//! Mutating commands: accept, refuse and delete bids, delete proposals.
//!
//! | Command         | Closes selection | Resyncs | Records error |
//! |-----------------|------------------|---------|---------------|
//! | accept bid      | yes              | yes     | yes           |
//! | refuse bid      | no               | no      | yes           |
//! | delete bid      | no               | no      | no            |
//! | delete proposal | yes              | yes     | yes           |
//!
//! Every command holds its busy flag for exactly the duration of the ledger
//! call. A second command of the same kind is rejected with [`Error::Busy`]
//! while the first is in flight; commands of different kinds may overlap.

use crate::engine::SyncHandle;
use crate::ledger::LedgerGateway;
use crate::metrics::METRICS;
use crate::notify::{Notification, NotificationSink};
use crate::store::{BusyGuard, CommandKind, Store};
use crate::Error;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use swap_types::{Address, BidId, ProposalId};
use tracing::{error, info, warn};

/// What a settled command does to the view.
struct Effects {
    ok_message: &'static str,
    err_message: &'static str,
    closes_selection: bool,
    resyncs: bool,
    records_error: bool,
}

const fn effects(kind: CommandKind) -> Effects {
    match kind {
        CommandKind::AcceptBid => Effects {
            ok_message: "NFT Swapped!",
            err_message: "Error accepting bid",
            closes_selection: true,
            resyncs: true,
            records_error: true,
        },
        CommandKind::RefuseBid => Effects {
            ok_message: "Bid refused",
            err_message: "Error refusing bid",
            closes_selection: false,
            resyncs: false,
            records_error: true,
        },
        CommandKind::DeleteBid => Effects {
            ok_message: "Bid deleted successfully",
            err_message: "Error deleting bid",
            closes_selection: false,
            resyncs: false,
            records_error: false,
        },
        CommandKind::DeleteProposal => Effects {
            ok_message: "Proposal deleted successfully",
            err_message: "Error deleting proposal",
            closes_selection: true,
            resyncs: true,
            records_error: true,
        },
    }
}

/// Account a command was issued for, stamped with its session.
struct Issuer {
    account: Address,
    account_epoch: u64,
}

pub struct ActionController {
    ledger: Arc<dyn LedgerGateway>,
    store: Arc<Store>,
    notifier: Arc<dyn NotificationSink>,
    sync: SyncHandle,
}

impl ActionController {
    pub fn new(
        ledger: Arc<dyn LedgerGateway>,
        store: Arc<Store>,
        notifier: Arc<dyn NotificationSink>,
        sync: SyncHandle,
    ) -> Self {
        Self {
            ledger,
            store,
            notifier,
            sync,
        }
    }

    /// Accept the bid at `index` in the selected proposal's resolved bid list.
    pub async fn accept_bid(&self, index: usize) -> Result<(), Error> {
        let kind = CommandKind::AcceptBid;
        let busy = self.begin(kind)?;
        let (issuer, proposal_id, bid_id) = self.selected_bid(index).inspect_err(|_| count_rejected())?;
        info!(command = %kind, proposal_id = %proposal_id, bid_id = %bid_id, "Sending command");

        let result = self.ledger.accept_bid(&issuer.account, proposal_id, bid_id).await;
        drop(busy);
        self.settle(kind, &issuer, result)
    }

    /// Refuse the bid at `index` in the selected proposal's resolved bid list.
    pub async fn refuse_bid(&self, index: usize) -> Result<(), Error> {
        let kind = CommandKind::RefuseBid;
        let busy = self.begin(kind)?;
        let (issuer, proposal_id, bid_id) = self.selected_bid(index).inspect_err(|_| count_rejected())?;
        info!(command = %kind, proposal_id = %proposal_id, bid_id = %bid_id, "Sending command");

        let result = self.ledger.refuse_bid(&issuer.account, proposal_id, bid_id).await;
        drop(busy);
        self.settle(kind, &issuer, result)
    }

    /// Withdraw the account's own bid at `index` in its own-bids list.
    pub async fn delete_bid(&self, index: usize) -> Result<(), Error> {
        let kind = CommandKind::DeleteBid;
        let busy = self.begin(kind)?;
        let (issuer, bid_id) = self.own_bid(index).inspect_err(|_| count_rejected())?;
        info!(command = %kind, bid_id = %bid_id, "Sending command");

        let result = self.ledger.delete_bid(&issuer.account, bid_id).await;
        drop(busy);
        self.settle(kind, &issuer, result)
    }

    /// Delete the selected proposal.
    pub async fn delete_proposal(&self) -> Result<(), Error> {
        let kind = CommandKind::DeleteProposal;
        let busy = self.begin(kind)?;
        let (issuer, proposal_id) = self.selected_proposal().inspect_err(|_| count_rejected())?;
        info!(command = %kind, proposal_id = %proposal_id, "Sending command");

        let result = self.ledger.delete_proposal(&issuer.account, proposal_id).await;
        drop(busy);
        self.settle(kind, &issuer, result)
    }

    fn begin(&self, kind: CommandKind) -> Result<BusyGuard<'_>, Error> {
        self.store.begin_command(kind).inspect_err(|e| {
            count_rejected();
            warn!(command = %kind, error = %e, "Command rejected");
        })
    }

    // --- Preconditions (read from the current view, never cached) ---

    fn issuer(&self) -> Result<Issuer, Error> {
        self.store
            .read(|s| {
                s.account.clone().map(|account| Issuer {
                    account,
                    account_epoch: s.account_epoch(),
                })
            })
            .ok_or(Error::NotConnected)
    }

    fn selected_proposal(&self) -> Result<(Issuer, ProposalId), Error> {
        let issuer = self.issuer()?;
        let proposal_id = self.store.read(|s| s.selected).ok_or(Error::NoSelection)?;
        Ok((issuer, proposal_id))
    }

    fn selected_bid(&self, index: usize) -> Result<(Issuer, ProposalId, BidId), Error> {
        let (issuer, proposal_id) = self.selected_proposal()?;
        let bid_id = self
            .store
            .read(|s| s.bid_id_at(proposal_id, index))
            .ok_or(Error::UnknownBid { proposal_id, index })?;
        Ok((issuer, proposal_id, bid_id))
    }

    fn own_bid(&self, index: usize) -> Result<(Issuer, BidId), Error> {
        let issuer = self.issuer()?;
        let bid_id = self
            .store
            .read(|s| s.my_bids.get(index).map(|b| b.bid_id))
            .ok_or(Error::UnknownOwnBid(index))?;
        Ok((issuer, bid_id))
    }

    // --- Outcome ---

    fn settle(&self, kind: CommandKind, issuer: &Issuer, result: Result<(), Error>) -> Result<(), Error> {
        METRICS.commands_total.fetch_add(1, Ordering::Relaxed);
        if result.is_err() {
            METRICS.commands_failed.fetch_add(1, Ordering::Relaxed);
        }

        // The view now belongs to another session; the outcome is only logged.
        if self.store.read(|s| s.account_epoch()) != issuer.account_epoch {
            match &result {
                Ok(()) => info!(command = %kind, account = %issuer.account, "Command confirmed after account change"),
                Err(e) => warn!(command = %kind, account = %issuer.account, error = %e, "Command failed after account change"),
            }
            return result;
        }

        let effects = effects(kind);
        match result {
            Ok(()) => {
                info!(command = %kind, "Command confirmed");
                if effects.closes_selection {
                    self.store.close_selection();
                }
                self.notifier.notify(Notification::ok(effects.ok_message));
                if effects.resyncs {
                    if let Err(e) = self.sync.request_resync() {
                        warn!(command = %kind, error = %e, "Resync not scheduled");
                    }
                }
                Ok(())
            }
            Err(e) => {
                error!(command = %kind, error = %e, "Command failed");
                if effects.records_error {
                    self.store.record_error(&e);
                }
                self.notifier.notify(Notification::error(effects.err_message));
                Err(e)
            }
        }
    }
}

fn count_rejected() {
    METRICS.commands_rejected.fetch_add(1, Ordering::Relaxed);
}
