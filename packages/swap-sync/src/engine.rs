//! Reactive driver for the sync passes.
//!
//! Account changes and resync requests arrive as [`SyncTrigger`] messages. Each
//! trigger cancels the pass it supersedes and starts a fresh, epoch-stamped one,
//! so a stale pass can neither race nor overwrite the current one.

use crate::proposal_sync::ProposalSync;
use crate::store::Store;
use crate::user_bids::UserBidSync;
use crate::Error;
use std::sync::Arc;
use swap_types::Address;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncTrigger {
    /// Wallet switched account, or disconnected (`None`).
    AccountChanged(Option<Address>),
    /// The ledger's proposal/bid set changed; rebuild proposals and the bid index.
    ResyncRequested,
}

/// Cloneable sender side of the engine.
#[derive(Debug, Clone)]
pub struct SyncHandle {
    tx: mpsc::UnboundedSender<SyncTrigger>,
}

impl SyncHandle {
    pub fn new(tx: mpsc::UnboundedSender<SyncTrigger>) -> Self {
        Self { tx }
    }

    pub fn account_changed(&self, account: Option<Address>) -> Result<(), Error> {
        self.send(SyncTrigger::AccountChanged(account))
    }

    pub fn request_resync(&self) -> Result<(), Error> {
        self.send(SyncTrigger::ResyncRequested)
    }

    fn send(&self, trigger: SyncTrigger) -> Result<(), Error> {
        self.tx.send(trigger).map_err(|_| Error::Cancelled)
    }
}

pub struct SyncEngine {
    store: Arc<Store>,
    proposals: Arc<ProposalSync>,
    user_bids: Arc<UserBidSync>,
    triggers: mpsc::UnboundedReceiver<SyncTrigger>,
    shutdown: CancellationToken,
    account: Option<Address>,
    proposal_pass: Option<CancellationToken>,
    bid_pass: Option<CancellationToken>,
}

impl SyncEngine {
    pub fn new(
        store: Arc<Store>,
        proposals: ProposalSync,
        user_bids: UserBidSync,
        shutdown: CancellationToken,
    ) -> (Self, SyncHandle) {
        let (tx, triggers) = mpsc::unbounded_channel();
        let engine = Self {
            store,
            proposals: Arc::new(proposals),
            user_bids: Arc::new(user_bids),
            triggers,
            shutdown,
            account: None,
            proposal_pass: None,
            bid_pass: None,
        };
        (engine, SyncHandle::new(tx))
    }

    /// Process triggers until shutdown or until every handle is dropped.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Sync engine shutting down");
                    break;
                }
                trigger = self.triggers.recv() => match trigger {
                    Some(trigger) => self.handle(trigger),
                    None => {
                        debug!("All sync handles dropped");
                        break;
                    }
                },
            }
        }
        self.cancel_proposal_pass();
        self.cancel_bid_pass();
    }

    fn handle(&mut self, trigger: SyncTrigger) {
        match trigger {
            SyncTrigger::AccountChanged(account) => {
                self.cancel_proposal_pass();
                self.cancel_bid_pass();
                info!(account = ?account.as_ref().map(Address::as_str), "Account changed");
                self.store.reset_for_account(account.clone());
                self.account = account;
                if let Some(account) = self.account.clone() {
                    self.start_proposal_pass(account.clone());
                    self.start_bid_pass(account);
                }
            }
            SyncTrigger::ResyncRequested => match self.account.clone() {
                Some(account) => {
                    self.cancel_proposal_pass();
                    info!(account = %account, "Resynchronizing proposals");
                    self.start_proposal_pass(account);
                }
                None => warn!("Resync requested with no account connected"),
            },
        }
    }

    fn start_proposal_pass(&mut self, account: Address) {
        let epoch = self.store.begin_proposal_pass();
        let cancel = self.shutdown.child_token();
        self.proposal_pass = Some(cancel.clone());

        let sync = Arc::clone(&self.proposals);
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(epoch, "Proposal pass cancelled");
                }
                _ = sync.run(&store, &account, epoch) => {}
            }
        });
    }

    fn start_bid_pass(&mut self, account: Address) {
        let epoch = self.store.begin_bid_pass();
        let cancel = self.shutdown.child_token();
        self.bid_pass = Some(cancel.clone());

        let sync = Arc::clone(&self.user_bids);
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(epoch, "Own-bid pass cancelled");
                }
                _ = sync.run(&store, &account, epoch) => {}
            }
        });
    }

    fn cancel_proposal_pass(&mut self) {
        if let Some(cancel) = self.proposal_pass.take() {
            cancel.cancel();
        }
    }

    fn cancel_bid_pass(&mut self) {
        if let Some(cancel) = self.bid_pass.take() {
            cancel.cancel();
        }
    }
}
