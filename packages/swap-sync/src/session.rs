//! One wallet session: the view, the engine driving it and the command surface.

use crate::actions::ActionController;
use crate::config::Config;
use crate::engine::{SyncEngine, SyncHandle};
use crate::ledger::LedgerGateway;
use crate::metadata::MetadataStore;
use crate::notify::NotificationSink;
use crate::proposal_sync::ProposalSync;
use crate::store::{Store, ViewState};
use crate::user_bids::UserBidSync;
use crate::Error;
use std::sync::Arc;
use swap_types::{Address, ProposalId};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct Session {
    store: Arc<Store>,
    sync: SyncHandle,
    actions: ActionController,
    shutdown: CancellationToken,
    engine: JoinHandle<()>,
}

impl Session {
    /// Spawn the sync engine on the current runtime. The session starts disconnected.
    pub fn start(
        ledger: Arc<dyn LedgerGateway>,
        metadata: Arc<dyn MetadataStore>,
        notifier: Arc<dyn NotificationSink>,
        config: &Config,
    ) -> Self {
        let store = Arc::new(Store::new());
        let shutdown = CancellationToken::new();
        let proposals = ProposalSync::new(Arc::clone(&ledger), metadata)
            .with_bid_concurrency(config.sync.bid_concurrency);
        let user_bids = UserBidSync::new(Arc::clone(&ledger));

        let (engine, sync) = SyncEngine::new(Arc::clone(&store), proposals, user_bids, shutdown.clone());
        let engine = tokio::spawn(engine.run());
        let actions = ActionController::new(ledger, Arc::clone(&store), notifier, sync.clone());

        info!(bid_concurrency = config.sync.bid_concurrency, "Session started");
        Self {
            store,
            sync,
            actions,
            shutdown,
            engine,
        }
    }

    /// Switch to `account`, or disconnect with `None`.
    pub fn connect(&self, account: Option<Address>) -> Result<(), Error> {
        self.sync.account_changed(account)
    }

    pub fn resync(&self) -> Result<(), Error> {
        self.sync.request_resync()
    }

    /// Open the bid panel for a listed proposal.
    pub fn select(&self, proposal_id: ProposalId) -> Result<(), Error> {
        self.store.select(proposal_id)
    }

    pub fn close(&self) {
        self.store.close_selection();
    }

    pub fn state(&self) -> ViewState {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.store.subscribe()
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn actions(&self) -> &ActionController {
        &self.actions
    }

    /// Wait until a proposal pass newer than `since` has started and every pass has settled.
    ///
    /// Read `state().proposal_epoch()` before calling [`Session::connect`] or
    /// [`Session::resync`] and pass it here.
    pub async fn synced(&self, since: u64) -> ViewState {
        self.store
            .wait_for(|s| s.proposal_epoch() > since && s.is_settled())
            .await
    }

    /// Stop the engine and cancel any running pass.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        if let Err(e) = self.engine.await {
            warn!(error = %e, "Sync engine task ended abnormally");
        }
        info!("Session stopped");
    }
}
