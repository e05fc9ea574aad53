//! Bids the active account placed on other accounts' proposals.

use crate::ledger::LedgerGateway;
use crate::store::Store;
use crate::Error;
use std::sync::Arc;
use swap_types::{Address, OwnBid};
use tracing::{debug, error, info};

pub struct UserBidSync {
    ledger: Arc<dyn LedgerGateway>,
}

impl UserBidSync {
    pub fn new(ledger: Arc<dyn LedgerGateway>) -> Self {
        Self { ledger }
    }

    /// The account's own bids, bounded by the bid counter.
    ///
    /// Rows are returned as listed; unlike proposal bids, no empty-slot
    /// filtering happens here.
    pub async fn fetch(&self, account: &Address) -> Result<Vec<OwnBid>, Error> {
        let count = self.ledger.bid_count().await?;
        let bids = self.ledger.my_bids(account, count).await?;
        debug!(account = %account, count, bids = bids.len(), "Own bids listed");
        Ok(bids)
    }

    /// Run one pass and publish the result under `epoch`.
    pub async fn run(&self, store: &Store, account: &Address, epoch: u64) -> Result<usize, Error> {
        match self.fetch(account).await {
            Ok(bids) => {
                let count = bids.len();
                if store.finish_bid_pass(epoch, bids) {
                    info!(account = %account, epoch, bids = count, "Own-bid pass complete");
                    Ok(count)
                } else {
                    debug!(epoch, "Own-bid pass superseded");
                    Err(Error::Cancelled)
                }
            }
            Err(e) => {
                if store.fail_bid_pass(epoch, &e) {
                    error!(account = %account, epoch, error = %e, "Own-bid pass failed");
                }
                Err(e)
            }
        }
    }
}
