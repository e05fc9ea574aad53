//! Accept/refuse/delete commands driven through a live session.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use swap_sync::memory::{LedgerWrite, MemoryLedger};
use swap_sync::{Error, LedgerGateway, Notification, Severity};
use swap_types::{Address, BidId, BidRecord, OwnBid, ProposalEntry, ProposalId};
use tokio::sync::Notify;

use crate::utils::{account, start, start_over, Harness};

/// Long enough for a resync trigger, if one were sent, to bump the epoch.
const QUIET: Duration = Duration::from_millis(50);

async fn assert_no_resync(h: &Harness, epoch: u64) {
    tokio::time::sleep(QUIET).await;
    assert_eq!(h.session.state().proposal_epoch(), epoch, "unexpected resync");
}

// ── Accept ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_accept_sends_aligned_bid_and_resyncs() -> Result<()> {
    let mut h = start();
    let alice = account(1);
    let p = h.propose(&alice, 1);
    let other = h.propose(&alice, 2);
    let _b1 = h.bid(&account(2), p, 11);
    let b2 = h.bid(&account(3), p, 12);

    h.connect(&alice).await?;
    h.session.select(p)?;
    let before = h.session.state();
    assert!(!before.busy.accept_bid);

    h.session.actions().accept_bid(1).await?;
    let after_call = h.session.state();
    assert!(!after_call.busy.accept_bid);
    assert!(after_call.selected.is_none());

    let state = h.synced(before.proposal_epoch()).await?;
    assert_eq!(
        h.ledger.writes(),
        vec![LedgerWrite::AcceptBid {
            sender: alice.clone(),
            proposal_id: p,
            bid_id: b2,
        }]
    );
    assert_eq!(Harness::proposal_ids(&state), vec![other]);
    assert_eq!(h.notifications.try_recv()?, Notification::ok("NFT Swapped!"));
    Ok(())
}

#[tokio::test]
async fn test_accept_after_resync_never_uses_stale_id() -> Result<()> {
    let h = start();
    let alice = account(1);
    let p = h.propose(&alice, 1);
    let b1 = h.bid(&account(2), p, 11);
    let b2 = h.bid(&account(3), p, 12);

    let state = h.connect(&alice).await?;
    assert_eq!(state.bid_index.bid_ids(p), &[b1, b2]);

    // Refuse does not resync, so position 0 keeps pointing at the refused bid until one runs.
    h.session.select(p)?;
    h.session.actions().refuse_bid(0).await?;
    let state = h.resync().await?;
    assert_eq!(state.bid_index.bid_ids(p), &[b2]);

    h.session.select(p)?;
    h.session.actions().accept_bid(0).await?;

    let writes = h.ledger.writes();
    assert_eq!(
        writes.last(),
        Some(&LedgerWrite::AcceptBid {
            sender: alice,
            proposal_id: p,
            bid_id: b2,
        })
    );
    Ok(())
}

#[tokio::test]
async fn test_accept_failure_keeps_panel_open() -> Result<()> {
    let mut h = start();
    let alice = account(1);
    let p = h.propose(&alice, 1);
    h.bid(&account(2), p, 11);

    h.connect(&alice).await?;
    h.session.select(p)?;
    let epoch = h.session.state().proposal_epoch();
    h.ledger.fail_method("accept_bid");

    let result = h.session.actions().accept_bid(0).await;

    assert!(matches!(result, Err(Error::Ledger(_))));
    let state = h.session.state();
    assert!(!state.busy.accept_bid);
    assert!(state.error.as_deref().is_some_and(|e| e.contains("accept_bid")));
    assert_eq!(state.selected, Some(p));
    let note = h.notifications.try_recv()?;
    assert_eq!(note.severity, Severity::Error);
    assert_eq!(note.message, "Error accepting bid");
    assert_no_resync(&h, epoch).await;
    assert!(h.ledger.is_open(p));
    Ok(())
}

// ── Refuse ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_refuse_keeps_selection_without_resync() -> Result<()> {
    let mut h = start();
    let alice = account(1);
    let p = h.propose(&alice, 1);
    let b = h.bid(&account(2), p, 11);

    h.connect(&alice).await?;
    h.session.select(p)?;
    let epoch = h.session.state().proposal_epoch();

    h.session.actions().refuse_bid(0).await?;

    let state = h.session.state();
    assert_eq!(state.selected, Some(p));
    assert!(!state.busy.refuse_bid);
    assert_eq!(
        h.ledger.writes(),
        vec![LedgerWrite::RefuseBid {
            sender: alice,
            proposal_id: p,
            bid_id: b,
        }]
    );
    assert_eq!(h.notifications.try_recv()?, Notification::ok("Bid refused"));
    assert_no_resync(&h, epoch).await;
    Ok(())
}

#[tokio::test]
async fn test_refuse_failure_recorded_and_selection_kept() -> Result<()> {
    let mut h = start();
    let alice = account(1);
    let p = h.propose(&alice, 1);
    h.bid(&account(2), p, 11);

    h.connect(&alice).await?;
    h.session.select(p)?;
    let epoch = h.session.state().proposal_epoch();
    h.ledger.fail_method("refuse_bid");

    let result = h.session.actions().refuse_bid(0).await;

    assert!(matches!(result, Err(Error::Ledger(_))));
    let state = h.session.state();
    assert!(!state.busy.refuse_bid);
    assert!(state.error.as_deref().is_some_and(|e| e.contains("refuse_bid")));
    assert_eq!(state.selected, Some(p));
    assert_eq!(h.notifications.try_recv()?, Notification::error("Error refusing bid"));
    assert!(h.ledger.writes().is_empty());
    assert_no_resync(&h, epoch).await;
    Ok(())
}

// ── Delete bid ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_delete_own_bid_does_not_resync() -> Result<()> {
    let mut h = start();
    let alice = account(1);
    let bobs = h.propose(&account(2), 1);
    let mine = h.bid(&alice, bobs, 21);

    let state = h.connect(&alice).await?;
    assert_eq!(state.my_bids.len(), 1);
    let epoch = state.proposal_epoch();

    h.session.actions().delete_bid(0).await?;

    let state = h.session.state();
    assert!(!state.busy.delete_bid);
    assert_eq!(
        h.ledger.writes(),
        vec![LedgerWrite::DeleteBid {
            sender: alice,
            bid_id: mine,
        }]
    );
    assert_eq!(
        h.notifications.try_recv()?,
        Notification::ok("Bid deleted successfully")
    );
    assert_no_resync(&h, epoch).await;
    // Own bids refresh only on the next account change.
    assert_eq!(h.session.state().my_bids.len(), 1);
    Ok(())
}

// ── Delete proposal ─────────────────────────────────────────────────

#[tokio::test]
async fn test_delete_proposal_closes_and_excludes_it() -> Result<()> {
    let mut h = start();
    let alice = account(1);
    let keep = h.propose(&alice, 1);
    let gone = h.propose(&alice, 2);

    let state = h.connect(&alice).await?;
    assert_eq!(Harness::proposal_ids(&state), vec![keep, gone]);
    h.session.select(gone)?;
    let epoch = h.session.state().proposal_epoch();

    h.session.actions().delete_proposal().await?;
    assert!(h.session.state().selected.is_none());

    let state = h.synced(epoch).await?;
    assert_eq!(Harness::proposal_ids(&state), vec![keep]);
    assert!(!state.busy.delete_proposal);
    assert_eq!(
        h.notifications.try_recv()?,
        Notification::ok("Proposal deleted successfully")
    );
    Ok(())
}

#[tokio::test]
async fn test_delete_proposal_failure_recorded() -> Result<()> {
    let mut h = start();
    let alice = account(1);
    let p = h.propose(&alice, 1);
    h.connect(&alice).await?;
    h.session.select(p)?;
    h.ledger.fail_method("delete_proposal");

    assert!(h.session.actions().delete_proposal().await.is_err());

    let state = h.session.state();
    assert!(!state.busy.delete_proposal);
    assert_eq!(state.selected, Some(p));
    assert!(state.error.is_some());
    assert_eq!(
        h.notifications.try_recv()?,
        Notification::error("Error deleting proposal")
    );
    Ok(())
}

// ── Preconditions ───────────────────────────────────────────────────

#[tokio::test]
async fn test_commands_need_selection_and_valid_positions() -> Result<()> {
    let mut h = start();
    let alice = account(1);
    let p = h.propose(&alice, 1);
    h.bid(&account(2), p, 11);
    h.connect(&alice).await?;

    let actions = h.session.actions();
    assert_eq!(actions.accept_bid(0).await, Err(Error::NoSelection));
    assert_eq!(actions.delete_proposal().await, Err(Error::NoSelection));
    assert_eq!(actions.delete_bid(0).await, Err(Error::UnknownOwnBid(0)));

    h.session.select(p)?;
    assert_eq!(
        actions.refuse_bid(1).await,
        Err(Error::UnknownBid { proposal_id: p, index: 1 })
    );

    let state = h.session.state();
    assert!(!state.busy.any());
    assert!(state.error.is_none());
    assert!(h.ledger.writes().is_empty());
    assert!(h.notifications.try_recv().is_err());
    Ok(())
}

#[tokio::test]
async fn test_selecting_unlisted_proposal_rejected() -> Result<()> {
    let h = start();
    let alice = account(1);
    let bobs = h.propose(&account(2), 1);
    h.connect(&alice).await?;

    assert_eq!(h.session.select(bobs), Err(Error::UnknownProposal(bobs)));
    assert!(h.session.state().selected.is_none());
    Ok(())
}

#[tokio::test]
async fn test_commands_of_different_kinds_overlap() -> Result<()> {
    let h = start();
    let alice = account(1);
    let p = h.propose(&alice, 1);
    h.bid(&account(2), p, 11);
    let bobs = h.propose(&account(2), 2);
    h.bid(&alice, bobs, 21);
    h.connect(&alice).await?;
    h.session.select(p)?;
    h.ledger.set_latency(Duration::from_millis(30));

    let actions = h.session.actions();
    let refuse = actions.refuse_bid(0);
    let delete = actions.delete_bid(0);
    let observe = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        h.session.state().busy
    };
    let (refused, deleted, busy) = tokio::join!(refuse, delete, observe);

    refused?;
    deleted?;
    assert!(busy.refuse_bid && busy.delete_bid);
    assert!(!h.session.state().busy.any());

    // Same kind while in flight is rejected.
    let first = actions.refuse_bid(0);
    let second = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        actions.refuse_bid(0).await
    };
    let (_, second) = tokio::join!(first, second);
    assert_eq!(second, Err(Error::Busy(swap_sync::CommandKind::RefuseBid)));
    Ok(())
}

// ── Account change mid-command ──────────────────────────────────────

#[derive(Default)]
struct Gate {
    entered: Notify,
    release: Notify,
}

/// Holds `accept_bid` at the gate; every other call goes straight through.
struct HeldAccept {
    inner: Arc<MemoryLedger>,
    gate: Arc<Gate>,
}

#[async_trait]
impl LedgerGateway for HeldAccept {
    async fn proposal_count(&self) -> Result<u64, Error> {
        self.inner.proposal_count().await
    }

    async fn my_proposals(&self, owner: &Address, bound: u64) -> Result<Vec<ProposalEntry>, Error> {
        self.inner.my_proposals(owner, bound).await
    }

    async fn bids_for_proposal(&self, proposal_id: ProposalId) -> Result<Vec<BidId>, Error> {
        self.inner.bids_for_proposal(proposal_id).await
    }

    async fn bid(&self, bid_id: BidId) -> Result<BidRecord, Error> {
        self.inner.bid(bid_id).await
    }

    async fn bid_count(&self) -> Result<u64, Error> {
        self.inner.bid_count().await
    }

    async fn my_bids(&self, bidder: &Address, bound: u64) -> Result<Vec<OwnBid>, Error> {
        self.inner.my_bids(bidder, bound).await
    }

    async fn accept_bid(&self, sender: &Address, proposal_id: ProposalId, bid_id: BidId) -> Result<(), Error> {
        self.gate.entered.notify_one();
        self.gate.release.notified().await;
        self.inner.accept_bid(sender, proposal_id, bid_id).await
    }

    async fn refuse_bid(&self, sender: &Address, proposal_id: ProposalId, bid_id: BidId) -> Result<(), Error> {
        self.inner.refuse_bid(sender, proposal_id, bid_id).await
    }

    async fn delete_bid(&self, sender: &Address, bid_id: BidId) -> Result<(), Error> {
        self.inner.delete_bid(sender, bid_id).await
    }

    async fn delete_proposal(&self, sender: &Address, proposal_id: ProposalId) -> Result<(), Error> {
        self.inner.delete_proposal(sender, proposal_id).await
    }
}

#[tokio::test]
async fn test_outcome_for_previous_account_not_applied_to_new_view() -> Result<()> {
    let gate = Arc::new(Gate::default());
    let held = Arc::clone(&gate);
    let mut h = start_over(move |inner| Arc::new(HeldAccept { inner, gate: held }));
    let alice = account(1);
    let bob = account(2);
    let p1 = h.propose(&alice, 1);
    h.bid(&account(3), p1, 11);
    let p2 = h.propose(&bob, 2);

    h.connect(&alice).await?;
    h.session.select(p1)?;
    h.ledger.fail_method("accept_bid");

    let switch = async {
        gate.entered.notified().await;
        let state = h.connect(&bob).await?;
        h.session.select(p2)?;
        gate.release.notify_one();
        Ok::<_, anyhow::Error>(state.proposal_epoch())
    };
    let (result, epoch) = tokio::join!(h.session.actions().accept_bid(0), switch);
    let epoch = epoch?;

    assert!(matches!(result, Err(Error::Ledger(_))));
    let state = h.session.state();
    assert_eq!(state.account, Some(bob));
    assert!(state.error.is_none());
    assert_eq!(state.selected, Some(p2));
    assert!(!state.busy.accept_bid);
    assert!(h.notifications.try_recv().is_err());
    assert_no_resync(&h, epoch).await;
    Ok(())
}
