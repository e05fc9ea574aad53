//! # Swap Sync
//!
//! Client-side synchronization engine for a peer-to-peer NFT swap ledger.
//! Keeps a consistent view of the connected account's proposals, the bids on
//! them and the account's own bids, and issues accept/refuse/delete commands.
//!
//! ## Quick Start
//! ```bash
//! SWAP_ACCOUNT=0x00000000000000000000000000000000000a11ce \
//!   SWAP_SNAPSHOT_PATH=packages/swap-sync/ledger.example.json cargo run --bin swap-sync
//! ```
//!
//! ## Layout
//! - [`ledger::LedgerGateway`] / [`metadata::MetadataStore`]: ports
//! - [`proposal_sync`], [`bid_resolver`], [`user_bids`]: read passes
//! - [`engine`]: reacts to account changes and resync requests
//! - [`actions`]: mutating commands
//! - [`store`]: the observable view

pub mod actions;
pub mod bid_resolver;
pub mod config;
pub mod engine;
mod error;
#[cfg(feature = "http-metadata")]
pub mod http_metadata;
pub mod ledger;
pub mod memory;
pub mod metadata;
pub mod metrics;
pub mod notify;
pub mod proposal_sync;
pub mod session;
pub mod store;
pub mod user_bids;

pub use actions::ActionController;
pub use config::Config;
pub use error::Error;
pub use ledger::LedgerGateway;
pub use metadata::MetadataStore;
pub use notify::{Notification, NotificationSink, Severity};
pub use session::Session;
pub use store::{CommandKind, Store, ViewState};
