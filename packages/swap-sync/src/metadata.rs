//! Port to the off-chain metadata store.

use crate::Error;
use async_trait::async_trait;
use swap_types::AssetMetadata;

/// Resolves a `metadata_key` to descriptive metadata.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// `Ok(None)` means the store has no document for the key.
    async fn lookup(&self, key: &str) -> Result<Option<AssetMetadata>, Error>;
}
