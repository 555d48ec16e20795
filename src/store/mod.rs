//! Log store backends.
//!
//! The dashboard only ever reads: events filtered by their `type`
//! discriminator, and a full scan of the product catalog. Backends are
//! selected by configuration and constructed once at startup.

pub mod file;
pub mod firestore;

#[cfg(test)]
pub mod memory;

use crate::config::{StoreBackend, StoreConfig};
use crate::error::StoreError;
use crate::models::{EventType, Record};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

pub use file::FileStore;
pub use firestore::FirestoreStore;

/// Read-only access to the event log and product catalog.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Every event whose `type` field equals `event_type`.
    async fn events(&self, event_type: EventType) -> Result<Vec<Record>, StoreError>;

    /// Every product in the catalog.
    async fn products(&self) -> Result<Vec<Record>, StoreError>;

    /// Human-readable description for logs.
    fn describe(&self) -> String;
}

/// Build the configured backend.
pub fn connect(config: &StoreConfig) -> Result<Arc<dyn LogStore>, StoreError> {
    let store: Arc<dyn LogStore> = match config.backend {
        StoreBackend::File => Arc::new(FileStore::new(
            config.data_dir.clone(),
            &config.logs_collection,
            &config.products_collection,
        )),
        StoreBackend::Firestore => Arc::new(FirestoreStore::new(
            &config.firestore,
            &config.logs_collection,
            &config.products_collection,
        )?),
    };

    info!("Connected to log store: {}", store.describe());
    Ok(store)
}
