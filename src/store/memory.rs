//! In-memory log store for tests.

use super::LogStore;
use crate::error::StoreError;
use crate::models::{EventType, Record};
use async_trait::async_trait;

/// Holds records in memory; optionally fails every read.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub logs: Vec<Record>,
    pub products: Vec<Record>,
    pub fail: bool,
}

impl MemoryStore {
    pub fn new(logs: Vec<Record>, products: Vec<Record>) -> Self {
        Self {
            logs,
            products,
            fail: false,
        }
    }

    /// A store whose every read fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.fail {
            Err(StoreError::Backend {
                status: 503,
                body: "store unavailable".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl LogStore for MemoryStore {
    async fn events(&self, event_type: EventType) -> Result<Vec<Record>, StoreError> {
        self.check()?;
        Ok(self
            .logs
            .iter()
            .filter(|r| r.is_type(event_type))
            .cloned()
            .collect())
    }

    async fn products(&self) -> Result<Vec<Record>, StoreError> {
        self.check()?;
        Ok(self.products.clone())
    }

    fn describe(&self) -> String {
        format!("memory store ({} logs)", self.logs.len())
    }
}
