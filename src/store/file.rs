//! JSON-lines log store.
//!
//! Each collection is a file `<data_dir>/<collection>.jsonl` holding one
//! JSON object per line. Files are re-read on every call.

use super::LogStore;
use crate::error::StoreError;
use crate::models::{EventType, Record};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Log store backed by `.jsonl` files in a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    data_dir: PathBuf,
    logs_path: PathBuf,
    products_path: PathBuf,
}

impl FileStore {
    pub fn new(data_dir: PathBuf, logs_collection: &str, products_collection: &str) -> Self {
        let logs_path = data_dir.join(format!("{}.jsonl", logs_collection));
        let products_path = data_dir.join(format!("{}.jsonl", products_collection));
        Self {
            data_dir,
            logs_path,
            products_path,
        }
    }

    async fn read_collection(&self, path: &Path) -> Result<Vec<Record>, StoreError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| StoreError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let records = parse_lines(&content, path);
        debug!("Read {} records from {}", records.len(), path.display());
        Ok(records)
    }
}

/// Parse JSON-lines content, skipping blank lines and anything that is not
/// a JSON object.
fn parse_lines(content: &str, path: &Path) -> Vec<Record> {
    let mut records = Vec::new();

    for (i, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(fields)) => records.push(Record::new(fields)),
            Ok(_) => warn!("{}:{}: not a JSON object, skipping", path.display(), i + 1),
            Err(e) => warn!("{}:{}: invalid JSON, skipping: {}", path.display(), i + 1, e),
        }
    }

    records
}

#[async_trait]
impl LogStore for FileStore {
    async fn events(&self, event_type: EventType) -> Result<Vec<Record>, StoreError> {
        let mut records = self.read_collection(&self.logs_path).await?;
        records.retain(|r| r.is_type(event_type));
        Ok(records)
    }

    async fn products(&self) -> Result<Vec<Record>, StoreError> {
        self.read_collection(&self.products_path).await
    }

    fn describe(&self) -> String {
        format!("file store at {}", self.data_dir.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixture_store() -> FileStore {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures");
        FileStore::new(dir, "logs", "products")
    }

    #[test]
    fn test_parse_lines_skips_garbage() {
        let content = "{\"type\":\"feature_usage\",\"feature\":\"chat\"}\n\n[1,2]\nnot json\n{\"category\":\"Books\"}\n";

        let records = parse_lines(content, Path::new("test.jsonl"));

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].text("category"), Some("Books"));
    }

    #[tokio::test]
    async fn test_events_filtered_by_type() {
        let store = fixture_store();

        let features = store.events(EventType::FeatureUsage).await.unwrap();
        assert!(!features.is_empty());
        assert!(features.iter().all(|r| r.is_type(EventType::FeatureUsage)));

        let sessions = store.events(EventType::SessionEvent).await.unwrap();
        assert!(sessions.iter().all(|r| r.is_type(EventType::SessionEvent)));
    }

    #[tokio::test]
    async fn test_products_full_scan() {
        let store = fixture_store();
        let products = store.products().await.unwrap();
        assert!(products.iter().any(|p| p.text("category").is_none()));
        assert!(products.iter().any(|p| p.text("category").is_some()));
    }

    #[tokio::test]
    async fn test_missing_collection_is_an_error() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("logs.jsonl"), "").unwrap();
        let store = FileStore::new(temp.path().to_path_buf(), "logs", "products");

        assert!(store.events(EventType::ResponseTime).await.unwrap().is_empty());
        assert!(matches!(
            store.products().await,
            Err(StoreError::Io { .. })
        ));
    }
}
