//! Dashboard aggregation.
//!
//! Pulls each record collection from the store and folds it into the
//! summary. Reads happen one after another and nothing is cached; every call
//! recomputes from scratch.

use super::reducers::{
    average_latency, count_categories, count_feature_usage, rank_by_count, section_time_on_task,
    DEFAULT_TOP_SECTIONS,
};
use crate::config::DashboardConfig;
use crate::error::StoreError;
use crate::models::{DashboardSummary, EventType};
use crate::store::LogStore;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

/// Knobs that shape the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationOptions {
    /// Sections kept in the time-on-task ranking.
    pub top_sections: usize,
    /// Rank feature usage by count.
    pub sort_features: bool,
    /// Rank categories by count.
    pub sort_categories: bool,
}

impl Default for AggregationOptions {
    fn default() -> Self {
        Self {
            top_sections: DEFAULT_TOP_SECTIONS,
            sort_features: true,
            sort_categories: false,
        }
    }
}

impl From<&DashboardConfig> for AggregationOptions {
    fn from(config: &DashboardConfig) -> Self {
        Self {
            top_sections: config.top_sections,
            sort_features: config.sort_features,
            sort_categories: config.sort_categories,
        }
    }
}

/// Computes dashboard summaries from a shared store handle.
pub struct Aggregator {
    store: Arc<dyn LogStore>,
    options: AggregationOptions,
}

impl Aggregator {
    pub fn new(store: Arc<dyn LogStore>, options: AggregationOptions) -> Self {
        Self { store, options }
    }

    /// Read every collection and compute a fresh summary.
    ///
    /// Any store failure aborts the whole computation.
    pub async fn summarize(&self) -> Result<DashboardSummary, StoreError> {
        let features = self.store.events(EventType::FeatureUsage).await?;
        let mut feature_usage = count_feature_usage(&features);
        if self.options.sort_features {
            rank_by_count(&mut feature_usage);
        }
        debug!(
            "Feature usage: {} records, {} buckets",
            features.len(),
            feature_usage.len()
        );

        let responses = self.store.events(EventType::ResponseTime).await?;
        let latency = average_latency(&responses);
        debug!(
            "Latency: {} of {} records valid",
            latency.samples,
            responses.len()
        );

        let sessions = self.store.events(EventType::SessionEvent).await?;
        let top_sections = section_time_on_task(&sessions, self.options.top_sections);
        debug!(
            "Sessions: {} records, {} ranked sections",
            sessions.len(),
            top_sections.len()
        );

        let products = self.store.products().await?;
        let mut categories = count_categories(&products);
        if self.options.sort_categories {
            rank_by_count(&mut categories);
        }
        debug!(
            "Products: {} records, {} categories",
            products.len(),
            categories.len()
        );

        info!(
            "Summarized {} events and {} products",
            features.len() + responses.len() + sessions.len(),
            products.len()
        );

        Ok(DashboardSummary {
            generated_at: Utc::now(),
            feature_usage,
            latency,
            top_sections,
            categories,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Record;
    use crate::store::memory::MemoryStore;
    use crate::store::FileStore;
    use serde_json::{json, Value};
    use std::path::Path;

    fn records(values: Vec<Value>) -> Vec<Record> {
        values
            .into_iter()
            .map(|v| serde_json::from_value(v).unwrap())
            .collect()
    }

    fn sample_store() -> MemoryStore {
        MemoryStore::new(
            records(vec![
                json!({"type": "feature_usage", "feature": "map"}),
                json!({"type": "feature_usage", "feature": "search_text"}),
                json!({"type": "feature_usage", "feature": "search_voice"}),
                json!({"type": "response_time", "requested_at": 0, "received_at": 100, "showed_at": 150}),
                json!({"type": "response_time", "requested_at": 0, "received_at": -5, "showed_at": 10}),
                json!({"type": "session_event", "user_id": "u", "section": "cart", "event": "enter", "timestamp": 1000}),
                json!({"type": "session_event", "user_id": "u", "section": "cart", "event": "exit", "timestamp": 4000}),
                json!({"type": "other", "feature": "map"}),
            ]),
            records(vec![
                json!({"category": "Books"}),
                json!({"category": "Tools"}),
                json!({"category": "Tools"}),
                json!({"title": "uncategorized"}),
            ]),
        )
    }

    #[test]
    fn test_summarize_memory_store() {
        let aggregator = Aggregator::new(Arc::new(sample_store()), AggregationOptions::default());

        let summary = tokio_test::block_on(aggregator.summarize()).unwrap();

        assert_eq!(summary.feature_usage[0].name, "search_*");
        assert_eq!(summary.feature_usage[0].count, 2);
        assert_eq!(summary.feature_usage[1].name, "map");
        assert_eq!(summary.feature_usage[1].count, 1);

        assert_eq!(summary.latency.samples, 1);
        assert_eq!(summary.latency.avg_req_to_show, 150.0);

        assert_eq!(summary.top_sections.len(), 1);
        assert_eq!(summary.top_sections[0].avg_seconds, 3.0);

        let categories: Vec<_> = summary.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(categories, vec!["Books", "Tools"]);
    }

    #[test]
    fn test_sorting_options() {
        let options = AggregationOptions {
            top_sections: 5,
            sort_features: false,
            sort_categories: true,
        };
        let aggregator = Aggregator::new(Arc::new(sample_store()), options);

        let summary = tokio_test::block_on(aggregator.summarize()).unwrap();

        assert_eq!(summary.feature_usage[0].name, "map");
        assert_eq!(summary.categories[0].name, "Tools");
    }

    #[test]
    fn test_store_failure_propagates() {
        let aggregator = Aggregator::new(Arc::new(MemoryStore::failing()), AggregationOptions::default());

        let result = tokio_test::block_on(aggregator.summarize());

        assert!(matches!(result, Err(StoreError::Backend { status: 503, .. })));
    }

    #[tokio::test]
    async fn test_summarize_fixture_files() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures");
        let store = FileStore::new(dir, "logs", "products");
        let aggregator = Aggregator::new(Arc::new(store), AggregationOptions::default());

        let summary = aggregator.summarize().await.unwrap();

        assert_eq!(summary.feature_usage[0].name, "search_*");
        assert_eq!(summary.feature_usage[0].count, 4);
        assert_eq!(summary.latency.samples, 2);
        assert_eq!(summary.latency.avg_req_to_rec, 150.0);
        assert_eq!(summary.latency.avg_req_to_show, 300.0);
        assert_eq!(summary.latency.avg_proc_time, 150.0);
        assert_eq!(summary.top_sections[0].section, "product_detail");
        assert!(summary.categories.iter().all(|c| !c.name.is_empty()));
    }
}
