//! Firestore log store over the REST API.
//!
//! Queries go through `documents:runQuery`. Event reads carry an equality
//! filter on the `type` field; product reads scan the whole collection.
//! Firestore's typed values are flattened into plain JSON before they reach
//! the reducers.

use super::LogStore;
use crate::config::FirestoreConfig;
use crate::error::StoreError;
use crate::models::{EventType, Record, TYPE_FIELD};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// `runQuery` request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunQueryRequest {
    structured_query: StructuredQuery,
}

#[derive(Debug, Serialize)]
struct StructuredQuery {
    from: Vec<CollectionSelector>,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    filter: Option<Filter>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CollectionSelector {
    collection_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Filter {
    field_filter: FieldFilter,
}

#[derive(Debug, Serialize)]
struct FieldFilter {
    field: FieldReference,
    op: &'static str,
    value: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FieldReference {
    field_path: String,
}

/// One element of the `runQuery` response array. Elements without a
/// document only carry progress information.
#[derive(Debug, Deserialize)]
struct RunQueryResponse {
    #[serde(default)]
    document: Option<Document>,
}

#[derive(Debug, Deserialize)]
struct Document {
    #[serde(default)]
    fields: Map<String, Value>,
}

/// Log store reading a Firestore database.
pub struct FirestoreStore {
    http_client: reqwest::Client,
    endpoint: String,
    access_token: Option<String>,
    token_file: Option<PathBuf>,
    logs_collection: String,
    products_collection: String,
}

impl FirestoreStore {
    pub fn new(
        config: &FirestoreConfig,
        logs_collection: &str,
        products_collection: &str,
    ) -> Result<Self, StoreError> {
        let project_id = config.project_id.as_deref().ok_or_else(|| {
            StoreError::Config("firestore backend needs a project id".to_string())
        })?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        let endpoint = format!(
            "{}/v1/projects/{}/databases/{}/documents:runQuery",
            config.base_url.trim_end_matches('/'),
            project_id,
            config.database
        );

        Ok(Self {
            http_client,
            endpoint,
            access_token: config.access_token.clone(),
            token_file: config.token_file.clone(),
            logs_collection: logs_collection.to_string(),
            products_collection: products_collection.to_string(),
        })
    }

    /// Bearer token for the next query. A token file is read fresh each
    /// time so an externally refreshed token is picked up.
    async fn bearer_token(&self) -> Result<Option<String>, StoreError> {
        let Some(ref path) = self.token_file else {
            return Ok(self.access_token.clone());
        };

        let token = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
        let token = token.trim();
        Ok((!token.is_empty()).then(|| token.to_string()))
    }

    async fn run_query(&self, query: StructuredQuery) -> Result<Vec<Record>, StoreError> {
        let collection = query
            .from
            .first()
            .map(|c| c.collection_id.clone())
            .unwrap_or_default();

        let mut request = self.http_client.post(&self.endpoint).json(&RunQueryRequest {
            structured_query: query,
        });
        if let Some(token) = self.bearer_token().await? {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Backend { status, body });
        }

        let items: Vec<RunQueryResponse> = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        let records: Vec<Record> = items
            .into_iter()
            .filter_map(|item| item.document)
            .map(|doc| Record::new(decode_fields(&doc.fields)))
            .collect();

        debug!("Fetched {} documents from {}", records.len(), collection);
        Ok(records)
    }
}

fn collection_query(collection: &str, filter: Option<Filter>) -> StructuredQuery {
    StructuredQuery {
        from: vec![CollectionSelector {
            collection_id: collection.to_string(),
        }],
        filter,
    }
}

fn type_filter(event_type: EventType) -> Filter {
    Filter {
        field_filter: FieldFilter {
            field: FieldReference {
                field_path: TYPE_FIELD.to_string(),
            },
            op: "EQUAL",
            value: json!({ "stringValue": event_type.as_str() }),
        },
    }
}

/// Flatten a Firestore `fields` map into plain JSON.
fn decode_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(name, value)| (name.clone(), decode_value(value)))
        .collect()
}

/// Flatten one typed Firestore value.
///
/// Integers arrive as strings and are turned back into numbers; timestamps,
/// references and bytes stay strings. Unknown shapes become `null`.
fn decode_value(value: &Value) -> Value {
    let Some((kind, inner)) = value.as_object().and_then(|obj| obj.iter().next()) else {
        return Value::Null;
    };

    match kind.as_str() {
        "nullValue" => Value::Null,
        "integerValue" => match inner {
            Value::String(s) => s.parse::<i64>().map(Value::from).unwrap_or(Value::Null),
            other => other.clone(),
        },
        "booleanValue" | "doubleValue" | "stringValue" | "timestampValue" | "referenceValue"
        | "bytesValue" | "geoPointValue" => inner.clone(),
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(decode_value).collect())
                .unwrap_or_default(),
        ),
        "mapValue" => Value::Object(
            inner
                .get("fields")
                .and_then(Value::as_object)
                .map(decode_fields)
                .unwrap_or_default(),
        ),
        _ => Value::Null,
    }
}

#[async_trait]
impl LogStore for FirestoreStore {
    async fn events(&self, event_type: EventType) -> Result<Vec<Record>, StoreError> {
        self.run_query(collection_query(
            &self.logs_collection,
            Some(type_filter(event_type)),
        ))
        .await
    }

    async fn products(&self) -> Result<Vec<Record>, StoreError> {
        self.run_query(collection_query(&self.products_collection, None))
            .await
    }

    fn describe(&self) -> String {
        format!("firestore at {}", self.endpoint)
    }
}
