//! Data models for the dashboard.
//!
//! This module contains the raw store record, the typed samples the reducers
//! parse out of it, and the summary structures handed to the presenter.

use crate::error::SkipReason;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Name of the discriminator field on event records.
pub const TYPE_FIELD: &str = "type";

/// Kind of event stored in the logs collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A user touched a marketplace feature.
    FeatureUsage,
    /// Request/receive/show timestamps for one screen load.
    ResponseTime,
    /// A user entered or left an app section.
    SessionEvent,
}

impl EventType {
    /// Value of the `type` field for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::FeatureUsage => "feature_usage",
            EventType::ResponseTime => "response_time",
            EventType::SessionEvent => "session_event",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single document from the store: field name to JSON value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Raw field access.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Value of the `type` discriminator, if it is a string.
    pub fn event_type(&self) -> Option<&str> {
        self.get(TYPE_FIELD).and_then(Value::as_str)
    }

    /// Whether this record's discriminator matches `event_type`.
    pub fn is_type(&self, event_type: EventType) -> bool {
        self.event_type() == Some(event_type.as_str())
    }

    /// Non-empty string field. Empty strings and other types are `None`.
    pub fn text(&self, field: &str) -> Option<&str> {
        match self.get(field) {
            Some(Value::String(s)) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    /// Grouping key for a field: non-empty strings as-is, other truthy
    /// scalars (non-zero numbers, `true`) by their JSON text.
    pub fn label(&self, field: &str) -> Option<String> {
        match self.get(field)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
            Value::Bool(true) => Some("true".to_string()),
            _ => None,
        }
    }

    /// Integer field.
    ///
    /// Accepts JSON integers, finite floats (truncated toward zero) and
    /// strings holding a base-10 integer.
    pub fn integer(&self, field: &'static str) -> Result<i64, SkipReason> {
        let value = self.get(field).ok_or(SkipReason::MissingField(field))?;
        as_integer(value).ok_or_else(|| SkipReason::NotInteger {
            field,
            value: value.to_string(),
        })
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                .map(|f| f.trunc() as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// One bar in a count chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageCount {
    pub name: String,
    pub count: u64,
}

/// Deltas derived from one `response_time` record, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencySample {
    /// Request sent until response received.
    pub req_to_rec: i64,
    /// Request sent until content shown.
    pub req_to_show: i64,
    /// Response received until content shown.
    pub proc_time: i64,
}

impl LatencySample {
    /// Parse the three timestamps and derive the deltas.
    pub fn from_record(record: &Record) -> Result<Self, SkipReason> {
        let requested_at = record.integer("requested_at")?;
        let received_at = record.integer("received_at")?;
        let showed_at = record.integer("showed_at")?;

        let delta = |later: i64, earlier: i64| {
            later
                .checked_sub(earlier)
                .ok_or(SkipReason::Overflow)
        };

        Ok(Self {
            req_to_rec: delta(received_at, requested_at)?,
            req_to_show: delta(showed_at, requested_at)?,
            proc_time: delta(showed_at, received_at)?,
        })
    }

    /// Only samples with all three deltas strictly positive are averaged.
    pub fn is_valid(&self) -> bool {
        self.req_to_rec > 0 && self.req_to_show > 0 && self.proc_time > 0
    }
}

/// Mean latencies over the valid samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    /// Number of samples that went into the means.
    pub samples: u64,
    pub avg_req_to_rec: f64,
    pub avg_req_to_show: f64,
    pub avg_proc_time: f64,
}

/// Direction of a session event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionEventKind {
    Enter,
    Exit,
}

impl SessionEventKind {
    fn parse(s: &str) -> Result<Self, SkipReason> {
        match s {
            "enter" => Ok(SessionEventKind::Enter),
            "exit" => Ok(SessionEventKind::Exit),
            other => Err(SkipReason::UnknownEvent(other.to_string())),
        }
    }
}

/// A user entering or leaving an app section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    pub user_id: String,
    pub section: String,
    pub kind: SessionEventKind,
    /// Milliseconds since the epoch.
    pub timestamp: i64,
}

impl SessionEvent {
    /// Parse a `session_event` record.
    ///
    /// Every field must be present and non-empty; a zero timestamp counts as
    /// missing.
    pub fn from_record(record: &Record) -> Result<Self, SkipReason> {
        let user_id = record.label("user_id").ok_or(SkipReason::MissingField("user_id"))?;
        let section = record.label("section").ok_or(SkipReason::MissingField("section"))?;
        let event = record.text("event").ok_or(SkipReason::MissingField("event"))?;
        let timestamp = record.integer("timestamp")?;
        if timestamp == 0 {
            return Err(SkipReason::MissingField("timestamp"));
        }

        Ok(Self {
            user_id,
            section,
            kind: SessionEventKind::parse(event)?,
            timestamp,
        })
    }
}

/// Mean time spent in one section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionTime {
    pub section: String,
    /// Mean duration in milliseconds.
    pub avg_ms: f64,
    /// Mean duration in seconds, rounded to two decimals.
    pub avg_seconds: f64,
    /// Number of closed enter/exit pairs behind the mean.
    pub samples: usize,
}

/// Everything the dashboard shows, computed fresh for one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub generated_at: DateTime<Utc>,
    pub feature_usage: Vec<UsageCount>,
    pub latency: LatencyStats,
    pub top_sections: Vec<SectionTime>,
    pub categories: Vec<UsageCount>,
}
