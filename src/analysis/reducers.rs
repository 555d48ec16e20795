//! Reducers over store records.
//!
//! Each reducer is a pure fold over one record collection. Records that
//! cannot be used are dropped with a trace-level log line; nothing about
//! them reaches the summary.

use crate::models::{
    LatencySample, LatencyStats, Record, SectionTime, SessionEvent, SessionEventKind, UsageCount,
};
use std::collections::{HashMap, VecDeque};
use tracing::trace;

/// Feature names starting with this prefix share one bucket.
pub const SEARCH_PREFIX: &str = "search";

/// Bucket name for every `search*` feature.
pub const SEARCH_BUCKET: &str = "search_*";

/// Session durations at or above this (one hour, in ms) are discarded.
pub const MAX_SESSION_DURATION_MS: i64 = 3_600_000;

/// Default number of sections kept in the time-on-task ranking.
pub const DEFAULT_TOP_SECTIONS: usize = 5;

/// Insertion-ordered grouping.
struct Grouped<T> {
    index: HashMap<String, usize>,
    groups: Vec<(String, Vec<T>)>,
}

impl<T> Grouped<T> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            groups: Vec::new(),
        }
    }

    fn push(&mut self, key: &str, value: T) {
        match self.index.get(key) {
            Some(&i) => self.groups[i].1.push(value),
            None => {
                self.index.insert(key.to_string(), self.groups.len());
                self.groups.push((key.to_string(), vec![value]));
            }
        }
    }

    fn into_groups(self) -> Vec<(String, Vec<T>)> {
        self.groups
    }
}

/// Count occurrences of each name, keeping first-seen order.
fn tally<I, S>(names: I) -> Vec<UsageCount>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<UsageCount> = Vec::new();

    for name in names {
        let name = name.as_ref();
        match index.get(name) {
            Some(&i) => counts[i].count += 1,
            None => {
                index.insert(name.to_string(), counts.len());
                counts.push(UsageCount {
                    name: name.to_string(),
                    count: 1,
                });
            }
        }
    }

    counts
}

/// Sort counts descending. Stable, so ties keep their current order.
pub fn rank_by_count(counts: &mut [UsageCount]) {
    counts.sort_by_key(|c| std::cmp::Reverse(c.count));
}

/// Bucket name a feature is counted under.
pub fn feature_bucket(feature: &str) -> &str {
    if feature.starts_with(SEARCH_PREFIX) {
        SEARCH_BUCKET
    } else {
        feature
    }
}

/// Count `feature_usage` records per feature, in first-seen order.
pub fn count_feature_usage<'a, I>(records: I) -> Vec<UsageCount>
where
    I: IntoIterator<Item = &'a Record>,
{
    tally(records.into_iter().map(|record| {
        let feature = match record.get("feature") {
            None | Some(serde_json::Value::Null) => String::new(),
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };
        feature_bucket(&feature).to_string()
    }))
}

/// Average the deltas of every valid `response_time` record.
pub fn average_latency<'a, I>(records: I) -> LatencyStats
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut samples: u64 = 0;
    let mut total_req_to_rec: i128 = 0;
    let mut total_req_to_show: i128 = 0;
    let mut total_proc_time: i128 = 0;

    for record in records {
        let sample = match LatencySample::from_record(record) {
            Ok(sample) => sample,
            Err(reason) => {
                trace!("Skipping response_time record: {}", reason);
                continue;
            }
        };

        if !sample.is_valid() {
            trace!("Discarding non-positive latency sample: {:?}", sample);
            continue;
        }

        total_req_to_rec += i128::from(sample.req_to_rec);
        total_req_to_show += i128::from(sample.req_to_show);
        total_proc_time += i128::from(sample.proc_time);
        samples += 1;
    }

    let mean = |total: i128| {
        if samples == 0 {
            0.0
        } else {
            total as f64 / samples as f64
        }
    };

    LatencyStats {
        samples,
        avg_req_to_rec: mean(total_req_to_rec),
        avg_req_to_show: mean(total_req_to_show),
        avg_proc_time: mean(total_proc_time),
    }
}

/// Pair enter/exit timestamps of one (user, section) group.
///
/// Events are sorted by timestamp (stable), then each exit closes the oldest
/// open enter. Unmatched events are dropped, as are durations outside
/// `(0, MAX_SESSION_DURATION_MS)`.
pub fn pair_durations(events: &mut [(SessionEventKind, i64)]) -> Vec<i64> {
    events.sort_by_key(|(_, ts)| *ts);

    let mut open: VecDeque<i64> = VecDeque::new();
    let mut durations = Vec::new();

    for &(kind, ts) in events.iter() {
        match kind {
            SessionEventKind::Enter => open.push_back(ts),
            SessionEventKind::Exit => {
                let Some(enter_ts) = open.pop_front() else {
                    continue;
                };
                match ts.checked_sub(enter_ts) {
                    Some(duration) if duration > 0 && duration < MAX_SESSION_DURATION_MS => {
                        durations.push(duration)
                    }
                    _ => {}
                }
            }
        }
    }

    durations
}

/// Mean time on task per section across all users, best `top_n` first.
pub fn section_time_on_task<'a, I>(records: I, top_n: usize) -> Vec<SectionTime>
where
    I: IntoIterator<Item = &'a Record>,
{
    // user -> section -> events
    let mut by_user: Grouped<SessionEvent> = Grouped::new();
    for record in records {
        match SessionEvent::from_record(record) {
            Ok(event) => {
                let user = event.user_id.clone();
                by_user.push(&user, event);
            }
            Err(reason) => trace!("Skipping session_event record: {}", reason),
        }
    }

    let mut durations: Grouped<i64> = Grouped::new();
    for (_, user_events) in by_user.into_groups() {
        let mut by_section: Grouped<(SessionEventKind, i64)> = Grouped::new();
        for event in &user_events {
            by_section.push(&event.section, (event.kind, event.timestamp));
        }

        for (section, mut events) in by_section.into_groups() {
            for duration in pair_durations(&mut events) {
                durations.push(&section, duration);
            }
        }
    }

    let mut sections: Vec<SectionTime> = durations
        .into_groups()
        .into_iter()
        .filter(|(_, times)| !times.is_empty())
        .map(|(section, times)| {
            let avg_ms = times.iter().map(|&t| t as f64).sum::<f64>() / times.len() as f64;
            SectionTime {
                section,
                avg_ms,
                avg_seconds: ms_to_seconds(avg_ms),
                samples: times.len(),
            }
        })
        .collect();

    sections.sort_by(|a, b| {
        b.avg_ms
            .partial_cmp(&a.avg_ms)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    sections.truncate(top_n);

    sections
}

/// Milliseconds to seconds, rounded to two decimals.
fn ms_to_seconds(ms: f64) -> f64 {
    (ms / 10.0).round_ties_even() / 100.0
}

/// Count products per category, in first-seen order.
pub fn count_categories<'a, I>(products: I) -> Vec<UsageCount>
where
    I: IntoIterator<Item = &'a Record>,
{
    tally(products.into_iter().filter_map(|p| p.label("category")))
}
