//! Call list: ended/upcoming partitioning, titles and rate-limited
//! recording retrieval.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};

use super::Preferences;
use crate::config::CallListConfig;
use crate::error::ClassMeetResult;

/// A call as returned by the call directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSummary {
    pub id: String,
    pub starts_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub topic: Option<String>,
    pub description: Option<String>,
    pub creator_id: Option<String>,
}

/// A finished recording of a call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRecording {
    /// `<prefix>_<prefix>_<callId>_...` as produced by the recording service.
    pub filename: String,
    pub url: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

/// Call queries of the call SDK.
#[async_trait]
pub trait CallDirectory: Send + Sync {
    /// Calls with a start time that `user_id` created or is a member of.
    async fn query_calls(&self, user_id: &str) -> ClassMeetResult<Vec<CallSummary>>;
    async fn query_recordings(&self, call_id: &str) -> ClassMeetResult<Vec<CallRecording>>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallPartition {
    pub ended: Vec<CallSummary>,
    pub upcoming: Vec<CallSummary>,
}

/// Split calls into ended and upcoming, each sorted newest first.
///
/// A call is ended when it started before `now` or has an end time; it is
/// upcoming when it starts after `now`. Calls without a start time and
/// without an end time are in neither list.
pub fn partition_calls(calls: &[CallSummary], now: DateTime<Utc>) -> CallPartition {
    let mut partition = CallPartition::default();
    for call in calls {
        if call.starts_at.is_some_and(|s| s < now) || call.ended_at.is_some() {
            partition.ended.push(call.clone());
        }
        if call.starts_at.is_some_and(|s| s > now) {
            partition.upcoming.push(call.clone());
        }
    }
    partition.ended.sort_by(|a, b| b.starts_at.cmp(&a.starts_at));
    partition.upcoming.sort_by(|a, b| b.starts_at.cmp(&a.starts_at));
    partition
}

/// Title for a call card.
pub fn call_title(call: &CallSummary, prefs: &Preferences) -> String {
    if let Some(topic) = call.topic.as_deref().filter(|t| !t.is_empty()) {
        return topic.to_string();
    }
    if let Some(topic) = call.creator_id.as_deref().and_then(|c| prefs.topic_for(c)) {
        return topic;
    }
    match call.description.as_deref() {
        Some(description) if !description.is_empty() => description.to_string(),
        _ => "No Description".to_string(),
    }
}

/// Title for a recording card.
pub fn recording_title(recording: &CallRecording, prefs: &Preferences) -> String {
    let parent = recording
        .filename
        .split('_')
        .nth(2)
        .filter(|p| !p.is_empty());
    if let Some(topic) = parent.and_then(|p| prefs.topic_for(p)) {
        return topic;
    }
    let date = recording
        .start_time
        .map(|t| t.format("%-m/%-d/%Y").to_string())
        .unwrap_or_default();
    format!("Recording - {}", date)
}

/// Collect the recordings of `calls`, querying `recording_batch_size`
/// calls at a time and pausing `batch_delay_ms` between batches.
///
/// A call whose query fails contributes no recordings.
pub async fn fetch_recordings<D: CallDirectory + ?Sized>(
    directory: &D,
    calls: &[CallSummary],
    config: &CallListConfig,
) -> Vec<CallRecording> {
    let batch_size = config.recording_batch_size.max(1);
    let batch_count = calls.len().div_ceil(batch_size);
    let mut recordings = Vec::new();

    for (index, batch) in calls.chunks(batch_size).enumerate() {
        let results = join_all(batch.iter().map(|call| async move {
            match directory.query_recordings(&call.id).await {
                Ok(found) => found,
                Err(e) => {
                    log::warn!(
                        "[CALL_LIST] Failed to fetch recordings for call {}: {}",
                        call.id,
                        e
                    );
                    Vec::new()
                },
            }
        }))
        .await;
        recordings.extend(results.into_iter().flatten());

        if index + 1 < batch_count && config.batch_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(config.batch_delay_ms)).await;
        }
    }

    log::debug!(
        "[CALL_LIST] Fetched {} recording(s) from {} call(s)",
        recordings.len(),
        calls.len()
    );
    recordings
}
