use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::event_type::EventType;
use crate::types::{CaptureId, Confidence, EventId, SessionId};

/// A camera capture inferred from log evidence.
///
/// `source_event_ids` always starts with `decisive_artifact_event_id`,
/// followed by the supporting ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraCaptureEvent {
    pub capture_id: CaptureId,
    pub parent_session_id: SessionId,
    pub capture_time: DateTime<FixedOffset>,
    pub package_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_uri: Option<String>,
    pub decisive_artifact_event_id: EventId,
    #[serde(default)]
    pub supporting_artifact_ids: Vec<EventId>,
    /// Set when the time comes from a service start rather than the
    /// capture itself.
    pub is_estimated: bool,
    pub capture_detection_score: Confidence,
    /// Distinct evidence types, decisive type first.
    pub artifact_types: Vec<EventType>,
    pub source_event_ids: Vec<EventId>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl CameraCaptureEvent {
    /// Position of this capture's best evidence type in `priority`
    /// (lower is better), or `None` if no listed type is present.
    pub fn priority_rank(&self, priority: &[EventType]) -> Option<usize> {
        self.artifact_types
            .iter()
            .filter_map(|t| priority.iter().position(|p| p == t))
            .min()
    }
}
