use chrono::Duration;

use super::capture::CameraCaptureEvent;
use crate::event_type::EventType;

/// Collapses captures that fall within one window of each other.
///
/// Captures are walked in time order. Each group is anchored on its first
/// capture and takes every later capture no more than `window` after the
/// anchor. One capture survives per group: the one whose best evidence type
/// ranks highest in `priority`, then the higher score, then the earlier one.
#[derive(Debug, Clone)]
pub struct Deduplicator {
    window: Duration,
    priority: Vec<EventType>,
}

impl Deduplicator {
    pub fn new(window_ms: i64, priority: Vec<EventType>) -> Self {
        Self {
            window: Duration::milliseconds(window_ms),
            priority,
        }
    }

    pub fn deduplicate(&self, mut captures: Vec<CameraCaptureEvent>) -> Vec<CameraCaptureEvent> {
        captures.sort_by_key(|c| c.capture_time);

        let mut kept = Vec::with_capacity(captures.len());
        let mut iter = captures.into_iter().peekable();
        while let Some(anchor) = iter.next() {
            let anchor_time = anchor.capture_time;
            let mut best = anchor;
            while let Some(next) = iter.next_if(|c| c.capture_time - anchor_time <= self.window) {
                if self.outranks(&next, &best) {
                    best = next;
                }
            }
            kept.push(best);
        }
        kept
    }

    fn outranks(&self, candidate: &CameraCaptureEvent, current: &CameraCaptureEvent) -> bool {
        match (
            candidate.priority_rank(&self.priority),
            current.priority_rank(&self.priority),
        ) {
            (Some(a), Some(b)) if a != b => a < b,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            _ => candidate.capture_detection_score > current.capture_detection_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::detection::DetectionConfig;
    use crate::detection::test_support::at_ms;
    use crate::types::{CaptureId, Confidence, EventId, SessionId};

    fn capture(id: &str, ms: i64, kind: EventType, score: f32) -> CameraCaptureEvent {
        let event_id = EventId::new(format!("{id}-evt")).unwrap();
        CameraCaptureEvent {
            capture_id: CaptureId::new(id).unwrap(),
            parent_session_id: SessionId::new("s").unwrap(),
            capture_time: at_ms(ms),
            package_name: "com.example".into(),
            file_path: None,
            file_uri: None,
            decisive_artifact_event_id: event_id.clone(),
            supporting_artifact_ids: Vec::new(),
            is_estimated: false,
            capture_detection_score: Confidence::clamped(score),
            artifact_types: vec![kind],
            source_event_ids: vec![event_id],
            metadata: BTreeMap::new(),
        }
    }

    fn dedup() -> Deduplicator {
        Deduplicator::new(1_000, DetectionConfig::default().dedup_priority)
    }

    fn ids(captures: &[CameraCaptureEvent]) -> Vec<&str> {
        captures.iter().map(|c| c.capture_id.as_str()).collect()
    }

    #[test]
    fn merges_within_window_and_keeps_distant_captures() {
        let out = dedup().deduplicate(vec![
            capture("a", 0, EventType::VibrationEvent, 0.4),
            capture("b", 500, EventType::VibrationEvent, 0.4),
            capture("c", 31_000, EventType::VibrationEvent, 0.4),
        ]);
        assert_eq!(ids(&out), vec!["a", "c"]);
    }

    #[test]
    fn higher_priority_type_wins_over_higher_score() {
        let out = dedup().deduplicate(vec![
            capture("uri", 0, EventType::UriPermissionGrant, 0.9),
            capture("vib", 300, EventType::VibrationEvent, 0.4),
        ]);
        assert_eq!(ids(&out), vec!["vib"]);
    }

    #[test]
    fn unlisted_types_rank_below_listed_ones() {
        let out = dedup().deduplicate(vec![
            capture("db", 0, EventType::DatabaseInsert, 0.9),
            capture("fgs", 300, EventType::ForegroundServiceStart, 0.15),
        ]);
        assert_eq!(ids(&out), vec!["fgs"]);
    }

    #[test]
    fn equal_priority_falls_back_to_score() {
        let out = dedup().deduplicate(vec![
            capture("low", 0, EventType::DatabaseInsert, 0.5),
            capture("high", 300, EventType::DatabaseInsert, 0.7),
        ]);
        assert_eq!(ids(&out), vec!["high"]);
    }

    #[test]
    fn groups_are_anchored_not_chained() {
        let out = dedup().deduplicate(vec![
            capture("a", 0, EventType::VibrationEvent, 0.4),
            capture("b", 900, EventType::VibrationEvent, 0.4),
            capture("c", 1_800, EventType::VibrationEvent, 0.4),
        ]);
        assert_eq!(ids(&out), vec!["a", "c"]);
    }

    #[test]
    fn unsorted_input_is_ordered_by_time() {
        let out = dedup().deduplicate(vec![
            capture("late", 10_000, EventType::VibrationEvent, 0.4),
            capture("early", 0, EventType::VibrationEvent, 0.4),
        ]);
        assert_eq!(ids(&out), vec!["early", "late"]);
    }
}
