//! The capture detection template shared by all strategies.

use std::collections::BTreeMap;

use super::capture::CameraCaptureEvent;
use super::config::StrategyOptions;
use super::confidence::ConfidenceCalculator;
use super::context::SessionContext;
use super::validators::PathRules;
use crate::event::NormalizedLogEvent;
use crate::event_type::EventType;
use crate::types::{CaptureId, Confidence};

/// How a key artifact earned its place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTier {
    /// Direct proof of a capture.
    Confirmed,
    /// Validated indirect evidence.
    Conditional,
    /// Last resort when nothing better exists.
    Fallback,
}

impl KeyTier {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Conditional => "conditional",
            Self::Fallback => "fallback",
        }
    }
}

/// An event chosen to anchor one candidate capture.
#[derive(Debug, Clone, Copy)]
pub struct KeyArtifact<'a> {
    pub event: &'a NormalizedLogEvent,
    pub tier: KeyTier,
    /// Sufficient keys produce a capture whatever their score; the rest
    /// must reach the strategy's minimum confidence.
    pub sufficient: bool,
}

impl<'a> KeyArtifact<'a> {
    pub const fn new(event: &'a NormalizedLogEvent, tier: KeyTier, sufficient: bool) -> Self {
        Self {
            event,
            tier,
            sufficient,
        }
    }
}

/// Capture detection for one family of apps.
///
/// Implementors pick key artifacts; [`detect`](Self::detect) runs the fixed
/// pipeline around them: path exclusion, supporting evidence, scoring,
/// threshold, deduplication. Every hook has a default that strategies may
/// override.
pub trait CaptureDetectionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn options(&self) -> &StrategyOptions;

    fn confidence(&self) -> &ConfidenceCalculator;

    fn path_rules(&self) -> &PathRules;

    /// Candidate keys in the session, in time order.
    fn key_artifacts<'a>(&self, ctx: &'a SessionContext) -> Vec<KeyArtifact<'a>>;

    fn package_name_pattern(&self) -> Option<&str> {
        self.options().package_name.as_deref()
    }

    fn priority(&self) -> i32 {
        self.options().priority
    }

    fn matches_package(&self, package: &str) -> bool {
        self.package_name_pattern() == Some(package)
    }

    fn supporting_artifact_types(&self) -> &[EventType] {
        &self.options().supporting_artifacts
    }

    fn should_exclude_by_path_pattern(&self, event: &NormalizedLogEvent) -> bool {
        self.path_rules().should_exclude(event)
    }

    /// Supporting events within the correlation window around `key`,
    /// excluding `key` itself.
    fn collect_supporting_artifacts<'a>(
        &self,
        ctx: &'a SessionContext,
        key: &NormalizedLogEvent,
    ) -> Vec<&'a NormalizedLogEvent> {
        let window_ms = self.options().correlation_window_ms;
        let types = self.supporting_artifact_types();
        ctx.all_events
            .iter()
            .filter(|e| {
                e.event_id != key.event_id
                    && types.contains(&e.event_type)
                    && (e.timestamp - key.timestamp).num_milliseconds().abs() <= window_ms
                    && !self.should_exclude_by_path_pattern(e)
            })
            .collect()
    }

    fn create_capture_event(
        &self,
        ctx: &SessionContext,
        key: &KeyArtifact<'_>,
        supporting: &[&NormalizedLogEvent],
        score: Confidence,
    ) -> CameraCaptureEvent {
        let evidence = || std::iter::once(key.event).chain(supporting.iter().copied());

        let mut artifact_types = Vec::new();
        for event in evidence() {
            if !artifact_types.contains(&event.event_type) {
                artifact_types.push(event.event_type);
            }
        }
        let file_path = evidence().find_map(|e| e.attr_str("file_path").map(str::to_string));
        let file_uri = evidence().find_map(|e| e.attr_str("uri").map(str::to_string));

        let metadata = BTreeMap::from([
            ("strategy".to_string(), self.name().to_string()),
            ("key_tier".to_string(), key.tier.as_str().to_string()),
            ("key_event_type".to_string(), key.event.event_type.to_string()),
            ("session_package".to_string(), ctx.session.package_name.clone()),
        ]);

        CameraCaptureEvent {
            capture_id: CaptureId::generate(),
            parent_session_id: ctx.session.id.clone(),
            capture_time: key.event.timestamp,
            package_name: ctx.session.package_name.clone(),
            file_path,
            file_uri,
            decisive_artifact_event_id: key.event.event_id.clone(),
            supporting_artifact_ids: supporting.iter().map(|e| e.event_id.clone()).collect(),
            is_estimated: key.event.event_type == EventType::ForegroundServiceStart,
            capture_detection_score: score,
            artifact_types,
            source_event_ids: evidence().map(|e| e.event_id.clone()).collect(),
            metadata,
        }
    }

    fn deduplicate_captures(&self, captures: Vec<CameraCaptureEvent>) -> Vec<CameraCaptureEvent> {
        captures
    }

    fn detect(&self, ctx: &SessionContext) -> Vec<CameraCaptureEvent> {
        let threshold = self.options().min_confidence_threshold;
        let mut captures = Vec::new();

        for key in self.key_artifacts(ctx) {
            if self.should_exclude_by_path_pattern(key.event) {
                tracing::trace!(
                    strategy = self.name(),
                    event_id = %key.event.event_id,
                    "key artifact excluded by path"
                );
                continue;
            }
            let supporting = self.collect_supporting_artifacts(ctx, key.event);
            let score = self
                .confidence()
                .score(std::iter::once(key.event).chain(supporting.iter().copied()));
            if !key.sufficient && score.value() < threshold {
                tracing::trace!(
                    strategy = self.name(),
                    event_id = %key.event.event_id,
                    score = score.value(),
                    "candidate below confidence threshold"
                );
                continue;
            }
            captures.push(self.create_capture_event(ctx, &key, &supporting, score));
        }

        let candidates = captures.len();
        let captures = self.deduplicate_captures(captures);
        tracing::debug!(
            strategy = self.name(),
            session = %ctx.session.id,
            candidates,
            captures = captures.len(),
            "session detection finished"
        );
        captures
    }
}
