use super::capture::CameraCaptureEvent;
use super::config::{DetectionConfig, DetectionConfigError, StrategyOptions};
use super::confidence::ConfidenceCalculator;
use super::context::SessionContext;
use super::dedup::Deduplicator;
use super::strategy::{CaptureDetectionStrategy, KeyArtifact, KeyTier};
use super::validators::PathRules;
use crate::event_type::EventType;

const TOUCH_USAGE: &str = "TOUCH";

/// Telegram's in-app camera plays a touch haptic under its own package on
/// every shutter press.
///
/// Audio player events are never used as evidence: Telegram plays media
/// constantly and they say nothing about the camera.
#[derive(Debug, Clone)]
pub struct TelegramStrategy {
    options: StrategyOptions,
    supporting: Vec<EventType>,
    confidence: ConfidenceCalculator,
    path_rules: PathRules,
    dedup: Deduplicator,
}

impl TelegramStrategy {
    pub fn new(config: &DetectionConfig) -> Result<Self, DetectionConfigError> {
        let options = config.telegram.clone();
        let supporting = options
            .supporting_artifacts
            .iter()
            .copied()
            .filter(|t| *t != EventType::PlayerEvent)
            .collect();
        Ok(Self {
            supporting,
            dedup: Deduplicator::new(options.dedup_window_ms, config.dedup_priority.clone()),
            confidence: ConfidenceCalculator::new(config.weights.clone()),
            path_rules: PathRules::new(&config.path_exclusion)?,
            options,
        })
    }
}

impl CaptureDetectionStrategy for TelegramStrategy {
    fn name(&self) -> &'static str {
        "telegram"
    }

    fn options(&self) -> &StrategyOptions {
        &self.options
    }

    fn confidence(&self) -> &ConfidenceCalculator {
        &self.confidence
    }

    fn path_rules(&self) -> &PathRules {
        &self.path_rules
    }

    fn supporting_artifact_types(&self) -> &[EventType] {
        &self.supporting
    }

    fn key_artifacts<'a>(&self, ctx: &'a SessionContext) -> Vec<KeyArtifact<'a>> {
        let package = ctx.session.package_name.as_str();
        ctx.all_events
            .iter()
            .filter(|e| {
                self.options.key_artifacts.contains(&e.event_type)
                    && e.event_type == EventType::VibrationEvent
                    && e.package_name.as_deref() == Some(package)
                    && e
                        .attr_str("usage")
                        .is_some_and(|u| u.eq_ignore_ascii_case(TOUCH_USAGE))
            })
            .map(|e| KeyArtifact::new(e, KeyTier::Confirmed, false))
            .collect()
    }

    fn deduplicate_captures(&self, captures: Vec<CameraCaptureEvent>) -> Vec<CameraCaptureEvent> {
        self.dedup.deduplicate(captures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::test_support::{EventBuilder, context};

    const TELEGRAM: &str = "org.telegram.messenger";

    fn touch(id: &str, ms: i64, package: &str, usage: &str) -> crate::event::NormalizedLogEvent {
        EventBuilder::new(id, ms, EventType::VibrationEvent)
            .package(package)
            .attr("usage", usage)
            .attr("status", "finished")
            .build()
    }

    fn strategy() -> TelegramStrategy {
        TelegramStrategy::new(&DetectionConfig::default()).unwrap()
    }

    #[test]
    fn touch_vibration_from_own_package_is_a_capture() {
        let ctx = context(TELEGRAM, vec![touch("v", 0, TELEGRAM, "TOUCH")]);
        let captures = strategy().detect(&ctx);

        assert_eq!(captures.len(), 1);
        assert!((captures[0].capture_detection_score.value() - 0.4).abs() < 1e-6);
        assert_eq!(captures[0].metadata["strategy"], "telegram");
    }

    #[test]
    fn vibrations_from_other_packages_or_usages_are_ignored() {
        let ctx = context(
            TELEGRAM,
            vec![
                touch("other-pkg", 0, "com.android.systemui", "TOUCH"),
                touch("alarm", 5_000, TELEGRAM, "ALARM"),
            ],
        );
        assert!(strategy().detect(&ctx).is_empty());
    }

    #[test]
    fn player_events_never_support() {
        let player = EventBuilder::new("player", 500, EventType::PlayerEvent)
            .attr("event", "started")
            .build();
        let ctx = context(TELEGRAM, vec![touch("v", 0, TELEGRAM, "touch"), player]);
        let captures = strategy().detect(&ctx);

        assert_eq!(captures.len(), 1);
        assert!(captures[0].supporting_artifact_ids.is_empty());
        assert!(!captures[0].artifact_types.contains(&EventType::PlayerEvent));
    }

    #[test]
    fn player_events_stay_excluded_even_when_configured() {
        let mut config = DetectionConfig::default();
        config.telegram.supporting_artifacts.push(EventType::PlayerEvent);
        let strategy = TelegramStrategy::new(&config).unwrap();
        assert!(!strategy.supporting_artifact_types().contains(&EventType::PlayerEvent));
    }
}
