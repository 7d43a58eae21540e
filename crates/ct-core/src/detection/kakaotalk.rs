use super::capture::CameraCaptureEvent;
use super::config::{DetectionConfig, DetectionConfigError, StrategyOptions, ValidationConstants};
use super::confidence::ConfidenceCalculator;
use super::context::SessionContext;
use super::dedup::Deduplicator;
use super::strategy::{CaptureDetectionStrategy, KeyArtifact, KeyTier};
use super::validators::{PathRules, is_service_start, is_shutter_vibration};
use crate::event_type::EventType;

/// KakaoTalk uses the system shutter haptic for in-app captures.
///
/// A validated shutter vibration is enough on its own. Sessions without one
/// fall back to the notification service start that accompanies sending a
/// photo; that fallback has to reach the confidence threshold.
#[derive(Debug, Clone)]
pub struct KakaoTalkStrategy {
    options: StrategyOptions,
    constants: ValidationConstants,
    confidence: ConfidenceCalculator,
    path_rules: PathRules,
    dedup: Deduplicator,
}

impl KakaoTalkStrategy {
    pub fn new(config: &DetectionConfig) -> Result<Self, DetectionConfigError> {
        let options = config.kakaotalk.clone();
        Ok(Self {
            dedup: Deduplicator::new(options.dedup_window_ms, config.dedup_priority.clone()),
            confidence: ConfidenceCalculator::new(config.weights.clone()),
            path_rules: PathRules::new(&config.path_exclusion)?,
            constants: config.validation.clone(),
            options,
        })
    }
}

impl CaptureDetectionStrategy for KakaoTalkStrategy {
    fn name(&self) -> &'static str {
        "kakaotalk"
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

    fn key_artifacts<'a>(&self, ctx: &'a SessionContext) -> Vec<KeyArtifact<'a>> {
        let shutters: Vec<KeyArtifact<'a>> = ctx
            .all_events
            .iter()
            .filter(|e| {
                self.options.key_artifacts.contains(&e.event_type)
                    && is_shutter_vibration(e, ctx, &self.constants)
            })
            .map(|e| KeyArtifact::new(e, KeyTier::Confirmed, true))
            .collect();
        if !shutters.is_empty() {
            return shutters;
        }

        let notification = std::slice::from_ref(&self.constants.kakaotalk_notification_service);
        ctx.all_events
            .iter()
            .filter(|e| {
                self.options.conditional_key_artifacts.contains(&e.event_type)
                    && e.event_type == EventType::ForegroundServiceStart
                    && is_service_start(e, notification)
            })
            .map(|e| KeyArtifact::new(e, KeyTier::Fallback, false))
            .collect()
    }

    fn deduplicate_captures(&self, captures: Vec<CameraCaptureEvent>) -> Vec<CameraCaptureEvent> {
        self.dedup.deduplicate(captures)
    }
}
