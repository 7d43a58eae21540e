use super::capture::CameraCaptureEvent;
use super::config::{DetectionConfig, DetectionConfigError, StrategyOptions, ValidationConstants};
use super::confidence::ConfidenceCalculator;
use super::context::SessionContext;
use super::dedup::Deduplicator;
use super::strategy::{CaptureDetectionStrategy, KeyArtifact, KeyTier};
use super::validators::{
    PathRules, is_camera_player_start, is_service_start, is_shutter_vibration, is_temp_uri_grant,
};
use crate::event::NormalizedLogEvent;
use crate::event_type::EventType;

/// Fallback strategy for any package without a dedicated one.
///
/// Database inserts are confirmed keys. Only when a session has none does
/// conditional evidence get promoted, and then only what passes its
/// validator. Camera service starts are the last resort, used only when no
/// other evidence survived.
#[derive(Debug, Clone)]
pub struct GenericStrategy {
    options: StrategyOptions,
    constants: ValidationConstants,
    confidence: ConfidenceCalculator,
    path_rules: PathRules,
    dedup: Deduplicator,
}

impl GenericStrategy {
    pub fn new(config: &DetectionConfig) -> Result<Self, DetectionConfigError> {
        let options = config.generic.clone();
        Ok(Self {
            dedup: Deduplicator::new(options.dedup_window_ms, config.dedup_priority.clone()),
            confidence: ConfidenceCalculator::new(config.weights.clone()),
            path_rules: PathRules::new(&config.path_exclusion)?,
            constants: config.validation.clone(),
            options,
        })
    }

    /// Tier a conditional event earns, or `None` if it fails validation.
    fn validate_conditional(&self, ctx: &SessionContext, event: &NormalizedLogEvent) -> Option<KeyTier> {
        let c = &self.constants;
        let tier = match event.event_type {
            EventType::VibrationEvent => {
                is_shutter_vibration(event, ctx, c).then_some(KeyTier::Conditional)
            }
            EventType::PlayerEvent => {
                is_camera_player_start(event, ctx, c).then_some(KeyTier::Conditional)
            }
            EventType::UriPermissionGrant => {
                is_temp_uri_grant(event, c).then_some(KeyTier::Conditional)
            }
            EventType::SilentCameraCapture => Some(KeyTier::Conditional),
            EventType::ForegroundServiceStart => (is_service_start(event, &c.capture_confirmed_services)
                || is_service_start(event, &c.capture_possible_services))
            .then_some(KeyTier::Fallback),
            _ => None,
        };
        if tier.is_none() {
            tracing::trace!(
                event_id = %event.event_id,
                event_type = %event.event_type,
                "conditional evidence failed validation"
            );
        }
        tier
    }
}

impl CaptureDetectionStrategy for GenericStrategy {
    fn name(&self) -> &'static str {
        "generic"
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
        let confirmed: Vec<KeyArtifact<'a>> = ctx
            .all_events
            .iter()
            .filter(|e| {
                self.options.key_artifacts.contains(&e.event_type)
                    && !self.should_exclude_by_path_pattern(e)
            })
            .map(|e| KeyArtifact::new(e, KeyTier::Confirmed, true))
            .collect();
        if !confirmed.is_empty() {
            return confirmed;
        }

        let (conditional, fallback): (Vec<KeyArtifact<'a>>, Vec<KeyArtifact<'a>>) = ctx
            .all_events
            .iter()
            .filter(|e| self.options.conditional_key_artifacts.contains(&e.event_type))
            .filter_map(|e| {
                self.validate_conditional(ctx, e)
                    .map(|tier| KeyArtifact::new(e, tier, false))
            })
            .partition(|key| key.tier == KeyTier::Conditional);
        if conditional.is_empty() {
            fallback
        } else {
            conditional
        }
    }

    fn deduplicate_captures(&self, captures: Vec<CameraCaptureEvent>) -> Vec<CameraCaptureEvent> {
        self.dedup.deduplicate(captures)
    }
}
