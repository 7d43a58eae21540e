use std::collections::{BTreeMap, BTreeSet};

use crate::event::NormalizedLogEvent;
use crate::event_type::EventType;
use crate::types::Confidence;

/// Additive score over distinct evidence types.
///
/// Each type counts once no matter how many events of it are present; the
/// sum is capped at 1.0.
#[derive(Debug, Clone, Default)]
pub struct ConfidenceCalculator {
    weights: BTreeMap<EventType, f32>,
}

impl ConfidenceCalculator {
    pub fn new(weights: impl IntoIterator<Item = (EventType, f32)>) -> Self {
        Self {
            weights: weights.into_iter().collect(),
        }
    }

    /// Unlisted types weigh nothing.
    pub fn weight(&self, event_type: EventType) -> f32 {
        self.weights.get(&event_type).copied().unwrap_or(0.0)
    }

    pub fn score_types(&self, types: impl IntoIterator<Item = EventType>) -> Confidence {
        let distinct: BTreeSet<EventType> = types.into_iter().collect();
        let sum: f32 = distinct.into_iter().map(|t| self.weight(t).max(0.0)).sum();
        Confidence::clamped(sum.min(1.0))
    }

    pub fn score<'a>(&self, events: impl IntoIterator<Item = &'a NormalizedLogEvent>) -> Confidence {
        self.score_types(events.into_iter().map(|e| e.event_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::DetectionConfig;

    fn calculator() -> ConfidenceCalculator {
        ConfidenceCalculator::new(DetectionConfig::default().weights)
    }

    #[test]
    fn repeated_types_count_once() {
        let calc = calculator();
        let once = calc.score_types([EventType::VibrationEvent]);
        let twice = calc.score_types([EventType::VibrationEvent, EventType::VibrationEvent]);
        assert_eq!(once, twice);
        assert!((once.value() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn sums_distinct_weights() {
        let score = calculator().score_types([EventType::VibrationEvent, EventType::UriPermissionGrant]);
        assert!((score.value() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn caps_at_one() {
        let score = calculator().score_types(EventType::ALL.iter().copied());
        assert_eq!(score, Confidence::MAX);
    }

    #[test]
    fn unweighted_types_contribute_nothing() {
        let calc = calculator();
        assert_eq!(calc.weight(EventType::ActivityPaused), 0.0);
        assert_eq!(calc.score_types([EventType::ActivityPaused]), Confidence::MIN);
        assert_eq!(calc.score_types(Vec::new()), Confidence::MIN);
    }
}
