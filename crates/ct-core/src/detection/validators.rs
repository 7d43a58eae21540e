//! Predicates that decide whether a piece of conditional evidence actually
//! points at a camera capture.

use regex::Regex;

use super::config::{DetectionConfigError, PathExclusionConfig, ValidationConstants};
use super::context::SessionContext;
use crate::event::NormalizedLogEvent;
use crate::event_type::EventType;

const STATUS_FINISHED: &str = "finished";
const STATUS_SUPERSEDED: &str = "cancelled_superseded";
const PLAYER_STARTED: &str = "started";

fn status_is(event: &NormalizedLogEvent, expected: &str) -> bool {
    event
        .attr_str("status")
        .is_some_and(|s| s.eq_ignore_ascii_case(expected))
}

fn contains_ignore_case(haystack: &str, needles: &[String]) -> bool {
    let haystack = haystack.to_lowercase();
    needles
        .iter()
        .any(|n| haystack.contains(&n.to_lowercase()))
}

/// A camera shutter haptic that actually played.
///
/// Either it finished, or it was superseded and the confirm haptic finished
/// within the supersede window after it.
pub fn is_shutter_vibration(
    event: &NormalizedLogEvent,
    ctx: &SessionContext,
    constants: &ValidationConstants,
) -> bool {
    if event.event_type != EventType::VibrationEvent
        || event.attr_i64("hapticType") != Some(constants.camera_shutter_haptic)
    {
        return false;
    }
    if status_is(event, STATUS_FINISHED) {
        return true;
    }
    if !status_is(event, STATUS_SUPERSEDED) {
        return false;
    }
    ctx.events_of(EventType::VibrationEvent).any(|other| {
        let delay = (other.timestamp - event.timestamp).num_milliseconds();
        other.event_id != event.event_id
            && (0..=constants.supersede_confirm_window_ms).contains(&delay)
            && other.attr_i64("hapticType") == Some(constants.confirm_haptic)
            && status_is(other, STATUS_FINISHED)
    })
}

/// A camera-tagged audio player starting while the camera post-processing
/// service is in the foreground.
pub fn is_camera_player_start(
    event: &NormalizedLogEvent,
    ctx: &SessionContext,
    constants: &ValidationConstants,
) -> bool {
    if event.event_type != EventType::PlayerEvent
        || !event
            .attr_str("event")
            .is_some_and(|e| e.eq_ignore_ascii_case(PLAYER_STARTED))
    {
        return false;
    }
    let Some(piid) = event.attr_i64("piid") else {
        return false;
    };

    let camera_player = ctx.events_of(EventType::PlayerCreated).any(|created| {
        created.attr_i64("piid") == Some(piid)
            && created
                .attr_str("tags")
                .is_some_and(|tags| tags.contains(&constants.camera_player_tag))
    });
    camera_player
        && ctx.foreground_services.iter().any(|service| {
            service.service_class.contains(&constants.post_process_service)
                && service.is_active_at(event.timestamp)
        })
}

/// A URI grant for a temporary file rather than an existing album item.
pub fn is_temp_uri_grant(event: &NormalizedLogEvent, constants: &ValidationConstants) -> bool {
    if event.event_type != EventType::UriPermissionGrant {
        return false;
    }
    let Some(uri) = event.attr_str("uri") else {
        return false;
    };
    !contains_ignore_case(uri, &constants.album_uri_markers)
        && contains_ignore_case(uri, &constants.temp_path_markers)
}

/// A foreground service start whose class ends with one of `services`.
pub fn is_service_start(event: &NormalizedLogEvent, services: &[String]) -> bool {
    event.event_type == EventType::ForegroundServiceStart
        && event
            .attr_str("class")
            .is_some_and(|class| services.iter().any(|s| class.ends_with(s.as_str())))
}

/// Compiled path exclusion rules.
#[derive(Debug, Clone)]
pub struct PathRules {
    exclusions: Vec<Regex>,
    album_paths: Vec<String>,
}

impl PathRules {
    pub fn new(config: &PathExclusionConfig) -> Result<Self, DetectionConfigError> {
        let exclusions = config
            .exclusion_patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| DetectionConfigError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            exclusions,
            album_paths: config.album_path_patterns.clone(),
        })
    }

    pub fn is_excluded_path(&self, path: &str) -> bool {
        self.exclusions.iter().any(|re| re.is_match(path))
    }

    pub fn is_album_path(&self, path: &str) -> bool {
        self.album_paths.iter().any(|p| path.contains(p.as_str()))
    }

    /// Excluded paths never count. Album paths count only for database
    /// inserts, which record the newly written file itself.
    pub fn should_exclude(&self, event: &NormalizedLogEvent) -> bool {
        let Some(path) = event.path_attribute() else {
            return false;
        };
        self.is_excluded_path(&path)
            || (event.event_type != EventType::DatabaseInsert && self.is_album_path(&path))
    }
}
