//! Detection engine configuration.
//!
//! `DetectionConfig::default()` carries the built-in constants; nothing here
//! is global state, every strategy receives its configuration at construction.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event_type::EventType;

#[derive(Debug, Error)]
pub enum DetectionConfigError {
    #[error("invalid exclusion pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Literal constants used by evidence validators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConstants {
    /// `hapticType` of the camera shutter vibration.
    pub camera_shutter_haptic: i64,
    /// `hapticType` of the generic UI haptic that can supersede the shutter.
    pub confirm_haptic: i64,
    /// Maximum delay between a superseded shutter haptic and its confirm haptic.
    pub supersede_confirm_window_ms: i64,
    /// Audio attribute tag carried by the camera shutter player.
    pub camera_player_tag: String,
    /// Class name (suffix) of the system camera post-processing service.
    pub post_process_service: String,
    /// Foreground services whose start confirms a capture.
    pub capture_confirmed_services: Vec<String>,
    /// Foreground services whose start makes a capture possible.
    pub capture_possible_services: Vec<String>,
    /// KakaoTalk service started around in-app captures.
    pub kakaotalk_notification_service: String,
    /// Substrings identifying temporary or cache locations in a URI.
    pub temp_path_markers: Vec<String>,
    /// Substrings identifying album, media store or shared locations in a URI.
    pub album_uri_markers: Vec<String>,
}

impl Default for ValidationConstants {
    fn default() -> Self {
        Self {
            camera_shutter_haptic: 50061,
            confirm_haptic: 50072,
            supersede_confirm_window_ms: 200,
            camera_player_tag: "CAMERA".to_string(),
            post_process_service: "PostProcessService".to_string(),
            capture_confirmed_services: vec![
                "com.sec.android.app.camera.service.PostProcessService".to_string(),
            ],
            capture_possible_services: vec![
                "com.sec.android.app.camera.service.CameraService".to_string(),
            ],
            kakaotalk_notification_service: "com.kakao.talk.service.NotificationService"
                .to_string(),
            temp_path_markers: vec!["/cache/".to_string(), "/tmp/".to_string(), "tmp_".to_string()],
            album_uri_markers: vec![
                "content://media/".to_string(),
                "mediastore".to_string(),
                "/dcim/".to_string(),
                "/pictures/".to_string(),
                "/download/".to_string(),
                "fileprovider".to_string(),
            ],
        }
    }
}

/// Paths that must never be reported as fresh captures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathExclusionConfig {
    /// Regexes for screenshots, downloads and similar non-camera media.
    pub exclusion_patterns: Vec<String>,
    /// Substrings of paths that point at existing album items.
    pub album_path_patterns: Vec<String>,
}

impl Default for PathExclusionConfig {
    fn default() -> Self {
        Self {
            exclusion_patterns: vec!["(?i)screenshot".to_string(), "(?i)/download/".to_string()],
            album_path_patterns: vec![
                "content://media/external/images/media".to_string(),
                "/Pictures/".to_string(),
                "/DCIM/.thumbnails/".to_string(),
            ],
        }
    }
}

/// Evidence sets and thresholds for one strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyOptions {
    /// Literal package this strategy applies to; `None` for the fallback.
    #[serde(default)]
    pub package_name: Option<String>,
    /// Higher values win when several strategies match a package.
    #[serde(default)]
    pub priority: i32,
    pub key_artifacts: Vec<EventType>,
    #[serde(default)]
    pub conditional_key_artifacts: Vec<EventType>,
    #[serde(default)]
    pub supporting_artifacts: Vec<EventType>,
    pub correlation_window_ms: i64,
    pub dedup_window_ms: i64,
    pub min_confidence_threshold: f32,
}

const DEFAULT_CORRELATION_WINDOW_MS: i64 = 30_000;
const DEFAULT_DEDUP_WINDOW_MS: i64 = 1_000;
const DEFAULT_MIN_CONFIDENCE: f32 = 0.1;

impl StrategyOptions {
    fn with_sets(
        package_name: Option<&str>,
        priority: i32,
        key_artifacts: Vec<EventType>,
        conditional_key_artifacts: Vec<EventType>,
        supporting_artifacts: Vec<EventType>,
    ) -> Self {
        Self {
            package_name: package_name.map(str::to_string),
            priority,
            key_artifacts,
            conditional_key_artifacts,
            supporting_artifacts,
            correlation_window_ms: DEFAULT_CORRELATION_WINDOW_MS,
            dedup_window_ms: DEFAULT_DEDUP_WINDOW_MS,
            min_confidence_threshold: DEFAULT_MIN_CONFIDENCE,
        }
    }

    /// Fallback strategy: database inserts are confirmed, everything else
    /// must pass its validator.
    pub fn generic() -> Self {
        use EventType::{
            ActivityRefreshRate, CameraConnect, DatabaseInsert, ForegroundServiceStart,
            PlayerEvent, SilentCameraCapture, UriPermissionGrant, VibrationEvent,
        };
        Self::with_sets(
            None,
            0,
            vec![DatabaseInsert],
            vec![
                VibrationEvent,
                PlayerEvent,
                UriPermissionGrant,
                SilentCameraCapture,
                ForegroundServiceStart,
            ],
            vec![
                VibrationEvent,
                PlayerEvent,
                UriPermissionGrant,
                SilentCameraCapture,
                ForegroundServiceStart,
                CameraConnect,
                ActivityRefreshRate,
            ],
        )
    }

    pub fn telegram() -> Self {
        use EventType::{
            ActivityRefreshRate, CameraConnect, DatabaseInsert, ForegroundServiceStart,
            UriPermissionGrant, VibrationEvent,
        };
        Self::with_sets(
            Some("org.telegram.messenger"),
            100,
            vec![VibrationEvent],
            Vec::new(),
            vec![
                UriPermissionGrant,
                DatabaseInsert,
                ForegroundServiceStart,
                CameraConnect,
                ActivityRefreshRate,
            ],
        )
    }

    pub fn kakaotalk() -> Self {
        use EventType::{
            ActivityRefreshRate, CameraConnect, DatabaseInsert, ForegroundServiceStart,
            PlayerEvent, UriPermissionGrant, VibrationEvent,
        };
        Self::with_sets(
            Some("com.kakao.talk"),
            100,
            vec![VibrationEvent],
            vec![ForegroundServiceStart],
            vec![
                UriPermissionGrant,
                DatabaseInsert,
                PlayerEvent,
                ForegroundServiceStart,
                CameraConnect,
                ActivityRefreshRate,
            ],
        )
    }
}

/// Complete detection configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Weight contributed by each distinct evidence type.
    pub weights: BTreeMap<EventType, f32>,
    /// Evidence types in descending deduplication priority.
    pub dedup_priority: Vec<EventType>,
    pub validation: ValidationConstants,
    pub path_exclusion: PathExclusionConfig,
    pub generic: StrategyOptions,
    pub telegram: StrategyOptions,
    pub kakaotalk: StrategyOptions,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        let weights = BTreeMap::from([
            (EventType::DatabaseInsert, 0.5),
            (EventType::VibrationEvent, 0.4),
            (EventType::PlayerEvent, 0.3),
            (EventType::SilentCameraCapture, 0.4),
            (EventType::UriPermissionGrant, 0.2),
            (EventType::ForegroundServiceStart, 0.15),
            (EventType::CameraConnect, 0.1),
            (EventType::ActivityRefreshRate, 0.05),
        ]);
        Self {
            weights,
            dedup_priority: vec![
                EventType::VibrationEvent,
                EventType::PlayerEvent,
                EventType::UriPermissionGrant,
                EventType::SilentCameraCapture,
                EventType::ForegroundServiceStart,
            ],
            validation: ValidationConstants::default(),
            path_exclusion: PathExclusionConfig::default(),
            generic: StrategyOptions::generic(),
            telegram: StrategyOptions::telegram(),
            kakaotalk: StrategyOptions::kakaotalk(),
        }
    }
}
