//! In-memory parser configuration.
//!
//! Every type here is a plain serde value. `ParserConfig::default()` is the
//! built-in Android dumpstate profile; callers can load a different profile
//! from any source and hand it to [`ParserRegistry::new`](super::ParserRegistry::new).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event_type::EventType;

/// Default maximum accepted log file size (100 MiB).
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 100 * 1024 * 1024;

/// How a section marker is matched against a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MarkerType {
    /// The line contains the marker text.
    #[default]
    Literal,
    /// The marker is a regular expression searched in the line.
    Regex,
}

/// A named region of a log file delimited by start and end markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionDefinition {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub start_marker: String,
    pub end_marker: String,
    #[serde(default)]
    pub marker_type: MarkerType,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// One regex with named groups and the event type it produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinePatternDefinition {
    pub pattern: String,
    pub event_type: EventType,
}

/// A group of line patterns tried together against a set of sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserDefinition {
    pub id: String,
    /// Lower values are tried first.
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub target_sections: Vec<String>,
    pub line_patterns: Vec<LinePatternDefinition>,
}

/// Known multiline pattern variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultilineKind {
    SilentCameraCapture,
    ActivityRefreshRate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultilineDefinition {
    pub id: String,
    pub kind: MultilineKind,
    pub target_section: String,
    /// Lower values are tried first.
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Output ordering of the normalized event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimeSeriesOrder {
    #[default]
    Ascending,
    Descending,
    /// Keep file order.
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalSettings {
    pub skip_empty_lines: bool,
    pub skip_comments: bool,
    pub comment_prefix: String,
    pub time_series_order: TimeSeriesOrder,
    pub max_file_size_bytes: u64,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            skip_empty_lines: true,
            skip_comments: true,
            comment_prefix: "#".to_string(),
            time_series_order: TimeSeriesOrder::Ascending,
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
        }
    }
}

/// What to do when an entry-level problem is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ErrorAction {
    /// Drop silently.
    #[default]
    Skip,
    /// Drop and record the problem in the result's error list.
    Log,
    /// Abort the run with a failed result.
    Throw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ErrorHandlingPolicy {
    pub on_invalid_line: ErrorAction,
    pub on_missing_timestamp: ErrorAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampSettings {
    /// Convert resolved instants to UTC instead of the device's local offset.
    pub normalize_to_utc: bool,
    /// Advance the inferred date when a time-only token goes backwards.
    pub detect_day_rollover: bool,
}

impl Default for TimestampSettings {
    fn default() -> Self {
        Self {
            normalize_to_utc: false,
            detect_day_rollover: true,
        }
    }
}

/// Device constraints this configuration was written for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SupportedDevices {
    #[serde(default)]
    pub min_android_version: Option<u32>,
    #[serde(default)]
    pub max_android_version: Option<u32>,
    /// Empty means any manufacturer.
    #[serde(default)]
    pub manufacturers: Vec<String>,
}

/// Reference information about the device the log was taken from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// `UTC`, `Z`, `+09:00` or `GMT+09:00`.
    pub timezone: String,
    /// Device clock at acquisition time. Falls back to now when unknown.
    #[serde(default)]
    pub current_time: Option<DateTime<Utc>>,
    pub android_version: u32,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub model: String,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            current_time: None,
            android_version: 14,
            manufacturer: String::new(),
            model: String::new(),
        }
    }
}

/// Complete parser configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserConfig {
    pub sections: Vec<SectionDefinition>,
    pub parsers: Vec<ParserDefinition>,
    #[serde(default)]
    pub multiline: Vec<MultilineDefinition>,
    #[serde(default)]
    pub global: GlobalSettings,
    #[serde(default)]
    pub error_handling: ErrorHandlingPolicy,
    #[serde(default)]
    pub timestamps: TimestampSettings,
    #[serde(default)]
    pub supported_devices: SupportedDevices,
}

const fn default_true() -> bool {
    true
}

const AUDIO_TS: &str = r"(?P<timestamp>\d{2}-\d{2} \d{2}:\d{2}:\d{2}[:.]\d{3})";
const FULL_TS: &str = r"(?P<timestamp>\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}(?:\.\d{1,3})?)";

fn dumpsys_section(id: &str, service: &str) -> SectionDefinition {
    SectionDefinition {
        id: id.to_string(),
        name: Some(format!("dumpsys {service}")),
        start_marker: format!("DUMP OF SERVICE {service}:"),
        end_marker: format!("was the duration of dumpsys {service}"),
        marker_type: MarkerType::Literal,
        enabled: true,
    }
}

fn pattern(pattern: String, event_type: EventType) -> LinePatternDefinition {
    LinePatternDefinition {
        pattern,
        event_type,
    }
}

fn parser(
    id: &str,
    priority: i32,
    section: &str,
    line_patterns: Vec<LinePatternDefinition>,
) -> ParserDefinition {
    ParserDefinition {
        id: id.to_string(),
        priority,
        enabled: true,
        target_sections: vec![section.to_string()],
        line_patterns,
    }
}

fn usagestats_pattern(kind: &str, event_type: EventType) -> LinePatternDefinition {
    pattern(
        format!(
            r#"time="{FULL_TS}" type={kind} package=(?P<package>[\w.]+) class=(?P<class>[\w.$]+)"#
        ),
        event_type,
    )
}

impl Default for ParserConfig {
    fn default() -> Self {
        let sections = vec![
            dumpsys_section("audio", "audio"),
            dumpsys_section("vibrator", "vibrator_manager"),
            dumpsys_section("media_provider", "media_provider"),
            dumpsys_section("activity", "activity"),
            dumpsys_section("usagestats", "usagestats"),
            dumpsys_section("camera", "media.camera"),
        ];

        let parsers = vec![
            parser(
                "audio_players",
                10,
                "audio",
                vec![
                    pattern(
                        format!(
                            r"^\s*{AUDIO_TS} new player piid:(?P<piid>\d+) uid/pid:(?P<uid>\d+)/(?P<pid>\d+) type:(?P<player_type>\S+).*?tags=(?P<tags>\S*)"
                        ),
                        EventType::PlayerCreated,
                    ),
                    pattern(
                        format!(r"^\s*{AUDIO_TS} player piid:(?P<piid>\d+) event:(?P<event>\w+)"),
                        EventType::PlayerEvent,
                    ),
                ],
            ),
            parser(
                "vibrations",
                10,
                "vibrator",
                vec![pattern(
                    r"createTime: (?P<timestamp>\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}\.\d{3}).*?status: (?P<status>\w+).*?opPkg: (?P<package>[\w.]+).*?usage: (?P<usage>\w+)(?:.*?hapticType: (?P<hapticType>-?\d+))?"
                        .to_string(),
                    EventType::VibrationEvent,
                )],
            ),
            parser(
                "media_inserts",
                10,
                "media_provider",
                vec![pattern(
                    format!(
                        r"^\s*{FULL_TS} INSERT id=(?P<media_id>\d+) owner=(?P<package>[\w.]+) file_path=(?P<file_path>\S+)"
                    ),
                    EventType::DatabaseInsert,
                )],
            ),
            parser(
                "uri_grants",
                10,
                "activity",
                vec![pattern(
                    format!(
                        r"^\s*{FULL_TS} Granting uri permission: uri=(?P<uri>\S+) pkg=(?P<package>[\w.]+)"
                    ),
                    EventType::UriPermissionGrant,
                )],
            ),
            parser(
                "usage_events",
                20,
                "usagestats",
                vec![
                    usagestats_pattern("ACTIVITY_RESUMED", EventType::ActivityResumed),
                    usagestats_pattern("ACTIVITY_PAUSED", EventType::ActivityPaused),
                    usagestats_pattern(
                        "FOREGROUND_SERVICE_START",
                        EventType::ForegroundServiceStart,
                    ),
                    usagestats_pattern("FOREGROUND_SERVICE_STOP", EventType::ForegroundServiceStop),
                ],
            ),
            parser(
                "camera_clients",
                30,
                "camera",
                vec![
                    pattern(
                        r"^\s*(?P<timestamp>\d{2}-\d{2} \d{2}:\d{2}:\d{2}) : CONNECT device (?P<camera_id>\d+) client for package (?P<package>[\w.]+) \(PID (?P<pid>\d+)\)"
                            .to_string(),
                        EventType::CameraConnect,
                    ),
                    pattern(
                        r"^\s*(?P<timestamp>\d{2}-\d{2} \d{2}:\d{2}:\d{2}) : DISCONNECT device (?P<camera_id>\d+) client for package (?P<package>[\w.]+) \(PID (?P<pid>\d+)\)"
                            .to_string(),
                        EventType::CameraDisconnect,
                    ),
                ],
            ),
        ];

        let multiline = vec![
            MultilineDefinition {
                id: "silent_camera_capture".to_string(),
                kind: MultilineKind::SilentCameraCapture,
                target_section: "audio".to_string(),
                priority: 10,
                enabled: true,
            },
            MultilineDefinition {
                id: "activity_refresh_rate".to_string(),
                kind: MultilineKind::ActivityRefreshRate,
                target_section: "activity".to_string(),
                priority: 20,
                enabled: true,
            },
        ];

        Self {
            sections,
            parsers,
            multiline,
            global: GlobalSettings::default(),
            error_handling: ErrorHandlingPolicy::default(),
            timestamps: TimestampSettings::default(),
            supported_devices: SupportedDevices {
                min_android_version: Some(10),
                max_android_version: None,
                manufacturers: Vec::new(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_parsers_target_known_sections() {
        let config = ParserConfig::default();
        let ids: Vec<&str> = config.sections.iter().map(|s| s.id.as_str()).collect();
        for parser in &config.parsers {
            for target in &parser.target_sections {
                assert!(ids.contains(&target.as_str()), "unknown section {target}");
            }
        }
        for def in &config.multiline {
            assert!(ids.contains(&def.target_section.as_str()));
        }
    }

    #[test]
    fn config_serde_roundtrip() {
        let config = ParserConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: ParserConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn minimal_config_fills_defaults() {
        let json = r#"{
            "sections": [{"id": "s", "start_marker": "BEGIN", "end_marker": "END"}],
            "parsers": []
        }"#;
        let config: ParserConfig = serde_json::from_str(json).unwrap();
        assert!(config.sections[0].enabled);
        assert_eq!(config.sections[0].marker_type, MarkerType::Literal);
        assert_eq!(config.error_handling.on_invalid_line, ErrorAction::Skip);
        assert_eq!(config.global.time_series_order, TimeSeriesOrder::Ascending);
    }
}
