//! Event type enum as the single source of truth for event type strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical event types produced by the log parsers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventType {
    /// A new row in the media provider database.
    DatabaseInsert,
    VibrationEvent,
    /// An audio player was created (carries its `piid` and attribute tags).
    PlayerCreated,
    /// A lifecycle event (`started`, `stopped`, ...) for an audio player.
    PlayerEvent,
    UriPermissionGrant,
    /// Muted camera shutter playback, recognised across several audio lines.
    SilentCameraCapture,
    ForegroundServiceStart,
    ForegroundServiceStop,
    ActivityResumed,
    ActivityPaused,
    ActivityRefreshRate,
    CameraConnect,
    CameraDisconnect,
}

impl EventType {
    pub const ALL: [Self; 13] = [
        Self::DatabaseInsert,
        Self::VibrationEvent,
        Self::PlayerCreated,
        Self::PlayerEvent,
        Self::UriPermissionGrant,
        Self::SilentCameraCapture,
        Self::ForegroundServiceStart,
        Self::ForegroundServiceStop,
        Self::ActivityResumed,
        Self::ActivityPaused,
        Self::ActivityRefreshRate,
        Self::CameraConnect,
        Self::CameraDisconnect,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DatabaseInsert => "DATABASE_INSERT",
            Self::VibrationEvent => "VIBRATION_EVENT",
            Self::PlayerCreated => "PLAYER_CREATED",
            Self::PlayerEvent => "PLAYER_EVENT",
            Self::UriPermissionGrant => "URI_PERMISSION_GRANT",
            Self::SilentCameraCapture => "SILENT_CAMERA_CAPTURE",
            Self::ForegroundServiceStart => "FOREGROUND_SERVICE_START",
            Self::ForegroundServiceStop => "FOREGROUND_SERVICE_STOP",
            Self::ActivityResumed => "ACTIVITY_RESUMED",
            Self::ActivityPaused => "ACTIVITY_PAUSED",
            Self::ActivityRefreshRate => "ACTIVITY_REFRESH_RATE",
            Self::CameraConnect => "CAMERA_CONNECT",
            Self::CameraDisconnect => "CAMERA_DISCONNECT",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DATABASE_INSERT" => Ok(Self::DatabaseInsert),
            "VIBRATION_EVENT" => Ok(Self::VibrationEvent),
            "PLAYER_CREATED" => Ok(Self::PlayerCreated),
            "PLAYER_EVENT" => Ok(Self::PlayerEvent),
            "URI_PERMISSION_GRANT" => Ok(Self::UriPermissionGrant),
            "SILENT_CAMERA_CAPTURE" => Ok(Self::SilentCameraCapture),
            // Older profiles used the bare name for the start event
            "FOREGROUND_SERVICE_START" | "FOREGROUND_SERVICE" => Ok(Self::ForegroundServiceStart),
            "FOREGROUND_SERVICE_STOP" => Ok(Self::ForegroundServiceStop),
            "ACTIVITY_RESUMED" => Ok(Self::ActivityResumed),
            "ACTIVITY_PAUSED" => Ok(Self::ActivityPaused),
            "ACTIVITY_REFRESH_RATE" => Ok(Self::ActivityRefreshRate),
            "CAMERA_CONNECT" => Ok(Self::CameraConnect),
            "CAMERA_DISCONNECT" => Ok(Self::CameraDisconnect),
            _ => Err(UnknownEventType(s.to_string())),
        }
    }
}

impl Serialize for EventType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Error type for unknown event type strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEventType(String);

impl fmt::Display for UnknownEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown event type: {}", self.0)
    }
}

impl std::error::Error for UnknownEventType {}
