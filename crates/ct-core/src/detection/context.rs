//! Per-session evidence scope handed to strategies.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::event::NormalizedLogEvent;
use crate::event_type::EventType;
use crate::types::SessionId;

/// A time window during which one app held the foreground.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureSession {
    pub id: SessionId,
    pub package_name: String,
    pub start_time: DateTime<FixedOffset>,
    pub end_time: DateTime<FixedOffset>,
}

impl CaptureSession {
    /// Inclusive on both ends.
    pub fn contains(&self, at: DateTime<FixedOffset>) -> bool {
        self.start_time <= at && at <= self.end_time
    }
}

/// Start/stop interval of one foreground service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForegroundServiceInfo {
    pub service_class: String,
    pub start_time: DateTime<FixedOffset>,
    /// `None` while the service was still running at the end of the log.
    #[serde(default)]
    pub stop_time: Option<DateTime<FixedOffset>>,
}

impl ForegroundServiceInfo {
    pub fn is_active_at(&self, at: DateTime<FixedOffset>) -> bool {
        self.start_time <= at && self.stop_time.is_none_or(|stop| at <= stop)
    }
}

/// Pairs `FOREGROUND_SERVICE_START` and `FOREGROUND_SERVICE_STOP` events by
/// service class.
///
/// Events must be sorted by timestamp. A stop with no open start is ignored;
/// a start with no later stop stays open.
pub fn foreground_services_from_events(events: &[NormalizedLogEvent]) -> Vec<ForegroundServiceInfo> {
    let mut services: Vec<ForegroundServiceInfo> = Vec::new();
    for event in events {
        let Some(class) = event.attr_str("class") else {
            continue;
        };
        match event.event_type {
            EventType::ForegroundServiceStart => services.push(ForegroundServiceInfo {
                service_class: class.to_string(),
                start_time: event.timestamp,
                stop_time: None,
            }),
            EventType::ForegroundServiceStop => {
                if let Some(open) = services
                    .iter_mut()
                    .rev()
                    .find(|s| s.service_class == class && s.stop_time.is_none())
                {
                    open.stop_time = Some(event.timestamp);
                }
            }
            _ => {}
        }
    }
    services
}

/// Everything a strategy may look at while detecting captures in a session.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session: CaptureSession,
    /// Events inside the session window, sorted by timestamp.
    pub all_events: Vec<NormalizedLogEvent>,
    pub foreground_services: Vec<ForegroundServiceInfo>,
    pub activity_resumed_time: Option<DateTime<FixedOffset>>,
    pub activity_paused_time: Option<DateTime<FixedOffset>>,
}

impl SessionContext {
    /// Scopes a full event stream to the session window.
    ///
    /// Resume/pause times are taken from the session package's own activity
    /// events: the first resume and the last pause inside the window.
    pub fn from_events(
        session: CaptureSession,
        events: &[NormalizedLogEvent],
        foreground_services: Vec<ForegroundServiceInfo>,
    ) -> Self {
        let mut all_events: Vec<NormalizedLogEvent> = events
            .iter()
            .filter(|e| session.contains(e.timestamp))
            .cloned()
            .collect();
        all_events.sort_by_key(|e| e.timestamp);

        let package = session.package_name.as_str();
        let own_activity = |kind: EventType| -> Vec<DateTime<FixedOffset>> {
            all_events
                .iter()
                .filter(|e| e.event_type == kind && e.package_name.as_deref() == Some(package))
                .map(|e| e.timestamp)
                .collect()
        };
        let activity_resumed_time = own_activity(EventType::ActivityResumed).first().copied();
        let activity_paused_time = own_activity(EventType::ActivityPaused).last().copied();

        Self {
            session,
            all_events,
            foreground_services,
            activity_resumed_time,
            activity_paused_time,
        }
    }

    pub fn events_of(&self, event_type: EventType) -> impl Iterator<Item = &NormalizedLogEvent> {
        self.all_events
            .iter()
            .filter(move |e| e.event_type == event_type)
    }
}
