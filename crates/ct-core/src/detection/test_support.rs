//! Event and session builders shared by the detection tests.

use chrono::{DateTime, Duration, FixedOffset, TimeZone};

use super::context::{CaptureSession, ForegroundServiceInfo, SessionContext};
use crate::event::{FieldValue, Fields, NormalizedLogEvent};
use crate::event_type::EventType;
use crate::types::{EventId, SessionId};

pub fn base() -> DateTime<FixedOffset> {
    FixedOffset::east_opt(9 * 3600)
        .unwrap()
        .with_ymd_and_hms(2025, 1, 15, 14, 0, 0)
        .unwrap()
}

pub fn at_ms(ms: i64) -> DateTime<FixedOffset> {
    base() + Duration::milliseconds(ms)
}

pub struct EventBuilder {
    event: NormalizedLogEvent,
}

impl EventBuilder {
    pub fn new(id: &str, ms: i64, event_type: EventType) -> Self {
        Self {
            event: NormalizedLogEvent {
                event_id: EventId::new(id).unwrap(),
                timestamp: at_ms(ms),
                event_type,
                source_section: "test".into(),
                source_file_name: "dumpstate.txt".into(),
                package_name: None,
                attributes: Fields::new(),
                raw_line: String::new(),
            },
        }
    }

    pub fn package(mut self, package: &str) -> Self {
        self.event.package_name = Some(package.to_string());
        self
    }

    pub fn attr(mut self, key: &str, value: impl Into<FieldValue>) -> Self {
        self.event.attributes.insert(key.to_string(), value.into());
        self
    }

    pub fn build(self) -> NormalizedLogEvent {
        self.event
    }
}

pub fn vibration(id: &str, ms: i64, haptic: i64, status: &str) -> NormalizedLogEvent {
    EventBuilder::new(id, ms, EventType::VibrationEvent)
        .attr("hapticType", haptic)
        .attr("status", status)
        .build()
}

pub fn uri_grant(id: &str, ms: i64, uri: &str) -> NormalizedLogEvent {
    EventBuilder::new(id, ms, EventType::UriPermissionGrant)
        .attr("uri", uri)
        .build()
}

pub fn db_insert(id: &str, ms: i64, path: &str) -> NormalizedLogEvent {
    EventBuilder::new(id, ms, EventType::DatabaseInsert)
        .attr("file_path", path)
        .build()
}

pub fn service_start(id: &str, ms: i64, class: &str) -> NormalizedLogEvent {
    EventBuilder::new(id, ms, EventType::ForegroundServiceStart)
        .attr("class", class)
        .build()
}

/// Session spanning one minute before and ten minutes after `base()`.
pub fn context(package: &str, events: Vec<NormalizedLogEvent>) -> SessionContext {
    context_with_services(package, events, Vec::new())
}

pub fn context_with_services(
    package: &str,
    events: Vec<NormalizedLogEvent>,
    services: Vec<ForegroundServiceInfo>,
) -> SessionContext {
    let session = CaptureSession {
        id: SessionId::new("session-1").unwrap(),
        package_name: package.to_string(),
        start_time: at_ms(-60_000),
        end_time: at_ms(600_000),
    };
    SessionContext::from_events(session, &events, services)
}
