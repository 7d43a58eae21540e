//! Core logic for camera capture forensics on Android debug logs.
//!
//! This crate contains:
//! - Parsing: splitting dumpstate output into sections and turning matched
//!   lines into timestamped, typed events
//! - Detection: inferring camera captures per foreground session with
//!   package-specific strategies

pub mod detection;
pub mod event;
pub mod event_type;
pub mod parsing;
pub mod types;

pub use detection::{
    CameraCaptureEvent, CaptureDetectionEngine, CaptureSession, DetectionConfig,
    ForegroundServiceInfo, SessionCaptures, SessionContext,
};
pub use event::{FieldValue, Fields, NormalizedLogEvent, ParsedLogEntry};
pub use event_type::{EventType, UnknownEventType};
pub use parsing::{
    CancellationFlag, DeviceInfo, LogParsingOrchestrator, ParseError, ParseOptions, ParserConfig,
    ParserRegistry, ParsingResult, ParsingStatistics,
};
pub use types::{CaptureId, Confidence, EventId, SessionId, ValidationError};
