//! Camera capture detection over normalized events.
//!
//! Each session is handed to the strategy registered for its package (or the
//! generic one), which picks key artifacts, gathers supporting evidence in a
//! correlation window, scores the result and deduplicates nearby captures.

mod capture;
mod confidence;
pub mod config;
mod context;
mod dedup;
mod dispatcher;
mod generic;
mod kakaotalk;
mod strategy;
mod telegram;
mod validators;

#[cfg(test)]
mod test_support;

pub use capture::CameraCaptureEvent;
pub use confidence::ConfidenceCalculator;
pub use config::{
    DetectionConfig, DetectionConfigError, PathExclusionConfig, StrategyOptions,
    ValidationConstants,
};
pub use context::{
    CaptureSession, ForegroundServiceInfo, SessionContext, foreground_services_from_events,
};
pub use dedup::Deduplicator;
pub use dispatcher::{CaptureDetectionEngine, SessionCaptures, Strategy, StrategyDispatcher};
pub use generic::GenericStrategy;
pub use kakaotalk::KakaoTalkStrategy;
pub use strategy::{CaptureDetectionStrategy, KeyArtifact, KeyTier};
pub use telegram::TelegramStrategy;
pub use validators::{
    PathRules, is_camera_player_start, is_service_start, is_shutter_vibration, is_temp_uri_grant,
};
