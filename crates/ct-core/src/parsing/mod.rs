//! Log ingestion and normalization pipeline.
//!
//! Raw dumpstate text is split into sections, each section is parsed
//! (multiline patterns first, then line parsers by priority), every entry's
//! timestamp is resolved against the device clock, and the resulting events
//! are sorted.

pub mod config;
mod error;
mod line_parser;
mod multiline;
mod orchestrator;
mod registry;
mod section;
mod timestamp;

pub use config::{
    DeviceInfo, ErrorAction, ErrorHandlingPolicy, GlobalSettings, LinePatternDefinition,
    MarkerType, MultilineDefinition, MultilineKind, ParserConfig, ParserDefinition,
    SectionDefinition, SupportedDevices, TimeSeriesOrder, TimestampSettings,
};
pub use error::{ConfigError, ParseError};
pub use line_parser::{LineContext, LineParser, LinePattern};
pub use multiline::{
    ActivityRefreshRateParser, MultilineMatch, MultilinePatternParser, SilentCameraCaptureParser,
};
pub use orchestrator::{
    CancellationFlag, LogParsingOrchestrator, ParseOptions, ParsingResult, ParsingStatistics,
    check_device_compatibility,
};
pub use registry::ParserRegistry;
pub use section::{LogSection, SectionSplitter};
pub use timestamp::{TimestampError, TimestampNormalizer, parse_timezone};
