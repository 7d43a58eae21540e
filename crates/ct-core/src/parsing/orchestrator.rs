//! Parsing pipeline: split → parse → normalize → sort → statistics.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use super::config::{DeviceInfo, ErrorAction, SupportedDevices, TimeSeriesOrder};
use super::error::ParseError;
use super::line_parser::LineContext;
use super::registry::ParserRegistry;
use super::section::LogSection;
use super::timestamp::TimestampNormalizer;
use crate::event::{FieldValue, NormalizedLogEvent, ParsedLogEntry};
use crate::event_type::EventType;
use crate::types::EventId;

/// Cooperative cancellation shared between a caller and a running parse.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Per-run options.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Events before this instant are dropped.
    pub start_time: Option<DateTime<FixedOffset>>,
    /// Events after this instant are dropped.
    pub end_time: Option<DateTime<FixedOffset>>,
    pub cancellation: CancellationFlag,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ParsingStatistics {
    pub total_lines: usize,
    /// Lines that produced an entry (multiline matches count every line).
    pub parsed_lines: usize,
    pub skipped_lines: usize,
    pub error_lines: usize,
    /// Entries dropped by the start/end time range.
    pub filtered_entries: usize,
    pub elapsed: Duration,
    pub event_type_counts: BTreeMap<EventType, usize>,
    pub section_line_counts: BTreeMap<String, usize>,
}

/// Outcome of one parse run.
#[derive(Debug, Default)]
pub struct ParsingResult {
    pub success: bool,
    pub events: Vec<NormalizedLogEvent>,
    pub statistics: ParsingStatistics,
    /// Non-fatal problems, plus the fatal one last when `success` is false.
    pub errors: Vec<ParseError>,
}

impl ParsingResult {
    fn failed(error: ParseError, elapsed: Duration) -> Self {
        Self {
            success: false,
            events: Vec::new(),
            statistics: ParsingStatistics {
                elapsed,
                ..ParsingStatistics::default()
            },
            errors: vec![error],
        }
    }

    /// The error that aborted the run, if any.
    pub fn fatal_error(&self) -> Option<&ParseError> {
        if self.success {
            None
        } else {
            self.errors.last()
        }
    }
}

/// Checks a device against the configuration's declared support.
pub fn check_device_compatibility(
    supported: &SupportedDevices,
    device: &DeviceInfo,
) -> Result<(), ParseError> {
    if let Some(min) = supported.min_android_version {
        if device.android_version < min {
            return Err(ParseError::DeviceIncompatible {
                reason: format!(
                    "Android {} is older than the minimum supported version {min}",
                    device.android_version
                ),
            });
        }
    }
    if let Some(max) = supported.max_android_version {
        if device.android_version > max {
            return Err(ParseError::DeviceIncompatible {
                reason: format!(
                    "Android {} is newer than the maximum supported version {max}",
                    device.android_version
                ),
            });
        }
    }
    if !supported.manufacturers.is_empty()
        && !supported
            .manufacturers
            .iter()
            .any(|m| m.eq_ignore_ascii_case(&device.manufacturer))
    {
        return Err(ParseError::DeviceIncompatible {
            reason: format!("manufacturer {:?} is not supported", device.manufacturer),
        });
    }
    Ok(())
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

fn check_size(path: &Path, size: u64, max: u64) -> Result<(), ParseError> {
    if size > max {
        return Err(ParseError::FileTooLarge {
            path: path.to_path_buf(),
            size,
            max,
        });
    }
    Ok(())
}

fn map_not_found(path: &Path, e: std::io::Error) -> ParseError {
    if e.kind() == std::io::ErrorKind::NotFound {
        ParseError::FileNotFound {
            path: path.to_path_buf(),
        }
    } else {
        ParseError::Io(e)
    }
}

/// Mutable bookkeeping for one run.
struct RunState<'a> {
    options: &'a ParseOptions,
    stats: ParsingStatistics,
    errors: Vec<ParseError>,
}

impl RunState<'_> {
    fn check_cancelled(&self) -> Result<(), ParseError> {
        if self.options.cancellation.is_cancelled() {
            return Err(ParseError::Cancelled);
        }
        Ok(())
    }

    /// Applies an error policy to an entry-level problem.
    fn apply(&mut self, action: ErrorAction, error: ParseError) -> Result<(), ParseError> {
        match action {
            ErrorAction::Skip => {
                self.stats.skipped_lines += 1;
                Ok(())
            }
            ErrorAction::Log => {
                tracing::warn!(error = %error, "dropping log entry");
                self.stats.error_lines += 1;
                self.errors.push(error);
                Ok(())
            }
            ErrorAction::Throw => Err(error),
        }
    }
}

/// Runs the full parsing pipeline for one device.
///
/// Construction validates the device against the configuration; a parser
/// for an incompatible device is never built.
#[derive(Debug, Clone)]
pub struct LogParsingOrchestrator {
    registry: Arc<ParserRegistry>,
    normalizer: TimestampNormalizer,
}

impl LogParsingOrchestrator {
    pub fn new(registry: Arc<ParserRegistry>, device: &DeviceInfo) -> Result<Self, ParseError> {
        check_device_compatibility(&registry.config().supported_devices, device)?;
        let normalizer = TimestampNormalizer::new(device, registry.config().timestamps)?;
        Ok(Self {
            registry,
            normalizer,
        })
    }

    /// Reads and parses a log file synchronously.
    pub fn parse_file(&self, path: &Path, options: &ParseOptions) -> ParsingResult {
        let started = Instant::now();
        match self.read_file(path, options) {
            Ok(content) => self.parse_content(&source_name(path), &content, options),
            Err(e) => ParsingResult::failed(e, started.elapsed()),
        }
    }

    /// Reads the file on the async runtime, then parses synchronously.
    pub async fn parse_file_async(&self, path: &Path, options: &ParseOptions) -> ParsingResult {
        let started = Instant::now();
        match self.read_file_async(path, options).await {
            Ok(content) => self.parse_content(&source_name(path), &content, options),
            Err(e) => ParsingResult::failed(e, started.elapsed()),
        }
    }

    fn read_file(&self, path: &Path, options: &ParseOptions) -> Result<String, ParseError> {
        let metadata = std::fs::metadata(path).map_err(|e| map_not_found(path, e))?;
        check_size(path, metadata.len(), self.max_file_size())?;
        if options.cancellation.is_cancelled() {
            return Err(ParseError::Cancelled);
        }
        let bytes = std::fs::read(path).map_err(|e| map_not_found(path, e))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn read_file_async(
        &self,
        path: &Path,
        options: &ParseOptions,
    ) -> Result<String, ParseError> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| map_not_found(path, e))?;
        check_size(path, metadata.len(), self.max_file_size())?;
        if options.cancellation.is_cancelled() {
            return Err(ParseError::Cancelled);
        }
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| map_not_found(path, e))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn max_file_size(&self) -> u64 {
        self.registry.config().global.max_file_size_bytes
    }

    /// Parses already-loaded log text.
    pub fn parse_content(
        &self,
        source_name: &str,
        content: &str,
        options: &ParseOptions,
    ) -> ParsingResult {
        let started = Instant::now();
        let mut state = RunState {
            options,
            stats: ParsingStatistics {
                total_lines: content.lines().count(),
                ..ParsingStatistics::default()
            },
            errors: Vec::new(),
        };

        let outcome = self.run(source_name, content, &mut state);
        let RunState {
            mut stats,
            mut errors,
            ..
        } = state;
        stats.elapsed = started.elapsed();

        match outcome {
            Ok(events) => {
                for event in &events {
                    *stats.event_type_counts.entry(event.event_type).or_insert(0) += 1;
                }
                tracing::debug!(
                    source = source_name,
                    events = events.len(),
                    parsed_lines = stats.parsed_lines,
                    skipped_lines = stats.skipped_lines,
                    error_lines = stats.error_lines,
                    "parsed log"
                );
                ParsingResult {
                    success: true,
                    events,
                    statistics: stats,
                    errors,
                }
            }
            Err(e) => {
                tracing::warn!(source = source_name, error = %e, "parse aborted");
                errors.push(e);
                ParsingResult {
                    success: false,
                    events: Vec::new(),
                    statistics: stats,
                    errors,
                }
            }
        }
    }

    fn run(
        &self,
        source_name: &str,
        content: &str,
        state: &mut RunState<'_>,
    ) -> Result<Vec<NormalizedLogEvent>, ParseError> {
        state.check_cancelled()?;
        let sections = self.registry.splitter().split(content);

        let mut events = Vec::new();
        for section in &sections {
            state.check_cancelled()?;
            state
                .stats
                .section_line_counts
                .insert(section.id.clone(), section.lines.len());

            let entries = self.parse_section(section, state)?;
            self.normalize_section(source_name, entries, state, &mut events)?;
        }

        match self.registry.config().global.time_series_order {
            TimeSeriesOrder::Ascending => events.sort_by_key(|e| e.timestamp),
            TimeSeriesOrder::Descending => {
                events.sort_by_key(|e| std::cmp::Reverse(e.timestamp));
            }
            TimeSeriesOrder::None => {}
        }
        Ok(events)
    }

    /// Multiline parsers first, then line parsers by priority; first match wins.
    fn parse_section(
        &self,
        section: &LogSection,
        state: &mut RunState<'_>,
    ) -> Result<Vec<ParsedLogEntry>, ParseError> {
        let config = self.registry.config();
        let global = &config.global;
        let multiline: Vec<_> = self.registry.multiline_parsers_for(&section.id).collect();
        let parsers: Vec<_> = self.registry.line_parsers_for(&section.id).collect();

        let mut entries = Vec::new();
        let mut index = 0;
        while index < section.lines.len() {
            state.check_cancelled()?;
            let line = &section.lines[index];
            let trimmed = line.trim();

            let is_empty = global.skip_empty_lines && trimmed.is_empty();
            let is_comment = global.skip_comments
                && !global.comment_prefix.is_empty()
                && trimmed.starts_with(global.comment_prefix.as_str());
            if is_empty || is_comment {
                state.stats.skipped_lines += 1;
                index += 1;
                continue;
            }

            if let Some(m) = multiline.iter().find_map(|p| p.try_parse(section, index)) {
                let consumed = m.lines_consumed.max(1);
                state.stats.parsed_lines += consumed;
                entries.push(m.entry);
                index += consumed;
                continue;
            }

            let ctx = LineContext {
                section_id: &section.id,
                line_number: section.line_number(index),
            };
            if let Some(entry) = parsers.iter().find_map(|p| p.parse(line, ctx)) {
                state.stats.parsed_lines += 1;
                entries.push(entry);
            } else {
                state.apply(
                    config.error_handling.on_invalid_line,
                    ParseError::LineParseMismatch {
                        section: section.id.clone(),
                        line_number: ctx.line_number,
                    },
                )?;
            }
            index += 1;
        }
        Ok(entries)
    }

    fn normalize_section(
        &self,
        source_name: &str,
        entries: Vec<ParsedLogEntry>,
        state: &mut RunState<'_>,
        out: &mut Vec<NormalizedLogEvent>,
    ) -> Result<(), ParseError> {
        let policy = self.registry.config().error_handling.on_missing_timestamp;
        let mut normalizer = self.normalizer.clone();
        normalizer.reset();

        for entry in entries {
            let Some(token) = entry.raw_timestamp_token.as_deref() else {
                state.apply(
                    policy,
                    ParseError::TimestampMissing {
                        section: entry.section_id.clone(),
                        line_number: entry.line_number,
                    },
                )?;
                continue;
            };

            let timestamp = match normalizer.normalize(token) {
                Ok(ts) => ts,
                Err(e) => {
                    tracing::warn!(
                        section = %entry.section_id,
                        line = entry.line_number,
                        error = %e,
                        "timestamp normalization failed"
                    );
                    state.stats.error_lines += 1;
                    state.errors.push(ParseError::NormalizationFailure {
                        section: entry.section_id.clone(),
                        line_number: entry.line_number,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let before_start = state.options.start_time.is_some_and(|start| timestamp < start);
            let after_end = state.options.end_time.is_some_and(|end| timestamp > end);
            if before_start || after_end {
                state.stats.filtered_entries += 1;
                continue;
            }

            out.push(into_event(entry, timestamp, source_name));
        }
        Ok(())
    }
}

fn into_event(
    entry: ParsedLogEntry,
    timestamp: DateTime<FixedOffset>,
    source_name: &str,
) -> NormalizedLogEvent {
    let package_name = entry
        .fields
        .get("package")
        .and_then(FieldValue::as_str)
        .map(str::to_string);
    let mut attributes = entry.fields;
    attributes.insert(
        "line_number".to_string(),
        FieldValue::Int(i64::try_from(entry.line_number).unwrap_or(i64::MAX)),
    );

    NormalizedLogEvent {
        event_id: EventId::generate(),
        timestamp,
        event_type: entry.event_type,
        source_section: entry.section_id,
        source_file_name: source_name.to_string(),
        package_name,
        attributes,
        raw_line: entry.raw_line,
    }
}
