//! Parsing error taxonomy.

use std::path::PathBuf;

use thiserror::Error;

use crate::event_type::UnknownEventType;

/// Problems found while building the parser tables from configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid regex in {owner}: {source}")]
    InvalidPattern {
        owner: String,
        #[source]
        source: regex::Error,
    },
    #[error("duplicate {kind} id: {id}")]
    DuplicateId { kind: &'static str, id: String },
    #[error("{owner} targets unknown section {section}")]
    UnknownSection { owner: String, section: String },
    #[error("empty marker in section {section}")]
    EmptyMarker { section: String },
    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),
    #[error(transparent)]
    UnknownEventType(#[from] UnknownEventType),
}

/// Errors raised while parsing a log file.
///
/// File-level variants abort the run; entry-level variants are collected in
/// [`ParsingResult::errors`](super::ParsingResult) according to the configured
/// policy.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("log file not found: {}", path.display())]
    FileNotFound { path: PathBuf },
    #[error("log file {} is {size} bytes, limit is {max}", path.display())]
    FileTooLarge { path: PathBuf, size: u64, max: u64 },
    #[error("device incompatible with parser configuration: {reason}")]
    DeviceIncompatible { reason: String },
    #[error("parsing cancelled")]
    Cancelled,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("line {line_number} in section {section}: no parser matched")]
    LineParseMismatch { section: String, line_number: usize },
    #[error("line {line_number} in section {section}: missing timestamp")]
    TimestampMissing { section: String, line_number: usize },
    #[error("line {line_number} in section {section}: {reason}")]
    NormalizationFailure {
        section: String,
        line_number: usize,
        reason: String,
    },
}

impl ParseError {
    /// Whether this error aborts a parse run.
    pub const fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::LineParseMismatch { .. }
                | Self::TimestampMissing { .. }
                | Self::NormalizationFailure { .. }
        )
    }
}
