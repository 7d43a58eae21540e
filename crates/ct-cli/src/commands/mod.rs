//! CLI subcommand implementations.

pub mod detect;
pub mod parse;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, FixedOffset};
use ct_core::parsing::{LogParsingOrchestrator, ParseOptions, ParserRegistry, ParsingResult};

use crate::Config;

/// Parses `path` with the configured profile.
///
/// Fatal parse errors become an `Err`; per-line errors stay in the result.
pub fn parse_log(path: &Path, options: &ParseOptions, config: &Config) -> Result<ParsingResult> {
    let registry =
        Arc::new(ParserRegistry::new(config.parser.clone()).context("invalid parser configuration")?);
    let orchestrator = LogParsingOrchestrator::new(registry, &config.device)
        .context("failed to set up log parser")?;

    let mut result = orchestrator.parse_file(path, options);
    if !result.success {
        let err = result
            .errors
            .pop()
            .map_or_else(|| anyhow!("parse aborted"), anyhow::Error::from);
        return Err(err.context(format!("failed to parse {}", path.display())));
    }
    for err in &result.errors {
        tracing::debug!(error = %err, "recoverable parse error");
    }
    Ok(result)
}

/// Parses an RFC 3339 timestamp given on the command line.
pub fn parse_time_arg(value: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("invalid timestamp {value:?}, expected RFC 3339"))
}
