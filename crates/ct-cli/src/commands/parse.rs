//! `ct parse`: print the normalized event timeline of a log file.

use std::fmt::Write as _;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use ct_core::NormalizedLogEvent;
use ct_core::parsing::{ParseOptions, ParsingResult, ParsingStatistics};
use serde::Serialize;

use super::{parse_log, parse_time_arg};
use crate::Config;

#[derive(Debug, Args)]
pub struct ParseArgs {
    /// Dumpstate or bugreport text file.
    pub log: PathBuf,
    /// Drop events before this RFC 3339 timestamp.
    #[arg(long)]
    pub start: Option<String>,
    /// Drop events after this RFC 3339 timestamp.
    #[arg(long)]
    pub end: Option<String>,
    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct ParseReport<'a> {
    statistics: &'a ParsingStatistics,
    errors: Vec<String>,
    events: &'a [NormalizedLogEvent],
}

pub fn run<W: Write>(writer: &mut W, args: &ParseArgs, config: &Config) -> Result<()> {
    let options = ParseOptions {
        start_time: args.start.as_deref().map(parse_time_arg).transpose()?,
        end_time: args.end.as_deref().map(parse_time_arg).transpose()?,
        ..ParseOptions::default()
    };
    let result = parse_log(&args.log, &options, config)?;

    if args.json {
        let report = ParseReport {
            statistics: &result.statistics,
            errors: result.errors.iter().map(ToString::to_string).collect(),
            events: &result.events,
        };
        serde_json::to_writer_pretty(&mut *writer, &report)?;
        writeln!(writer)?;
    } else {
        let source = args
            .log
            .file_name()
            .map_or_else(|| args.log.display().to_string(), |n| n.to_string_lossy().into_owned());
        write!(writer, "{}", format_timeline(&source, &result))?;
    }
    Ok(())
}

pub fn format_event_line(event: &NormalizedLogEvent) -> String {
    format!(
        "{}  {:<24}  {:<14}  {}",
        event.timestamp.format("%Y-%m-%d %H:%M:%S%.3f %:z"),
        event.event_type.as_str(),
        event.source_section,
        event.package_name.as_deref().unwrap_or("-"),
    )
}

/// Human-readable summary line plus one line per event.
pub fn format_timeline(source: &str, result: &ParsingResult) -> String {
    let stats = &result.statistics;
    let mut output = String::new();
    writeln!(
        output,
        "{source}: {} events, {} of {} lines parsed, {} skipped, {} errors",
        result.events.len(),
        stats.parsed_lines,
        stats.total_lines,
        stats.skipped_lines,
        stats.error_lines,
    )
    .unwrap();
    if stats.filtered_entries > 0 {
        writeln!(output, "{} events outside the time range", stats.filtered_entries).unwrap();
    }
    if result.events.is_empty() {
        return output;
    }
    writeln!(output).unwrap();
    for event in &result.events {
        writeln!(output, "{}", format_event_line(event)).unwrap();
    }
    output
}
