//! `ct detect`: infer camera captures for a set of foreground sessions.

use std::fmt::Write as _;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use ct_core::detection::{
    CameraCaptureEvent, CaptureDetectionEngine, CaptureSession, ForegroundServiceInfo,
    SessionCaptures, SessionContext, foreground_services_from_events,
};
use ct_core::parsing::ParseOptions;
use serde::Deserialize;

use super::parse_log;
use crate::Config;

#[derive(Debug, Args)]
pub struct DetectArgs {
    /// Dumpstate or bugreport text file.
    pub log: PathBuf,
    /// JSON array of sessions: id, package_name, start_time, end_time and
    /// optionally foreground_services.
    #[arg(long)]
    pub sessions: PathBuf,
    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

/// One entry of the sessions file.
#[derive(Debug, Deserialize)]
struct SessionSpec {
    #[serde(flatten)]
    session: CaptureSession,
    /// Taken from the log's own service events when absent.
    #[serde(default)]
    foreground_services: Option<Vec<ForegroundServiceInfo>>,
}

fn read_sessions(path: &Path) -> Result<Vec<SessionSpec>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid sessions file {}", path.display()))
}

pub fn run<W: Write>(writer: &mut W, args: &DetectArgs, config: &Config) -> Result<()> {
    let specs = read_sessions(&args.sessions)?;
    let engine =
        CaptureDetectionEngine::new(&config.detection).context("invalid detection configuration")?;
    let result = parse_log(&args.log, &ParseOptions::default(), config)?;

    let log_services = foreground_services_from_events(&result.events);
    let contexts: Vec<SessionContext> = specs
        .into_iter()
        .map(|spec| {
            let services = spec
                .foreground_services
                .unwrap_or_else(|| log_services.clone());
            SessionContext::from_events(spec.session, &result.events, services)
        })
        .collect();

    let detected = engine.detect_sessions(&contexts);

    if args.json {
        serde_json::to_writer_pretty(&mut *writer, &detected)?;
        writeln!(writer)?;
    } else {
        write!(writer, "{}", format_detections(&detected))?;
    }
    Ok(())
}

fn format_capture_line(capture: &CameraCaptureEvent) -> String {
    let types: Vec<&str> = capture.artifact_types.iter().map(|t| t.as_str()).collect();
    let mut line = format!(
        "  {}  score {}  {}",
        capture.capture_time.format("%Y-%m-%d %H:%M:%S%.3f %:z"),
        capture.capture_detection_score,
        types.join("+"),
    );
    if let Some(location) = capture.file_path.as_deref().or(capture.file_uri.as_deref()) {
        write!(line, "  {location}").unwrap();
    }
    if capture.is_estimated {
        line.push_str("  (estimated)");
    }
    line
}

pub fn format_detections(detected: &[SessionCaptures]) -> String {
    let total: usize = detected.iter().map(|s| s.captures.len()).sum();
    let mut output = String::new();
    writeln!(output, "{} sessions, {total} captures", detected.len()).unwrap();
    for session in detected {
        writeln!(output).unwrap();
        writeln!(
            output,
            "{}  {}  [{}]  {} captures",
            session.session_id,
            session.package_name,
            session.strategy,
            session.captures.len()
        )
        .unwrap();
        for capture in &session.captures {
            writeln!(output, "{}", format_capture_line(capture)).unwrap();
        }
    }
    output
}
