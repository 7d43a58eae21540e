//! Parsers for evidence that spans several consecutive lines.
//!
//! A multiline match consumes all of its lines atomically and is tried before
//! any single-line parser for the same section.

use regex::{Captures, Regex};

use super::config::{MultilineDefinition, MultilineKind};
use super::error::ConfigError;
use super::line_parser::TIMESTAMP_GROUP;
use super::section::LogSection;
use crate::event::{FieldValue, Fields, ParsedLogEntry};
use crate::event_type::EventType;

/// A successful multiline match.
#[derive(Debug, Clone, PartialEq)]
pub struct MultilineMatch {
    pub entry: ParsedLogEntry,
    /// Total number of section lines the match covers, including the first.
    pub lines_consumed: usize,
}

/// A pattern that recognises a fixed or variable run of lines.
pub trait MultilinePatternParser: Send + Sync + std::fmt::Debug {
    fn id(&self) -> &str;

    fn target_section(&self) -> &str;

    /// Lower values are tried first.
    fn priority(&self) -> i32;

    /// Checks the lines starting at `index` without consuming them.
    fn can_parse(&self, section: &LogSection, index: usize) -> bool {
        self.try_parse(section, index).is_some()
    }

    fn try_parse(&self, section: &LogSection, index: usize) -> Option<MultilineMatch>;
}

/// Builds the parser variant named by a definition.
pub fn build_multiline(
    def: &MultilineDefinition,
) -> Result<Box<dyn MultilinePatternParser>, ConfigError> {
    let parser: Box<dyn MultilinePatternParser> = match def.kind {
        MultilineKind::SilentCameraCapture => Box::new(SilentCameraCaptureParser::new(def)?),
        MultilineKind::ActivityRefreshRate => Box::new(ActivityRefreshRateParser::new(def)?),
    };
    Ok(parser)
}

fn compile(pattern: &str, owner: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
        owner: format!("multiline parser {owner}"),
        source,
    })
}

fn insert_groups(fields: &mut Fields, caps: &Captures<'_>, names: &[&str]) {
    for name in names {
        if let Some(m) = caps.name(name) {
            fields.insert((*name).to_string(), FieldValue::infer(m.as_str()));
        }
    }
}

fn timestamp_token(caps: &Captures<'_>) -> Option<String> {
    caps.name(TIMESTAMP_GROUP).map(|m| m.as_str().to_string())
}

/// Player lifecycle events that follow a camera-tagged player when the
/// shutter sound was suppressed.
const SILENT_SEQUENCE: [&str; 4] = ["started", "muted", "stopped", "released"];

/// Five lines: a `CAMERA`-tagged player is created, then started, muted,
/// stopped and released, all under the same `piid`.
#[derive(Debug)]
pub struct SilentCameraCaptureParser {
    id: String,
    target_section: String,
    priority: i32,
    created: Regex,
    player_event: Regex,
}

impl SilentCameraCaptureParser {
    pub fn new(def: &MultilineDefinition) -> Result<Self, ConfigError> {
        Ok(Self {
            id: def.id.clone(),
            target_section: def.target_section.clone(),
            priority: def.priority,
            created: compile(
                r"^\s*(?P<timestamp>\d{2}-\d{2} \d{2}:\d{2}:\d{2}[:.]\d{3}) new player piid:(?P<piid>\d+) uid/pid:(?P<uid>\d+)/(?P<pid>\d+) .*?tags=(?P<tags>\S*CAMERA\S*)",
                &def.id,
            )?,
            player_event: compile(
                r"^\s*\d{2}-\d{2} \d{2}:\d{2}:\d{2}[:.]\d{3} player piid:(?P<piid>\d+) event:(?P<event>\w+)",
                &def.id,
            )?,
        })
    }
}

impl MultilinePatternParser for SilentCameraCaptureParser {
    fn id(&self) -> &str {
        &self.id
    }

    fn target_section(&self) -> &str {
        &self.target_section
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn try_parse(&self, section: &LogSection, index: usize) -> Option<MultilineMatch> {
        let window = section.lines.get(index..index + 1 + SILENT_SEQUENCE.len())?;
        let head = self.created.captures(&window[0])?;
        let piid = head.name("piid")?.as_str();

        for (line, expected) in window[1..].iter().zip(SILENT_SEQUENCE) {
            let caps = self.player_event.captures(line)?;
            if caps.name("piid")?.as_str() != piid || caps.name("event")?.as_str() != expected {
                return None;
            }
        }

        let mut fields = Fields::new();
        insert_groups(&mut fields, &head, &["piid", "uid", "pid", "tags"]);

        Some(MultilineMatch {
            entry: ParsedLogEntry {
                line_number: section.line_number(index),
                section_id: section.id.clone(),
                event_type: EventType::SilentCameraCapture,
                fields,
                raw_line: window.join("\n"),
                raw_timestamp_token: timestamp_token(&head),
            },
            lines_consumed: window.len(),
        })
    }
}

/// Two lines: a refresh rate request for an activity followed by an indented
/// line carrying the granted mode and frame rate.
#[derive(Debug)]
pub struct ActivityRefreshRateParser {
    id: String,
    target_section: String,
    priority: i32,
    request: Regex,
    detail: Regex,
}

impl ActivityRefreshRateParser {
    pub fn new(def: &MultilineDefinition) -> Result<Self, ConfigError> {
        Ok(Self {
            id: def.id.clone(),
            target_section: def.target_section.clone(),
            priority: def.priority,
            request: compile(
                r"^\s*(?P<timestamp>\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}(?:\.\d{1,3})?) RefreshRate request package=(?P<package>[\w.]+) activity=(?P<activity>\S+)",
                &def.id,
            )?,
            detail: compile(r"^\s+mode=(?P<mode>\d+) fps=(?P<fps>\d+(?:\.\d+)?)", &def.id)?,
        })
    }
}

impl MultilinePatternParser for ActivityRefreshRateParser {
    fn id(&self) -> &str {
        &self.id
    }

    fn target_section(&self) -> &str {
        &self.target_section
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn try_parse(&self, section: &LogSection, index: usize) -> Option<MultilineMatch> {
        let window = section.lines.get(index..index + 2)?;
        let head = self.request.captures(&window[0])?;
        let detail = self.detail.captures(&window[1])?;

        let mut fields = Fields::new();
        insert_groups(&mut fields, &head, &["package", "activity"]);
        insert_groups(&mut fields, &detail, &["mode", "fps"]);

        Some(MultilineMatch {
            entry: ParsedLogEntry {
                line_number: section.line_number(index),
                section_id: section.id.clone(),
                event_type: EventType::ActivityRefreshRate,
                fields,
                raw_line: window.join("\n"),
                raw_timestamp_token: timestamp_token(&head),
            },
            lines_consumed: window.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(id: &str, lines: &[&str]) -> LogSection {
        LogSection {
            id: id.to_string(),
            name: id.to_string(),
            lines: lines.iter().map(|l| (*l).to_string()).collect(),
            start_line_offset: 10,
        }
    }

    fn def(kind: MultilineKind, section: &str) -> MultilineDefinition {
        MultilineDefinition {
            id: format!("{kind:?}"),
            kind,
            target_section: section.to_string(),
            priority: 0,
            enabled: true,
        }
    }

    const SILENT: [&str; 5] = [
        "01-15 14:23:45:100 new player piid:87 uid/pid:10045/2211 type:android.media.SoundPool attr:AudioAttributes: usage=USAGE_ASSISTANCE_SONIFICATION tags=CAMERA bundle=null",
        "01-15 14:23:45:120 player piid:87 event:started",
        "01-15 14:23:45:121 player piid:87 event:muted",
        "01-15 14:23:45:300 player piid:87 event:stopped",
        "01-15 14:23:45:310 player piid:87 event:released",
    ];

    #[test]
    fn silent_capture_consumes_five_lines() {
        let parser = build_multiline(&def(MultilineKind::SilentCameraCapture, "audio")).unwrap();
        let mut lines = vec!["noise"];
        lines.extend(SILENT);
        let section = section("audio", &lines);

        assert!(!parser.can_parse(&section, 0));
        assert!(parser.can_parse(&section, 1));
        let m = parser.try_parse(&section, 1).unwrap();

        assert_eq!(m.lines_consumed, 5);
        assert_eq!(m.entry.event_type, EventType::SilentCameraCapture);
        assert_eq!(m.entry.line_number, 12);
        assert_eq!(m.entry.fields.get("piid"), Some(&FieldValue::Int(87)));
        assert_eq!(
            m.entry.raw_timestamp_token.as_deref(),
            Some("01-15 14:23:45:100")
        );
        assert_eq!(m.entry.raw_line.lines().count(), 5);
    }

    #[test]
    fn silent_capture_requires_matching_piid() {
        let parser = build_multiline(&def(MultilineKind::SilentCameraCapture, "audio")).unwrap();
        let mut lines = SILENT.to_vec();
        lines[3] = "01-15 14:23:45:300 player piid:88 event:stopped";
        assert!(parser.try_parse(&section("audio", &lines), 0).is_none());
    }

    #[test]
    fn silent_capture_requires_full_window() {
        let parser = build_multiline(&def(MultilineKind::SilentCameraCapture, "audio")).unwrap();
        assert!(parser.try_parse(&section("audio", &SILENT[..4]), 0).is_none());
    }

    #[test]
    fn refresh_rate_pairs_request_with_detail() {
        let parser = build_multiline(&def(MultilineKind::ActivityRefreshRate, "activity")).unwrap();
        let section = section(
            "activity",
            &[
                "2025-01-15 14:23:40.000 RefreshRate request package=com.sec.android.app.camera activity=.Camera",
                "    mode=2 fps=120.0",
            ],
        );
        let m = parser.try_parse(&section, 0).unwrap();
        assert_eq!(m.lines_consumed, 2);
        assert_eq!(m.entry.fields.get("fps"), Some(&FieldValue::Float(120.0)));
        assert_eq!(
            m.entry.fields.get("package"),
            Some(&FieldValue::Str("com.sec.android.app.camera".into()))
        );
    }
}
