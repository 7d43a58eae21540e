//! Regex-driven single-line parsers.

use regex::Regex;

use super::config::ParserDefinition;
use super::error::ConfigError;
use crate::event::{FieldValue, Fields, ParsedLogEntry};
use crate::event_type::EventType;

/// Name of the capture group holding the raw timestamp token.
pub const TIMESTAMP_GROUP: &str = "timestamp";

/// Where a line sits in the file.
#[derive(Debug, Clone, Copy)]
pub struct LineContext<'a> {
    pub section_id: &'a str,
    pub line_number: usize,
}

/// One compiled pattern tagged with the event type it produces.
#[derive(Debug)]
pub struct LinePattern {
    regex: Regex,
    event_type: EventType,
    field_names: Vec<String>,
}

impl LinePattern {
    pub fn new(pattern: &str, event_type: EventType, owner: &str) -> Result<Self, ConfigError> {
        let regex = Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
            owner: format!("parser {owner}"),
            source,
        })?;
        let field_names = regex
            .capture_names()
            .flatten()
            .filter(|name| *name != TIMESTAMP_GROUP)
            .map(str::to_string)
            .collect();
        Ok(Self {
            regex,
            event_type,
            field_names,
        })
    }

    pub fn parse(&self, line: &str, ctx: LineContext<'_>) -> Option<ParsedLogEntry> {
        let caps = self.regex.captures(line)?;
        let mut fields = Fields::new();
        for name in &self.field_names {
            if let Some(m) = caps.name(name) {
                fields.insert(name.clone(), FieldValue::infer(m.as_str()));
            }
        }
        let raw_timestamp_token = caps
            .name(TIMESTAMP_GROUP)
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty());

        Some(ParsedLogEntry {
            line_number: ctx.line_number,
            section_id: ctx.section_id.to_string(),
            event_type: self.event_type,
            fields,
            raw_line: line.to_string(),
            raw_timestamp_token,
        })
    }
}

/// A named, prioritized group of line patterns.
///
/// The first pattern that matches a line wins.
#[derive(Debug)]
pub struct LineParser {
    id: String,
    priority: i32,
    target_sections: Vec<String>,
    patterns: Vec<LinePattern>,
}

impl LineParser {
    pub fn from_definition(def: &ParserDefinition) -> Result<Self, ConfigError> {
        let patterns = def
            .line_patterns
            .iter()
            .map(|p| LinePattern::new(&p.pattern, p.event_type, &def.id))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            id: def.id.clone(),
            priority: def.priority,
            target_sections: def.target_sections.clone(),
            patterns,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub const fn priority(&self) -> i32 {
        self.priority
    }

    pub fn target_sections(&self) -> &[String] {
        &self.target_sections
    }

    pub fn parse(&self, line: &str, ctx: LineContext<'_>) -> Option<ParsedLogEntry> {
        self.patterns.iter().find_map(|p| p.parse(line, ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::config::LinePatternDefinition;

    const CTX: LineContext<'static> = LineContext {
        section_id: "vibrator",
        line_number: 12,
    };

    fn vibration_parser() -> LineParser {
        LineParser::from_definition(&ParserDefinition {
            id: "vibrations".into(),
            priority: 0,
            enabled: true,
            target_sections: vec!["vibrator".into()],
            line_patterns: vec![LinePatternDefinition {
                pattern: r"createTime: (?P<timestamp>[\d-]+ [\d:.]+), status: (?P<status>\w+), opPkg: (?P<package>[\w.]+)(?:, hapticType: (?P<hapticType>\d+))?".into(),
                event_type: EventType::VibrationEvent,
            }],
        })
        .unwrap()
    }

    #[test]
    fn parse_extracts_typed_fields_and_timestamp() {
        let parser = vibration_parser();
        let line = "createTime: 2025-01-15 14:23:45.123, status: finished, opPkg: com.kakao.talk, hapticType: 50061";

        let entry = parser.parse(line, CTX).unwrap();

        assert_eq!(entry.event_type, EventType::VibrationEvent);
        assert_eq!(entry.line_number, 12);
        assert_eq!(entry.section_id, "vibrator");
        assert_eq!(
            entry.raw_timestamp_token.as_deref(),
            Some("2025-01-15 14:23:45.123")
        );
        assert_eq!(entry.fields.get("hapticType"), Some(&FieldValue::Int(50061)));
        assert_eq!(
            entry.fields.get("package"),
            Some(&FieldValue::Str("com.kakao.talk".into()))
        );
        assert!(!entry.fields.contains_key(TIMESTAMP_GROUP));
    }

    #[test]
    fn optional_groups_are_omitted_when_absent() {
        let parser = vibration_parser();
        let entry = parser
            .parse(
                "createTime: 2025-01-15 14:23:45.123, status: cancelled_superseded, opPkg: android",
                CTX,
            )
            .unwrap();
        assert!(!entry.fields.contains_key("hapticType"));
        assert_eq!(
            entry.fields.get("status"),
            Some(&FieldValue::Str("cancelled_superseded".into()))
        );
    }

    #[test]
    fn non_matching_line_yields_none() {
        let parser = vibration_parser();
        assert!(parser.parse("Vibrator Manager Service", CTX).is_none());
    }

    #[test]
    fn invalid_pattern_is_config_error() {
        let result = LinePattern::new("(?P<x>", EventType::PlayerEvent, "broken");
        assert!(matches!(result, Err(ConfigError::InvalidPattern { .. })));
    }
}
