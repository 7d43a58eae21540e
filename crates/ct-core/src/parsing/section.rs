//! Splits a raw log into named sections using start/end markers.

use regex::Regex;
use serde::Serialize;

use super::config::{MarkerType, SectionDefinition};
use super::error::ConfigError;

/// A contiguous block of lines belonging to one section definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogSection {
    pub id: String,
    pub name: String,
    /// Content lines, marker lines excluded.
    pub lines: Vec<String>,
    /// 0-based index in the file of the first content line.
    pub start_line_offset: usize,
}

impl LogSection {
    /// 1-based file line number of the content line at `index`.
    pub const fn line_number(&self, index: usize) -> usize {
        self.start_line_offset + index + 1
    }
}

#[derive(Debug)]
enum Marker {
    Literal(String),
    Pattern(Regex),
}

impl Marker {
    fn compile(text: &str, kind: MarkerType, section: &str) -> Result<Self, ConfigError> {
        if text.is_empty() {
            return Err(ConfigError::EmptyMarker {
                section: section.to_string(),
            });
        }
        match kind {
            MarkerType::Literal => Ok(Self::Literal(text.to_string())),
            MarkerType::Regex => Regex::new(text)
                .map(Self::Pattern)
                .map_err(|source| ConfigError::InvalidPattern {
                    owner: format!("section {section}"),
                    source,
                }),
        }
    }

    fn matches(&self, line: &str) -> bool {
        match self {
            Self::Literal(text) => line.contains(text.as_str()),
            Self::Pattern(re) => re.is_match(line),
        }
    }
}

#[derive(Debug)]
struct CompiledSection {
    id: String,
    name: String,
    start: Marker,
    end: Marker,
}

/// Section splitter with markers compiled once at construction.
///
/// Only one section is open at a time: while a section is open only its end
/// marker is checked. A section whose end marker never appears runs to the
/// end of the file. Each definition opens at most once per file.
#[derive(Debug)]
pub struct SectionSplitter {
    sections: Vec<CompiledSection>,
}

impl SectionSplitter {
    /// Compiles the enabled section definitions. Disabled ones are dropped.
    pub fn new(definitions: &[SectionDefinition]) -> Result<Self, ConfigError> {
        let mut sections: Vec<CompiledSection> = Vec::new();
        for def in definitions.iter().filter(|d| d.enabled) {
            if sections.iter().any(|s| s.id == def.id) {
                return Err(ConfigError::DuplicateId {
                    kind: "section",
                    id: def.id.clone(),
                });
            }
            sections.push(CompiledSection {
                id: def.id.clone(),
                name: def.name.clone().unwrap_or_else(|| def.id.clone()),
                start: Marker::compile(&def.start_marker, def.marker_type, &def.id)?,
                end: Marker::compile(&def.end_marker, def.marker_type, &def.id)?,
            });
        }
        Ok(Self { sections })
    }

    /// Returns whether an enabled section with this id exists.
    pub fn has_section(&self, id: &str) -> bool {
        self.sections.iter().any(|s| s.id == id)
    }

    /// Splits `content` into sections, in the order they appear in the file.
    pub fn split(&self, content: &str) -> Vec<LogSection> {
        let mut done = Vec::new();
        let mut opened = vec![false; self.sections.len()];
        let mut open: Option<(usize, LogSection)> = None;

        for (index, line) in content.lines().enumerate() {
            if let Some((def_index, mut section)) = open.take() {
                if self.sections[def_index].end.matches(line) {
                    done.push(section);
                } else {
                    section.lines.push(line.to_string());
                    open = Some((def_index, section));
                }
                continue;
            }

            let starting = self
                .sections
                .iter()
                .enumerate()
                .find(|(i, s)| !opened[*i] && s.start.matches(line));
            if let Some((def_index, def)) = starting {
                opened[def_index] = true;
                tracing::trace!(section = %def.id, line = index + 1, "section opened");
                open = Some((
                    def_index,
                    LogSection {
                        id: def.id.clone(),
                        name: def.name.clone(),
                        lines: Vec::new(),
                        start_line_offset: index + 1,
                    },
                ));
            }
        }

        if let Some((_, section)) = open {
            tracing::debug!(section = %section.id, "section has no end marker, runs to end of file");
            done.push(section);
        }
        done
    }
}
