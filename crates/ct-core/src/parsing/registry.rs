//! Compiled parser tables, built once per configuration.

use std::collections::{HashMap, HashSet};

use super::config::ParserConfig;
use super::error::ConfigError;
use super::line_parser::LineParser;
use super::multiline::{MultilinePatternParser, build_multiline};
use super::section::SectionSplitter;

/// Immutable arena of compiled section markers, line parsers and multiline
/// parsers.
///
/// Regex compilation happens here and nowhere else. The registry is `Sync`
/// and can be shared (behind an `Arc`) by any number of concurrent parses.
#[derive(Debug)]
pub struct ParserRegistry {
    config: ParserConfig,
    splitter: SectionSplitter,
    line_parsers: Vec<LineParser>,
    multiline_parsers: Vec<Box<dyn MultilinePatternParser>>,
    line_index: HashMap<String, Vec<usize>>,
    multiline_index: HashMap<String, Vec<usize>>,
}

impl ParserRegistry {
    pub fn new(config: ParserConfig) -> Result<Self, ConfigError> {
        let splitter = SectionSplitter::new(&config.sections)?;
        let known_sections: HashSet<&str> = config.sections.iter().map(|s| s.id.as_str()).collect();

        let mut seen_ids = HashSet::new();
        for def in &config.parsers {
            if !seen_ids.insert(def.id.as_str()) {
                return Err(ConfigError::DuplicateId {
                    kind: "parser",
                    id: def.id.clone(),
                });
            }
            if let Some(section) = def
                .target_sections
                .iter()
                .find(|s| !known_sections.contains(s.as_str()))
            {
                return Err(ConfigError::UnknownSection {
                    owner: format!("parser {}", def.id),
                    section: section.clone(),
                });
            }
        }

        let mut line_parsers = config
            .parsers
            .iter()
            .filter(|d| d.enabled)
            .map(LineParser::from_definition)
            .collect::<Result<Vec<_>, _>>()?;
        line_parsers.sort_by_key(LineParser::priority);

        let multiline_defs: Vec<_> = config.multiline.iter().filter(|d| d.enabled).collect();
        for def in &multiline_defs {
            if !known_sections.contains(def.target_section.as_str()) {
                return Err(ConfigError::UnknownSection {
                    owner: format!("multiline parser {}", def.id),
                    section: def.target_section.clone(),
                });
            }
        }
        let mut multiline_parsers = multiline_defs
            .into_iter()
            .map(build_multiline)
            .collect::<Result<Vec<_>, _>>()?;
        multiline_parsers.sort_by_key(|p| p.priority());

        let mut line_index: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, parser) in line_parsers.iter().enumerate() {
            for section in parser.target_sections() {
                line_index.entry(section.clone()).or_default().push(i);
            }
        }
        let mut multiline_index: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, parser) in multiline_parsers.iter().enumerate() {
            multiline_index
                .entry(parser.target_section().to_string())
                .or_default()
                .push(i);
        }

        tracing::debug!(
            sections = config.sections.len(),
            line_parsers = line_parsers.len(),
            multiline_parsers = multiline_parsers.len(),
            "compiled parser registry"
        );

        Ok(Self {
            config,
            splitter,
            line_parsers,
            multiline_parsers,
            line_index,
            multiline_index,
        })
    }

    pub const fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub const fn splitter(&self) -> &SectionSplitter {
        &self.splitter
    }

    /// Line parsers targeting `section`, in ascending priority order.
    pub fn line_parsers_for<'a>(&'a self, section: &str) -> impl Iterator<Item = &'a LineParser> {
        self.line_index
            .get(section)
            .into_iter()
            .flatten()
            .map(|&i| &self.line_parsers[i])
    }

    /// Multiline parsers targeting `section`, in ascending priority order.
    pub fn multiline_parsers_for<'a>(
        &'a self,
        section: &str,
    ) -> impl Iterator<Item = &'a dyn MultilinePatternParser> {
        self.multiline_index
            .get(section)
            .into_iter()
            .flatten()
            .map(|&i| self.multiline_parsers[i].as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_type::EventType;
    use crate::parsing::config::{LinePatternDefinition, ParserDefinition};

    fn parser_def(id: &str, priority: i32, section: &str) -> ParserDefinition {
        ParserDefinition {
            id: id.to_string(),
            priority,
            enabled: true,
            target_sections: vec![section.to_string()],
            line_patterns: vec![LinePatternDefinition {
                pattern: r"event:(?P<event>\w+)".to_string(),
                event_type: EventType::PlayerEvent,
            }],
        }
    }

    #[test]
    fn default_profile_compiles() {
        let registry = ParserRegistry::new(ParserConfig::default()).unwrap();
        assert_eq!(
            registry.line_parsers_for("vibrator").map(LineParser::id).collect::<Vec<_>>(),
            vec!["vibrations"]
        );
        assert_eq!(registry.line_parsers_for("audio").count(), 1);
        assert_eq!(registry.multiline_parsers_for("audio").count(), 1);
        assert_eq!(registry.line_parsers_for("nonexistent").count(), 0);
    }

    #[test]
    fn parsers_are_ordered_by_priority() {
        let mut config = ParserConfig::default();
        config.parsers = vec![
            parser_def("late", 50, "audio"),
            parser_def("early", 1, "audio"),
        ];
        let registry = ParserRegistry::new(config).unwrap();
        let ids: Vec<&str> = registry.line_parsers_for("audio").map(LineParser::id).collect();
        assert_eq!(ids, vec!["early", "late"]);
    }

    #[test]
    fn disabled_parsers_are_not_compiled() {
        let mut config = ParserConfig::default();
        let mut disabled = parser_def("off", 0, "audio");
        disabled.enabled = false;
        disabled.line_patterns[0].pattern = "(".to_string();
        config.parsers = vec![disabled];
        let registry = ParserRegistry::new(config).unwrap();
        assert!(registry.line_parsers.is_empty());
    }

    #[test]
    fn rejects_unknown_target_section_and_duplicates() {
        let mut config = ParserConfig::default();
        config.parsers = vec![parser_def("p", 0, "kernel")];
        assert!(matches!(
            ParserRegistry::new(config),
            Err(ConfigError::UnknownSection { .. })
        ));

        let mut config = ParserConfig::default();
        config.parsers = vec![parser_def("p", 0, "audio"), parser_def("p", 1, "audio")];
        assert!(matches!(
            ParserRegistry::new(config),
            Err(ConfigError::DuplicateId { .. })
        ));
    }
}
