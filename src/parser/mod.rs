//! Feature text parser.
//!
//! Parsing is a single forward scan over the lines of the input with a
//! cursor remembering which section (feature, background, rule, scenario
//! or examples block) is currently open. Tables and doc strings attach to
//! the most recently opened step, tag lines attach to the next feature,
//! rule, scenario or examples header, and comments or blank lines are
//! skipped.
//!
//! ```rust
//! use tsukemono::parser::parse_features;
//!
//! let text = "Feature: one\n  Scenario: a\n    Given x\nFeature: two\n";
//! let features = parse_features(text).expect("parse");
//! assert_eq!(features.len(), 2);
//! ```

mod error;

pub use error::{ParseError, ParseErrorKind};

use crate::ast::{
    Background, Examples, Feature, Rule, Scenario, Step, StepKeyword, Table, Tags,
};
use crate::hasher::NodeHasher;
use std::mem;
use tracing::debug;

/// Name reported in diagnostics when the caller supplies none.
pub const DEFAULT_SOURCE_NAME: &str = "<feature>";

const DOC_FENCES: [&str; 2] = ["\"\"\"", "```"];
const ESCAPED_FENCE: &str = "\\\"\\\"\\\"";

/// Parse the first feature in `text`.
///
/// # Errors
///
/// Returns [`ParseError`] when the text is malformed or holds no feature.
pub fn parse_feature(text: &str) -> Result<Feature, ParseError> {
    parse_named_feature(DEFAULT_SOURCE_NAME, text)
}

/// Parse the first feature in `text`, naming the source `name` in
/// diagnostics.
///
/// # Errors
///
/// Returns [`ParseError`] when the text is malformed or holds no feature.
pub fn parse_named_feature(name: &str, text: &str) -> Result<Feature, ParseError> {
    parse_named(name, text)?.into_iter().next().ok_or_else(|| {
        ParseError::new(ParseErrorKind::MissingFeature, name, text, 1, (0, 0))
    })
}

/// Parse every feature in `text`.
///
/// # Errors
///
/// Returns [`ParseError`] when the text is malformed.
pub fn parse_features(text: &str) -> Result<Vec<Feature>, ParseError> {
    parse_named(DEFAULT_SOURCE_NAME, text)
}

/// Parse every feature in `text`, naming the source `name` in diagnostics.
///
/// # Errors
///
/// Returns [`ParseError`] when the text is malformed.
pub fn parse_named(name: &str, text: &str) -> Result<Vec<Feature>, ParseError> {
    let mut parser = Parser::new(Origin { name, source: text });
    let mut offset = 0;
    for (index, segment) in text.split_inclusive('\n').enumerate() {
        let raw = segment.trim_end_matches(['\n', '\r']);
        parser.line(&LineRef::new(index + 1, offset, raw))?;
        offset += segment.len();
    }
    let features = parser.finish()?;
    debug!(
        target: "tsukemono::parser",
        source = name,
        features = features.len(),
        "parsed feature text"
    );
    Ok(features)
}

/// Fill in identifiers for every node of `feature` that lacks one.
///
/// The parser calls this for the features it produces; the runner calls it
/// for features supplied pre-parsed.
pub fn assign_ids(feature: &mut Feature) {
    if feature.id.is_empty() {
        feature.id = NodeHasher::feature(&feature.description, feature.line);
    }
    let feature_id = feature.id.clone();
    if let Some(background) = feature.background.as_mut() {
        assign_background_ids(&feature_id, background);
    }
    for (position, scenario) in feature.scenarios.iter_mut().enumerate() {
        assign_scenario_ids(&feature_id, position, scenario);
    }
    for (position, rule) in feature.rules.iter_mut().enumerate() {
        if rule.id.is_empty() {
            rule.id = NodeHasher::section(&feature_id, "rule", &rule.description, position);
        }
        let rule_id = rule.id.clone();
        if let Some(background) = rule.background.as_mut() {
            assign_background_ids(&rule_id, background);
        }
        for (index, scenario) in rule.scenarios.iter_mut().enumerate() {
            assign_scenario_ids(&rule_id, index, scenario);
        }
    }
}

fn assign_background_ids(parent: &str, background: &mut Background) {
    if background.id.is_empty() {
        background.id = NodeHasher::section(parent, "background", &background.description, 0);
    }
    assign_step_ids(&background.id, &mut background.steps);
}

fn assign_scenario_ids(parent: &str, position: usize, scenario: &mut Scenario) {
    if scenario.id.is_empty() {
        scenario.id = NodeHasher::section(parent, "scenario", &scenario.description, position);
    }
    assign_step_ids(&scenario.id, &mut scenario.steps);
}

fn assign_step_ids(parent: &str, steps: &mut [Step]) {
    for (position, step) in steps.iter_mut().enumerate() {
        if step.id.is_empty() {
            step.id = NodeHasher::step(parent, position, step.keyword, &step.text);
        }
    }
}

#[derive(Clone, Copy)]
struct Origin<'a> {
    name: &'a str,
    source: &'a str,
}

impl Origin<'_> {
    fn error(self, kind: ParseErrorKind, line: &LineRef<'_>) -> ParseError {
        ParseError::new(kind, self.name, self.source, line.number, line.span())
    }
}

struct LineRef<'a> {
    number: usize,
    offset: usize,
    raw: &'a str,
    trimmed: &'a str,
}

impl<'a> LineRef<'a> {
    fn new(number: usize, offset: usize, raw: &'a str) -> Self {
        Self {
            number,
            offset,
            raw,
            trimmed: raw.trim(),
        }
    }

    fn indent(&self) -> usize {
        self.raw.len() - self.raw.trim_start().len()
    }

    fn span(&self) -> (usize, usize) {
        (self.offset + self.indent(), self.trimmed.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Feature,
    Background,
    Rule,
    Scenario,
    Examples,
}

#[derive(Debug, Clone, Copy)]
enum Header {
    Feature,
    Background,
    Rule,
    Scenario,
    Examples,
}

const HEADERS: [(&str, Header); 9] = [
    ("Feature:", Header::Feature),
    ("Background:", Header::Background),
    ("Rule:", Header::Rule),
    ("Scenario Outline:", Header::Scenario),
    ("Scenario Template:", Header::Scenario),
    ("Scenario:", Header::Scenario),
    ("Example:", Header::Scenario),
    ("Examples:", Header::Examples),
    ("Scenarios:", Header::Examples),
];

fn header(text: &str) -> Option<(Header, &str)> {
    HEADERS.iter().find_map(|(keyword, kind)| {
        text.strip_prefix(*keyword)
            .map(|title| (*kind, title.trim()))
    })
}

fn step_keyword(text: &str) -> Option<(StepKeyword, &str)> {
    StepKeyword::ALL.iter().find_map(|keyword| {
        text.strip_prefix(keyword.as_str())
            .and_then(|rest| rest.strip_prefix(' '))
            .map(|rest| (*keyword, rest))
    })
}

/// Split a `| a | b |` row into trimmed cells, honouring `\|`, `\\` and
/// `\n` escapes.
fn split_cells(row: &str) -> Vec<String> {
    let inner = row.strip_prefix('|').unwrap_or(row);
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('|') => current.push('|'),
                Some('n') => current.push('\n'),
                Some('\\') => current.push('\\'),
                Some(other) => {
                    current.push('\\');
                    current.push(other);
                }
                None => current.push('\\'),
            },
            '|' => {
                cells.push(current.trim().to_owned());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        cells.push(current.trim().to_owned());
    }
    cells
}

fn strip_indent(line: &str, indent: usize) -> &str {
    let mut rest = line;
    for _ in 0..indent {
        match rest.strip_prefix([' ', '\t']) {
            Some(stripped) => rest = stripped,
            None => break,
        }
    }
    rest
}

fn last_scenario(feature: &mut Feature, in_rule: bool) -> Option<&mut Scenario> {
    if in_rule {
        feature.rules.last_mut()?.scenarios.last_mut()
    } else {
        feature.scenarios.last_mut()
    }
}

struct OpenDocString {
    fence: &'static str,
    indent: usize,
    lines: Vec<String>,
    number: usize,
    span: (usize, usize),
}

struct Parser<'a> {
    origin: Origin<'a>,
    features: Vec<Feature>,
    section: Option<Section>,
    in_rule: bool,
    pending_tags: Tags,
    doc: Option<OpenDocString>,
}

impl<'a> Parser<'a> {
    fn new(origin: Origin<'a>) -> Self {
        Self {
            origin,
            features: Vec::new(),
            section: None,
            in_rule: false,
            pending_tags: Tags::new(),
            doc: None,
        }
    }

    fn line(&mut self, line: &LineRef<'_>) -> Result<(), ParseError> {
        if self.doc.is_some() {
            self.doc_line(line);
            return Ok(());
        }
        let text = line.trimmed;
        if text.is_empty() || text.starts_with('#') {
            return Ok(());
        }
        if let Some(fence) = DOC_FENCES.iter().find(|fence| text.starts_with(**fence)) {
            return self.open_doc(line, fence);
        }
        if text.starts_with('|') {
            return self.table_row(line);
        }
        if text.starts_with('@') {
            self.tags(text);
            return Ok(());
        }
        if let Some((kind, title)) = header(text) {
            return self.header(line, kind, title);
        }
        if let Some((keyword, rest)) = step_keyword(text) {
            return self.step(line, keyword, rest);
        }
        self.narrative(line)
    }

    fn finish(mut self) -> Result<Vec<Feature>, ParseError> {
        if let Some(doc) = self.doc.take() {
            return Err(ParseError::new(
                ParseErrorKind::UnterminatedDocString {
                    fence: doc.fence.to_owned(),
                },
                self.origin.name,
                self.origin.source,
                doc.number,
                doc.span,
            ));
        }
        for feature in &mut self.features {
            assign_ids(feature);
        }
        Ok(self.features)
    }

    fn tags(&mut self, text: &str) {
        let tags = text
            .split_whitespace()
            .take_while(|token| !token.starts_with('#'))
            .filter(|token| token.starts_with('@') && token.len() > 1);
        self.pending_tags.extend(tags.map(str::to_owned));
    }

    fn feature_mut(&mut self, line: &LineRef<'_>, keyword: &str) -> Result<&mut Feature, ParseError> {
        let origin = self.origin;
        self.features.last_mut().ok_or_else(|| {
            origin.error(
                ParseErrorKind::OutsideFeature {
                    keyword: keyword.to_owned(),
                },
                line,
            )
        })
    }

    fn header(&mut self, line: &LineRef<'_>, kind: Header, title: &str) -> Result<(), ParseError> {
        let local_tags = mem::take(&mut self.pending_tags);
        let description = title.to_owned();
        match kind {
            Header::Feature => {
                self.features.push(Feature {
                    description,
                    tags: local_tags,
                    line: line.number,
                    ..Feature::default()
                });
                self.in_rule = false;
                self.section = Some(Section::Feature);
            }
            Header::Background => {
                let origin = self.origin;
                let in_rule = self.in_rule;
                let feature = self.feature_mut(line, "Background:")?;
                let slot = match (in_rule, feature.rules.last_mut()) {
                    (true, Some(rule)) => &mut rule.background,
                    _ => &mut feature.background,
                };
                if slot.is_some() {
                    return Err(origin.error(ParseErrorKind::DuplicateBackground, line));
                }
                *slot = Some(Background {
                    description,
                    line: line.number,
                    ..Background::default()
                });
                self.section = Some(Section::Background);
            }
            Header::Rule => {
                let feature = self.feature_mut(line, "Rule:")?;
                let tags = if local_tags.is_empty() {
                    feature.tags.clone()
                } else {
                    local_tags
                };
                feature.rules.push(Rule {
                    description,
                    tags,
                    line: line.number,
                    ..Rule::default()
                });
                self.in_rule = true;
                self.section = Some(Section::Rule);
            }
            Header::Scenario => {
                let in_rule = self.in_rule;
                let feature = self.feature_mut(line, "Scenario:")?;
                let (inherited, scenarios) = match (in_rule, feature.rules.last_mut()) {
                    (true, Some(rule)) => (&rule.tags, &mut rule.scenarios),
                    _ => (&feature.tags, &mut feature.scenarios),
                };
                let tags = if local_tags.is_empty() {
                    inherited.clone()
                } else {
                    local_tags
                };
                scenarios.push(Scenario {
                    description,
                    tags,
                    line: line.number,
                    ..Scenario::default()
                });
                self.section = Some(Section::Scenario);
            }
            Header::Examples => {
                let origin = self.origin;
                let in_rule = self.in_rule;
                let in_scenario = matches!(
                    self.section,
                    Some(Section::Scenario | Section::Examples)
                );
                let scenario = self
                    .features
                    .last_mut()
                    .and_then(|feature| last_scenario(feature, in_rule))
                    .filter(|_| in_scenario)
                    .ok_or_else(|| origin.error(ParseErrorKind::ExamplesOutsideScenario, line))?;
                scenario.examples.push(Examples {
                    description,
                    tags: local_tags,
                    table: Table::new(),
                    line: line.number,
                });
                self.section = Some(Section::Examples);
            }
        }
        Ok(())
    }

    fn steps_mut(&mut self) -> Option<&mut Vec<Step>> {
        let in_rule = self.in_rule;
        let section = self.section?;
        let feature = self.features.last_mut()?;
        match section {
            Section::Background => {
                let background = if in_rule {
                    feature.rules.last_mut()?.background.as_mut()
                } else {
                    feature.background.as_mut()
                };
                background.map(|background| &mut background.steps)
            }
            Section::Scenario => last_scenario(feature, in_rule).map(|scenario| &mut scenario.steps),
            Section::Feature | Section::Rule | Section::Examples => None,
        }
    }

    fn last_step_mut(&mut self) -> Option<&mut Step> {
        self.steps_mut()?.last_mut()
    }

    fn step(&mut self, line: &LineRef<'_>, keyword: StepKeyword, text: &str) -> Result<(), ParseError> {
        self.pending_tags.clear();
        let origin = self.origin;
        let steps = self.steps_mut().ok_or_else(|| {
            origin.error(
                ParseErrorKind::StepOutsideScenario {
                    text: line.trimmed.to_owned(),
                },
                line,
            )
        })?;
        steps.push(Step {
            id: String::new(),
            keyword,
            text: text.to_owned(),
            table: None,
            doc_string: None,
            line: line.number,
        });
        Ok(())
    }

    fn table_row(&mut self, line: &LineRef<'_>) -> Result<(), ParseError> {
        let origin = self.origin;
        let cells = split_cells(line.trimmed);
        let slot = if self.section == Some(Section::Examples) {
            let in_rule = self.in_rule;
            self.features
                .last_mut()
                .and_then(|feature| last_scenario(feature, in_rule))
                .and_then(|scenario| scenario.examples.last_mut())
                .map(|examples| &mut examples.table)
        } else {
            self.last_step_mut()
                .map(|step| step.table.get_or_insert_with(Table::new))
        };
        let table = slot.ok_or_else(|| origin.error(ParseErrorKind::TableOutsideStep, line))?;
        if let Some(first) = table.first()
            && first.len() != cells.len()
        {
            return Err(origin.error(
                ParseErrorKind::InconsistentTable {
                    expected: first.len(),
                    found: cells.len(),
                },
                line,
            ));
        }
        table.push(cells);
        Ok(())
    }

    fn open_doc(&mut self, line: &LineRef<'_>, fence: &'static str) -> Result<(), ParseError> {
        if self.last_step_mut().is_none() {
            return Err(self.origin.error(ParseErrorKind::DocStringOutsideStep, line));
        }
        self.doc = Some(OpenDocString {
            fence,
            indent: line.indent(),
            lines: Vec::new(),
            number: line.number,
            span: line.span(),
        });
        Ok(())
    }

    fn doc_line(&mut self, line: &LineRef<'_>) {
        let Some(doc) = self.doc.as_mut() else {
            return;
        };
        if line.trimmed == doc.fence {
            let content = doc.lines.join("\n");
            self.doc = None;
            if let Some(step) = self.last_step_mut() {
                step.doc_string = Some(content);
            }
            return;
        }
        let body = strip_indent(line.raw, doc.indent).replace(ESCAPED_FENCE, "\"\"\"");
        doc.lines.push(body);
    }

    fn narrative(&mut self, line: &LineRef<'_>) -> Result<(), ParseError> {
        let text = line.trimmed.to_owned();
        let section = self.section;
        let in_rule = self.in_rule;
        let target = self.features.last_mut().and_then(|feature| match section {
            Some(Section::Feature) => Some(&mut feature.narrative),
            Some(Section::Rule) => feature.rules.last_mut().map(|rule| &mut rule.narrative),
            Some(Section::Scenario) => last_scenario(feature, in_rule)
                .filter(|scenario| scenario.steps.is_empty())
                .map(|scenario| &mut scenario.narrative),
            _ => None,
        });
        match target {
            Some(narrative) => {
                narrative.push(text);
                Ok(())
            }
            None => Err(self
                .origin
                .error(ParseErrorKind::UnexpectedText { text }, line)),
        }
    }
}

#[cfg(test)]
mod tests;
