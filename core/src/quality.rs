//! Heuristic detection of extraction quality problems in section text.
//!
//! Tables are scanned as rendered pipe tables when the sections carry none
//! of their own, as with layout-analysis results. Findings are informational: they travel with the validation report and
//! never fail a request.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::types::ExtractionResult;
use crate::validation::normalize::extract_numbers;

static EMPTY_TABLE_ROWS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\|\s*\|\s*\|.*\n){5,}").expect("Empty table regex pattern is valid and should compile")
});
static MARKDOWN_IMAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"!\[([^\]]*)\]\(([^)]+)\)").expect("Markdown image regex pattern is valid and should compile")
});
static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:[.,]\d+)?").expect("Number regex pattern is valid and should compile"));
static STANDALONE_QUESTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s\?\s").expect("Question mark regex pattern is valid and should compile"));

const FINANCIAL_KEYWORDS: &[&str] = &[
    "revenue",
    "expense",
    "balance",
    "asset",
    "liability",
    "equity",
    "income",
    "profit",
    "loss",
    "debit",
    "credit",
    "account",
    "total",
    "subtotal",
    "amount",
    "date",
    "transaction",
    "payment",
    "statement",
    "bank",
    "financial",
    "report",
    "summary",
    "הכנסות",
    "הוצאות",
    "יתרה",
    "חשבון",
    "סכום",
    "סה\"כ",
    "זכות",
    "חובה",
    "תאריך",
    "עסקה",
    "תשלום",
    "דוח",
    "כספי",
    "מאזן",
    "רווח",
    "הפסד",
];

const UNKNOWN_GLYPHS: &[char] = &['□', '\u{FFFD}', '☐', '▯', '▢', '▣'];
const FILLER_CHARS: &[char] = &[' ', '-', '_', '=', '*', '\n'];
const COMMON_PUNCTUATION: &str = " \n\t.,;:!?-()[]{}\"'/\\|";

/// A detectable extraction problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Problem {
    /// No text at all.
    EmptyContent,
    /// Five or more consecutive rows of empty table cells.
    EmptyTables,
    /// Fewer than 100 alphanumeric characters.
    LowContentDensity,
    /// A sizable table without any numbers.
    MissingNumbers,
    /// Table rows with more than two distinct column counts.
    InconsistentColumns,
    /// A non-filler character repeated ten or more times.
    RepeatedCharacters,
    /// Too many symbols relative to alphanumerics.
    GarbledText,
    /// A table with at most one data row.
    HeaderOnlyTables,
    /// Fewer than 200 characters.
    VeryShortPages,
    /// A long text without any financial keyword.
    MissingKeywords,
    /// Table separator rows that are not made of dashes.
    MalformedStructure,
    /// A substantial paragraph repeated three or more times.
    DuplicateContent,
    /// Replacement or box glyphs above 5% of the text.
    UnknownCharacters,
    /// The same number three or more times in a row.
    RepetitiveNumbers,
    /// Markdown image references.
    MarkdownImages,
}

impl Problem {
    /// Every detector, in evaluation order.
    pub const ALL: [Self; 14] = [
        Self::EmptyTables,
        Self::LowContentDensity,
        Self::MissingNumbers,
        Self::InconsistentColumns,
        Self::RepeatedCharacters,
        Self::GarbledText,
        Self::HeaderOnlyTables,
        Self::VeryShortPages,
        Self::MissingKeywords,
        Self::MalformedStructure,
        Self::DuplicateContent,
        Self::UnknownCharacters,
        Self::RepetitiveNumbers,
        Self::MarkdownImages,
    ];

    /// Detectors enabled when nothing is configured.
    pub const DEFAULT: [Self; 7] = [
        Self::EmptyTables,
        Self::LowContentDensity,
        Self::MissingNumbers,
        Self::InconsistentColumns,
        Self::GarbledText,
        Self::MissingKeywords,
        Self::RepetitiveNumbers,
    ];

    /// Configuration name of the problem.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::EmptyContent => "empty_content",
            Self::EmptyTables => "empty_tables",
            Self::LowContentDensity => "low_content_density",
            Self::MissingNumbers => "missing_numbers",
            Self::InconsistentColumns => "inconsistent_columns",
            Self::RepeatedCharacters => "repeated_characters",
            Self::GarbledText => "garbled_text",
            Self::HeaderOnlyTables => "header_only_tables",
            Self::VeryShortPages => "very_short_pages",
            Self::MissingKeywords => "missing_keywords",
            Self::MalformedStructure => "malformed_structure",
            Self::DuplicateContent => "duplicate_content",
            Self::UnknownCharacters => "unknown_characters",
            Self::RepetitiveNumbers => "repetitive_numbers",
            Self::MarkdownImages => "markdown_images",
        }
    }

    /// Whether the detector looks at table structure or table content.
    #[must_use]
    pub const fn is_table_check(self) -> bool {
        matches!(
            self,
            Self::EmptyTables
                | Self::MissingNumbers
                | Self::InconsistentColumns
                | Self::HeaderOnlyTables
                | Self::MalformedStructure
                | Self::RepetitiveNumbers
        )
    }

    fn detect(self, text: &str) -> bool {
        match self {
            Self::EmptyContent => text.trim().is_empty(),
            Self::EmptyTables => EMPTY_TABLE_ROWS.is_match(text),
            Self::LowContentDensity => alphanumeric_count(text) < 100,
            Self::MissingNumbers => text.matches('|').count() / 4 >= 5 && extract_numbers(text).is_empty(),
            Self::InconsistentColumns => inconsistent_columns(text),
            Self::RepeatedCharacters => repeated_characters(text),
            Self::GarbledText => garbled(text),
            Self::HeaderOnlyTables => header_only_table(text),
            Self::VeryShortPages => text.trim().chars().count() < 200,
            Self::MissingKeywords => missing_keywords(text),
            Self::MalformedStructure => malformed_separators(text),
            Self::DuplicateContent => duplicate_paragraphs(text),
            Self::UnknownCharacters => unknown_characters(text),
            Self::RepetitiveNumbers => repetitive_numbers(text),
            Self::MarkdownImages => MARKDOWN_IMAGE.is_match(text),
        }
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Problem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .chain(std::iter::once(Self::EmptyContent))
            .find(|p| p.name() == wanted)
            .ok_or_else(|| format!("unknown problem pattern: {wanted}"))
    }
}

/// Which detectors run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityConfig {
    /// Enabled detectors (default: the seven cheap, high-signal ones).
    pub enabled: Vec<Problem>,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            enabled: Problem::DEFAULT.to_vec(),
        }
    }
}

impl QualityConfig {
    /// Every detector.
    #[must_use]
    pub fn all() -> Self {
        Self {
            enabled: Problem::ALL.to_vec(),
        }
    }

    /// No detection at all.
    #[must_use]
    pub const fn disabled() -> Self {
        Self { enabled: Vec::new() }
    }

    /// Parses a comma-separated list, or `all`.
    ///
    /// # Errors
    ///
    /// Returns the offending name when an entry is not a known problem.
    pub fn parse_list(list: &str) -> Result<Self, String> {
        if list.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::all());
        }
        let mut enabled = Vec::new();
        for entry in list.split(',').filter(|e| !e.trim().is_empty()) {
            let problem: Problem = entry.parse()?;
            if !enabled.contains(&problem) {
                enabled.push(problem);
            }
        }
        Ok(Self { enabled })
    }
}

/// Part of a result a finding refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "index", rename_all = "snake_case")]
pub enum FindingTarget {
    /// Index into `sections`.
    Section(usize),
    /// Index into `tables`.
    Table(usize),
}

/// Problems found in one section or table of a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityFinding {
    /// Where the problems are.
    pub target: FindingTarget,
    /// Section title, when it has one.
    pub title: Option<String>,
    /// Detected problems.
    pub problems: Vec<Problem>,
}

/// Runs the enabled detectors over section text.
#[derive(Debug, Clone, Default)]
pub struct QualityDetector {
    config: QualityConfig,
}

impl QualityDetector {
    /// Creates a detector.
    #[must_use]
    pub const fn new(config: QualityConfig) -> Self {
        Self { config }
    }

    /// Problems in a single text block.
    #[must_use]
    pub fn detect(&self, text: &str) -> Vec<Problem> {
        if text.trim().is_empty() {
            return vec![Problem::EmptyContent];
        }
        self.config
            .enabled
            .iter()
            .copied()
            .filter(|p| *p != Problem::EmptyContent && p.detect(text))
            .collect()
    }

    /// Table detectors over one rendered table.
    #[must_use]
    pub fn detect_table(&self, markdown: &str) -> Vec<Problem> {
        self.config
            .enabled
            .iter()
            .copied()
            .filter(|p| p.is_table_check() && p.detect(markdown))
            .collect()
    }

    /// Findings for every section of `result` that has at least one problem.
    ///
    /// When no section text contains a pipe table, each of `result.tables`
    /// is rendered and checked with the table detectors as well.
    #[must_use]
    pub fn scan(&self, result: &ExtractionResult) -> Vec<QualityFinding> {
        if self.config.enabled.is_empty() {
            return Vec::new();
        }
        let mut findings: Vec<QualityFinding> = result
            .sections
            .iter()
            .enumerate()
            .filter_map(|(index, section)| {
                let problems = self.detect(section.text.as_deref().unwrap_or_default());
                (!problems.is_empty()).then(|| QualityFinding {
                    target: FindingTarget::Section(index),
                    title: section.title.clone(),
                    problems,
                })
            })
            .collect();

        let inline_tables = result
            .sections
            .iter()
            .filter_map(|s| s.text.as_deref())
            .any(|text| !table_lines(text).is_empty());
        if !inline_tables {
            findings.extend(result.tables.iter().enumerate().filter_map(|(index, table)| {
                let problems = self.detect_table(&table.to_markdown());
                (!problems.is_empty()).then(|| QualityFinding {
                    target: FindingTarget::Table(index),
                    title: None,
                    problems,
                })
            }));
        }

        if findings.is_empty() {
            tracing::debug!(
                sections = result.sections.len(),
                tables = result.tables.len(),
                "All sections passed quality checks"
            );
        } else {
            tracing::info!(
                flagged = findings.len(),
                sections = result.sections.len(),
                tables = result.tables.len(),
                "Quality problems detected"
            );
        }
        findings
    }
}

fn alphanumeric_count(text: &str) -> usize {
    text.chars().filter(|c| c.is_alphanumeric()).count()
}

fn table_lines(text: &str) -> Vec<&str> {
    text.lines().map(str::trim).filter(|l| l.starts_with('|')).collect()
}

fn inconsistent_columns(text: &str) -> bool {
    let lines = table_lines(text);
    if lines.len() < 3 {
        return false;
    }
    let counts: HashSet<usize> = lines.iter().map(|l| l.matches('|').count()).collect();
    counts.len() > 2
}

fn repeated_characters(text: &str) -> bool {
    let mut previous = None;
    let mut run = 0;
    for c in text.chars() {
        if Some(c) == previous {
            run += 1;
        } else {
            previous = Some(c);
            run = 1;
        }
        if run >= 10 && !FILLER_CHARS.contains(&c) {
            return true;
        }
    }
    false
}

fn garbled(text: &str) -> bool {
    let alphanumeric = alphanumeric_count(text);
    if alphanumeric == 0 {
        return true;
    }
    let special = text
        .chars()
        .filter(|c| !c.is_alphanumeric() && !COMMON_PUNCTUATION.contains(*c))
        .count();
    special * 5 > alphanumeric
}

fn header_only_table(text: &str) -> bool {
    let lines = table_lines(text);
    if lines.len() < 2 {
        return false;
    }
    lines
        .iter()
        .position(|l| l.contains("---"))
        .is_some_and(|separator| lines.len() - separator - 1 <= 1)
}

fn missing_keywords(text: &str) -> bool {
    if text.chars().count() < 500 {
        return false;
    }
    let lower = text.to_lowercase();
    !FINANCIAL_KEYWORDS.iter().any(|k| lower.contains(k))
}

fn malformed_separators(text: &str) -> bool {
    let lines = table_lines(text);
    if lines.len() < 2 {
        return false;
    }
    lines.iter().filter(|l| l.contains('-')).any(|separator| {
        let parts: Vec<&str> = separator.split('|').map(str::trim).filter(|p| !p.is_empty()).collect();
        if parts.is_empty() {
            return false;
        }
        let valid = parts
            .iter()
            .filter(|p| p.chars().all(|c| c == '-' || c == ' ' || c == ':'))
            .count();
        valid * 10 < parts.len() * 7
    })
}

fn duplicate_paragraphs(text: &str) -> bool {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for paragraph in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        *counts.entry(paragraph).or_insert(0) += 1;
    }
    counts
        .iter()
        .any(|(paragraph, &count)| count >= 3 && paragraph.chars().count() > 50)
}

fn unknown_characters(text: &str) -> bool {
    let total = text.chars().count();
    if total == 0 {
        return false;
    }
    let glyphs = text.chars().filter(|c| UNKNOWN_GLYPHS.contains(c)).count();
    let questions = STANDALONE_QUESTION.find_iter(text).count();
    (glyphs + questions) * 20 > total
}

fn repetitive_numbers(text: &str) -> bool {
    let mut run = 0;
    let mut previous: Option<(&str, usize)> = None;
    for m in NUMBER.find_iter(text) {
        let adjacent = previous.is_some_and(|(value, end)| {
            let gap = &text[end..m.start()];
            value == m.as_str() && !gap.is_empty() && gap.chars().all(|c| c.is_whitespace() || c == '|')
        });
        run = if adjacent { run + 1 } else { 1 };
        if run >= 3 {
            return true;
        }
        previous = Some((m.as_str(), m.end()));
    }
    false
}
