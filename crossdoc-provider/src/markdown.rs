//! Maps model-generated markdown onto the canonical extraction schema.
//!
//! - ATX headings open sections and outline entries; the first top-level
//!   heading before any section becomes the document title
//! - `# Page N` lines set the page for everything that follows
//! - pipe tables become typed [`Table`]s
//! - `label: value` lines and two-column table rows with numeric values become figures
//!
//! Section text keeps the raw markdown of its body, tables included.

use once_cell::sync::Lazy;
use regex::Regex;

use crossdoc_core::types::{ExtractionResult, FieldValue, OutlineNode, PageRange, ProviderId, Section, Table};

use crate::tables::{build_table, merge_continued, two_column_figures};

#[allow(clippy::expect_used)]
static HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(#{1,6})\s+(.+?)\s*#*\s*$").expect("heading regex"));

#[allow(clippy::expect_used)]
static PAGE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^#{1,6}\s*page\s+(\d+)\s*$").expect("page marker regex"));

#[allow(clippy::expect_used)]
static SEPARATOR_CELL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^:?-{1,}:?$").expect("separator regex"));

#[allow(clippy::expect_used)]
static FIGURE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[-*+]\s+)?\**([^:*|#][^:|]{0,79}?)\**\s*:\**\s+\**(.+?)\**\s*$").expect("figure regex")
});

/// Parses a single markdown document.
#[must_use]
pub fn parse(provider: ProviderId, markdown: &str) -> ExtractionResult {
    let mut mapper = MarkdownMapper::new(provider);
    mapper.push(markdown);
    mapper.finish()
}

/// Incremental mapper, fed one chunk (or page) at a time.
#[derive(Debug)]
pub struct MarkdownMapper {
    provider: ProviderId,
    page: Option<u32>,
    title: Option<String>,
    sections: Vec<Section>,
    current: Option<OpenSection>,
    outline: Vec<(String, u8, Option<u32>)>,
    tables: Vec<Table>,
    table_lines: Vec<String>,
    table_page: Option<u32>,
    figures: Vec<(String, FieldValue)>,
    text: String,
}

#[derive(Debug)]
struct OpenSection {
    title: Option<String>,
    level: u8,
    start: Option<u32>,
    end: Option<u32>,
    body: Vec<String>,
}

impl OpenSection {
    fn close(self) -> Option<Section> {
        let text = self.body.join("\n").trim().to_string();
        if self.title.is_none() && text.is_empty() {
            return None;
        }
        let page_range = self
            .start
            .map(|start| PageRange::new(start, self.end.unwrap_or(start)));
        Some(Section {
            title: self.title,
            level: self.level,
            page_range,
            text: (!text.is_empty()).then_some(text),
        })
    }
}

impl MarkdownMapper {
    /// Empty mapper producing a result for `provider`.
    #[must_use]
    pub const fn new(provider: ProviderId) -> Self {
        Self {
            provider,
            page: None,
            title: None,
            sections: Vec::new(),
            current: None,
            outline: Vec::new(),
            tables: Vec::new(),
            table_lines: Vec::new(),
            table_page: None,
            figures: Vec::new(),
            text: String::new(),
        }
    }

    /// Feeds one page of markdown with a known page number.
    pub fn push_page(&mut self, page: u32, markdown: &str) {
        self.flush_table();
        self.page = Some(page);
        self.push(markdown);
    }

    /// Feeds markdown; page markers inside it update the current page.
    pub fn push(&mut self, markdown: &str) {
        for line in markdown.lines() {
            self.line(line);
        }
        self.flush_table();
        self.text.push_str(markdown);
        self.text.push('\n');
    }

    fn line(&mut self, raw: &str) {
        let line = raw.trim();

        if line.starts_with('|') {
            if self.table_lines.is_empty() {
                self.table_page = self.page;
            }
            self.table_lines.push(line.to_string());
            self.body(raw);
            return;
        }
        self.flush_table();

        if let Some(caps) = PAGE_MARKER.captures(line) {
            if let Ok(page) = caps[1].parse() {
                self.page = Some(page);
            }
            return;
        }

        if let Some(caps) = HEADING.captures(line) {
            let level = u8::try_from(caps[1].len()).unwrap_or(6);
            let title = clean_inline(&caps[2]);
            if !title.is_empty() {
                self.heading(title, level);
                return;
            }
        }

        if let Some((label, value)) = figure(line) {
            self.figures.push((label, value));
        }
        self.body(raw);
    }

    fn heading(&mut self, title: String, level: u8) {
        self.outline.push((title.clone(), level, self.page));
        let preamble_empty = self
            .current
            .as_ref()
            .map_or(true, |s| s.title.is_none() && s.body.iter().all(|l| l.trim().is_empty()));
        if level == 1 && self.title.is_none() && self.sections.is_empty() && preamble_empty {
            self.title = Some(title);
            self.current = None;
            return;
        }
        self.close_section();
        self.current = Some(OpenSection {
            title: Some(title),
            level,
            start: self.page,
            end: self.page,
            body: Vec::new(),
        });
    }

    fn body(&mut self, raw: &str) {
        let page = self.page;
        let section = self.current.get_or_insert_with(|| OpenSection {
            title: None,
            level: 0,
            start: page,
            end: page,
            body: Vec::new(),
        });
        if page.is_some() && !raw.trim().is_empty() {
            section.end = page;
        }
        section.body.push(raw.trim_end().to_string());
    }

    fn close_section(&mut self) {
        if let Some(section) = self.current.take().and_then(OpenSection::close) {
            self.sections.push(section);
        }
    }

    fn flush_table(&mut self) {
        if self.table_lines.is_empty() {
            return;
        }
        let lines = std::mem::take(&mut self.table_lines);
        if let Some(table) = parse_table(self.table_page, &lines) {
            self.figures.extend(two_column_figures(&table));
            self.tables.push(table);
        }
    }

    /// Closes open state and builds the result.
    #[must_use]
    pub fn finish(mut self) -> ExtractionResult {
        self.flush_table();
        self.close_section();

        let mut result = ExtractionResult::new(self.provider);
        result.title = self.title;
        result.language = detect_language(&self.text).map(str::to_string);
        result.sections = self.sections;
        result.tables = merge_continued(self.tables);
        result.outline = OutlineNode::build_tree(self.outline);
        for (label, value) in self.figures {
            result.figures.entry(label).or_insert(value);
        }
        result
    }
}

/// Splits a pipe-table row into trimmed cells.
fn split_row(line: &str) -> Vec<String> {
    let inner = line.trim().trim_start_matches('|');
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').map(|c| clean_inline(c.trim())).collect()
}

fn is_separator(cells: &[String]) -> bool {
    !cells.is_empty() && cells.iter().all(|c| SEPARATOR_CELL.is_match(c.trim()))
}

fn parse_table(page: Option<u32>, lines: &[String]) -> Option<Table> {
    let mut rows = lines.iter().map(|l| split_row(l));
    let headers = rows.next()?;
    let body: Vec<Vec<String>> = rows.filter(|cells| !is_separator(cells)).collect();
    if is_separator(&headers) {
        return None;
    }
    Some(build_table(page, &headers, &body))
}

/// Parses a `label: value` line whose value is a number, currency amount or date.
fn figure(line: &str) -> Option<(String, FieldValue)> {
    let caps = FIGURE_LINE.captures(line)?;
    let label = caps[1].trim();
    if label.is_empty() || label.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    match FieldValue::infer(&caps[2])? {
        FieldValue::Text(_) => None,
        value => Some((label.to_string(), value)),
    }
}

/// Strips emphasis markers and collapses whitespace.
fn clean_inline(text: &str) -> String {
    text.replace("**", "")
        .replace("__", "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Guesses `he` or `en` from the dominant script.
#[must_use]
pub fn detect_language(text: &str) -> Option<&'static str> {
    let (hebrew, latin) = text.chars().fold((0usize, 0usize), |(h, l), c| {
        if ('\u{0590}'..='\u{05FF}').contains(&c) {
            (h + 1, l)
        } else if c.is_ascii_alphabetic() {
            (h, l + 1)
        } else {
            (h, l)
        }
    });
    match (hebrew, latin) {
        (0, 0) => None,
        (h, l) if h >= l => Some("he"),
        _ => Some("en"),
    }
}
