//! Canonical extraction schema shared by every provider.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::validation::normalize;

/// Identifier of an extraction backend.
///
/// Identifiers are open-ended so new adapters can be registered without
/// touching this crate; the well-known backends have constructors.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(String);

impl ProviderId {
    /// Document Intelligence-class layout service.
    pub const DOCUMENT_INTELLIGENCE: &'static str = "azure_document_intelligence";
    /// OpenAI-class chat completions.
    pub const OPENAI: &'static str = "openai";
    /// Gemini-class generateContent.
    pub const GEMINI: &'static str = "gemini";
    /// Mistral-class OCR.
    pub const MISTRAL: &'static str = "mistral";

    /// Creates an identifier, trimmed and lowercased.
    #[must_use]
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_ascii_lowercase())
    }

    /// The Document Intelligence-class backend.
    #[must_use]
    pub fn document_intelligence() -> Self {
        Self::new(Self::DOCUMENT_INTELLIGENCE)
    }

    /// The OpenAI-class backend.
    #[must_use]
    pub fn openai() -> Self {
        Self::new(Self::OPENAI)
    }

    /// The Gemini-class backend.
    #[must_use]
    pub fn gemini() -> Self {
        Self::new(Self::GEMINI)
    }

    /// The Mistral-class backend.
    #[must_use]
    pub fn mistral() -> Self {
        Self::new(Self::MISTRAL)
    }

    /// Borrows the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A typed value extracted for a labeled field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    /// Free text.
    Text(String),
    /// Plain number.
    Number(f64),
    /// Monetary amount with an optional ISO-ish currency code.
    Currency {
        /// The amount.
        amount: f64,
        /// Currency code (e.g. `ILS`, `USD`) when one was printed.
        currency: Option<String>,
    },
    /// Calendar date.
    Date(NaiveDate),
}

impl FieldValue {
    /// Shorthand for a text value.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Infers a typed value from a raw cell string.
    ///
    /// Returns `None` for blank input so absent cells stay absent.
    #[must_use]
    pub fn infer(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Some(date) = normalize::parse_date(trimmed) {
            return Some(Self::Date(date));
        }
        if let Some(currency) = normalize::detect_currency(trimmed) {
            if let Some(amount) = normalize::parse_number(trimmed) {
                return Some(Self::Currency {
                    amount,
                    currency: Some(currency.to_string()),
                });
            }
        }
        if let Some(number) = normalize::parse_number(trimmed) {
            return Some(Self::Number(number));
        }
        Some(Self::Text(trimmed.to_string()))
    }

    /// Numeric view of the value, parsing text when it holds a single number.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Currency { amount, .. } => Some(*amount),
            Self::Text(t) => normalize::parse_number(t),
            Self::Date(_) => None,
        }
    }

    /// Returns `true` for numbers and currency amounts.
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Number(_) | Self::Currency { .. })
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(t) => f.write_str(t),
            Self::Number(n) => write!(f, "{n}"),
            Self::Currency {
                amount,
                currency: Some(code),
            } => write!(f, "{amount} {code}"),
            Self::Currency { amount, currency: None } => write!(f, "{amount}"),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// Inclusive page range, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    /// First page.
    pub start: u32,
    /// Last page.
    pub end: u32,
}

impl PageRange {
    /// Creates a range, swapping the bounds if given in reverse.
    #[must_use]
    pub const fn new(start: u32, end: u32) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self { start: end, end: start }
        }
    }

    /// Single-page range.
    #[must_use]
    pub const fn single(page: u32) -> Self {
        Self { start: page, end: page }
    }
}

/// A section of the document body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Heading text, absent for untitled leading content.
    pub title: Option<String>,
    /// Heading depth (1 = top level).
    pub level: u8,
    /// Pages covered by the section.
    pub page_range: Option<PageRange>,
    /// Body text under the heading.
    pub text: Option<String>,
}

/// A table as an ordered list of labeled records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Table {
    /// Page the table starts on.
    pub page: Option<u32>,
    /// Column labels in printed order.
    pub headers: Vec<String>,
    /// One record per data row, keyed by column label.
    pub rows: Vec<BTreeMap<String, FieldValue>>,
}

impl Table {
    /// Renders the table as a markdown pipe table, columns in header order.
    ///
    /// Missing cells render empty.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let line = |cells: Vec<String>| format!("| {} |", cells.join(" | "));
        let mut lines = vec![
            line(self.headers.clone()),
            line(vec!["---".to_string(); self.headers.len()]),
        ];
        for row in &self.rows {
            lines.push(line(
                self.headers
                    .iter()
                    .map(|h| row.get(h).map(ToString::to_string).unwrap_or_default())
                    .collect(),
            ));
        }
        lines.join("\n")
    }
}

/// A node of the outline/bookmark tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineNode {
    /// Bookmark title.
    pub title: String,
    /// Nesting level as reported by the provider (not trusted).
    pub level: u8,
    /// Target page, when known.
    pub page: Option<u32>,
    /// Children in document order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<OutlineNode>,
}

impl OutlineNode {
    /// Creates a leaf node.
    #[must_use]
    pub fn new(title: impl Into<String>, level: u8, page: Option<u32>) -> Self {
        Self {
            title: title.into(),
            level,
            page,
            children: Vec::new(),
        }
    }

    /// Adds a child (builder style).
    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Builds a tree from a flat, document-ordered list of `(title, level, page)`.
    ///
    /// An entry becomes a child of the nearest preceding entry with a lower
    /// level; entries with no such predecessor become roots.
    #[must_use]
    pub fn build_tree<I, S>(entries: I) -> Vec<Self>
    where
        I: IntoIterator<Item = (S, u8, Option<u32>)>,
        S: Into<String>,
    {
        let mut roots: Vec<Self> = Vec::new();
        // Path of indices from a root down to the current insertion parent.
        let mut stack: Vec<(u8, usize)> = Vec::new();

        for (title, level, page) in entries {
            let node = Self::new(title, level, page);
            while stack.last().is_some_and(|&(l, _)| l >= level) {
                stack.pop();
            }

            let siblings = descend(&mut roots, &stack);
            siblings.push(node);
            let index = siblings.len() - 1;
            stack.push((level, index));
        }

        roots
    }
}

fn descend<'a>(roots: &'a mut Vec<OutlineNode>, stack: &[(u8, usize)]) -> &'a mut Vec<OutlineNode> {
    let mut current = roots;
    // The last stack entry is the parent; its children receive the new node.
    for &(_, index) in stack {
        current = &mut current[index].children;
    }
    current
}

/// Canonical result of one provider call.
///
/// Never mutated after an adapter produces it; comparison and merging work on
/// borrowed views and build new values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Backend that produced the result.
    pub provider: ProviderId,
    /// Document title.
    pub title: Option<String>,
    /// Detected or hinted language.
    pub language: Option<String>,
    /// Body sections in reading order.
    pub sections: Vec<Section>,
    /// Outline/bookmark tree.
    pub outline: Vec<OutlineNode>,
    /// Tables in reading order.
    pub tables: Vec<Table>,
    /// Key financial figures by label.
    pub figures: BTreeMap<String, FieldValue>,
}

impl ExtractionResult {
    /// Creates an empty result for `provider`.
    #[must_use]
    pub fn new(provider: ProviderId) -> Self {
        Self {
            provider,
            title: None,
            language: None,
            sections: Vec::new(),
            outline: Vec::new(),
            tables: Vec::new(),
            figures: BTreeMap::new(),
        }
    }

    /// Sets the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Adds a key figure.
    #[must_use]
    pub fn with_figure(mut self, label: impl Into<String>, value: FieldValue) -> Self {
        self.figures.insert(label.into(), value);
        self
    }

    /// Appends a section.
    #[must_use]
    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    /// Appends a table.
    #[must_use]
    pub fn with_table(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }

    /// Replaces the outline.
    #[must_use]
    pub fn with_outline(mut self, outline: Vec<OutlineNode>) -> Self {
        self.outline = outline;
        self
    }

    /// Full text of all sections joined with blank lines.
    #[must_use]
    pub fn full_text(&self) -> String {
        self.sections
            .iter()
            .filter_map(|s| s.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
