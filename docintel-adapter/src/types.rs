//! Wire types for the layout analysis REST API.

use serde::{Deserialize, Serialize};

/// Body of the analyze request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    /// Base64-encoded document bytes.
    pub base64_source: String,
}

/// State of a long-running analyze operation.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum OperationStatus {
    /// Queued.
    NotStarted,
    /// In progress.
    Running,
    /// Finished with a result.
    Succeeded,
    /// Finished with an error.
    Failed,
    /// Cancelled server-side.
    Canceled,
}

impl OperationStatus {
    /// Whether polling should stop.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::NotStarted | Self::Running)
    }
}

/// Poll response for an analyze operation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeOperation {
    /// Current state.
    pub status: OperationStatus,
    /// Present once `status` is `succeeded`.
    #[serde(default)]
    pub analyze_result: Option<AnalyzeResult>,
    /// Present once `status` is `failed`.
    #[serde(default)]
    pub error: Option<ServiceError>,
}

/// Error body reported by the service.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceError {
    /// Machine-readable code.
    #[serde(default)]
    pub code: String,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Layout analysis output.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResult {
    /// Service API version that produced the result.
    #[serde(default)]
    pub api_version: String,
    /// Model that produced the result.
    #[serde(default)]
    pub model_id: String,
    /// Full document text in reading order.
    #[serde(default)]
    pub content: String,
    /// Pages in document order.
    #[serde(default)]
    pub pages: Vec<Page>,
    /// Paragraphs in reading order.
    #[serde(default)]
    pub paragraphs: Vec<Paragraph>,
    /// Detected tables.
    #[serde(default)]
    pub tables: Vec<TableData>,
    /// Languages detected in the content.
    #[serde(default)]
    pub languages: Vec<DetectedLanguage>,
}

impl AnalyzeResult {
    /// Most confident detected language.
    #[must_use]
    pub fn primary_language(&self) -> Option<&str> {
        self.languages
            .iter()
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
            .map(|l| l.locale.as_str())
    }
}

/// Page dimensions.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// One-based page number.
    pub page_number: u32,
    /// Page width in `unit`.
    #[serde(default)]
    pub width: Option<f64>,
    /// Page height in `unit`.
    #[serde(default)]
    pub height: Option<f64>,
    /// Measurement unit, `inch` or `pixel`.
    #[serde(default)]
    pub unit: Option<String>,
}

/// Location of an element on a page.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingRegion {
    /// One-based page number.
    pub page_number: u32,
    /// Corner coordinates as flat x,y pairs.
    #[serde(default)]
    pub polygon: Vec<f64>,
}

/// A range of `AnalyzeResult::content`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Span {
    /// Start offset in characters.
    pub offset: usize,
    /// Length in characters.
    pub length: usize,
}

impl Span {
    /// Whether `other` lies entirely inside this span.
    #[must_use]
    pub const fn contains(&self, other: &Self) -> bool {
        other.offset >= self.offset && other.offset + other.length <= self.offset + self.length
    }
}

/// Semantic role assigned to a paragraph.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParagraphRole {
    /// Document title.
    Title,
    /// Heading that starts a section.
    SectionHeading,
    /// Running page header.
    PageHeader,
    /// Running page footer.
    PageFooter,
    /// Printed page number.
    PageNumber,
    /// Footnote text.
    Footnote,
    /// Display formula.
    FormulaBlock,
    /// Any role this client does not know.
    #[serde(other)]
    Other,
}

/// A block of text in reading order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paragraph {
    /// `None` for body text.
    #[serde(default)]
    pub role: Option<ParagraphRole>,
    /// Paragraph text.
    pub content: String,
    /// Where the paragraph sits on the page.
    #[serde(default)]
    pub bounding_regions: Vec<BoundingRegion>,
    /// Ranges of the document content covered.
    #[serde(default)]
    pub spans: Vec<Span>,
}

impl Paragraph {
    /// First page the paragraph appears on.
    #[must_use]
    pub fn page(&self) -> Option<u32> {
        self.bounding_regions.first().map(|r| r.page_number)
    }
}

/// Role of a table cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CellKind {
    /// Body cell.
    Content,
    /// Column header.
    ColumnHeader,
    /// Row header.
    RowHeader,
    /// Top-left header cell.
    StubHead,
    /// Caption or note cell.
    Description,
    /// Any kind this client does not know.
    #[serde(other)]
    Other,
}

/// One table cell.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableCell {
    /// Cell role. `None` for body cells.
    #[serde(default)]
    pub kind: Option<CellKind>,
    /// Zero-based row.
    pub row_index: u32,
    /// Zero-based column.
    pub column_index: u32,
    /// Rows covered by the cell.
    #[serde(default = "one")]
    pub row_span: u32,
    /// Columns covered by the cell.
    #[serde(default = "one")]
    pub column_span: u32,
    /// Cell text.
    #[serde(default)]
    pub content: String,
}

const fn one() -> u32 {
    1
}

/// A detected table.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableData {
    /// Number of rows.
    pub row_count: u32,
    /// Number of columns.
    pub column_count: u32,
    /// Cells in row-major order.
    #[serde(default)]
    pub cells: Vec<TableCell>,
    /// Where the table sits on the page.
    #[serde(default)]
    pub bounding_regions: Vec<BoundingRegion>,
    /// Ranges of the document content covered.
    #[serde(default)]
    pub spans: Vec<Span>,
}

impl TableData {
    /// First page the table appears on.
    #[must_use]
    pub fn page(&self) -> Option<u32> {
        self.bounding_regions.first().map(|r| r.page_number)
    }

    /// Whether a paragraph's text belongs to this table.
    #[must_use]
    pub fn covers(&self, paragraph: &Paragraph) -> bool {
        paragraph
            .spans
            .iter()
            .any(|p| self.spans.iter().any(|t| t.contains(p)))
    }

    /// Whether any cell is marked as a column header.
    #[must_use]
    pub fn has_header_cells(&self) -> bool {
        self.cells.iter().any(|c| c.kind == Some(CellKind::ColumnHeader))
    }

    /// Column headers: the `columnHeader` cells, or the first row when none are marked.
    #[must_use]
    pub fn headers(&self) -> Vec<String> {
        let mut cells: Vec<&TableCell> = if self.has_header_cells() {
            self.cells
                .iter()
                .filter(|c| c.kind == Some(CellKind::ColumnHeader))
                .collect()
        } else {
            self.cells.iter().filter(|c| c.row_index == 0).collect()
        };
        cells.sort_by_key(|c| (c.row_index, c.column_index));
        let mut seen = std::collections::BTreeSet::new();
        cells
            .into_iter()
            .filter(|c| seen.insert(c.column_index))
            .map(|c| c.content.trim().to_string())
            .collect()
    }

    /// Body rows as cell text ordered by column.
    #[must_use]
    pub fn data_rows(&self) -> Vec<Vec<String>> {
        let first = if self.has_header_cells() {
            self.cells
                .iter()
                .filter(|c| c.kind == Some(CellKind::ColumnHeader))
                .map(|c| c.row_index + c.row_span)
                .max()
                .unwrap_or(0)
        } else {
            1
        };
        (first..self.row_count)
            .map(|row| {
                let mut cells: Vec<&TableCell> =
                    self.cells.iter().filter(|c| c.row_index == row).collect();
                cells.sort_by_key(|c| c.column_index);
                cells.into_iter().map(|c| c.content.trim().to_string()).collect()
            })
            .filter(|row: &Vec<String>| row.iter().any(|cell| !cell.is_empty()))
            .collect()
    }
}

/// A language detected in the content.
#[derive(Debug, Clone, Deserialize)]
pub struct DetectedLanguage {
    /// BCP 47 locale.
    pub locale: String,
    /// Detection confidence between 0 and 1.
    #[serde(default)]
    pub confidence: f64,
}
