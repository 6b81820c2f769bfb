use serde::{Deserialize, Serialize};

/// Body of an OCR call.
#[derive(Debug, Clone, Serialize)]
pub struct OcrRequest {
    /// OCR model name.
    pub model: String,
    /// Document to read.
    pub document: DocumentInput,
    /// Whether to return page images.
    pub include_image_base64: bool,
}

/// Document source.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DocumentInput {
    /// Document passed by URL.
    DocumentUrl {
        /// `https:` or `data:` URL.
        document_url: String,
    },
}

impl DocumentInput {
    /// Wraps base64 PDF bytes in a `data:` URL.
    #[must_use]
    pub fn pdf(base64: &str) -> Self {
        Self::DocumentUrl {
            document_url: format!("data:application/pdf;base64,{base64}"),
        }
    }
}

/// Body returned by the OCR endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct OcrResponse {
    /// Model that produced the pages.
    #[serde(default)]
    pub model: String,
    /// Pages, not necessarily in order.
    #[serde(default)]
    pub pages: Vec<OcrPage>,
    /// Usage accounting.
    #[serde(default)]
    pub usage_info: Option<UsageInfo>,
}

impl OcrResponse {
    /// Pages sorted by index.
    #[must_use]
    pub fn ordered_pages(&self) -> Vec<&OcrPage> {
        let mut pages: Vec<&OcrPage> = self.pages.iter().collect();
        pages.sort_by_key(|p| p.index);
        pages
    }
}

/// One page of OCR output. `index` is zero-based.
#[derive(Debug, Clone, Deserialize)]
pub struct OcrPage {
    /// Zero-based page index.
    pub index: u32,
    /// Page content as markdown.
    #[serde(default)]
    pub markdown: String,
    /// Page size.
    #[serde(default)]
    pub dimensions: Option<Dimensions>,
}

impl OcrPage {
    /// One-based page number.
    #[must_use]
    pub const fn number(&self) -> u32 {
        self.index + 1
    }
}

/// Rendered page size.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Dimensions {
    /// Resolution.
    pub dpi: u32,
    /// Height in pixels.
    pub height: u32,
    /// Width in pixels.
    pub width: u32,
}

/// Usage accounting.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct UsageInfo {
    /// Pages billed.
    #[serde(default)]
    pub pages_processed: u32,
    /// Input size in bytes.
    #[serde(default)]
    pub doc_size_bytes: u64,
}
