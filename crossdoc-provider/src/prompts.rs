//! Default extraction prompts for the LLM-backed validators.

/// Default system prompt for financial documents.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are an expert PDF content extractor. Your task is to extract the text content of a PDF document and convert it to clean markdown.

Key requirements:
1. Extract ALL text content. Do not skip anything.
2. Convert to clean, well-structured markdown.
3. Use proper markdown table syntax with | separators for tables.
4. Preserve document structure and hierarchy (headings, lists, paragraphs).
5. If a table cell looks empty, look carefully for faint content before leaving it blank.
6. Keep the original formatting and layout as closely as possible.
7. Do NOT add explanations or metadata. Return ONLY the extracted markdown.

Be thorough and accurate.";

/// Default user prompt for financial documents.
pub const DEFAULT_USER_PROMPT: &str = "\
Extract all text content from this PDF document and convert it to markdown. \
Start every page with a line of the form `# Page N`, where N is the page number. \
Include tables with proper markdown syntax. Do not skip any content. \
Preserve the original structure and formatting as much as possible.
The content is finance data, so be extra careful with tables and numbers.";

/// System and user prompt for one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompts {
    /// Instructions sent as the system message.
    pub system: String,
    /// Per-document extraction request.
    pub user: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            system: DEFAULT_SYSTEM_PROMPT.to_string(),
            user: DEFAULT_USER_PROMPT.to_string(),
        }
    }
}

impl Prompts {
    /// Defaults with optional overrides; blank overrides are ignored.
    #[must_use]
    pub fn with_overrides(system: Option<String>, user: Option<String>) -> Self {
        let defaults = Self::default();
        let pick = |value: Option<String>, fallback: String| {
            value.filter(|v| !v.trim().is_empty()).unwrap_or(fallback)
        };
        Self {
            system: pick(system, defaults.system),
            user: pick(user, defaults.user),
        }
    }

    /// System and user prompt joined for single-prompt APIs.
    #[must_use]
    pub fn combined(&self) -> String {
        format!("{}\n\n{}", self.system, self.user)
    }
}
