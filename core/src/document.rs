//! Input document handling.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Default upload limit in megabytes.
pub const DEFAULT_MAX_UPLOAD_MB: usize = 25;
/// Default page limit.
pub const DEFAULT_MAX_PAGES: u32 = 600;

const PDF_SIGNATURE: &[u8] = b"%PDF-";

/// Errors raised while accepting an input document.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// The file contained no bytes.
    #[error("document is empty")]
    Empty,
    /// The bytes do not start with the PDF signature.
    #[error("document is not a PDF (missing %PDF- signature)")]
    NotPdf,
    /// The document exceeds the configured size.
    #[error("document is {size} bytes, limit is {limit} bytes")]
    TooLarge {
        /// Actual size in bytes.
        size: usize,
        /// Configured limit in bytes.
        limit: usize,
    },
    /// The document has more pages than allowed.
    #[error("document has {pages} pages, limit is {limit}")]
    TooManyPages {
        /// Declared page count.
        pages: u32,
        /// Configured limit.
        limit: u32,
    },
}

/// Limits applied when a document is accepted.
#[derive(Debug, Clone, Copy)]
pub struct DocumentLimits {
    /// Maximum size in bytes.
    ///
    /// Default: 25 MB
    pub max_bytes: usize,
    /// Maximum page count, checked when the page count is known.
    ///
    /// Default: 600
    pub max_pages: u32,
}

impl Default for DocumentLimits {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

/// Optional facts about a document known before extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Page count, when known.
    pub page_count: Option<u32>,
    /// Expected language (e.g. `he`, `en`).
    pub language_hint: Option<String>,
    /// Original file name.
    pub filename: Option<String>,
}

/// An immutable PDF shared by every provider call of a run.
///
/// Cloning is cheap: the bytes are reference counted.
#[derive(Debug, Clone)]
pub struct Document {
    bytes: Arc<[u8]>,
    metadata: DocumentMetadata,
}

impl Document {
    /// Accepts `bytes` under the default limits.
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentError`] when the bytes are empty, not a PDF, or too large.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self, DocumentError> {
        Self::with_limits(bytes, DocumentMetadata::default(), DocumentLimits::default())
    }

    /// Accepts `bytes` with metadata under explicit limits.
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentError`] when any limit is violated.
    pub fn with_limits(
        bytes: impl Into<Vec<u8>>,
        metadata: DocumentMetadata,
        limits: DocumentLimits,
    ) -> Result<Self, DocumentError> {
        let bytes: Vec<u8> = bytes.into();
        if bytes.is_empty() {
            return Err(DocumentError::Empty);
        }
        if !bytes.starts_with(PDF_SIGNATURE) {
            return Err(DocumentError::NotPdf);
        }
        if bytes.len() > limits.max_bytes {
            return Err(DocumentError::TooLarge {
                size: bytes.len(),
                limit: limits.max_bytes,
            });
        }
        if let Some(pages) = metadata.page_count {
            if pages > limits.max_pages {
                return Err(DocumentError::TooManyPages {
                    pages,
                    limit: limits.max_pages,
                });
            }
        }

        Ok(Self {
            bytes: bytes.into(),
            metadata,
        })
    }

    /// Raw PDF bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always `false` for an accepted document.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Document metadata.
    #[must_use]
    pub const fn metadata(&self) -> &DocumentMetadata {
        &self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &[u8] = b"%PDF-1.7\n%%EOF";

    #[test]
    fn test_accepts_pdf() {
        let doc = Document::from_bytes(MINIMAL).unwrap();
        assert_eq!(doc.len(), MINIMAL.len());
        assert!(doc.metadata().filename.is_none());
    }

    #[test]
    fn test_rejects_empty_and_non_pdf() {
        assert_eq!(Document::from_bytes(Vec::new()).unwrap_err(), DocumentError::Empty);
        assert_eq!(
            Document::from_bytes(b"PK\x03\x04".to_vec()).unwrap_err(),
            DocumentError::NotPdf
        );
    }

    #[test]
    fn test_enforces_limits() {
        let limits = DocumentLimits {
            max_bytes: 8,
            max_pages: 2,
        };
        let err = Document::with_limits(MINIMAL, DocumentMetadata::default(), limits).unwrap_err();
        assert!(matches!(err, DocumentError::TooLarge { limit: 8, .. }));

        let metadata = DocumentMetadata {
            page_count: Some(3),
            ..DocumentMetadata::default()
        };
        let limits = DocumentLimits {
            max_bytes: 1024,
            max_pages: 2,
        };
        let err = Document::with_limits(MINIMAL, metadata, limits).unwrap_err();
        assert_eq!(err, DocumentError::TooManyPages { pages: 3, limit: 2 });
    }
}
