use std::time::Duration;

use async_trait::async_trait;

use crossdoc_core::document::Document;
use crossdoc_core::provider::{DocumentProvider, ProviderError};
use crossdoc_core::types::{ExtractionResult, FieldValue, OutlineNode, PageRange, ProviderId, Section};
use crossdoc_docintel::types::{AnalyzeResult, Paragraph, ParagraphRole};
use crossdoc_docintel::DocIntelClient;

use super::provider_error;
use crate::tables::{build_table, merge_continued, two_column_figures};

/// Primary provider backed by layout analysis.
#[derive(Debug, Clone)]
pub struct DocIntelProvider {
    id: ProviderId,
    client: DocIntelClient,
}

impl DocIntelProvider {
    /// Wraps a layout client.
    #[must_use]
    pub fn new(client: DocIntelClient) -> Self {
        Self {
            id: ProviderId::document_intelligence(),
            client,
        }
    }
}

#[async_trait]
impl DocumentProvider for DocIntelProvider {
    fn id(&self) -> &ProviderId {
        &self.id
    }

    async fn extract(&self, document: &Document) -> Result<ExtractionResult, ProviderError> {
        let layout = self
            .client
            .analyze(document.bytes())
            .await
            .map_err(|e| provider_error(&self.id, &e))?;
        Ok(map_layout(self.id.clone(), &layout))
    }

    fn attempt_timeout(&self) -> Option<Duration> {
        Some(self.client.config().analysis_budget())
    }
}

struct Draft {
    title: Option<String>,
    level: u8,
    start: Option<u32>,
    end: Option<u32>,
    body: Vec<String>,
}

impl Draft {
    fn into_section(self) -> Option<Section> {
        if self.title.is_none() && self.body.is_empty() {
            return None;
        }
        let text = self.body.join("\n\n");
        Some(Section {
            title: self.title,
            level: self.level,
            page_range: self.start.map(|s| PageRange::new(s, self.end.unwrap_or(s))),
            text: (!text.is_empty()).then_some(text),
        })
    }
}

/// Maps a layout result onto the canonical schema.
///
/// The `title` paragraph becomes the document title and the level 1 outline
/// root; section headings sit at level 2 beneath it (level 1 without a title).
/// Body paragraphs belong to the preceding heading. Page furniture and text
/// inside tables is skipped.
#[must_use]
pub fn map_layout(provider: ProviderId, layout: &AnalyzeResult) -> ExtractionResult {
    let mut result = ExtractionResult::new(provider);
    result.language = layout.primary_language().map(str::to_string);

    let has_title = layout
        .paragraphs
        .iter()
        .any(|p| p.role == Some(ParagraphRole::Title));
    let heading_level = if has_title { 2 } else { 1 };

    let mut outline = Vec::new();
    let mut sections = Vec::new();
    let mut current: Option<Draft> = None;

    for paragraph in &layout.paragraphs {
        if in_table(layout, paragraph) {
            continue;
        }
        let content = paragraph.content.trim();
        if content.is_empty() {
            continue;
        }
        match paragraph.role {
            Some(ParagraphRole::PageHeader | ParagraphRole::PageFooter | ParagraphRole::PageNumber) => {}
            Some(ParagraphRole::Title) if result.title.is_none() => {
                result.title = Some(content.to_string());
                outline.push((content.to_string(), 1, paragraph.page()));
            }
            Some(ParagraphRole::Title | ParagraphRole::SectionHeading) => {
                if let Some(section) = current.take().and_then(Draft::into_section) {
                    sections.push(section);
                }
                outline.push((content.to_string(), heading_level, paragraph.page()));
                current = Some(Draft {
                    title: Some(content.to_string()),
                    level: heading_level,
                    start: paragraph.page(),
                    end: paragraph.page(),
                    body: Vec::new(),
                });
            }
            _ => {
                let draft = current.get_or_insert_with(|| Draft {
                    title: None,
                    level: 0,
                    start: paragraph.page(),
                    end: paragraph.page(),
                    body: Vec::new(),
                });
                if draft.start.is_none() {
                    draft.start = paragraph.page();
                }
                if paragraph.page().is_some() {
                    draft.end = paragraph.page();
                }
                draft.body.push(content.to_string());
                if let Some((label, value)) = label_value(content) {
                    result.figures.entry(label).or_insert(value);
                }
            }
        }
    }
    if let Some(section) = current.and_then(Draft::into_section) {
        sections.push(section);
    }

    let tables = layout
        .tables
        .iter()
        .map(|t| build_table(t.page(), &t.headers(), &t.data_rows()))
        .collect();
    let tables = merge_continued(tables);
    for table in &tables {
        for (label, value) in two_column_figures(table) {
            result.figures.entry(label).or_insert(value);
        }
    }

    result.sections = sections;
    result.tables = tables;
    result.outline = OutlineNode::build_tree(outline);
    result
}

fn in_table(layout: &AnalyzeResult, paragraph: &Paragraph) -> bool {
    !paragraph.spans.is_empty() && layout.tables.iter().any(|t| t.covers(paragraph))
}

/// `label: value` paragraphs with a non-text value.
fn label_value(content: &str) -> Option<(String, FieldValue)> {
    let (label, value) = content.split_once(':')?;
    let label = label.trim();
    if label.is_empty() || label.chars().count() > 80 || value.trim().is_empty() {
        return None;
    }
    match FieldValue::infer(value)? {
        FieldValue::Text(_) => None,
        value => Some((label.to_string(), value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(json: &str) -> AnalyzeResult {
        serde_json::from_str(json).unwrap()
    }

    const LAYOUT: &str = r#"{
        "content": "...",
        "pages": [{"pageNumber": 1}, {"pageNumber": 2}, {"pageNumber": 3}],
        "paragraphs": [
            {"role": "pageHeader", "content": "ACME Ltd", "boundingRegions": [{"pageNumber": 1}]},
            {"role": "title", "content": "Annual Report", "boundingRegions": [{"pageNumber": 1}]},
            {"role": "sectionHeading", "content": "Revenue", "boundingRegions": [{"pageNumber": 1}]},
            {"content": "Revenue grew.", "boundingRegions": [{"pageNumber": 1}]},
            {"content": "Total revenue: $1,234", "boundingRegions": [{"pageNumber": 2}]},
            {"content": "1,000", "boundingRegions": [{"pageNumber": 2}], "spans": [{"offset": 510, "length": 5}]},
            {"role": "pageNumber", "content": "2", "boundingRegions": [{"pageNumber": 2}]},
            {"role": "sectionHeading", "content": "Outlook", "boundingRegions": [{"pageNumber": 3}]},
            {"content": "Stable.", "boundingRegions": [{"pageNumber": 3}]}
        ],
        "tables": [
            {"rowCount": 2, "columnCount": 2,
             "cells": [
                {"kind": "columnHeader", "rowIndex": 0, "columnIndex": 0, "content": "Item"},
                {"kind": "columnHeader", "rowIndex": 0, "columnIndex": 1, "content": "2024"},
                {"rowIndex": 1, "columnIndex": 0, "content": "Sales"},
                {"rowIndex": 1, "columnIndex": 1, "content": "1,000"}
             ],
             "boundingRegions": [{"pageNumber": 2}],
             "spans": [{"offset": 500, "length": 40}]},
            {"rowCount": 2, "columnCount": 2,
             "cells": [
                {"kind": "columnHeader", "rowIndex": 0, "columnIndex": 0, "content": "Item"},
                {"kind": "columnHeader", "rowIndex": 0, "columnIndex": 1, "content": "2024"},
                {"rowIndex": 1, "columnIndex": 0, "content": "Costs"},
                {"rowIndex": 1, "columnIndex": 1, "content": "(300)"}
             ],
             "boundingRegions": [{"pageNumber": 3}]}
        ],
        "languages": [{"locale": "en", "confidence": 0.98}]
    }"#;

    #[test]
    fn test_title_sections_and_outline() {
        let result = map_layout(ProviderId::document_intelligence(), &layout(LAYOUT));
        assert_eq!(result.title.as_deref(), Some("Annual Report"));
        assert_eq!(result.language.as_deref(), Some("en"));
        assert_eq!(result.sections.len(), 2);

        let revenue = &result.sections[0];
        assert_eq!(revenue.title.as_deref(), Some("Revenue"));
        assert_eq!(revenue.level, 2);
        assert_eq!(revenue.page_range, Some(PageRange::new(1, 2)));
        assert_eq!(revenue.text.as_deref(), Some("Revenue grew.\n\nTotal revenue: $1,234"));

        assert_eq!(result.outline.len(), 1);
        assert_eq!(result.outline[0].level, 1);
        let children: Vec<_> = result.outline[0].children.iter().map(|c| (c.title.as_str(), c.level, c.page)).collect();
        assert_eq!(children, vec![("Revenue", 2, Some(1)), ("Outlook", 2, Some(3))]);
    }

    #[test]
    fn test_tables_merged_across_pages() {
        let result = map_layout(ProviderId::document_intelligence(), &layout(LAYOUT));
        assert_eq!(result.tables.len(), 1);
        let table = &result.tables[0];
        assert_eq!(table.page, Some(2));
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1].get("2024"), Some(&FieldValue::Number(-300.0)));
    }

    #[test]
    fn test_figures_from_paragraphs_and_tables() {
        let result = map_layout(ProviderId::document_intelligence(), &layout(LAYOUT));
        assert_eq!(
            result.figures.get("Total revenue"),
            Some(&FieldValue::Currency {
                amount: 1234.0,
                currency: Some("USD".into())
            })
        );
        assert_eq!(result.figures.get("Sales"), Some(&FieldValue::Number(1000.0)));
        assert_eq!(result.figures.get("Costs"), Some(&FieldValue::Number(-300.0)));
    }

    #[test]
    fn test_headings_without_title_are_level_one() {
        let result = map_layout(
            ProviderId::document_intelligence(),
            &layout(r#"{"paragraphs": [
                {"role": "sectionHeading", "content": "Intro"},
                {"content": "Text"}
            ]}"#),
        );
        assert_eq!(result.title, None);
        assert_eq!(result.sections[0].level, 1);
        assert_eq!(result.outline[0].level, 1);
        assert_eq!(result.sections[0].page_range, None);
    }

    #[test]
    fn test_attempt_timeout_spans_polling() {
        let config = crossdoc_docintel::DocIntelConfig::new("https://di.example.com", "k")
            .with_request_timeout(Duration::from_secs(60));
        let provider = DocIntelProvider::new(DocIntelClient::new(config).unwrap());
        assert_eq!(provider.attempt_timeout(), Some(Duration::from_secs(180)));
    }

    #[test]
    fn test_quality_scan_sees_layout_tables() {
        use crossdoc_core::quality::{FindingTarget, Problem, QualityDetector};

        let mut cells = vec![
            r#"{"kind": "columnHeader", "rowIndex": 0, "columnIndex": 0, "content": "Item"}"#.to_string(),
            r#"{"kind": "columnHeader", "rowIndex": 0, "columnIndex": 1, "content": "Note"}"#.to_string(),
        ];
        for row in 1..=5 {
            cells.push(format!(r#"{{"rowIndex": {row}, "columnIndex": 0, "content": "fee"}}"#));
            cells.push(format!(r#"{{"rowIndex": {row}, "columnIndex": 1, "content": "waived"}}"#));
        }
        let json = format!(
            r#"{{"paragraphs": [{{"role": "sectionHeading", "content": "Fees"}}, {{"content": "{}"}}],
                "tables": [{{"rowCount": 6, "columnCount": 2, "cells": [{}]}}]}}"#,
            vec!["balance"; 30].join(" "),
            cells.join(",")
        );
        let result = map_layout(ProviderId::document_intelligence(), &layout(&json));
        assert!(result.sections.iter().all(|s| !s.text.as_deref().unwrap_or_default().contains('|')));

        let findings = QualityDetector::default().scan(&result);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].target, FindingTarget::Table(0));
        assert_eq!(findings[0].problems, vec![Problem::MissingNumbers]);
    }

    #[test]
    fn test_empty_layout() {
        let result = map_layout(ProviderId::document_intelligence(), &AnalyzeResult::default());
        assert!(result.sections.is_empty());
        assert!(result.outline.is_empty());
        assert_eq!(result.language, None);
    }
}
