//! End-to-end tests against a live layout analysis resource.
//!
//! ## Requirements
//!
//! - `AZURE_DOCUMENT_INTELLIGENCE_ENDPOINT` and `AZURE_DOCUMENT_INTELLIGENCE_KEY` set
//! - `CROSSDOC_SAMPLE_PDF` pointing at a small PDF
//! - Network access
//!
//! ## Running
//!
//! ```bash
//! cargo test -p crossdoc-docintel -- --ignored
//! ```

use crossdoc_docintel::{DocIntelClient, DocIntelConfig, ParagraphRole};

fn live_client() -> Option<DocIntelClient> {
    let endpoint = std::env::var("AZURE_DOCUMENT_INTELLIGENCE_ENDPOINT").ok()?;
    let key = std::env::var("AZURE_DOCUMENT_INTELLIGENCE_KEY").ok()?;
    DocIntelClient::new(DocIntelConfig::new(endpoint, key)).ok()
}

#[tokio::test]
#[ignore = "Requires a live layout analysis resource"]
async fn e2e_analyze_sample_pdf() {
    let Some(client) = live_client() else {
        eprintln!("Skipping: credentials not set");
        return;
    };
    let Ok(path) = std::env::var("CROSSDOC_SAMPLE_PDF") else {
        eprintln!("Skipping: CROSSDOC_SAMPLE_PDF not set");
        return;
    };
    let pdf = std::fs::read(path).unwrap();

    let result = client.analyze(&pdf).await.unwrap();
    assert!(!result.pages.is_empty());
    assert!(!result.content.is_empty());
    let headings = result
        .paragraphs
        .iter()
        .filter(|p| matches!(p.role, Some(ParagraphRole::Title | ParagraphRole::SectionHeading)))
        .count();
    println!("pages={} headings={headings} tables={}", result.pages.len(), result.tables.len());
}

#[tokio::test]
#[ignore = "Requires a live layout analysis resource"]
async fn e2e_rejects_non_pdf_payload() {
    let Some(client) = live_client() else {
        eprintln!("Skipping: credentials not set");
        return;
    };
    let err = client.analyze(b"definitely not a pdf").await.unwrap_err();
    assert!(!err.is_transient(), "unexpected transient error: {err}");
}
