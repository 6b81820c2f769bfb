//! End-to-end test against the live generateContent API.
//!
//! Requires `GEMINI_API_KEY` and `CROSSDOC_SAMPLE_PDF`.
//! Run with `cargo test -p crossdoc-gemini -- --ignored`.

use crossdoc_gemini::{GeminiClient, GeminiConfig, GeminiError};

fn live_client() -> Option<GeminiClient> {
    let key = std::env::var("GEMINI_API_KEY").ok()?;
    let mut config = GeminiConfig::new(key);
    if let Ok(model) = std::env::var("GEMINI_MODEL") {
        config = config.with_model(model);
    }
    GeminiClient::new(config).ok()
}

#[tokio::test]
#[ignore = "Requires GEMINI_API_KEY and network access"]
async fn e2e_generate_markdown() {
    let Some(client) = live_client() else {
        eprintln!("Skipping: GEMINI_API_KEY not set");
        return;
    };
    let Ok(path) = std::env::var("CROSSDOC_SAMPLE_PDF") else {
        eprintln!("Skipping: CROSSDOC_SAMPLE_PDF not set");
        return;
    };
    let pdf = std::fs::read(path).unwrap();
    let markdown = client
        .generate_markdown("Extract all content from this PDF as markdown.", &pdf)
        .await
        .unwrap();
    assert!(!markdown.is_empty());
}

#[tokio::test]
#[ignore = "Requires network access"]
async fn e2e_bad_key_is_permanent() {
    let client = GeminiClient::new(GeminiConfig::new("invalid-key")).unwrap();
    let err = client.generate_markdown("hi", b"%PDF-1.4").await.unwrap_err();
    assert!(matches!(err, GeminiError::Status { .. }));
    assert!(!err.is_transient());
}
