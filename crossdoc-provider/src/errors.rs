use thiserror::Error;

/// Errors raised while assembling or running the pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or incomplete settings.
    #[error("Settings error: {0}")]
    Settings(#[from] crate::settings::SettingsError),

    /// Layout client construction failed.
    #[error("Document Intelligence client error: {0}")]
    DocIntel(#[from] crossdoc_docintel::DocIntelError),

    /// Chat completions client construction failed.
    #[error("OpenAI client error: {0}")]
    OpenAi(#[from] crossdoc_openai::OpenAiError),

    /// generateContent client construction failed.
    #[error("Gemini client error: {0}")]
    Gemini(#[from] crossdoc_gemini::GeminiError),

    /// OCR client construction failed.
    #[error("Mistral client error: {0}")]
    Mistral(#[from] crossdoc_mistral::MistralError),

    /// The pipeline run failed.
    #[error(transparent)]
    Pipeline(#[from] crossdoc_core::extraction::OrchestratorError),

    /// Reading the input failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
