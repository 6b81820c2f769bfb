use std::time::Duration;

use crate::error::OpenAiError;

/// Settings for an Azure-style chat completions deployment.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Resource endpoint without a trailing slash.
    pub endpoint: String,
    /// Sent as the `api-key` header.
    pub api_key: String,
    /// Deployment name. Defaults to `gpt-4o`.
    pub deployment: String,
    /// Defaults to `2024-02-15-preview`.
    pub api_version: String,
    /// Defaults to 0.0 for deterministic extraction.
    pub temperature: f32,
    /// Defaults to 4096.
    pub max_tokens: u32,
    /// Per-request timeout. Defaults to 120 seconds.
    pub timeout: Duration,
}

impl OpenAiConfig {
    /// Creates a config with default deployment and limits.
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            deployment: "gpt-4o".to_string(),
            api_version: "2024-02-15-preview".to_string(),
            temperature: 0.0,
            max_tokens: 4096,
            timeout: Duration::from_secs(120),
        }
    }

    /// Overrides the deployment name.
    #[must_use]
    pub fn with_deployment(mut self, deployment: impl Into<String>) -> Self {
        self.deployment = deployment.into();
        self
    }

    /// Overrides the API version.
    #[must_use]
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Sets the completion token cap.
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Full chat completions URL for the deployment.
    #[must_use]
    pub fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint, self.deployment, self.api_version
        )
    }

    pub(crate) fn validate(&self) -> Result<(), OpenAiError> {
        if !self.endpoint.starts_with("http") {
            return Err(OpenAiError::InvalidConfig(format!("bad endpoint {:?}", self.endpoint)));
        }
        if self.api_key.trim().is_empty() {
            return Err(OpenAiError::InvalidConfig("api key is empty".into()));
        }
        if self.deployment.trim().is_empty() {
            return Err(OpenAiError::InvalidConfig("deployment is empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completions_url() {
        let config = OpenAiConfig::new("https://res.openai.azure.com/", "k").with_deployment("gpt-4o-mini");
        assert_eq!(
            config.completions_url(),
            "https://res.openai.azure.com/openai/deployments/gpt-4o-mini/chat/completions?api-version=2024-02-15-preview"
        );
    }

    #[test]
    fn test_validate() {
        assert!(OpenAiConfig::new("https://x", "k").validate().is_ok());
        assert!(OpenAiConfig::new("https://x", "").validate().is_err());
        assert!(OpenAiConfig::new("https://x", "k").with_deployment(" ").validate().is_err());
    }
}
