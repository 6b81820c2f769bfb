use std::time::Duration;

use crate::error::DocIntelError;

/// Connection settings for the layout analysis service.
#[derive(Debug, Clone)]
pub struct DocIntelConfig {
    /// Resource endpoint, e.g. `https://my-resource.cognitiveservices.azure.com`.
    pub endpoint: String,
    /// Subscription key.
    pub api_key: String,
    /// Analysis model. Defaults to `prebuilt-layout`.
    pub model: String,
    /// REST API version. Defaults to `2024-11-30`.
    pub api_version: String,
    /// Delay between result polls. Defaults to 2 seconds.
    pub poll_interval: Duration,
    /// Polls before giving up. Defaults to 60.
    pub max_polls: u32,
    /// Timeout for each individual HTTP request. Defaults to 120 seconds.
    pub request_timeout: Duration,
}

impl DocIntelConfig {
    /// Creates a config with default model and polling.
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: "prebuilt-layout".to_string(),
            api_version: "2024-11-30".to_string(),
            poll_interval: Duration::from_secs(2),
            max_polls: 60,
            request_timeout: Duration::from_secs(120),
        }
    }

    /// Overrides the analysis model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the poll interval and the maximum number of polls.
    #[must_use]
    pub const fn with_polling(mut self, interval: Duration, max_polls: u32) -> Self {
        self.poll_interval = interval;
        self.max_polls = max_polls;
        self
    }

    /// Sets the timeout for each HTTP request.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Upper bound for one `analyze` call: the submit request plus the full
    /// polling window.
    #[must_use]
    pub fn analysis_budget(&self) -> Duration {
        self.request_timeout
            .saturating_add(self.poll_interval.saturating_mul(self.max_polls))
    }

    /// URL the analyze request is posted to.
    #[must_use]
    pub fn analyze_url(&self) -> String {
        format!(
            "{}/documentintelligence/documentModels/{}:analyze?api-version={}",
            self.endpoint, self.model, self.api_version
        )
    }

    pub(crate) fn validate(&self) -> Result<(), DocIntelError> {
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(DocIntelError::InvalidConfig(format!(
                "endpoint must be an http(s) URL, got {:?}",
                self.endpoint
            )));
        }
        if self.api_key.trim().is_empty() {
            return Err(DocIntelError::InvalidConfig("api key is empty".into()));
        }
        if self.max_polls == 0 {
            return Err(DocIntelError::InvalidConfig("max_polls must be at least 1".into()));
        }
        Ok(())
    }
}
