use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Sampling knobs for a single generation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GenerateOptions {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl GenerateOptions {
    pub fn new(temperature: f32, max_output_tokens: u32) -> Self {
        Self { temperature, max_output_tokens }
    }
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self { temperature: 0.7, max_output_tokens: 1024 }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("llm quota or rate limit exceeded: {0}")]
    QuotaExceeded(String),
    #[error("llm call timed out after {0:?}")]
    Timeout(Duration),
    #[error("llm provider failure: {0}")]
    Provider(String),
    #[error("llm returned an unusable response: {0}")]
    InvalidResponse(String),
}

impl LlmError {
    /// Quota and timeout failures take the deterministic fallback path.
    pub fn is_fallback_eligible(&self) -> bool {
        matches!(self, Self::QuotaExceeded(_) | Self::Timeout(_))
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String, LlmError>;
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::LlmError;

    #[test]
    fn only_quota_and_timeout_are_fallback_eligible() {
        assert!(LlmError::QuotaExceeded("429".to_owned()).is_fallback_eligible());
        assert!(LlmError::Timeout(Duration::from_secs(20)).is_fallback_eligible());
        assert!(!LlmError::Provider("500".to_owned()).is_fallback_eligible());
        assert!(!LlmError::InvalidResponse("empty".to_owned()).is_fallback_eligible());
    }
}
