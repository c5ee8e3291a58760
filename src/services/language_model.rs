use async_trait::async_trait;

use crate::error::AppResult;

#[async_trait]
pub trait LanguageModelService: Send + Sync {
    /// One completion round trip; returns the raw model text.
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> AppResult<String>;
}
