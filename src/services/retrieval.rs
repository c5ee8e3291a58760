use async_trait::async_trait;

use crate::domain::retrieval::DocumentationSnippet;
use crate::error::AppResult;

#[async_trait]
pub trait RetrievalService: Send + Sync {
    async fn search(
        &self,
        access_token: &str,
        query: &str,
        max_items: usize,
        min_score: f64,
    ) -> AppResult<Vec<DocumentationSnippet>>;
}
