use async_trait::async_trait;
use reqwest::{Client, header::ACCEPT};
use serde::Deserialize;

use crate::domain::retrieval::DocumentationSnippet;
use crate::error::{AppError, AppResult};
use crate::infra::read_body;
use crate::services::RetrievalService;

/// Client for the documentation search service.
pub struct RetrievalClient {
    http: Client,
    base_url: String,
}

impl RetrievalClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
        }
    }

    fn search_endpoint(&self) -> String {
        format!("{}/search", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl RetrievalService for RetrievalClient {
    async fn search(
        &self,
        access_token: &str,
        query: &str,
        max_items: usize,
        min_score: f64,
    ) -> AppResult<Vec<DocumentationSnippet>> {
        let response = self
            .http
            .get(self.search_endpoint())
            .query(&[
                ("query", query.to_string()),
                ("max_items", max_items.to_string()),
                ("min_score", min_score.to_string()),
            ])
            .bearer_auth(access_token)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|err| AppError::Retrieval(format!("failed to call retrieval service: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = read_body(response).await;
            return Err(AppError::Retrieval(format!(
                "retrieval service responded with {status}: {body}"
            )));
        }

        let payload: SearchResponse = response.json().await.map_err(|err| {
            AppError::Retrieval(format!("failed to parse retrieval response: {err}"))
        })?;

        Ok(payload
            .results
            .into_iter()
            .filter(|hit| hit.score >= min_score && !hit.text.trim().is_empty())
            .take(max_items)
            .map(|hit| DocumentationSnippet {
                text: hit.text,
                score: hit.score,
            })
            .collect())
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    text: String,
    #[serde(default)]
    score: f64,
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::{
        Json, Router,
        extract::Query,
        http::{HeaderMap, StatusCode},
        routing::get,
    };
    use serde_json::{Value, json};

    use super::*;
    use crate::infra::test_support::serve;

    async fn search(
        Query(params): Query<HashMap<String, String>>,
        headers: HeaderMap,
    ) -> Result<Json<Value>, StatusCode> {
        if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer doc-token") {
            return Err(StatusCode::UNAUTHORIZED);
        }
        assert_eq!(params["query"], "Share files. ");
        assert_eq!(params["max_items"], "2");
        Ok(Json(json!({
            "results": [
                {"text": "Links expire after a day", "score": 0.91},
                {"text": "Weak match", "score": 0.2},
                {"text": "Guests must verify email", "score": 0.8},
                {"text": "Over the cap", "score": 0.7}
            ]
        })))
    }

    #[tokio::test]
    async fn keeps_ranked_hits_above_threshold_up_to_cap() {
        let app = Router::new().route("/search", get(search));
        let client = RetrievalClient::new(serve(app).await);
        let snippets = client
            .search("doc-token", "Share files. ", 2, 0.5)
            .await
            .unwrap();
        let texts: Vec<_> = snippets.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["Links expire after a day", "Guests must verify email"]
        );
    }

    #[tokio::test]
    async fn rejected_token_is_an_error() {
        let app = Router::new().route("/search", get(search));
        let client = RetrievalClient::new(serve(app).await);
        let err = client
            .search("expired", "Share files. ", 2, 0.5)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Retrieval(_)));
    }
}
