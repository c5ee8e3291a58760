use async_trait::async_trait;
use reqwest::{
    Client,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use serde::{Deserialize, Serialize};

use crate::config::OpenAiSettings;
use crate::error::{AppError, AppResult};
use crate::infra::read_body;
use crate::services::LanguageModelService;

/// Client for an OpenAI-compatible chat completions endpoint.
pub struct OpenAiClient {
    http: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(settings: &OpenAiSettings) -> Self {
        Self {
            http: Client::new(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            base_url: settings.base_url.clone(),
        }
    }

    fn completions_endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl LanguageModelService for OpenAiClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> AppResult<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Configuration("OpenAI API key not configured".to_string()))?;

        let mut messages = Vec::with_capacity(2);
        if !system_prompt.trim().is_empty() {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system_prompt.to_string(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: user_prompt.to_string(),
        });

        let request = ChatRequest {
            model: self.model.clone(),
            messages,
        };

        log::info!("requesting completion from {}", self.model);
        log::debug!("user prompt:\n{user_prompt}");

        let response = self
            .http
            .post(self.completions_endpoint())
            .header(AUTHORIZATION, format!("Bearer {api_key}"))
            .header(CONTENT_TYPE, "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|err| AppError::LanguageModel(format!("failed to call model API: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = read_body(response).await;
            return Err(AppError::LanguageModel(format!(
                "model API responded with {status}: {body}"
            )));
        }

        let payload: ChatResponse = response.json().await.map_err(|err| {
            AppError::LanguageModel(format!("failed to parse model response: {err}"))
        })?;

        payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| AppError::LanguageModel("model returned an empty completion".to_string()))
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use axum::{Json, Router, http::StatusCode, routing::post};
    use serde_json::{Value, json};

    use super::*;
    use crate::infra::test_support::serve;

    fn settings(base_url: String) -> OpenAiSettings {
        OpenAiSettings {
            api_key: Some("sk-test".to_string()),
            model: "gpt-test".to_string(),
            base_url,
        }
    }

    #[tokio::test]
    async fn returns_first_choice_content() {
        let app = Router::new().route(
            "/chat/completions",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["model"], "gpt-test");
                assert_eq!(body["messages"][0]["role"], "system");
                assert_eq!(body["messages"][1]["content"], "write tests");
                Json(json!({"choices": [{"message": {"role": "assistant", "content": "[{}]"}}]}))
            }),
        );
        let client = OpenAiClient::new(&settings(serve(app).await));
        let text = client.complete("be precise", "write tests").await.unwrap();
        assert_eq!(text, "[{}]");
    }

    #[tokio::test]
    async fn skips_blank_system_prompt() {
        let app = Router::new().route(
            "/chat/completions",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["messages"].as_array().unwrap().len(), 1);
                Json(json!({"choices": [{"message": {"content": "ok"}}]}))
            }),
        );
        let client = OpenAiClient::new(&settings(serve(app).await));
        assert_eq!(client.complete("  ", "hello").await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn upstream_failure_propagates() {
        let app = Router::new().route(
            "/chat/completions",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        );
        let client = OpenAiClient::new(&settings(serve(app).await));
        let err = client.complete("", "hello").await.unwrap_err();
        assert!(matches!(err, AppError::LanguageModel(ref msg) if msg.contains("429")));
    }

    #[tokio::test]
    async fn empty_completion_is_an_error() {
        let app = Router::new().route(
            "/chat/completions",
            post(|| async { Json(json!({"choices": []})) }),
        );
        let client = OpenAiClient::new(&settings(serve(app).await));
        assert!(client.complete("", "hello").await.is_err());
    }
}
