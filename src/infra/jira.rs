use async_trait::async_trait;
use base64::prelude::{BASE64_STANDARD, Engine as _};
use reqwest::{
    Client, StatusCode,
    header::{ACCEPT, AUTHORIZATION},
};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::JiraSettings;
use crate::domain::ticket::TicketContext;
use crate::error::{AppError, AppResult};
use crate::infra::read_body;
use crate::services::IssueTrackerService;

pub struct JiraClient {
    http: Client,
    base_url: Option<String>,
    email: Option<String>,
    token: Option<String>,
    workflow_field: String,
    acceptance_field: String,
}

impl JiraClient {
    pub fn new(settings: &JiraSettings) -> Self {
        Self {
            http: Client::new(),
            base_url: settings.base_url.clone(),
            email: settings.email.clone(),
            token: settings.token.clone(),
            workflow_field: settings.workflow_field.clone(),
            acceptance_field: settings.acceptance_field.clone(),
        }
    }

    fn api_details(&self) -> AppResult<(&str, &str, &str)> {
        let base_url = self
            .base_url
            .as_deref()
            .ok_or_else(|| AppError::Configuration("Jira base URL not configured".to_string()))?;
        let email = self
            .email
            .as_deref()
            .ok_or_else(|| AppError::Configuration("Jira email not configured".to_string()))?;
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| AppError::Configuration("Jira API token not configured".to_string()))?;
        Ok((base_url, email, token))
    }

    fn auth_header(email: &str, token: &str) -> String {
        let credentials = format!("{email}:{token}");
        let encoded = BASE64_STANDARD.encode(credentials);
        format!("Basic {encoded}")
    }

    fn issue_endpoint(base_url: &str, key: &str) -> String {
        format!("{}/rest/api/2/issue/{}", base_url.trim_end_matches('/'), key)
    }

    fn requested_fields(&self) -> String {
        format!(
            "summary,description,{},{}",
            self.workflow_field, self.acceptance_field
        )
    }
}

#[async_trait]
impl IssueTrackerService for JiraClient {
    async fn get_issue(&self, key: &str) -> AppResult<TicketContext> {
        let key = key.trim();
        if key.is_empty() {
            return Err(AppError::IssueTracker(
                "issue key must not be empty".to_string(),
            ));
        }

        let (base_url, email, token) = self.api_details()?;
        log::info!("fetching Jira issue {key}");

        let response = self
            .http
            .get(Self::issue_endpoint(base_url, key))
            .query(&[("fields", self.requested_fields())])
            .header(AUTHORIZATION, Self::auth_header(email, token))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|err| AppError::IssueTracker(format!("failed to call Jira: {err}")))?;

        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED => {
                return Err(AppError::IssueTracker(
                    "Jira rejected the configured credentials (401)".to_string(),
                ));
            }
            StatusCode::FORBIDDEN => {
                let body = read_body(response).await;
                return Err(AppError::Forbidden(format!(
                    "no permission to read {key}: {body}"
                )));
            }
            StatusCode::NOT_FOUND => {
                return Err(AppError::IssueTracker(format!("issue {key} not found")));
            }
            _ if !status.is_success() => {
                let body = read_body(response).await;
                return Err(AppError::IssueTracker(format!(
                    "Jira responded with {status}: {body}"
                )));
            }
            _ => {}
        }

        let payload: JiraIssueResponse = response.json().await.map_err(|err| {
            AppError::IssueTracker(format!("failed to parse Jira response: {err}"))
        })?;

        Ok(payload.into_ticket(&self.workflow_field, &self.acceptance_field))
    }
}

#[derive(Deserialize)]
struct JiraIssueResponse {
    id: String,
    key: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl JiraIssueResponse {
    fn into_ticket(self, workflow_field: &str, acceptance_field: &str) -> TicketContext {
        let text = |name: &str| self.fields.get(name).and_then(field_text);
        TicketContext {
            summary: text("summary"),
            description: text("description"),
            workflow_notes: text(workflow_field),
            acceptance_criteria: text(acceptance_field),
            id: self.id,
            key: self.key,
        }
    }
}

/// Renders a Jira field value as text; select options contribute their `value`.
fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Object(object) => object
            .get("value")
            .or_else(|| object.get("name"))
            .and_then(field_text),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(field_text).collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        Json, Router,
        extract::{Path, Query},
        http::{HeaderMap, StatusCode},
        routing::get,
    };
    use serde_json::json;
    use std::collections::HashMap;

    use super::*;
    use crate::infra::test_support::serve;

    fn settings(base_url: String) -> JiraSettings {
        JiraSettings {
            base_url: Some(base_url),
            email: Some("qa@acme.io".to_string()),
            token: Some("secret".to_string()),
            workflow_field: "customfield_10059".to_string(),
            acceptance_field: "customfield_10060".to_string(),
        }
    }

    async fn issue(
        Path(key): Path<String>,
        Query(params): Query<HashMap<String, String>>,
        headers: HeaderMap,
    ) -> Result<Json<Value>, StatusCode> {
        let expected = JiraClient::auth_header("qa@acme.io", "secret");
        if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some(expected.as_str()) {
            return Err(StatusCode::UNAUTHORIZED);
        }
        match key.as_str() {
            "SEC-1" => {
                assert!(params["fields"].contains("customfield_10060"));
                Ok(Json(json!({
                    "id": "10001",
                    "key": "SEC-1",
                    "fields": {
                        "summary": "Share a document",
                        "description": null,
                        "customfield_10059": {"value": "Upload then share"},
                        "customfield_10060": "Guest can download"
                    }
                })))
            }
            "LOCK-1" => Err(StatusCode::FORBIDDEN),
            _ => Err(StatusCode::NOT_FOUND),
        }
    }

    async fn client() -> JiraClient {
        let app = Router::new().route("/rest/api/2/issue/:key", get(issue));
        JiraClient::new(&settings(serve(app).await))
    }

    #[tokio::test]
    async fn reads_standard_and_custom_fields() {
        let ticket = client().await.get_issue("SEC-1").await.unwrap();
        assert_eq!(ticket.id, "10001");
        assert_eq!(ticket.summary.as_deref(), Some("Share a document"));
        assert_eq!(ticket.description, None);
        assert_eq!(ticket.workflow_notes.as_deref(), Some("Upload then share"));
        assert_eq!(
            ticket.acceptance_criteria.as_deref(),
            Some("Guest can download")
        );
    }

    #[tokio::test]
    async fn forbidden_is_distinct_from_other_failures() {
        let client = client().await;
        let forbidden = client.get_issue("LOCK-1").await.unwrap_err();
        assert!(matches!(forbidden, AppError::Forbidden(_)));

        let missing = client.get_issue("NOPE-1").await.unwrap_err();
        assert!(matches!(missing, AppError::IssueTracker(_)));
    }

    #[tokio::test]
    async fn lists_issues_in_order() {
        let client = client().await;
        let tickets = client
            .list_issues(&["SEC-1".to_string(), "SEC-1".to_string()])
            .await
            .unwrap();
        assert_eq!(tickets.len(), 2);

        let err = client
            .list_issues(&["SEC-1".to_string(), "NOPE-2".to_string()])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("NOPE-2"));
    }

    #[tokio::test]
    async fn missing_credentials_are_configuration_errors() {
        let client = JiraClient::new(&JiraSettings {
            base_url: None,
            email: None,
            token: None,
            workflow_field: "a".to_string(),
            acceptance_field: "b".to_string(),
        });
        let err = client.get_issue("SEC-1").await.unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[test]
    fn renders_field_values() {
        assert_eq!(field_text(&json!(null)), None);
        assert_eq!(field_text(&json!(3)), Some("3".to_string()));
        assert_eq!(
            field_text(&json!([{"value": "a"}, {"name": "b"}])),
            Some("a, b".to_string())
        );
    }
}
