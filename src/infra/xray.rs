use async_trait::async_trait;
use reqwest::{Client, StatusCode, header::CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::import::{BulkTestEntry, ImportJob, JobStatus};
use crate::error::{AppError, AppResult, AuthFailure};
use crate::infra::read_body;
use crate::services::BulkImportService;

pub struct XrayClient {
    http: Client,
    base_url: String,
}

impl XrayClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl BulkImportService for XrayClient {
    async fn authenticate(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<String, AuthFailure> {
        log::info!("authenticating with Xray");
        let response = self
            .http
            .post(self.endpoint("/authenticate"))
            .header(CONTENT_TYPE, "application/json")
            .json(&AuthenticateRequest {
                client_id,
                client_secret,
            })
            .send()
            .await
            .map_err(|err| AuthFailure::Transport(err.to_string()))?;

        match response.status() {
            StatusCode::OK => {
                let body = read_body(response).await;
                // The token arrives as a JSON string literal.
                let token = serde_json::from_str::<String>(&body)
                    .unwrap_or_else(|_| body.trim().trim_matches('"').to_string());
                if token.trim().is_empty() {
                    return Err(AuthFailure::MissingToken);
                }
                Ok(token)
            }
            StatusCode::UNAUTHORIZED => Err(AuthFailure::BadCredentials),
            status => Err(AuthFailure::Service {
                status: status.as_u16(),
                detail: read_body(response).await,
            }),
        }
    }

    async fn submit(&self, token: &str, payload: &[BulkTestEntry]) -> AppResult<String> {
        log::info!("submitting {} test cases to Xray", payload.len());
        let response = self
            .http
            .post(self.endpoint("/import/test/bulk"))
            .bearer_auth(token)
            .header(CONTENT_TYPE, "application/json")
            .json(payload)
            .send()
            .await
            .map_err(|err| AppError::Import(format!("failed to submit bulk import: {err}")))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(AuthFailure::TokenRejected.into());
        }
        if !status.is_success() {
            let body = read_body(response).await;
            return Err(AppError::Import(format!(
                "Xray rejected the bulk import with {status}: {body}"
            )));
        }

        let submitted: SubmitResponse = response.json().await.map_err(|err| {
            AppError::Import(format!("failed to parse bulk import response: {err}"))
        })?;
        log::info!("bulk import accepted as job {}", submitted.job_id);
        Ok(submitted.job_id)
    }

    async fn job_status(&self, token: &str, job_id: &str) -> AppResult<ImportJob> {
        let response = self
            .http
            .get(self.endpoint(&format!("/import/test/bulk/{job_id}/status")))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|err| AppError::Import(format!("failed to read job status: {err}")))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(AuthFailure::TokenRejected.into());
        }
        if !status.is_success() {
            let body = read_body(response).await;
            return Err(AppError::Import(format!(
                "status check for job {job_id} returned {status}: {body}"
            )));
        }

        let payload: JobStatusResponse = response
            .json()
            .await
            .map_err(|err| AppError::Import(format!("failed to parse job status: {err}")))?;

        Ok(payload.into_job(job_id))
    }
}

#[derive(Serialize)]
struct AuthenticateRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
}

#[derive(Deserialize)]
struct SubmitResponse {
    #[serde(rename = "jobId")]
    job_id: String,
}

#[derive(Deserialize)]
struct JobStatusResponse {
    status: String,
    #[serde(default)]
    result: Option<JobResult>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize, Default)]
struct JobResult {
    #[serde(default)]
    issues: Vec<CreatedIssue>,
    #[serde(default)]
    errors: Vec<Value>,
    #[serde(default)]
    warnings: Vec<Value>,
}

#[derive(Deserialize)]
struct CreatedIssue {
    key: String,
}

impl JobStatusResponse {
    fn into_job(self, job_id: &str) -> ImportJob {
        let result = self.result.unwrap_or_default();
        let messages = self
            .message
            .into_iter()
            .chain(result.errors.iter().chain(&result.warnings).map(describe))
            .collect();

        ImportJob {
            job_id: job_id.to_string(),
            status: JobStatus::parse(&self.status),
            issue_keys: result.issues.into_iter().map(|issue| issue.key).collect(),
            messages,
        }
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::{
        Json, Router,
        extract::Path,
        http::{HeaderMap, StatusCode as HttpStatus},
        routing::{get, post},
    };
    use serde_json::json;

    use super::*;
    use crate::domain::import::{BulkTestFields, BulkTestUpdate, IdRef, KeyRef};
    use crate::infra::test_support::serve;

    fn auth_app(status: HttpStatus, body: &'static str) -> Router {
        Router::new().route(
            "/authenticate",
            post(move |Json(request): Json<Value>| async move {
                assert_eq!(request["client_id"], "id");
                assert_eq!(request["client_secret"], "secret");
                (status, body)
            }),
        )
    }

    #[tokio::test]
    async fn authenticate_returns_token() {
        let client = XrayClient::new(serve(auth_app(HttpStatus::OK, "\"tok-123\"")).await);
        assert_eq!(client.authenticate("id", "secret").await.unwrap(), "tok-123");
    }

    #[tokio::test]
    async fn unauthorized_differs_from_server_error() {
        let rejected = XrayClient::new(serve(auth_app(HttpStatus::UNAUTHORIZED, "no")).await)
            .authenticate("id", "secret")
            .await
            .unwrap_err();
        let broken =
            XrayClient::new(serve(auth_app(HttpStatus::INTERNAL_SERVER_ERROR, "down")).await)
                .authenticate("id", "secret")
                .await
                .unwrap_err();

        assert_eq!(rejected, AuthFailure::BadCredentials);
        assert_eq!(
            broken,
            AuthFailure::Service {
                status: 500,
                detail: "down".to_string()
            }
        );
    }

    #[tokio::test]
    async fn empty_token_is_reported() {
        let client = XrayClient::new(serve(auth_app(HttpStatus::OK, "\"\"")).await);
        assert_eq!(
            client.authenticate("id", "secret").await.unwrap_err(),
            AuthFailure::MissingToken
        );
    }

    fn entry() -> BulkTestEntry {
        BulkTestEntry {
            testtype: "Manual".to_string(),
            fields: BulkTestFields {
                project: KeyRef {
                    key: "ABC".to_string(),
                },
                priority: IdRef {
                    id: "10001".to_string(),
                },
                summary: "Login".to_string(),
                description: "Valid login".to_string(),
            },
            update: BulkTestUpdate { issuelinks: vec![] },
            steps: vec![],
            xray_test_sets: vec![],
        }
    }

    #[tokio::test]
    async fn submit_returns_job_id() {
        let app = Router::new().route(
            "/import/test/bulk",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(headers["authorization"], "Bearer tok");
                assert_eq!(body[0]["fields"]["project"]["key"], "ABC");
                Json(json!({"jobId": "job-9"}))
            }),
        );
        let client = XrayClient::new(serve(app).await);
        assert_eq!(client.submit("tok", &[entry()]).await.unwrap(), "job-9");
    }

    #[tokio::test]
    async fn submit_failure_is_terminal() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let app = Router::new().route(
            "/import/test/bulk",
            post(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    (HttpStatus::BAD_REQUEST, "invalid project")
                }
            }),
        );
        let client = XrayClient::new(serve(app).await);
        let err = client.submit("tok", &[entry()]).await.unwrap_err();
        assert!(matches!(err, AppError::Import(ref msg) if msg.contains("invalid project")));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_token_on_submit_is_an_auth_failure() {
        let app = Router::new().route(
            "/import/test/bulk",
            post(|| async { (HttpStatus::UNAUTHORIZED, "token expired") }),
        );
        let client = XrayClient::new(serve(app).await);
        let err = client.submit("stale", &[entry()]).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Authentication(AuthFailure::TokenRejected)
        ));
        assert_eq!(err.report().status, Some(401));
    }

    #[tokio::test]
    async fn expired_token_on_status_is_an_auth_failure() {
        let app = Router::new().route(
            "/import/test/bulk/:job/status",
            get(|| async { (HttpStatus::UNAUTHORIZED, "token expired") }),
        );
        let client = XrayClient::new(serve(app).await);
        let err = client.job_status("stale", "job-9").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Authentication(AuthFailure::TokenRejected)
        ));
    }

    #[tokio::test]
    async fn status_server_error_is_an_import_error() {
        let app = Router::new().route(
            "/import/test/bulk/:job/status",
            get(|| async { (HttpStatus::INTERNAL_SERVER_ERROR, "maintenance") }),
        );
        let client = XrayClient::new(serve(app).await);
        let err = client.job_status("tok", "job-9").await.unwrap_err();
        assert!(matches!(err, AppError::Import(ref msg) if msg.contains("500") && msg.contains("maintenance")));
    }

    #[tokio::test]
    async fn reads_job_status_and_created_keys() {
        let app = Router::new().route(
            "/import/test/bulk/:job/status",
            get(|Path(job): Path<String>| async move {
                assert_eq!(job, "job-9");
                Json(json!({
                    "status": "successful",
                    "result": {
                        "issues": [{"id": "1", "key": "ABC-200"}, {"id": "2", "key": "ABC-201"}],
                        "warnings": ["priority ignored"]
                    }
                }))
            }),
        );
        let client = XrayClient::new(serve(app).await);
        let job = client.job_status("tok", "job-9").await.unwrap();
        assert_eq!(job.status, JobStatus::Successful);
        assert_eq!(job.issue_keys, vec!["ABC-200", "ABC-201"]);
        assert_eq!(job.messages, vec!["priority ignored"]);
    }
}
