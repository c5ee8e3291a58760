pub mod jira;
pub mod llm;
pub mod retrieval;
pub mod xray;

/// Reads a response body as text, tolerating decode failures.
async fn read_body(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| "<unable to read response>".to_string())
}
