use std::io;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("issue tracker error: {0}")]
    IssueTracker(String),
    #[error("permission denied: {0}")]
    Forbidden(String),
    #[error("language model error: {0}")]
    LanguageModel(String),
    #[error("retrieval error: {0}")]
    Retrieval(String),
    #[error("Xray authentication failed: {0}")]
    Authentication(#[from] AuthFailure),
    #[error("bulk import failed: {0}")]
    Import(String),
    #[error("bulk import job {job_id} did not finish after {attempts} status checks")]
    ImportTimeout { job_id: String, attempts: u32 },
    #[error("invalid test case data: {0}")]
    InvalidTestCases(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Why the batch API refused to hand out a token.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthFailure {
    #[error("client credentials were rejected")]
    BadCredentials,
    #[error("authentication service responded with {status}: {detail}")]
    Service { status: u16, detail: String },
    #[error("authentication succeeded but no token was returned")]
    MissingToken,
    #[error("the batch API rejected the access token")]
    TokenRejected,
    #[error("could not reach authentication service: {0}")]
    Transport(String),
}

impl AuthFailure {
    pub fn status(&self) -> Option<u16> {
        match self {
            AuthFailure::BadCredentials => Some(401),
            AuthFailure::Service { status, .. } => Some(*status),
            AuthFailure::MissingToken => Some(200),
            AuthFailure::TokenRejected => Some(401),
            AuthFailure::Transport(_) => None,
        }
    }
}

/// User-facing rendition of an [`AppError`].
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorReport {
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl AppError {
    pub fn report(&self) -> ErrorReport {
        let (summary, status) = match self {
            AppError::Configuration(_) => ("Configuration is incomplete", None),
            AppError::IssueTracker(_) => ("Jira request failed", None),
            AppError::Forbidden(_) => ("Jira denied access to this resource", Some(403)),
            AppError::LanguageModel(_) => ("Failed to generate content", None),
            AppError::Retrieval(_) => ("Documentation lookup failed", None),
            AppError::Authentication(failure) => match failure {
                AuthFailure::BadCredentials => ("Xray rejected the client credentials", None),
                AuthFailure::TokenRejected => ("Xray rejected the access token", None),
                _ => ("Xray authentication failed", None),
            },
            AppError::Import(_) => ("Xray bulk import failed", None),
            AppError::ImportTimeout { .. } => ("Xray import job did not finish in time", None),
            AppError::InvalidTestCases(_) => ("Test case data is invalid", None),
            AppError::Io(_) => ("I/O error", None),
        };
        let status = match self {
            AppError::Authentication(failure) => failure.status(),
            _ => status,
        };

        ErrorReport {
            summary: summary.to_string(),
            detail: Some(self.to_string()),
            status,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
