use async_trait::async_trait;

use crate::domain::import::{BulkTestEntry, ImportJob};
use crate::error::{AppResult, AuthFailure};

/// The three calls of the test-management batch API.
#[async_trait]
pub trait BulkImportService: Send + Sync {
    async fn authenticate(&self, client_id: &str, client_secret: &str)
    -> Result<String, AuthFailure>;

    /// Submits the batch and returns the job id.
    async fn submit(&self, token: &str, payload: &[BulkTestEntry]) -> AppResult<String>;

    async fn job_status(&self, token: &str, job_id: &str) -> AppResult<ImportJob>;
}
