use async_trait::async_trait;

use crate::domain::ticket::TicketContext;
use crate::error::AppResult;

#[async_trait]
pub trait IssueTrackerService: Send + Sync {
    async fn get_issue(&self, key: &str) -> AppResult<TicketContext>;

    /// Fetches issues one after another, stopping at the first failure.
    async fn list_issues(&self, keys: &[String]) -> AppResult<Vec<TicketContext>> {
        let mut tickets = Vec::with_capacity(keys.len());
        for key in keys {
            tickets.push(self.get_issue(key).await?);
        }
        Ok(tickets)
    }
}
