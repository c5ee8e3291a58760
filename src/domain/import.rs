use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::testcase::TestStep;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Successful,
    /// Finished with only some of the tests created.
    PartiallySuccessful,
    Failed,
    Other(String),
}

impl JobStatus {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "pending" | "working" => JobStatus::Pending,
            "successful" => JobStatus::Successful,
            "partially_successful" => JobStatus::PartiallySuccessful,
            "failed" | "unsuccessful" => JobStatus::Failed,
            other => JobStatus::Other(other.to_string()),
        }
    }
}

/// One status read of a bulk import job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportJob {
    pub job_id: String,
    pub status: JobStatus,
    pub issue_keys: Vec<String>,
    /// Error and warning messages reported alongside the status, if any.
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub job_id: String,
    pub issue_keys: Vec<String>,
}

/// Bounds on waiting for a bulk import job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// Total status reads before giving up with a timeout.
    pub max_attempts: u32,
    /// Consecutive failed reads (transport or non-2xx) tolerated.
    pub max_transport_retries: u32,
    pub max_backoff: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 120,
            max_transport_retries: 5,
            max_backoff: Duration::from_secs(60),
        }
    }
}

impl PollPolicy {
    /// Delay before the next read after `failures` consecutive failed reads.
    pub fn backoff(&self, failures: u32) -> Duration {
        let factor = 2u32.saturating_pow(failures.min(16));
        self.interval.saturating_mul(factor).min(self.max_backoff)
    }
}

/// Element of the Xray bulk test import payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BulkTestEntry {
    pub testtype: String,
    pub fields: BulkTestFields,
    pub update: BulkTestUpdate,
    pub steps: Vec<TestStep>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub xray_test_sets: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BulkTestFields {
    pub project: KeyRef,
    pub priority: IdRef,
    pub summary: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BulkTestUpdate {
    pub issuelinks: Vec<IssueLinkOp>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssueLinkOp {
    pub add: IssueLink,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssueLink {
    #[serde(rename = "type")]
    pub link_type: NameRef,
    #[serde(rename = "outwardIssue")]
    pub outward_issue: KeyRef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyRef {
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdRef {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NameRef {
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_job_status() {
        assert_eq!(JobStatus::parse("pending"), JobStatus::Pending);
        assert_eq!(JobStatus::parse("working"), JobStatus::Pending);
        assert_eq!(JobStatus::parse("Successful"), JobStatus::Successful);
        assert_eq!(JobStatus::parse("failed"), JobStatus::Failed);
        assert_eq!(JobStatus::parse("unsuccessful"), JobStatus::Failed);
        assert_eq!(
            JobStatus::parse("partially_successful"),
            JobStatus::PartiallySuccessful
        );
        assert_eq!(
            JobStatus::parse("queued"),
            JobStatus::Other("queued".to_string())
        );
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = PollPolicy {
            interval: Duration::from_secs(2),
            max_backoff: Duration::from_secs(10),
            ..Default::default()
        };
        assert_eq!(policy.backoff(1), Duration::from_secs(4));
        assert_eq!(policy.backoff(2), Duration::from_secs(8));
        assert_eq!(policy.backoff(3), Duration::from_secs(10));
        assert_eq!(policy.backoff(40), Duration::from_secs(10));
    }
}
