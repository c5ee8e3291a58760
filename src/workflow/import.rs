use crate::domain::import::{
    BulkTestEntry, BulkTestFields, BulkTestUpdate, IdRef, ImportReport, IssueLink, IssueLinkOp,
    JobStatus, KeyRef, NameRef, PollPolicy,
};
use crate::domain::testcase::TestCase;
use crate::error::{AppError, AppResult};
use crate::services::BulkImportService;

pub const DEFAULT_PRIORITY_ID: &str = "10001";
const TEST_TYPE: &str = "Manual";
const LINK_TYPE: &str = "Test";
const PRECONDITION_LABEL: &str = "\n *Precondition:* ";

#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub client_id: String,
    pub client_secret: String,
    pub ticket_key: String,
    pub test_set: Option<String>,
    pub test_cases: Vec<TestCase>,
}

/// Project key of a ticket key such as `ABC-123`.
pub fn project_key(ticket_key: &str) -> AppResult<&str> {
    match ticket_key.trim().split_once('-') {
        Some((project, _)) if !project.is_empty() => Ok(project),
        _ => Err(AppError::InvalidTestCases(format!(
            "'{ticket_key}' is not an issue key of the form PROJECT-123"
        ))),
    }
}

/// Maps test cases into the bulk import schema, each linked back to `ticket_key`.
pub fn format_bulk_payload(
    test_cases: &[TestCase],
    ticket_key: &str,
    test_set: Option<&str>,
) -> AppResult<Vec<BulkTestEntry>> {
    if test_cases.is_empty() {
        return Err(AppError::InvalidTestCases(
            "there are no test cases to import".to_string(),
        ));
    }

    let ticket_key = ticket_key.trim();
    let project = project_key(ticket_key)?;
    let test_sets: Vec<String> = test_set
        .map(str::trim)
        .filter(|set| !set.is_empty())
        .map(str::to_string)
        .into_iter()
        .collect();

    Ok(test_cases
        .iter()
        .map(|case| BulkTestEntry {
            testtype: TEST_TYPE.to_string(),
            fields: BulkTestFields {
                project: KeyRef {
                    key: project.to_string(),
                },
                priority: IdRef {
                    id: DEFAULT_PRIORITY_ID.to_string(),
                },
                summary: case.summary.clone(),
                description: describe(case),
            },
            update: BulkTestUpdate {
                issuelinks: vec![IssueLinkOp {
                    add: IssueLink {
                        link_type: NameRef {
                            name: LINK_TYPE.to_string(),
                        },
                        outward_issue: KeyRef {
                            key: ticket_key.to_string(),
                        },
                    },
                }],
            },
            steps: case.steps.clone(),
            xray_test_sets: test_sets.clone(),
        })
        .collect())
}

fn describe(case: &TestCase) -> String {
    let precondition = case.precondition.trim();
    if precondition.is_empty() {
        case.description.clone()
    } else {
        format!("{}{PRECONDITION_LABEL}{precondition}", case.description)
    }
}

/// Waits for the job to finish and returns the created issue keys.
///
/// Pending and unrecognised statuses keep the loop going at `policy.interval`.
/// Failed reads back off exponentially and give up after
/// `policy.max_transport_retries` in a row; a rejected token is returned at
/// once. A partially successful job yields the keys it created, a `failed`
/// job is terminal, and running out of `policy.max_attempts` surfaces as a
/// timeout.
pub async fn poll_job(
    service: &dyn BulkImportService,
    token: &str,
    job_id: &str,
    policy: &PollPolicy,
) -> AppResult<Vec<String>> {
    let mut consecutive_failures = 0;

    for attempt in 1..=policy.max_attempts {
        let delay = match service.job_status(token, job_id).await {
            Ok(job) => {
                consecutive_failures = 0;
                match job.status {
                    JobStatus::Successful | JobStatus::PartiallySuccessful => {
                        if job.status == JobStatus::PartiallySuccessful {
                            log::warn!("job {job_id} only partially succeeded");
                        }
                        for message in &job.messages {
                            log::warn!("job {job_id}: {message}");
                        }
                        log::info!(
                            "job {} completed with {} issues",
                            job.job_id,
                            job.issue_keys.len()
                        );
                        return Ok(job.issue_keys);
                    }
                    JobStatus::Failed => {
                        let detail = if job.messages.is_empty() {
                            "no details reported".to_string()
                        } else {
                            job.messages.join("; ")
                        };
                        return Err(AppError::Import(format!("job {job_id} failed: {detail}")));
                    }
                    JobStatus::Pending => {
                        log::debug!("job {job_id} pending (check {attempt})");
                    }
                    JobStatus::Other(status) => {
                        log::info!("job {job_id} reported '{status}', still waiting");
                    }
                }
                policy.interval
            }
            Err(err @ AppError::Authentication(_)) => return Err(err),
            Err(err) => {
                consecutive_failures += 1;
                if consecutive_failures > policy.max_transport_retries {
                    return Err(AppError::Import(format!(
                        "giving up on job {job_id} after {consecutive_failures} failed status checks: {err}"
                    )));
                }
                let delay = policy.backoff(consecutive_failures);
                log::warn!("status check {attempt} for job {job_id} failed, retrying in {delay:?}: {err}");
                delay
            }
        };

        if attempt < policy.max_attempts {
            tokio::time::sleep(delay).await;
        }
    }

    Err(AppError::ImportTimeout {
        job_id: job_id.to_string(),
        attempts: policy.max_attempts,
    })
}

/// Formats, authenticates, submits and waits for one batch.
pub async fn import_test_cases(
    service: &dyn BulkImportService,
    request: &ImportRequest,
    policy: &PollPolicy,
) -> AppResult<ImportReport> {
    let payload = format_bulk_payload(
        &request.test_cases,
        &request.ticket_key,
        request.test_set.as_deref(),
    )?;

    let token = service
        .authenticate(&request.client_id, &request.client_secret)
        .await?;
    let job_id = service.submit(&token, &payload).await?;
    let issue_keys = poll_job(service, &token, &job_id, policy).await?;

    Ok(ImportReport { job_id, issue_keys })
}
