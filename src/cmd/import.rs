use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use serde_json::Value;

use crate::config::XraySettings;
use crate::domain::import::{ImportReport, PollPolicy};
use crate::domain::testcase::TestCase;
use crate::error::{AppError, AppResult};
use crate::services::BulkImportService;
use crate::workflow::import::{ImportRequest, import_test_cases};

#[derive(Args, Debug, Clone, Default)]
pub struct CredentialArgs {
    /// Xray API client id (defaults to the configured value).
    #[arg(long)]
    pub client_id: Option<String>,
    /// Xray API client secret (defaults to the configured value).
    #[arg(long)]
    pub client_secret: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ImportArgs {
    /// JSON file holding an array of test cases.
    #[arg(short, long)]
    pub input: PathBuf,
    /// Issue the imported tests are linked to (e.g. ABC-123).
    #[arg(long)]
    pub issue: String,
    /// Test set to add the imported tests to.
    #[arg(long)]
    pub test_set: Option<String>,
    #[command(flatten)]
    pub credentials: CredentialArgs,
}

pub async fn run(
    service: &dyn BulkImportService,
    settings: &XraySettings,
    policy: &PollPolicy,
    args: ImportArgs,
) -> AppResult<ImportReport> {
    let test_cases = read_test_cases(&args.input)?;
    let (client_id, client_secret) = resolve_credentials(&args.credentials, settings)?;

    let request = ImportRequest {
        client_id,
        client_secret,
        ticket_key: args.issue,
        test_set: args.test_set.or_else(|| settings.default_test_set.clone()),
        test_cases,
    };

    log::info!(
        "importing {} test cases for {}",
        request.test_cases.len(),
        request.ticket_key
    );
    import_test_cases(service, &request, policy).await
}

/// Checks the credentials by requesting a token and discarding it.
pub async fn verify_credentials(
    service: &dyn BulkImportService,
    settings: &XraySettings,
    args: CredentialArgs,
) -> AppResult<()> {
    let (client_id, client_secret) = resolve_credentials(&args, settings)?;
    service.authenticate(&client_id, &client_secret).await?;
    Ok(())
}

/// Reads a JSON array of test cases. Entries without the test case shape are
/// skipped with a warning; anything other than an array is rejected.
pub fn read_test_cases(path: &Path) -> AppResult<Vec<TestCase>> {
    let text = fs::read_to_string(path)?;
    let entries: Vec<Value> = serde_json::from_str(&text)
        .map_err(|err| AppError::InvalidTestCases(format!("{}: {err}", path.display())))?;

    Ok(entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value::<TestCase>(entry) {
            Ok(case) => Some(case),
            Err(err) => {
                log::warn!(
                    "{}: skipping entry {index}, not a test case ({err})",
                    path.display()
                );
                None
            }
        })
        .collect())
}

fn resolve_credentials(
    args: &CredentialArgs,
    settings: &XraySettings,
) -> AppResult<(String, String)> {
    let pick = |flag: &Option<String>, stored: &Option<String>, name: &str| {
        let present = |value: &&String| !value.trim().is_empty();
        flag.as_ref()
            .filter(present)
            .or(stored.as_ref().filter(present))
            .cloned()
            .ok_or_else(|| {
                AppError::Configuration(format!(
                    "Xray {name} not configured; pass --{} or run `testsmith config init`",
                    name.replace(' ', "-")
                ))
            })
    };

    Ok((
        pick(&args.client_id, &settings.client_id, "client id")?,
        pick(&args.client_secret, &settings.client_secret, "client secret")?,
    ))
}
