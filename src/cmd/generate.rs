use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use serde::Serialize;
use serde_json::Value;

use crate::context::AppContext;
use crate::domain::repair::RepairOutcome;
use crate::error::AppResult;
use crate::workflow::generate::{GenerationRequest, generate_strategy, generate_test_cases};

const DEFAULT_TEST_CASE_PROMPT: &str =
    "As a quality engineer, I need to create Xray test cases for this user story.";
const DEFAULT_STRATEGY_PROMPT: &str = "As a quality engineer, ";

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Issue keys to draft test cases for (e.g. ABC-123).
    #[arg(required = true)]
    pub keys: Vec<String>,
    /// System prompt sent ahead of the assembled prompt.
    #[arg(long, default_value = "")]
    pub system_prompt: String,
    /// Extra instructions inserted into the prompt template.
    #[arg(long, default_value = DEFAULT_TEST_CASE_PROMPT)]
    pub user_prompt: String,
    /// Write `<KEY>.json` files here instead of printing.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Access token for the documentation search service.
    #[arg(long, env = "TESTSMITH_RETRIEVAL_TOKEN", hide_env_values = true)]
    pub retrieval_token: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct StrategyArgs {
    /// Issue key to draft a strategy for.
    pub key: String,
    #[arg(long, default_value = "")]
    pub system_prompt: String,
    #[arg(long, default_value = DEFAULT_STRATEGY_PROMPT)]
    pub user_prompt: String,
}

#[derive(Debug, Serialize)]
pub struct GeneratedOutput {
    pub key: String,
    pub found_array: bool,
    /// Entries shaped like importable test cases.
    pub importable: usize,
    pub test_cases: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

pub async fn run(ctx: &AppContext, args: GenerateArgs) -> AppResult<Vec<GeneratedOutput>> {
    let request = GenerationRequest {
        system_prompt: args.system_prompt,
        user_prompt: args.user_prompt,
        retrieval_token: args.retrieval_token,
    };

    let generated = generate_test_cases(ctx, &args.keys, &request).await?;

    let mut outputs = Vec::with_capacity(generated.len());
    for item in generated {
        let found_array = !matches!(item.outcome, RepairOutcome::NoArrayFound);
        if !found_array {
            eprintln!(
                "Warning: no JSON array found in the model response for {}; emitting []",
                item.ticket_key
            );
        }

        let json = item.outcome.to_json();
        let path = match &args.output_dir {
            Some(dir) => Some(write_output(dir, &item.ticket_key, &json)?),
            None => None,
        };
        let test_cases = Value::Array(
            item.outcome
                .objects()
                .iter()
                .cloned()
                .map(Value::Object)
                .collect(),
        );

        outputs.push(GeneratedOutput {
            importable: item.outcome.test_cases().len(),
            key: item.ticket_key,
            found_array,
            test_cases,
            path,
        });
    }

    Ok(outputs)
}

pub async fn run_strategy(ctx: &AppContext, args: StrategyArgs) -> AppResult<String> {
    let request = GenerationRequest {
        system_prompt: args.system_prompt,
        user_prompt: args.user_prompt,
        retrieval_token: None,
    };
    generate_strategy(ctx, &args.key, &request).await
}

/// Writes `<key>.json` under `dir`, creating the directory if needed.
pub fn write_output(dir: &Path, key: &str, json: &str) -> AppResult<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.json", key.trim()));
    fs::write(&path, format!("{json}\n"))?;
    log::info!("wrote {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_one_file_per_key() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("drafts");

        let path = write_output(&nested, "ABC-1", "[]").unwrap();

        assert_eq!(path, nested.join("ABC-1.json"));
        assert_eq!(fs::read_to_string(path).unwrap(), "[]\n");
    }

    #[test]
    fn overwrites_previous_draft() {
        let dir = tempfile::tempdir().unwrap();
        write_output(dir.path(), "ABC-1", "[{\"summary\": \"old\"}]").unwrap();
        let path = write_output(dir.path(), "ABC-1", "[]").unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "[]\n");
    }
}
