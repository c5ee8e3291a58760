use std::fmt::Display;
use std::io::{self, Write};
use std::str::FromStr;

use clap::{Args, Subcommand};

use crate::config::{StoredConfig, config_file_path};
use crate::error::AppResult;

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Run the interactive configuration wizard.
    Init,
    /// Show the stored configuration (secrets masked).
    Show,
}

pub fn run(command: ConfigCommand) -> AppResult<()> {
    match command {
        ConfigCommand::Init => run_init(),
        ConfigCommand::Show => run_show(),
    }
}

fn run_init() -> AppResult<()> {
    let mut cfg = StoredConfig::load()?;

    println!("Configuring testsmith.");
    println!("Press Enter to keep the current value, '-' to clear it.");
    println!("Secrets are stored in the local config file; protect your filesystem accordingly.");
    println!();

    apply_prompt(
        "Jira base URL (e.g., https://company.atlassian.net)",
        &mut cfg.jira_base_url,
        false,
    )?;
    apply_prompt("Jira email", &mut cfg.jira_email, false)?;
    apply_prompt("Jira API token", &mut cfg.jira_token, true)?;
    apply_prompt(
        "Jira workflow field id",
        &mut cfg.jira_workflow_field,
        false,
    )?;
    apply_prompt(
        "Jira acceptance criteria field id",
        &mut cfg.jira_acceptance_field,
        false,
    )?;

    apply_prompt("OpenAI API key", &mut cfg.openai_api_key, true)?;
    apply_prompt("OpenAI model", &mut cfg.openai_model, false)?;
    apply_prompt("OpenAI base URL", &mut cfg.openai_base_url, false)?;

    apply_prompt(
        "Documentation search base URL",
        &mut cfg.retrieval_base_url,
        false,
    )?;
    apply_parsed_prompt(
        "Documentation snippets per prompt",
        &mut cfg.retrieval_max_items,
    )?;
    apply_parsed_prompt(
        "Minimum documentation score",
        &mut cfg.retrieval_min_score,
    )?;

    apply_prompt("Xray base URL", &mut cfg.xray_base_url, false)?;
    apply_prompt("Xray client id", &mut cfg.xray_client_id, false)?;
    apply_prompt("Xray client secret", &mut cfg.xray_client_secret, true)?;
    apply_prompt("Default test set key", &mut cfg.default_test_set, false)?;
    apply_parsed_prompt(
        "Import status poll interval (seconds)",
        &mut cfg.poll_interval_secs,
    )?;
    apply_parsed_prompt(
        "Import status checks before giving up",
        &mut cfg.poll_max_attempts,
    )?;

    cfg.save()?;

    let path = config_file_path()?;
    println!("\nConfiguration saved to {}", path.display());
    Ok(())
}

fn run_show() -> AppResult<()> {
    let cfg = StoredConfig::load()?;
    let path = config_file_path()?;

    println!("Configuration file: {}", path.display());
    println!("Jira base URL: {}", display_value(&cfg.jira_base_url));
    println!("Jira email: {}", display_value(&cfg.jira_email));
    println!("Jira API token: {}", mask_secret(&cfg.jira_token));
    println!(
        "Jira workflow field: {}",
        display_value(&cfg.jira_workflow_field)
    );
    println!(
        "Jira acceptance field: {}",
        display_value(&cfg.jira_acceptance_field)
    );
    println!("OpenAI API key: {}", mask_secret(&cfg.openai_api_key));
    println!("OpenAI model: {}", display_value(&cfg.openai_model));
    println!("OpenAI base URL: {}", display_value(&cfg.openai_base_url));
    println!(
        "Documentation search URL: {}",
        display_value(&cfg.retrieval_base_url)
    );
    println!(
        "Documentation snippets: {}",
        display_value(&cfg.retrieval_max_items)
    );
    println!(
        "Minimum documentation score: {}",
        display_value(&cfg.retrieval_min_score)
    );
    println!("Xray base URL: {}", display_value(&cfg.xray_base_url));
    println!("Xray client id: {}", display_value(&cfg.xray_client_id));
    println!(
        "Xray client secret: {}",
        mask_secret(&cfg.xray_client_secret)
    );
    println!("Default test set: {}", display_value(&cfg.default_test_set));
    println!(
        "Poll interval (s): {}",
        display_value(&cfg.poll_interval_secs)
    );
    println!(
        "Poll max attempts: {}",
        display_value(&cfg.poll_max_attempts)
    );

    Ok(())
}

fn apply_prompt(field: &str, target: &mut Option<String>, secret: bool) -> AppResult<()> {
    match prompt(field, target.as_deref(), secret)? {
        PromptAction::Keep => {}
        PromptAction::Clear => *target = None,
        PromptAction::Set(value) => *target = Some(value),
    }
    Ok(())
}

fn apply_parsed_prompt<T>(field: &str, target: &mut Option<T>) -> AppResult<()>
where
    T: FromStr + Display,
{
    loop {
        let current = target.as_ref().map(ToString::to_string);
        match prompt(field, current.as_deref(), false)? {
            PromptAction::Keep => return Ok(()),
            PromptAction::Clear => {
                *target = None;
                return Ok(());
            }
            PromptAction::Set(value) => match value.parse() {
                Ok(parsed) => {
                    *target = Some(parsed);
                    return Ok(());
                }
                Err(_) => println!("'{value}' is not a valid value for {field}; try again."),
            },
        }
    }
}

fn prompt(field: &str, current: Option<&str>, secret: bool) -> AppResult<PromptAction> {
    let mut stdout = io::stdout();

    match (current, secret) {
        (Some(_), true) => write!(stdout, "{field} [****] (Enter to keep, '-' to clear): ")?,
        (Some(value), false) => {
            write!(stdout, "{field} [{value}] (Enter to keep, '-' to clear): ")?
        }
        (None, _) => write!(stdout, "{field} (Enter to skip): ")?,
    }
    stdout.flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let trimmed = input.trim();

    if trimmed.is_empty() {
        Ok(PromptAction::Keep)
    } else if trimmed == "-" {
        Ok(PromptAction::Clear)
    } else {
        Ok(PromptAction::Set(trimmed.to_string()))
    }
}

fn display_value<T: Display>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(ToString::to_string)
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "<not set>".to_string())
}

fn mask_secret(value: &Option<String>) -> String {
    match value {
        Some(token) if token.chars().count() > 6 => {
            let prefix: String = token.chars().take(3).collect();
            let suffix: String = token
                .chars()
                .rev()
                .take(3)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            format!("{prefix}***{suffix}")
        }
        Some(token) if !token.is_empty() => "***".to_string(),
        _ => "<not set>".to_string(),
    }
}

enum PromptAction {
    Keep,
    Clear,
    Set(String),
}
