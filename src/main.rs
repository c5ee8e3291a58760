mod cmd;
mod config;
mod context;
mod domain;
mod error;
mod infra;
mod services;
mod workflow;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::json;

use crate::cmd::config::{self as config_cmd, ConfigArgs};
use crate::cmd::generate::{self as generate_cmd, GenerateArgs, StrategyArgs};
use crate::cmd::import::{self as import_cmd, CredentialArgs, ImportArgs};
use crate::config::AppConfig;
use crate::context::AppContext;
use crate::error::AppResult;
use crate::infra::jira::JiraClient;
use crate::infra::llm::OpenAiClient;
use crate::infra::retrieval::RetrievalClient;
use crate::infra::xray::XrayClient;
use crate::services::RetrievalService;

#[derive(Parser)]
#[command(
    name = "testsmith",
    author,
    version,
    about = "Draft Xray test cases from Jira stories and import them"
)]
struct Cli {
    /// Print results and errors as JSON.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Draft test cases for one or more issues.
    Generate(GenerateArgs),
    /// Draft a list of test scenario titles for an issue.
    Strategy(StrategyArgs),
    /// Bulk import test cases into Xray and link them to an issue.
    Import(ImportArgs),
    /// Check that the Xray client credentials are accepted.
    XrayAuth(CredentialArgs),
    /// Manage CLI configuration.
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let json_output = cli.json;

    if let Err(error) = run(cli).await {
        let report = error.report();
        if json_output {
            let rendered = serde_json::to_string_pretty(&json!({ "error": report }))
                .unwrap_or_else(|_| format!("{{\"error\": \"{}\"}}", report.summary));
            eprintln!("{rendered}");
        } else {
            match report.status {
                Some(status) => eprintln!("Error: {} (HTTP {status})", report.summary),
                None => eprintln!("Error: {}", report.summary),
            }
            if let Some(detail) = &report.detail {
                eprintln!("  {detail}");
            }
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> AppResult<()> {
    match cli.command {
        Commands::Config(args) => config_cmd::run(args.command),
        Commands::Generate(args) => run_generate(args, cli.json).await,
        Commands::Strategy(args) => run_strategy(args, cli.json).await,
        Commands::Import(args) => run_import(args, cli.json).await,
        Commands::XrayAuth(args) => run_xray_auth(args, cli.json).await,
    }
}

fn build_context(config: AppConfig) -> AppContext {
    if config.jira.base_url.is_none() {
        eprintln!("Warning: Jira base URL not configured; issue lookups will fail.");
    }
    if config.openai.api_key.is_none() {
        eprintln!("Warning: OpenAI API key not configured; generation will fail.");
    }

    let issue_tracker = Arc::new(JiraClient::new(&config.jira));
    let language_model = Arc::new(OpenAiClient::new(&config.openai));
    let retrieval = config
        .retrieval
        .base_url
        .as_ref()
        .map(|url| Arc::new(RetrievalClient::new(url.clone())) as Arc<dyn RetrievalService>);

    AppContext::new(config, issue_tracker, language_model, retrieval)
}

async fn run_generate(args: GenerateArgs, json_output: bool) -> AppResult<()> {
    let context = build_context(AppConfig::load()?);
    let outputs = generate_cmd::run(&context, args).await?;

    if json_output {
        println!("{}", to_pretty(&outputs));
        return Ok(());
    }

    for output in &outputs {
        match &output.path {
            Some(path) => println!("{}: wrote {}", output.key, path.display()),
            None => {
                if outputs.len() > 1 {
                    println!("# {}", output.key);
                }
                println!("{}", to_pretty(&output.test_cases));
            }
        }
    }
    Ok(())
}

async fn run_strategy(args: StrategyArgs, json_output: bool) -> AppResult<()> {
    let key = args.key.clone();
    let context = build_context(AppConfig::load()?);
    let strategy = generate_cmd::run_strategy(&context, args).await?;

    if json_output {
        println!(
            "{}",
            to_pretty(&json!({ "key": key, "strategy": strategy }))
        );
    } else {
        println!("{strategy}");
    }
    Ok(())
}

async fn run_import(args: ImportArgs, json_output: bool) -> AppResult<()> {
    let config = AppConfig::load()?;
    let xray = XrayClient::new(config.xray.base_url.clone());
    let report = import_cmd::run(&xray, &config.xray, &config.poll, args).await?;

    if json_output {
        println!("{}", to_pretty(&report));
    } else {
        println!(
            "Import job {} created {} tests:",
            report.job_id,
            report.issue_keys.len()
        );
        for key in &report.issue_keys {
            println!("  {key}");
        }
    }
    Ok(())
}

async fn run_xray_auth(args: CredentialArgs, json_output: bool) -> AppResult<()> {
    let config = AppConfig::load()?;
    let xray = XrayClient::new(config.xray.base_url.clone());
    import_cmd::verify_credentials(&xray, &config.xray, args).await?;

    if json_output {
        println!("{}", to_pretty(&json!({ "authenticated": true })));
    } else {
        println!("Xray credentials accepted.");
    }
    Ok(())
}

fn to_pretty<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|err| format!("\"{err}\""))
}
