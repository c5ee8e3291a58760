use crate::context::AppContext;
use crate::domain::prompt::{GenerationMode, assemble};
use crate::domain::repair::{RepairOutcome, repair};
use crate::domain::retrieval::{DocumentationSnippet, build_search_query};
use crate::domain::ticket::TicketContext;
use crate::error::AppResult;

#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    /// Session credential for the documentation search service.
    pub retrieval_token: Option<String>,
}

pub struct GeneratedTestCases {
    pub ticket_key: String,
    pub outcome: RepairOutcome,
}

/// Drafts test cases for each issue in turn.
pub async fn generate_test_cases(
    ctx: &AppContext,
    issue_keys: &[String],
    request: &GenerationRequest,
) -> AppResult<Vec<GeneratedTestCases>> {
    let tickets = ctx.issue_tracker.list_issues(issue_keys).await?;
    let mut generated = Vec::with_capacity(tickets.len());

    for (index, ticket) in tickets.iter().enumerate() {
        log::info!(
            "{}/{} generating test cases for {} (id {})",
            index + 1,
            tickets.len(),
            ticket.key,
            ticket.id
        );
        let raw = complete_for(ctx, ticket, request, GenerationMode::TestCases).await?;
        let outcome = repair(&raw);
        match &outcome {
            RepairOutcome::NoArrayFound => {
                log::warn!("no JSON array found in the response for {}", ticket.key)
            }
            RepairOutcome::Repaired(objects) => {
                log::info!("recovered {} test cases for {}", objects.len(), ticket.key)
            }
        }
        generated.push(GeneratedTestCases {
            ticket_key: ticket.key.clone(),
            outcome,
        });
    }

    Ok(generated)
}

/// Drafts a test strategy (scenario titles) for one issue.
pub async fn generate_strategy(
    ctx: &AppContext,
    issue_key: &str,
    request: &GenerationRequest,
) -> AppResult<String> {
    let ticket = ctx.issue_tracker.get_issue(issue_key).await?;
    log::info!("generating test strategy for {}", ticket.key);
    complete_for(ctx, &ticket, request, GenerationMode::Strategy).await
}

async fn complete_for(
    ctx: &AppContext,
    ticket: &TicketContext,
    request: &GenerationRequest,
    mode: GenerationMode,
) -> AppResult<String> {
    let prompt = build_prompt(ctx, ticket, request, mode).await;
    log::debug!("assembled {} prompt for {}", mode.as_str(), ticket.key);
    ctx.language_model
        .complete(&request.system_prompt, &prompt)
        .await
}

/// Assembles the prompt, adding documentation context when it can be fetched.
pub async fn build_prompt(
    ctx: &AppContext,
    ticket: &TicketContext,
    request: &GenerationRequest,
    mode: GenerationMode,
) -> String {
    let snippets = if mode.uses_retrieval() {
        documentation_for(ctx, ticket, request.retrieval_token.as_deref()).await
    } else {
        Vec::new()
    };
    assemble(ticket, &request.user_prompt, mode, &snippets)
}

async fn documentation_for(
    ctx: &AppContext,
    ticket: &TicketContext,
    token: Option<&str>,
) -> Vec<DocumentationSnippet> {
    let Some(retrieval) = ctx.retrieval.as_ref() else {
        return Vec::new();
    };
    let Some(token) = token.filter(|token| !token.trim().is_empty()) else {
        log::info!("no retrieval token supplied; skipping documentation lookup");
        return Vec::new();
    };

    let query = build_search_query(ticket);
    if query.is_empty() {
        return Vec::new();
    }

    let settings = &ctx.config.retrieval;
    match retrieval
        .search(token, &query, settings.max_items, settings.min_score)
        .await
    {
        Ok(snippets) => {
            log::info!(
                "found {} documentation snippets for {}",
                snippets.len(),
                ticket.key
            );
            for snippet in &snippets {
                log::debug!("snippet (score {:.2}): {}", snippet.score, snippet.text);
            }
            snippets
        }
        Err(err) => {
            log::warn!("documentation lookup failed, continuing without context: {err}");
            Vec::new()
        }
    }
}
