use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::{IssueTrackerService, LanguageModelService, RetrievalService};

#[derive(Clone)]
pub struct AppContext {
    pub config: AppConfig,
    pub issue_tracker: Arc<dyn IssueTrackerService>,
    pub language_model: Arc<dyn LanguageModelService>,
    /// Absent when no documentation search service is configured.
    pub retrieval: Option<Arc<dyn RetrievalService>>,
}

impl AppContext {
    pub fn new(
        config: AppConfig,
        issue_tracker: Arc<dyn IssueTrackerService>,
        language_model: Arc<dyn LanguageModelService>,
        retrieval: Option<Arc<dyn RetrievalService>>,
    ) -> Self {
        Self {
            config,
            issue_tracker,
            language_model,
            retrieval,
        }
    }
}
