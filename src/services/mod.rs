pub mod bulk_import;
pub mod issue_tracker;
pub mod language_model;
pub mod retrieval;

pub use bulk_import::BulkImportService;
pub use issue_tracker::IssueTrackerService;
pub use language_model::LanguageModelService;
pub use retrieval::RetrievalService;
