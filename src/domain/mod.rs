pub mod import;
pub mod prompt;
pub mod repair;
pub mod retrieval;
pub mod testcase;
pub mod ticket;
