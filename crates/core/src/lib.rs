//! Core of the oral-exam assistant: the candidate roster, exam sessions and
//! their phase model, the results ledger, the operations a language model may
//! invoke, and the turn loop that ties them to a completion backend.

pub mod agent;
pub mod dispatcher;
pub mod error;
pub mod ledger;
pub mod llm_client;
pub mod operation;
pub mod registry;
pub mod service;
pub mod session;
pub mod topic;

pub use agent::{AgentSettings, ExamAgent, Turn, TurnOutput};
pub use error::{CatalogError, CompletionError, CompletionErrorKind, CredentialError, ExamError};
pub use service::ExamService;
