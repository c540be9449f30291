//! Error types for the exam core.
//!
//! Operation-level failures (`ExamError`) never leave the dispatcher: they are
//! folded into an [`OperationOutcome`](crate::dispatcher::OperationOutcome) so
//! the driving model always sees a uniform envelope. Credential and upstream
//! failures are handled at the turn boundary by the agent.

use crate::{operation::OperationKind, session::Phase};

/// Failures of a single exam state transition.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExamError {
    #[error("An exam is already in progress for {name}. Finish it before starting a new one.")]
    AlreadyActive { identifier: String, name: String },
    #[error("{}", unknown_candidate_message(.identifier, .suggestions))]
    UnknownCandidate {
        identifier: String,
        suggestions: Vec<String>,
    },
    #[error("The account {identifier} is not active.")]
    InactiveCandidate { identifier: String },
    #[error("No active exam found for {identifier}.")]
    NoActiveSession { identifier: String },
    #[error("Malformed arguments: {0}")]
    MalformedArguments(String),
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),
    #[error("Operation '{operation}' is not allowed while the exam is {phase}.")]
    OperationNotAllowed {
        operation: OperationKind,
        phase: Phase,
    },
}

fn unknown_candidate_message(identifier: &str, suggestions: &[String]) -> String {
    let mut message = format!("Candidate {identifier} was not found in the registry.");
    if !suggestions.is_empty() {
        message.push_str("\n\nKnown candidates:");
        for suggestion in suggestions {
            message.push_str("\n• ");
            message.push_str(suggestion);
        }
    }
    message
}

/// A topic list that cannot back an exam.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("topic catalog contains a blank topic")]
    BlankTopic,
    #[error("topic catalog needs at least {required} distinct topics, found {found}")]
    TooFewTopics { required: usize, found: usize },
}

/// Rejections of the credential supplied with a conversational turn.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    #[error(
        "Please enter your API key first.\n\nCreate one in your provider console under \"API Keys\" and paste it into the key field."
    )]
    Missing,
    #[error("Invalid API key format. The key must start with '{expected_prefix}'.")]
    Malformed { expected_prefix: String },
}

/// Classification of a failed call to the completion backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionErrorKind {
    /// Credential rejected (401/403, invalid key).
    Auth,
    /// Request quota exhausted (429).
    RateLimit,
    /// Transport-level failure.
    Network,
    /// The backend answered with something we could not interpret.
    InvalidResponse,
    Other,
}

/// The completion backend call itself failed.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct CompletionError {
    pub kind: CompletionErrorKind,
    pub message: String,
}

impl CompletionError {
    pub fn new(kind: CompletionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(CompletionErrorKind::Auth, message)
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(CompletionErrorKind::RateLimit, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(CompletionErrorKind::InvalidResponse, message)
    }

    /// The user-facing text shown in place of a reply when this error ends a turn.
    pub fn remediation(&self) -> String {
        let mut text = format!("Error: {}\n\n", self.message);
        match self.kind {
            CompletionErrorKind::Auth => {
                text.push_str("Check your API key:\n");
                text.push_str("- make sure it was copied completely\n");
                text.push_str("- create a new key in your provider console if needed\n");
            }
            CompletionErrorKind::RateLimit => {
                text.push_str("The request limit was exceeded. Please wait a moment and try again.\n");
            }
            CompletionErrorKind::Network
            | CompletionErrorKind::InvalidResponse
            | CompletionErrorKind::Other => {
                text.push_str(&format!("Details: {}", self.message));
            }
        }
        text
    }
}
