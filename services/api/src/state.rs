//! Shared Application State
//!
//! Holds the exam agent (which owns the exam service) and the loaded
//! configuration.

use crate::config::Config;
use examiner_core::agent::ExamAgent;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<ExamAgent>,
    pub config: Arc<Config>,
}
