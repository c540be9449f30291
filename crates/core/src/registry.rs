//! Candidate Registry
//!
//! A fixed allow-list of candidates, loaded once at startup. The exam core only
//! ever reads from it.

use serde::{Deserialize, Serialize};

/// A person eligible to sit the exam.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Unique contact address, e.g. `test@lpnu.ua`.
    pub identifier: String,
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Candidate {
    pub fn new(identifier: impl Into<String>, name: impl Into<String>, active: bool) -> Self {
        Self {
            identifier: identifier.into(),
            name: name.into(),
            active,
        }
    }
}

/// Read-only roster lookup. Roster order is preserved for suggestions.
#[derive(Debug, Clone, Default)]
pub struct CandidateRegistry {
    candidates: Vec<Candidate>,
}

impl CandidateRegistry {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self { candidates }
    }

    pub fn lookup(&self, identifier: &str) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.identifier == identifier)
    }

    /// Up to `limit` known identifiers, in roster order.
    pub fn suggestions(&self, limit: usize) -> Vec<String> {
        self.candidates
            .iter()
            .take(limit)
            .map(|c| c.identifier.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

impl Default for Candidate {
    fn default() -> Self {
        Self::new("test@lpnu.ua", "Test Student", true)
    }
}

/// The roster used when no data file is configured.
pub fn default_registry() -> CandidateRegistry {
    CandidateRegistry::new(vec![Candidate::default()])
}
