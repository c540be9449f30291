//! Startup data: the candidate roster and topic catalog, either built in or
//! read from a JSON file.

use anyhow::Context;
use examiner_core::{
    registry::{Candidate, CandidateRegistry, default_registry},
    topic::TopicCatalog,
};
use serde::Deserialize;
use std::{fs, path::Path};

#[derive(Debug, Deserialize)]
struct ExamDataFile {
    #[serde(default)]
    candidates: Vec<Candidate>,
    topics: Option<Vec<String>>,
}

/// Roster and catalog the exam service is built from.
#[derive(Debug)]
pub struct ExamData {
    pub registry: CandidateRegistry,
    pub catalog: TopicCatalog,
}

impl Default for ExamData {
    fn default() -> Self {
        Self {
            registry: default_registry(),
            catalog: TopicCatalog::default(),
        }
    }
}

impl ExamData {
    /// Reads `{ "candidates": [...], "topics": [...] }`. Either list may be
    /// omitted to keep the built-in one. A topic list that cannot fill a
    /// session (blank entries, too few distinct topics) is an error.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read exam data from {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("Invalid exam data in {}", path.display()))
    }

    fn parse(raw: &str) -> anyhow::Result<Self> {
        let file: ExamDataFile = serde_json::from_str(raw)?;
        let defaults = Self::default();
        Ok(Self {
            registry: if file.candidates.is_empty() {
                defaults.registry
            } else {
                CandidateRegistry::new(file.candidates)
            },
            catalog: match file.topics {
                Some(topics) => TopicCatalog::new(topics)?,
                None => defaults.catalog,
            },
        })
    }
}
