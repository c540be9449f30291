//! Exam Service
//!
//! The single owner of all exam state: registry, topic catalog, live sessions
//! and the results ledger. Every transition consults [`Phase`] before mutating
//! anything, so the state machine stays authoritative regardless of what the
//! driving model asks for.

use crate::{
    error::ExamError,
    ledger::{LedgerSummary, MAX_SCORE, ResultRecord, ResultsLedger},
    operation::OperationKind,
    registry::CandidateRegistry,
    session::{Clock, ExamSession, Phase, SessionStore, SystemClock},
    topic::{TopicAdvance, TopicCatalog},
};
use rand::{SeedableRng, rngs::StdRng};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Number of known identifiers offered when a candidate is not found.
const SUGGESTION_LIMIT: usize = 3;

/// Snapshot of a candidate's position in the exam, used to brief the model
/// each turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExamProgress {
    pub phase: Phase,
    pub current_topic: Option<String>,
    pub topic_index: usize,
    pub total_topics: usize,
    pub questions_on_topic: u32,
}

impl ExamProgress {
    pub fn is_active(&self) -> bool {
        !matches!(self.phase, Phase::NotStarted | Phase::Closed)
    }

    pub fn all_topics_done(&self) -> bool {
        self.phase == Phase::AllTopicsDone
    }
}

pub struct ExamService {
    registry: CandidateRegistry,
    catalog: TopicCatalog,
    sessions: SessionStore,
    ledger: ResultsLedger,
    rng: StdRng,
    clock: Arc<dyn Clock>,
}

impl ExamService {
    pub fn new(registry: CandidateRegistry, catalog: TopicCatalog) -> Self {
        Self::with_parts(registry, catalog, StdRng::from_os_rng(), Arc::new(SystemClock))
    }

    /// Builds a service with an explicit random source and clock.
    pub fn with_parts(
        registry: CandidateRegistry,
        catalog: TopicCatalog,
        rng: StdRng,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            catalog,
            sessions: SessionStore::new(),
            ledger: ResultsLedger::new(),
            rng,
            clock,
        }
    }

    pub fn registry(&self) -> &CandidateRegistry {
        &self.registry
    }

    pub fn session(&self, identifier: &str) -> Option<&ExamSession> {
        self.sessions.get(identifier)
    }

    pub fn phase(&self, identifier: &str) -> Phase {
        Phase::of(self.sessions.get(identifier))
    }

    /// The candidate this conversation is examining, if any exam is live.
    pub fn current_candidate(&self) -> Option<&str> {
        self.sessions.current_candidate()
    }

    pub fn progress(&self, identifier: &str) -> ExamProgress {
        let session = self.sessions.get(identifier);
        ExamProgress {
            phase: Phase::of(session),
            current_topic: session.and_then(|s| s.current_topic()).map(str::to_owned),
            topic_index: session.map_or(0, ExamSession::current_topic_index),
            total_topics: session.map_or(0, |s| s.topics().len()),
            questions_on_topic: session.map_or(0, ExamSession::questions_on_topic),
        }
    }

    fn ensure_allowed(&self, identifier: &str, operation: OperationKind) -> Result<(), ExamError> {
        let phase = self.phase(identifier);
        if phase.allows(operation) {
            return Ok(());
        }
        warn!(%identifier, %operation, %phase, "Operation refused by exam phase");
        Err(match (phase, operation) {
            (Phase::NotStarted, _) => ExamError::NoActiveSession {
                identifier: identifier.to_string(),
            },
            _ => ExamError::OperationNotAllowed { operation, phase },
        })
    }

    /// Opens an exam for a registered, active candidate.
    pub fn start(&mut self, identifier: &str, name: &str) -> Result<&ExamSession, ExamError> {
        if self.sessions.contains(identifier) {
            return Err(ExamError::AlreadyActive {
                identifier: identifier.to_string(),
                name: name.to_string(),
            });
        }
        let candidate = self
            .registry
            .lookup(identifier)
            .ok_or_else(|| ExamError::UnknownCandidate {
                identifier: identifier.to_string(),
                suggestions: self.registry.suggestions(SUGGESTION_LIMIT),
            })?;
        if !candidate.active {
            return Err(ExamError::InactiveCandidate {
                identifier: identifier.to_string(),
            });
        }

        let topics = self.catalog.sample(&mut self.rng);
        info!(%identifier, %name, topics = ?topics, "Exam started");
        let session = ExamSession::new(identifier, name, topics, self.clock.now());
        self.sessions.insert(session)
    }

    /// Moves the candidate's exam to its next topic.
    pub fn advance(&mut self, identifier: &str) -> Result<TopicAdvance, ExamError> {
        self.ensure_allowed(identifier, OperationKind::Advance)?;
        let session = self
            .sessions
            .get_mut(identifier)
            .ok_or_else(|| ExamError::NoActiveSession {
                identifier: identifier.to_string(),
            })?;
        let step = session.advance();
        info!(
            %identifier,
            topic_index = session.current_topic_index(),
            total_topics = session.topics().len(),
            finished = step.is_finished(),
            "Advanced exam topic"
        );
        Ok(step)
    }

    /// Scores the exam, records the result and frees the candidate identifier.
    pub fn close(
        &mut self,
        identifier: &str,
        score: f64,
        feedback: &str,
    ) -> Result<&ResultRecord, ExamError> {
        self.ensure_allowed(identifier, OperationKind::Close)?;
        if !score.is_finite() || !(0.0..=MAX_SCORE).contains(&score) {
            return Err(ExamError::MalformedArguments(format!(
                "score must be between 0 and {MAX_SCORE}, got {score}"
            )));
        }
        let session = self
            .sessions
            .remove(identifier)
            .ok_or_else(|| ExamError::NoActiveSession {
                identifier: identifier.to_string(),
            })?;

        let record = ResultRecord::from_session(session, score, feedback.to_string(), self.clock.now());
        info!(
            %identifier,
            score = record.score,
            grade = %record.grade,
            duration_minutes = record.duration_minutes,
            "Exam closed"
        );
        Ok(self.ledger.append(record))
    }

    /// Logs one completed conversational turn against a live exam. Returns
    /// `false` when the candidate has no live session.
    pub fn record_exchange(&mut self, identifier: &str, question: &str, answer: &str) -> bool {
        let now = self.clock.now();
        match self.sessions.get_mut(identifier) {
            Some(session) => {
                session.record_exchange(question, answer, now);
                true
            }
            None => false,
        }
    }

    pub fn results(&self) -> &[ResultRecord] {
        self.ledger.records()
    }

    pub fn summary(&self) -> Option<LedgerSummary> {
        self.ledger.summary()
    }

    /// Human-readable statistics report. Never fails.
    pub fn statistics(&self) -> String {
        self.ledger.statistics()
    }
}
