//! Exam Session Store
//!
//! Live exam sessions keyed by candidate identifier, plus the phase model that
//! decides which operations a session may receive next.

use crate::{error::ExamError, operation::OperationKind, topic::TopicAdvance};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{
    collections::{HashMap, hash_map::Entry},
    fmt,
};

/// Source of "now" for session timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// One conversational exchange logged against a live session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interaction {
    /// Topic being examined when the exchange happened; `None` once every
    /// topic has been covered.
    pub topic: Option<String>,
    pub question: String,
    pub answer: String,
    pub at: DateTime<Utc>,
}

/// The mutable record of one candidate's exam.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExamSession {
    pub identifier: String,
    pub name: String,
    pub started_at: DateTime<Utc>,
    topics: Vec<String>,
    current_topic_index: usize,
    questions_on_topic: u32,
    interactions: Vec<Interaction>,
}

impl ExamSession {
    /// `topics` must not be empty; it is fixed for the lifetime of the session.
    pub fn new(
        identifier: impl Into<String>,
        name: impl Into<String>,
        topics: Vec<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        debug_assert!(!topics.is_empty(), "a session needs at least one topic");
        Self {
            identifier: identifier.into(),
            name: name.into(),
            started_at,
            topics,
            current_topic_index: 0,
            questions_on_topic: 0,
            interactions: Vec::new(),
        }
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    pub fn current_topic_index(&self) -> usize {
        self.current_topic_index
    }

    pub fn questions_on_topic(&self) -> u32 {
        self.questions_on_topic
    }

    pub fn interactions(&self) -> &[Interaction] {
        &self.interactions
    }

    /// The topic under examination, or `None` once all topics are exhausted.
    pub fn current_topic(&self) -> Option<&str> {
        self.topics.get(self.current_topic_index).map(String::as_str)
    }

    pub fn all_topics_done(&self) -> bool {
        self.current_topic_index >= self.topics.len()
    }

    /// Moves to the next topic and resets the per-topic question counter.
    ///
    /// Callers gate this on [`Phase::InProgress`]; the index never passes the
    /// topic count.
    pub(crate) fn advance(&mut self) -> TopicAdvance {
        self.current_topic_index = (self.current_topic_index + 1).min(self.topics.len());
        self.questions_on_topic = 0;

        match self.topics.get(self.current_topic_index) {
            None => TopicAdvance::Finished,
            Some(topic) => TopicAdvance::Next {
                topic: topic.clone(),
                topic_number: self.current_topic_index + 1,
                total_topics: self.topics.len(),
            },
        }
    }

    /// Logs an exchange; the question counter only moves while a topic is open.
    pub(crate) fn record_exchange(&mut self, question: &str, answer: &str, at: DateTime<Utc>) {
        let topic = self.current_topic().map(str::to_owned);
        if topic.is_some() {
            self.questions_on_topic += 1;
        }
        self.interactions.push(Interaction {
            topic,
            question: question.to_owned(),
            answer: answer.to_owned(),
            at,
        });
    }
}

/// Derived lifecycle state of a candidate's exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    NotStarted,
    InProgress,
    AllTopicsDone,
    /// Only observed transiently: a closed session is removed from the store,
    /// after which lookups report `NotStarted` again.
    Closed,
}

impl Phase {
    /// The single source of truth for a session's phase.
    pub fn of(session: Option<&ExamSession>) -> Self {
        match session {
            None => Phase::NotStarted,
            Some(s) if s.all_topics_done() => Phase::AllTopicsDone,
            Some(_) => Phase::InProgress,
        }
    }

    /// Operations the driving agent may be offered in this phase.
    pub fn allowed_operations(self) -> &'static [OperationKind] {
        match self {
            Phase::NotStarted => &[OperationKind::Start],
            Phase::InProgress => &[OperationKind::Advance],
            Phase::AllTopicsDone => &[OperationKind::Close],
            Phase::Closed => &[],
        }
    }

    pub fn allows(self, operation: OperationKind) -> bool {
        self.allowed_operations().contains(&operation)
    }

    /// Machine-readable name, matching the serialized form.
    pub fn wire_name(self) -> &'static str {
        match self {
            Phase::NotStarted => "not_started",
            Phase::InProgress => "in_progress",
            Phase::AllTopicsDone => "all_topics_done",
            Phase::Closed => "closed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::NotStarted => write!(f, "not started"),
            Phase::InProgress => write!(f, "in progress"),
            Phase::AllTopicsDone => write!(f, "awaiting close"),
            Phase::Closed => write!(f, "closed"),
        }
    }
}

/// In-memory table of live sessions; at most one per candidate identifier.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<String, ExamSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, identifier: &str) -> Option<&ExamSession> {
        self.sessions.get(identifier)
    }

    pub(crate) fn get_mut(&mut self, identifier: &str) -> Option<&mut ExamSession> {
        self.sessions.get_mut(identifier)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.sessions.contains_key(identifier)
    }

    /// Stores a new session. A live session under the same identifier is
    /// kept and the new one is refused.
    pub(crate) fn insert(&mut self, session: ExamSession) -> Result<&ExamSession, ExamError> {
        match self.sessions.entry(session.identifier.clone()) {
            Entry::Occupied(_) => Err(ExamError::AlreadyActive {
                identifier: session.identifier,
                name: session.name,
            }),
            Entry::Vacant(slot) => Ok(slot.insert(session)),
        }
    }

    /// Removes and returns the session; absent identifiers are ignored.
    pub fn remove(&mut self, identifier: &str) -> Option<ExamSession> {
        self.sessions.remove(identifier)
    }

    /// Identifier of the earliest-started live session.
    pub fn current_candidate(&self) -> Option<&str> {
        self.sessions
            .values()
            .min_by(|a, b| {
                a.started_at
                    .cmp(&b.started_at)
                    .then_with(|| a.identifier.cmp(&b.identifier))
            })
            .map(|s| s.identifier.as_str())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
    }

    fn session(topics: &[&str]) -> ExamSession {
        ExamSession::new(
            "a@x.io",
            "A",
            topics.iter().map(|t| t.to_string()).collect(),
            t0(),
        )
    }

    #[test]
    fn advance_walks_topics_then_finishes() {
        let mut s = session(&["One", "Two"]);
        assert_eq!(s.current_topic(), Some("One"));

        let step = s.advance();
        assert_eq!(
            step,
            TopicAdvance::Next {
                topic: "Two".into(),
                topic_number: 2,
                total_topics: 2
            }
        );
        assert_eq!(s.current_topic_index(), 1);

        assert!(s.advance().is_finished());
        assert_eq!(s.current_topic_index(), 2);
        assert!(s.all_topics_done());
        assert_eq!(s.current_topic(), None);
    }

    #[test]
    fn advance_resets_question_counter() {
        let mut s = session(&["One", "Two", "Three"]);
        s.record_exchange("q1", "a1", t0());
        s.record_exchange("q2", "a2", t0());
        assert_eq!(s.questions_on_topic(), 2);

        s.advance();
        assert_eq!(s.questions_on_topic(), 0);
        s.record_exchange("q3", "a3", t0());
        assert_eq!(s.questions_on_topic(), 1);
        assert_eq!(s.interactions().len(), 3);
        assert_eq!(s.interactions()[2].topic.as_deref(), Some("Two"));
    }

    #[test]
    fn exchanges_after_last_topic_are_logged_but_not_counted() {
        let mut s = session(&["One", "Two"]);
        s.advance();
        s.advance();
        s.record_exchange("bye", "thanks", t0());
        assert_eq!(s.questions_on_topic(), 0);
        assert_eq!(s.interactions().len(), 1);
        assert_eq!(s.interactions()[0].topic, None);
    }

    #[test]
    fn phase_is_derived_from_index() {
        assert_eq!(Phase::of(None), Phase::NotStarted);

        let mut s = session(&["One", "Two"]);
        assert_eq!(Phase::of(Some(&s)), Phase::InProgress);
        s.advance();
        assert_eq!(Phase::of(Some(&s)), Phase::InProgress);
        s.advance();
        assert_eq!(Phase::of(Some(&s)), Phase::AllTopicsDone);
    }

    #[test]
    fn gating_offers_exactly_one_operation_per_live_phase() {
        assert_eq!(Phase::NotStarted.allowed_operations(), &[OperationKind::Start]);
        assert_eq!(Phase::InProgress.allowed_operations(), &[OperationKind::Advance]);
        assert_eq!(Phase::AllTopicsDone.allowed_operations(), &[OperationKind::Close]);
        assert!(Phase::Closed.allowed_operations().is_empty());

        assert!(!Phase::InProgress.allows(OperationKind::Close));
        assert!(!Phase::AllTopicsDone.allows(OperationKind::Advance));
        assert!(!Phase::AllTopicsDone.allows(OperationKind::Start));
        assert_eq!(Phase::AllTopicsDone.wire_name(), "all_topics_done");
    }

    #[test]
    fn store_current_candidate_is_earliest_started() {
        let mut store = SessionStore::new();
        assert_eq!(store.current_candidate(), None);

        store
            .insert(ExamSession::new("late@x.io", "L", vec!["T".into()], t0() + Duration::minutes(5)))
            .unwrap();
        store
            .insert(ExamSession::new("early@x.io", "E", vec!["T".into()], t0()))
            .unwrap();
        assert_eq!(store.current_candidate(), Some("early@x.io"));

        store.remove("early@x.io");
        assert_eq!(store.current_candidate(), Some("late@x.io"));
        assert!(store.remove("missing@x.io").is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn store_refuses_to_replace_a_live_session() {
        let mut store = SessionStore::new();
        store
            .insert(ExamSession::new("a@x.io", "A", vec!["First".into()], t0()))
            .unwrap();

        let err = store
            .insert(ExamSession::new("a@x.io", "Again", vec!["Second".into()], t0() + Duration::minutes(1)))
            .unwrap_err();
        assert_eq!(
            err,
            ExamError::AlreadyActive {
                identifier: "a@x.io".into(),
                name: "Again".into(),
            }
        );

        let kept = store.get("a@x.io").unwrap();
        assert_eq!(kept.name, "A");
        assert_eq!(kept.topics(), ["First"]);
        assert_eq!(store.len(), 1);
    }
}
