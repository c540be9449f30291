//! API Models
//!
//! Request and response bodies for the HTTP relay, annotated for OpenAPI
//! generation with `utoipa`.

use chrono::{DateTime, Utc};
use examiner_core::{
    agent::Turn,
    ledger::{LedgerSummary, ResultRecord},
    service::ExamProgress,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One (user, assistant) exchange of the visible chat.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct ChatTurn {
    #[schema(example = "My name is Ivan, ivan@lpnu.ua")]
    pub user: String,
    #[serde(default)]
    pub assistant: String,
}

impl From<ChatTurn> for Turn {
    fn from(turn: ChatTurn) -> Self {
        Turn::new(turn.user, turn.assistant)
    }
}

impl From<Turn> for ChatTurn {
    fn from(turn: Turn) -> Self {
        Self {
            user: turn.user,
            assistant: turn.assistant,
        }
    }
}

#[derive(Deserialize, ToSchema, Debug)]
pub struct ChatPayload {
    #[schema(example = "Hello, I'm ready for the exam")]
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
    /// Completion-backend key supplied by the user for this turn.
    #[serde(default)]
    #[schema(example = "gsk_...")]
    pub api_key: String,
}

#[derive(Serialize, ToSchema, Debug)]
pub struct ChatResponse {
    pub reply: String,
    pub history: Vec<ChatTurn>,
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct ExamResult {
    pub email: String,
    pub name: String,
    pub score: f64,
    #[schema(example = "good")]
    pub grade: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_minutes: f64,
    pub topics: Vec<String>,
    pub feedback: String,
    /// Conversational turns logged while the exam was live.
    pub interaction_count: usize,
}

impl From<&ResultRecord> for ExamResult {
    fn from(record: &ResultRecord) -> Self {
        Self {
            email: record.identifier.clone(),
            name: record.name.clone(),
            score: record.score,
            grade: record.grade.to_string(),
            started_at: record.started_at,
            ended_at: record.ended_at,
            duration_minutes: record.duration_minutes,
            topics: record.topics.clone(),
            feedback: record.feedback.clone(),
            interaction_count: record.interaction_count,
        }
    }
}

#[derive(Serialize, ToSchema, Debug)]
pub struct StatisticsSummary {
    pub total_exams: usize,
    pub avg_score: f64,
    pub max_score: f64,
    pub min_score: f64,
    pub total_minutes: f64,
    pub recent: Vec<ExamResult>,
}

impl From<LedgerSummary> for StatisticsSummary {
    fn from(summary: LedgerSummary) -> Self {
        Self {
            total_exams: summary.total_exams,
            avg_score: summary.avg_score,
            max_score: summary.max_score,
            min_score: summary.min_score,
            total_minutes: summary.total_minutes,
            recent: summary.recent.iter().map(ExamResult::from).collect(),
        }
    }
}

#[derive(Serialize, ToSchema, Debug)]
pub struct StatisticsResponse {
    /// Human-readable report.
    pub report: String,
    /// Absent until the first exam has been closed.
    pub summary: Option<StatisticsSummary>,
}

#[derive(Serialize, ToSchema, Debug)]
pub struct ProgressResponse {
    pub email: String,
    #[schema(example = "in_progress")]
    pub phase: String,
    pub current_topic: Option<String>,
    /// 1-based position of the current topic.
    pub topic_number: Option<usize>,
    pub total_topics: usize,
    pub questions_on_topic: u32,
    pub allowed_operations: Vec<String>,
}

impl ProgressResponse {
    pub fn new(email: String, progress: ExamProgress) -> Self {
        Self {
            email,
            phase: progress.phase.wire_name().to_string(),
            topic_number: progress
                .current_topic
                .as_ref()
                .map(|_| progress.topic_index + 1),
            current_topic: progress.current_topic,
            total_topics: progress.total_topics,
            questions_on_topic: progress.questions_on_topic,
            allowed_operations: progress
                .phase
                .allowed_operations()
                .iter()
                .map(|op| op.wire_name().to_string())
                .collect(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use examiner_core::{ledger::GradeBand, session::Phase};

    #[test]
    fn chat_payload_defaults_history_and_key() {
        let payload: ChatPayload = serde_json::from_str(r#"{"message": "hi"}"#).unwrap();
        assert_eq!(payload.message, "hi");
        assert!(payload.history.is_empty());
        assert!(payload.api_key.is_empty());
    }

    #[test]
    fn turns_convert_both_ways() {
        let turn = ChatTurn {
            user: "q".into(),
            assistant: "a".into(),
        };
        let core: Turn = turn.clone().into();
        assert_eq!(core, Turn::new("q", "a"));
        assert_eq!(ChatTurn::from(core), turn);
    }

    #[test]
    fn progress_response_reports_offered_operations() {
        let progress = ExamProgress {
            phase: Phase::InProgress,
            current_topic: Some("BERT".into()),
            topic_index: 0,
            total_topics: 2,
            questions_on_topic: 1,
        };
        let response = ProgressResponse::new("a@x.io".into(), progress);
        assert_eq!(response.phase, "in_progress");
        assert_eq!(response.topic_number, Some(1));
        assert_eq!(response.allowed_operations, vec!["next_topic"]);

        let idle = ProgressResponse::new(
            "b@x.io".into(),
            ExamProgress {
                phase: Phase::NotStarted,
                current_topic: None,
                topic_index: 0,
                total_topics: 0,
                questions_on_topic: 0,
            },
        );
        assert_eq!(idle.phase, "not_started");
        assert_eq!(idle.topic_number, None);
        assert_eq!(idle.allowed_operations, vec!["start_exam"]);
    }

    #[test]
    fn exam_result_carries_every_record_field() {
        let started_at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let record = ResultRecord {
            identifier: "a@x.io".into(),
            name: "A".into(),
            score: 7.5,
            grade: GradeBand::Good,
            started_at,
            ended_at: started_at + chrono::Duration::minutes(14),
            duration_minutes: 14.0,
            topics: vec!["BERT".into(), "GPT".into()],
            feedback: "solid".into(),
            interaction_count: 4,
        };

        let value = serde_json::to_value(ExamResult::from(&record)).unwrap();
        assert_eq!(value["email"], "a@x.io");
        assert_eq!(value["grade"], "good");
        assert_eq!(value["duration_minutes"], 14.0);
        assert_eq!(value["topics"], serde_json::json!(["BERT", "GPT"]));
        assert_eq!(value["interaction_count"], 4);
    }
}
