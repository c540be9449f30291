//! Scoring & Results Ledger
//!
//! Closed sessions are folded into immutable [`ResultRecord`]s and appended to
//! an ordered ledger. Aggregate statistics are computed on demand and never
//! fail.

use crate::session::ExamSession;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Highest score an examiner can award.
pub const MAX_SCORE: f64 = 10.0;

/// How many recent records the statistics report lists.
const RECENT_RECORDS: usize = 5;

/// Shown by [`ResultsLedger::statistics`] when nothing has been recorded.
pub const EMPTY_LEDGER_MESSAGE: &str = "No exams have been completed yet.";

/// Qualitative band derived from a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeBand {
    Excellent,
    Good,
    Satisfactory,
    NeedsWork,
}

impl GradeBand {
    pub fn from_score(score: f64) -> Self {
        if score >= 9.0 {
            GradeBand::Excellent
        } else if score >= 7.0 {
            GradeBand::Good
        } else if score >= 5.0 {
            GradeBand::Satisfactory
        } else {
            GradeBand::NeedsWork
        }
    }

    pub fn headline(self) -> &'static str {
        match self {
            GradeBand::Excellent => "Excellent!",
            GradeBand::Good => "Good!",
            GradeBand::Satisfactory => "Satisfactory",
            GradeBand::NeedsWork => "More study needed",
        }
    }
}

impl fmt::Display for GradeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GradeBand::Excellent => write!(f, "excellent"),
            GradeBand::Good => write!(f, "good"),
            GradeBand::Satisfactory => write!(f, "satisfactory"),
            GradeBand::NeedsWork => write!(f, "needs_work"),
        }
    }
}

/// Immutable summary of one closed exam.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRecord {
    pub identifier: String,
    pub name: String,
    /// One decimal place, within `[0, 10]`.
    pub score: f64,
    pub grade: GradeBand,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Two decimal places, never negative.
    pub duration_minutes: f64,
    pub topics: Vec<String>,
    pub feedback: String,
    pub interaction_count: usize,
}

impl ResultRecord {
    /// Folds a finished session into a record. `score` must already be
    /// validated to lie within `[0, 10]`.
    pub fn from_session(
        session: ExamSession,
        score: f64,
        feedback: String,
        ended_at: DateTime<Utc>,
    ) -> Self {
        let score = round_to(score.clamp(0.0, MAX_SCORE), 1);
        let elapsed_ms = (ended_at - session.started_at).num_milliseconds().max(0);
        let duration_minutes = round_to(elapsed_ms as f64 / 60_000.0, 2);
        let interaction_count = session.interactions().len();
        Self {
            grade: GradeBand::from_score(score),
            topics: session.topics().to_vec(),
            identifier: session.identifier,
            name: session.name,
            score,
            started_at: session.started_at,
            ended_at,
            duration_minutes,
            feedback,
            interaction_count,
        }
    }
}

/// Rounds half away from zero to `decimals` places.
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Aggregate numbers over the whole ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerSummary {
    pub total_exams: usize,
    pub avg_score: f64,
    pub max_score: f64,
    pub min_score: f64,
    pub total_minutes: f64,
    /// Up to the five most recently closed records, oldest first.
    pub recent: Vec<ResultRecord>,
}

/// Append-only list of closed exams.
#[derive(Debug, Default)]
pub struct ResultsLedger {
    records: Vec<ResultRecord>,
}

impl ResultsLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: ResultRecord) -> &ResultRecord {
        self.records.push(record);
        &self.records[self.records.len() - 1]
    }

    pub fn records(&self) -> &[ResultRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn summary(&self) -> Option<LedgerSummary> {
        if self.records.is_empty() {
            return None;
        }
        let scores = self.records.iter().map(|r| r.score);
        let total: f64 = scores.clone().sum();
        let max_score = scores.clone().fold(f64::MIN, f64::max);
        let min_score = scores.fold(f64::MAX, f64::min);
        let start = self.records.len().saturating_sub(RECENT_RECORDS);

        Some(LedgerSummary {
            total_exams: self.records.len(),
            avg_score: total / self.records.len() as f64,
            max_score,
            min_score,
            total_minutes: self.records.iter().map(|r| r.duration_minutes).sum(),
            recent: self.records[start..].to_vec(),
        })
    }

    /// Human-readable report; the fixed empty-state message when no exam has
    /// been closed.
    pub fn statistics(&self) -> String {
        match self.summary() {
            None => EMPTY_LEDGER_MESSAGE.to_string(),
            Some(summary) => render_summary(&summary),
        }
    }
}

fn render_summary(summary: &LedgerSummary) -> String {
    let rule = "=".repeat(50);
    let mut out = String::from("EXAM STATISTICS\n");
    out.push_str(&rule);
    out.push_str("\n\nOVERALL:\n");
    out.push_str(&format!("Exams completed: {}\n", summary.total_exams));
    out.push_str(&format!("Average score: {:.2}/10\n", summary.avg_score));
    out.push_str(&format!("Highest score: {}/10\n", summary.max_score));
    out.push_str(&format!("Lowest score: {}/10\n", summary.min_score));
    out.push_str(&format!("Total time: {:.1} minutes\n\n", summary.total_minutes));
    out.push_str(&rule);
    out.push_str(&format!("\n\nLAST {RECENT_RECORDS} CANDIDATES:\n\n"));

    for (i, record) in summary.recent.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, record.name));
        out.push_str(&format!("   Score: {}/10\n", record.score));
        out.push_str(&format!("   Time: {:.1} min\n", record.duration_minutes));
        out.push_str(&format!("   Topics: {}\n\n", abbreviated_topics(&record.topics)));
    }
    out
}

fn abbreviated_topics(topics: &[String]) -> String {
    let mut list = topics
        .iter()
        .take(2)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if topics.len() > 2 {
        list.push_str(", ...");
    }
    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
    }

    fn record(name: &str, score: f64, minutes: i64, topics: &[&str]) -> ResultRecord {
        let session = ExamSession::new(
            format!("{name}@x.io"),
            name,
            topics.iter().map(|t| t.to_string()).collect(),
            t0(),
        );
        ResultRecord::from_session(session, score, "ok".into(), t0() + Duration::minutes(minutes))
    }

    #[test]
    fn grade_band_thresholds() {
        assert_eq!(GradeBand::from_score(10.0), GradeBand::Excellent);
        assert_eq!(GradeBand::from_score(9.0), GradeBand::Excellent);
        assert_eq!(GradeBand::from_score(8.9), GradeBand::Good);
        assert_eq!(GradeBand::from_score(7.0), GradeBand::Good);
        assert_eq!(GradeBand::from_score(6.9), GradeBand::Satisfactory);
        assert_eq!(GradeBand::from_score(5.0), GradeBand::Satisfactory);
        assert_eq!(GradeBand::from_score(4.9), GradeBand::NeedsWork);
        assert_eq!(GradeBand::from_score(3.0), GradeBand::NeedsWork);
        assert_eq!(GradeBand::from_score(0.0), GradeBand::NeedsWork);
        assert_eq!(GradeBand::Good.to_string(), "good");
    }

    #[test]
    fn record_rounds_score_and_duration() {
        let session = ExamSession::new("a@x.io", "A", vec!["T".into()], t0());
        let ended = t0() + Duration::seconds(125) + Duration::milliseconds(500);
        let r = ResultRecord::from_session(session, 7.46, "fine".into(), ended);

        assert_eq!(r.score, 7.5);
        assert_eq!(r.grade, GradeBand::Good);
        // 125.5 s = 2.091666... min
        assert_eq!(r.duration_minutes, 2.09);
        assert_eq!(r.started_at, t0());
        assert_eq!(r.ended_at, ended);
        assert_eq!(r.interaction_count, 0);
    }

    #[test]
    fn record_duration_is_never_negative() {
        let session = ExamSession::new("a@x.io", "A", vec!["T".into()], t0());
        let r = ResultRecord::from_session(session, 5.0, String::new(), t0() - Duration::minutes(1));
        assert_eq!(r.duration_minutes, 0.0);
    }

    #[test]
    fn statistics_on_empty_ledger() {
        let ledger = ResultsLedger::new();
        assert!(ledger.summary().is_none());
        assert_eq!(ledger.statistics(), EMPTY_LEDGER_MESSAGE);
    }

    #[test]
    fn summary_aggregates_all_records() {
        let mut ledger = ResultsLedger::new();
        ledger.append(record("a", 8.0, 10, &["T1", "T2"]));
        ledger.append(record("b", 6.0, 20, &["T1", "T2", "T3"]));
        ledger.append(record("c", 4.0, 30, &["T3", "T4"]));

        let summary = ledger.summary().unwrap();
        assert_eq!(summary.total_exams, 3);
        assert_eq!(summary.avg_score, 6.0);
        assert_eq!(summary.max_score, 8.0);
        assert_eq!(summary.min_score, 4.0);
        assert_eq!(summary.total_minutes, 60.0);
        assert_eq!(summary.recent.len(), 3);
    }

    #[test]
    fn statistics_lists_last_five_with_abbreviated_topics() {
        let mut ledger = ResultsLedger::new();
        for i in 0..7 {
            ledger.append(record(&format!("n{i}"), 5.0, 1, &["Alpha", "Beta", "Gamma"]));
        }
        let report = ledger.statistics();

        assert!(report.contains("Exams completed: 7"));
        assert!(report.contains("Average score: 5.00/10"));
        assert!(!report.contains("n0\n"));
        assert!(!report.contains("n1\n"));
        assert!(report.contains("1. n2\n"));
        assert!(report.contains("5. n6\n"));
        assert!(report.contains("Topics: Alpha, Beta, ..."));
        assert!(!report.contains("Gamma"));
    }

    #[test]
    fn two_topic_records_have_no_ellipsis() {
        assert_eq!(abbreviated_topics(&["A".into(), "B".into()]), "A, B");
        assert_eq!(abbreviated_topics(&["A".into()]), "A");
    }
}
