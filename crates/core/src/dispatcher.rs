//! Operation Dispatcher
//!
//! Turns a raw tool invocation into an exam transition and wraps whatever
//! happened into one envelope shape, `{success, message, ...details}`. No error
//! escapes this module: the model always gets something it can read.

use crate::{
    error::ExamError,
    ledger::GradeBand,
    operation::Operation,
    service::ExamService,
    topic::TopicAdvance,
};
use serde::Serialize;
use tracing::{debug, info, warn};

/// The uniform result handed back to the model after each operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationOutcome {
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub details: Option<OutcomeDetails>,
}

/// Operation-specific fields merged into the envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutcomeDetails {
    Started {
        topics: Vec<String>,
        student_name: String,
    },
    Advanced {
        finished: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        current_topic: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        topic_number: Option<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        total_topics: Option<usize>,
    },
    Closed {
        score: f64,
        grade: GradeBand,
        duration: f64,
    },
}

impl OperationOutcome {
    fn ok(message: String, details: OutcomeDetails) -> Self {
        Self {
            success: true,
            message,
            details: Some(details),
        }
    }

    pub fn failure(error: &ExamError) -> Self {
        Self {
            success: false,
            message: error.to_string(),
            details: None,
        }
    }

    /// JSON text fed back into the transcript.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"success":{},"message":"unserializable outcome"}}"#, self.success)
        })
    }
}

/// Parses and runs one tool invocation against the service.
pub fn dispatch(service: &mut ExamService, name: &str, arguments: &str) -> OperationOutcome {
    debug!(operation = %name, %arguments, "Received operation request");
    let result = Operation::parse(name, arguments).and_then(|operation| {
        info!(
            operation = %operation.kind(),
            identifier = %operation.identifier(),
            "Dispatching operation"
        );
        execute(service, operation)
    });
    match result {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(operation = %name, error = %e, "Operation failed");
            OperationOutcome::failure(&e)
        }
    }
}

/// Runs an already-validated operation.
pub fn execute(service: &mut ExamService, operation: Operation) -> Result<OperationOutcome, ExamError> {
    match operation {
        Operation::Start(args) => {
            let session = service.start(&args.email, &args.name)?;
            let topics = session.topics().to_vec();
            let listing = topics
                .iter()
                .enumerate()
                .map(|(i, t)| format!("{}. {}", i + 1, t))
                .collect::<Vec<_>>()
                .join("\n");
            Ok(OperationOutcome::ok(
                format!("Exam started for {}!\n\nYour topics:\n{}", args.name, listing),
                OutcomeDetails::Started {
                    topics,
                    student_name: args.name,
                },
            ))
        }
        Operation::Advance(args) => Ok(match service.advance(&args.email)? {
            TopicAdvance::Finished => OperationOutcome::ok(
                "All topics are covered! Time to finish the exam.".to_string(),
                OutcomeDetails::Advanced {
                    finished: true,
                    current_topic: None,
                    topic_number: None,
                    total_topics: None,
                },
            ),
            TopicAdvance::Next {
                topic,
                topic_number,
                total_topics,
            } => OperationOutcome::ok(
                format!("Moving on to topic {topic_number}/{total_topics}: {topic}"),
                OutcomeDetails::Advanced {
                    finished: false,
                    current_topic: Some(topic),
                    topic_number: Some(topic_number),
                    total_topics: Some(total_topics),
                },
            ),
        }),
        Operation::Close(args) => {
            let record = service.close(&args.email, args.score, &args.feedback)?;
            Ok(OperationOutcome::ok(
                format!(
                    "{}\n\nYour score: {}/10\nDuration: {:.1} min",
                    record.grade.headline(),
                    record.score,
                    record.duration_minutes
                ),
                OutcomeDetails::Closed {
                    score: record.score,
                    grade: record.grade,
                    duration: record.duration_minutes,
                },
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::tests::{service_with_clock, service_with_topic_count};
    use chrono::Duration;
    use serde_json::Value;

    fn json(outcome: &OperationOutcome) -> Value {
        serde_json::from_str(&outcome.to_json()).unwrap()
    }

    #[test]
    fn start_envelope_carries_topics() {
        let (mut service, _) = service_with_clock(5);
        let outcome = dispatch(
            &mut service,
            "start_exam",
            r#"{"email": "a@x.io", "name": "A"}"#,
        );
        let value = json(&outcome);
        assert_eq!(value["success"], true);
        assert_eq!(value["student_name"], "A");
        let topics = value["topics"].as_array().unwrap();
        assert!((2..=3).contains(&topics.len()));
        assert!(outcome.message.contains("1. "));

        let again = dispatch(
            &mut service,
            "start_exam",
            r#"{"email": "a@x.io", "name": "A"}"#,
        );
        assert!(!again.success);
        assert!(again.message.contains("already in progress"));
    }

    #[test]
    fn advance_and_close_envelopes() {
        let (mut service, clock) = service_with_topic_count(2);
        dispatch(&mut service, "start_exam", r#"{"email": "a@x.io", "name": "A"}"#);

        let next = json(&dispatch(&mut service, "next_topic", r#"{"email": "a@x.io"}"#));
        assert_eq!(next["success"], true);
        assert_eq!(next["finished"], false);
        assert_eq!(next["topic_number"], 2);
        assert_eq!(next["total_topics"], 2);
        assert!(next["current_topic"].is_string());

        let done = json(&dispatch(&mut service, "next_topic", r#"{"email": "a@x.io"}"#));
        assert_eq!(done["finished"], true);
        assert!(done.get("current_topic").is_none());

        clock.tick(Duration::minutes(12));
        let closed = json(&dispatch(
            &mut service,
            "end_exam",
            r#"{"email": "a@x.io", "score": "8", "feedback": "ok"}"#,
        ));
        assert_eq!(closed["success"], true);
        assert_eq!(closed["grade"], "good");
        assert_eq!(closed["score"], 8.0);
        assert_eq!(closed["duration"], 12.0);
        assert_eq!(service.results().len(), 1);
    }

    #[test]
    fn failures_become_uniform_envelopes() {
        let (mut service, _) = service_with_clock(5);
        let cases = [
            ("launch_rocket", "{}"),
            ("start_exam", "not json"),
            ("start_exam", r#"{"name": "A"}"#),
            ("start_exam", r#"{"email": "z@x.io", "name": "Z"}"#),
            ("next_topic", r#"{"email": "a@x.io"}"#),
            ("end_exam", r#"{"email": "a@x.io", "score": 5, "feedback": "x"}"#),
        ];
        for (name, args) in cases {
            let value = json(&dispatch(&mut service, name, args));
            assert_eq!(value["success"], false, "{name} {args}");
            assert!(value["message"].as_str().is_some_and(|m| !m.is_empty()));
            assert_eq!(value.as_object().unwrap().len(), 2);
        }
        assert!(service.results().is_empty());
    }

    #[test]
    fn unknown_candidate_message_suggests_known_identifiers() {
        let (mut service, _) = service_with_clock(5);
        let outcome = dispatch(
            &mut service,
            "start_exam",
            r#"{"email": "z@x.io", "name": "Z"}"#,
        );
        assert!(!outcome.success);
        assert!(outcome.message.contains("• a@x.io"));
        assert!(outcome.message.contains("• b@x.io"));
        assert!(!outcome.message.contains("c@x.io"));
    }
}
