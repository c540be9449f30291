//! Exam Agent
//!
//! Drives one conversational turn: validates the credential, briefs the model
//! on the exam's progress, offers only the operations the current phase
//! allows, executes whatever the model asks for, and repeats until the model
//! answers in plain text or the round limit is hit.

use crate::{
    dispatcher::dispatch,
    error::CredentialError,
    llm_client::{ChatMessage, Completion, CompletionService},
    operation::specs_for,
    service::{ExamProgress, ExamService},
    session::Phase,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Reply used when the model never settles on a plain-text answer.
pub const FALLBACK_REPLY: &str = "Sorry, I can't answer that. Please try rephrasing your question.";

/// Questions per topic after which the model is nudged to move on.
const QUESTIONS_BEFORE_NUDGE: u32 = 3;

/// One (user, assistant) exchange of the visible chat history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub user: String,
    #[serde(default)]
    pub assistant: String,
}

impl Turn {
    pub fn new(user: impl Into<String>, assistant: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            assistant: assistant.into(),
        }
    }
}

/// What a turn hands back to the front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnOutput {
    pub reply: String,
    pub history: Vec<Turn>,
}

/// Tunables for the turn loop.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// How many operation rounds one turn may chain before giving up.
    pub max_operation_rounds: usize,
    /// Every credential must start with this.
    pub credential_prefix: String,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_operation_rounds: 3,
            credential_prefix: "gsk_".to_string(),
        }
    }
}

pub struct ExamAgent {
    service: Arc<Mutex<ExamService>>,
    completion: Arc<dyn CompletionService>,
    system_prompt: Arc<String>,
    settings: AgentSettings,
}

impl ExamAgent {
    pub fn new(
        service: Arc<Mutex<ExamService>>,
        completion: Arc<dyn CompletionService>,
        system_prompt: Arc<String>,
        settings: AgentSettings,
    ) -> Self {
        Self {
            service,
            completion,
            system_prompt,
            settings,
        }
    }

    pub fn service(&self) -> &Arc<Mutex<ExamService>> {
        &self.service
    }

    pub fn validate_credential(&self, credential: &str) -> Result<(), CredentialError> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(CredentialError::Missing);
        }
        if !credential.starts_with(&self.settings.credential_prefix) {
            return Err(CredentialError::Malformed {
                expected_prefix: self.settings.credential_prefix.clone(),
            });
        }
        Ok(())
    }

    /// Processes one user utterance to completion.
    ///
    /// Credential problems come back as the reply with `history` untouched.
    /// Every other outcome, including backend failures, appends the exchange
    /// to the history. The exchange is logged against the exam that was live
    /// when the turn began, if it still is.
    pub async fn handle_turn(&self, message: &str, mut history: Vec<Turn>, credential: &str) -> TurnOutput {
        if let Err(e) = self.validate_credential(credential) {
            warn!(error = %e, "Rejected turn credential");
            return TurnOutput {
                reply: e.to_string(),
                history,
            };
        }
        let credential = credential.trim();

        // Turns are serialized: the lock is held until the reply is settled.
        let mut service = self.service.lock().await;

        let mut transcript = vec![ChatMessage::System(self.system_prompt.as_str().to_owned())];
        let candidate = service.current_candidate().map(str::to_owned);
        if let Some(identifier) = &candidate {
            let progress = service.progress(identifier);
            info!(
                %identifier,
                phase = %progress.phase,
                topic = ?progress.current_topic,
                questions_on_topic = progress.questions_on_topic,
                "Exam progress"
            );
            if let Some(context) = progress_briefing(&progress) {
                transcript.push(ChatMessage::System(context));
            }
        }
        for turn in &history {
            transcript.push(ChatMessage::User(turn.user.clone()));
            if !turn.assistant.is_empty() {
                transcript.push(ChatMessage::Assistant(turn.assistant.clone()));
            }
        }
        transcript.push(ChatMessage::User(message.to_owned()));

        let reply = match self.run_rounds(&mut service, credential, transcript).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(kind = ?e.kind, error = %e, "Completion service failed");
                let reply = e.remediation();
                history.push(Turn::new(message, reply.clone()));
                return TurnOutput { reply, history };
            }
        };

        // Only an exam that was already live when the turn began is credited;
        // the turn that opens an exam is not one of its questions.
        if let Some(identifier) = &candidate {
            service.record_exchange(identifier, message, &reply);
        }

        history.push(Turn::new(message, reply.clone()));
        TurnOutput { reply, history }
    }

    /// Alternates between the model and the dispatcher until a plain-text
    /// reply arrives or the round limit is reached. Transitions made before
    /// the limit stay in effect.
    async fn run_rounds(
        &self,
        service: &mut ExamService,
        credential: &str,
        mut transcript: Vec<ChatMessage>,
    ) -> Result<String, crate::error::CompletionError> {
        let mut round = 0;
        loop {
            let phase = current_phase(service);
            let offered = specs_for(phase.allowed_operations());
            debug!(%phase, round, offered = offered.len(), "Offering operations");

            match self.completion.complete(credential, &transcript, &offered).await? {
                Completion::Reply(text) if text.trim().is_empty() => return Ok(FALLBACK_REPLY.to_string()),
                Completion::Reply(text) => return Ok(text),
                Completion::Operations(_) if round >= self.settings.max_operation_rounds => {
                    warn!(round, "Operation round limit reached; falling back to plain reply");
                    return Ok(FALLBACK_REPLY.to_string());
                }
                Completion::Operations(requests) => {
                    round += 1;
                    info!(round, calls = requests.len(), "Executing requested operations");
                    let results = requests
                        .iter()
                        .map(|request| ChatMessage::OperationResult {
                            call_id: request.call_id.clone(),
                            content: dispatch(service, &request.name, &request.arguments).to_json(),
                        })
                        .collect::<Vec<_>>();
                    transcript.push(ChatMessage::OperationCalls(requests));
                    transcript.extend(results);
                }
            }
        }
    }
}

fn current_phase(service: &ExamService) -> Phase {
    match service.current_candidate() {
        Some(identifier) => service.phase(identifier),
        None => Phase::NotStarted,
    }
}

/// Extra system context describing where the exam stands.
fn progress_briefing(progress: &ExamProgress) -> Option<String> {
    let topic = progress.current_topic.as_deref()?;
    let mut context = format!(
        "CURRENT EXAM STATE:\n- Topic {}/{}: {}\n- Questions asked on this topic: {}\n",
        progress.topic_index + 1,
        progress.total_topics,
        topic,
        progress.questions_on_topic
    );
    if progress.questions_on_topic >= QUESTIONS_BEFORE_NUDGE {
        context.push_str(&format!(
            "\nNOTE: you have already asked {} questions on this topic! TIME TO CALL next_topic!",
            progress.questions_on_topic
        ));
    } else {
        context.push_str("\nKeep asking questions on this topic.");
    }
    Some(context)
}
