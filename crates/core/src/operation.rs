//! Exam operations exposed to the driving model as callable tools.
//!
//! Each operation has a wire name, a typed argument payload, and a JSON Schema
//! generated from that payload. Raw `(name, arguments)` pairs coming back from
//! the model are parsed into [`Operation`] here, before anything touches exam
//! state.

use crate::error::ExamError;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// The three exam transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Start,
    Advance,
    Close,
}

impl OperationKind {
    pub const ALL: [OperationKind; 3] = [
        OperationKind::Start,
        OperationKind::Advance,
        OperationKind::Close,
    ];

    /// Tool name presented to the model.
    pub fn wire_name(self) -> &'static str {
        match self {
            OperationKind::Start => "start_exam",
            OperationKind::Advance => "next_topic",
            OperationKind::Close => "end_exam",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.wire_name() == name)
    }

    fn description(self) -> &'static str {
        match self {
            OperationKind::Start => {
                "Start the exam ONLY once the student has clearly given both a NAME and an EMAIL. Call it ONCE."
            }
            OperationKind::Advance => {
                "Move to the NEXT exam topic. Call it after 3-4 questions on the current topic OR when the student does not know the topic."
            }
            OperationKind::Close => {
                "Finish the exam ONLY AFTER next_topic returned finished=true. Give a fair score."
            }
        }
    }

    /// Tool declaration for this operation.
    pub fn spec(self) -> OperationSpec {
        let mut parameters = match self {
            OperationKind::Start => schema_value::<StartArgs>(),
            OperationKind::Advance => schema_value::<AdvanceArgs>(),
            OperationKind::Close => schema_value::<CloseArgs>(),
        };
        if let Value::Object(map) = &mut parameters {
            map.remove("$schema");
            map.remove("title");
        }
        OperationSpec {
            name: self.wire_name(),
            description: self.description(),
            parameters,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

fn schema_value<T: JsonSchema>() -> Value {
    serde_json::to_value(schemars::schema_for!(T)).unwrap_or(Value::Null)
}

/// A tool the completion backend may ask us to invoke.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationSpec {
    pub name: &'static str,
    pub description: &'static str,
    /// JSON Schema of the argument object.
    pub parameters: Value,
}

/// Tool declarations for a set of operations.
pub fn specs_for(kinds: &[OperationKind]) -> Vec<OperationSpec> {
    kinds.iter().map(|kind| kind.spec()).collect()
}

/// Arguments of `start_exam`.
#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
pub struct StartArgs {
    /// Student email, e.g. test@lpnu.ua.
    pub email: String,
    /// Student full name, e.g. 'Ivan Petrenko'.
    pub name: String,
}

/// Arguments of `next_topic`.
#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
pub struct AdvanceArgs {
    /// Student email.
    pub email: String,
}

/// Arguments of `end_exam`.
#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
pub struct CloseArgs {
    /// Student email.
    pub email: String,
    /// Score from 0 to 10 (may be fractional, e.g. 7.5). Grade fairly!
    #[serde(deserialize_with = "lenient_number")]
    #[schemars(with = "f64")]
    pub score: f64,
    /// At least 3-4 sentences: what the student knows well and what to work on.
    pub feedback: String,
}

/// Accepts a JSON number or a numeric string.
fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(f64),
        Text(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("'{s}' is not a number"))),
    }
}

/// A fully validated operation request.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Start(StartArgs),
    Advance(AdvanceArgs),
    Close(CloseArgs),
}

impl Operation {
    /// Parses a tool invocation. `arguments` is the raw JSON text sent by the
    /// model.
    pub fn parse(name: &str, arguments: &str) -> Result<Self, ExamError> {
        let kind = OperationKind::from_wire_name(name)
            .ok_or_else(|| ExamError::UnknownOperation(name.to_string()))?;
        let arguments = if arguments.trim().is_empty() {
            "{}"
        } else {
            arguments
        };
        let payload: Value = serde_json::from_str(arguments)
            .map_err(|e| ExamError::MalformedArguments(format!("invalid JSON: {e}")))?;
        Self::from_value(kind, payload)
    }

    pub fn from_value(kind: OperationKind, payload: Value) -> Result<Self, ExamError> {
        let malformed = |e: serde_json::Error| ExamError::MalformedArguments(e.to_string());
        Ok(match kind {
            OperationKind::Start => Operation::Start(serde_json::from_value(payload).map_err(malformed)?),
            OperationKind::Advance => {
                Operation::Advance(serde_json::from_value(payload).map_err(malformed)?)
            }
            OperationKind::Close => Operation::Close(serde_json::from_value(payload).map_err(malformed)?),
        })
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Start(_) => OperationKind::Start,
            Operation::Advance(_) => OperationKind::Advance,
            Operation::Close(_) => OperationKind::Close,
        }
    }

    /// The candidate the operation targets.
    pub fn identifier(&self) -> &str {
        match self {
            Operation::Start(args) => &args.email,
            Operation::Advance(args) => &args.email,
            Operation::Close(args) => &args.email,
        }
    }
}
