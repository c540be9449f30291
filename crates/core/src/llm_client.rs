use crate::{
    error::{CompletionError, CompletionErrorKind},
    operation::OperationSpec,
};
use async_openai::{
    Client,
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
        ChatCompletionTool, ChatCompletionToolArgs, ChatCompletionToolChoiceOption,
        ChatCompletionToolType, CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
        FunctionCall, FunctionObjectArgs,
    },
};
use async_trait::async_trait;
use tracing::debug;

/// An operation invocation requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationRequest {
    /// Backend-assigned id used to pair the result with the request.
    pub call_id: String,
    pub name: String,
    /// Raw JSON argument text, exactly as the model produced it.
    pub arguments: String,
}

/// One entry of the transcript sent to the completion backend.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatMessage {
    System(String),
    User(String),
    Assistant(String),
    /// The model's request to invoke operations.
    OperationCalls(Vec<OperationRequest>),
    /// The envelope produced for one of those requests.
    OperationResult { call_id: String, content: String },
}

/// The two possible outcomes of asking the model for its next step.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// The model answered in natural language.
    Reply(String),
    /// The model wants one or more operations executed first.
    Operations(Vec<OperationRequest>),
}

/// A chat-completion backend able to call the exam operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Asks the model for the next step of the conversation. Only the
    /// `operations` given may be offered to it.
    async fn complete(
        &self,
        credential: &str,
        transcript: &[ChatMessage],
        operations: &[OperationSpec],
    ) -> Result<Completion, CompletionError>;
}

/// Sampling parameters for [`OpenAICompatibleClient`].
#[derive(Debug, Clone)]
pub struct CompletionSettings {
    pub api_base: String,
    pub model: String,
    pub max_completion_tokens: u32,
    pub temperature: f32,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.groq.com/openai/v1".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            max_completion_tokens: 500,
            temperature: 0.7,
        }
    }
}

/// An implementation of `CompletionService` for any OpenAI-compatible API.
///
/// The credential arrives with every turn, so a client is configured per call.
pub struct OpenAICompatibleClient {
    settings: CompletionSettings,
}

impl OpenAICompatibleClient {
    pub fn new(settings: CompletionSettings) -> Self {
        Self { settings }
    }

    fn client(&self, credential: &str) -> Client<OpenAIConfig> {
        let config = OpenAIConfig::new()
            .with_api_key(credential)
            .with_api_base(&self.settings.api_base);
        Client::with_config(config)
    }
}

#[async_trait]
impl CompletionService for OpenAICompatibleClient {
    async fn complete(
        &self,
        credential: &str,
        transcript: &[ChatMessage],
        operations: &[OperationSpec],
    ) -> Result<Completion, CompletionError> {
        let messages = transcript
            .iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>, _>>()
            .map_err(classify)?;

        let mut request = CreateChatCompletionRequestArgs::default();
        request
            .model(&self.settings.model)
            .messages(messages)
            .max_completion_tokens(self.settings.max_completion_tokens)
            .temperature(self.settings.temperature);
        if operations.is_empty() {
            request.tool_choice(ChatCompletionToolChoiceOption::None);
        } else {
            let tools = operations
                .iter()
                .map(to_tool)
                .collect::<Result<Vec<_>, _>>()
                .map_err(classify)?;
            request
                .tools(tools)
                .tool_choice(ChatCompletionToolChoiceOption::Auto);
        }
        let request = request.build().map_err(classify)?;

        debug!(
            model = %self.settings.model,
            offered = ?operations.iter().map(|o| o.name).collect::<Vec<_>>(),
            "Requesting completion"
        );
        let response: CreateChatCompletionResponse = self
            .client(credential)
            .chat()
            .create(request)
            .await
            .map_err(classify)?;

        interpret(response)
    }
}

fn interpret(response: CreateChatCompletionResponse) -> Result<Completion, CompletionError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| CompletionError::invalid_response("No response choice from LLM"))?;

    match choice.message.tool_calls {
        Some(calls) if !calls.is_empty() => Ok(Completion::Operations(
            calls
                .into_iter()
                .map(|call| OperationRequest {
                    call_id: call.id,
                    name: call.function.name,
                    arguments: call.function.arguments,
                })
                .collect(),
        )),
        _ => Ok(Completion::Reply(choice.message.content.unwrap_or_default())),
    }
}

fn to_request_message(message: &ChatMessage) -> Result<ChatCompletionRequestMessage, OpenAIError> {
    Ok(match message {
        ChatMessage::System(text) => ChatCompletionRequestSystemMessageArgs::default()
            .content(text.as_str())
            .build()?
            .into(),
        ChatMessage::User(text) => ChatCompletionRequestUserMessageArgs::default()
            .content(text.as_str())
            .build()?
            .into(),
        ChatMessage::Assistant(text) => ChatCompletionRequestAssistantMessageArgs::default()
            .content(text.as_str())
            .build()?
            .into(),
        ChatMessage::OperationCalls(calls) => ChatCompletionRequestAssistantMessageArgs::default()
            .tool_calls(
                calls
                    .iter()
                    .map(|call| ChatCompletionMessageToolCall {
                        id: call.call_id.clone(),
                        r#type: ChatCompletionToolType::Function,
                        function: FunctionCall {
                            name: call.name.clone(),
                            arguments: call.arguments.clone(),
                        },
                    })
                    .collect::<Vec<_>>(),
            )
            .build()?
            .into(),
        ChatMessage::OperationResult { call_id, content } => {
            ChatCompletionRequestToolMessageArgs::default()
                .tool_call_id(call_id.as_str())
                .content(content.as_str())
                .build()?
                .into()
        }
    })
}

fn to_tool(spec: &OperationSpec) -> Result<ChatCompletionTool, OpenAIError> {
    ChatCompletionToolArgs::default()
        .function(
            FunctionObjectArgs::default()
                .name(spec.name)
                .description(spec.description)
                .parameters(spec.parameters.clone())
                .build()?,
        )
        .build()
}

/// Maps backend failures onto explicit kinds using HTTP status and API error
/// codes.
fn classify(error: OpenAIError) -> CompletionError {
    let kind = match &error {
        OpenAIError::ApiError(api) => kind_from_codes(api.code.as_deref(), api.r#type.as_deref()),
        OpenAIError::Reqwest(e) => match e.status().map(|s| s.as_u16()) {
            Some(401 | 403) => CompletionErrorKind::Auth,
            Some(429) => CompletionErrorKind::RateLimit,
            Some(_) => CompletionErrorKind::Other,
            None => CompletionErrorKind::Network,
        },
        OpenAIError::JSONDeserialize(_) => CompletionErrorKind::InvalidResponse,
        _ => CompletionErrorKind::Other,
    };
    CompletionError::new(kind, error.to_string())
}

fn kind_from_codes(code: Option<&str>, error_type: Option<&str>) -> CompletionErrorKind {
    match (code, error_type) {
        (Some("invalid_api_key" | "authentication_error" | "permission_denied"), _)
        | (_, Some("authentication_error" | "permission_error")) => CompletionErrorKind::Auth,
        (Some("rate_limit_exceeded" | "rate_limit_error"), _)
        | (_, Some("rate_limit_error" | "tokens" | "requests")) => CompletionErrorKind::RateLimit,
        _ => CompletionErrorKind::Other,
    }
}
