//! OpenAI Chat Completions client implementing `LlmClient` (ChatOpenAI).
//!
//! Generic over the `async_openai` provider config, so the same client talks to
//! api.openai.com (`OpenAIConfig`) or an Azure OpenAI deployment (`AzureConfig`).
//! The full log is sent each turn, including assistant tool calls and tool
//! results, so the model sees exactly what the executor produced.
//!
//! **Interaction**: Implements `LlmClient`; used by ThinkNode like `MockLlm`.

use async_openai::{
    config::{AzureConfig, Config, OpenAIConfig},
    error::{ApiError, OpenAIError},
    types::chat::{
        ChatCompletionMessageToolCall, ChatCompletionMessageToolCalls,
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessage, ChatCompletionRequestToolMessageArgs,
        ChatCompletionRequestUserMessage, ChatCompletionTool, ChatCompletionToolChoiceOption,
        ChatCompletionTools, CreateChatCompletionRequestArgs, FunctionCall, FunctionObject,
        ToolChoiceOptions,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, trace};

use crate::llm::{GatewayError, LlmClient, LlmResponse, LlmUsage};
use crate::message::{Message, ToolCall};
use crate::tools::ToolSpec;

/// Maps a provider error onto the gateway's failure kinds.
///
/// Undecodable responses and invalid requests are malformed. API errors are
/// transient only for timeouts, rate limits and server failures; transport
/// errors are always transient.
fn map_openai_error(e: OpenAIError) -> GatewayError {
    match e {
        OpenAIError::JSONDeserialize(..) | OpenAIError::InvalidArgument(..) => {
            GatewayError::MalformedResponse(e.to_string())
        }
        OpenAIError::ApiError(api) if !api_error_is_transient(&api) => {
            GatewayError::Rejected(api.to_string())
        }
        other => GatewayError::Transient(other.to_string()),
    }
}

/// Whether an API error object describes a failure worth retrying.
///
/// The client drops the HTTP status, so it is recovered from the error body:
/// Azure puts the status number in `code`, OpenAI names the error kind, and a
/// 5xx body that is not an error object arrives with neither field set.
fn api_error_is_transient(api: &ApiError) -> bool {
    if let Some(status) = api.code.as_deref().and_then(|c| c.parse::<u16>().ok()) {
        return status == 408 || status == 429 || status >= 500;
    }
    let kind = api.r#type.as_deref();
    let code = api.code.as_deref();
    if kind == Some("insufficient_quota") || code == Some("insufficient_quota") {
        return false;
    }
    match (kind, code) {
        (None, None) => true,
        (_, Some("rate_limit_exceeded" | "timeout" | "server_error")) => true,
        (Some("requests" | "tokens" | "rate_limit_error" | "server_error" | "timeout"), _) => true,
        _ => false,
    }
}

/// OpenAI-compatible chat client.
///
/// **Interaction**: Implements `LlmClient`; built by the CLI from `AppConfig`.
pub struct ChatOpenAI<C: Config = OpenAIConfig> {
    client: Client<C>,
    model: String,
    temperature: Option<f32>,
}

impl ChatOpenAI<OpenAIConfig> {
    /// Client with default config (API key from `OPENAI_API_KEY`).
    pub fn new(model: impl Into<String>) -> Self {
        Self::with_config(OpenAIConfig::new(), model)
    }

    /// Client with an explicit key and/or base URL; `None` keeps the default.
    pub fn with_credentials(
        model: impl Into<String>,
        api_key: Option<String>,
        api_base: Option<String>,
    ) -> Self {
        let mut config = OpenAIConfig::new();
        if let Some(key) = api_key {
            config = config.with_api_key(key);
        }
        if let Some(base) = api_base {
            config = config.with_api_base(base);
        }
        Self::with_config(config, model)
    }
}

impl ChatOpenAI<AzureConfig> {
    /// Client for an Azure OpenAI deployment. `deployment` doubles as the model name.
    pub fn azure(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        deployment: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        let deployment = deployment.into();
        let config = AzureConfig::new()
            .with_api_base(endpoint)
            .with_api_key(api_key)
            .with_deployment_id(deployment.clone())
            .with_api_version(api_version);
        Self::with_config(config, deployment)
    }
}

impl<C: Config> ChatOpenAI<C> {
    /// Client with custom provider config (API key, base URL, Azure deployment).
    pub fn with_config(config: C, model: impl Into<String>) -> Self {
        Self {
            client: Client::with_config(config),
            model: model.into(),
            temperature: None,
        }
    }

    /// Set temperature (0–2). Lower values are more deterministic.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn messages_to_request(
        messages: &[Message],
    ) -> Result<Vec<ChatCompletionRequestMessage>, GatewayError> {
        messages
            .iter()
            .map(|m| {
                Ok(match m {
                    Message::System { content } => ChatCompletionRequestMessage::System(
                        ChatCompletionRequestSystemMessage::from(content.as_str()),
                    ),
                    Message::User { content } => ChatCompletionRequestMessage::User(
                        ChatCompletionRequestUserMessage::from(content.as_str()),
                    ),
                    Message::Assistant {
                        content,
                        tool_calls,
                    } => {
                        let mut args = ChatCompletionRequestAssistantMessageArgs::default();
                        if !content.is_empty() {
                            args.content(content.as_str());
                        }
                        if !tool_calls.is_empty() {
                            args.tool_calls(
                                tool_calls
                                    .iter()
                                    .map(|tc| {
                                        ChatCompletionMessageToolCalls::Function(
                                            ChatCompletionMessageToolCall {
                                                id: tc.id.clone(),
                                                function: FunctionCall {
                                                    name: tc.name.clone(),
                                                    arguments: tc.arguments.clone(),
                                                },
                                            },
                                        )
                                    })
                                    .collect::<Vec<_>>(),
                            );
                        }
                        ChatCompletionRequestMessage::Assistant(
                            args.build().map_err(map_openai_error)?,
                        )
                    }
                    Message::Tool {
                        call_id, content, ..
                    } => ChatCompletionRequestMessage::Tool(
                        ChatCompletionRequestToolMessageArgs::default()
                            .content(content.as_str())
                            .tool_call_id(call_id.as_str())
                            .build()
                            .map_err(map_openai_error)?,
                    ),
                })
            })
            .collect()
    }

    fn tools_to_request(tools: &[ToolSpec]) -> Vec<ChatCompletionTools> {
        tools
            .iter()
            .map(|t| {
                ChatCompletionTools::Function(ChatCompletionTool {
                    function: FunctionObject {
                        name: t.name.clone(),
                        description: Some(t.description.clone()),
                        parameters: Some(t.schema.to_json_schema()),
                        ..Default::default()
                    },
                })
            })
            .collect()
    }
}

#[async_trait]
impl<C> LlmClient for ChatOpenAI<C>
where
    C: Config + Send + Sync,
{
    async fn invoke(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<LlmResponse, GatewayError> {
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(self.model.clone());
        args.messages(Self::messages_to_request(messages)?);
        if !tools.is_empty() {
            args.tools(Self::tools_to_request(tools));
            args.tool_choice(ChatCompletionToolChoiceOption::Mode(ToolChoiceOptions::Auto));
        }
        if let Some(t) = self.temperature {
            args.temperature(t);
        }
        let request = args.build().map_err(map_openai_error)?;

        debug!(
            model = %self.model,
            message_count = messages.len(),
            tools_count = tools.len(),
            temperature = ?self.temperature,
            "chat completion request"
        );
        if let Ok(js) = serde_json::to_string_pretty(&request) {
            trace!(request = %js, "chat completion request body");
        }

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(map_openai_error)?;

        if let Ok(js) = serde_json::to_string_pretty(&response) {
            trace!(response = %js, "chat completion response body");
        }

        let choice = response.choices.into_iter().next().ok_or_else(|| {
            GatewayError::MalformedResponse("completion returned no choices".to_string())
        })?;

        let msg = choice.message;
        let content = msg.content.unwrap_or_default();
        let tool_calls: Vec<ToolCall> = msg
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .filter_map(|tc| match tc {
                ChatCompletionMessageToolCalls::Function(f) => Some(ToolCall {
                    id: f.id,
                    name: f.function.name,
                    arguments: f.function.arguments,
                }),
                _ => None,
            })
            .collect();

        let usage = response.usage.map(|u| LlmUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });
        debug!(
            content_len = content.len(),
            tool_calls = tool_calls.len(),
            usage = ?usage,
            "chat completion response"
        );
        Ok(LlmResponse {
            content,
            tool_calls,
            usage,
        })
    }
}
