//! Tool executor: validate, dispatch and normalise one tool call.
//!
//! Invalid calls (unknown tool, unparsable or schema-violating arguments) are
//! always turned into an error tool-result message for the model. Failures
//! raised by a tool while running follow [`HandleToolErrors`].

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::message::{Message, ToolCall};
use crate::tools::{ToolError, ToolInvocation, ToolOutcome, ToolRegistry};

/// Message template for invalid tool calls.
pub const DEFAULT_TOOL_ERROR_TEMPLATE: &str = "Error: {error}\n Please fix your mistakes.";

/// Message template for failures raised by a tool.
pub const DEFAULT_EXECUTION_ERROR_TEMPLATE: &str =
    "Error executing tool '{tool_name}' with kwargs {tool_kwargs} with error:\n {error}\n Please fix the error and try again.";

/// Error handler function type: (error, tool name, arguments) → message text.
pub type ErrorHandlerFn = Arc<dyn Fn(&ToolError, &str, &Value) -> String + Send + Sync + 'static>;

/// How tool runtime failures are handled.
#[derive(Clone)]
pub enum HandleToolErrors {
    /// Failures propagate and fail the step.
    Never,
    /// Failures become an error tool message (custom text, or the default template).
    Always(Option<String>),
    Custom(ErrorHandlerFn),
}

impl Default for HandleToolErrors {
    fn default() -> Self {
        Self::Always(None)
    }
}

impl std::fmt::Debug for HandleToolErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Never => write!(f, "HandleToolErrors::Never"),
            Self::Always(msg) => write!(f, "HandleToolErrors::Always({:?})", msg),
            Self::Custom(_) => write!(f, "HandleToolErrors::Custom(<fn>)"),
        }
    }
}

/// Values handed back to a suspended call when it is resumed.
#[derive(Debug, Clone, PartialEq)]
pub struct ResumeInput {
    /// Payload the tool returned when it suspended.
    pub payload: Value,
    /// Caller-supplied resume value.
    pub value: Value,
}

/// Result of executing one tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecOutcome {
    /// A tool-result message (success or error) ready to append to the log.
    Result(Message),
    /// The tool paused; nothing is appended until it is resumed.
    Suspend { prompt: String, payload: Value },
}

/// Parses the model's argument text; empty text is an empty object and a
/// JSON string containing an object is unwrapped once.
fn parse_tool_arguments(arguments: &str) -> Result<Value, String> {
    if arguments.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    let raw: Value =
        serde_json::from_str(arguments).map_err(|e| format!("arguments are not valid JSON: {}", e))?;
    match raw.as_str() {
        Some(inner) => serde_json::from_str(inner).or(Ok(raw)),
        None => Ok(raw),
    }
}

/// Text stored in the tool message for a completed value.
fn outcome_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max_len).collect::<String>())
    }
}

/// Runs tool calls against a registry.
///
/// **Interaction**: Owned by `ActNode`; shares the registry with `ThinkNode`.
#[derive(Clone)]
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    handle_tool_errors: HandleToolErrors,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            handle_tool_errors: HandleToolErrors::default(),
        }
    }

    pub fn with_handle_tool_errors(mut self, handle_tool_errors: HandleToolErrors) -> Self {
        self.handle_tool_errors = handle_tool_errors;
        self
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    fn handle_error(&self, error: &ToolError, tool_name: &str, tool_args: &Value) -> Option<String> {
        match &self.handle_tool_errors {
            HandleToolErrors::Never => None,
            HandleToolErrors::Always(custom_msg) => Some(custom_msg.clone().unwrap_or_else(|| {
                DEFAULT_EXECUTION_ERROR_TEMPLATE
                    .replace("{tool_name}", tool_name)
                    .replace("{tool_kwargs}", &tool_args.to_string())
                    .replace("{error}", &error.to_string())
            })),
            HandleToolErrors::Custom(handler) => Some(handler(error, tool_name, tool_args)),
        }
    }

    fn invalid_call(call: &ToolCall, error: ToolError) -> ExecOutcome {
        warn!(tool = %call.name, call_id = %call.id, error = %error, "invalid tool call");
        ExecOutcome::Result(Message::tool_error(
            call,
            DEFAULT_TOOL_ERROR_TEMPLATE.replace("{error}", &error.to_string()),
        ))
    }

    /// Executes `call`, or re-enters it with `resume` after a suspension.
    ///
    /// Returns `Err` only for a tool failure under `HandleToolErrors::Never`.
    pub async fn invoke(
        &self,
        call: &ToolCall,
        resume: Option<ResumeInput>,
    ) -> Result<ExecOutcome, ToolError> {
        let Some(tool) = self.registry.get(&call.name) else {
            return Ok(Self::invalid_call(call, ToolError::UnknownTool(call.name.clone())));
        };
        let spec = tool.spec();
        let args = match parse_tool_arguments(&call.arguments)
            .and_then(|args| spec.schema.validate(&args).map(|_| args))
        {
            Ok(args) => args,
            Err(reason) => {
                return Ok(Self::invalid_call(
                    call,
                    ToolError::InvalidArguments {
                        tool: call.name.clone(),
                        reason,
                    },
                ))
            }
        };

        let mut invocation = ToolInvocation::new(call.id.clone(), args.clone());
        if let Some(resume) = resume {
            invocation.payload = Some(resume.payload);
            invocation.resume = Some(resume.value);
        }
        debug!(
            tool = %call.name,
            call_id = %call.id,
            args = %args,
            resumed = invocation.resume.is_some(),
            "calling tool"
        );

        let result = match tool.call(invocation).await {
            Ok(ToolOutcome::Suspend { .. }) if !spec.may_suspend => {
                Err(ToolError::UnexpectedSuspend(call.name.clone()))
            }
            other => other,
        };

        match result {
            Ok(ToolOutcome::Complete(value)) => {
                let text = outcome_text(value);
                trace!(
                    tool = %call.name,
                    result_len = text.len(),
                    result_preview = %truncate_for_log(&text, 200),
                    "tool returned"
                );
                Ok(ExecOutcome::Result(Message::tool_result(call, text)))
            }
            Ok(ToolOutcome::Suspend { prompt, payload }) => {
                debug!(tool = %call.name, call_id = %call.id, prompt = %prompt, "tool suspended");
                Ok(ExecOutcome::Suspend { prompt, payload })
            }
            Err(e @ ToolError::UnexpectedSuspend(_)) => Ok(ExecOutcome::Result(
                Message::tool_error(call, DEFAULT_TOOL_ERROR_TEMPLATE.replace("{error}", &e.to_string())),
            )),
            Err(e) => {
                warn!(tool = %call.name, error = %e, "tool call failed");
                match self.handle_error(&e, &call.name, &args) {
                    Some(msg) => Ok(ExecOutcome::Result(Message::tool_error(call, msg))),
                    None => Err(e),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ArgSchema, ArgType};
    use serde_json::json;

    fn executor(policy: HandleToolErrors) -> ToolExecutor {
        let mut r = ToolRegistry::new();
        r.register_fn(
            "get_stock_price",
            "Price lookup",
            ArgSchema::new().required("symbol", ArgType::String, "Ticker"),
            false,
            |inv| match inv.arg_str("symbol")? {
                "AMZN" => Ok(ToolOutcome::Complete(json!(135.0))),
                other => Err(ToolError::Failed(format!("no quote for {}", other))),
            },
        );
        r.register_fn(
            "approve",
            "Needs approval",
            ArgSchema::new(),
            true,
            |inv| match inv.resume_value() {
                None => Ok(ToolOutcome::suspend("ok?", json!({"n": 1}))),
                Some(v) => Ok(ToolOutcome::text(format!(
                    "{} / {}",
                    v,
                    inv.payload.clone().unwrap_or_default()
                ))),
            },
        );
        r.register_fn("sneaky", "Suspends without permission", ArgSchema::new(), false, |_| {
            Ok(ToolOutcome::suspend("surprise", Value::Null))
        });
        ToolExecutor::new(Arc::new(r)).with_handle_tool_errors(policy)
    }

    fn error_text(outcome: ExecOutcome) -> String {
        match outcome {
            ExecOutcome::Result(Message::Tool {
                content,
                is_error: true,
                ..
            }) => content,
            other => panic!("expected error tool message, got {:?}", other),
        }
    }

    /// **Scenario**: A valid call completes; non-string values are stored as JSON text.
    #[tokio::test]
    async fn valid_call_returns_tool_result() {
        let ex = executor(HandleToolErrors::default());
        let call = ToolCall::new("c1", "get_stock_price", r#"{"symbol":"AMZN"}"#);
        let out = ex.invoke(&call, None).await.unwrap();
        assert_eq!(out, ExecOutcome::Result(Message::tool_result(&call, "135.0")));
    }

    /// **Scenario**: Unknown tool and malformed arguments become error messages even under Never.
    #[tokio::test]
    async fn invalid_calls_always_become_error_messages() {
        let ex = executor(HandleToolErrors::Never);
        let unknown = ToolCall::new("c1", "sell_stocks", "{}");
        assert!(error_text(ex.invoke(&unknown, None).await.unwrap()).contains("sell_stocks"));

        let bad_json = ToolCall::new("c2", "get_stock_price", "{symbol:");
        assert!(error_text(ex.invoke(&bad_json, None).await.unwrap()).contains("valid JSON"));

        let missing = ToolCall::new("c3", "get_stock_price", "{}");
        assert!(error_text(ex.invoke(&missing, None).await.unwrap()).contains("symbol"));
    }

    /// **Scenario**: Runtime failure uses the execution template by default and propagates under Never.
    #[tokio::test]
    async fn runtime_failure_follows_policy() {
        let call = ToolCall::new("c1", "get_stock_price", r#"{"symbol":"XYZ"}"#);
        let text = error_text(
            executor(HandleToolErrors::default())
                .invoke(&call, None)
                .await
                .unwrap(),
        );
        assert!(text.starts_with("Error executing tool 'get_stock_price'"), "{}", text);
        assert!(text.contains("no quote for XYZ"), "{}", text);

        let err = executor(HandleToolErrors::Never)
            .invoke(&call, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Failed(_)));
    }

    /// **Scenario**: A suspendable tool suspends, then sees payload and resume value on re-entry.
    #[tokio::test]
    async fn suspend_then_resume_reenters_with_payload() {
        let ex = executor(HandleToolErrors::default());
        let call = ToolCall::new("c1", "approve", "");
        let out = ex.invoke(&call, None).await.unwrap();
        let ExecOutcome::Suspend { prompt, payload } = out else {
            panic!("expected suspend");
        };
        assert_eq!(prompt, "ok?");
        let resumed = ex
            .invoke(
                &call,
                Some(ResumeInput {
                    payload,
                    value: json!("yes"),
                }),
            )
            .await
            .unwrap();
        match resumed {
            ExecOutcome::Result(m) => assert_eq!(m.content(), r#""yes" / {"n":1}"#),
            other => panic!("expected result, got {:?}", other),
        }
    }

    /// **Scenario**: A tool not registered as may_suspend cannot pause.
    #[tokio::test]
    async fn unexpected_suspend_is_reported_as_error() {
        let ex = executor(HandleToolErrors::Never);
        let call = ToolCall::new("c1", "sneaky", "{}");
        assert!(error_text(ex.invoke(&call, None).await.unwrap()).contains("sneaky"));
    }

    /// **Scenario**: Arguments encoded as a JSON string are unwrapped once.
    #[test]
    fn parse_tool_arguments_unwraps_nested_string() {
        let v = parse_tool_arguments(r#""{\"symbol\":\"AMZN\"}""#).unwrap();
        assert_eq!(v, json!({"symbol": "AMZN"}));
        assert_eq!(parse_tool_arguments("  ").unwrap(), json!({}));
    }
}
