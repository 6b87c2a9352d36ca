use async_trait::async_trait;
use serde_json::Value;

use crate::tools::{ArgSchema, ToolError};

/// Specification of a registered tool, as advertised to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    /// Unique within a registry.
    pub name: String,
    pub description: String,
    pub schema: ArgSchema,
    /// Whether the tool may pause for an external value (e.g. human approval).
    pub may_suspend: bool,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>, schema: ArgSchema) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            schema,
            may_suspend: false,
        }
    }

    /// Marks the tool as allowed to suspend.
    pub fn suspendable(mut self) -> Self {
        self.may_suspend = true;
        self
    }
}

/// One call of a tool.
///
/// On the first call `payload` and `resume` are `None`. When a suspended call
/// is resumed, the same tool is called again with the same `args`, the
/// `payload` it returned when suspending, and the caller's `resume` value.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub call_id: String,
    /// Validated arguments object.
    pub args: Value,
    pub payload: Option<Value>,
    pub resume: Option<Value>,
}

impl ToolInvocation {
    pub fn new(call_id: impl Into<String>, args: Value) -> Self {
        Self {
            call_id: call_id.into(),
            args,
            payload: None,
            resume: None,
        }
    }

    /// The resume value when this call continues a suspension.
    pub fn resume_value(&self) -> Option<&Value> {
        self.resume.as_ref()
    }

    pub fn arg_str(&self, name: &str) -> Result<&str, ToolError> {
        self.args
            .get(name)
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::Failed(format!("argument '{}' is not a string", name)))
    }

    pub fn arg_i64(&self, name: &str) -> Result<i64, ToolError> {
        let v = self.args.get(name);
        v.and_then(Value::as_i64)
            .or_else(|| {
                v.and_then(Value::as_f64)
                    .filter(|f| f.fract() == 0.0)
                    .map(|f| f as i64)
            })
            .ok_or_else(|| ToolError::Failed(format!("argument '{}' is not an integer", name)))
    }

    pub fn arg_f64(&self, name: &str) -> Result<f64, ToolError> {
        self.args
            .get(name)
            .and_then(Value::as_f64)
            .ok_or_else(|| ToolError::Failed(format!("argument '{}' is not a number", name)))
    }
}

/// What a tool call produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    /// Finished with a value; strings become the tool message text verbatim.
    Complete(Value),
    /// Needs an external value before it can finish.
    Suspend { prompt: String, payload: Value },
}

impl ToolOutcome {
    pub fn text(s: impl Into<String>) -> Self {
        ToolOutcome::Complete(Value::String(s.into()))
    }

    pub fn suspend(prompt: impl Into<String>, payload: Value) -> Self {
        ToolOutcome::Suspend {
            prompt: prompt.into(),
            payload,
        }
    }
}

/// A single tool the model can call.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use tollgraph::tools::{ArgSchema, ArgType, Tool, ToolError, ToolInvocation, ToolOutcome, ToolSpec};
///
/// struct Echo;
///
/// #[async_trait]
/// impl Tool for Echo {
///     fn name(&self) -> &str {
///         "echo"
///     }
///
///     fn spec(&self) -> ToolSpec {
///         ToolSpec::new("echo", "Echo text", ArgSchema::new().required("text", ArgType::String, "Text"))
///     }
///
///     async fn call(&self, inv: ToolInvocation) -> Result<ToolOutcome, ToolError> {
///         Ok(ToolOutcome::text(inv.arg_str("text")?))
///     }
/// }
/// ```
///
/// # Interaction
///
/// - **ToolRegistry**: stores tools by name
/// - **ToolExecutor**: validates arguments against `spec().schema` before `call`
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn spec(&self) -> ToolSpec;

    async fn call(&self, invocation: ToolInvocation) -> Result<ToolOutcome, ToolError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// **Scenario**: Typed accessors read arguments; integers accept whole floats.
    #[test]
    fn invocation_typed_accessors() {
        let inv = ToolInvocation::new(
            "c1",
            json!({"symbol": "AMZN", "quantity": 10.0, "total_price": 1350}),
        );
        assert_eq!(inv.arg_str("symbol").unwrap(), "AMZN");
        assert_eq!(inv.arg_i64("quantity").unwrap(), 10);
        assert_eq!(inv.arg_f64("total_price").unwrap(), 1350.0);
        assert!(inv.arg_str("missing").is_err());
        assert!(inv.resume_value().is_none());
    }
}
