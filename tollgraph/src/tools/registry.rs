use std::collections::HashMap;
use std::sync::Arc;

use crate::tools::fn_tool::FnTool;
use crate::tools::{ArgSchema, Tool, ToolError, ToolInvocation, ToolOutcome, ToolSpec};

/// Named collection of tools available to a session.
///
/// Built once and then shared read-only (`Arc<ToolRegistry>`) by the think
/// node, which advertises `list()` to the model, and the executor, which
/// dispatches by name.
///
/// # Examples
///
/// ```
/// use tollgraph::tools::{ArgSchema, ArgType, ToolOutcome, ToolRegistry};
///
/// let mut registry = ToolRegistry::new();
/// registry.register_fn(
///     "echo",
///     "Echo text",
///     ArgSchema::new().required("text", ArgType::String, "Text"),
///     false,
///     |inv| Ok(ToolOutcome::text(inv.arg_str("text")?)),
/// );
/// assert_eq!(registry.list().len(), 1);
/// ```
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Registers a tool. A tool with the same name is replaced.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            tracing::warn!(tool = %name, "replaced previously registered tool");
        }
    }

    /// Registers a closure as a tool.
    pub fn register_fn<F>(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        schema: ArgSchema,
        may_suspend: bool,
        f: F,
    ) where
        F: Fn(&ToolInvocation) -> Result<ToolOutcome, ToolError> + Send + Sync + 'static,
    {
        let mut spec = ToolSpec::new(name, description, schema);
        spec.may_suspend = may_suspend;
        self.register(Box::new(FnTool::new(spec, Arc::new(f))));
    }

    /// Specs of all registered tools, sorted by name.
    pub fn list(&self) -> Vec<ToolSpec> {
        let mut specs: Vec<ToolSpec> = self.tools.values().map(|tool| tool.spec()).collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
