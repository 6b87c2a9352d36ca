//! Closure-backed tool, used by `ToolRegistry::register_fn`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::tools::{Tool, ToolError, ToolInvocation, ToolOutcome, ToolSpec};

/// Tool body for [`FnTool`].
pub type ToolFn = Arc<dyn Fn(&ToolInvocation) -> Result<ToolOutcome, ToolError> + Send + Sync>;

/// A tool whose body is a synchronous closure.
pub struct FnTool {
    spec: ToolSpec,
    f: ToolFn,
}

impl FnTool {
    pub fn new(spec: ToolSpec, f: ToolFn) -> Self {
        Self { spec, f }
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn spec(&self) -> ToolSpec {
        self.spec.clone()
    }

    async fn call(&self, invocation: ToolInvocation) -> Result<ToolOutcome, ToolError> {
        (self.f)(&invocation)
    }
}
