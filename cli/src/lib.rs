//! Library side of the `tollgraph` binary.
//!
//! - [`stocks`]: the `get_stock_price` / `buy_stocks` demo tools.
//! - [`scripted`]: offline gateway used by `--mock`.
//! - [`build_orchestrator`]: wires gateway, tools and checkpoint store from [`config::AppConfig`].
//! - [`drive`]: runs one input to completion, asking an [`Approver`] whenever a tool pauses.
//! - [`run_demo`]: the scripted price-then-buy conversation.

pub mod scripted;
pub mod stocks;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use config::{AppConfig, CheckpointBackend, LlmProvider};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tollgraph::{
    BuildError, ChatOpenAI, CheckpointError, Checkpointer, JsonSerializer, LlmClient, MemorySaver,
    Orchestrator, ResumeValue, RetryPolicy, SessionState, SqliteSaver, StepError, StepInput,
    StepResult,
};

pub const APP_NAME: &str = "tollgraph";

/// Prompt shown when a tool waits for approval.
pub const APPROVAL_PROMPT: &str = "Approve (yes/no):";

/// The two requests of the demo conversation.
pub const DEMO_SCRIPT: [&str; 2] = [
    "What is the price of 10 Amazon stock?",
    "Buy 10  Amazon stocks at current price",
];

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Step(#[from] StepError),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
    #[error("config: {0}")]
    Config(#[from] config::LoadError),
    #[error("missing setting: {0}")]
    MissingSetting(&'static str),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("input closed while waiting for approval")]
    InputClosed,
}

/// Flags that override the loaded config.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub mock: bool,
    pub store: Option<CheckpointBackend>,
    pub db: Option<PathBuf>,
}

impl Overrides {
    pub fn apply(&self, config: &mut AppConfig) {
        if self.mock {
            config.llm.provider = LlmProvider::Mock;
        }
        if let Some(store) = self.store {
            config.checkpoint.backend = store;
        }
        if let Some(db) = &self.db {
            config.checkpoint.path = Some(db.clone());
            if self.store.is_none() {
                config.checkpoint.backend = CheckpointBackend::Sqlite;
            }
        }
    }
}

/// Gateway for the configured provider.
pub fn build_llm(config: &AppConfig) -> Result<Arc<dyn LlmClient>, CliError> {
    let llm = &config.llm;
    let client: Arc<dyn LlmClient> = match llm.provider {
        LlmProvider::Mock => Arc::new(scripted::scripted_llm()),
        LlmProvider::OpenAi => {
            let mut client = ChatOpenAI::with_credentials(
                llm.model_or_default(),
                llm.api_key.clone(),
                llm.endpoint.clone(),
            );
            if let Some(t) = llm.temperature {
                client = client.with_temperature(t);
            }
            Arc::new(client)
        }
        LlmProvider::Azure => {
            let endpoint = llm
                .endpoint
                .clone()
                .ok_or(CliError::MissingSetting("AZURE_OPENAI_ENDPOINT"))?;
            let api_key = llm
                .api_key
                .clone()
                .ok_or(CliError::MissingSetting("AZURE_OPENAI_API_KEY"))?;
            let mut client = ChatOpenAI::azure(
                endpoint,
                api_key,
                llm.model_or_default(),
                llm.api_version_or_default(),
            );
            if let Some(t) = llm.temperature {
                client = client.with_temperature(t);
            }
            Arc::new(client)
        }
    };
    Ok(client)
}

/// Checkpoint store for the configured backend.
pub fn build_store(config: &AppConfig) -> Result<Arc<dyn Checkpointer<SessionState>>, CliError> {
    Ok(match config.checkpoint.backend {
        CheckpointBackend::Memory => Arc::new(MemorySaver::<SessionState>::new()),
        CheckpointBackend::Sqlite => {
            let path = config.checkpoint_path(APP_NAME);
            tracing::debug!(path = %path.display(), "opening sqlite checkpoint store");
            Arc::new(SqliteSaver::<SessionState>::new(path, Arc::new(JsonSerializer))?)
        }
    })
}

/// Orchestrator with the stock tools, the configured gateway and store.
pub fn build_orchestrator(config: &AppConfig) -> Result<Orchestrator, CliError> {
    let retries = config.llm.max_retries_or_default();
    let retry_policy = if retries == 0 {
        RetryPolicy::None
    } else {
        RetryPolicy::exponential(
            retries,
            Duration::from_millis(500),
            Duration::from_secs(8),
            2.0,
        )
    };
    let mut builder = Orchestrator::builder()
        .llm(build_llm(config)?)
        .registry(stocks::stock_registry())
        .checkpointer(build_store(config)?)
        .recursion_limit(config.orchestrator.recursion_limit)
        .retry_policy(retry_policy);
    if let Some(prompt) = &config.orchestrator.system_prompt {
        builder = builder.system_prompt(prompt.clone());
    }
    Ok(builder.build()?)
}

/// Source of approval decisions for paused tools.
#[async_trait]
pub trait Approver: Send {
    /// Returns the decision for `prompt`.
    async fn decide(&mut self, prompt: &str) -> Result<String, CliError>;
}

/// Reads decisions from stdin after printing [`APPROVAL_PROMPT`].
pub struct StdinApprover {
    lines: Lines<BufReader<Stdin>>,
}

impl StdinApprover {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// Next raw line of stdin; `None` at EOF.
    pub async fn next_line(&mut self) -> Result<Option<String>, CliError> {
        Ok(self.lines.next_line().await?)
    }
}

impl Default for StdinApprover {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Approver for StdinApprover {
    async fn decide(&mut self, _prompt: &str) -> Result<String, CliError> {
        print!("{APPROVAL_PROMPT}");
        std::io::stdout().flush()?;
        match self.next_line().await? {
            Some(line) => Ok(line),
            None => Err(CliError::InputClosed),
        }
    }
}

/// Answers every prompt from a fixed list, in order; records the prompts seen.
#[derive(Debug, Default)]
pub struct ScriptedApprover {
    answers: std::collections::VecDeque<String>,
    pub prompts: Vec<String>,
}

impl ScriptedApprover {
    pub fn new<I, T>(answers: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            prompts: Vec::new(),
        }
    }
}

#[async_trait]
impl Approver for ScriptedApprover {
    async fn decide(&mut self, prompt: &str) -> Result<String, CliError> {
        self.prompts.push(prompt.to_string());
        self.answers.pop_front().ok_or(CliError::InputClosed)
    }
}

/// Steps `session_id` with `input` until a final answer, resolving every pause
/// through `approver`. Prompts are written to `out`.
pub async fn drive<W: Write + Send>(
    orchestrator: &Orchestrator,
    session_id: &str,
    input: impl Into<StepInput>,
    approver: &mut dyn Approver,
    out: &mut W,
) -> Result<String, CliError> {
    let mut result = orchestrator.step(session_id, input).await?;
    loop {
        match result {
            StepResult::Final { content } => return Ok(content),
            StepResult::Paused { prompt, token } => {
                writeln!(out, "{prompt}")?;
                out.flush()?;
                let decision = approver.decide(&prompt).await?;
                tracing::info!(session_id, %decision, "approval decision");
                result = orchestrator
                    .step(session_id, ResumeValue::new(token, decision))
                    .await?;
            }
        }
    }
}

/// Runs the demo conversation on `session_id`, printing each answer.
pub async fn run_demo<W: Write + Send>(
    orchestrator: &Orchestrator,
    session_id: &str,
    approver: &mut dyn Approver,
    out: &mut W,
) -> Result<Vec<String>, CliError> {
    let mut answers = Vec::with_capacity(DEMO_SCRIPT.len());
    for request in DEMO_SCRIPT {
        writeln!(out, "> {request}")?;
        let answer = drive(orchestrator, session_id, request, approver, out).await?;
        writeln!(out, "{answer}")?;
        answers.push(answer);
    }
    Ok(answers)
}

/// New random session id for runs that do not pass `--session`.
pub fn new_session_id() -> String {
    format!("session-{}", uuid::Uuid::new_v4().simple())
}
