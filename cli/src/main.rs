//! tollgraph CLI binary: stock-trading demo, chat REPL with approval prompts,
//! and session commands for resuming from another process.
//!
//! Subcommands: `demo`, `chat`, `ask`, `resume`, `show`, `clear`.

mod repl;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use cli::{CliError, Overrides, StdinApprover, APP_NAME};
use config::{AppConfig, CheckpointBackend};
use tollgraph::{Orchestrator, ResumeValue, StepResult};

#[derive(Parser, Debug)]
#[command(name = "tollgraph")]
#[command(about = "Tollgraph: LLM tool orchestration with human approval")]
struct Args {
    #[command(subcommand)]
    cmd: Command,

    /// Use the offline scripted gateway instead of a hosted model
    #[arg(long, global = true)]
    mock: bool,

    /// Checkpoint store (default from config: memory)
    #[arg(long, global = true, value_enum, value_name = "STORE")]
    store: Option<StoreArg>,

    /// SQLite database path; implies --store sqlite
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Session id (default: a new random id; demo uses "1")
    #[arg(long, global = true, value_name = "ID", env = "TOLLGRAPH_SESSION")]
    session: Option<String>,

    /// Verbose: also log to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print step results and sessions as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum StoreArg {
    Memory,
    Sqlite,
}

impl From<StoreArg> for CheckpointBackend {
    fn from(s: StoreArg) -> Self {
        match s {
            StoreArg::Memory => CheckpointBackend::Memory,
            StoreArg::Sqlite => CheckpointBackend::Sqlite,
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Price question, then a purchase that asks for approval on stdin
    Demo,
    /// Interactive chat; paused tools prompt "Approve (yes/no):"
    Chat,
    /// Send one message and print the answer, or the approval prompt and token
    Ask {
        /// User message
        #[arg(required = true, trailing_var_arg = true)]
        message: Vec<String>,
    },
    /// Resume a paused session with a decision
    Resume {
        /// Token printed when the session paused
        #[arg(long)]
        token: String,
        /// Decision passed to the paused tool (e.g. yes / no)
        #[arg(long)]
        value: String,
    },
    /// Print a session's messages and pending approval
    Show,
    /// Delete a session
    Clear,
}

impl Command {
    /// Commands that only make sense against a persistent store.
    fn needs_existing_session(&self) -> bool {
        matches!(self, Command::Resume { .. } | Command::Show | Command::Clear)
    }
}

fn print_step(session_id: &str, result: &StepResult, json: bool) -> Result<(), CliError> {
    if json {
        let mut value = serde_json::to_value(result).map_err(std::io::Error::other)?;
        value["session"] = serde_json::Value::String(session_id.to_string());
        println!("{value}");
        return Ok(());
    }
    match result {
        StepResult::Final { content } => println!("{content}"),
        StepResult::Paused { prompt, token } => {
            println!("{prompt}");
            println!("paused: session={session_id} token={token}");
        }
    }
    Ok(())
}

async fn show(orch: &Orchestrator, session_id: &str, json: bool) -> Result<(), CliError> {
    let state = orch.session(session_id).await?;
    if json {
        let s = serde_json::to_string_pretty(&state).map_err(std::io::Error::other)?;
        println!("{s}");
        return Ok(());
    }
    println!("session {session_id} ({} turns)", state.turn_count);
    for m in &state.messages {
        let calls = m
            .tool_calls()
            .iter()
            .map(|c| format!("{}({})", c.name, c.arguments))
            .collect::<Vec<_>>();
        if calls.is_empty() {
            println!("  {:<9} {}", m.role(), m.content());
        } else {
            println!("  {:<9} {} -> {}", m.role(), m.content(), calls.join(", "));
        }
    }
    if let Some(s) = &state.suspension {
        println!("pending: {} (token={}, since {})", s.prompt, s.token, s.created_at);
    }
    Ok(())
}

async fn run(args: Args) -> Result<(), CliError> {
    let mut app_config = AppConfig::load(APP_NAME)?;
    Overrides {
        mock: args.mock,
        store: args.store.map(Into::into),
        db: args.db.clone(),
    }
    .apply(&mut app_config);

    if args.cmd.needs_existing_session()
        && app_config.checkpoint.backend == CheckpointBackend::Memory
    {
        eprintln!("tollgraph: note: the memory store starts empty; use --store sqlite to reach earlier sessions");
    }

    let orch = cli::build_orchestrator(&app_config)?;
    let session = args.session.clone();

    match args.cmd {
        Command::Demo => {
            let session_id = session.unwrap_or_else(|| "1".to_string());
            let mut approver = StdinApprover::new();
            cli::run_demo(&orch, &session_id, &mut approver, &mut std::io::stdout()).await?;
        }
        Command::Chat => {
            let session_id = session.unwrap_or_else(cli::new_session_id);
            repl::run_chat(&orch, &session_id).await?;
        }
        Command::Ask { message } => {
            let session_id = session.unwrap_or_else(cli::new_session_id);
            let result = orch.step(&session_id, message.join(" ")).await?;
            print_step(&session_id, &result, args.json)?;
        }
        Command::Resume { token, value } => {
            let session_id = session.ok_or(CliError::MissingSetting("--session"))?;
            let result = orch
                .step(&session_id, ResumeValue::new(token, value))
                .await?;
            print_step(&session_id, &result, args.json)?;
        }
        Command::Show => {
            let session_id = session.ok_or(CliError::MissingSetting("--session"))?;
            show(&orch, &session_id, args.json).await?;
        }
        Command::Clear => {
            let session_id = session.ok_or(CliError::MissingSetting("--session"))?;
            orch.clear(&session_id).await?;
            println!("cleared {session_id}");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    config::load_and_apply(APP_NAME, None).ok();
    let args = Args::parse();

    let tracing_options =
        config::tracing_init::TracingOptions::new(APP_NAME).with_stderr(args.verbose);
    let _guard = match config::tracing_init::init(&tracing_options) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("tollgraph: logging disabled: {e}");
            None
        }
    };

    if let Err(e) = run(args).await {
        tracing::error!(error = %e, "command failed");
        eprintln!("tollgraph: {e}");
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Global flags parse after the subcommand.
    #[test]
    fn global_flags_after_subcommand() {
        let args = Args::try_parse_from([
            "tollgraph", "resume", "--session", "s1", "--token", "t", "--value", "yes", "--db",
            "/tmp/x.db",
        ])
        .unwrap();
        assert_eq!(args.session.as_deref(), Some("s1"));
        assert_eq!(args.db, Some(PathBuf::from("/tmp/x.db")));
        assert!(matches!(args.cmd, Command::Resume { ref token, ref value } if token == "t" && value == "yes"));
    }

    /// **Scenario**: `ask` joins the trailing words into one message.
    #[test]
    fn ask_collects_words() {
        let args = Args::try_parse_from(["tollgraph", "--mock", "ask", "price", "of", "AMZN"]).unwrap();
        assert!(args.mock);
        match args.cmd {
            Command::Ask { message } => assert_eq!(message.join(" "), "price of AMZN"),
            other => panic!("expected ask, got {:?}", other),
        }
    }

    /// **Scenario**: Store values are restricted to memory and sqlite.
    #[test]
    fn store_flag_values() {
        let args = Args::try_parse_from(["tollgraph", "--store", "sqlite", "show"]).unwrap();
        assert_eq!(args.store, Some(StoreArg::Sqlite));
        assert!(Args::try_parse_from(["tollgraph", "--store", "redis", "show"]).is_err());
    }

    /// **Scenario**: Only session commands need an existing session.
    #[test]
    fn session_commands_need_existing_session() {
        assert!(Command::Show.needs_existing_session());
        assert!(Command::Clear.needs_existing_session());
        assert!(!Command::Demo.needs_existing_session());
        assert!(!Command::Chat.needs_existing_session());
    }
}
