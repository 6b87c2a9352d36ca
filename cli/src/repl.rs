//! Interactive chat loop: read stdin, step the session, print the answer, repeat
//! until EOF or quit. Paused tools ask `Approve (yes/no):` on the same stdin.

use std::io::Write;

use cli::{CliError, StdinApprover};
use tollgraph::{Orchestrator, ResumeValue};

/// Runs the REPL on `session_id`.
///
/// If the session is already waiting for approval (e.g. from an earlier run on
/// the SQLite store), that approval is asked first. Exits on EOF, or
/// `quit`/`exit`/`/quit`. Step errors are printed and the loop continues.
pub async fn run_chat(orch: &Orchestrator, session_id: &str) -> Result<(), CliError> {
    let mut stdin = StdinApprover::new();
    let mut stdout = std::io::stdout();
    println!("session {session_id}");

    if let Ok(Some(pending)) = orch.pending(session_id).await {
        println!("{}", pending.prompt);
        let decision = cli::Approver::decide(&mut stdin, &pending.prompt).await?;
        let resume = ResumeValue::new(pending.token, decision);
        match cli::drive(orch, session_id, resume, &mut stdin, &mut stdout).await {
            Ok(answer) => println!("{answer}"),
            Err(CliError::InputClosed) => return Ok(()),
            Err(e) => eprintln!("error: {e}"),
        }
    }

    loop {
        print!("> ");
        stdout.flush()?;

        let line = match stdin.next_line().await? {
            None => break,
            Some(s) if s.trim().is_empty() => continue,
            Some(s) if is_quit_command(&s) => break,
            Some(s) => s,
        };

        match cli::drive(orch, session_id, line, &mut stdin, &mut stdout).await {
            Ok(answer) => println!("{answer}"),
            Err(CliError::InputClosed) => break,
            Err(e) => eprintln!("error: {e}"),
        }
    }

    println!("Bye.");
    Ok(())
}

fn is_quit_command(s: &str) -> bool {
    let lower = s.trim().to_lowercase();
    matches!(lower.as_str(), "quit" | "exit" | "/quit")
}
