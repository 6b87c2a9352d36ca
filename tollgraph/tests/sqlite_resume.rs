//! A session paused in one orchestrator is resumed by a fresh one that shares
//! only the SQLite checkpoint file.


use std::sync::Arc;

use serde_json::json;
use tollgraph::{
    ArgSchema, Checkpointer, JsonSerializer, LlmResponse, MockLlm, Orchestrator, ResumeValue,
    SessionState, SqliteSaver, StepResult, ToolCall, ToolOutcome, ToolRegistry,
};

fn registry() -> ToolRegistry {
    let mut r = ToolRegistry::new();
    r.register_fn("approve_transfer", "Transfer after approval", ArgSchema::new(), true, |inv| {
        match inv.resume_value().and_then(|v| v.as_str()) {
            None => Ok(ToolOutcome::suspend("Approve transfer?", json!({"amount": 5}))),
            Some(answer) => Ok(ToolOutcome::text(format!(
                "transfer of {} {}",
                inv.payload.as_ref().map(|p| p["amount"].clone()).unwrap_or_default(),
                if answer == "yes" { "done" } else { "cancelled" }
            ))),
        }
    });
    r
}

fn saver(path: &std::path::Path) -> Arc<SqliteSaver<SessionState>> {
    Arc::new(SqliteSaver::new(path, Arc::new(JsonSerializer)).unwrap())
}

fn orchestrator(store: Arc<SqliteSaver<SessionState>>, llm: MockLlm) -> Orchestrator {
    Orchestrator::builder()
        .llm(Arc::new(llm))
        .registry(registry())
        .checkpointer(store)
        .build()
        .unwrap()
}

/// **Scenario**: Pause in process A, resume in process B from the same database file.
#[tokio::test]
async fn resume_from_fresh_orchestrator() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("sessions").join("checkpoints.db");

    let token = {
        let first = orchestrator(
            saver(&db),
            MockLlm::scripted([LlmResponse::with_tool_calls(
                "",
                vec![ToolCall::new("t1", "approve_transfer", "{}")],
            )]),
        );
        match first.step("acct-7", "send 5").await.unwrap() {
            StepResult::Paused { prompt, token } => {
                assert_eq!(prompt, "Approve transfer?");
                token
            }
            other => panic!("expected Paused, got {:?}", other),
        }
    };

    let store = saver(&db);
    let persisted = store.load("acct-7").await.unwrap();
    let suspension = persisted.suspension.clone().unwrap();
    assert_eq!(suspension.token, token);
    assert_eq!(suspension.tool_name, "approve_transfer");
    assert_eq!(suspension.payload, json!({"amount": 5}));

    let llm = MockLlm::with_no_tool_calls("Transfer complete.");
    let second = orchestrator(store.clone(), llm);
    let done = second
        .step("acct-7", ResumeValue::new(token, "yes"))
        .await
        .unwrap();
    assert_eq!(done, StepResult::Final { content: "Transfer complete.".into() });

    let state = store.load("acct-7").await.unwrap();
    assert!(state.suspension.is_none());
    assert!(state.resume.is_none());
    assert!(state
        .messages
        .iter()
        .any(|m| m.content() == "transfer of 5 done"));
    assert_eq!(&state.messages[..persisted.messages.len()], &persisted.messages[..]);
}

/// **Scenario**: What is saved is exactly what is loaded, suspension included.
#[tokio::test]
async fn saved_state_loads_back_exactly() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("c.db");
    let orch = orchestrator(
        saver(&db),
        MockLlm::scripted([LlmResponse::with_tool_calls(
            "checking",
            vec![ToolCall::new("t1", "approve_transfer", "{}")],
        )]),
    );
    orch.step("s", "send").await.unwrap();
    let in_memory = orch.session("s").await.unwrap();

    let reopened = saver(&db).load("s").await.unwrap();
    assert_eq!(reopened, in_memory);
    assert_eq!(orch.history("s", None).await.unwrap().len(), 1);
}
