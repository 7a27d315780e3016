//! Tests for literal dispatch, composition and functor expansion

use std::sync::Arc;

use serde_json::json;

use super::helpers::{interpreter, program, trail, RecordingExecutor};
use crate::executors::FnExecutor;
use crate::interpreter::{Interpreter, TaskFailure, Val};

/* ===================== Composition ===================== */

#[tokio::test]
async fn test_composition_runs_right_to_left() {
    let executor = Arc::new(RecordingExecutor::new());
    let interp = interpreter("deploy ∘ test ∘ build", &executor);

    let result = interp.execute(Val::Unit).await.unwrap();

    assert_eq!(trail(&result), vec!["build", "test", "deploy"]);
    assert_eq!(executor.started_order(), vec!["build", "test", "deploy"]);
}

#[tokio::test]
async fn test_composition_feeds_output_as_input() {
    let executor = Arc::new(RecordingExecutor::new());
    let interp = interpreter("process ∘ fetch", &executor);

    interp.execute(Val::Unit).await.unwrap();

    assert_eq!(executor.call("fetch").input, Val::Unit);
    assert_eq!(
        executor.call("process").input,
        Val::untyped(json!(["fetch"]))
    );
}

#[tokio::test]
async fn test_each_stage_finishes_before_next_starts() {
    let executor = Arc::new(
        RecordingExecutor::new().with_delay(std::time::Duration::from_millis(5)),
    );
    let interp = interpreter("c o b o a", &executor);

    interp.execute(Val::Unit).await.unwrap();

    let calls = executor.calls();
    for pair in calls.windows(2) {
        assert!(pair[0].finished.unwrap() <= pair[1].started);
    }
}

#[tokio::test]
async fn test_single_literal_program() {
    let executor = Arc::new(RecordingExecutor::new());
    let interp = interpreter("only", &executor);

    let result = interp.execute(Val::untyped(json!(["seed"]))).await.unwrap();

    assert_eq!(trail(&result), vec!["seed", "only"]);
}

/* ===================== Functors ===================== */

#[tokio::test]
async fn test_functor_expands_to_body() {
    let source = r#"
functor ci = deploy ∘ test ∘ build
ci
"#;
    let executor = Arc::new(RecordingExecutor::new());
    let result = interpreter(source, &executor)
        .execute(Val::Unit)
        .await
        .unwrap();

    assert_eq!(trail(&result), vec!["build", "test", "deploy"]);
    assert!(executor.calls().iter().all(|c| c.task != "ci"));
}

#[tokio::test]
async fn test_functor_same_result_as_inlined_body() {
    let named = Arc::new(RecordingExecutor::new());
    let inlined = Arc::new(RecordingExecutor::new());

    let via_functor = interpreter("stage = (b × c) ∘ a\nd ∘ stage", &named)
        .execute(Val::Unit)
        .await
        .unwrap();
    let via_body = interpreter("d ∘ (b × c) ∘ a", &inlined)
        .execute(Val::Unit)
        .await
        .unwrap();

    assert_eq!(via_functor, via_body);
}

#[tokio::test]
async fn test_functor_referencing_functor() {
    let source = "inner = y ∘ x\nouter = z ∘ inner\nouter ∘ w";
    let executor = Arc::new(RecordingExecutor::new());

    let result = interpreter(source, &executor)
        .execute(Val::Unit)
        .await
        .unwrap();

    assert_eq!(trail(&result), vec!["w", "x", "y", "z"]);
}

#[tokio::test]
async fn test_execute_node_runs_functor_declaration() {
    let prog = program("ci = b ∘ a\nci");
    let executor = Arc::new(RecordingExecutor::new());
    let interp = Interpreter::with_shared_executor(Arc::clone(&prog), Arc::clone(&executor));
    let declaration = prog.functors.get("ci").unwrap();

    let result = interp
        .execute_node(declaration, Val::Unit, &Default::default())
        .await
        .unwrap();

    assert_eq!(trail(&result), vec!["a", "b"]);
}

/* ===================== Synchronous executors ===================== */

#[test]
fn test_sync_executor_under_block_on() {
    let executor = FnExecutor::new(|task: &str, input: Val| match (task, input) {
        ("one", _) => Ok(Val::untyped(json!(1))),
        ("double", Val::Data { payload, .. }) => {
            let n = payload.as_i64().ok_or_else(|| TaskFailure::failed("not a number"))?;
            Ok(Val::untyped(json!(n * 2)))
        }
        (other, _) => Err(TaskFailure::failed(format!("unknown task {}", other))),
    });
    let interp = Interpreter::new(program("double ∘ double ∘ one"), executor);

    let result = tokio_test::block_on(interp.execute(Val::Unit)).unwrap();

    assert_eq!(result, Val::untyped(json!(4)));
}

#[test]
fn test_run_id_survives_typed_wrapping() {
    let run_id = uuid::Uuid::new_v4();
    let prog = program("fetch :: () -> Data\nfetch");
    let report = crate::validator::validate(&prog, &Default::default());
    let interp = Interpreter::new(Arc::clone(&prog), RecordingExecutor::new()).with_run_id(run_id);

    let typed = crate::interpreter::TypedInterpreter::new(interp, &report, false);

    assert_eq!(typed.interpreter().run_id(), Some(run_id));
}
