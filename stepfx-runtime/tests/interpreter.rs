use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use stepfx::hook::HookPoint;
use stepfx::telemetry::{TelemetryEvent, TelemetryRecord};
use stepfx::test_utils::RecordingHook;
use stepfx::{Command, Failure, Procedure, Resume, Step, Suspension, from_fn, procedure};
use stepfx_runtime::{Config, HandlerMap, Interpreter, handler_fn, sync_handler};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Fixtures
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Suspends on each entry in turn and returns every resumed value as an
/// array. A thrown failure ends the computation unless `recover` maps it
/// to a value.
fn chain(
    name: &'static str,
    steps: Vec<Suspension>,
    recover: Option<fn(Failure) -> Value>,
) -> Arc<dyn Procedure> {
    procedure(name, move |_args| {
        let mut pending = steps.clone().into_iter();
        let mut seen = Vec::new();
        from_fn(move |input: Resume| {
            match input {
                Resume::Start => {}
                Resume::Value(v) => seen.push(v),
                Resume::Throw(f) => match recover {
                    Some(r) => seen.push(r(f)),
                    None => return Step::Failed(f),
                },
            }
            match pending.next() {
                Some(s) => Step::Suspend(s),
                None => Step::Done(Value::Array(seen.clone())),
            }
        })
    })
}

fn echo(value: Value) -> Command {
    Command::new("echo").with("value", value)
}

fn delayed(value: Value, ms: u64) -> Command {
    Command::new("delayed").with("value", value).with("ms", ms)
}

fn handlers() -> HandlerMap {
    HandlerMap::new()
        .with(
            "echo",
            sync_handler(|cmd| Ok(cmd.get("value").cloned().unwrap_or(Value::Null))),
        )
        .with(
            "delayed",
            handler_fn(|cmd, _cx| async move {
                let ms = cmd.get("ms").and_then(Value::as_u64).unwrap_or(0);
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok(cmd.get("value").cloned().unwrap_or(Value::Null))
            }),
        )
        .with(
            "fail",
            sync_handler(|cmd| {
                Err(Failure::handler(
                    cmd.get("reason").and_then(Value::as_str).unwrap_or("oops"),
                ))
            }),
        )
        .with("panic", sync_handler(|_| panic!("kaboom")))
}

fn recorded() -> (Arc<RecordingHook>, Arc<Config>) {
    let hook = Arc::new(RecordingHook::new());
    let config = Arc::new(Config::new().with_hook(hook.clone()));
    (hook, config)
}

fn kinds(records: &[TelemetryRecord]) -> Vec<HookPoint> {
    records.iter().map(TelemetryRecord::point).collect()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Single commands
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn completes_without_suspending() {
    let interp = Interpreter::new(handlers());
    let (hook, config) = recorded();
    let p = procedure("constant", |args| from_fn(move |_| Step::Done(args.clone())));

    let out = interp.run(&config, p.as_ref(), json!({"x": 1})).await;

    assert_eq!(out, Ok(json!({"x": 1})));
    assert_eq!(kinds(&hook.records()), vec![HookPoint::Call, HookPoint::CallComplete]);
}

#[tokio::test]
async fn resumes_with_handler_value_and_emits_in_order() {
    let interp = Interpreter::new(handlers());
    let (hook, config) = recorded();
    let p = chain("one", vec![echo(json!("hi")).into()], None);

    let out = interp.run(&config, p.as_ref(), json!([])).await;

    assert_eq!(out, Ok(json!(["hi"])));
    let records = hook.records();
    assert_eq!(
        kinds(&records),
        vec![
            HookPoint::Call,
            HookPoint::Command,
            HookPoint::CommandComplete,
            HookPoint::CallComplete,
        ]
    );
    match &records[2].event {
        TelemetryEvent::CommandComplete {
            command,
            step,
            index,
            start,
            end,
            success,
            result,
            ..
        } => {
            assert_eq!(command, &echo(json!("hi")));
            assert_eq!((*step, *index), (0, 0));
            assert!(end >= start);
            assert!(*success);
            assert_eq!(result, &Some(json!("hi")));
        }
        other => panic!("unexpected event {other:?}"),
    }
    match &records[3].event {
        TelemetryEvent::CallComplete { procedure, steps, success, .. } => {
            assert_eq!(procedure, "one");
            assert_eq!(*steps, 1);
            assert!(*success);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn step_counter_increases_per_suspension() {
    let interp = Interpreter::new(handlers());
    let (hook, config) = recorded();
    let p = chain(
        "three",
        vec![echo(json!(1)).into(), echo(json!(2)).into(), echo(json!(3)).into()],
        None,
    );

    let out = interp.run(&config, p.as_ref(), Value::Null).await;

    assert_eq!(out, Ok(json!([1, 2, 3])));
    let steps: Vec<u64> = hook
        .at(HookPoint::Command)
        .iter()
        .map(|r| match r.event {
            TelemetryEvent::Command { step, .. } => step,
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(steps, vec![0, 1, 2]);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Failures
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn unknown_type_is_recoverable_lookup_failure() {
    let interp = Interpreter::new(handlers());
    let (_hook, config) = recorded();
    let p = chain(
        "recovers",
        vec![Command::new("nope").into(), echo(json!("after")).into()],
        Some(|f| json!({"recovered": f.to_string(), "lookup": matches!(f, Failure::Lookup(_))})),
    );

    let out = interp.run(&config, p.as_ref(), Value::Null).await.unwrap();

    assert_eq!(out[0]["lookup"], json!(true));
    assert_eq!(out[1], json!("after"));
}

#[tokio::test]
async fn unknown_type_without_recovery_fails_the_call() {
    let interp = Interpreter::new(handlers());
    let (hook, config) = recorded();
    let p = chain("strict", vec![Command::new("nope").into()], None);

    let out = interp.run(&config, p.as_ref(), Value::Null).await;

    assert_eq!(out, Err(Failure::Lookup("nope".into())));
    let completes = hook.at(HookPoint::CommandComplete);
    assert_eq!(completes.len(), 1);
    assert_eq!(completes[0].event.success(), Some(false));
    let calls = hook.at(HookPoint::CallComplete);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].event.success(), Some(false));
}

#[tokio::test]
async fn handler_failure_reaches_the_computation() {
    let interp = Interpreter::new(handlers());
    let (_hook, config) = recorded();
    let p = chain(
        "recovers",
        vec![Command::new("fail").with("reason", "disk full").into()],
        Some(|f| json!(f.to_string())),
    );

    let out = interp.run(&config, p.as_ref(), Value::Null).await;

    assert_eq!(out, Ok(json!(["handler failed: disk full"])));
}

#[tokio::test]
async fn handler_panic_becomes_failure() {
    let interp = Interpreter::new(handlers());
    let (_hook, config) = recorded();
    let p = chain("panics", vec![Command::new("panic").into()], None);

    let out = interp.run(&config, p.as_ref(), Value::Null).await;

    assert!(matches!(out, Err(Failure::Panicked(_))));
}

#[tokio::test]
async fn computation_failure_is_terminal() {
    let interp = Interpreter::new(handlers());
    let (hook, config) = recorded();
    let p = procedure("broken", |_| {
        from_fn(|_| Step::Failed(Failure::computation("invariant violated")))
    });

    let out = interp.run(&config, p.as_ref(), Value::Null).await;

    assert_eq!(out, Err(Failure::computation("invariant violated")));
    assert!(hook.at(HookPoint::Command).is_empty());
    assert_eq!(hook.at(HookPoint::CallComplete)[0].event.success(), Some(false));
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Fan-out
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn fan_out_preserves_input_order_under_jitter() {
    let interp = Interpreter::new(handlers());
    let (hook, config) = recorded();
    // Later entries finish first.
    let batch = vec![
        delayed(json!("a"), 80),
        delayed(json!("b"), 40),
        delayed(json!("c"), 0),
    ];
    let p = chain("fan", vec![batch.into()], None);

    let out = interp.run(&config, p.as_ref(), Value::Null).await;

    assert_eq!(out, Ok(json!([["a", "b", "c"]])));
    let mut indexes: Vec<usize> = hook
        .at(HookPoint::CommandComplete)
        .iter()
        .map(|r| match r.event {
            TelemetryEvent::CommandComplete { index, step, .. } => {
                assert_eq!(step, 0);
                index
            }
            _ => unreachable!(),
        })
        .collect();
    // Completion order is reversed; every index is reported once.
    assert_eq!(indexes, vec![2, 1, 0]);
    indexes.sort_unstable();
    assert_eq!(indexes, vec![0, 1, 2]);
}

#[tokio::test]
async fn fan_out_runs_concurrently() {
    let interp = Interpreter::new(handlers());
    let (_hook, config) = recorded();
    let batch: Vec<Command> = (0..5).map(|i| delayed(json!(i), 50)).collect();
    let p = chain("fan", vec![batch.into()], None);

    let started = std::time::Instant::now();
    let out = interp.run(&config, p.as_ref(), Value::Null).await;

    assert_eq!(out, Ok(json!([[0, 1, 2, 3, 4]])));
    assert!(started.elapsed() < Duration::from_millis(200));
}

#[tokio::test]
async fn fan_out_failure_hides_partial_results_but_not_telemetry() {
    let interp = Interpreter::new(handlers());
    let (hook, config) = recorded();
    let batch = vec![
        delayed(json!("slow-1"), 30),
        Command::new("fail").with("reason", "one bad"),
        delayed(json!("slow-2"), 30),
    ];
    let p = chain("fan", vec![batch.into()], None);

    let out = interp.run(&config, p.as_ref(), Value::Null).await;
    assert_eq!(out, Err(Failure::handler("one bad")));

    // Siblings were not cancelled: give them time to settle.
    tokio::time::sleep(Duration::from_millis(150)).await;
    let completes = hook.at(HookPoint::CommandComplete);
    assert_eq!(completes.len(), 3);
    assert_eq!(completes.iter().filter(|r| r.event.success() == Some(true)).count(), 2);
    assert_eq!(hook.at(HookPoint::Command).len(), 3);
}

#[tokio::test]
async fn fan_out_outlives_a_dropped_caller() {
    let interp = Interpreter::new(handlers());
    let (hook, config) = recorded();
    let batch = vec![
        delayed(json!("a"), 60),
        delayed(json!("b"), 60),
        delayed(json!("c"), 60),
    ];
    let p = chain("fan", vec![batch.into()], None);

    let run = interp.run(&config, p.as_ref(), Value::Null);
    let timed_out = tokio::time::timeout(Duration::from_millis(10), run).await;
    assert!(timed_out.is_err());

    tokio::time::sleep(Duration::from_millis(200)).await;
    let completes = hook.at(HookPoint::CommandComplete);
    assert_eq!(completes.len(), 3);
    assert!(completes.iter().all(|r| r.event.success() == Some(true)));
    assert!(hook.at(HookPoint::CallComplete).is_empty());
}

#[tokio::test]
async fn empty_fan_out_resolves_to_empty_array() {
    let interp = Interpreter::new(handlers());
    let (_hook, config) = recorded();
    let p = chain("empty", vec![Suspension::All(vec![])], None);

    let out = interp.run(&config, p.as_ref(), Value::Null).await;

    assert_eq!(out, Ok(json!([[]])));
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Nesting and config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn nested_calls_share_cid_and_extend_stack() {
    let inner = chain("inner", vec![echo(json!("deep")).into()], None);
    let inner_for_handler = Arc::clone(&inner);
    let map = handlers().with(
        "callInner",
        handler_fn(move |_cmd, cx| {
            let inner = Arc::clone(&inner_for_handler);
            async move { cx.run(inner.as_ref(), json!({"from": "outer"})).await }
        }),
    );
    let interp = Interpreter::new(map);
    let hook = Arc::new(RecordingHook::new());
    let config = Arc::new(Config::new().with_name("nesting").with_hook(hook.clone()));
    let outer = chain("outer", vec![Command::new("callInner").into()], None);

    let out = interp.run(&config, outer.as_ref(), json!([])).await;

    assert_eq!(out, Ok(json!([["deep"]])));
    let records = hook.records();
    let cid = records[0].trace.cid.clone();
    assert!(records.iter().all(|r| r.trace.cid == cid));
    assert!(records.iter().all(|r| r.trace.name.as_deref() == Some("nesting")));

    let inner_calls: Vec<_> = hook
        .at(HookPoint::Call)
        .into_iter()
        .filter(|r| r.trace.depth() == 2)
        .collect();
    assert_eq!(inner_calls.len(), 1);
    let stack = &inner_calls[0].trace.stack;
    assert_eq!(stack[0].procedure, "outer");
    assert_eq!(stack[1].procedure, "inner");
    assert_eq!(stack[1].args, json!({"from": "outer"}));
    assert!(stack[1].handlers.contains(&"callInner".to_owned()));
}

#[tokio::test]
async fn top_level_runs_get_distinct_cids() {
    let interp = Interpreter::new(handlers());
    let (hook, config) = recorded();
    let p = chain("p", vec![], None);

    interp.run(&config, p.as_ref(), Value::Null).await.unwrap();
    interp.run(&config, p.as_ref(), Value::Null).await.unwrap();

    let calls = hook.at(HookPoint::Call);
    assert_eq!(calls.len(), 2);
    assert_ne!(calls[0].trace.cid, calls[1].trace.cid);
}

#[tokio::test]
async fn callback_options_fire_at_their_points() {
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let (a, b, c, d) = (seen.clone(), seen.clone(), seen.clone(), seen.clone());
    let config = Arc::new(
        Config::new()
            .with_cid("fixed")
            .on_call(move |_| a.lock().unwrap().push("call"))
            .on_command(move |_| b.lock().unwrap().push("command"))
            .on_command_complete(move |_| c.lock().unwrap().push("command_complete"))
            .on_call_complete(move |r| {
                assert_eq!(r.trace.cid.as_str(), "fixed");
                d.lock().unwrap().push("call_complete")
            }),
    );
    let interp = Interpreter::new(handlers());
    let p = chain("p", vec![echo(json!(1)).into()], None);

    interp.run(&config, p.as_ref(), Value::Null).await.unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec!["call", "command", "command_complete", "call_complete"]
    );
}

#[tokio::test]
async fn bound_procedures_behave_like_functions() {
    let interp = Interpreter::new(handlers());
    let p = chain("people", vec![echo(json!("Luke")).into()], None);
    let q = procedure("identity", |args| from_fn(move |_| Step::Done(args.clone())));
    let fns = interp.bind_all([p, q], Arc::new(Config::new()));

    assert_eq!(fns["people"].call(Value::Null).await, Ok(json!(["Luke"])));
    assert_eq!(fns["identity"].call(json!(7)).await, Ok(json!(7)));
    assert_eq!(fns["identity"].name(), "identity");
}

#[tokio::test]
async fn handler_can_start_an_independent_top_level_run() {
    let inner = chain("audit", vec![echo(json!("logged")).into()], None);
    let inner_for_handler = Arc::clone(&inner);
    let map = handlers().with(
        "spawnAudit",
        handler_fn(move |_cmd, cx| {
            let inner = Arc::clone(&inner_for_handler);
            async move {
                assert!(cx.handlers().get("spawnAudit").is_some());
                let config = Arc::clone(cx.context().config());
                cx.interpreter().run(&config, inner.as_ref(), Value::Null).await
            }
        }),
    );
    let interp = Interpreter::new(map);
    let (hook, config) = recorded();
    let outer = chain("outer", vec![Command::new("spawnAudit").into()], None);

    let out = interp.run(&config, outer.as_ref(), Value::Null).await;

    assert_eq!(out, Ok(json!([["logged"]])));
    let calls = hook.at(HookPoint::Call);
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].trace.depth(), 1);
    assert_eq!(calls[1].trace.stack[0].procedure, "audit");
    assert_ne!(calls[0].trace.cid, calls[1].trace.cid);
}
