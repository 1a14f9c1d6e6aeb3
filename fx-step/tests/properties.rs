use fx_step::{
    all, and_then, ensuring, fail, gen, provide_sequence, service, succeed, sync, Context, Cx,
    Defect, EngineConfig, Interpreter, Key, Layer, Outcome, Sequence, TraceEvent,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

type Log = Arc<Mutex<Vec<String>>>;

fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn note<E: 'static>(log: &Log, label: &str) -> Sequence<(), E> {
    let log = Arc::clone(log);
    let label = label.to_string();
    sync(move || log.lock().unwrap().push(label.clone()))
}

fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_target(false)
        .with_test_writer()
        .try_init();
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

#[test]
fn test_lookup_after_provide() {
    let key: Key<u32> = Key::new("answer");
    let context = Context::empty().provide(&key, 42);
    assert_eq!(*context.lookup(&key).unwrap(), 42);
}

#[test]
fn test_provide_leaves_other_keys_alone() {
    let first: Key<u32> = Key::new("first");
    let second: Key<u32> = Key::new("second");
    let base = Context::empty().provide(&second, 2);
    let extended = base.provide(&first, 1);

    assert_eq!(extended.lookup(&second), base.lookup(&second));

    let unresolved = Context::empty().provide(&first, 1).lookup(&second);
    assert_eq!(unresolved, Err(Defect::unresolved("second", second.id().as_u64())));
}

#[test]
fn test_keys_with_same_name_do_not_collide() {
    let one: Key<u32> = Key::new("program");
    let two: Key<u32> = Key::new("program");
    let context = Context::empty().provide(&one, 1);

    assert!(context.contains(&one));
    assert!(!context.contains(&two));
}

#[test]
fn test_and_then_after_fail_never_invokes_continuation() {
    let invoked = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&invoked);
    let sequence = and_then(fail::<u8, _>("e"), move |n| {
        counter.fetch_add(1, Ordering::SeqCst);
        succeed(n)
    });

    let result = Interpreter::default().run(&sequence, &Context::empty());

    assert_eq!(result, Ok(Outcome::Err("e")));
    assert_eq!(invoked.load(Ordering::SeqCst), 0);
}

#[test]
fn test_all_succeeds_in_order() {
    let sequence = all(vec![succeed::<_, &str>(1), succeed(2), succeed(3)]);
    let result = Interpreter::default().run(&sequence, &Context::empty());
    assert_eq!(result, Ok(Outcome::Ok(vec![1, 2, 3])));
}

#[test]
fn test_all_stops_at_first_failure() {
    let log = new_log();
    let third = note::<&str>(&log, "third started").map(|_| 3);
    let sequence = all(vec![succeed(1), fail("x"), third]);

    let result = Interpreter::default().run(&sequence, &Context::empty());

    assert_eq!(result, Ok(Outcome::Err("x")));
    assert!(entries(&log).is_empty());
}

#[test]
fn test_all_drains_finalizers_of_aborted_run() {
    let log = new_log();
    let first = succeed::<u8, &str>(1).ensuring(note(&log, "first cleanup"));
    let sequence = all(vec![first, fail("x")]);

    let result = Interpreter::default().run(&sequence, &Context::empty());

    assert_eq!(result, Ok(Outcome::Err("x")));
    assert_eq!(entries(&log), vec!["first cleanup"]);
}

#[test]
fn test_finalizers_run_in_reverse_registration_order() {
    let log = new_log();
    let sequence = ensuring(
        ensuring(succeed::<_, ()>(1), note(&log, "f1")),
        note(&log, "f2"),
    );

    let result = Interpreter::default().run(&sequence, &Context::empty());

    assert_eq!(result, Ok(Outcome::Ok(1)));
    assert_eq!(entries(&log), vec!["f2", "f1"]);
}

#[test]
fn test_finalizers_run_when_body_fails() {
    let log = new_log();
    let sink = Arc::clone(&log);
    let sequence = gen(move |cx: &mut Cx<'_, String>| {
        cx.finalize(&note(&sink, "a"))?;
        cx.finalize(&note(&sink, "b"))?;
        cx.fail::<u8>("body failed".to_string())
    });

    let result = Interpreter::default().run(&sequence, &Context::empty());
    assert_eq!(result, Ok(Outcome::Err("body failed".to_string())));
    assert_eq!(entries(&log), vec!["b", "a"]);
}

#[test]
fn test_unprovided_service_is_a_defect() {
    init_test_logging();
    let missing: Key<String> = Key::new("compiler_api");
    let sequence = service::<String, String>(&missing).map(|api| api.len());

    let result = Interpreter::default().run(&sequence, &Context::empty());

    match result {
        Err(Defect::UnresolvedCapability { name, id }) => {
            assert_eq!(name, "compiler_api");
            assert_eq!(id, missing.id().as_u64());
        }
        other => panic!("expected unresolved capability, got {other:?}"),
    }
}

#[test]
fn test_same_sequence_under_two_contexts() {
    let name: Key<String> = Key::new("name");
    let greet = service::<String, ()>(&name).map(|name| format!("hello {name}"));

    let interpreter = Interpreter::default();
    let first = interpreter.run(&greet, &Context::empty().provide(&name, "a".to_string()));
    let second = interpreter.run(&greet, &Context::empty().provide(&name, "b".to_string()));

    assert_eq!(first, Ok(Outcome::Ok("hello a".to_string())));
    assert_eq!(second, Ok(Outcome::Ok("hello b".to_string())));
}

#[test]
fn test_concurrent_runs_share_context() {
    let factor: Key<u64> = Key::new("factor");
    let context = Context::empty().provide(&factor, 3);
    let interpreter = Interpreter::default();

    let handles: Vec<_> = (0..4u64)
        .map(|n| {
            let context = context.clone();
            let interpreter = interpreter.clone();
            let sequence = service::<u64, ()>(&factor).map(move |factor| *factor * n);
            thread::spawn(move || interpreter.run(&sequence, &context))
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|handle| handle.join().unwrap()).collect();
    assert_eq!(
        results,
        vec![
            Ok(Outcome::Ok(0)),
            Ok(Outcome::Ok(3)),
            Ok(Outcome::Ok(6)),
            Ok(Outcome::Ok(9)),
        ]
    );
}

#[test]
fn test_nested_failure_drains_parent_finalizers_once() {
    init_test_logging();
    let log = new_log();
    let inner = succeed::<u8, &str>(0)
        .ensuring(note(&log, "inner"))
        .and_then(|_| fail::<u8, _>("inner failed"))
        .nested();

    let parent_log = Arc::clone(&log);
    let sequence = gen(move |cx: &mut Cx<'_, &'static str>| {
        cx.finalize(&note(&parent_log, "parent"))?;
        let value = cx.bind(&inner)?;
        cx.finalize(&note(&parent_log, "unreachable"))?;
        Ok(value)
    });

    let interpreter = Interpreter::new(EngineConfig::tracing());
    let report = interpreter.run_with_report(&sequence, &Context::empty());

    assert_eq!(report.exit, Ok(Outcome::Err("inner failed")));
    assert_eq!(entries(&log), vec!["inner", "parent"]);
    assert_eq!(report.stats.finalizers_run, 2);
    assert!(report
        .trace
        .contains(&TraceEvent::NestedExited { depth: 1, ok: false }));
}

#[test]
fn test_deeply_nested_frames() {
    let mut sequence = succeed::<usize, ()>(0);
    for _ in 0..64 {
        sequence = sequence.map(|n| n + 1).nested();
    }

    let report = Interpreter::default().run_with_report(&sequence, &Context::empty());

    assert_eq!(report.exit, Ok(Outcome::Ok(64)));
    assert_eq!(report.stats.max_depth, 64);
}

#[test]
fn test_provide_sequence_overrides_only_inside() {
    let mode: Key<&'static str> = Key::new("mode");
    let read = service::<&'static str, ()>(&mode).map(|mode| *mode);
    let inside = provide_sequence(read.clone(), &mode, "strict");
    let both = all(vec![inside, read]);

    let context = Context::empty().provide(&mode, "lenient");
    let result = Interpreter::default().run(&both, &context);

    assert_eq!(result, Ok(Outcome::Ok(vec!["strict", "lenient"])));
}

#[test]
fn test_provide_layer_applies_every_override() {
    let width: Key<u16> = Key::new("width");
    let height: Key<u16> = Key::new("height");
    let area = gen({
        let (width, height) = (width.clone(), height.clone());
        move |cx: &mut Cx<'_, ()>| {
            let w = cx.service(&width)?;
            let h = cx.service(&height)?;
            Ok(u32::from(*w) * u32::from(*h))
        }
    });

    let layer = Layer::new().with(&width, 4).with(&height, 5);
    let result = Interpreter::default().run(&area.provide_layer(layer), &Context::empty());

    assert_eq!(result, Ok(Outcome::Ok(20)));
}

#[test]
fn test_swallowed_defect_still_terminates_run() {
    let missing: Key<u8> = Key::new("missing");
    let sequence = gen(move |cx: &mut Cx<'_, ()>| {
        let fallback = cx.service(&missing).map(|n| *n).unwrap_or(0);
        Ok(fallback)
    });

    let result = Interpreter::default().run(&sequence, &Context::empty());
    assert_eq!(result.unwrap_err().capability_name(), Some("missing"));
}

#[test]
fn test_attempt_does_not_catch_defects() {
    let missing: Key<u8> = Key::new("missing");
    let risky = service::<u8, String>(&missing);
    let sequence = gen(move |cx: &mut Cx<'_, ()>| {
        let outcome = cx.attempt(&risky)?;
        Ok(outcome.is_ok())
    });

    let result = Interpreter::default().run(&sequence, &Context::empty());
    assert!(matches!(result, Err(Defect::UnresolvedCapability { .. })));
}

#[test]
fn test_suppressed_finalizer_failures_are_reported() {
    init_test_logging();
    let sequence = succeed::<u8, String>(1)
        .ensuring(fail("close journal".to_string()))
        .ensuring(fail("flush edits".to_string()));

    let interpreter = Interpreter::new(EngineConfig::tracing());
    let report = interpreter.run_with_report(&sequence, &Context::empty());

    assert_eq!(report.exit, Ok(Outcome::Err("flush edits".to_string())));
    assert_eq!(report.suppressed, vec!["close journal".to_string()]);
    assert!(report
        .trace
        .contains(&TraceEvent::FinalizerSuppressed { depth: 0 }));
}

#[test]
fn test_nested_suppressed_failures_reach_top_level_report() {
    let inner = succeed::<u8, &str>(1)
        .ensuring(fail("first"))
        .ensuring(fail("second"))
        .nested();
    let sequence = inner.or_else(|_| succeed(0));

    let report = Interpreter::default().run_with_report(&sequence, &Context::empty());

    assert_eq!(report.exit, Ok(Outcome::Ok(0)));
    assert_eq!(report.suppressed, vec!["first"]);
}
