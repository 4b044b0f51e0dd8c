//! Integration tests for pipeline execution
//!
//! Full path: author → compile → run, with real artifact files on disk.

use std::sync::Arc;
use std::time::Duration;

use conveyor::{
    ArgumentRef, ArtifactStore, Captured, CodecRegistry, ComponentDescriptor, ConveyorError,
    DataType, EventKind, FnInvoke, Invocation, Invoke, LocalArtifactStore, Pipeline,
    PipelineBuilder, Port, Runner, TaskStatus,
};

fn codecs() -> CodecRegistry {
    CodecRegistry::with_builtins()
}

fn store_in(dir: &tempfile::TempDir) -> Arc<dyn ArtifactStore> {
    Arc::new(LocalArtifactStore::new(dir.path().to_str().unwrap()).unwrap())
}

/// `write_numbers(start, count)` → artifact `numbers` with one number per line
fn write_numbers(codecs: &CodecRegistry) -> Arc<ComponentDescriptor> {
    ComponentDescriptor::new(
        "write_numbers",
        vec![
            Port::value("start", DataType::Integer).with_default("0"),
            Port::value("count", DataType::Integer).with_default("5"),
        ],
        vec![Port::artifact("numbers_path", DataType::String)],
        FnInvoke::new(|inv: Invocation| {
            let start: i64 = inv.args["start"].parse().expect("start is an integer");
            let count: i64 = inv.args["count"].parse().expect("count is an integer");
            let lines: String = (start..start + count).map(|n| format!("{}\n", n)).collect();
            std::fs::write(&inv.output_paths["numbers_path"], lines)?;
            Ok(Captured::none())
        }),
        codecs,
    )
    .unwrap()
}

/// `sum_numbers(numbers)` → value `total`
fn sum_numbers(codecs: &CodecRegistry) -> Arc<ComponentDescriptor> {
    ComponentDescriptor::new(
        "sum_numbers",
        vec![Port::artifact("numbers_path", DataType::String)],
        vec![Port::value("total", DataType::Integer)],
        FnInvoke::new(|inv: Invocation| {
            let text = std::fs::read_to_string(&inv.input_paths["numbers_path"])?;
            let total: i64 = text.lines().filter_map(|l| l.parse::<i64>().ok()).sum();
            Ok(Captured::single(total))
        }),
        codecs,
    )
    .unwrap()
}

// ═══════════════════════════════════════════════════════════════
// SCENARIO: write_numbers → sum_numbers
// ═══════════════════════════════════════════════════════════════

#[tokio::test]
async fn numbers_pipeline_produces_lines_and_sum() {
    conveyor::util::log::init();
    let codecs = codecs();
    let dir = tempfile::tempdir().unwrap();
    let gen = write_numbers(&codecs);
    let sum = sum_numbers(&codecs);

    let mut builder = PipelineBuilder::new("numbers_demo");
    let write = builder.add_task("write", &gen, vec![]).unwrap();
    builder
        .add_task(
            "sum",
            &sum,
            vec![("numbers", write.output("numbers").unwrap().into())],
        )
        .unwrap();

    let runner = Runner::new(builder.finish(), store_in(&dir), codecs).unwrap();
    let summary = runner.run().await.unwrap();

    assert!(summary.all_succeeded());

    // The artifact holds one number per line
    let path = summary.artifact("write", "numbers_path").unwrap();
    let contents = std::fs::read_to_string(path).unwrap();
    assert_eq!(contents, "0\n1\n2\n3\n4\n");

    // 0+1+2+3+4
    assert_eq!(summary.value("sum", "total"), Some("10"));
}

#[tokio::test]
async fn defaults_can_be_overridden_with_literals() {
    let codecs = codecs();
    let dir = tempfile::tempdir().unwrap();
    let gen = write_numbers(&codecs);
    let sum = sum_numbers(&codecs);

    let mut builder = PipelineBuilder::new("numbers_demo");
    let write = builder
        .add_task(
            "write",
            &gen,
            vec![
                ("start", ArgumentRef::literal(10)),
                ("count", ArgumentRef::literal(3)),
            ],
        )
        .unwrap();
    builder
        .add_task(
            "sum",
            &sum,
            vec![("numbers", write.output("numbers").unwrap().into())],
        )
        .unwrap();

    let runner = Runner::new(builder.finish(), store_in(&dir), codecs).unwrap();
    let summary = runner.run().await.unwrap();

    // 10+11+12
    assert_eq!(summary.value("sum", "total"), Some("33"));
}

// ═══════════════════════════════════════════════════════════════
// SCENARIO: split_text_lines
// ═══════════════════════════════════════════════════════════════

#[tokio::test]
async fn split_text_lines_separates_odd_and_even() {
    let codecs = codecs();
    let dir = tempfile::tempdir().unwrap();

    let split = ComponentDescriptor::new(
        "split_text_lines",
        vec![Port::value("text", DataType::String)],
        vec![
            Port::artifact("odd_lines_path", DataType::String),
            Port::artifact("even_lines_path", DataType::String),
        ],
        FnInvoke::new(|inv: Invocation| {
            let mut odd = String::new();
            let mut even = String::new();
            for (i, line) in inv.args["text"].lines().enumerate() {
                // Lines are 1-based: index 0 is line one (odd)
                let bucket = if i % 2 == 0 { &mut odd } else { &mut even };
                bucket.push_str(line);
                bucket.push('\n');
            }
            std::fs::write(&inv.output_paths["odd_lines_path"], odd)?;
            std::fs::write(&inv.output_paths["even_lines_path"], even)?;
            Ok(Captured::none())
        }),
        &codecs,
    )
    .unwrap();

    let text = "one\ntwo\nthree\nfour\nfive\nsix\nseven\neight\nnine\nten";
    let mut builder = PipelineBuilder::new("split_demo");
    builder
        .add_task("split", &split, vec![("text", ArgumentRef::literal(text))])
        .unwrap();

    let runner = Runner::new(builder.finish(), store_in(&dir), codecs).unwrap();
    let summary = runner.run().await.unwrap();

    let odd = std::fs::read_to_string(summary.artifact("split", "odd_lines_path").unwrap()).unwrap();
    let even =
        std::fs::read_to_string(summary.artifact("split", "even_lines_path").unwrap()).unwrap();

    assert_eq!(odd, "one\nthree\nfive\nseven\nnine\n");
    assert_eq!(even, "two\nfour\nsix\neight\nten\n");
}

// ═══════════════════════════════════════════════════════════════
// FAILURE SEMANTICS
// ═══════════════════════════════════════════════════════════════

/// A unit that never writes its allocated artifact output
fn forgetful(codecs: &CodecRegistry) -> Arc<ComponentDescriptor> {
    ComponentDescriptor::new(
        "forgetful",
        vec![],
        vec![Port::artifact("data", DataType::String)],
        FnInvoke::new(|_inv: Invocation| Ok(Captured::none())),
        codecs,
    )
    .unwrap()
}

/// A unit that consumes one artifact and produces one value
fn reader(codecs: &CodecRegistry) -> Arc<ComponentDescriptor> {
    ComponentDescriptor::new(
        "reader",
        vec![Port::artifact("data", DataType::String)],
        vec![Port::value("text", DataType::String)],
        FnInvoke::new(|inv: Invocation| {
            let text = std::fs::read_to_string(&inv.input_paths["data"])?;
            Ok(Captured::single(text))
        }),
        codecs,
    )
    .unwrap()
}

#[tokio::test]
async fn unwritten_output_fails_consumer_and_spares_siblings() {
    let codecs = codecs();
    let dir = tempfile::tempdir().unwrap();
    let bad = forgetful(&codecs);
    let read = reader(&codecs);
    let gen = write_numbers(&codecs);
    let sum = sum_numbers(&codecs);

    let mut builder = PipelineBuilder::new("branches");
    // Doomed branch: forgetful → consume → downstream of consume
    let ghost = builder.add_task("ghost", &bad, vec![]).unwrap();
    let consume = builder
        .add_task(
            "consume",
            &read,
            vec![("data", ghost.output("data").unwrap().into())],
        )
        .unwrap();
    // A second-level dependent must be skipped, not run
    let relay = ComponentDescriptor::new(
        "relay",
        vec![Port::value("text", DataType::String)],
        vec![Port::value("text", DataType::String)],
        FnInvoke::new(|inv: Invocation| Ok(Captured::single(inv.args["text"].clone()))),
        &codecs,
    )
    .unwrap();
    builder
        .add_task(
            "after",
            &relay,
            vec![("text", consume.output("text").unwrap().into())],
        )
        .unwrap();
    // Healthy sibling branch
    let write = builder.add_task("write", &gen, vec![]).unwrap();
    builder
        .add_task(
            "sum",
            &sum,
            vec![("numbers", write.output("numbers").unwrap().into())],
        )
        .unwrap();

    let runner = Runner::new(builder.finish(), store_in(&dir), codecs).unwrap();
    let summary = runner.run().await.unwrap();

    // The producer itself "succeeded" - it just wrote nothing
    assert!(summary.is_success("ghost"));

    // The consumer failed at the read, naming producer, port, and path
    let consume_result = summary.result("consume").unwrap();
    let error = consume_result.error().unwrap();
    assert!(error.contains("CNV-040"));
    assert!(error.contains("ghost.data"));

    // Its dependent was skipped, never run
    match &summary.result("after").unwrap().status {
        TaskStatus::Skipped { cause } => assert_eq!(&**cause, "consume"),
        other => panic!("expected skip, got {:?}", other),
    }

    // The independent branch still completed
    assert!(summary.is_success("write"));
    assert_eq!(summary.value("sum", "total"), Some("10"));

    assert_eq!(summary.completed, 3);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.skipped, 1);
}

#[tokio::test]
async fn failing_unit_skips_all_transitive_dependents() {
    let codecs = codecs();
    let dir = tempfile::tempdir().unwrap();

    let boom = ComponentDescriptor::new(
        "boom",
        vec![],
        vec![Port::value("out", DataType::String)],
        FnInvoke::new(|_inv: Invocation| {
            Err(ConveyorError::TaskFailed {
                task_id: "boom".to_string(),
                reason: "unit exploded".to_string(),
            })
        }),
        &codecs,
    )
    .unwrap();
    let relay = ComponentDescriptor::new(
        "relay",
        vec![Port::value("x", DataType::String)],
        vec![Port::value("out", DataType::String)],
        FnInvoke::new(|inv: Invocation| Ok(Captured::single(inv.args["x"].clone()))),
        &codecs,
    )
    .unwrap();

    let mut builder = PipelineBuilder::new("chain");
    let a = builder.add_task("a", &boom, vec![]).unwrap();
    let b = builder
        .add_task("b", &relay, vec![("x", a.output("out").unwrap().into())])
        .unwrap();
    builder
        .add_task("c", &relay, vec![("x", b.output("out").unwrap().into())])
        .unwrap();

    let runner = Runner::new(builder.finish(), store_in(&dir), codecs).unwrap();
    let summary = runner.run().await.unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.skipped, 2);
    assert!(summary.result("a").unwrap().error().unwrap().contains("unit exploded"));
    // b skipped because of a, c because of b
    assert!(matches!(
        &summary.result("b").unwrap().status,
        TaskStatus::Skipped { cause } if &**cause == "a"
    ));
    assert!(matches!(
        &summary.result("c").unwrap().status,
        TaskStatus::Skipped { cause } if &**cause == "b"
    ));
}

// ═══════════════════════════════════════════════════════════════
// EVENTS AND ORDERING
// ═══════════════════════════════════════════════════════════════

#[tokio::test]
async fn event_sequence_for_chained_tasks() {
    let codecs = codecs();
    let dir = tempfile::tempdir().unwrap();
    let gen = write_numbers(&codecs);
    let sum = sum_numbers(&codecs);

    let mut builder = PipelineBuilder::new("events");
    let write = builder.add_task("write", &gen, vec![]).unwrap();
    builder
        .add_task(
            "sum",
            &sum,
            vec![("numbers", write.output("numbers").unwrap().into())],
        )
        .unwrap();

    let runner = Runner::new(builder.finish(), store_in(&dir), codecs).unwrap();
    runner.run().await.unwrap();

    let events = runner.event_log().events();

    // First and last envelope the run
    assert!(matches!(
        &events[0].kind,
        EventKind::PipelineStarted { task_count: 2, .. }
    ));
    assert!(matches!(
        &events.last().unwrap().kind,
        EventKind::PipelineCompleted { completed: 2, failed: 0, skipped: 0, .. }
    ));

    // Producer completion precedes consumer start
    let write_completed = runner
        .event_log()
        .filter_task("write")
        .into_iter()
        .find(|e| matches!(e.kind, EventKind::TaskCompleted { .. }))
        .map(|e| e.id)
        .unwrap();
    let sum_started = runner
        .event_log()
        .filter_task("sum")
        .into_iter()
        .find(|e| matches!(e.kind, EventKind::TaskStarted { .. }))
        .map(|e| e.id)
        .unwrap();
    assert!(write_completed < sum_started);

    // Event ids are sequential from zero
    for (i, event) in events.iter().enumerate() {
        assert_eq!(event.id, i as u64);
    }
}

#[tokio::test]
async fn independent_tasks_run_in_one_wave() {
    let codecs = codecs();
    let dir = tempfile::tempdir().unwrap();
    let gen = write_numbers(&codecs);

    let mut builder = PipelineBuilder::new("parallel");
    builder.add_task("left", &gen, vec![]).unwrap();
    builder.add_task("right", &gen, vec![]).unwrap();

    let runner = Runner::new(builder.finish(), store_in(&dir), codecs).unwrap();
    let summary = runner.run().await.unwrap();

    assert!(summary.all_succeeded());

    // Both scheduled before either completed: same dispatch wave
    let events = runner.event_log().events();
    let scheduled: Vec<u64> = events
        .iter()
        .filter(|e| matches!(e.kind, EventKind::TaskScheduled { .. }))
        .map(|e| e.id)
        .collect();
    let first_completed = events
        .iter()
        .find(|e| matches!(e.kind, EventKind::TaskCompleted { .. }))
        .map(|e| e.id)
        .unwrap();
    assert_eq!(scheduled.len(), 2);
    assert!(scheduled.iter().all(|id| *id < first_completed));
}

// ═══════════════════════════════════════════════════════════════
// CANCELLATION
// ═══════════════════════════════════════════════════════════════

/// A unit that runs until cancelled
struct SlowUnit;

#[async_trait::async_trait]
impl Invoke for SlowUnit {
    async fn invoke(&self, inv: Invocation) -> conveyor::Result<Captured> {
        tokio::select! {
            _ = inv.cancel.cancelled() => Err(ConveyorError::TaskFailed {
                task_id: "slow".to_string(),
                reason: "cancelled".to_string(),
            }),
            _ = tokio::time::sleep(Duration::from_secs(60)) => Ok(Captured::single("done")),
        }
    }
}

fn slow_pipeline(codecs: &CodecRegistry) -> Pipeline {
    let slow = ComponentDescriptor::new(
        "slow",
        vec![],
        vec![Port::value("out", DataType::String)],
        Arc::new(SlowUnit),
        codecs,
    )
    .unwrap();
    let relay = ComponentDescriptor::new(
        "relay",
        vec![Port::value("x", DataType::String)],
        vec![Port::value("out", DataType::String)],
        FnInvoke::new(|inv: Invocation| Ok(Captured::single(inv.args["x"].clone()))),
        codecs,
    )
    .unwrap();

    let mut builder = PipelineBuilder::new("slow");
    let s = builder.add_task("slow", &slow, vec![]).unwrap();
    builder
        .add_task("after", &relay, vec![("x", s.output("out").unwrap().into())])
        .unwrap();
    builder.finish()
}

#[tokio::test]
async fn cancelled_before_start_dispatches_nothing() {
    let codecs = codecs();
    let dir = tempfile::tempdir().unwrap();

    let runner = Runner::new(slow_pipeline(&codecs), store_in(&dir), codecs).unwrap();
    runner.cancellation_token().cancel();

    let err = runner.run().await.unwrap_err();
    assert!(matches!(err, ConveyorError::Cancelled { pending: 2 }));

    // No task ever started
    let events = runner.event_log().events();
    assert!(!events
        .iter()
        .any(|e| matches!(e.kind, EventKind::TaskStarted { .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e.kind, EventKind::PipelineCancelled { pending: 2 })));
}

#[tokio::test]
async fn cancelling_mid_run_signals_unit_and_skips_dependents() {
    let codecs = codecs();
    let dir = tempfile::tempdir().unwrap();

    let runner = Arc::new(Runner::new(slow_pipeline(&codecs), store_in(&dir), codecs).unwrap());
    let token = runner.cancellation_token();

    let handle = {
        let runner = Arc::clone(&runner);
        tokio::spawn(async move { runner.run().await })
    };

    // Let the slow unit start, then abort the run
    tokio::time::sleep(Duration::from_millis(100)).await;
    token.cancel();

    let result = handle.await.unwrap();
    assert!(matches!(result, Err(ConveyorError::Cancelled { .. })));

    // The running unit settled as failed; its partial work is not consumable
    let slow = runner.datastore().get("slow").unwrap();
    assert!(!slow.is_success());

    // The dependent was never dispatched
    assert!(runner
        .event_log()
        .filter_task("after")
        .iter()
        .all(|e| !matches!(e.kind, EventKind::TaskStarted { .. })));
}
