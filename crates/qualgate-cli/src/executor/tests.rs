use super::*;
use std::path::Path;
use std::time::{Duration, Instant};

use qualgate_filter::{EXIT_NOT_STARTED, EXIT_TIMED_OUT};

fn sh_item(id: &str, script: &str) -> ExecItem {
    let mut spec = CommandSpec::bare("sh");
    spec.args = vec!["-c".to_string(), script.to_string()];
    ExecItem {
        id: id.to_string(),
        spec,
    }
}

fn opts(parallel: usize, fail_fast: bool) -> ExecOptions {
    ExecOptions {
        parallel,
        fail_fast,
        default_timeout_ms: 10_000,
        invocation_dir: Path::new(".").to_path_buf(),
    }
}

#[tokio::test]
async fn results_keep_submission_order() {
    let items = vec![
        sh_item("slow", "sleep 0.2 && echo slow"),
        sh_item("fast", "echo fast"),
        sh_item("mid", "sleep 0.1 && echo mid"),
    ];
    let results = execute(items, &opts(4, false), &CancellationToken::new()).await;

    let ids: Vec<&str> = results.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["slow", "fast", "mid"]);
    assert!(results.iter().all(|(_, r)| r.exit_code == 0));
}

#[tokio::test]
async fn runs_are_actually_concurrent() {
    let items: Vec<ExecItem> = (0..4).map(|i| sh_item(&format!("s{i}"), "sleep 0.3")).collect();
    let start = Instant::now();
    let results = execute(items, &opts(4, false), &CancellationToken::new()).await;
    assert_eq!(results.len(), 4);
    assert!(
        start.elapsed() < Duration::from_millis(1000),
        "4 x 300ms took {:?}, expected parallel execution",
        start.elapsed()
    );
}

#[tokio::test]
async fn single_worker_serializes() {
    let items: Vec<ExecItem> = (0..3).map(|i| sh_item(&format!("s{i}"), "sleep 0.15")).collect();
    let start = Instant::now();
    execute(items, &opts(1, false), &CancellationToken::new()).await;
    assert!(
        start.elapsed() >= Duration::from_millis(400),
        "3 x 150ms took {:?} on one worker",
        start.elapsed()
    );
}

#[tokio::test]
async fn without_fail_fast_everything_completes() {
    let items = vec![
        sh_item("bad", "exit 3"),
        sh_item("good", "sleep 0.1 && echo ok"),
    ];
    let results = execute(items, &opts(2, false), &CancellationToken::new()).await;
    assert_eq!(results[0].1.exit_code, 3);
    assert_eq!(results[1].1.exit_code, 0);
    assert_eq!(results[1].1.stdout, b"ok\n");
}

#[tokio::test]
async fn fail_fast_cancels_running_and_queued_siblings() {
    // One worker: the failure runs first, everything queued behind it is
    // dropped with the not-started sentinel.
    let items = vec![
        sh_item("bad", "exit 1"),
        sh_item("q1", "echo never"),
        sh_item("q2", "echo never"),
    ];
    let results = execute(items, &opts(1, true), &CancellationToken::new()).await;
    assert_eq!(results[0].1.exit_code, 1);
    assert_eq!(results[1].1.exit_code, EXIT_NOT_STARTED);
    assert_eq!(results[2].1.exit_code, EXIT_NOT_STARTED);
}

#[tokio::test]
async fn fail_fast_interrupts_in_flight_runs() {
    let items = vec![
        sh_item("bad", "sleep 0.1 && exit 1"),
        sh_item("victim", "sleep 30"),
    ];
    let start = Instant::now();
    let results = execute(items, &opts(2, true), &CancellationToken::new()).await;
    assert!(start.elapsed() < Duration::from_secs(10));
    assert_eq!(results[0].1.exit_code, 1);
    let victim = &results[1].1;
    assert_eq!(victim.launch_error.as_deref(), Some("canceled"));
    assert_eq!(victim.exit_code, EXIT_TIMED_OUT);
}

#[tokio::test]
async fn external_cancellation_returns_partial_results() {
    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let items = vec![sh_item("a", "sleep 30"), sh_item("b", "sleep 30")];
    let start = Instant::now();
    let results = execute(items, &opts(2, false), &cancel).await;
    assert!(start.elapsed() < Duration::from_secs(10));
    for (_, result) in &results {
        assert_eq!(result.launch_error.as_deref(), Some("canceled"));
    }
}

#[tokio::test]
async fn launch_failure_does_not_stop_other_items() {
    let items = vec![
        ExecItem {
            id: "missing".into(),
            spec: CommandSpec::bare("qualgate-test-no-such-binary"),
        },
        sh_item("ok", "echo fine"),
    ];
    let results = execute(items, &opts(2, false), &CancellationToken::new()).await;
    assert!(results[0].1.launch_error.is_some());
    assert_eq!(results[1].1.exit_code, 0);
}

#[tokio::test]
async fn empty_input_is_a_no_op() {
    let results = execute(Vec::new(), &opts(4, false), &CancellationToken::new()).await;
    assert!(results.is_empty());
}
