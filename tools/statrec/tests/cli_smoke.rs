use assert_cmd::cargo::cargo_bin_cmd;
use statrec::errors::RecorderError;
use std::path::Path;

fn fixture(path: &str) -> String {
    format!("{}/tests/fixtures/{path}", env!("CARGO_MANIFEST_DIR"))
}

#[test]
fn cli_help_contract() {
    let help = statrec::render_help();
    for flag in [
        "--config",
        "--output-dir",
        "--policy",
        "--time-format",
        "--workers",
        "--iterations",
        "--memory-diagnostics",
    ] {
        assert!(help.contains(flag), "missing {flag}");
    }
}

#[test]
fn binary_help_exits_zero() {
    let mut help = cargo_bin_cmd!("statrec");
    help.arg("--help");
    let out = help.assert().success();
    let stdout = String::from_utf8(out.get_output().stdout.clone()).expect("utf8");
    assert!(stdout.contains("--policy"));
}

#[test]
fn binary_run_writes_results_and_run_log() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut run = cargo_bin_cmd!("statrec");
    run.arg("--config")
        .arg(fixture("configs/minimal.toml"))
        .arg("--output-dir")
        .arg(dir.path())
        .arg("--workers")
        .arg("3")
        .arg("--iterations")
        .arg("2")
        .assert()
        .success();

    let results = std::fs::read_to_string(dir.path().join("results.log")).expect("results log");
    for worker in 1..=3 {
        assert!(results.contains(&format!("worker-{worker} finished")));
    }
    assert!(results.contains("completed workers=3 iterations=2"));
    assert!(!results.contains("Warnings:"), "standard policy discards the header");

    let run_log = std::fs::read_to_string(dir.path().join("statrec-run.jsonl")).expect("run log");
    assert!(run_log.contains("\"event_type\":\"commit\""));
    assert!(run_log.contains("\"to\":\"finalized\""));
}

#[test]
fn run_with_args_broadcast_and_trace_fill_every_destination() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut out = Vec::new();
    let args = vec![
        "statrec".into(),
        "--config".into(),
        fixture("configs/minimal.toml").into(),
        "--output-dir".into(),
        dir.path().join("broadcast").into_os_string(),
        "--policy".into(),
        "broadcast".into(),
        "--time-format".into(),
        "elapsed".into(),
    ];
    let code = statrec::run_with_args(&args, Path::new("/"), false, &mut out).expect("run");
    assert_eq!(code, 0);
    let line = String::from_utf8(out).expect("utf8");
    assert!(line.starts_with("source=statrec state=finalized"));

    let summary =
        std::fs::read_to_string(dir.path().join("broadcast/summary.log")).expect("summary log");
    assert!(summary.contains("Warnings:"));
    assert!(summary.contains("fixture warning one"));
    assert!(summary.contains("fixture warning two"));
    assert!(summary.contains("worker-1 iteration=1"));

    let mut out = Vec::new();
    let args = vec![
        "statrec".into(),
        "--config".into(),
        fixture("configs/minimal.toml").into(),
        "--output-dir".into(),
        dir.path().join("trace").into_os_string(),
        "--policy".into(),
        "trace".into(),
        "--iterations".into(),
        "3".into(),
    ];
    statrec::run_with_args(&args, Path::new("/"), true, &mut out).expect("run");
    let trace = std::fs::read_to_string(dir.path().join("trace/trace.log")).expect("trace log");
    assert_eq!(trace.lines().count(), 6);
    assert!(String::from_utf8(out).expect("utf8").contains("with trace policy"));
}

#[test]
fn invalid_arguments_are_cli_errors() {
    let mut out = Vec::new();
    let args = vec!["statrec".into(), "--policy".into(), "loud".into()];
    let err = statrec::run_with_args(&args, Path::new("/"), false, &mut out).unwrap_err();
    assert!(matches!(err, RecorderError::Cli(ref msg) if msg.contains("unknown policy `loud`")));

    let args = vec!["statrec".into(), "--config".into(), "/does/not/exist.toml".into()];
    let err = statrec::run_with_args(&args, Path::new("/"), false, &mut out).unwrap_err();
    assert!(matches!(err, RecorderError::Io(_)));
}
