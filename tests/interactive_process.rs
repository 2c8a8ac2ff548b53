// ABOUTME: Integration tests for InteractiveProcess against a scripted bash engine
// ABOUTME: Covers call round-trips, timeouts, escalation, termination, stderr forwarding, and cancellation
//
// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 enginelink contributors

use std::path::PathBuf;
use std::time::{Duration, Instant};

use enginelink::{
    EngineConfig, EngineLauncher, ErrorKind, InteractiveProcess, InteractiveSession,
    SilencePolicy, TerminationOutcome,
};

/// A tiny statement engine: reads `;`-terminated statements and answers each
/// with at most one line, the way a quiet computer algebra REPL does.
const FAKE_ENGINE: &str = r#"
while IFS= read -r -d ';' stmt; do
  stmt="${stmt#"${stmt%%[![:space:]]*}"}"
  case "$stmt" in
    slow) sleep 30 ;;
    quiet) ;;
    reset) echo done ;;
    'die') exit 7 ;;
    partial) printf 'abc' ;;
    greet) echo "$ENGINE_GREETING" ;;
    warn) echo "careful" >&2; echo ok ;;
    '60!') printf '8320987112741390144276341183223364380754172606361245952449277\\\n696409600000000000000\n' ;;
    *) echo "$stmt" ;;
  esac
done
"#;

/// Statement engine in the Maxima manner: `;` echoes the statement, `$`
/// evaluates it silently
const SILENT_DOLLAR_ENGINE: &str = r#"
stmt=''
while IFS= read -r -n1 c; do
  case "$c" in
    ';') echo "${stmt#"${stmt%%[![:space:]]*}"}"; stmt='' ;;
    '$') stmt='' ;;
    *) stmt="$stmt$c" ;;
  esac
done
"#;

const SIXTY_FACTORIAL: &str =
    "8320987112741390144276341183223364380754172606361245952449277696409600000000000000";

fn bash() -> Option<PathBuf> {
    which::which("bash").ok()
}

fn engine_config(bash: PathBuf) -> EngineConfig {
    EngineConfig::new(bash)
        .with_args(vec!["-c".to_owned(), FAKE_ENGINE.to_owned()])
        .with_default_call_timeout(5)
        .with_soft_reset_command("reset;")
}

/// Out-of-the-box configuration apart from the executable and its script
fn default_config(bash: PathBuf) -> EngineConfig {
    EngineConfig::new(bash).with_args(vec!["-c".to_owned(), SILENT_DOLLAR_ENGINE.to_owned()])
}

async fn launch(config: EngineConfig) -> InteractiveProcess {
    EngineLauncher::new(config)
        .launch()
        .await
        .expect("launch fake engine")
}

// ============================================================================
// Round Trips
// ============================================================================

#[tokio::test]
async fn single_line_results_round_trip() {
    let Some(bash) = bash() else { return };
    let process = launch(engine_config(bash)).await;

    assert_eq!(process.execute_call_with_timeout("1;", 5).await.unwrap(), "1");
    assert_eq!(
        process.execute_call_with_timeout("60!;", 5).await.unwrap(),
        SIXTY_FACTORIAL
    );
    assert_eq!(process.execute_call("1+x;").await.unwrap(), "1+x");
    assert!(!process.is_terminated());

    assert_eq!(
        process.terminate().await,
        TerminationOutcome::ExitedWithCode(0)
    );
}

#[tokio::test]
async fn huge_timeout_is_a_valid_wait() {
    let Some(bash) = bash() else { return };
    let process = launch(engine_config(bash)).await;

    assert_eq!(
        process.execute_call_with_timeout("1;", i64::MAX).await.unwrap(),
        "1"
    );
    assert!(!process.is_terminated());
    assert_eq!(process.execute_call("2;").await.unwrap(), "2");
    process.terminate().await;
}

#[tokio::test]
async fn many_sequential_calls() {
    let Some(bash) = bash() else { return };
    let process = launch(engine_config(bash)).await;

    for i in 0..100 {
        let result = process.execute_call(&format!("{i};")).await.unwrap();
        assert_eq!(result, i.to_string());
    }
    process.terminate().await;
}

#[tokio::test]
async fn configured_environment_reaches_engine() {
    let Some(bash) = bash() else { return };
    let process = launch(engine_config(bash).with_env("ENGINE_GREETING", "hello")).await;

    assert_eq!(process.execute_call("greet;").await.unwrap(), "hello");
    process.terminate().await;
}

// ============================================================================
// Timeouts and Escalation
// ============================================================================

#[tokio::test]
async fn zero_timeout_writes_without_reading() {
    let Some(bash) = bash() else { return };
    let process = launch(engine_config(bash)).await;

    assert_eq!(
        process.execute_call_with_timeout("quiet;", 0).await.unwrap(),
        ""
    );
    assert!(!process.is_terminated());

    // Output of an uncollected call stays queued for the next read
    assert_eq!(process.execute_call_with_timeout("5;", -1).await.unwrap(), "");
    assert_eq!(process.execute_call("6;").await.unwrap(), "5");
    assert_eq!(process.execute_call("7;").await.unwrap(), "6");
    process.terminate().await;
}

#[tokio::test]
async fn slow_command_is_bounded_and_terminates() {
    let Some(bash) = bash() else { return };
    let process = launch(engine_config(bash)).await;

    let start = Instant::now();
    let result = process.execute_call_with_timeout("slow;", 1).await.unwrap();
    let elapsed = start.elapsed();

    assert_eq!(result, "");
    assert!(process.is_terminated());
    assert!(elapsed < Duration::from_secs(4), "call took {elapsed:?}");
    assert_eq!(
        process.termination_outcome(),
        Some(TerminationOutcome::ForciblyDestroyed)
    );
}

#[tokio::test]
async fn silence_is_tolerated_when_configured() {
    let Some(bash) = bash() else { return };
    let process = launch(engine_config(bash).with_silence(SilencePolicy::Tolerate)).await;

    assert_eq!(
        process.execute_call_with_timeout("quiet;", 1).await.unwrap(),
        ""
    );
    assert!(!process.is_terminated());
    assert_eq!(process.execute_call("3;").await.unwrap(), "3");
    process.terminate().await;
}

#[tokio::test]
async fn empty_command_is_a_noop_write() {
    let Some(bash) = bash() else { return };
    let process = launch(engine_config(bash).with_silence(SilencePolicy::Tolerate)).await;

    assert_eq!(process.execute_call_with_timeout("", 1).await.unwrap(), "");
    assert!(!process.is_terminated());
    process.terminate().await;
}

#[tokio::test]
async fn incomplete_line_escalates_even_when_tolerating_silence() {
    let Some(bash) = bash() else { return };
    let process = launch(engine_config(bash).with_silence(SilencePolicy::Tolerate)).await;

    let result = process
        .execute_call_with_timeout("partial;", 1)
        .await
        .unwrap();
    assert_eq!(result, "");
    assert!(process.is_terminated());
}

#[tokio::test]
async fn engine_exit_mid_call_terminates() {
    let Some(bash) = bash() else { return };
    let process = launch(engine_config(bash)).await;

    let result = process.execute_call_with_timeout("die;", 2).await.unwrap();
    assert_eq!(result, "");
    assert!(process.is_terminated());
    assert_eq!(
        process.termination_outcome(),
        Some(TerminationOutcome::ExitedWithCode(7))
    );
}

#[tokio::test]
async fn abandoned_call_terminates_engine() {
    let Some(bash) = bash() else { return };
    let process = launch(engine_config(bash)).await;

    let abandoned = tokio::time::timeout(
        Duration::from_millis(200),
        process.execute_call_with_timeout("slow;", 10),
    )
    .await;
    assert!(abandoned.is_err());

    let deadline = Instant::now() + Duration::from_secs(3);
    while !process.is_terminated() && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(process.is_terminated());
}

// ============================================================================
// Termination and Misuse
// ============================================================================

#[tokio::test]
async fn terminate_is_idempotent() {
    let Some(bash) = bash() else { return };
    let process = launch(engine_config(bash)).await;

    assert_eq!(
        process.terminate().await,
        TerminationOutcome::ExitedWithCode(0)
    );
    assert!(process.is_terminated());
    assert_eq!(
        process.terminate().await,
        TerminationOutcome::AlreadyTerminated
    );
    assert!(process.is_terminated());
    assert_eq!(process.process_id(), None);
}

#[tokio::test]
async fn calls_after_termination_are_illegal() {
    let Some(bash) = bash() else { return };
    let process = launch(engine_config(bash)).await;
    process.terminate().await;

    let err = process.execute_call("1;").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::IllegalState);
    let err = process
        .execute_call_discard_output_with_timeout("1;", 1)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::IllegalState);
}

#[tokio::test]
async fn malformed_command_rejected_without_side_effects() {
    let Some(bash) = bash() else { return };
    let process = launch(engine_config(bash)).await;

    let err = process.execute_call("1;\0").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidArgument);
    assert!(!process.is_terminated());
    assert_eq!(process.execute_call("2;").await.unwrap(), "2");
    process.terminate().await;
}

#[tokio::test]
async fn soft_reset_keeps_engine_running() {
    let Some(bash) = bash() else { return };
    let process = launch(engine_config(bash)).await;

    process.soft_reset().await;
    assert!(!process.is_terminated());
    assert_eq!(process.execute_call("4;").await.unwrap(), "4");

    process.terminate().await;
    // Never raises, even on a terminated process
    process.soft_reset().await;
}

#[tokio::test]
async fn default_soft_reset_survives_silent_engine() {
    let Some(bash) = bash() else { return };
    let process = launch(default_config(bash).with_default_call_timeout(1)).await;

    process.soft_reset().await;
    assert!(!process.is_terminated());
    assert_eq!(process.execute_call("1;").await.unwrap(), "1");
    process.terminate().await;
}

#[tokio::test]
async fn default_config_discard_of_silent_statement_keeps_engine() {
    let Some(bash) = bash() else { return };
    let process = launch(default_config(bash)).await;

    process
        .execute_call_discard_output_with_timeout("display2d:false$", 1)
        .await
        .unwrap();
    assert!(!process.is_terminated());
    assert_eq!(
        process.execute_call_with_timeout("x+1;", 5).await.unwrap(),
        "x+1"
    );

    // Collecting calls still treat silence as a hang by default
    assert_eq!(
        process.execute_call_with_timeout("y:2$", 1).await.unwrap(),
        ""
    );
    assert!(process.is_terminated());
}

#[tokio::test]
async fn discard_output_consumes_the_result() {
    let Some(bash) = bash() else { return };
    let process = launch(engine_config(bash)).await;

    process.execute_call_discard_output("8;").await.unwrap();
    assert_eq!(process.execute_call("9;").await.unwrap(), "9");
    process.terminate().await;
}

// ============================================================================
// Stderr Forwarding
// ============================================================================

#[tokio::test]
async fn stderr_is_forwarded_and_sink_closed() {
    let Some(bash) = bash() else { return };
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("engine.err");
    let sink = tokio::fs::File::create(&log_path).await.unwrap();

    let process = EngineLauncher::new(engine_config(bash))
        .launch_with_stderr(sink)
        .await
        .unwrap();
    assert_eq!(process.execute_call("warn;").await.unwrap(), "ok");
    process.terminate().await;

    let logged = tokio::fs::read_to_string(&log_path).await.unwrap();
    assert_eq!(logged, "careful\n");
}
