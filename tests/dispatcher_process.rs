mod common;
use crate::common::builders::ConfigFileBuilder;
use crate::common::{init_tracing, rendered, texts_of, wait_for_line, with_timeout};

use std::time::Duration;

use console_runner::config::ConfigFile;
use console_runner::exec::{CommandDispatcher, KILLED_LINE, RunRequest};
use console_runner::sink::RunOutcome;
use console_runner::types::LineOrigin;

fn dispatcher() -> CommandDispatcher {
    CommandDispatcher::from_config(&ConfigFile::default())
}

#[tokio::test]
async fn echo_hi_produces_command_output_and_exit_lines() {
    init_tracing();
    let d = dispatcher();

    assert_eq!(d.run("echo hi", false), RunRequest::Accepted);
    let status = with_timeout(d.wait_idle()).await;

    assert_eq!(
        rendered(d.sink()),
        vec!["[COMMAND] echo hi", "[STDOUT] hi", "[SYSTEM] EXIT CODE: 0"]
    );
    assert!(!status.running);
    assert_eq!(status.exit_code(), Some(0));
    assert!(!d.is_running());
    assert!(d.sink().is_visible());
}

#[tokio::test]
async fn unknown_command_reports_shell_exit_code() {
    init_tracing();
    let d = dispatcher();

    d.run("doesnotexist123", false);
    let status = with_timeout(d.wait_idle()).await;

    // The shell itself starts fine and reports "command not found".
    assert_eq!(status.exit_code(), Some(127));
    let last = d.sink().last().unwrap();
    assert_eq!(last.origin, LineOrigin::System);
    assert_eq!(last.text, "EXIT CODE: 127");
    assert!(!texts_of(d.sink(), LineOrigin::Stderr).is_empty());
}

#[tokio::test]
async fn missing_shell_is_a_spawn_error() {
    init_tracing();
    let cfg = ConfigFileBuilder::new()
        .with_shell("/nonexistent/shell-for-tests")
        .build();
    let d = CommandDispatcher::from_config(&cfg);

    assert_eq!(d.run("echo hi", false), RunRequest::Accepted);

    // Spawn failures are reported synchronously.
    let status = d.status();
    assert!(!status.running);
    assert_eq!(status.outcome, Some(RunOutcome::FailedToStart));
    let lines = rendered(d.sink());
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "[COMMAND] echo hi");
    assert!(lines[1].starts_with("[SYSTEM] FAILED TO START: "));
    assert!(lines[1].contains("/nonexistent/shell-for-tests"));
}

#[tokio::test]
async fn kill_ends_run_without_exit_line() {
    init_tracing();
    let d = dispatcher();

    d.run("sleep 5", false);
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(d.is_running());

    assert!(d.kill());
    let status = d.status();
    assert!(!status.running);
    assert_eq!(status.outcome, Some(RunOutcome::Killed));
    assert_eq!(d.sink().last().unwrap().text, KILLED_LINE);

    // Give the supervisor time to observe the exit; it must stay silent.
    tokio::time::sleep(Duration::from_millis(300)).await;
    let lines = rendered(d.sink());
    assert_eq!(lines.last().unwrap(), "[SYSTEM] KILLED");
    assert!(!lines.iter().any(|l| l.contains("EXIT CODE")));
    assert_eq!(lines.iter().filter(|l| l.contains("KILLED")).count(), 1);
}

#[tokio::test]
async fn kill_without_run_is_false() {
    let d = dispatcher();
    assert!(!d.kill());
    assert!(d.sink().is_empty());
}

#[tokio::test]
async fn run_while_running_changes_nothing() {
    init_tracing();
    let d = dispatcher();

    d.run("sleep 5", false);
    let before_lines = d.sink().snapshot();
    let before_status = d.status();

    assert_eq!(d.run("echo intruder", false), RunRequest::Ignored);
    assert_eq!(d.run("echo intruder", true), RunRequest::Ignored);

    assert_eq!(d.sink().snapshot(), before_lines);
    assert_eq!(d.status(), before_status);

    d.kill();
}

#[tokio::test]
async fn stdout_order_is_preserved() {
    init_tracing();
    let d = dispatcher();

    d.run("printf 'A\\nB\\nC\\n'", false);
    with_timeout(d.wait_idle()).await;

    assert_eq!(texts_of(d.sink(), LineOrigin::Stdout), vec!["A", "B", "C"]);
}

#[tokio::test]
async fn stderr_is_tagged_and_exit_code_is_verbatim() {
    init_tracing();
    let d = dispatcher();

    d.run("echo out; echo oops 1>&2; exit 3", false);
    let status = with_timeout(d.wait_idle()).await;

    assert_eq!(texts_of(d.sink(), LineOrigin::Stdout), vec!["out"]);
    assert_eq!(texts_of(d.sink(), LineOrigin::Stderr), vec!["oops"]);
    assert_eq!(status.exit_code(), Some(3));
    assert_eq!(d.sink().last().unwrap().text, "EXIT CODE: 3");
}

#[tokio::test]
async fn invalid_utf8_does_not_fail_the_run() {
    init_tracing();
    let d = dispatcher();

    d.run("printf 'bad \\377 byte\\n'; echo after", false);
    let status = with_timeout(d.wait_idle()).await;

    assert_eq!(status.exit_code(), Some(0));
    assert_eq!(
        texts_of(d.sink(), LineOrigin::Stdout),
        vec!["bad \u{FFFD} byte", "after"]
    );
}

#[tokio::test]
async fn unterminated_last_line_is_kept() {
    init_tracing();
    let d = dispatcher();

    d.run("printf 'no newline'", false);
    with_timeout(d.wait_idle()).await;

    assert_eq!(
        rendered(d.sink()),
        vec![
            "[COMMAND] printf 'no newline'",
            "[STDOUT] no newline",
            "[SYSTEM] EXIT CODE: 0"
        ]
    );
}

#[tokio::test]
async fn shell_operators_are_interpreted() {
    init_tracing();
    let d = dispatcher();

    d.run("echo a | tr a b && echo $((1+2))", false);
    with_timeout(d.wait_idle()).await;

    assert_eq!(texts_of(d.sink(), LineOrigin::Stdout), vec!["b", "3"]);
}

#[tokio::test]
async fn exit_line_comes_after_all_output() {
    init_tracing();
    let d = dispatcher();

    d.run("i=1; while [ $i -le 2000 ]; do echo $i; i=$((i+1)); done", false);
    with_timeout(d.wait_idle()).await;

    let lines = d.sink().snapshot();
    assert_eq!(texts_of(d.sink(), LineOrigin::Stdout).len(), 2000);
    let last = lines.last().unwrap();
    assert_eq!(last.origin, LineOrigin::System);
    assert_eq!(last.text, "EXIT CODE: 0");
    assert!(lines.windows(2).all(|w| w[0].seq < w[1].seq));
}

#[tokio::test]
async fn elevated_runs_go_through_the_agent() {
    init_tracing();
    // `env` stands in for the escalation agent: it just execs its arguments.
    let cfg = ConfigFileBuilder::new()
        .with_elevation("env", &["ELEVATED_BY=agent"])
        .build();
    let d = CommandDispatcher::from_config(&cfg);

    d.run("echo $ELEVATED_BY", true);
    let status = with_timeout(d.wait_idle()).await;

    assert_eq!(status.exit_code(), Some(0));
    assert_eq!(texts_of(d.sink(), LineOrigin::Stdout), vec!["agent"]);
}

#[tokio::test]
async fn new_run_clears_previous_log() {
    init_tracing();
    let d = dispatcher();

    d.run("echo one", false);
    with_timeout(d.wait_idle()).await;
    let first_generation = d.status().generation;

    d.run("echo two", false);
    let status = with_timeout(d.wait_idle()).await;

    assert_eq!(status.generation, first_generation + 1);
    assert_eq!(
        rendered(d.sink()),
        vec!["[COMMAND] echo two", "[STDOUT] two", "[SYSTEM] EXIT CODE: 0"]
    );
}

#[tokio::test]
async fn output_streams_while_running() {
    init_tracing();
    let d = dispatcher();

    d.run("echo early; sleep 5", false);
    wait_for_line(d.sink(), |l| l == "[STDOUT] early").await;
    assert!(d.is_running());

    d.kill();
}
