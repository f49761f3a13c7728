// src/exec/runner.rs

//! Real process runner built on `tokio::process`.

use std::process::{ExitStatus, Stdio};

use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::errors::SpawnError;
use crate::exec::backend::{KillSwitch, LaunchSpec, OutputStream, RunHandle};

/// Exit code reported when the OS gives neither a code nor a signal.
pub const UNKNOWN_EXIT_CODE: i32 = -1;

/// Spawn `spec` and start a supervisor task that owns the child until it
/// exits or is killed.
///
/// Must be called from within a Tokio runtime.
pub fn spawn_process(spec: &LaunchSpec) -> Result<RunHandle, SpawnError> {
    if spec.program.is_empty() {
        return Err(SpawnError::EmptyCommandLine);
    }

    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args).stdin(Stdio::null());

    if spec.capture_output {
        cmd.stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
    } else {
        cmd.stdout(Stdio::null()).stderr(Stdio::null());
    }

    let mut child = cmd
        .spawn()
        .map_err(|e| SpawnError::from_io(&spec.program, e))?;

    let pid = child.id();
    info!(program = %spec.program, ?pid, capture = spec.capture_output, "process started");

    let stdout = child
        .stdout
        .take()
        .map(|s| Box::new(s) as OutputStream);
    let stderr = child
        .stderr
        .take()
        .map(|s| Box::new(s) as OutputStream);

    let (kill_tx, kill_rx) = oneshot::channel::<()>();
    let (exit_tx, exit_rx) = oneshot::channel::<i32>();

    let program = spec.program.clone();
    tokio::spawn(async move {
        let code = supervise_child(child, kill_rx, &program).await;
        if exit_tx.send(code).is_err() {
            debug!(program = %program, code, "nobody awaiting exit code");
        }
    });

    Ok(RunHandle {
        pid,
        stdout,
        stderr,
        exit: exit_rx,
        kill: KillSwitch::new(kill_tx),
    })
}

/// Wait for the child to exit on its own, or kill it when asked to.
///
/// If the kill switch is dropped without firing, the child keeps running and
/// we keep waiting for it.
async fn supervise_child(
    mut child: Child,
    mut kill_rx: oneshot::Receiver<()>,
    program: &str,
) -> i32 {
    tokio::select! {
        status = child.wait() => status_to_code(status, program),

        request = &mut kill_rx => {
            if request.is_ok() {
                info!(program, "kill requested; terminating process");
                if let Err(e) = child.kill().await {
                    warn!(program, error = %e, "failed to kill child process");
                }
            } else {
                debug!(program, "kill switch dropped; waiting for natural exit");
            }
            let status = child.wait().await;
            status_to_code(status, program)
        }
    }
}

fn status_to_code(status: std::io::Result<ExitStatus>, program: &str) -> i32 {
    match status {
        Ok(status) => {
            let code = exit_code(status);
            info!(program, exit_code = code, success = status.success(), "process exited");
            code
        }
        Err(e) => {
            warn!(program, error = %e, "failed to wait for process");
            UNKNOWN_EXIT_CODE
        }
    }
}

/// Map an exit status to an integer: the real code when there is one,
/// `-signal` when the process was terminated by a signal.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }

    UNKNOWN_EXIT_CODE
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;

    use super::*;

    fn sh(cmd: &str) -> LaunchSpec {
        LaunchSpec::captured("sh", vec!["-c".to_string(), cmd.to_string()])
    }

    #[tokio::test]
    async fn reports_exit_code() {
        let handle = spawn_process(&sh("exit 3")).unwrap();
        assert_eq!(handle.exit.await.unwrap(), 3);
    }

    #[tokio::test]
    async fn exposes_stdout() {
        let mut handle = spawn_process(&sh("printf hello")).unwrap();
        let mut out = String::new();
        handle
            .stdout
            .take()
            .unwrap()
            .read_to_string(&mut out)
            .await
            .unwrap();
        assert_eq!(out, "hello");
        assert_eq!(handle.exit.await.unwrap(), 0);
    }

    #[tokio::test]
    async fn missing_executable_is_not_found() {
        let err = spawn_process(&LaunchSpec::captured("doesnotexist123-bin", vec![])).unwrap_err();
        assert!(matches!(err, SpawnError::NotFound { .. }));
    }

    #[tokio::test]
    async fn empty_program_is_rejected() {
        let err = spawn_process(&LaunchSpec::captured("", vec![])).unwrap_err();
        assert!(matches!(err, SpawnError::EmptyCommandLine));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn killed_process_reports_negative_code() {
        let handle = spawn_process(&LaunchSpec::captured("sleep", vec!["30".to_string()])).unwrap();
        assert!(handle.kill.kill());
        let code = handle.exit.await.unwrap();
        assert_eq!(code, -9);
    }

    #[tokio::test]
    async fn detached_process_has_no_streams() {
        let handle = spawn_process(&LaunchSpec::detached("sh", vec!["-c".into(), "true".into()]))
            .unwrap();
        assert!(handle.stdout.is_none());
        assert!(handle.stderr.is_none());
        assert_eq!(handle.exit.await.unwrap(), 0);
    }
}
