//! Child process utilities: bounded waits, stderr capture and signalling.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use sshvol_shared::errors::{SshvolError, SshvolResult};

/// How often a running child is polled while a timeout is armed.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Exit status and captured stderr of a finished child.
#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Run a command to completion, capturing stderr.
///
/// stdin and stdout are detached. stderr goes to an anonymous temp file that
/// is read once the child exited, so a daemonized descendant that keeps the
/// descriptor (sshfs leaves its ssh process behind) cannot delay the call.
/// With `Some(timeout)` the child is killed with SIGKILL and reaped once the
/// timeout elapses.
///
/// # Errors
///
/// * [`SshvolError::Spawn`] - the program could not be started
/// * [`SshvolError::Timeout`] - the child outlived `timeout`
/// * [`SshvolError::Internal`] - the capture file could not be created or
///   waiting on the child failed
pub fn run_with_timeout(
    mut cmd: Command,
    timeout: Option<Duration>,
) -> SshvolResult<ProcessOutput> {
    let program = cmd.get_program().to_string_lossy().into_owned();

    let mut stderr_file = tempfile::tempfile().map_err(|e| {
        SshvolError::Internal(format!("failed to create stderr file for {}: {}", program, e))
    })?;
    let child_stderr = stderr_file.try_clone().map_err(|e| {
        SshvolError::Internal(format!("failed to share stderr file with {}: {}", program, e))
    })?;

    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::from(child_stderr));

    let mut child = cmd.spawn().map_err(|source| SshvolError::Spawn {
        program: program.clone(),
        source,
    })?;
    tracing::trace!(program = %program, pid = child.id(), "Spawned child process");

    let status = match timeout {
        Some(timeout) => wait_with_deadline(&mut child, &program, timeout)?,
        None => child.wait().map_err(|e| {
            SshvolError::Internal(format!("failed to wait for {}: {}", program, e))
        })?,
    };

    let stderr = match read_captured(&mut stderr_file) {
        Ok(stderr) => stderr,
        Err(e) => {
            tracing::warn!(program = %program, "Reading stderr of child failed: {}", e);
            String::new()
        }
    };

    Ok(ProcessOutput { status, stderr })
}

/// Read everything written to the capture file so far.
fn read_captured(file: &mut File) -> std::io::Result<String> {
    let mut buf = Vec::new();
    file.seek(SeekFrom::Start(0))?;
    file.read_to_end(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn wait_with_deadline(
    child: &mut Child,
    program: &str,
    timeout: Duration,
) -> SshvolResult<ExitStatus> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) if Instant::now() >= deadline => {
                let pid = child.id();
                tracing::warn!(
                    program = %program,
                    pid,
                    timeout_secs = timeout.as_secs_f64(),
                    "Child process timed out, killing"
                );
                if !kill_process(pid) {
                    tracing::warn!(program = %program, pid, "Failed to kill timed out child");
                }
                // Reap so the child does not linger as a zombie
                let _ = child.wait();
                return Err(SshvolError::Timeout {
                    program: program.to_string(),
                    timeout,
                });
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                return Err(SshvolError::Internal(format!(
                    "failed to wait for {}: {}",
                    program, e
                )));
            }
        }
    }
}

/// Kill a process with SIGKILL.
///
/// # Returns
/// * `true` - Process was killed or doesn't exist
/// * `false` - Failed to kill (permission denied)
pub fn kill_process(pid: u32) -> bool {
    unsafe { libc::kill(pid as i32, libc::SIGKILL) == 0 || !is_process_alive(pid) }
}

/// Check if a process with the given PID exists.
///
/// Uses `libc::kill(pid, 0)` which sends a null signal to check existence.
pub fn is_process_alive(pid: u32) -> bool {
    unsafe { libc::kill(pid as i32, 0) == 0 }
}
