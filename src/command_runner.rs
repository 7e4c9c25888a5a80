//! Bounded command execution
//!
//! This module provides the ONLY sanctioned way to spawn external programs.
//! All execution goes through `run_command_safe` to ensure:
//!
//! - Process group isolation (the child dies with the sequencer)
//! - PID registration for cleanup on Ctrl-C
//! - Timeout enforcement: on expiry the whole process group is killed
//! - No stragglers: once the child exits, whatever is left of its group is
//!   killed too
//!
//! Output pipes are drained on helper threads so a chatty `apt-get` cannot
//! block on a full pipe while we poll for exit. A process that escaped the
//! group (`setsid`, a daemon started by a postinst script) may keep the pipes
//! open forever, so collection stops after a short grace period.

use crate::command::{CommandOutput, CommandSpec};
use crate::error::Result;
use crate::process_guard::{send_signal_to_group, ChildRegistry, CommandProcessGroup};
use nix::sys::signal::Signal;
use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long output is still collected after the child is gone.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Execute a command, waiting at most `spec.timeout`.
///
/// # Returns
///
/// - `Ok(output)` - The command ran; check `output.success` / `timed_out`
/// - `Err` - The program could not be spawned (not installed, bad path)
pub fn run_command_safe(spec: &CommandSpec) -> Result<CommandOutput> {
    info!(command = %spec, timeout = ?spec.timeout, "running command");

    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .in_new_process_group();
    for (key, value) in &spec.env {
        cmd.env(key, value);
    }

    let mut child = cmd.spawn()?;
    let pid = child.id();

    if let Ok(mut registry) = ChildRegistry::global().lock() {
        registry.register(pid);
    }

    let stdout_reader = child.stdout.take().map(drain);
    let stderr_reader = child.stderr.take().map(drain);

    let deadline = spec.timeout.map(|t| Instant::now() + t);
    let mut timed_out = false;

    let status = loop {
        if let Some(status) = child.try_wait()? {
            break Some(status);
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            warn!(command = %spec, "command timed out, killing process group {}", pid);
            if send_signal_to_group(pid, Signal::SIGKILL).is_err() {
                let _ = child.kill();
            }
            let _ = child.wait();
            timed_out = true;
            break None;
        }
        std::thread::sleep(POLL_INTERVAL);
    };

    // Background members of the group must not outlive the command.
    let _ = send_signal_to_group(pid, Signal::SIGKILL);

    if let Ok(mut registry) = ChildRegistry::global().lock() {
        registry.unregister(pid);
    }

    let drain_until = Instant::now() + DRAIN_GRACE;
    let stdout = collect(stdout_reader, drain_until);
    let stderr = collect(stderr_reader, drain_until);

    let output = match status {
        Some(status) => CommandOutput {
            stdout,
            stderr,
            exit_code: status.code(),
            success: status.success(),
            timed_out,
        },
        None => CommandOutput::timed_out(stdout, stderr),
    };

    debug!(
        command = %spec,
        exit_code = ?output.exit_code,
        success = output.success,
        "command finished"
    );

    Ok(output)
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let mut chunk = [0u8; 8192];
        loop {
            match pipe.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if tx.send(chunk[..n].to_vec()).is_err() {
                        break;
                    }
                }
            }
        }
    });
    rx
}

/// Gather whatever arrives before `until`; a pipe still held open by an
/// escaped process is abandoned along with its reader thread.
fn collect(reader: Option<Receiver<Vec<u8>>>, until: Instant) -> String {
    let Some(rx) = reader else {
        return String::new();
    };
    let mut buf = Vec::new();
    loop {
        match rx.recv_timeout(until.saturating_duration_since(Instant::now())) {
            Ok(bytes) => buf.extend_from_slice(&bytes),
            Err(RecvTimeoutError::Timeout) => {
                warn!("output pipe still open after the command exited; giving up on it");
                break;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_captures_stdout_and_exit_code() {
        let output = run_command_safe(&CommandSpec::shell("echo hello; echo oops >&2; exit 3"))
            .expect("bash should spawn");
        assert_eq!(output.stdout.trim(), "hello");
        assert_eq!(output.stderr.trim(), "oops");
        assert_eq!(output.exit_code, Some(3));
        assert!(!output.success);
        assert!(!output.timed_out);
    }

    #[test]
    fn test_env_is_passed() {
        let spec = CommandSpec::shell("printf %s \"$SETUP_PROBE\"").env("SETUP_PROBE", "42");
        let output = run_command_safe(&spec).unwrap();
        assert!(output.success);
        assert_eq!(output.stdout, "42");
    }

    #[test]
    fn test_timeout_kills_command() {
        let spec = CommandSpec::shell("sleep 30").timeout(Duration::from_millis(200));
        let start = Instant::now();
        let output = run_command_safe(&spec).unwrap();
        assert!(output.timed_out);
        assert!(!output.success);
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_missing_program_is_error() {
        let spec = CommandSpec::new("this_binary_definitely_does_not_exist_12345");
        assert!(run_command_safe(&spec).is_err());
    }
}
