//! Real-host system interface with timeout and kill escalation.

use std::io::Read;
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use sl_common::CommandResult;

use super::SystemInterface;

/// Per-command timeout in seconds.
pub const COMMAND_TIMEOUT_SECS: u64 = 30;

/// Grace period between SIGTERM and SIGKILL in milliseconds.
const SIGTERM_GRACE_MS: u64 = 500;

/// Poll interval while waiting for child exit.
const WAIT_POLL_MS: u64 = 20;

/// System interface backed by the running Linux host.
#[derive(Debug, Default, Clone)]
pub struct LinuxSystem;

impl LinuxSystem {
    pub fn new() -> Self {
        LinuxSystem
    }
}

impl SystemInterface for LinuxSystem {
    fn run_command(&self, argv: &[&str]) -> CommandResult {
        let Some((program, args)) = argv.split_first() else {
            return CommandResult::failed(-1, "", "empty command");
        };

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // Own process group so timeout escalation reaches grandchildren too.
        cmd.process_group(0);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                debug!(command = %program, error = %e, "spawn failed");
                return CommandResult::failed(-1, "", e.to_string());
            }
        };

        let stdout_handle = spawn_reader(child.stdout.take());
        let stderr_handle = spawn_reader(child.stderr.take());

        let deadline = Instant::now() + Duration::from_secs(COMMAND_TIMEOUT_SECS);
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break Some(status),
                Ok(None) => {
                    if Instant::now() >= deadline {
                        warn!(command = %program, "command timed out, killing process group");
                        kill_process_group(&child);
                        // Reap so the zombie does not outlive the request.
                        let _ = child.wait();
                        break None;
                    }
                    thread::sleep(Duration::from_millis(WAIT_POLL_MS));
                }
                Err(e) => {
                    debug!(command = %program, error = %e, "wait failed");
                    break None;
                }
            }
        };

        let stdout = join_reader(stdout_handle);
        let stderr = join_reader(stderr_handle);

        match status {
            Some(status) if status.success() => CommandResult {
                success: true,
                stdout,
                stderr,
                return_code: 0,
                error: None,
            },
            Some(status) => {
                let code = status.code().unwrap_or(-1);
                CommandResult {
                    success: false,
                    stdout,
                    stderr: stderr.clone(),
                    return_code: code,
                    error: Some(format!("exit code {code}")),
                }
            }
            None => CommandResult {
                success: false,
                stdout,
                stderr,
                return_code: -1,
                error: Some("timeout".to_string()),
            },
        }
    }

    fn read_file(&self, path: &str) -> Option<String> {
        match std::fs::read(path) {
            Ok(bytes) => {
                let mut text = String::from_utf8(bytes).ok()?;
                if text.ends_with('\n') {
                    text.pop();
                }
                Some(text)
            }
            Err(e) => {
                debug!(path = %path, error = %e, "read_file failed");
                None
            }
        }
    }

    fn file_exists(&self, path: &str) -> bool {
        std::path::Path::new(path).exists()
    }
}

/// Drain a child output pipe on its own thread so a full pipe can never
/// deadlock the wait loop.
fn spawn_reader<R: Read + Send + 'static>(
    pipe: Option<R>,
) -> Option<thread::JoinHandle<String>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn join_reader(handle: Option<thread::JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

/// SIGTERM the child's process group, wait a grace period, then SIGKILL.
fn kill_process_group(child: &Child) {
    let pgid = child.id() as i32;
    unsafe {
        libc::killpg(pgid, libc::SIGTERM);
    }
    thread::sleep(Duration::from_millis(SIGTERM_GRACE_MS));
    unsafe {
        libc::killpg(pgid, libc::SIGKILL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_run_command_captures_stdout() {
        let sys = LinuxSystem::new();
        let result = sys.run_command(&["echo", "hello"]);
        assert!(result.success);
        assert_eq!(result.return_code, 0);
        assert_eq!(result.stdout.trim(), "hello");
        assert!(result.error.is_none());
    }

    #[test]
    fn test_run_command_nonzero_exit() {
        let sys = LinuxSystem::new();
        let result = sys.run_command(&["false"]);
        assert!(!result.success);
        assert_eq!(result.return_code, 1);
        assert!(result.error.is_some());
    }

    #[test]
    fn test_run_command_spawn_failure() {
        let sys = LinuxSystem::new();
        let result = sys.run_command(&["/nonexistent/definitely-not-a-binary"]);
        assert!(!result.success);
        assert!(result.error.is_some());
    }

    #[test]
    fn test_read_file_trims_one_newline() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "line one\nline two\n").unwrap();
        let sys = LinuxSystem::new();
        let content = sys.read_file(f.path().to_str().unwrap()).unwrap();
        assert_eq!(content, "line one\nline two");
    }

    #[test]
    fn test_read_file_missing() {
        let sys = LinuxSystem::new();
        assert!(sys.read_file("/nonexistent/path").is_none());
        assert!(!sys.file_exists("/nonexistent/path"));
    }
}
