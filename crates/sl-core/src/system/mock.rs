//! Pre-seeded system interface for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use sl_common::CommandResult;

use super::SystemInterface;

/// Test fixture implementing [`SystemInterface`] from pre-seeded maps.
///
/// Commands are keyed by their argv joined with single spaces. Unseeded
/// commands fail with "command not seeded"; unseeded files read as absent.
/// Every lookup is recorded so tests can assert on probe behavior.
#[derive(Debug, Default)]
pub struct MockSystem {
    commands: HashMap<String, CommandResult>,
    files: HashMap<String, String>,
    existing: Vec<String>,
    calls: Mutex<Vec<String>>,
}

impl MockSystem {
    pub fn new() -> Self {
        MockSystem::default()
    }

    /// Seed a successful command with the given stdout.
    pub fn with_command(mut self, argv: &str, stdout: &str) -> Self {
        self.commands
            .insert(argv.to_string(), CommandResult::ok(stdout, ""));
        self
    }

    /// Seed a failing command.
    pub fn with_failing_command(mut self, argv: &str, error: &str) -> Self {
        self.commands
            .insert(argv.to_string(), CommandResult::failed(1, "", error));
        self
    }

    /// Seed a readable file. The path also becomes existent.
    pub fn with_file(mut self, path: &str, content: &str) -> Self {
        self.files.insert(path.to_string(), content.to_string());
        self.existing.push(path.to_string());
        self
    }

    /// Mark a path as existing without readable content (e.g. a directory
    /// or an unreadable file).
    pub fn with_existing_path(mut self, path: &str) -> Self {
        self.existing.push(path.to_string());
        self
    }

    /// Every `run_command` and `read_file` key observed, in order.
    pub fn recorded_calls(&self) -> Vec<String> {
        self.calls.lock().expect("mock call log poisoned").clone()
    }
}

impl SystemInterface for MockSystem {
    fn run_command(&self, argv: &[&str]) -> CommandResult {
        let key = argv.join(" ");
        self.calls
            .lock()
            .expect("mock call log poisoned")
            .push(format!("run:{key}"));
        self.commands
            .get(&key)
            .cloned()
            .unwrap_or_else(|| CommandResult::failed(127, "", "command not seeded"))
    }

    fn read_file(&self, path: &str) -> Option<String> {
        self.calls
            .lock()
            .expect("mock call log poisoned")
            .push(format!("read:{path}"));
        self.files.get(path).cloned()
    }

    fn file_exists(&self, path: &str) -> bool {
        self.existing.iter().any(|p| p == path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_command_and_file() {
        let sys = MockSystem::new()
            .with_command("nproc", "8\n")
            .with_file("/proc/cmdline", "quiet splash");
        assert!(sys.run_command(&["nproc"]).success);
        assert_eq!(sys.read_file("/proc/cmdline").unwrap(), "quiet splash");
        assert!(sys.file_exists("/proc/cmdline"));
        assert!(!sys.file_exists("/proc/vmstat"));
    }

    #[test]
    fn test_unseeded_command_fails() {
        let sys = MockSystem::new();
        let result = sys.run_command(&["lspci", "-mm"]);
        assert!(!result.success);
        assert_eq!(result.return_code, 127);
    }

    #[test]
    fn test_call_recording() {
        let sys = MockSystem::new().with_command("uname -r", "6.8.0\n");
        let _ = sys.run_command(&["uname", "-r"]);
        let _ = sys.read_file("/proc/meminfo");
        assert_eq!(
            sys.recorded_calls(),
            vec!["run:uname -r".to_string(), "read:/proc/meminfo".to_string()]
        );
    }
}
