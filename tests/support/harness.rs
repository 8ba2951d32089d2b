use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

pub const VALID_LIST: &str = r#"[
    {"trigger": {"url-filter": "ads\\.example\\.com"}, "action": {"type": "block"}}
]"#;

pub const MALFORMED_LIST: &str = r#"[
    {"trigger": {"url-filter": "ads|banners"}, "action": {"type": "block"}}
]"#;

/// TestHarness provides an isolated directory to write rule lists and
/// filter lists into, and runs the built binaries against it.
pub struct TestHarness {
    pub dir: TempDir,
    pub validator_binary: PathBuf,
    #[allow(dead_code)]
    pub converter_binary: PathBuf,
}

impl TestHarness {
    pub fn new() -> Self {
        TestHarness {
            dir: TempDir::new().expect("Failed to create temp dir"),
            validator_binary: PathBuf::from(env!("CARGO_BIN_EXE_does-it-compile")),
            converter_binary: PathBuf::from(env!("CARGO_BIN_EXE_ab2cb")),
        }
    }

    /// Returns the base directory path (the TempDir path).
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Writes a file into the harness directory and returns its full path.
    pub fn write_file(&self, name: &str, content: &str) -> String {
        let path = self.path().join(name);
        fs::write(&path, content).expect("Failed to write file");
        path.to_string_lossy().to_string()
    }

    /// Full path of a file in the harness directory that does not exist.
    #[allow(dead_code)]
    pub fn missing_file(&self, name: &str) -> String {
        self.path().join(name).to_string_lossy().to_string()
    }

    /// Runs does-it-compile with the given arguments.
    #[allow(dead_code)]
    pub fn run(&self, args: &[&str]) -> Output {
        Command::new(&self.validator_binary)
            .args(args)
            .current_dir(self.path())
            .env("NO_COLOR", "1")
            .output()
            .expect("Failed to run does-it-compile")
    }

    /// Runs ab2cb with the given arguments.
    #[allow(dead_code)]
    pub fn run_converter(&self, args: &[&str]) -> Output {
        self.run_converter_with_stdin(args, "")
    }

    /// Runs ab2cb with the given arguments and standard input.
    #[allow(dead_code)]
    pub fn run_converter_with_stdin(&self, args: &[&str], stdin: &str) -> Output {
        let mut child = Command::new(&self.converter_binary)
            .args(args)
            .current_dir(self.path())
            .env("NO_COLOR", "1")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("Failed to run ab2cb");

        child
            .stdin
            .take()
            .expect("stdin is piped")
            .write_all(stdin.as_bytes())
            .expect("Failed to write stdin");

        child.wait_with_output().expect("Failed to wait for ab2cb")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Standard output as text.
pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Standard error as text.
#[allow(dead_code)]
pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}
