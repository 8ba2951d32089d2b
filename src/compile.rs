//! Blocking compile calls and per-file compile-and-report.
//!
//! [`RuleListStore`] only offers an asynchronous, callback-based API.
//! [`synchronous_compile_list`] is the sync-over-async bridge: it submits the
//! request and parks the calling thread on a one-shot channel until the
//! completion handler fires. It must not be called from a thread the store
//! needs in order to make progress.

use std::fs;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crate::engine::{CompileError, CompiledRuleList, RuleListStore};
use crate::output::Output;
use crate::paths;

/// Compile `list` and wait for the store to answer.
///
/// There is no timeout: a store that never answers blocks the caller
/// forever. A store that drops the completion handler unanswered yields
/// [`CompileError::EngineUnavailable`].
pub fn synchronous_compile_list(
    store: &dyn RuleListStore,
    identifier: &str,
    list: String,
) -> Result<CompiledRuleList, CompileError> {
    let (tx, rx) = mpsc::sync_channel(1);
    store.compile_content_rule_list(
        identifier,
        list,
        Box::new(move |result| {
            let _ = tx.send(result);
        }),
    );
    rx.recv().unwrap_or(Err(CompileError::EngineUnavailable))
}

/// What happened to one input file.
#[derive(Debug, Clone)]
pub enum FileStatus {
    Compiled(CompiledRuleList),
    Rejected(CompileError),
    /// The file could not be read; holds the I/O error message.
    Unreadable(String),
}

#[derive(Debug, Clone)]
pub struct FileOutcome {
    /// The argument as given on the command line.
    pub path: String,
    /// Display name (base name of the expanded path).
    pub name: String,
    pub status: FileStatus,
    /// Time spent compiling; zero for unreadable files.
    pub elapsed: Duration,
}

impl FileOutcome {
    pub fn compiled(&self) -> bool {
        matches!(self.status, FileStatus::Compiled(_))
    }

    pub fn rejected(&self) -> bool {
        matches!(self.status, FileStatus::Rejected(_))
    }

    pub fn unreadable(&self) -> bool {
        matches!(self.status, FileStatus::Unreadable(_))
    }
}

/// Load `path`, compile it and print the result.
pub fn compile_and_report(
    path: &str,
    identifier: &str,
    store: &dyn RuleListStore,
    output: &Output,
) -> FileOutcome {
    let expanded: PathBuf = paths::expand_tilde(path);
    let name = paths::display_name(&expanded);

    let list = match fs::read_to_string(&expanded) {
        Ok(list) => list,
        Err(e) => {
            output.load_failure(path, &e);
            return FileOutcome {
                path: path.to_string(),
                name,
                status: FileStatus::Unreadable(e.to_string()),
                elapsed: Duration::ZERO,
            };
        }
    };

    let started = Instant::now();
    let result = synchronous_compile_list(store, identifier, list);
    let elapsed = started.elapsed();

    output.compile_result(&name, result.as_ref(), elapsed);

    let status = match result {
        Ok(list) => FileStatus::Compiled(list),
        Err(e) => FileStatus::Rejected(e),
    };

    FileOutcome {
        path: path.to_string(),
        name,
        status,
        elapsed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{CompletionHandler, ContentRuleListStore};
    use crate::output::OutputMode;
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture() -> (Output, Arc<Mutex<Vec<u8>>>) {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let output = Output::with_writer(OutputMode::Human, Box::new(SharedBuffer(buffer.clone())));
        (output, buffer)
    }

    /// Store that drops every request without answering.
    struct SilentStore;

    impl RuleListStore for SilentStore {
        fn compile_content_rule_list(&self, _: &str, _: String, completion: CompletionHandler) {
            drop(completion);
        }
    }

    /// Store that answers synchronously on the caller's thread.
    struct InlineStore;

    impl RuleListStore for InlineStore {
        fn compile_content_rule_list(&self, identifier: &str, list: String, completion: CompletionHandler) {
            completion(crate::engine::compile_rule_list(
                identifier,
                &list,
                &Default::default(),
            ));
        }
    }

    const VALID: &str = r#"[{"trigger": {"url-filter": "ads"}, "action": {"type": "block"}}]"#;

    #[test]
    fn test_bridge_waits_for_threaded_store() {
        let store = ContentRuleListStore::default();
        let list = synchronous_compile_list(&store, "list", VALID.to_string()).unwrap();
        assert_eq!(list.identifier(), "list");
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_bridge_handles_inline_completion() {
        let list = synchronous_compile_list(&InlineStore, "inline", VALID.to_string()).unwrap();
        assert_eq!(list.identifier(), "inline");
    }

    #[test]
    fn test_bridge_reports_dropped_request() {
        let err = synchronous_compile_list(&SilentStore, "list", VALID.to_string()).unwrap_err();
        assert_eq!(err, CompileError::EngineUnavailable);
    }

    #[test]
    fn test_compile_and_report_success() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("good.json");
        fs::write(&path, VALID).unwrap();
        let (output, buffer) = capture();

        let outcome = compile_and_report(
            path.to_str().unwrap(),
            "list",
            &ContentRuleListStore::default(),
            &output,
        );

        assert!(outcome.compiled());
        assert_eq!(outcome.name, "good.json");
        let printed = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        assert!(printed.starts_with("good.json... ✓ ("));
        assert_eq!(printed.lines().count(), 1);
    }

    #[test]
    fn test_compile_and_report_rejection() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "[]").unwrap();
        let (output, buffer) = capture();

        let outcome = compile_and_report(
            path.to_str().unwrap(),
            "list",
            &ContentRuleListStore::default(),
            &output,
        );

        assert!(outcome.rejected());
        let printed = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        assert!(printed.starts_with("bad.json... 𐄂 ("));
    }

    #[test]
    fn test_compile_and_report_unreadable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.json");
        let (output, buffer) = capture();

        let outcome = compile_and_report(
            path.to_str().unwrap(),
            "list",
            &ContentRuleListStore::default(),
            &output,
        );

        assert!(outcome.unreadable());
        assert_eq!(outcome.elapsed, Duration::ZERO);
        let printed = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        assert_eq!(
            printed,
            format!("Failed to load \"{}\" to compile\n", path.display())
        );
    }
}
