//! Console output for compile results.
//!
//! Three modes:
//! - Human: one `<name>... ✓ (0.01s)` line per file, glyphs colored on a TTY
//! - Json: one JSON object per event
//! - Quiet: failed files and errors only
//!
//! An [`Output`] can be cloned freely; clones share one writer, so lines
//! from the compile worker and the main thread never interleave mid-line.

use colored::{Color, Colorize};
use serde_json::json;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::engine::{CompileError, CompiledRuleList};

/// Glyph printed after a list that compiled.
pub const SUCCESS_GLYPH: &str = "✓";
/// Glyph printed after a list that failed to compile.
pub const FAILURE_GLYPH: &str = "𐄂";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
    Quiet,
}

#[derive(Clone)]
pub struct Output {
    mode: OutputMode,
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
    is_tty: bool,
    verbose: bool,
}

/// Message printed for a file that could not be read.
pub fn format_load_failure(path: &str) -> String {
    format!("Failed to load \"{}\" to compile", path)
}

impl Output {
    /// Output on stdout.
    pub fn new(mode: OutputMode) -> Self {
        Self::build(mode, Box::new(io::stdout()), atty::is(atty::Stream::Stdout))
    }

    /// Output on stderr, for tools whose stdout carries data.
    pub fn stderr(mode: OutputMode) -> Self {
        Self::build(mode, Box::new(io::stderr()), atty::is(atty::Stream::Stderr))
    }

    /// Output into any writer, never colored.
    pub fn with_writer(mode: OutputMode, writer: Box<dyn Write + Send>) -> Self {
        Self::build(mode, writer, false)
    }

    fn build(mode: OutputMode, writer: Box<dyn Write + Send>, is_tty: bool) -> Self {
        Self {
            mode,
            writer: Arc::new(Mutex::new(writer)),
            is_tty,
            verbose: false,
        }
    }

    /// Also print the compiler's error message under failed result lines.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Report the outcome of compiling one file.
    pub fn compile_result(
        &self,
        name: &str,
        result: Result<&CompiledRuleList, &CompileError>,
        elapsed: Duration,
    ) {
        if self.mode == OutputMode::Json {
            let mut event = json!({
                "event": "compile",
                "file": name,
                "success": result.is_ok(),
                "elapsed_secs": elapsed.as_secs_f64(),
            });
            match result {
                Ok(list) => {
                    event["rules"] = json!(list.len());
                    event["stats"] = json!(list.stats());
                }
                Err(error) => {
                    event["error"] = json!(error.to_string());
                    if let Some(index) = error.rule_index() {
                        event["rule_index"] = json!(index);
                    }
                }
            }
            self.emit_json(&event);
            return;
        }

        let glyph = match result {
            Ok(_) if self.mode == OutputMode::Quiet => return,
            Ok(_) => self.paint(SUCCESS_GLYPH, Color::Green),
            Err(_) => self.paint(FAILURE_GLYPH, Color::Red),
        };
        self.write_line(&format!(
            "{}... {} ({:.2}s)",
            name,
            glyph,
            elapsed.as_secs_f64()
        ));

        if let (true, Err(error)) = (self.verbose, result) {
            self.detail(&error.to_string());
        }
    }

    /// Report a file that could not be read. Shown in every mode.
    pub fn load_failure(&self, path: &str, error: &io::Error) {
        if self.mode == OutputMode::Json {
            self.emit_json(&json!({
                "event": "load_failed",
                "file": path,
                "error": error.to_string(),
            }));
            return;
        }
        self.write_line(&format_load_failure(path));
        if self.verbose {
            self.detail(&error.to_string());
        }
    }

    /// A problem that does not stop the run. Hidden in quiet mode.
    pub fn warn(&self, msg: &str) {
        match self.mode {
            OutputMode::Human => self.write_marked("⚠", Color::Yellow, msg),
            OutputMode::Json => self.emit_message("warning", msg),
            OutputMode::Quiet => {}
        }
    }

    /// Shown in every mode.
    pub fn error(&self, msg: &str) {
        match self.mode {
            OutputMode::Human | OutputMode::Quiet => self.write_marked("✗", Color::Red, msg),
            OutputMode::Json => self.emit_message("error", msg),
        }
    }

    /// Progress text. Hidden in quiet mode.
    pub fn info(&self, msg: &str) {
        match self.mode {
            OutputMode::Human => self.write_line(msg),
            OutputMode::Json => self.emit_message("info", msg),
            OutputMode::Quiet => {}
        }
    }

    /// Indented text belonging to the previous line.
    pub fn detail(&self, msg: &str) {
        match self.mode {
            OutputMode::Human | OutputMode::Quiet => self.write_line(&format!("  {}", msg)),
            OutputMode::Json => self.emit_message("detail", msg),
        }
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.is_tty {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn write_marked(&self, mark: &str, color: Color, msg: &str) {
        self.write_line(&format!("{} {}", self.paint(mark, color), msg));
    }

    fn emit_message(&self, level: &str, msg: &str) {
        self.emit_json(&json!({ "level": level, "msg": msg }));
    }

    fn emit_json(&self, value: &serde_json::Value) {
        self.write_line(&value.to_string());
    }

    fn write_line(&self, line: &str) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", line);
        }
    }
}
