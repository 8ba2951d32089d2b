//! Batch validation of rule list files.
//!
//! Every path is submitted up front to a single [`SerialQueue`], so files are
//! loaded, compiled and reported one at a time in argument order. Outcomes
//! come back over a channel; the batch result is computed from them once
//! the queue has drained.

use anyhow::Result;
use std::process::ExitCode;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use crate::compile::{compile_and_report, FileOutcome, FileStatus};
use crate::config::RunConfig;
use crate::engine::{CompileError, RuleListStore};
use crate::output::Output;
use crate::queue::SerialQueue;

/// Outcomes of a batch, in argument order.
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub outcomes: Vec<FileOutcome>,
    pub unreadable_is_failure: bool,
}

impl BatchSummary {
    pub fn compiled(&self) -> usize {
        self.outcomes.iter().filter(|o| o.compiled()).count()
    }

    pub fn rejected(&self) -> usize {
        self.outcomes.iter().filter(|o| o.rejected()).count()
    }

    pub fn unreadable(&self) -> usize {
        self.outcomes.iter().filter(|o| o.unreadable()).count()
    }

    /// True when any file failed to compile, or could not be read and
    /// unreadable files count as failures.
    pub fn any_failed(&self) -> bool {
        self.rejected() > 0 || (self.unreadable_is_failure && self.unreadable() > 0)
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.any_failed() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        }
    }
}

/// Compile every path in `paths` and report each result through `output`.
pub fn run_batch(
    paths: &[String],
    config: &RunConfig,
    store: Arc<dyn RuleListStore>,
    output: &Output,
) -> Result<BatchSummary> {
    let queue = SerialQueue::new("compile")?;
    let (tx, rx) = mpsc::channel::<(usize, FileOutcome)>();

    for (index, path) in paths.iter().enumerate() {
        let tx = tx.clone();
        let path = path.clone();
        let identifier = config.identifier.clone();
        let store = store.clone();
        let output = output.clone();

        queue.dispatch(move || {
            let outcome = compile_and_report(&path, &identifier, store.as_ref(), &output);
            let _ = tx.send((index, outcome));
        })?;
    }
    drop(tx);

    let panicked = queue.drain()?;
    if panicked > 0 {
        output.warn(&format!("{} compile job(s) did not finish", panicked));
    }

    let mut slots: Vec<Option<FileOutcome>> = vec![None; paths.len()];
    for (index, outcome) in rx {
        slots[index] = Some(outcome);
    }

    // A job that died before reporting still counts as a failed compile.
    let outcomes = slots
        .into_iter()
        .zip(paths)
        .map(|(slot, path)| {
            slot.unwrap_or_else(|| FileOutcome {
                path: path.clone(),
                name: crate::paths::display_name(&crate::paths::expand_tilde(path)),
                status: FileStatus::Rejected(CompileError::EngineUnavailable),
                elapsed: Duration::ZERO,
            })
        })
        .collect();

    Ok(BatchSummary {
        outcomes,
        unreadable_is_failure: config.unreadable_is_failure,
    })
}
