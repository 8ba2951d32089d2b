//! Callback-based rule list store.

use std::thread;

use colored::Colorize;

use super::compiled::{compile_rule_list, CompiledRuleList, CompilerOptions};
use super::error::CompileError;

/// Called exactly once with the outcome of a compile request.
pub type CompletionHandler =
    Box<dyn FnOnce(Result<CompiledRuleList, CompileError>) + Send + 'static>;

/// Something that compiles rule lists asynchronously.
///
/// Implementations return immediately and report the outcome later by
/// calling `completion` from a thread they own. Dropping `completion`
/// without calling it is how a store signals that it could not take the
/// request at all.
pub trait RuleListStore: Send + Sync {
    fn compile_content_rule_list(
        &self,
        identifier: &str,
        encoded_content_rule_list: String,
        completion: CompletionHandler,
    );
}

/// The built-in store: every request is compiled on its own thread.
#[derive(Debug, Clone, Default)]
pub struct ContentRuleListStore {
    options: CompilerOptions,
}

impl ContentRuleListStore {
    pub fn new(options: CompilerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }
}

impl RuleListStore for ContentRuleListStore {
    fn compile_content_rule_list(
        &self,
        identifier: &str,
        encoded_content_rule_list: String,
        completion: CompletionHandler,
    ) {
        let options = self.options.clone();
        let identifier = identifier.to_string();
        let thread_name = format!("compile-{}", identifier);

        let spawned = thread::Builder::new().name(thread_name).spawn(move || {
            let result = compile_rule_list(&identifier, &encoded_content_rule_list, &options);
            completion(result);
        });

        if let Err(e) = spawned {
            eprintln!(
                "{} Could not start compile thread: {}",
                "Warning:".yellow(),
                e
            );
        }
    }
}
