//! Content rule list compiler.
//!
//! A rule list is a JSON array of rules, each with a `trigger` (which URLs
//! and loads the rule applies to) and an `action` (what to do with them).
//! Compiling a list validates every rule, checks each `url-filter` against
//! the supported regular-expression subset and builds matchers for it.
//!
//! Compilation is exposed through [`RuleListStore`], whose contract is
//! asynchronous: a request returns immediately and the outcome arrives
//! later through a completion handler. [`crate::compile`] turns that back
//! into a blocking call.

pub mod compiled;
pub mod error;
pub mod parser;
pub mod rule;
pub mod store;
pub mod url_filter;

pub use compiled::{compile_rule_list, CompiledRuleList, CompilerOptions, RuleListStats};
pub use error::CompileError;
pub use rule::{Action, Condition, LoadContext, LoadType, ResourceType, Rule, Trigger};
pub use store::{CompletionHandler, ContentRuleListStore, RuleListStore};
pub use url_filter::UrlFilterError;
