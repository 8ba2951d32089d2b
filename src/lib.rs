//! # does-it-compile - content blocker rule list validation
//!
//! Compiles content-blocker rule lists (JSON arrays of trigger/action rules)
//! and reports, per file, whether the list compiled and how long it took.
//!
//! ## Overview
//!
//! Files are validated one at a time on a serial worker queue. Each file is
//! read, handed to a [`RuleListStore`](engine::RuleListStore) through its
//! callback API, and the result is reported as soon as the callback fires.
//! The batch fails if any list was rejected.
//!
//! ## Modules
//!
//! - [`engine`] - Rule parsing, url-filter checking and compiled rule lists
//! - [`compile`] - Blocking bridge over the store and per-file reporting
//! - [`queue`] - Serial worker queue
//! - [`batch`] - Batch driver and exit status
//! - [`convert`] - AdBlock Plus filter list to rule list conversion
//! - [`output`] - Human, JSON and quiet console output
//! - [`config`] - Run configuration and defaults
//!
//! ## Example
//!
//! ```no_run
//! use does_it_compile::compile::synchronous_compile_list;
//! use does_it_compile::engine::ContentRuleListStore;
//!
//! let store = ContentRuleListStore::default();
//! let list = r#"[{"trigger": {"url-filter": "ads"}, "action": {"type": "block"}}]"#;
//!
//! match synchronous_compile_list(&store, "list", list.to_string()) {
//!     Ok(compiled) => println!("{} rules", compiled.len()),
//!     Err(e) => eprintln!("rejected: {}", e),
//! }
//! ```

pub mod batch;
pub mod compile;
pub mod config;
pub mod convert;
pub mod engine;
pub mod output;
pub mod paths;
pub mod queue;
