//! Run configuration for a validation batch.
//!
//! There are no configuration files: every setting has a default here and
//! can be overridden from the command line.

use crate::engine::compiled::{DEFAULT_MAX_RULES, DEFAULT_REGEX_SIZE_LIMIT};
use crate::engine::CompilerOptions;
use crate::output::OutputMode;

/// Macro to generate default value functions
macro_rules! default_fn {
    ($name:ident, $type:ty, $value:expr) => {
        pub(crate) fn $name() -> $type {
            $value
        }
    };
}

default_fn!(default_identifier, String, "list".to_string());
default_fn!(default_max_rules, usize, DEFAULT_MAX_RULES);
default_fn!(default_regex_size_limit, usize, DEFAULT_REGEX_SIZE_LIMIT);
default_fn!(default_unreadable_is_failure, bool, true);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Identifier every list is compiled under.
    pub identifier: String,
    /// Whether a file that cannot be read makes the batch fail.
    pub unreadable_is_failure: bool,
    pub mode: OutputMode,
    /// Print compiler error messages under failed result lines.
    pub verbose: bool,
    pub compiler: CompilerOptions,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            identifier: default_identifier(),
            unreadable_is_failure: default_unreadable_is_failure(),
            mode: OutputMode::Human,
            verbose: false,
            compiler: CompilerOptions {
                max_rules: default_max_rules(),
                regex_size_limit: default_regex_size_limit(),
            },
        }
    }
}

impl RunConfig {
    /// Reject settings that would make every compile fail.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.identifier.trim().is_empty() {
            anyhow::bail!("identifier must not be empty");
        }
        if self.compiler.max_rules == 0 {
            anyhow::bail!("max-rules must be at least 1");
        }
        Ok(())
    }
}
