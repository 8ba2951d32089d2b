//! CLI entry point for does-it-compile.

use clap::Parser;
use colored::Colorize;
use std::process::ExitCode;
use std::sync::Arc;

use does_it_compile::batch::run_batch;
use does_it_compile::config::RunConfig;
use does_it_compile::engine::{CompilerOptions, ContentRuleListStore, RuleListStore};
use does_it_compile::output::{Output, OutputMode};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\ncommit: ",
    env!("GIT_SHA"),
    "\nbuilt: ",
    env!("BUILD_DATE")
);

/// Exit status for invalid arguments, matching clap's own usage errors.
const EXIT_USAGE: u8 = 2;

#[derive(Parser)]
#[command(name = "does-it-compile")]
#[command(version, long_version = LONG_VERSION)]
#[command(about = "Check that content blocker rule lists compile", long_about = None)]
struct Cli {
    /// Rule list files to compile, in order
    #[arg(value_name = "PATH")]
    paths: Vec<String>,

    /// Identifier each list is compiled under
    #[arg(long, value_name = "ID", default_value = "list")]
    identifier: String,

    /// Maximum number of rules a list may contain
    #[arg(long, value_name = "N", default_value_t = does_it_compile::engine::compiled::DEFAULT_MAX_RULES)]
    max_rules: usize,

    /// Do not fail the run when a file cannot be read
    #[arg(long)]
    allow_unreadable: bool,

    /// Emit one JSON object per file
    #[arg(long, conflicts_with = "quiet")]
    json: bool,

    /// Only print failures
    #[arg(long, short)]
    quiet: bool,

    /// Print the compiler error under failed result lines
    #[arg(long, short)]
    verbose: bool,
}

impl Cli {
    fn config(&self) -> RunConfig {
        let mode = if self.json {
            OutputMode::Json
        } else if self.quiet {
            OutputMode::Quiet
        } else {
            OutputMode::Human
        };

        let defaults = RunConfig::default();
        RunConfig {
            identifier: self.identifier.clone(),
            unreadable_is_failure: !self.allow_unreadable,
            mode,
            verbose: self.verbose,
            compiler: CompilerOptions {
                max_rules: self.max_rules,
                ..defaults.compiler
            },
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = cli.config();

    if let Err(e) = config.validate() {
        eprintln!("{} {}", "Error:".red(), e);
        return ExitCode::from(EXIT_USAGE);
    }

    let output = Output::new(config.mode).verbose(config.verbose);
    let store: Arc<dyn RuleListStore> = Arc::new(ContentRuleListStore::new(config.compiler.clone()));

    match run_batch(&cli.paths, &config, store, &output) {
        Ok(summary) => summary.exit_code(),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red(), e);
            ExitCode::FAILURE
        }
    }
}
