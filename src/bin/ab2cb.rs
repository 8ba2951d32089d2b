//! ab2cb: convert AdBlock Plus filter lists into content blocker rule lists.

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::process::ExitCode;

use does_it_compile::compile::synchronous_compile_list;
use does_it_compile::convert::{
    convert_reader, write_accepted_lines, write_rules, ConversionResult, ConvertOptions,
};
use does_it_compile::engine::ContentRuleListStore;
use does_it_compile::output::{Output, OutputMode};
use does_it_compile::paths;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\ncommit: ",
    env!("GIT_SHA"),
    "\nbuilt: ",
    env!("BUILD_DATE")
);

/// Rules were produced.
const EXIT_CONVERTED: u8 = 0;
/// Nothing convertible was found.
const EXIT_NOTHING_CONVERTED: u8 = 1;
const EXIT_ERROR: u8 = 2;

#[derive(Parser)]
#[command(name = "ab2cb")]
#[command(version, long_version = LONG_VERSION)]
#[command(about = "Convert AdBlock Plus filter lists to content blocker rule lists", long_about = None)]
struct Cli {
    /// Filter list files; reads standard input when none are given
    #[arg(value_name = "FILE")]
    files: Vec<String>,

    /// Write the rule list here instead of standard output
    #[arg(long, short, value_name = "PATH")]
    output: Option<String>,

    /// Write the filter lines that were converted to this file
    #[arg(long, value_name = "PATH")]
    output_rules: Option<String>,

    /// Write compact JSON
    #[arg(long, short)]
    strip_whitespace: bool,

    /// Skip element hiding filters
    #[arg(long)]
    no_css: bool,

    /// Do not report files that cannot be opened
    #[arg(long)]
    suppress_file_access_errors: bool,

    /// Compile the generated list and fail if it is rejected
    #[arg(long)]
    check: bool,

    /// Only print errors
    #[arg(long, short)]
    quiet: bool,

    /// List skipped filters and why they were skipped
    #[arg(long, short)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let mode = if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Human
    };
    let output = Output::stderr(mode).verbose(cli.verbose);

    match run(&cli, &output) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red(), e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn run(cli: &Cli, output: &Output) -> Result<u8> {
    let options = ConvertOptions { no_css: cli.no_css };

    let result = if cli.files.is_empty() {
        convert_reader(io::stdin().lock(), &options)?
    } else {
        let mut total = ConversionResult::default();
        for path in &cli.files {
            if let Some(file_result) = convert_file(cli, path, &options, output)? {
                output.info(&format!(
                    "Generated {} rules from {} filters for {}",
                    file_result.rules.len(),
                    file_result.accepted_lines.len(),
                    path
                ));
                total.extend(file_result);
            }
        }
        total
    };

    if cli.verbose {
        for (line, reason) in &result.skipped {
            output.detail(&format!("Skipped {}: {}", line, reason));
        }
    }

    if result.is_empty() {
        return Ok(EXIT_NOTHING_CONVERTED);
    }

    write_output(cli, &result)?;
    output.info(&format!(
        "Generated a total of {} rules ({} blocks, {} exceptions)",
        result.rules.len(),
        result.block_count(),
        result.exception_count()
    ));

    if cli.check && !check_rules(&result, output)? {
        return Ok(EXIT_ERROR);
    }

    Ok(EXIT_CONVERTED)
}

/// Convert one file. Files that cannot be opened are reported and skipped.
fn convert_file(
    cli: &Cli,
    path: &str,
    options: &ConvertOptions,
    output: &Output,
) -> Result<Option<ConversionResult>> {
    let expanded = paths::expand_tilde(path);
    let file = match File::open(&expanded) {
        Ok(file) => file,
        Err(e) => {
            if !cli.suppress_file_access_errors {
                let message = match e.kind() {
                    io::ErrorKind::NotFound => format!("File does not exist: {}", path),
                    _ => format!("File is not readable: {}", path),
                };
                output.error(&message);
            }
            return Ok(None);
        }
    };

    let result = convert_reader(BufReader::new(file), options)
        .with_context(|| format!("Failed to convert {}", path))?;
    Ok(Some(result))
}

fn write_output(cli: &Cli, result: &ConversionResult) -> Result<()> {
    if let Some(path) = &cli.output_rules {
        let file = File::create(paths::expand_tilde(path))
            .with_context(|| format!("Cannot open output file: {}", path))?;
        let mut writer = BufWriter::new(file);
        write_accepted_lines(&mut writer, &result.accepted_lines)?;
        writer.flush().context("Failed to write filter lines")?;
    }

    let rules = result.ordered_rules();
    match &cli.output {
        Some(path) => {
            let file = File::create(paths::expand_tilde(path))
                .with_context(|| format!("Cannot open output file: {}", path))?;
            let mut writer = BufWriter::new(file);
            write_rules(&mut writer, &rules, cli.strip_whitespace)?;
            writer.flush().context("Failed to write rules")?;
        }
        None => {
            let mut stdout = io::stdout().lock();
            write_rules(&mut stdout, &rules, cli.strip_whitespace)?;
            writeln!(stdout).context("Failed to write rules")?;
        }
    }
    Ok(())
}

/// Compile the converted rules and report the result.
fn check_rules(result: &ConversionResult, output: &Output) -> Result<bool> {
    let mut json = Vec::new();
    write_rules(&mut json, &result.ordered_rules(), true)?;
    let list = String::from_utf8(json).context("Rule list is not UTF-8")?;

    let store = ContentRuleListStore::default();
    let started = std::time::Instant::now();
    let compiled = synchronous_compile_list(&store, "ab2cb", list);
    let elapsed = started.elapsed();

    output.compile_result("converted rules", compiled.as_ref(), elapsed);
    Ok(compiled.is_ok())
}
