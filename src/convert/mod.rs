//! AdBlock Plus filter list → content blocker rule list.
//!
//! Each filter line becomes zero, one or two [`Rule`]s. Lines the content
//! blocker format cannot express are skipped with a [`SkipReason`]. The
//! written list puts blocking rules before exceptions so that
//! `ignore-previous-rules` applies to every block.

pub mod filter;
pub mod pattern;

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::{BufRead, Write};

use crate::engine::{Action, Rule};

pub use filter::{convert_filter, ContentType, SkipReason, DEFAULT_THIRD_PARTY_FILTERS};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Drop element hiding filters.
    pub no_css: bool,
}

/// Rules and bookkeeping from converting one or more filter lists.
#[derive(Debug, Clone, Default)]
pub struct ConversionResult {
    pub rules: Vec<Rule>,
    /// Filter lines that produced rules, as they should be re-published.
    pub accepted_lines: Vec<String>,
    /// Filter lines that produced nothing, with the reason.
    pub skipped: Vec<(String, SkipReason)>,
}

impl ConversionResult {
    pub fn extend(&mut self, other: ConversionResult) {
        self.rules.extend(other.rules);
        self.accepted_lines.extend(other.accepted_lines);
        self.skipped.extend(other.skipped);
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn exception_count(&self) -> usize {
        self.rules
            .iter()
            .filter(|rule| rule.action == Action::IgnorePreviousRules)
            .count()
    }

    pub fn block_count(&self) -> usize {
        self.rules.len() - self.exception_count()
    }

    /// Rules in output order: everything else first, then exceptions.
    pub fn ordered_rules(&self) -> Vec<&Rule> {
        let (exceptions, blocks): (Vec<&Rule>, Vec<&Rule>) = self
            .rules
            .iter()
            .partition(|rule| rule.action == Action::IgnorePreviousRules);
        blocks.into_iter().chain(exceptions).collect()
    }
}

/// Convert filter lines. Blank lines, `[Adblock ...]` headers and `!`
/// comments are ignored.
pub fn convert_lines<I, S>(lines: I, options: &ConvertOptions) -> ConversionResult
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut result = ConversionResult::default();

    for line in lines {
        let line = line.as_ref().trim();
        if line.is_empty() || line.starts_with('[') || line.starts_with('!') {
            continue;
        }

        match convert_filter(line, options) {
            Ok(rules) => {
                result.rules.extend(rules);
                result.accepted_lines.push(accepted_line(line));
            }
            Err(reason) => result.skipped.push((line.to_string(), reason)),
        }
    }

    result
}

/// Convert every line from `reader`.
pub fn convert_reader<R: BufRead>(reader: R, options: &ConvertOptions) -> Result<ConversionResult> {
    let lines = reader
        .lines()
        .collect::<std::io::Result<Vec<String>>>()
        .context("Failed to read filter list")?;
    Ok(convert_lines(lines, options))
}

/// Filters that default to third-party are published with the option
/// spelled out.
fn accepted_line(line: &str) -> String {
    if !DEFAULT_THIRD_PARTY_FILTERS.contains(&line) {
        line.to_string()
    } else if line.contains('$') {
        format!("{},third-party", line)
    } else {
        format!("{}$third-party", line)
    }
}

/// Serialize `rules` as a JSON array, indented by four spaces or compact.
pub fn write_rules<W: Write>(writer: W, rules: &[&Rule], strip_whitespace: bool) -> Result<()> {
    if strip_whitespace {
        serde_json::to_writer(writer, rules).context("Failed to write rules")
    } else {
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(writer, formatter);
        rules
            .serialize(&mut serializer)
            .context("Failed to write rules")
    }
}

/// Write accepted filter lines, one per line.
pub fn write_accepted_lines<W: Write>(mut writer: W, lines: &[String]) -> Result<()> {
    for line in lines {
        writeln!(writer, "{}", line).context("Failed to write filter lines")?;
    }
    Ok(())
}
