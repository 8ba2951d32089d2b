//! Compilation of parsed rules into a matchable rule list.

use std::collections::HashMap;

use regex::{Regex, RegexBuilder};
use serde::Serialize;

use super::error::CompileError;
use super::parser;
use super::rule::{Action, Rule};

/// Limits applied while compiling a rule list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOptions {
    /// Maximum number of rules in one list.
    pub max_rules: usize,
    /// Maximum compiled size of any single `url-filter` regex, in bytes.
    pub regex_size_limit: usize,
}

pub const DEFAULT_MAX_RULES: usize = 150_000;
pub const DEFAULT_REGEX_SIZE_LIMIT: usize = 1 << 20;

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            max_rules: DEFAULT_MAX_RULES,
            regex_size_limit: DEFAULT_REGEX_SIZE_LIMIT,
        }
    }
}

/// Per-action rule counts for a compiled list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuleListStats {
    pub total: usize,
    pub block: usize,
    pub block_cookies: usize,
    pub css_display_none: usize,
    pub ignore_previous_rules: usize,
    pub make_https: usize,
    /// Rules whose `url-filter` matches every URL.
    pub universal: usize,
    /// Distinct (pattern, case sensitivity) pairs that were compiled.
    pub distinct_patterns: usize,
}

impl RuleListStats {
    fn record(&mut self, action: &Action) {
        self.total += 1;
        match action {
            Action::Block => self.block += 1,
            Action::BlockCookies => self.block_cookies += 1,
            Action::CssDisplayNone { .. } => self.css_display_none += 1,
            Action::IgnorePreviousRules => self.ignore_previous_rules += 1,
            Action::MakeHttps => self.make_https += 1,
        }
    }
}

/// A successfully compiled rule list.
#[derive(Debug, Clone)]
pub struct CompiledRuleList {
    identifier: String,
    rules: Vec<Rule>,
    /// Index into `patterns` for every rule.
    matchers: Vec<usize>,
    patterns: Vec<Regex>,
    stats: RuleListStats,
}

impl CompiledRuleList {
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn stats(&self) -> &RuleListStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Indices of the rules whose `url-filter` matches `url`, in list order.
    ///
    /// A matching `ignore-previous-rules` rule discards every match collected
    /// before it and is not itself reported.
    pub fn matching_rules(&self, url: &str) -> Vec<usize> {
        let mut matched = Vec::new();
        for (index, rule) in self.rules.iter().enumerate() {
            if !self.patterns[self.matchers[index]].is_match(url) {
                continue;
            }
            if rule.action == Action::IgnorePreviousRules {
                matched.clear();
            } else {
                matched.push(index);
            }
        }
        matched
    }
}

/// Compile the text of a rule list.
pub fn compile_rule_list(
    identifier: &str,
    encoded_content_rule_list: &str,
    options: &CompilerOptions,
) -> Result<CompiledRuleList, CompileError> {
    let values = parser::parse_rule_array(encoded_content_rule_list, options.max_rules)?;

    let mut rules = Vec::with_capacity(values.len());
    let mut matchers = Vec::with_capacity(values.len());
    let mut patterns = Vec::new();
    let mut seen: HashMap<(String, bool), usize> = HashMap::new();
    let mut stats = RuleListStats::default();

    for (index, value) in values.iter().enumerate() {
        let (rule, parsed) = parser::parse_rule(index, value)?;
        let case_sensitive = rule.trigger.url_filter_is_case_sensitive;
        let key = (rule.trigger.url_filter.clone(), case_sensitive);
        if parsed.matches_everything {
            stats.universal += 1;
        }

        let pattern_index = match seen.get(&key) {
            Some(existing) => *existing,
            None => {
                let regex = RegexBuilder::new(&parsed.regex)
                    .case_insensitive(!case_sensitive)
                    .size_limit(options.regex_size_limit)
                    .build()
                    .map_err(|e| CompileError::InvalidRegex {
                        index,
                        pattern: rule.trigger.url_filter.clone(),
                        message: e.to_string(),
                    })?;
                patterns.push(regex);
                seen.insert(key, patterns.len() - 1);
                patterns.len() - 1
            }
        };

        stats.record(&rule.action);
        matchers.push(pattern_index);
        rules.push(rule);
    }

    stats.distinct_patterns = patterns.len();

    Ok(CompiledRuleList {
        identifier: identifier.to_string(),
        rules,
        matchers,
        patterns,
        stats,
    })
}
