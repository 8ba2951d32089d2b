//! Errors reported by the content rule list compiler.

use std::fmt;

use super::url_filter::UrlFilterError;

/// Why a rule list failed to compile.
///
/// Rule-level variants carry the zero-based index of the offending rule in
/// the top-level array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    JsonInvalid(String),
    TopLevelNotArray,
    NoRules,
    TooManyRules {
        count: usize,
        limit: usize,
    },
    InvalidObjectInTopLevelArray {
        index: usize,
    },
    InvalidRule {
        index: usize,
    },
    InvalidTrigger {
        index: usize,
    },
    InvalidUrlFilter {
        index: usize,
    },
    UnsupportedUrlFilter {
        index: usize,
        pattern: String,
        reason: UrlFilterError,
    },
    InvalidTriggerFlagsArray {
        index: usize,
        key: &'static str,
    },
    InvalidStringInTriggerFlagsArray {
        index: usize,
        key: &'static str,
        value: String,
    },
    InvalidConditionList {
        index: usize,
        key: &'static str,
    },
    DomainNotLowerCaseAscii {
        index: usize,
        domain: String,
    },
    MultipleConditions {
        index: usize,
    },
    InvalidAction {
        index: usize,
    },
    InvalidActionType {
        index: usize,
        action_type: String,
    },
    InvalidCssDisplayNoneActionType {
        index: usize,
    },
    InvalidRegex {
        index: usize,
        pattern: String,
        message: String,
    },
    /// The store dropped the request without ever answering it.
    EngineUnavailable,
}

impl CompileError {
    /// Index of the rule that caused the error, if the error is rule-specific.
    pub fn rule_index(&self) -> Option<usize> {
        match self {
            CompileError::JsonInvalid(_)
            | CompileError::TopLevelNotArray
            | CompileError::NoRules
            | CompileError::TooManyRules { .. }
            | CompileError::EngineUnavailable => None,
            CompileError::InvalidObjectInTopLevelArray { index }
            | CompileError::InvalidRule { index }
            | CompileError::InvalidTrigger { index }
            | CompileError::InvalidUrlFilter { index }
            | CompileError::UnsupportedUrlFilter { index, .. }
            | CompileError::InvalidTriggerFlagsArray { index, .. }
            | CompileError::InvalidStringInTriggerFlagsArray { index, .. }
            | CompileError::InvalidConditionList { index, .. }
            | CompileError::DomainNotLowerCaseAscii { index, .. }
            | CompileError::MultipleConditions { index }
            | CompileError::InvalidAction { index }
            | CompileError::InvalidActionType { index, .. }
            | CompileError::InvalidCssDisplayNoneActionType { index }
            | CompileError::InvalidRegex { index, .. } => Some(*index),
        }
    }

    fn describe(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::JsonInvalid(detail) => {
                write!(f, "Failed to parse the JSON String: {}", detail)
            }
            CompileError::TopLevelNotArray => {
                write!(f, "Invalid input, the top level structure is not an array.")
            }
            CompileError::NoRules => write!(f, "Empty extension."),
            CompileError::TooManyRules { count, limit } => write!(
                f,
                "Too many rules in JSON array ({} rules, limit is {}).",
                count, limit
            ),
            CompileError::InvalidObjectInTopLevelArray { .. } => {
                write!(f, "Invalid object in the top level array.")
            }
            CompileError::InvalidRule { .. } => write!(f, "Invalid rule."),
            CompileError::InvalidTrigger { .. } => write!(f, "Invalid trigger object."),
            CompileError::InvalidUrlFilter { .. } => write!(f, "Invalid url-filter object."),
            CompileError::UnsupportedUrlFilter {
                pattern, reason, ..
            } => write!(f, "Unsupported url-filter \"{}\": {}", pattern, reason),
            CompileError::InvalidTriggerFlagsArray { key, .. } => {
                write!(f, "Invalid trigger flags array for \"{}\".", key)
            }
            CompileError::InvalidStringInTriggerFlagsArray { key, value, .. } => write!(
                f,
                "Invalid string \"{}\" in the trigger flags array for \"{}\".",
                value, key
            ),
            CompileError::InvalidConditionList { key, .. } => {
                write!(f, "Invalid list for \"{}\".", key)
            }
            CompileError::DomainNotLowerCaseAscii { domain, .. } => write!(
                f,
                "Domain \"{}\" must be lower case ASCII. Use punycode to encode non-ASCII characters.",
                domain
            ),
            CompileError::MultipleConditions { .. } => write!(
                f,
                "A trigger cannot have more than one condition (if-domain, unless-domain, if-top-url, or unless-top-url)."
            ),
            CompileError::InvalidAction { .. } => write!(f, "Invalid action object."),
            CompileError::InvalidActionType { action_type, .. } => {
                write!(f, "Invalid action type \"{}\".", action_type)
            }
            CompileError::InvalidCssDisplayNoneActionType { .. } => write!(
                f,
                "Invalid css-display-none action type. Requires a selector."
            ),
            CompileError::InvalidRegex {
                pattern, message, ..
            } => write!(
                f,
                "Invalid or unsupported regular expression \"{}\": {}",
                pattern, message
            ),
            CompileError::EngineUnavailable => {
                write!(f, "The rule list store never reported a result.")
            }
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(index) = self.rule_index() {
            write!(f, "Rule {}: ", index)?;
        }
        self.describe(f)
    }
}

impl std::error::Error for CompileError {}
