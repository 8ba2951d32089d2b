//! JSON rule list → typed rules.

use serde_json::{Map, Value};

use super::error::CompileError;
use super::rule::{Action, Condition, LoadContext, LoadType, ResourceType, Rule, Trigger};
use super::url_filter::{self, ParsedPattern};

/// Parse the text of a rule list into its top-level JSON array.
pub fn parse_rule_array(text: &str, max_rules: usize) -> Result<Vec<Value>, CompileError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| CompileError::JsonInvalid(e.to_string()))?;

    let Value::Array(rules) = value else {
        return Err(CompileError::TopLevelNotArray);
    };

    if rules.is_empty() {
        return Err(CompileError::NoRules);
    }
    if rules.len() > max_rules {
        return Err(CompileError::TooManyRules {
            count: rules.len(),
            limit: max_rules,
        });
    }

    Ok(rules)
}

/// Parse and validate one element of the top-level array, returning the
/// rule with its translated `url-filter`.
pub fn parse_rule(index: usize, value: &Value) -> Result<(Rule, ParsedPattern), CompileError> {
    let object = value
        .as_object()
        .ok_or(CompileError::InvalidObjectInTopLevelArray { index })?;

    let (trigger, pattern) = match object.get("trigger") {
        Some(Value::Object(trigger)) => parse_trigger(index, trigger)?,
        Some(_) => return Err(CompileError::InvalidTrigger { index }),
        None => return Err(CompileError::InvalidRule { index }),
    };

    let action = match object.get("action") {
        Some(Value::Object(action)) => parse_action(index, action)?,
        Some(_) => return Err(CompileError::InvalidAction { index }),
        None => return Err(CompileError::InvalidRule { index }),
    };

    Ok((Rule { trigger, action }, pattern))
}

fn parse_trigger(
    index: usize,
    trigger: &Map<String, Value>,
) -> Result<(Trigger, ParsedPattern), CompileError> {
    let url_filter = match trigger.get("url-filter") {
        Some(Value::String(filter)) if !filter.is_empty() => filter.clone(),
        _ => return Err(CompileError::InvalidUrlFilter { index }),
    };
    let pattern = check_pattern(index, &url_filter)?;

    let url_filter_is_case_sensitive = match trigger.get("url-filter-is-case-sensitive") {
        None => false,
        Some(Value::Bool(flag)) => *flag,
        Some(_) => return Err(CompileError::InvalidTrigger { index }),
    };

    let resource_types = parse_flags(index, trigger, "resource-type", ResourceType::parse)?;
    let load_types = parse_flags(index, trigger, "load-type", LoadType::parse)?;
    let load_contexts = parse_flags(index, trigger, "load-context", LoadContext::parse)?;
    let condition = parse_condition(index, trigger)?;

    let trigger = Trigger {
        url_filter,
        url_filter_is_case_sensitive,
        resource_types,
        load_types,
        load_contexts,
        condition,
    };
    Ok((trigger, pattern))
}

fn check_pattern(index: usize, pattern: &str) -> Result<ParsedPattern, CompileError> {
    url_filter::parse(pattern).map_err(|reason| CompileError::UnsupportedUrlFilter {
            index,
            pattern: pattern.to_string(),
            reason,
        })
}

fn parse_flags<T>(
    index: usize,
    trigger: &Map<String, Value>,
    key: &'static str,
    parse: fn(&str) -> Option<T>,
) -> Result<Vec<T>, CompileError> {
    let Some(value) = trigger.get(key) else {
        return Ok(Vec::new());
    };
    let Value::Array(items) = value else {
        return Err(CompileError::InvalidTriggerFlagsArray { index, key });
    };

    items
        .iter()
        .map(|item| {
            let text = item
                .as_str()
                .ok_or(CompileError::InvalidTriggerFlagsArray { index, key })?;
            parse(text).ok_or_else(|| CompileError::InvalidStringInTriggerFlagsArray {
                index,
                key,
                value: text.to_string(),
            })
        })
        .collect()
}

fn parse_condition(
    index: usize,
    trigger: &Map<String, Value>,
) -> Result<Option<Condition>, CompileError> {
    let present: Vec<&'static str> = Condition::KEYS
        .iter()
        .copied()
        .filter(|key| trigger.contains_key(*key))
        .collect();

    let key = match present.as_slice() {
        [] => return Ok(None),
        [key] => *key,
        _ => return Err(CompileError::MultipleConditions { index }),
    };

    let values = match trigger.get(key) {
        Some(Value::Array(items)) if !items.is_empty() => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or(CompileError::InvalidConditionList { index, key })
            })
            .collect::<Result<Vec<_>, _>>()?,
        _ => return Err(CompileError::InvalidConditionList { index, key }),
    };

    let condition = match key {
        "if-domain" | "unless-domain" => {
            for domain in &values {
                check_domain(index, domain)?;
            }
            if key == "if-domain" {
                Condition::IfDomain(values)
            } else {
                Condition::UnlessDomain(values)
            }
        }
        _ => {
            for pattern in &values {
                check_pattern(index, pattern)?;
            }
            if key == "if-top-url" {
                Condition::IfTopUrl(values)
            } else {
                Condition::UnlessTopUrl(values)
            }
        }
    };

    Ok(Some(condition))
}

fn check_domain(index: usize, domain: &str) -> Result<(), CompileError> {
    let host = domain.strip_prefix('*').unwrap_or(domain);
    let valid = !host.is_empty()
        && host.is_ascii()
        && !host.bytes().any(|b| b.is_ascii_uppercase() || b.is_ascii_whitespace());
    if valid {
        Ok(())
    } else {
        Err(CompileError::DomainNotLowerCaseAscii {
            index,
            domain: domain.to_string(),
        })
    }
}

fn parse_action(index: usize, action: &Map<String, Value>) -> Result<Action, CompileError> {
    let action_type = match action.get("type") {
        Some(Value::String(action_type)) => action_type.as_str(),
        _ => return Err(CompileError::InvalidAction { index }),
    };

    match action_type {
        "block" => Ok(Action::Block),
        "block-cookies" => Ok(Action::BlockCookies),
        "ignore-previous-rules" => Ok(Action::IgnorePreviousRules),
        "make-https" => Ok(Action::MakeHttps),
        "css-display-none" => match action.get("selector") {
            Some(Value::String(selector)) if is_plausible_selector(selector) => {
                Ok(Action::CssDisplayNone {
                    selector: selector.clone(),
                })
            }
            _ => Err(CompileError::InvalidCssDisplayNoneActionType { index }),
        },
        other => Err(CompileError::InvalidActionType {
            index,
            action_type: other.to_string(),
        }),
    }
}

/// Structural selector check: non-empty, balanced brackets, parentheses and
/// quotes, no stray closing delimiters and no trailing combinator or comma.
fn is_plausible_selector(selector: &str) -> bool {
    let trimmed = selector.trim();
    if trimmed.is_empty() || trimmed.ends_with([',', '>', '+', '~']) {
        return false;
    }

    let mut stack = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in trimmed.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        if c == '\\' {
            escaped = true;
            continue;
        }
        if let Some(open) = quote {
            if c == open {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '[' | '(' => stack.push(c),
            ']' => {
                if stack.pop() != Some('[') {
                    return false;
                }
            }
            ')' => {
                if stack.pop() != Some('(') {
                    return false;
                }
            }
            '{' | '}' => return false,
            _ => {}
        }
    }

    quote.is_none() && stack.is_empty() && !escaped
}
