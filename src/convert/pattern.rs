//! AdBlock pattern → `url-filter` translation.

use regex::Regex;
use std::sync::LazyLock;

/// Prefix substituted for `||`: any scheme, then the domain or a subdomain.
pub const HOST_PREFIX: &str = r"^[^:]+:(//)?([^/]+\.)?";

/// Rewrites applied in order to the body of a pattern.
static CLEANERS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        // collapse runs of wildcards
        (r"\*+", "*"),
        // separator followed by an end anchor
        (r"\^\|$", "^"),
        // escape regex metacharacters
        (r"([.*+?^${}()|\[\]\\])", r"\${1}"),
        (r"\\\*", ".*"),
        (r"^\\\|", "^"),
        (r"\\\|$", "$$"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| (Regex::new(pattern).expect("valid cleaner"), replacement))
    .collect()
});

/// Translate an AdBlock URL pattern into a `url-filter`.
///
/// Returns `None` for empty patterns, raw `/regex/` patterns and patterns
/// whose translation is empty or not ASCII.
pub fn url_filter_from_pattern(source: &str) -> Option<String> {
    if source.is_empty() || is_regex_pattern(source) {
        return None;
    }

    let (body, requires_scheme, anchored) = if let Some(rest) = source.strip_prefix("||") {
        (rest, true, false)
    } else if let Some(rest) = source.strip_prefix('|') {
        (rest, false, true)
    } else {
        (source, false, false)
    };
    let body = body.strip_suffix('^').unwrap_or(body);

    let mut filter = clean(body);
    if requires_scheme && !filter.starts_with("://") {
        filter.insert_str(0, HOST_PREFIX);
    }
    if anchored {
        filter.insert(0, '^');
    }

    if filter.is_empty() || !filter.is_ascii() {
        return None;
    }
    Some(filter)
}

fn is_regex_pattern(source: &str) -> bool {
    source.len() >= 2 && source.starts_with('/') && source.ends_with('/')
}

fn clean(body: &str) -> String {
    CLEANERS
        .iter()
        .fold(body.to_string(), |text, (pattern, replacement)| {
            pattern.replace_all(&text, *replacement).into_owned()
        })
}

/// ASCII form of a domain, punycode-encoding internationalized labels.
pub fn punycode(domain: &str) -> Option<String> {
    if domain.is_ascii() {
        return Some(domain.to_string());
    }
    match url::Host::parse(domain) {
        Ok(url::Host::Domain(ascii)) => Some(ascii),
        _ => None,
    }
}
