//! Parser for the regular-expression subset accepted in `url-filter`.
//!
//! Content blockers only accept a small, ASCII-only subset of JavaScript
//! regular expressions: literals, `.`, character sets, groups and the greedy
//! `*`, `+` and `?` quantifiers, with `^` and `$` allowed only at the edges of
//! the pattern. This module checks a pattern against that subset and rewrites
//! it into the syntax of the `regex` crate so it can be compiled for matching.

use std::fmt;

/// Reasons a `url-filter` pattern is outside the supported subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlFilterError {
    EmptyPattern,
    NonAscii,
    UnsupportedCharacterClass,
    UnterminatedCharacterSet,
    BackReference,
    WordBoundary,
    AtomCharacter,
    UnsupportedGroup,
    UnbalancedGroup,
    Disjunction,
    InvalidQuantifier,
    DanglingQuantifier,
    MisplacedStartOfLine,
    MisplacedEndOfLine,
    TrailingEscape,
}

impl fmt::Display for UrlFilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            UrlFilterError::EmptyPattern => "Empty pattern.",
            UrlFilterError::NonAscii => "Only ASCII characters are supported in pattern.",
            UrlFilterError::UnsupportedCharacterClass => "Character class is not supported.",
            UrlFilterError::UnterminatedCharacterSet => "Unterminated character set.",
            UrlFilterError::BackReference => "Patterns cannot contain backreferences.",
            UrlFilterError::WordBoundary => "Word boundaries assertions are not supported.",
            UrlFilterError::AtomCharacter => "Builtins character class atoms are not supported.",
            UrlFilterError::UnsupportedGroup => {
                "Only capturing and non-capturing groups are supported."
            }
            UrlFilterError::UnbalancedGroup => "Unbalanced parentheses.",
            UrlFilterError::Disjunction => "Disjunctions are not supported.",
            UrlFilterError::InvalidQuantifier => "Arbitrary atom repetitions are not supported.",
            UrlFilterError::DanglingQuantifier => "Quantifier has nothing to repeat.",
            UrlFilterError::MisplacedStartOfLine => {
                "Start of line assertion can only appear as the first term in a filter."
            }
            UrlFilterError::MisplacedEndOfLine => {
                "The end of line assertion must be the last term in an expression."
            }
            UrlFilterError::TrailingEscape => "Pattern ends with an unfinished escape.",
        };
        f.write_str(message)
    }
}

impl std::error::Error for UrlFilterError {}

/// A pattern that passed [`parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPattern {
    /// Equivalent pattern in `regex` crate syntax.
    pub regex: String,
    /// True for patterns such as `.*` that match every URL.
    pub matches_everything: bool,
    pub anchored_start: bool,
    pub anchored_end: bool,
}

/// Check `pattern` against the supported subset.
pub fn parse(pattern: &str) -> Result<ParsedPattern, UrlFilterError> {
    if pattern.is_empty() {
        return Err(UrlFilterError::EmptyPattern);
    }
    if !pattern.is_ascii() {
        return Err(UrlFilterError::NonAscii);
    }

    let bytes = pattern.as_bytes();
    let len = bytes.len();
    let mut out = String::with_capacity(len + 8);
    let mut depth = 0usize;
    let mut can_quantify = false;
    let mut anchored_start = false;
    let mut anchored_end = false;
    let mut i = 0;

    while i < len {
        let c = bytes[i];
        match c {
            b'^' => {
                if i != 0 {
                    return Err(UrlFilterError::MisplacedStartOfLine);
                }
                anchored_start = true;
                can_quantify = false;
                out.push('^');
                i += 1;
            }
            b'$' => {
                if i != len - 1 || depth > 0 {
                    return Err(UrlFilterError::MisplacedEndOfLine);
                }
                anchored_end = true;
                can_quantify = false;
                out.push('$');
                i += 1;
            }
            b'|' => return Err(UrlFilterError::Disjunction),
            b'{' => return Err(UrlFilterError::InvalidQuantifier),
            b'(' => {
                if bytes.get(i + 1) == Some(&b'?') {
                    if bytes.get(i + 2) != Some(&b':') {
                        return Err(UrlFilterError::UnsupportedGroup);
                    }
                    out.push_str("(?:");
                    i += 3;
                } else {
                    out.push('(');
                    i += 1;
                }
                depth += 1;
                can_quantify = false;
            }
            b')' => {
                if depth == 0 {
                    return Err(UrlFilterError::UnbalancedGroup);
                }
                depth -= 1;
                out.push(')');
                can_quantify = true;
                i += 1;
            }
            b'*' | b'+' | b'?' => {
                if !can_quantify {
                    return Err(UrlFilterError::DanglingQuantifier);
                }
                match bytes.get(i + 1) {
                    Some(b'?') => return Err(UrlFilterError::InvalidQuantifier),
                    Some(b'*') | Some(b'+') => return Err(UrlFilterError::DanglingQuantifier),
                    _ => {}
                }
                out.push(c as char);
                can_quantify = false;
                i += 1;
            }
            b'[' => {
                i = parse_character_set(bytes, i, &mut out)?;
                can_quantify = true;
            }
            b'\\' => {
                i = parse_escape(bytes, i, &mut out)?;
                can_quantify = true;
            }
            b'.' => {
                out.push('.');
                can_quantify = true;
                i += 1;
            }
            _ => {
                out.push_str(&regex::escape(&(c as char).to_string()));
                can_quantify = true;
                i += 1;
            }
        }
    }

    if depth > 0 {
        return Err(UrlFilterError::UnbalancedGroup);
    }

    Ok(ParsedPattern {
        regex: out,
        matches_everything: matches_everything(pattern),
        anchored_start,
        anchored_end,
    })
}

/// Parse an escape outside a character set. Returns the index after it.
fn parse_escape(bytes: &[u8], start: usize, out: &mut String) -> Result<usize, UrlFilterError> {
    let Some(&next) = bytes.get(start + 1) else {
        return Err(UrlFilterError::TrailingEscape);
    };
    match next {
        b'1'..=b'9' | b'k' => Err(UrlFilterError::BackReference),
        b'b' | b'B' => Err(UrlFilterError::WordBoundary),
        b'd' | b'D' | b'w' | b'W' | b's' | b'S' => Err(UrlFilterError::AtomCharacter),
        _ => Ok(push_escaped(bytes, start, out)),
    }
}

/// Shared handling of escapes that mean the same thing inside and outside
/// character sets.
fn push_escaped(bytes: &[u8], start: usize, out: &mut String) -> usize {
    let next = bytes[start + 1];
    match next {
        b'n' | b'r' | b't' | b'f' | b'v' => {
            out.push('\\');
            out.push(next as char);
            start + 2
        }
        b'0' => {
            out.push_str("\\x00");
            start + 2
        }
        b'x' if hex_digits(bytes, start + 2, 2) => {
            out.push_str("\\x");
            out.push(bytes[start + 2] as char);
            out.push(bytes[start + 3] as char);
            start + 4
        }
        b'u' if hex_digits(bytes, start + 2, 4) => {
            out.push_str("\\x{");
            for &b in &bytes[start + 2..start + 6] {
                out.push(b as char);
            }
            out.push('}');
            start + 6
        }
        // Identity escape: the character stands for itself.
        _ => {
            out.push_str(&regex::escape(&(next as char).to_string()));
            start + 2
        }
    }
}

fn hex_digits(bytes: &[u8], from: usize, count: usize) -> bool {
    bytes
        .get(from..from + count)
        .is_some_and(|digits| digits.iter().all(u8::is_ascii_hexdigit))
}

/// Parse a `[...]` set starting at `start`. Returns the index after `]`.
fn parse_character_set(
    bytes: &[u8],
    start: usize,
    out: &mut String,
) -> Result<usize, UrlFilterError> {
    let mut i = start + 1;
    out.push('[');
    if bytes.get(i) == Some(&b'^') {
        out.push('^');
        i += 1;
    }
    if bytes.get(i) == Some(&b']') {
        // `[]` and `[^]` are legal JavaScript but never useful in a filter.
        return Err(UrlFilterError::UnsupportedCharacterClass);
    }

    while i < bytes.len() {
        match bytes[i] {
            b']' => {
                out.push(']');
                return Ok(i + 1);
            }
            b'\\' => {
                let Some(&next) = bytes.get(i + 1) else {
                    return Err(UrlFilterError::TrailingEscape);
                };
                if matches!(next, b'd' | b'D' | b'w' | b'W' | b's' | b'S' | b'b' | b'B') {
                    return Err(UrlFilterError::UnsupportedCharacterClass);
                }
                if next.is_ascii_digit() && next != b'0' {
                    return Err(UrlFilterError::BackReference);
                }
                i = push_escaped(bytes, i, out);
            }
            c @ (b'[' | b'&' | b'~') => {
                out.push('\\');
                out.push(c as char);
                i += 1;
            }
            // `--` is a class difference to the regex crate.
            b'-' if out.ends_with('-') && !out.ends_with("\\-") => {
                out.push_str("\\-");
                i += 1;
            }
            c => {
                out.push(c as char);
                i += 1;
            }
        }
    }

    Err(UrlFilterError::UnterminatedCharacterSet)
}

fn matches_everything(pattern: &str) -> bool {
    let rest = pattern.strip_prefix('^').unwrap_or(pattern);
    rest.len() % 2 == 0 && rest.as_bytes().chunks(2).all(|pair| pair == b".*")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_literal() {
        let parsed = parse("ads").unwrap();
        assert_eq!(parsed.regex, "ads");
        assert!(!parsed.matches_everything);
        assert!(!parsed.anchored_start);
    }

    #[test]
    fn test_converter_host_prefix_is_supported() {
        let parsed = parse("^[^:]+:(//)?([^/]+\\.)?doubleclick\\.net").unwrap();
        assert!(parsed.anchored_start);
        let re = regex::Regex::new(&parsed.regex).unwrap();
        assert!(re.is_match("https://ad.doubleclick.net/x"));
        assert!(!re.is_match("https://notdoubleclick.net/x"));
    }

    #[test]
    fn test_matches_everything() {
        assert!(parse(".*").unwrap().matches_everything);
        assert!(parse("^.*").unwrap().matches_everything);
        assert!(!parse(".*ad").unwrap().matches_everything);
    }

    #[test]
    fn test_anchors() {
        let parsed = parse("^https://example\\.com/$").unwrap();
        assert!(parsed.anchored_start);
        assert!(parsed.anchored_end);
        assert_eq!(parse("a^b"), Err(UrlFilterError::MisplacedStartOfLine));
        assert_eq!(parse("a$b"), Err(UrlFilterError::MisplacedEndOfLine));
        assert_eq!(parse("(a$)"), Err(UrlFilterError::MisplacedEndOfLine));
    }

    #[test]
    fn test_rejected_constructs() {
        assert_eq!(parse(""), Err(UrlFilterError::EmptyPattern));
        assert_eq!(parse("bücher"), Err(UrlFilterError::NonAscii));
        assert_eq!(parse("a|b"), Err(UrlFilterError::Disjunction));
        assert_eq!(parse("a{2}"), Err(UrlFilterError::InvalidQuantifier));
        assert_eq!(parse("a*?"), Err(UrlFilterError::InvalidQuantifier));
        assert_eq!(parse("*a"), Err(UrlFilterError::DanglingQuantifier));
        assert_eq!(parse("a**"), Err(UrlFilterError::DanglingQuantifier));
        assert_eq!(parse("(a)\\1"), Err(UrlFilterError::BackReference));
        assert_eq!(parse("\\bad"), Err(UrlFilterError::WordBoundary));
        assert_eq!(parse("\\d+"), Err(UrlFilterError::AtomCharacter));
        assert_eq!(parse("[\\w]"), Err(UrlFilterError::UnsupportedCharacterClass));
        assert_eq!(parse("(?=a)"), Err(UrlFilterError::UnsupportedGroup));
        assert_eq!(parse("(a"), Err(UrlFilterError::UnbalancedGroup));
        assert_eq!(parse("a)"), Err(UrlFilterError::UnbalancedGroup));
        assert_eq!(parse("[abc"), Err(UrlFilterError::UnterminatedCharacterSet));
        assert_eq!(parse("abc\\"), Err(UrlFilterError::TrailingEscape));
    }

    #[test]
    fn test_identity_escapes_become_literals() {
        let parsed = parse("\\/ad\\<x\\>").unwrap();
        let re = regex::Regex::new(&parsed.regex).unwrap();
        assert!(re.is_match("/ad<x>"));
    }

    #[test]
    fn test_hex_escapes_in_sets() {
        let parsed = parse("[\\x00-\\x24\\x26]").unwrap();
        let re = regex::Regex::new(&parsed.regex).unwrap();
        assert!(re.is_match("&"));
        assert!(!re.is_match("%"));
    }

    #[test]
    fn test_set_operators_are_literal() {
        let parsed = parse("[&&~~]").unwrap();
        assert_eq!(parsed.regex, "[\\&\\&\\~\\~]");

        // `a--` is a range ending at `-`, which runs backwards.
        let parsed = parse("[a--z]").unwrap();
        assert_eq!(parsed.regex, "[a-\\-z]");
        assert!(regex::Regex::new(&parsed.regex).is_err());

        let parsed = parse("[--]").unwrap();
        let re = regex::Regex::new(&parsed.regex).unwrap();
        assert!(re.is_match("-"));
    }

    #[test]
    fn test_non_capturing_group() {
        let parsed = parse("(?:ad)+s").unwrap();
        assert_eq!(parsed.regex, "(?:ad)+s");
    }
}
