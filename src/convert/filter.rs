//! Conversion of a single AdBlock Plus filter into content blocker rules.

use bitflags::bitflags;
use regex::{Captures, Regex};
use std::fmt;
use std::sync::LazyLock;

use super::pattern::{punycode, url_filter_from_pattern};
use super::ConvertOptions;
use crate::engine::{Action, Condition, LoadType, ResourceType, Rule, Trigger};

static ELEMHIDE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^([^/*|@"!]*?)#(@)?(?:([\w-]+|\*)((?:\([\w-]+(?:[$^*]?=[^()"]*)?\))*)|#([^{}]+))$"#,
    )
    .expect("valid element hiding regex")
});

static OPTIONS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(~?[\w-]+(?:=[^,]+)?(?:,~?[\w-]+(?:=[^,\s]+)?)*)$")
        .expect("valid options regex")
});

/// Filters that only apply to third-party loads unless they say otherwise.
pub const DEFAULT_THIRD_PARTY_FILTERS: &[&str] = &[
    "&adurl=",
    "&adgroupid=",
    "&AdType=",
    "/ad1.$domain=~ad1.de|~ad1.in|~vereinslinie.de",
];

bitflags! {
    /// Request types named by filter options.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ContentType: u32 {
        const OTHER = 1;
        const SCRIPT = 2;
        const IMAGE = 4;
        const STYLESHEET = 8;
        const OBJECT = 16;
        const SUBDOCUMENT = 32;
        const DOCUMENT = 64;
        const XMLHTTPREQUEST = 2048;
        const OBJECT_SUBREQUEST = 4096;
        const MEDIA = 16384;
        const FONT = 32768;
        const POPUP = 0x1000_0000;
        const ELEMHIDE = 0x4000_0000;
    }
}

impl ContentType {
    /// Types a `~type` option starts from.
    fn inverted_default() -> Self {
        ContentType::from_bits_retain(0x7FFF_FFFF)
            .difference(ContentType::DOCUMENT | ContentType::ELEMHIDE | ContentType::POPUP)
    }

    /// Look up a type option. The flag is false for types content blockers
    /// cannot express.
    fn from_option(name: &str) -> Option<(Self, bool)> {
        let entry = match name {
            "OTHER" | "XBL" | "PING" | "DTD" => (ContentType::OTHER, false),
            "SCRIPT" => (ContentType::SCRIPT, true),
            "IMAGE" => (ContentType::IMAGE, true),
            "BACKGROUND" => (ContentType::IMAGE, false),
            "STYLESHEET" => (ContentType::STYLESHEET, true),
            "OBJECT" => (ContentType::OBJECT, false),
            "SUBDOCUMENT" => (ContentType::SUBDOCUMENT, true),
            "DOCUMENT" => (ContentType::DOCUMENT, true),
            "XMLHTTPREQUEST" => (ContentType::XMLHTTPREQUEST, true),
            "OBJECT_SUBREQUEST" => (ContentType::OBJECT_SUBREQUEST, false),
            "MEDIA" => (ContentType::MEDIA, true),
            "FONT" => (ContentType::FONT, false),
            "POPUP" => (ContentType::POPUP, true),
            "ELEMHIDE" => (ContentType::ELEMHIDE, false),
            _ => return None,
        };
        Some(entry)
    }

    fn resource_types(self) -> Vec<ResourceType> {
        let mapping = [
            (ContentType::DOCUMENT | ContentType::SUBDOCUMENT, ResourceType::Document),
            (ContentType::IMAGE, ResourceType::Image),
            (ContentType::STYLESHEET, ResourceType::StyleSheet),
            (ContentType::SCRIPT, ResourceType::Script),
            (ContentType::FONT, ResourceType::Font),
            (ContentType::XMLHTTPREQUEST, ResourceType::Raw),
            (ContentType::MEDIA, ResourceType::Media),
            (ContentType::POPUP, ResourceType::Popup),
        ];
        mapping
            .into_iter()
            .filter(|(bits, _)| self.intersects(*bits))
            .map(|(_, resource)| resource)
            .collect()
    }
}

/// Why a filter produced no rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Element hiding filter while CSS rules are disabled.
    CssDisabled,
    /// Element hiding filter in the tag/attribute form, which has no selector.
    LegacyElementHiding,
    /// The pattern is already a regular expression.
    RegexPattern,
    /// The pattern translates to nothing usable.
    EmptyPattern,
    NonAsciiPattern,
    UnsupportedOption(String),
    InvalidDomain(String),
    /// The domain list mixes included and excluded domains.
    MixedDomains,
    /// Exceptions for whole documents cannot be expressed.
    DocumentException,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::CssDisabled => write!(f, "element hiding is disabled"),
            SkipReason::LegacyElementHiding => write!(f, "legacy element hiding syntax"),
            SkipReason::RegexPattern => write!(f, "regular expression filters are not supported"),
            SkipReason::EmptyPattern => write!(f, "empty url-filter"),
            SkipReason::NonAsciiPattern => write!(f, "url-filter is not ASCII"),
            SkipReason::UnsupportedOption(option) => write!(f, "unsupported option '{}'", option),
            SkipReason::InvalidDomain(domain) => write!(f, "invalid domain '{}'", domain),
            SkipReason::MixedDomains => write!(f, "mixed domain restrictions need a rule split"),
            SkipReason::DocumentException => {
                write!(f, "$document exceptions are not supported")
            }
        }
    }
}

/// Options parsed from the `$...` suffix of a filter.
#[derive(Debug, Default)]
struct FilterOptions {
    content_type: Option<ContentType>,
    match_case: bool,
    domains: Option<String>,
    party: Option<LoadType>,
}

impl FilterOptions {
    fn apply(&mut self, option: &str) -> Result<(), SkipReason> {
        let (name, value) = match option.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (option, None),
        };
        let name = name.replace('-', "_");

        if let Some((bits, true)) = ContentType::from_option(&name) {
            *self.content_type.get_or_insert(ContentType::empty()) |= bits;
            return Ok(());
        }
        if let Some((bits, _)) = name.strip_prefix('~').and_then(ContentType::from_option) {
            self.content_type
                .get_or_insert_with(ContentType::inverted_default)
                .remove(bits);
            return Ok(());
        }

        match (name.as_str(), value) {
            ("MATCH_CASE", _) => self.match_case = true,
            ("~MATCH_CASE", _) => self.match_case = false,
            ("DOMAIN", Some(domains)) if !domains.is_empty() => {
                self.domains = Some(domains.to_string())
            }
            ("THIRD_PARTY", _) | ("~FIRST_PARTY", _) => self.party = Some(LoadType::ThirdParty),
            ("~THIRD_PARTY", _) | ("FIRST_PARTY", _) => self.party = Some(LoadType::FirstParty),
            ("COLLAPSE", _) | ("~COLLAPSE", _) => {}
            ("SITEKEY", Some(keys)) if !keys.is_empty() => {}
            _ => return Err(SkipReason::UnsupportedOption(option.to_lowercase())),
        }
        Ok(())
    }
}

/// Convert one filter line into rules.
///
/// Most filters produce one rule; a filter on documents plus other
/// types with no party option produces two.
pub fn convert_filter(text: &str, options: &ConvertOptions) -> Result<Vec<Rule>, SkipReason> {
    if text.contains('#') {
        if let Some(captures) = ELEMHIDE.captures(text) {
            if options.no_css {
                return Err(SkipReason::CssDisabled);
            }
            return element_hiding(&captures);
        }
    }
    network_filter(text)
}

fn element_hiding(captures: &Captures<'_>) -> Result<Vec<Rule>, SkipReason> {
    let selector = captures
        .get(5)
        .ok_or(SkipReason::LegacyElementHiding)?
        .as_str()
        .to_string();
    let domains = captures.get(1).map_or("", |m| m.as_str());
    let is_exception = captures.get(2).is_some();

    // Exceptions hide everywhere except the named domains.
    let (included, excluded) = normalize_domains(domains.split(','), "")?;
    let condition = if is_exception {
        domain_list_condition(excluded, included)?
    } else {
        domain_list_condition(included, excluded)?
    };

    Ok(vec![Rule {
        trigger: Trigger {
            url_filter: ".*".to_string(),
            url_filter_is_case_sensitive: false,
            resource_types: Vec::new(),
            load_types: Vec::new(),
            load_contexts: Vec::new(),
            condition,
        },
        action: Action::CssDisplayNone { selector },
    }])
}

fn network_filter(text: &str) -> Result<Vec<Rule>, SkipReason> {
    let (is_exception, body) = match text.strip_prefix("@@") {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let mut options = FilterOptions {
        party: DEFAULT_THIRD_PARTY_FILTERS
            .contains(&body)
            .then_some(LoadType::ThirdParty),
        ..FilterOptions::default()
    };

    let mut pattern = body;
    if let Some(dollar) = body.find('$') {
        if let Some(captures) = OPTIONS.captures(body) {
            pattern = &body[..dollar];
            for option in captures[1].to_uppercase().split(',') {
                options.apply(option)?;
            }
        }
    }

    let url_filter = match url_filter_from_pattern(pattern) {
        Some(filter) => filter,
        None if pattern.len() >= 2 && pattern.starts_with('/') && pattern.ends_with('/') => {
            return Err(SkipReason::RegexPattern)
        }
        None if !pattern.is_ascii() => return Err(SkipReason::NonAsciiPattern),
        None => return Err(SkipReason::EmptyPattern),
    };

    let condition = match &options.domains {
        Some(domains) => domain_condition(domains)?,
        None => None,
    };

    let mut rule = Rule {
        trigger: Trigger {
            url_filter,
            url_filter_is_case_sensitive: options.match_case,
            resource_types: Vec::new(),
            load_types: options.party.into_iter().collect(),
            load_contexts: Vec::new(),
            condition,
        },
        action: if is_exception {
            Action::IgnorePreviousRules
        } else {
            Action::Block
        },
    };

    let Some(content_type) = options.content_type.filter(|ct| !ct.is_empty()) else {
        return Ok(vec![rule]);
    };
    if is_exception && content_type.contains(ContentType::DOCUMENT) {
        return Err(SkipReason::DocumentException);
    }

    let resource_types = content_type.resource_types();
    if resource_types.len() > 1
        && resource_types[0] == ResourceType::Document
        && options.party.is_none()
    {
        // Documents are only blocked for third-party loads.
        let mut documents = rule.clone();
        documents.trigger.resource_types = vec![ResourceType::Document];
        documents.trigger.load_types = vec![LoadType::ThirdParty];
        rule.trigger.resource_types = resource_types[1..].to_vec();
        return Ok(vec![rule, documents]);
    }

    rule.trigger.resource_types = resource_types;
    Ok(vec![rule])
}

/// Build the domain condition from a `domain=a|~b` value.
fn domain_condition(domains: &str) -> Result<Option<Condition>, SkipReason> {
    let (included, excluded) = normalize_domains(domains.split('|'), "*")?;
    domain_list_condition(included, excluded)
}

/// Lower-case and punycode each domain, separating `~` exclusions.
fn normalize_domains<'a>(
    domains: impl Iterator<Item = &'a str>,
    prefix: &str,
) -> Result<(Vec<String>, Vec<String>), SkipReason> {
    let mut included = Vec::new();
    let mut excluded = Vec::new();

    for domain in domains.map(str::trim).filter(|d| !d.is_empty()) {
        let domain = domain.to_lowercase();
        let (list, name) = match domain.strip_prefix('~') {
            Some(name) => (&mut excluded, name),
            None => (&mut included, domain.as_str()),
        };
        let encoded = punycode(name).ok_or_else(|| SkipReason::InvalidDomain(name.to_string()))?;
        list.push(format!("{}{}", prefix, encoded));
    }
    Ok((included, excluded))
}

fn domain_list_condition(
    included: Vec<String>,
    excluded: Vec<String>,
) -> Result<Option<Condition>, SkipReason> {
    match (included.is_empty(), excluded.is_empty()) {
        (false, false) => Err(SkipReason::MixedDomains),
        (false, true) => Ok(Some(Condition::IfDomain(included))),
        (true, false) => Ok(Some(Condition::UnlessDomain(excluded))),
        (true, true) => Ok(None),
    }
}
