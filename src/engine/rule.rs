//! Typed form of a content blocker rule.
//!
//! Rules serialize back to the JSON shape they are parsed from, with unset
//! flags and conditions left out.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;

/// Declares a string-valued trigger flag enum with its JSON spelling.
macro_rules! trigger_flag {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn parse(value: &str) -> Option<Self> {
                match value {
                    $($text => Some($name::$variant),)+
                    _ => None,
                }
            }

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }
    };
}

trigger_flag!(
    /// Kind of resource a trigger applies to (`resource-type`).
    ResourceType {
        Document => "document",
        Image => "image",
        StyleSheet => "style-sheet",
        Script => "script",
        Font => "font",
        Raw => "raw",
        SvgDocument => "svg-document",
        Media => "media",
        Popup => "popup",
        Ping => "ping",
        Fetch => "fetch",
        Websocket => "websocket",
        Other => "other",
    }
);

trigger_flag!(
    /// Relationship between the resource and the page (`load-type`).
    LoadType {
        FirstParty => "first-party",
        ThirdParty => "third-party",
    }
);

trigger_flag!(
    /// Frame the resource is loaded into (`load-context`).
    LoadContext {
        TopFrame => "top-frame",
        ChildFrame => "child-frame",
    }
);

/// The single optional condition a trigger may carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    IfDomain(Vec<String>),
    UnlessDomain(Vec<String>),
    IfTopUrl(Vec<String>),
    UnlessTopUrl(Vec<String>),
}

impl Condition {
    pub const KEYS: [&'static str; 4] =
        ["if-domain", "unless-domain", "if-top-url", "unless-top-url"];

    pub fn key(&self) -> &'static str {
        match self {
            Condition::IfDomain(_) => "if-domain",
            Condition::UnlessDomain(_) => "unless-domain",
            Condition::IfTopUrl(_) => "if-top-url",
            Condition::UnlessTopUrl(_) => "unless-top-url",
        }
    }

    pub fn values(&self) -> &[String] {
        match self {
            Condition::IfDomain(v)
            | Condition::UnlessDomain(v)
            | Condition::IfTopUrl(v)
            | Condition::UnlessTopUrl(v) => v,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub url_filter: String,
    pub url_filter_is_case_sensitive: bool,
    /// Empty means every resource type.
    pub resource_types: Vec<ResourceType>,
    /// Empty means both first- and third-party loads.
    pub load_types: Vec<LoadType>,
    pub load_contexts: Vec<LoadContext>,
    pub condition: Option<Condition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Block,
    BlockCookies,
    CssDisplayNone { selector: String },
    IgnorePreviousRules,
    MakeHttps,
}

impl Action {
    pub fn type_name(&self) -> &'static str {
        match self {
            Action::Block => "block",
            Action::BlockCookies => "block-cookies",
            Action::CssDisplayNone { .. } => "css-display-none",
            Action::IgnorePreviousRules => "ignore-previous-rules",
            Action::MakeHttps => "make-https",
        }
    }
}

impl Serialize for Trigger {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("url-filter", &self.url_filter)?;
        if self.url_filter_is_case_sensitive {
            map.serialize_entry("url-filter-is-case-sensitive", &true)?;
        }
        if !self.resource_types.is_empty() {
            map.serialize_entry("resource-type", &self.resource_types)?;
        }
        if !self.load_types.is_empty() {
            map.serialize_entry("load-type", &self.load_types)?;
        }
        if !self.load_contexts.is_empty() {
            map.serialize_entry("load-context", &self.load_contexts)?;
        }
        if let Some(condition) = &self.condition {
            map.serialize_entry(condition.key(), condition.values())?;
        }
        map.end()
    }
}

impl Serialize for Action {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", self.type_name())?;
        if let Action::CssDisplayNone { selector } = self {
            map.serialize_entry("selector", selector)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Rule {
    pub trigger: Trigger,
    pub action: Action,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_spellings_round_trip() {
        for flag in ResourceType::ALL {
            assert_eq!(ResourceType::parse(flag.as_str()), Some(*flag));
        }
        assert_eq!(LoadType::parse("third-party"), Some(LoadType::ThirdParty));
        assert_eq!(LoadContext::parse("top-frame"), Some(LoadContext::TopFrame));
        assert_eq!(ResourceType::parse("stylesheet"), None);
    }

    #[test]
    fn test_serialize_omits_unset_fields() {
        let rule = Rule {
            trigger: Trigger {
                url_filter: "ads".to_string(),
                url_filter_is_case_sensitive: false,
                resource_types: vec![ResourceType::StyleSheet, ResourceType::Raw],
                load_types: vec![],
                load_contexts: vec![],
                condition: Some(Condition::IfDomain(vec!["*example.com".to_string()])),
            },
            action: Action::CssDisplayNone {
                selector: ".ad".to_string(),
            },
        };

        assert_eq!(
            serde_json::to_value(&rule).unwrap(),
            serde_json::json!({
                "trigger": {
                    "url-filter": "ads",
                    "resource-type": ["style-sheet", "raw"],
                    "if-domain": ["*example.com"]
                },
                "action": { "type": "css-display-none", "selector": ".ad" }
            })
        );
    }

    #[test]
    fn test_condition_key() {
        let condition = Condition::UnlessDomain(vec!["example.com".to_string()]);
        assert_eq!(condition.key(), "unless-domain");
        assert_eq!(condition.values().to_vec(), vec!["example.com".to_string()]);
    }
}
