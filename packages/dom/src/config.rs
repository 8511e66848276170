use crate::error::DomResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_NAME: &str = "selser.config.json";

/// Elements that never have content or an end tag
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

pub fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

/// Every marker the diff, serialization, normalization and fuzzing passes
/// consult, kept in one place so they can be inspected and overridden.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SelserConfig {
    /// Tags that get a newline on both sides, both when normalizing and when
    /// separating reused from regenerated siblings
    pub block_tags: Vec<String>,

    /// `typeof` markers of encapsulated template/extension output
    pub encapsulation_typeofs: Vec<String>,

    /// `typeof` markers of media wrappers
    pub media_typeofs: Vec<String>,

    /// `typeof` markers of character entity wrappers
    pub entity_typeofs: Vec<String>,

    /// Classes whose subtree must never be edited by the change simulator
    pub non_editable_classes: Vec<String>,

    /// Spans unwrapped before whitespace analysis
    pub transparent_span_pattern: String,

    /// Same as `transparent_span_pattern`, for `parsoid_only` normalization
    pub parsoid_only_transparent_span_pattern: String,

    /// Attribute holding the persisted provenance record
    pub provenance_attribute: String,

    /// Attribute grouping the siblings of one encapsulated unit
    pub grouping_attribute: String,

    /// Attribute carrying template call data
    pub template_data_attribute: String,

    /// Attributes the differ never compares
    pub diff_ignored_attributes: Vec<String>,

    /// Attributes the normalizer always removes
    pub stripped_attributes: Vec<String>,

    /// Attributes the normalizer removes unless running in `parsoid_only` mode
    pub stripped_attributes_non_parsoid: Vec<String>,

    /// Ids produced by the parser rather than by authors
    pub generated_id_pattern: String,

    /// Rewrites thumbnail URLs to the original file URL; group 1 and 2 are kept
    pub thumbnail_pattern: String,

    /// Inline tags that scrubbing merges when adjacent and identical
    pub mergeable_quote_tags: Vec<String>,

    /// Attempts at producing a fresh change tree before giving up
    pub change_retry_budget: usize,

    /// Attribute set by the attribute-change mutation
    pub synthetic_attribute: String,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for SelserConfig {
    fn default() -> Self {
        Self {
            block_tags: strings(&[
                "body", "caption", "div", "dd", "dt", "li", "p", "table", "tr", "td", "th",
                "tbody", "dl", "ol", "ul", "h1", "h2", "h3", "h4", "h5", "h6",
            ]),
            encapsulation_typeofs: strings(&[
                "mw:Transclusion",
                "mw:Extension/",
                "mw:Param",
                "mw:LanguageVariant",
            ]),
            media_typeofs: strings(&["mw:Image", "mw:Video", "mw:Audio", "mw:File"]),
            entity_typeofs: strings(&["mw:Entity"]),
            non_editable_classes: strings(&["mw-references-wrap"]),
            transparent_span_pattern: r"^mw:(?:DisplaySpace|Placeholder|Nowiki|Transclusion|Entity)$"
                .to_string(),
            parsoid_only_transparent_span_pattern: r"^mw:Placeholder$".to_string(),
            provenance_attribute: "data-parsoid".to_string(),
            grouping_attribute: "about".to_string(),
            template_data_attribute: "data-mw".to_string(),
            diff_ignored_attributes: strings(&["data-parsoid-diff", "about", "data-parsoid"]),
            stripped_attributes: strings(&[
                "data-parsoid",
                "prefix",
                "about",
                "rev",
                "datatype",
                "inlist",
                "usemap",
                "vocab",
            ]),
            stripped_attributes_non_parsoid: strings(&[
                "data-mw", "resource", "rel", "property", "class", "typeof",
            ]),
            generated_id_pattern: r"^mw((t\d+)|([\w-]{2,}))$".to_string(),
            thumbnail_pattern: r"^(.*?)/thumb(/[0-9a-f]/[0-9a-f]{2}/[^/]+)/[0-9]+px-[^/]+$"
                .to_string(),
            mergeable_quote_tags: strings(&["b", "i"]),
            change_retry_budget: 1000,
            synthetic_attribute: "data-foobar".to_string(),
        }
    }
}

/// `typeof` values are space separated. A marker ending in `/` matches any
/// token it prefixes; other markers match the token exactly or a `/` suffixed
/// variant of it (`mw:Image` matches `mw:Image/Thumb`).
fn typeof_matches(typeof_attr: &str, markers: &[String]) -> bool {
    typeof_attr.split_whitespace().any(|token| {
        markers.iter().any(|marker| {
            if marker.ends_with('/') {
                token.starts_with(marker.as_str())
            } else {
                token == marker
                    || token
                        .strip_prefix(marker.as_str())
                        .map_or(false, |rest| rest.starts_with('/'))
            }
        })
    })
}

impl SelserConfig {
    /// Load `selser.config.json` from a directory, falling back to defaults
    pub fn load(dir: &Path) -> DomResult<Self> {
        let path = dir.join(DEFAULT_CONFIG_NAME);
        if path.exists() {
            Self::from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_file(path: &Path) -> DomResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn config_path(dir: &Path) -> PathBuf {
        dir.join(DEFAULT_CONFIG_NAME)
    }

    pub fn is_block_tag(&self, name: &str) -> bool {
        self.block_tags.iter().any(|t| t == name)
    }

    pub fn is_encapsulation_typeof(&self, typeof_attr: &str) -> bool {
        typeof_matches(typeof_attr, &self.encapsulation_typeofs)
    }

    pub fn is_media_typeof(&self, typeof_attr: &str) -> bool {
        typeof_matches(typeof_attr, &self.media_typeofs)
    }

    pub fn is_entity_typeof(&self, typeof_attr: &str) -> bool {
        typeof_matches(typeof_attr, &self.entity_typeofs)
    }

    /// Template/extension output and media wrappers are diffed and
    /// serialized as indivisible units
    pub fn is_atomic_typeof(&self, typeof_attr: &str) -> bool {
        self.is_encapsulation_typeof(typeof_attr) || self.is_media_typeof(typeof_attr)
    }

    pub fn is_diff_ignored(&self, attr: &str) -> bool {
        self.diff_ignored_attributes.iter().any(|a| a == attr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let json = r#"{
            "blockTags": ["p", "section"],
            "changeRetryBudget": 10
        }"#;

        let config: SelserConfig = serde_json::from_str(json).unwrap();
        assert!(config.is_block_tag("section"));
        assert!(!config.is_block_tag("div"));
        assert_eq!(config.change_retry_budget, 10);
        assert_eq!(config.provenance_attribute, "data-parsoid");
    }

    #[test]
    fn test_default_config() {
        let config = SelserConfig::default();
        assert!(config.is_block_tag("h3"));
        assert!(!config.is_block_tag("span"));
        assert_eq!(config.change_retry_budget, 1000);
        assert_eq!(config.synthetic_attribute, "data-foobar");
    }

    #[test]
    fn test_typeof_markers() {
        let config = SelserConfig::default();
        assert!(config.is_atomic_typeof("mw:Transclusion"));
        assert!(config.is_atomic_typeof("mw:Extension/ref"));
        assert!(config.is_atomic_typeof("mw:Image/Thumb"));
        assert!(config.is_atomic_typeof("foo mw:Image"));
        assert!(!config.is_atomic_typeof("mw:ImageMap"));
        assert!(!config.is_atomic_typeof("mw:Entity"));
        assert!(config.is_entity_typeof("mw:Entity"));
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = std::env::temp_dir().join("selser-config-missing");
        let config = SelserConfig::load(&dir).unwrap();
        assert_eq!(config, SelserConfig::default());
    }
}
