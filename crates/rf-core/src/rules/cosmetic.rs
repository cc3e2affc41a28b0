//! Cosmetic (page-altering) rules
//!
//! `domains##selector` and friends. The marker decides the rule kind and
//! whether it is an exception (`@` inside the marker).

use crate::error::FilterError;
use crate::url::domain_matches;

/// What a cosmetic rule does to the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CosmeticRuleType {
    /// `##` / `#?#` - hide matching elements
    ElementHiding,
    /// `#$#` - inject a CSS rule
    Css,
    /// `#%#` - run a JS snippet
    Js,
    /// `$$` - HTML filtering
    Html,
}

/// Cosmetic rule markers, longest first so `#@?#` wins over `#@#` and `##`.
const MARKERS: [(&str, CosmeticRuleType, bool); 10] = [
    ("#@?#", CosmeticRuleType::ElementHiding, true),
    ("#@$#", CosmeticRuleType::Css, true),
    ("#@%#", CosmeticRuleType::Js, true),
    ("#@#", CosmeticRuleType::ElementHiding, true),
    ("#?#", CosmeticRuleType::ElementHiding, false),
    ("#$#", CosmeticRuleType::Css, false),
    ("#%#", CosmeticRuleType::Js, false),
    ("##", CosmeticRuleType::ElementHiding, false),
    ("$@$", CosmeticRuleType::Html, true),
    ("$$", CosmeticRuleType::Html, false),
];

/// Find the first cosmetic marker in a line.
/// Returns `(byte index, marker, kind, whitelist)`.
pub(crate) fn find_marker(line: &str) -> Option<(usize, &'static str, CosmeticRuleType, bool)> {
    let bytes = line.as_bytes();
    for i in 0..bytes.len() {
        if bytes[i] != b'#' && bytes[i] != b'$' {
            continue;
        }
        for (marker, kind, whitelist) in MARKERS {
            if line[i..].starts_with(marker) {
                return Some((i, marker, kind, whitelist));
            }
        }
    }
    None
}

/// A parsed cosmetic rule.
#[derive(Debug, Clone)]
pub struct CosmeticRule {
    text: String,
    filter_list_id: i32,
    rule_type: CosmeticRuleType,
    /// Extended-CSS selector marker (`#?#`).
    extended_css: bool,
    whitelist: bool,
    content: String,
    permitted_domains: Vec<String>,
    restricted_domains: Vec<String>,
}

impl CosmeticRule {
    pub fn parse(text: &str, filter_list_id: i32) -> Result<Self, FilterError> {
        let trimmed = text.trim();
        let (marker_index, marker, rule_type, whitelist) = find_marker(trimmed)
            .ok_or_else(|| FilterError::syntax(text, "not a cosmetic rule"))?;

        let content = trimmed[marker_index + marker.len()..].trim();
        if content.is_empty() {
            return Err(FilterError::syntax(text, "empty rule content"));
        }

        let mut permitted_domains = Vec::new();
        let mut restricted_domains = Vec::new();
        for raw in trimmed[..marker_index].split(',') {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            match raw.strip_prefix('~') {
                Some(domain) if !domain.is_empty() => {
                    restricted_domains.push(domain.to_ascii_lowercase());
                }
                Some(_) => return Err(FilterError::syntax(text, "empty restricted domain")),
                None => permitted_domains.push(raw.to_ascii_lowercase()),
            }
        }

        Ok(Self {
            text: trimmed.to_string(),
            filter_list_id,
            rule_type,
            extended_css: marker.contains('?'),
            whitelist,
            content: content.to_string(),
            permitted_domains,
            restricted_domains,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn filter_list_id(&self) -> i32 {
        self.filter_list_id
    }

    pub fn rule_type(&self) -> CosmeticRuleType {
        self.rule_type
    }

    pub fn is_extended_css(&self) -> bool {
        self.extended_css
    }

    pub fn is_whitelist(&self) -> bool {
        self.whitelist
    }

    /// The selector / CSS / script body.
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn permitted_domains(&self) -> &[String] {
        &self.permitted_domains
    }

    /// A generic rule applies everywhere (no permitted domains).
    pub fn is_generic(&self) -> bool {
        self.permitted_domains.is_empty()
    }

    /// Whether any permitted domain carries a wildcard.
    pub fn has_wildcard_domain(&self) -> bool {
        self.permitted_domains.iter().any(|d| d.contains('*'))
    }

    /// Hostname check: at least one permitted domain pattern (if any) must
    /// match, and no restricted domain pattern may match.
    pub fn matches_hostname(&self, hostname: &str) -> bool {
        if self
            .restricted_domains
            .iter()
            .any(|d| domain_matches(d, hostname))
        {
            return false;
        }
        self.permitted_domains.is_empty()
            || self
                .permitted_domains
                .iter()
                .any(|d| domain_matches(d, hostname))
    }
}
