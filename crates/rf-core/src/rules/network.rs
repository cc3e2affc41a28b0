//! Network (request blocking) rules
//!
//! Adblock-Plus style syntax: an optional `@@` exception marker, a URL
//! pattern with anchors and wildcards, then a `$`-delimited modifier list.

use crate::error::FilterError;
use crate::request::{Request, RequestType, RequestTypeMask};
use crate::rules::cookie::CookieModifier;
use crate::rules::pattern::Pattern;
use crate::url::domain_matches;

bitflags::bitflags! {
    /// Boolean rule options.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct NetworkRuleOption: u32 {
        /// `@@` exception rule
        const WHITELIST = 1 << 0;
        /// `$important` - wins over non-important exceptions
        const IMPORTANT = 1 << 1;
        /// `$match-case` - case-sensitive pattern
        const MATCH_CASE = 1 << 2;
        /// `$third-party` - third-party requests only
        const THIRD_PARTY = 1 << 3;
        /// `$~third-party` / `$first-party`
        const FIRST_PARTY = 1 << 4;
        /// `$popup`
        const POPUP = 1 << 5;
        /// `$document` on an exception rule (document-level allowlist)
        const DOCUMENT = 1 << 6;
        /// `$urlblock`
        const URLBLOCK = 1 << 7;
        /// `$genericblock`
        const GENERICBLOCK = 1 << 8;
        /// `$elemhide`
        const ELEMHIDE = 1 << 9;
        /// `$generichide`
        const GENERICHIDE = 1 << 10;
        /// `$stealth`
        const STEALTH = 1 << 11;
    }
}

/// Modifiers that carry their own internal structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvancedModifier {
    Csp(String),
    Replace(String),
    Cookie(CookieModifier),
    Redirect(String),
}

/// A parsed network rule.
#[derive(Debug, Clone)]
pub struct NetworkRule {
    text: String,
    filter_list_id: i32,
    pattern: Pattern,
    shortcut: String,
    options: NetworkRuleOption,
    permitted_types: RequestTypeMask,
    restricted_types: RequestTypeMask,
    permitted_domains: Vec<String>,
    restricted_domains: Vec<String>,
    advanced_modifier: Option<AdvancedModifier>,
}

// Options that are only meaningful on exception rules.
const WHITELIST_ONLY: NetworkRuleOption = NetworkRuleOption::DOCUMENT
    .union(NetworkRuleOption::URLBLOCK)
    .union(NetworkRuleOption::GENERICBLOCK)
    .union(NetworkRuleOption::ELEMHIDE)
    .union(NetworkRuleOption::GENERICHIDE)
    .union(NetworkRuleOption::STEALTH);

impl NetworkRule {
    pub fn parse(text: &str, filter_list_id: i32) -> Result<Self, FilterError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(FilterError::syntax(text, "empty rule"));
        }

        let (whitelist, rest) = match trimmed.strip_prefix("@@") {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        let (pattern_text, options_text) = split_options(rest);

        if pattern_text.len() > 1 && pattern_text.starts_with('/') && pattern_text.ends_with('/') {
            return Err(FilterError::syntax(text, "regex patterns are not supported"));
        }

        let mut rule = Self {
            text: trimmed.to_string(),
            filter_list_id,
            pattern: Pattern::compile("", false),
            shortcut: String::new(),
            options: if whitelist {
                NetworkRuleOption::WHITELIST
            } else {
                NetworkRuleOption::empty()
            },
            permitted_types: RequestTypeMask::empty(),
            restricted_types: RequestTypeMask::empty(),
            permitted_domains: Vec::new(),
            restricted_domains: Vec::new(),
            advanced_modifier: None,
        };

        if let Some(options_text) = options_text {
            rule.parse_options(text, options_text)?;
        }

        if pattern_text.is_empty() && rule.advanced_modifier.is_none() && rule.options == rule.whitelist_flag() {
            return Err(FilterError::syntax(text, "rule has no pattern and no modifiers"));
        }

        rule.pattern = Pattern::compile(pattern_text, rule.is_option_enabled(NetworkRuleOption::MATCH_CASE));
        rule.shortcut = rule.pattern.shortcut();

        Ok(rule)
    }

    fn whitelist_flag(&self) -> NetworkRuleOption {
        if self.is_whitelist() {
            NetworkRuleOption::WHITELIST
        } else {
            NetworkRuleOption::empty()
        }
    }

    fn parse_options(&mut self, text: &str, options_text: &str) -> Result<(), FilterError> {
        for raw in options_text.split(',') {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }

            let (key, value) = match raw.split_once('=') {
                Some((k, v)) => (k, Some(v)),
                None => (raw, None),
            };

            let (negated, name) = match key.strip_prefix('~') {
                Some(rest) => (true, rest),
                None => (false, key),
            };
            let name = name.to_ascii_lowercase();

            // Comma-form cookie suboptions: `$cookie=n,maxAge=60,sameSite=lax`
            if matches!(name.as_str(), "maxage" | "samesite") {
                if let (Some(AdvancedModifier::Cookie(cookie)), Some(value)) =
                    (self.advanced_modifier.as_mut(), value)
                {
                    cookie
                        .set_suboption(&name, value)
                        .map_err(|reason| FilterError::syntax(text, reason))?;
                    continue;
                }
                return Err(FilterError::syntax(text, format!("stray option: {raw}")));
            }

            match name.as_str() {
                "important" => self.enable(NetworkRuleOption::IMPORTANT, negated),
                "match-case" | "match_case" => self.enable(NetworkRuleOption::MATCH_CASE, negated),
                "third-party" | "thirdparty" | "3p" => {
                    self.enable(
                        if negated {
                            NetworkRuleOption::FIRST_PARTY
                        } else {
                            NetworkRuleOption::THIRD_PARTY
                        },
                        false,
                    );
                }
                "first-party" | "firstparty" | "1p" => {
                    self.enable(
                        if negated {
                            NetworkRuleOption::THIRD_PARTY
                        } else {
                            NetworkRuleOption::FIRST_PARTY
                        },
                        false,
                    );
                }
                "popup" => {
                    self.enable(NetworkRuleOption::POPUP, negated);
                    self.apply_type(RequestTypeMask::DOCUMENT, negated);
                }
                "document" => {
                    if self.is_whitelist() {
                        self.enable(NetworkRuleOption::DOCUMENT, negated);
                    } else {
                        self.apply_type(RequestTypeMask::DOCUMENT, negated);
                    }
                }
                "urlblock" => self.enable_whitelist_only(text, NetworkRuleOption::URLBLOCK)?,
                "genericblock" => self.enable_whitelist_only(text, NetworkRuleOption::GENERICBLOCK)?,
                "elemhide" => self.enable_whitelist_only(text, NetworkRuleOption::ELEMHIDE)?,
                "generichide" => self.enable_whitelist_only(text, NetworkRuleOption::GENERICHIDE)?,
                "stealth" => self.enable_whitelist_only(text, NetworkRuleOption::STEALTH)?,
                "domain" => {
                    let value = value
                        .ok_or_else(|| FilterError::syntax(text, "domain option requires a value"))?;
                    self.parse_domain_option(text, value)?;
                }
                "csp" => self.set_advanced(
                    text,
                    AdvancedModifier::Csp(value.unwrap_or_default().to_string()),
                )?,
                "replace" => self.set_advanced(
                    text,
                    AdvancedModifier::Replace(value.unwrap_or_default().to_string()),
                )?,
                "redirect" => self.set_advanced(
                    text,
                    AdvancedModifier::Redirect(value.unwrap_or_default().to_string()),
                )?,
                "cookie" => {
                    let cookie = CookieModifier::parse(value.unwrap_or_default())
                        .map_err(|reason| FilterError::syntax(text, reason))?;
                    self.set_advanced(text, AdvancedModifier::Cookie(cookie))?;
                }
                "badfilter" | "removeparam" => {
                    return Err(FilterError::syntax(text, format!("unsupported modifier: {name}")));
                }
                _ => {
                    if let Some(mask) = request_type_mask(&name) {
                        self.apply_type(mask, negated);
                    } else {
                        return Err(FilterError::syntax(text, format!("unknown modifier: {name}")));
                    }
                }
            }
        }

        if self.options.intersects(WHITELIST_ONLY) && !self.is_whitelist() {
            // enable_whitelist_only already rejects these; kept as an
            // invariant for options set through future paths.
            return Err(FilterError::syntax(text, "option requires an exception rule"));
        }

        Ok(())
    }

    fn enable(&mut self, option: NetworkRuleOption, negated: bool) {
        if negated {
            self.options.remove(option);
        } else {
            self.options.insert(option);
        }
    }

    fn enable_whitelist_only(
        &mut self,
        text: &str,
        option: NetworkRuleOption,
    ) -> Result<(), FilterError> {
        if !self.is_whitelist() {
            return Err(FilterError::syntax(
                text,
                "option is only allowed in exception rules",
            ));
        }
        self.options.insert(option);
        Ok(())
    }

    fn apply_type(&mut self, mask: RequestTypeMask, negated: bool) {
        if negated {
            self.restricted_types.insert(mask);
        } else {
            self.permitted_types.insert(mask);
        }
    }

    fn parse_domain_option(&mut self, text: &str, value: &str) -> Result<(), FilterError> {
        for raw in value.split('|') {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            let (restricted, domain) = match raw.strip_prefix('~') {
                Some(rest) => (true, rest),
                None => (false, raw),
            };
            let domain = domain.to_ascii_lowercase();
            if domain.is_empty() {
                continue;
            }
            if restricted {
                self.restricted_domains.push(domain);
            } else {
                self.permitted_domains.push(domain);
            }
        }

        if self.permitted_domains.is_empty() && self.restricted_domains.is_empty() {
            return Err(FilterError::syntax(text, "domain option has no valid domains"));
        }
        Ok(())
    }

    fn set_advanced(&mut self, text: &str, modifier: AdvancedModifier) -> Result<(), FilterError> {
        if self.advanced_modifier.is_some() {
            return Err(FilterError::syntax(text, "multiple advanced modifiers"));
        }
        self.advanced_modifier = Some(modifier);
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn filter_list_id(&self) -> i32 {
        self.filter_list_id
    }

    /// The longest literal substring of the pattern, lowercased.
    pub fn shortcut(&self) -> &str {
        &self.shortcut
    }

    pub fn is_whitelist(&self) -> bool {
        self.options.contains(NetworkRuleOption::WHITELIST)
    }

    pub fn is_important(&self) -> bool {
        self.options.contains(NetworkRuleOption::IMPORTANT)
    }

    pub fn is_option_enabled(&self, option: NetworkRuleOption) -> bool {
        self.options.contains(option)
    }

    pub fn permitted_domains(&self) -> &[String] {
        &self.permitted_domains
    }

    pub fn restricted_domains(&self) -> &[String] {
        &self.restricted_domains
    }

    pub fn advanced_modifier(&self) -> Option<&AdvancedModifier> {
        self.advanced_modifier.as_ref()
    }

    pub fn is_cookie_rule(&self) -> bool {
        matches!(self.advanced_modifier, Some(AdvancedModifier::Cookie(_)))
    }

    pub fn cookie_modifier(&self) -> Option<&CookieModifier> {
        match &self.advanced_modifier {
            Some(AdvancedModifier::Cookie(c)) => Some(c),
            _ => None,
        }
    }

    /// Exception rules that allowlist a whole document: `$document` or
    /// `$urlblock`.
    pub fn is_document_level_whitelist(&self) -> bool {
        self.is_whitelist()
            && self
                .options
                .intersects(NetworkRuleOption::DOCUMENT | NetworkRuleOption::URLBLOCK)
    }

    /// Exception rules that affect cosmetic filtering for a document.
    pub fn is_cosmetic_whitelist(&self) -> bool {
        self.is_whitelist()
            && self.options.intersects(
                NetworkRuleOption::DOCUMENT
                    | NetworkRuleOption::ELEMHIDE
                    | NetworkRuleOption::GENERICHIDE,
            )
    }

    // =========================================================================
    // Matching
    // =========================================================================

    /// Evaluate the rule against a request: request type mask, then domain
    /// allow/deny, then the party constraint, then the full pattern match.
    pub fn matches(&self, request: &Request) -> bool {
        if !self.matches_request_type(request.request_type) {
            return false;
        }

        if !self.matches_domains(request.source_hostname.as_deref()) {
            return false;
        }

        if self.options.contains(NetworkRuleOption::THIRD_PARTY) && !request.third_party {
            return false;
        }
        if self.options.contains(NetworkRuleOption::FIRST_PARTY) && request.third_party {
            return false;
        }

        let url = if self.options.contains(NetworkRuleOption::MATCH_CASE) {
            &request.url
        } else {
            &request.url_lowercase
        };
        self.pattern.matches(url)
    }

    fn matches_request_type(&self, request_type: RequestType) -> bool {
        let mask = request_type.mask();
        if self.restricted_types.intersects(mask) {
            return false;
        }
        self.permitted_types.is_empty() || self.permitted_types.intersects(mask)
    }

    fn matches_domains(&self, source_hostname: Option<&str>) -> bool {
        if self.permitted_domains.is_empty() && self.restricted_domains.is_empty() {
            return true;
        }

        let Some(host) = source_hostname else {
            // A rule restricted to specific source domains cannot match a
            // request without a source.
            return self.permitted_domains.is_empty();
        };

        if self.restricted_domains.iter().any(|d| domain_matches(d, host)) {
            return false;
        }
        self.permitted_domains.is_empty()
            || self.permitted_domains.iter().any(|d| domain_matches(d, host))
    }
}

fn split_options(text: &str) -> (&str, Option<&str>) {
    match text.rfind('$') {
        Some(i) if i + 1 < text.len() => (&text[..i], Some(&text[i + 1..])),
        _ => (text, None),
    }
}

fn request_type_mask(name: &str) -> Option<RequestTypeMask> {
    match name {
        "script" => Some(RequestTypeMask::SCRIPT),
        "image" => Some(RequestTypeMask::IMAGE),
        "stylesheet" => Some(RequestTypeMask::STYLESHEET),
        "object" => Some(RequestTypeMask::OBJECT),
        "subdocument" => Some(RequestTypeMask::SUBDOCUMENT),
        "xmlhttprequest" | "xhr" => Some(RequestTypeMask::XMLHTTPREQUEST),
        "websocket" => Some(RequestTypeMask::WEBSOCKET),
        "font" => Some(RequestTypeMask::FONT),
        "media" => Some(RequestTypeMask::MEDIA),
        "other" => Some(RequestTypeMask::OTHER),
        _ => None,
    }
}
