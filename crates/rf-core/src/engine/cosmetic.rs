//! Cosmetic rule lookup
//!
//! Each rule kind gets its own lookup table with four buckets: exact
//! hostname, wildcard-domain, generic, and whitelist (exceptions, keyed by
//! rule content). Hostname lookups walk the dot-suffixes so
//! `example.com##x` applies on `sub.example.com` too.

use std::collections::HashMap;

use crate::rules::{CosmeticRule, CosmeticRuleType};

bitflags::bitflags! {
    /// Which cosmetic rules a lookup should return.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CosmeticOption: u8 {
        const ELEMENT_HIDING = 1 << 0;
        const CSS = 1 << 1;
        const JS = 1 << 2;
        const HTML = 1 << 3;
        /// Include generic (no-domain) rules.
        const GENERIC = 1 << 4;
    }
}

impl Default for CosmeticOption {
    fn default() -> Self {
        Self::all()
    }
}

/// One rule kind's index.
#[derive(Debug, Default)]
struct CosmeticLookupTable {
    by_hostname: HashMap<String, Vec<CosmeticRule>>,
    wildcard: Vec<CosmeticRule>,
    generic: Vec<CosmeticRule>,
    /// Exceptions, keyed by rule content.
    whitelist: HashMap<String, Vec<CosmeticRule>>,
}

impl CosmeticLookupTable {
    fn add(&mut self, rule: &CosmeticRule) {
        if rule.is_whitelist() {
            self.whitelist
                .entry(rule.content().to_string())
                .or_default()
                .push(rule.clone());
            return;
        }
        if rule.is_generic() {
            self.generic.push(rule.clone());
            return;
        }
        if rule.has_wildcard_domain() {
            self.wildcard.push(rule.clone());
            return;
        }
        for domain in rule.permitted_domains() {
            self.by_hostname
                .entry(domain.clone())
                .or_default()
                .push(rule.clone());
        }
    }

    fn is_whitelisted(&self, hostname: &str, rule: &CosmeticRule) -> bool {
        self.whitelist
            .get(rule.content())
            .is_some_and(|exceptions| exceptions.iter().any(|w| w.matches_hostname(hostname)))
    }

    fn find<'a>(&'a self, hostname: &str, include_generic: bool) -> Vec<&'a CosmeticRule> {
        let mut result: Vec<&CosmeticRule> = Vec::new();

        for suffix in crate::url::walk_host_suffixes(hostname) {
            if let Some(rules) = self.by_hostname.get(suffix) {
                result.extend(rules.iter().filter(|r| r.matches_hostname(hostname)));
            }
        }

        result.extend(self.wildcard.iter().filter(|r| r.matches_hostname(hostname)));

        if include_generic {
            result.extend(self.generic.iter().filter(|r| r.matches_hostname(hostname)));
        }

        result.retain(|r| !self.is_whitelisted(hostname, r));
        result
    }
}

/// Rules applicable to one hostname, split generic/specific per kind.
#[derive(Debug, Default)]
pub struct CosmeticRuleSet<'a> {
    pub generic: Vec<&'a CosmeticRule>,
    pub specific: Vec<&'a CosmeticRule>,
}

impl<'a> CosmeticRuleSet<'a> {
    fn from_rules(rules: Vec<&'a CosmeticRule>) -> Self {
        let (generic, specific) = rules.into_iter().partition(|r| r.is_generic());
        Self { generic, specific }
    }

    pub fn is_empty(&self) -> bool {
        self.generic.is_empty() && self.specific.is_empty()
    }

    pub fn len(&self) -> usize {
        self.generic.len() + self.specific.len()
    }
}

/// Everything cosmetic that applies to one hostname.
#[derive(Debug, Default)]
pub struct CosmeticResult<'a> {
    pub element_hiding: CosmeticRuleSet<'a>,
    pub css: CosmeticRuleSet<'a>,
    pub js: CosmeticRuleSet<'a>,
    pub html: CosmeticRuleSet<'a>,
}

/// Hostname → cosmetic rules index.
#[derive(Debug, Default)]
pub struct CosmeticEngine {
    element_hiding: CosmeticLookupTable,
    css: CosmeticLookupTable,
    js: CosmeticLookupTable,
    html: CosmeticLookupTable,
    rules_count: usize,
}

impl CosmeticEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rules_count(&self) -> usize {
        self.rules_count
    }

    pub fn add_rule(&mut self, rule: &CosmeticRule) {
        self.rules_count += 1;
        self.table_mut(rule.rule_type()).add(rule);
    }

    fn table_mut(&mut self, rule_type: CosmeticRuleType) -> &mut CosmeticLookupTable {
        match rule_type {
            CosmeticRuleType::ElementHiding => &mut self.element_hiding,
            CosmeticRuleType::Css => &mut self.css,
            CosmeticRuleType::Js => &mut self.js,
            CosmeticRuleType::Html => &mut self.html,
        }
    }

    /// All rules applying to `hostname`, restricted by `options`.
    pub fn match_hostname(&self, hostname: &str, options: CosmeticOption) -> CosmeticResult<'_> {
        let include_generic = options.contains(CosmeticOption::GENERIC);
        let mut result = CosmeticResult::default();

        if options.contains(CosmeticOption::ELEMENT_HIDING) {
            result.element_hiding =
                CosmeticRuleSet::from_rules(self.element_hiding.find(hostname, include_generic));
        }
        if options.contains(CosmeticOption::CSS) {
            result.css = CosmeticRuleSet::from_rules(self.css.find(hostname, include_generic));
        }
        if options.contains(CosmeticOption::JS) {
            result.js = CosmeticRuleSet::from_rules(self.js.find(hostname, include_generic));
        }
        if options.contains(CosmeticOption::HTML) {
            result.html = CosmeticRuleSet::from_rules(self.html.find(hostname, include_generic));
        }

        result
    }
}
