//! Network rule index
//!
//! Three-tier placement: a rule goes into the shortcut table when it has a
//! usable 5-byte shortcut (the histogram picks the least-crowded window),
//! else into the domain table under each of its permitted domains, else
//! into the flat fallback list.
//!
//! Matching is the hot path: a windowed djb2 scan over the lowercased URL
//! (capped at 4096 bytes), a suffix walk of the source hostname for the
//! domain table, then the fallback sweep. The same rule can surface through
//! several windows; the reducer downstream is idempotent, so duplicates are
//! fine here.

use std::collections::HashMap;

use crate::filterlist::storage::RuleStorage;
use crate::hash::{djb2_range, hash_domain};
use crate::request::Request;
use crate::rules::NetworkRule;
use crate::url::walk_host_suffixes;

/// Length of the shortcut index key.
pub const SHORTCUT_LENGTH: usize = 5;

/// The windowed URL scan never looks past this many bytes.
pub const MAX_URL_SCAN_LENGTH: usize = 4096;

/// A matched rule together with its storage index.
#[derive(Debug, Clone, Copy)]
pub struct RuleMatch<'a> {
    pub index: u64,
    pub rule: &'a NetworkRule,
}

/// Shortcut + domain + fallback index over network rules.
#[derive(Debug, Default)]
pub struct NetworkEngine {
    shortcuts: HashMap<u32, Vec<u64>>,
    /// How many rules landed on each shortcut hash; drives placement.
    histogram: HashMap<u32, u32>,
    domains: HashMap<u32, Vec<u64>>,
    other_rules: Vec<u64>,
    rules_count: usize,
}

impl NetworkEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rules accepted into the index.
    pub fn rules_count(&self) -> usize {
        self.rules_count
    }

    pub fn add_rule(&mut self, rule: &NetworkRule, index: u64) {
        self.rules_count += 1;

        let hashes = rule_shortcut_hashes(rule);
        if !hashes.is_empty() {
            // Pick the least-used window; first encountered wins ties.
            let mut best = hashes[0];
            let mut best_count = self.histogram.get(&best).copied().unwrap_or(0);
            for &h in &hashes[1..] {
                let count = self.histogram.get(&h).copied().unwrap_or(0);
                if count < best_count {
                    best = h;
                    best_count = count;
                }
            }
            *self.histogram.entry(best).or_insert(0) += 1;
            self.shortcuts.entry(best).or_default().push(index);
            return;
        }

        if !rule.permitted_domains().is_empty() {
            for domain in rule.permitted_domains() {
                self.domains
                    .entry(hash_domain(domain))
                    .or_default()
                    .push(index);
            }
            return;
        }

        if !self.other_rules.contains(&index) {
            self.other_rules.push(index);
        }
    }

    /// All rules matching the request, shortcut hits first, then domain
    /// hits, then the fallback sweep. May contain duplicates.
    pub fn match_all<'a>(&self, request: &Request, storage: &'a RuleStorage) -> Vec<RuleMatch<'a>> {
        let mut matches = Vec::new();
        if request.url.is_empty() {
            return matches;
        }

        let url = request.url_lowercase.as_bytes();
        let scan_len = url.len().min(MAX_URL_SCAN_LENGTH);
        if scan_len >= SHORTCUT_LENGTH {
            for i in 0..=(scan_len - SHORTCUT_LENGTH) {
                let hash = djb2_range(url, i, i + SHORTCUT_LENGTH);
                self.collect(&self.shortcuts, hash, request, storage, &mut matches);
            }
        }

        if let Some(source) = request.source_hostname.as_deref() {
            for suffix in walk_host_suffixes(source) {
                self.collect(&self.domains, hash_domain(suffix), request, storage, &mut matches);
            }
        }

        for &index in &self.other_rules {
            if let Some(rule) = storage.retrieve_network(index) {
                if rule.matches(request) {
                    matches.push(RuleMatch { index, rule });
                }
            }
        }

        matches
    }

    fn collect<'a>(
        &self,
        table: &HashMap<u32, Vec<u64>>,
        hash: u32,
        request: &Request,
        storage: &'a RuleStorage,
        matches: &mut Vec<RuleMatch<'a>>,
    ) {
        let Some(candidates) = table.get(&hash) else {
            return;
        };
        for &index in candidates {
            // A missing index means the rule was dropped; tolerate it.
            if let Some(rule) = storage.retrieve_network(index) {
                if rule.matches(request) {
                    matches.push(RuleMatch { index, rule });
                }
            }
        }
    }
}

/// Hashes of every `SHORTCUT_LENGTH`-byte window of the rule's shortcut, or
/// empty when the shortcut cannot key the index.
fn rule_shortcut_hashes(rule: &NetworkRule) -> Vec<u32> {
    let shortcut = rule.shortcut().as_bytes();
    if shortcut.len() < SHORTCUT_LENGTH || is_any_url_shortcut(rule) {
        return Vec::new();
    }
    (0..=(shortcut.len() - SHORTCUT_LENGTH))
        .map(|i| djb2_range(shortcut, i, i + SHORTCUT_LENGTH))
        .collect()
}

/// Shortcuts that would catch effectively every URL make useless index
/// keys: bare scheme prefixes.
fn is_any_url_shortcut(rule: &NetworkRule) -> bool {
    let shortcut = rule.shortcut();
    if shortcut.len() < 6 && shortcut.starts_with("ws:") {
        return true;
    }
    if shortcut.len() < 7 && shortcut.starts_with("|ws") {
        return true;
    }
    if shortcut.len() < 9 && shortcut.starts_with("http") {
        return true;
    }
    if shortcut.len() < 10 && shortcut.starts_with("|http") {
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filterlist::storage::FilterList;
    use crate::request::RequestType;
    use crate::rules::Rule;

    /// Parse rules, store them at synthetic indexes, index them.
    fn build(rules: &[&str]) -> (NetworkEngine, RuleStorage) {
        let mut engine = NetworkEngine::new();
        let mut storage = RuleStorage::new(vec![FilterList::new(1, String::new())]);
        for (i, text) in rules.iter().enumerate() {
            let rule = NetworkRule::parse(text, 1).expect("test rule must parse");
            let index = i as u64;
            engine.add_rule(&rule, index);
            storage.insert(index, Rule::Network(rule));
        }
        (engine, storage)
    }

    #[test]
    fn test_match_simple_block() {
        let (engine, storage) = build(&["||example.org^"]);
        let request = Request::new("https://example.org/", None, RequestType::Document);
        let matches = engine.match_all(&request, &storage);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].rule.text(), "||example.org^");
    }

    #[test]
    fn test_no_match() {
        let (engine, storage) = build(&["||example.org^"]);
        let request = Request::new("https://other.net/", None, RequestType::Document);
        assert!(engine.match_all(&request, &storage).is_empty());
    }

    #[test]
    fn test_rules_count() {
        let (engine, _) = build(&["||a.com^", "||b.com^$domain=c.com", "*$script"]);
        assert_eq!(engine.rules_count(), 3);
    }

    #[test]
    fn test_duplicate_rule_counted_twice() {
        let (mut engine, mut storage) = build(&["||example.org^"]);
        let rule = NetworkRule::parse("||example.org^", 1).unwrap();
        engine.add_rule(&rule, 100);
        storage.insert(100, Rule::Network(rule));
        assert_eq!(engine.rules_count(), 2);

        let request = Request::new("https://example.org/", None, RequestType::Document);
        let matches = engine.match_all(&request, &storage);
        // Two distinct storage entries, both match.
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn test_domain_table_placement() {
        // No usable shortcut ("ads" is under 5 bytes), has a permitted
        // domain: rule must surface through the source hostname walk.
        let (engine, storage) = build(&["ads$domain=example.com,image"]);
        let request = Request::new(
            "https://cdn.net/ads/pixel.png",
            Some("https://sub.example.com/"),
            RequestType::Image,
        );
        let matches = engine.match_all(&request, &storage);
        assert_eq!(matches.len(), 1);

        let request = Request::new(
            "https://cdn.net/ads/pixel.png",
            Some("https://other.org/"),
            RequestType::Image,
        );
        assert!(engine.match_all(&request, &storage).is_empty());
    }

    #[test]
    fn test_fallback_placement() {
        // Short shortcut, no domains: fallback list.
        let (engine, storage) = build(&["ads$image"]);
        let request = Request::new("https://cdn.net/ads/a.png", None, RequestType::Image);
        assert_eq!(engine.match_all(&request, &storage).len(), 1);
    }

    #[test]
    fn test_scheme_shortcut_rejected() {
        // An 8-byte "https://" shortcut catches everything; the rule must
        // not enter the shortcut table (it lands in the fallback list and
        // still matches).
        let (engine, storage) = build(&["|https://$script"]);
        assert!(engine.shortcuts.is_empty());
        let request = Request::new("https://example.com/a.js", None, RequestType::Script);
        assert_eq!(engine.match_all(&request, &storage).len(), 1);
    }

    #[test]
    fn test_histogram_prefers_least_used_window() {
        // Both rules share the "examp" window family; after the first
        // insert the second should pick a different, unused window.
        let (engine, _) = build(&["||example.org^", "||example.net^"]);
        assert!(engine.shortcuts.len() >= 2);
        for bucket in engine.shortcuts.values() {
            assert_eq!(bucket.len(), 1);
        }
    }

    #[test]
    fn test_url_scan_cap() {
        let (engine, storage) = build(&["needle12345"]);

        // Shortcut appears only beyond the 4096-byte cap: not found.
        let mut long_url = String::from("https://example.com/");
        long_url.push_str(&"x".repeat(5000));
        long_url.push_str("needle12345");
        let request = Request::new(&long_url, None, RequestType::Other);
        assert!(engine.match_all(&request, &storage).is_empty());

        // Same rule within the cap: found.
        let request = Request::new(
            "https://example.com/needle12345",
            None,
            RequestType::Other,
        );
        assert_eq!(engine.match_all(&request, &storage).len(), 1);
    }

    #[test]
    fn test_lookup_miss_tolerated() {
        let mut engine = NetworkEngine::new();
        let storage = RuleStorage::new(Vec::new());
        let rule = NetworkRule::parse("||example.org^", 1).unwrap();
        // Indexed but never stored.
        engine.add_rule(&rule, 42);
        let request = Request::new("https://example.org/", None, RequestType::Document);
        assert!(engine.match_all(&request, &storage).is_empty());
    }
}
