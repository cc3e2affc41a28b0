//! Engine facade
//!
//! Owns the rule storage and both indexes. Loading scans the storage once
//! and places every rule; after that the indexes are read-only and all
//! matching operations are synchronous and re-entrant.

pub mod cookie_filtering;
pub mod cosmetic;
pub mod matching_result;
pub mod network;

use log::{debug, info};

use crate::config::EngineConfig;
use crate::error::FilterError;
use crate::filterlist::scanner::{IndexedRule, ScannerFlags};
use crate::filterlist::storage::RuleStorage;
use crate::request::{Request, RequestType};
use crate::rules::Rule;

use cosmetic::{CosmeticEngine, CosmeticOption, CosmeticResult};
use matching_result::MatchingResult;
use network::NetworkEngine;

/// The content-blocking engine: storage + network index + cosmetic index.
pub struct Engine {
    storage: RuleStorage,
    config: EngineConfig,
    scanner_flags: ScannerFlags,
    network: NetworkEngine,
    cosmetic: CosmeticEngine,
}

impl Engine {
    /// Build an engine and index the storage immediately.
    pub fn new(storage: RuleStorage, config: EngineConfig) -> Self {
        let mut engine = Self::deferred(storage, config);
        engine.load_rules();
        engine
    }

    /// Build an engine with empty indexes; call [`Engine::load_rules`] (or
    /// the chunked variant) before matching.
    pub fn deferred(storage: RuleStorage, config: EngineConfig) -> Self {
        Self {
            storage,
            config,
            scanner_flags: ScannerFlags::default(),
            network: NetworkEngine::new(),
            cosmetic: CosmeticEngine::new(),
        }
    }

    /// Change what the loader scans for (e.g. enable hosts-file syntax).
    /// Only affects subsequent `load_rules*` calls.
    pub fn set_scanner_flags(&mut self, flags: ScannerFlags) {
        self.scanner_flags = flags;
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Scan the storage and index every rule, synchronously.
    pub fn load_rules(&mut self) {
        let scanned = self.scan_all();
        for indexed in scanned {
            self.index_rule(indexed);
        }
        info!(
            "loaded {} rules ({} network, {} cosmetic)",
            self.rules_count(),
            self.network.rules_count(),
            self.cosmetic.rules_count()
        );
    }

    /// Like [`Engine::load_rules`], but invokes `yield_fn` after every
    /// `chunk_size` rules so a cooperative host can stay responsive.
    pub fn load_rules_chunked(
        &mut self,
        chunk_size: usize,
        mut yield_fn: impl FnMut(),
    ) -> Result<(), FilterError> {
        if chunk_size == 0 {
            return Err(FilterError::InvalidConfiguration(
                "chunk size must be positive".to_string(),
            ));
        }

        let scanned = self.scan_all();
        for (i, indexed) in scanned.into_iter().enumerate() {
            if i > 0 && i % chunk_size == 0 {
                yield_fn();
            }
            self.index_rule(indexed);
        }
        Ok(())
    }

    fn scan_all(&self) -> Vec<IndexedRule> {
        let mut scanner = self.storage.create_scanner(self.scanner_flags);
        let mut scanned = Vec::new();
        while scanner.scan() {
            if let Some(indexed) = scanner.rule() {
                scanned.push(indexed.clone());
            }
        }
        scanned
    }

    fn index_rule(&mut self, indexed: IndexedRule) {
        if self.config.verbose {
            debug!("indexing rule {}: {}", indexed.index, indexed.rule.text());
        }
        match &indexed.rule {
            Rule::Network(rule) => self.network.add_rule(rule, indexed.index),
            Rule::Cosmetic(rule) => self.cosmetic.add_rule(rule),
        }
        self.storage.insert(indexed.index, indexed.rule);
    }

    /// Number of rules accepted into the indexes.
    pub fn rules_count(&self) -> usize {
        self.network.rules_count() + self.cosmetic.rules_count()
    }

    pub fn network_rules_count(&self) -> usize {
        self.network.rules_count()
    }

    pub fn cosmetic_rules_count(&self) -> usize {
        self.cosmetic.rules_count()
    }

    /// Match a request against the network index and reduce to a verdict.
    /// Degenerate input (empty URL) yields an empty result.
    pub fn match_request(&self, request: &Request) -> MatchingResult<'_> {
        if request.url.is_empty() {
            return MatchingResult::default();
        }

        let matches = self.network.match_all(request, &self.storage);

        let source_matches = match request.source_url.as_deref() {
            Some(source_url) if !source_url.is_empty() => {
                let source_request =
                    Request::new(source_url, Some(source_url), RequestType::Document);
                self.network.match_all(&source_request, &self.storage)
            }
            _ => Vec::new(),
        };

        MatchingResult::new(matches, source_matches)
    }

    /// Cosmetic rules applying to a hostname, restricted by `options`
    /// (typically `MatchingResult::get_cosmetic_option` of the document
    /// request).
    pub fn get_cosmetic_result(&self, hostname: &str, options: CosmeticOption) -> CosmeticResult<'_> {
        self.cosmetic.match_hostname(hostname, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filterlist::storage::FilterList;

    fn engine(lists: &[&str]) -> Engine {
        let lists = lists
            .iter()
            .enumerate()
            .map(|(i, text)| FilterList::new(i as i32 + 1, *text))
            .collect();
        Engine::new(RuleStorage::new(lists), EngineConfig::default())
    }

    #[test]
    fn test_s1_simple_block() {
        let engine = engine(&["||example.org^"]);
        let request = Request::new("https://example.org/", None, RequestType::Document);
        let result = engine.match_request(&request);
        assert!(result.should_block());
        assert!(result.get_basic_result().is_some());
    }

    #[test]
    fn test_s2_document_allowlist() {
        let engine = engine(&["||example.org^\n@@||example.org^$document"]);
        let request = Request::new(
            "https://example.org/",
            Some("https://example.org/"),
            RequestType::Document,
        );
        let result = engine.match_request(&request);
        assert!(!result.should_block());
        assert!(result.is_allowlisted());
    }

    #[test]
    fn test_s3_important_beats_whitelist() {
        let engine = engine(&[
            "||ads.example.com^\n||tracker.example.com^$important\n@@||tracker.example.com^",
        ]);
        let request = Request::new("https://tracker.example.com/", None, RequestType::Document);
        let result = engine.match_request(&request);
        assert!(result.should_block());
    }

    #[test]
    fn test_s4_cosmetic_exception() {
        let engine = engine(&["example.com##.banner\nexample.com#@#.banner"]);
        let result = engine.get_cosmetic_result("example.com", CosmeticOption::all());
        assert!(result.element_hiding.is_empty());
    }

    #[test]
    fn test_determinism() {
        let engine = engine(&["||example.org^\n@@||example.org^$script\n||example.org^$cookie=t"]);
        let request = Request::new("https://example.org/x.js", None, RequestType::Script);

        let first = engine.match_request(&request);
        for _ in 0..5 {
            let next = engine.match_request(&request);
            assert_eq!(first.should_block(), next.should_block());
            assert_eq!(
                first.get_basic_result().map(|r| r.text().to_string()),
                next.get_basic_result().map(|r| r.text().to_string())
            );
            assert_eq!(first.cookie_rules.len(), next.cookie_rules.len());
        }
    }

    #[test]
    fn test_rules_count() {
        let engine = engine(&["||a.com^\n! comment\n##banner\nbroken rule$unknownmod"]);
        assert_eq!(engine.rules_count(), 2);
        assert_eq!(engine.network_rules_count(), 1);
        assert_eq!(engine.cosmetic_rules_count(), 1);
    }

    #[test]
    fn test_deferred_load() {
        let storage = RuleStorage::new(vec![FilterList::new(1, "||example.org^")]);
        let mut engine = Engine::deferred(storage, EngineConfig::default());

        let request = Request::new("https://example.org/", None, RequestType::Document);
        assert!(!engine.match_request(&request).should_block());

        engine.load_rules();
        assert!(engine.match_request(&request).should_block());
    }

    #[test]
    fn test_chunked_load_yields() {
        let mut text = String::new();
        for i in 0..25 {
            text.push_str(&format!("||host{i}.example^\n"));
        }
        let storage = RuleStorage::new(vec![FilterList::new(1, text)]);
        let mut engine = Engine::deferred(storage, EngineConfig::default());

        let mut yields = 0;
        engine.load_rules_chunked(10, || yields += 1).unwrap();
        assert_eq!(yields, 2);
        assert_eq!(engine.rules_count(), 25);
    }

    #[test]
    fn test_chunked_load_zero_chunk_is_invalid() {
        let storage = RuleStorage::new(Vec::new());
        let mut engine = Engine::deferred(storage, EngineConfig::default());
        assert!(matches!(
            engine.load_rules_chunked(0, || {}),
            Err(FilterError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_empty_url_yields_empty_result() {
        let engine = engine(&["||example.org^"]);
        let request = Request::new("", None, RequestType::Document);
        let result = engine.match_request(&request);
        assert!(!result.should_block());
        assert!(result.get_basic_result().is_none());
    }

    #[test]
    fn test_hosts_mode_end_to_end() {
        let storage = RuleStorage::new(vec![FilterList::new(
            1,
            "# comment\n0.0.0.0 ads.example.com\n0.0.0.0 tracker.net\n",
        )]);
        let mut engine = Engine::deferred(storage, EngineConfig::default());
        engine.set_scanner_flags(ScannerFlags::NETWORK_RULES | ScannerFlags::HOST_RULES);
        engine.load_rules();

        assert_eq!(engine.rules_count(), 2);
        let request = Request::new("https://ads.example.com/pixel", None, RequestType::Image);
        assert!(engine.match_request(&request).should_block());
    }
}
