//! Matching-result reducer
//!
//! Takes every network rule that matched a request (plus the rules matched
//! for its source document) and reduces them to one actionable verdict.
//! The reducer is idempotent over duplicates and independent of input
//! order: within a precedence category the highest storage index wins.

use std::collections::HashSet;

use crate::engine::cosmetic::CosmeticOption;
use crate::engine::network::RuleMatch;
use crate::rules::{AdvancedModifier, NetworkRule, NetworkRuleOption};

/// The reduced verdict for one request.
#[derive(Debug, Default)]
pub struct MatchingResult<'a> {
    /// Winning basic rule (block or exception), if any.
    pub basic_rule: Option<RuleMatch<'a>>,
    /// Document-level exception from the source frame, if any.
    pub document_rule: Option<RuleMatch<'a>>,
    pub csp_rules: Vec<RuleMatch<'a>>,
    pub replace_rules: Vec<RuleMatch<'a>>,
    pub cookie_rules: Vec<RuleMatch<'a>>,
    pub stealth_rules: Vec<RuleMatch<'a>>,
    pub redirect_rule: Option<RuleMatch<'a>>,
}

impl<'a> MatchingResult<'a> {
    /// Reduce `rules` (matched for the request) and `source_rules` (matched
    /// for the source document URL) to a verdict.
    pub fn new(rules: Vec<RuleMatch<'a>>, source_rules: Vec<RuleMatch<'a>>) -> Self {
        let mut result = Self::default();

        result.document_rule = pick_document_rule(&source_rules);

        // Basic-rule candidates, bucketed by (important, whitelist).
        let mut important_whitelist: Option<RuleMatch<'a>> = None;
        let mut important_block: Option<RuleMatch<'a>> = None;
        let mut whitelist: Option<RuleMatch<'a>> = None;
        let mut block: Option<RuleMatch<'a>> = None;

        let mut seen = HashSet::new();
        for m in rules {
            // Duplicates are expected: one rule can surface through several
            // index windows.
            if !seen.insert(m.index) {
                continue;
            }

            if m.rule.is_option_enabled(NetworkRuleOption::STEALTH) {
                result.stealth_rules.push(m);
                continue;
            }

            match m.rule.advanced_modifier() {
                Some(AdvancedModifier::Csp(_)) => {
                    result.csp_rules.push(m);
                    continue;
                }
                Some(AdvancedModifier::Replace(_)) => {
                    result.replace_rules.push(m);
                    continue;
                }
                Some(AdvancedModifier::Cookie(_)) => {
                    result.cookie_rules.push(m);
                    continue;
                }
                Some(AdvancedModifier::Redirect(_)) => {
                    let slot = &mut result.redirect_rule;
                    if !m.rule.is_whitelist() && slot.map_or(true, |r| m.index > r.index) {
                        *slot = Some(m);
                    }
                    continue;
                }
                None => {}
            }

            let slot = match (m.rule.is_important(), m.rule.is_whitelist()) {
                (true, true) => &mut important_whitelist,
                (true, false) => &mut important_block,
                (false, true) => &mut whitelist,
                (false, false) => &mut block,
            };
            if slot.map_or(true, |r| m.index > r.index) {
                *slot = Some(m);
            }
        }

        // Precedence: important whitelist > important block > whitelist >
        // block.
        result.basic_rule = important_whitelist
            .or(important_block)
            .or(whitelist)
            .or(block);

        filter_negated_modifiers(&mut result.csp_rules);
        filter_negated_modifiers(&mut result.replace_rules);
        sort_by_index(&mut result.csp_rules);
        sort_by_index(&mut result.replace_rules);
        sort_by_index(&mut result.cookie_rules);
        sort_by_index(&mut result.stealth_rules);

        result
    }

    /// The rule deciding the request's fate. A document-level allowlist on
    /// the source short-circuits everything except an `$important` block.
    pub fn get_basic_result(&self) -> Option<&NetworkRule> {
        if let Some(doc) = &self.document_rule {
            // Cosmetic-only exceptions (e.g. $generichide) never allowlist
            // network blocking.
            if doc.rule.is_document_level_whitelist() {
                let important_block = self
                    .basic_rule
                    .as_ref()
                    .is_some_and(|b| b.rule.is_important() && !b.rule.is_whitelist());
                if !important_block {
                    return Some(doc.rule);
                }
            }
        }
        self.basic_rule.as_ref().map(|m| m.rule)
    }

    /// Whether the verdict is "block the request".
    pub fn should_block(&self) -> bool {
        self.get_basic_result().is_some_and(|r| !r.is_whitelist())
    }

    /// Whether an exception rule allowlisted the request or its document.
    pub fn is_allowlisted(&self) -> bool {
        self.get_basic_result().is_some_and(NetworkRule::is_whitelist)
    }

    /// Cosmetic kinds still applicable given the matched exception rules.
    pub fn get_cosmetic_option(&self) -> CosmeticOption {
        let mut option = CosmeticOption::all();

        let mut apply = |rule: &NetworkRule| {
            if !rule.is_whitelist() {
                return;
            }
            if rule.is_option_enabled(NetworkRuleOption::DOCUMENT) {
                option = CosmeticOption::empty();
            }
            if rule.is_option_enabled(NetworkRuleOption::ELEMHIDE) {
                option.remove(CosmeticOption::ELEMENT_HIDING | CosmeticOption::CSS);
            }
            if rule.is_option_enabled(NetworkRuleOption::GENERICHIDE) {
                option.remove(CosmeticOption::GENERIC);
            }
        };

        if let Some(doc) = &self.document_rule {
            apply(doc.rule);
        }
        if let Some(basic) = &self.basic_rule {
            apply(basic.rule);
        }

        option
    }
}

/// The most specific document-level exception among the source rules:
/// full `$document` beats partial options, then highest index.
fn pick_document_rule<'a>(source_rules: &[RuleMatch<'a>]) -> Option<RuleMatch<'a>> {
    let mut best: Option<(u8, RuleMatch<'a>)> = None;
    for m in source_rules {
        if !m.rule.is_document_level_whitelist() && !m.rule.is_cosmetic_whitelist() {
            continue;
        }
        let specificity = if m.rule.is_option_enabled(NetworkRuleOption::DOCUMENT) {
            2
        } else {
            1
        };
        let better = match &best {
            None => true,
            Some((s, b)) => specificity > *s || (specificity == *s && m.index > b.index),
        };
        if better {
            best = Some((specificity, *m));
        }
    }
    best.map(|(_, m)| m)
}

/// Drop modifier rules negated by a matching exception: an exception with
/// the same modifier value kills that value, an exception with an empty
/// value kills them all.
fn filter_negated_modifiers(rules: &mut Vec<RuleMatch<'_>>) {
    let disabled: Vec<String> = rules
        .iter()
        .filter(|m| m.rule.is_whitelist())
        .filter_map(|m| modifier_value(m.rule))
        .collect();
    let disable_all = disabled.iter().any(String::is_empty);

    rules.retain(|m| {
        if m.rule.is_whitelist() {
            return false;
        }
        if disable_all {
            return false;
        }
        match modifier_value(m.rule) {
            Some(value) => !disabled.contains(&value),
            None => true,
        }
    });
}

fn modifier_value(rule: &NetworkRule) -> Option<String> {
    match rule.advanced_modifier() {
        Some(AdvancedModifier::Csp(v)) | Some(AdvancedModifier::Replace(v)) => Some(v.clone()),
        _ => None,
    }
}

fn sort_by_index(rules: &mut [RuleMatch<'_>]) {
    rules.sort_by_key(|m| m.index);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::NetworkRule;

    struct Rules(Vec<(u64, NetworkRule)>);

    impl Rules {
        fn parse(texts: &[&str]) -> Self {
            Self(
                texts
                    .iter()
                    .enumerate()
                    .map(|(i, t)| (i as u64, NetworkRule::parse(t, 1).expect("rule must parse")))
                    .collect(),
            )
        }

        fn matches(&self) -> Vec<RuleMatch<'_>> {
            self.0
                .iter()
                .map(|(index, rule)| RuleMatch { index: *index, rule })
                .collect()
        }
    }

    #[test]
    fn test_single_block() {
        let rules = Rules::parse(&["||example.org^"]);
        let result = MatchingResult::new(rules.matches(), Vec::new());
        assert!(result.should_block());
        assert!(!result.is_allowlisted());
    }

    #[test]
    fn test_whitelist_beats_block() {
        let rules = Rules::parse(&["||example.org^", "@@||example.org^"]);
        let result = MatchingResult::new(rules.matches(), Vec::new());
        assert!(!result.should_block());
        assert!(result.is_allowlisted());
    }

    #[test]
    fn test_important_block_beats_whitelist() {
        // S3: important block wins over a plain exception.
        let rules = Rules::parse(&["||tracker.example.com^$important", "@@||tracker.example.com^"]);
        let result = MatchingResult::new(rules.matches(), Vec::new());
        assert!(result.should_block());
    }

    #[test]
    fn test_important_whitelist_beats_important_block() {
        let rules = Rules::parse(&[
            "||example.org^$important",
            "@@||example.org^$important",
        ]);
        let result = MatchingResult::new(rules.matches(), Vec::new());
        assert!(!result.should_block());
        assert!(result.is_allowlisted());
    }

    #[test]
    fn test_tie_break_by_index() {
        let rules = Rules::parse(&["||example.org^", "||example.org^$script"]);
        let result = MatchingResult::new(rules.matches(), Vec::new());
        assert_eq!(
            result.basic_rule.map(|m| m.index),
            Some(1),
            "highest storage index wins inside a category"
        );
    }

    #[test]
    fn test_order_independence() {
        let rules = Rules::parse(&[
            "||example.org^",
            "@@||example.org^",
            "||example.org^$important",
            "||example.org^$cookie=x",
        ]);
        let forward = MatchingResult::new(rules.matches(), Vec::new());

        let mut reversed_input = rules.matches();
        reversed_input.reverse();
        let reversed = MatchingResult::new(reversed_input, Vec::new());

        assert_eq!(
            forward.basic_rule.map(|m| m.index),
            reversed.basic_rule.map(|m| m.index)
        );
        assert_eq!(forward.should_block(), reversed.should_block());
        assert_eq!(
            forward.cookie_rules.iter().map(|m| m.index).collect::<Vec<_>>(),
            reversed.cookie_rules.iter().map(|m| m.index).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_duplicates_are_idempotent() {
        let rules = Rules::parse(&["||example.org^"]);
        let mut input = rules.matches();
        input.extend(rules.matches());
        input.extend(rules.matches());
        let result = MatchingResult::new(input, Vec::new());
        assert!(result.should_block());
        assert!(result.cookie_rules.is_empty());
    }

    #[test]
    fn test_document_allowlist() {
        // S2: a $document exception on the source allowlists the request.
        let rules = Rules::parse(&["||example.org^"]);
        let source = Rules::parse(&["@@||example.org^$document"]);
        let result = MatchingResult::new(rules.matches(), source.matches());
        assert!(!result.should_block());
        assert!(result.is_allowlisted());
        assert!(result.get_cosmetic_option().is_empty());
    }

    #[test]
    fn test_modifier_collection() {
        let rules = Rules::parse(&[
            "||example.org^$cookie=a",
            "||example.org^$cookie=b",
            "||example.org^$csp=script-src 'none'",
        ]);
        let result = MatchingResult::new(rules.matches(), Vec::new());
        assert_eq!(result.cookie_rules.len(), 2);
        assert_eq!(result.csp_rules.len(), 1);
        assert!(!result.should_block());
    }

    #[test]
    fn test_whitelist_csp_negates_matching_value() {
        let rules = Rules::parse(&[
            "||example.org^$csp=script-src 'none'",
            "@@||example.org^$csp=script-src 'none'",
            "||example.org^$csp=img-src 'none'",
        ]);
        let result = MatchingResult::new(rules.matches(), Vec::new());
        assert_eq!(result.csp_rules.len(), 1);
        assert!(matches!(
            result.csp_rules[0].rule.advanced_modifier(),
            Some(AdvancedModifier::Csp(v)) if v == "img-src 'none'"
        ));
    }

    #[test]
    fn test_whitelist_csp_empty_negates_all() {
        let rules = Rules::parse(&[
            "||example.org^$csp=script-src 'none'",
            "@@||example.org^$csp",
        ]);
        let result = MatchingResult::new(rules.matches(), Vec::new());
        assert!(result.csp_rules.is_empty());
    }

    #[test]
    fn test_redirect_highest_index() {
        let rules = Rules::parse(&[
            "||example.org^$redirect=noopjs",
            "||example.org^$redirect=nooptext",
        ]);
        let result = MatchingResult::new(rules.matches(), Vec::new());
        assert_eq!(result.redirect_rule.map(|m| m.index), Some(1));
    }

    #[test]
    fn test_generichide_option() {
        let source = Rules::parse(&["@@||example.org^$generichide"]);
        let result = MatchingResult::new(Vec::new(), source.matches());
        let option = result.get_cosmetic_option();
        assert!(!option.contains(CosmeticOption::GENERIC));
        assert!(option.contains(CosmeticOption::ELEMENT_HIDING));
    }

    #[test]
    fn test_elemhide_option() {
        let source = Rules::parse(&["@@||example.org^$elemhide"]);
        let result = MatchingResult::new(Vec::new(), source.matches());
        let option = result.get_cosmetic_option();
        assert!(!option.contains(CosmeticOption::ELEMENT_HIDING));
        assert!(option.contains(CosmeticOption::JS));
    }

    #[test]
    fn test_empty_input() {
        let result = MatchingResult::new(Vec::new(), Vec::new());
        assert!(!result.should_block());
        assert!(!result.is_allowlisted());
        assert!(result.get_basic_result().is_none());
    }
}
