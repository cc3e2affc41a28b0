//! Rule scanner
//!
//! Drives a line reader through the parser, yielding `IndexedRule`s. The
//! scanner is a forward, single-pass, non-restartable sequence with an
//! explicit current-rule slot: `scan()` advances, `rule()` reads.
//!
//! The index of a rule is the byte offset of its line within the source
//! text (UTF-8 byte length of every consumed line, newlines included) —
//! index 0 is valid. The storage-level scanner threads the list id into the
//! high bits of the index.

use std::net::IpAddr;

use log::debug;

use crate::filterlist::reader::{LineReader, StringLineReader};
use crate::filterlist::storage::{storage_index, FilterList};
use crate::rules::cosmetic::find_marker;
use crate::rules::{CosmeticRule, NetworkRule, Rule};

bitflags::bitflags! {
    /// What kinds of rules a scanner yields.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ScannerFlags: u8 {
        const NETWORK_RULES = 1 << 0;
        const COSMETIC_RULES = 1 << 1;
        /// Accept hosts-file lines (`IP HOSTNAME`), converted to
        /// `||HOSTNAME^` rules.
        const HOST_RULES = 1 << 2;
    }
}

impl Default for ScannerFlags {
    fn default() -> Self {
        Self::NETWORK_RULES | Self::COSMETIC_RULES
    }
}

/// A rule plus its stable index.
#[derive(Debug, Clone)]
pub struct IndexedRule {
    pub rule: Rule,
    pub index: u64,
}

/// Scans one list.
pub struct RuleScanner<R: LineReader> {
    reader: R,
    list_id: i32,
    flags: ScannerFlags,
    current: Option<IndexedRule>,
    current_pos: u64,
}

impl<R: LineReader> RuleScanner<R> {
    pub fn new(reader: R, list_id: i32, flags: ScannerFlags) -> Self {
        Self {
            reader,
            list_id,
            flags,
            current: None,
            current_pos: 0,
        }
    }

    /// Advance to the next rule. Returns false when the list is exhausted.
    pub fn scan(&mut self) -> bool {
        loop {
            let line_start = self.current_pos;
            let Some(line) = self.reader.read_line() else {
                self.current = None;
                return false;
            };
            let line_len = line.len() as u64;

            let parsed = parse_line(line, self.list_id, self.flags);
            self.current_pos = line_start + line_len;

            if let Some(rule) = parsed {
                self.current = Some(IndexedRule {
                    rule,
                    index: line_start,
                });
                return true;
            }
        }
    }

    /// The rule `scan()` stopped on.
    pub fn rule(&self) -> Option<&IndexedRule> {
        self.current.as_ref()
    }
}

/// Classify and parse one line. `None` means skip: blank, comment,
/// filtered-out kind, or syntax error (logged).
fn parse_line(line: &str, list_id: i32, flags: ScannerFlags) -> Option<Rule> {
    let trimmed = line.trim();
    if trimmed.is_empty() || is_comment(trimmed, flags) {
        return None;
    }

    if find_marker(trimmed).is_some() {
        if !flags.contains(ScannerFlags::COSMETIC_RULES) {
            return None;
        }
        return match CosmeticRule::parse(trimmed, list_id) {
            Ok(rule) => Some(Rule::Cosmetic(rule)),
            Err(e) => {
                debug!("skipping cosmetic rule: {e}");
                None
            }
        };
    }

    if !flags.contains(ScannerFlags::NETWORK_RULES) {
        return None;
    }

    if flags.contains(ScannerFlags::HOST_RULES) {
        if let Some(host) = parse_hosts_line(trimmed) {
            return match NetworkRule::parse(&format!("||{host}^"), list_id) {
                Ok(rule) => Some(Rule::Network(rule)),
                Err(e) => {
                    debug!("skipping hosts rule: {e}");
                    None
                }
            };
        }
    }

    match NetworkRule::parse(trimmed, list_id) {
        Ok(rule) => Some(Rule::Network(rule)),
        Err(e) => {
            debug!("skipping network rule: {e}");
            None
        }
    }
}

fn is_comment(trimmed: &str, flags: ScannerFlags) -> bool {
    if trimmed.starts_with('!') {
        return true;
    }
    if flags.contains(ScannerFlags::HOST_RULES) && trimmed.starts_with('#') {
        // Hosts files use `#` comments; cosmetic markers never start a
        // hosts line.
        return find_marker(trimmed).is_none() || trimmed.starts_with("# ");
    }
    trimmed == "#" || trimmed.starts_with("# ")
}

/// `IP HOSTNAME [# comment]` → hostname, or `None` if the line is not a
/// hosts entry.
fn parse_hosts_line(line: &str) -> Option<String> {
    let line = match line.find('#') {
        Some(i) => &line[..i],
        None => line,
    };

    let mut parts = line.split_whitespace();
    let first = parts.next()?;
    let second = parts.next()?;

    if first.parse::<IpAddr>().is_ok() {
        return normalize_domain(second);
    }

    None
}

fn normalize_domain(host: &str) -> Option<String> {
    let trimmed = host.trim().trim_matches('.');
    if trimmed.is_empty() {
        return None;
    }

    if !trimmed
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-' || b == b'_')
    {
        return None;
    }

    Some(trimmed.to_ascii_lowercase())
}

/// Scans every list in a storage, in order, combining each rule's in-list
/// offset with its list id into the full storage index.
pub struct RuleStorageScanner<'a> {
    scanners: Vec<(i32, RuleScanner<StringLineReader<'a>>)>,
    position: usize,
    current: Option<IndexedRule>,
}

impl<'a> RuleStorageScanner<'a> {
    pub fn new(lists: &'a [FilterList], flags: ScannerFlags) -> Self {
        let scanners = lists
            .iter()
            .map(|list| {
                (
                    list.id,
                    RuleScanner::new(StringLineReader::new(&list.text), list.id, flags),
                )
            })
            .collect();
        Self {
            scanners,
            position: 0,
            current: None,
        }
    }

    pub fn scan(&mut self) -> bool {
        while self.position < self.scanners.len() {
            let (list_id, scanner) = &mut self.scanners[self.position];
            if scanner.scan() {
                self.current = scanner.rule().map(|ir| IndexedRule {
                    rule: ir.rule.clone(),
                    index: storage_index(*list_id, ir.index),
                });
                return true;
            }
            self.position += 1;
        }
        self.current = None;
        false
    }

    pub fn rule(&self) -> Option<&IndexedRule> {
        self.current.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filterlist::storage::{list_id_of, offset_of};

    fn scan_all(text: &str, flags: ScannerFlags) -> Vec<IndexedRule> {
        let mut scanner = RuleScanner::new(StringLineReader::new(text), 1, flags);
        let mut out = Vec::new();
        while scanner.scan() {
            if let Some(ir) = scanner.rule() {
                out.push(ir.clone());
            }
        }
        out
    }

    #[test]
    fn test_scanner_indexes() {
        // Network rule at 0, comment skipped, cosmetic rule at byte 21.
        let rules = scan_all("||example.org\n! test\n##banner", ScannerFlags::default());
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].index, 0);
        assert!(matches!(rules[0].rule, Rule::Network(_)));
        assert_eq!(rules[1].index, 21);
        assert!(matches!(rules[1].rule, Rule::Cosmetic(_)));
    }

    #[test]
    fn test_scanner_skips_bad_rules() {
        let rules = scan_all(
            "||good.com^\n||bad.com^$frobnicate\n||also-good.com^",
            ScannerFlags::default(),
        );
        assert_eq!(rules.len(), 2);
    }

    #[test]
    fn test_scanner_indexes_strictly_increasing() {
        let text = "||a.com^\n\n! c\n||b.com^\n##x\n@@||d.com^\n";
        let rules = scan_all(text, ScannerFlags::default());
        assert_eq!(rules.len(), 4);
        for pair in rules.windows(2) {
            assert!(pair[0].index < pair[1].index);
        }
    }

    #[test]
    fn test_scanner_byte_offsets_non_ascii() {
        // The comment is 9 bytes ("! célé\n" has two 2-byte chars) so the
        // next rule's index counts bytes, not characters.
        let text = "! célé\n||a.com^";
        let rules = scan_all(text, ScannerFlags::default());
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].index, "! célé\n".len() as u64);
    }

    #[test]
    fn test_scanner_ignore_cosmetic() {
        let rules = scan_all(
            "||a.com^\n##banner\n||b.com^",
            ScannerFlags::NETWORK_RULES,
        );
        assert_eq!(rules.len(), 2);
    }

    #[test]
    fn test_hosts_mode() {
        let flags = ScannerFlags::NETWORK_RULES | ScannerFlags::HOST_RULES;
        let rules = scan_all(
            "# hosts file\n0.0.0.0 ads.example.com\n127.0.0.1 tracker.net # inline\n",
            flags,
        );
        assert_eq!(rules.len(), 2);
        let Rule::Network(rule) = &rules[0].rule else {
            panic!("expected network rule");
        };
        assert_eq!(rule.text(), "||ads.example.com^");
    }

    #[test]
    fn test_hosts_mode_synthetic_completeness() {
        let flags = ScannerFlags::NETWORK_RULES | ScannerFlags::HOST_RULES;
        let mut text = String::from("# synthetic hosts\n");
        let count = 1000;
        for i in 0..count {
            text.push_str(&format!("0.0.0.0 host{i}.example\n"));
        }
        let rules = scan_all(&text, flags);
        assert_eq!(rules.len(), count);
        for pair in rules.windows(2) {
            assert!(pair[0].index < pair[1].index);
        }
    }

    #[test]
    fn test_storage_scanner_threads_list_id() {
        let lists = vec![
            FilterList::new(1, "||a.com^\n||b.com^"),
            FilterList::new(2, "||c.com^"),
        ];
        let mut scanner = RuleStorageScanner::new(&lists, ScannerFlags::default());
        let mut indexes = Vec::new();
        while scanner.scan() {
            if let Some(ir) = scanner.rule() {
                indexes.push(ir.index);
            }
        }
        assert_eq!(indexes.len(), 3);
        assert_eq!(list_id_of(indexes[0]), 1);
        assert_eq!(offset_of(indexes[0]), 0);
        assert_eq!(offset_of(indexes[1]), 9);
        assert_eq!(list_id_of(indexes[2]), 2);
        assert_eq!(offset_of(indexes[2]), 0);
    }
}
