//! Network rule pattern compilation and matching
//!
//! A pattern is compiled once, at parse time, into a small token program:
//! literal runs, `*` wildcards and `^` separators, plus the three anchors
//! (`|` left, `|` right, `||` hostname). Matching walks the program over the
//! URL bytes; a wildcard clears the "anchored" state so the next literal is
//! located with a forward search instead of an exact compare.

use crate::url::{get_host_position, is_separator_char};

/// One step of a compiled pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PatternToken {
    /// Literal substring. Lowercased at compile time unless the rule is
    /// case-sensitive.
    Literal(String),
    /// `*` — skip any run of characters.
    Wildcard,
    /// `^` — exactly one separator character, or the end of the URL.
    Separator,
}

/// A compiled network rule pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    tokens: Vec<PatternToken>,
    left_anchor: bool,
    right_anchor: bool,
    host_anchor: bool,
}

impl Pattern {
    /// Compile a pattern string. `match_case` keeps literal case intact;
    /// otherwise literals are lowercased to match against the lowercased URL.
    pub fn compile(text: &str, match_case: bool) -> Self {
        let mut rest = text;
        let mut host_anchor = false;
        let mut left_anchor = false;
        let mut right_anchor = false;

        if let Some(stripped) = rest.strip_prefix("||") {
            host_anchor = true;
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix('|') {
            left_anchor = true;
            rest = stripped;
        }

        if let Some(stripped) = rest.strip_suffix('|') {
            right_anchor = true;
            rest = stripped;
        }

        let mut tokens = Vec::new();
        let mut literal = String::new();
        for ch in rest.chars() {
            match ch {
                '*' | '^' => {
                    if !literal.is_empty() {
                        tokens.push(PatternToken::Literal(std::mem::take(&mut literal)));
                    }
                    tokens.push(if ch == '*' {
                        PatternToken::Wildcard
                    } else {
                        PatternToken::Separator
                    });
                }
                _ => {
                    if match_case {
                        literal.push(ch);
                    } else {
                        literal.extend(ch.to_lowercase());
                    }
                }
            }
        }
        if !literal.is_empty() {
            tokens.push(PatternToken::Literal(literal));
        }

        Self {
            tokens,
            left_anchor,
            right_anchor,
            host_anchor,
        }
    }

    /// The longest literal run, lowercased. Used as the index shortcut.
    pub fn shortcut(&self) -> String {
        self.tokens
            .iter()
            .filter_map(|t| match t {
                PatternToken::Literal(s) => Some(s.as_str()),
                _ => None,
            })
            .max_by_key(|s| s.len())
            .map(|s| s.to_ascii_lowercase())
            .unwrap_or_default()
    }

    /// Match the pattern against a URL. The caller passes the original or
    /// the lowercased URL depending on the rule's case sensitivity.
    pub fn matches(&self, url: &str) -> bool {
        let bytes = url.as_bytes();

        if self.host_anchor {
            // `||` matches at the start of the hostname or at any label
            // boundary within it.
            let Some((host_start, host_end)) = get_host_position(url) else {
                return false;
            };
            let mut starts = vec![host_start];
            for i in (host_start + 1)..host_end {
                if bytes[i - 1] == b'.' {
                    starts.push(i);
                }
            }
            return starts
                .into_iter()
                .any(|start| self.match_from(bytes, start, true));
        }

        if self.left_anchor {
            return self.match_from(bytes, 0, true);
        }

        self.match_from(bytes, 0, false)
    }

    fn match_from(&self, bytes: &[u8], start: usize, mut anchored: bool) -> bool {
        let len = bytes.len();
        let mut pos = start;

        for token in &self.tokens {
            match token {
                PatternToken::Literal(lit) => {
                    let needle = lit.as_bytes();
                    if anchored {
                        if !bytes[pos..].starts_with(needle) {
                            return false;
                        }
                        pos += needle.len();
                    } else {
                        match find_bytes(&bytes[pos..], needle) {
                            Some(i) => pos += i + needle.len(),
                            None => return false,
                        }
                        anchored = true;
                    }
                }
                PatternToken::Wildcard => {
                    anchored = false;
                }
                PatternToken::Separator => {
                    if pos >= len {
                        // `^` matches the end of the URL, consuming nothing.
                        anchored = true;
                    } else if anchored {
                        if !is_separator_char(bytes[pos]) {
                            return false;
                        }
                        pos += 1;
                    } else {
                        match bytes[pos..].iter().position(|&b| is_separator_char(b)) {
                            Some(i) => pos += i + 1,
                            None => pos = len,
                        }
                        anchored = true;
                    }
                }
            }
        }

        !self.right_anchor || pos == len
    }
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    if needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
