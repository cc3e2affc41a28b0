//! Cookie filtering state machine
//!
//! `$cookie` rules act across both phases of an HTTP transaction. During
//! the request phase the `Cookie` header is examined: blocked cookies are
//! dropped from the header and scheduled for store removal, modifying rules
//! are scheduled for the response phase. During the response phase the
//! schedule is drained against the host's cookie store through the
//! `CookieApi` collaborator.
//!
//! For one request id the request phase strictly precedes the response
//! phase; entries for different request ids are independent.

use std::collections::HashMap;

use log::debug;

use crate::filtering_log::{CookieEvent, FilteringLog};
use crate::request::Request;
use crate::rules::{NetworkRule, SameSite};

// =============================================================================
// Collaborators
// =============================================================================

/// A cookie as the host's cookie store sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserCookie {
    pub name: String,
    pub value: String,
    pub same_site: Option<SameSite>,
    /// Remaining lifetime in seconds; `None` for session cookies.
    pub max_age: Option<u64>,
}

/// Capability set over the host's cookie storage. The engine issues calls
/// sequentially; serialisation is the collaborator's concern.
pub trait CookieApi {
    fn remove_cookie(&mut self, name: &str, url: &str);
    fn modify_cookie(&mut self, cookie: &BrowserCookie, url: &str);
    fn get_cookies(&self, name: &str, url: &str) -> Vec<BrowserCookie>;
}

/// One HTTP header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

// =============================================================================
// Schedule
// =============================================================================

/// Work recorded during the request phase, applied during the response
/// phase.
#[derive(Debug, Clone)]
struct CookieScheduleEntry {
    name: String,
    url: String,
    rules: Vec<NetworkRule>,
    remove: bool,
}

/// Two-phase `$cookie` rule applier.
pub struct CookieFiltering<A: CookieApi, L: FilteringLog> {
    api: A,
    log: L,
    journal: HashMap<u64, Vec<CookieScheduleEntry>>,
}

impl<A: CookieApi, L: FilteringLog> CookieFiltering<A, L> {
    pub fn new(api: A, log: L) -> Self {
        Self {
            api,
            log,
            journal: HashMap::new(),
        }
    }

    /// Request phase: apply `cookie_rules` to the request's `Cookie`
    /// header. Blocked cookies are removed from the header and scheduled
    /// for store removal; modifying rules are scheduled. Returns whether
    /// the header list was modified.
    pub fn process_request_headers(
        &mut self,
        request: &Request,
        headers: &mut Vec<Header>,
        cookie_rules: &[&NetworkRule],
    ) -> bool {
        let Some(request_id) = request.request_id else {
            debug!("cookie filtering skipped: request has no id");
            return false;
        };
        if cookie_rules.is_empty() {
            return false;
        }

        let Some(header_index) = headers
            .iter()
            .position(|h| h.name.eq_ignore_ascii_case("cookie"))
        else {
            return false;
        };

        let cookies = parse_cookie_header(&headers[header_index].value);
        let mut survivors: Vec<(String, String)> = Vec::with_capacity(cookies.len());
        let mut changed = false;

        for (name, value) in cookies {
            let blocking = cookie_rules.iter().find(|r| {
                r.cookie_modifier()
                    .is_some_and(|m| m.matches(&name) && !m.is_modifying())
            });

            if let Some(&rule) = blocking {
                if rule.is_whitelist() {
                    // Observation only: the exception protects the cookie.
                    self.schedule(request_id, &name, &request.url, vec![rule.clone()], false);
                    self.log_event(request_id, &name, rule, false);
                    survivors.push((name, value));
                } else {
                    self.schedule(request_id, &name, &request.url, vec![rule.clone()], true);
                    self.log_event(request_id, &name, rule, false);
                    changed = true;
                }
                continue;
            }

            let modifying: Vec<NetworkRule> = cookie_rules
                .iter()
                .filter(|r| {
                    r.cookie_modifier()
                        .is_some_and(|m| m.matches(&name) && m.is_modifying())
                })
                .map(|&r| r.clone())
                .collect();

            if !modifying.is_empty() {
                for rule in &modifying {
                    self.log_event(request_id, &name, rule, true);
                }
                self.schedule(request_id, &name, &request.url, modifying, false);
            }

            survivors.push((name, value));
        }

        if changed {
            if survivors.is_empty() {
                headers.remove(header_index);
            } else {
                headers[header_index].value = serialize_cookie_header(&survivors);
            }
        }

        changed
    }

    /// Response phase: drain the schedule for `request_id`, removing and
    /// modifying stored cookies through the `CookieApi`.
    pub fn modify_cookies(&mut self, request_id: u64) {
        let Some(entries) = self.journal.remove(&request_id) else {
            return;
        };

        for entry in entries {
            if entry.remove {
                self.api.remove_cookie(&entry.name, &entry.url);
                continue;
            }

            let rules: Vec<&NetworkRule> = entry
                .rules
                .iter()
                .filter(|r| !r.is_whitelist() && r.cookie_modifier().is_some_and(|m| m.is_modifying()))
                .collect();
            if rules.is_empty() {
                continue;
            }

            for mut cookie in self.api.get_cookies(&entry.name, &entry.url) {
                let mut cookie_changed = false;
                for rule in &rules {
                    if let Some(modifier) = rule.cookie_modifier() {
                        cookie_changed |= apply_modifier(&mut cookie, modifier);
                    }
                }
                if cookie_changed {
                    self.api.modify_cookie(&cookie, &entry.url);
                }
            }
        }
    }

    fn schedule(
        &mut self,
        request_id: u64,
        name: &str,
        url: &str,
        rules: Vec<NetworkRule>,
        remove: bool,
    ) {
        self.journal
            .entry(request_id)
            .or_default()
            .push(CookieScheduleEntry {
                name: name.to_string(),
                url: url.to_string(),
                rules,
                remove,
            });
    }

    fn log_event(&self, request_id: u64, cookie_name: &str, rule: &NetworkRule, is_modifying: bool) {
        self.log.add_cookie_event(&CookieEvent {
            request_id,
            cookie_name: cookie_name.to_string(),
            rule_text: rule.text().to_string(),
            is_modifying,
        });
    }
}

/// Apply one cookie modifier. `sameSite` overrides when different;
/// `maxAge` only ever shortens the lifetime.
fn apply_modifier(cookie: &mut BrowserCookie, modifier: &crate::rules::CookieModifier) -> bool {
    let mut changed = false;

    if let Some(same_site) = modifier.same_site {
        if cookie.same_site != Some(same_site) {
            cookie.same_site = Some(same_site);
            changed = true;
        }
    }

    if let Some(max_age) = modifier.max_age {
        if max_age > 0 && cookie.max_age.map_or(true, |current| current > max_age) {
            cookie.max_age = Some(max_age);
            changed = true;
        }
    }

    changed
}

/// `name=value; name2=value2` → pairs, whitespace trimmed. A part without
/// `=` becomes a nameless value, matching how browsers treat it.
fn parse_cookie_header(value: &str) -> Vec<(String, String)> {
    value
        .split(';')
        .filter_map(|part| {
            let part = part.trim();
            if part.is_empty() {
                return None;
            }
            match part.split_once('=') {
                Some((name, value)) => Some((name.trim().to_string(), value.trim().to_string())),
                None => Some((String::new(), part.to_string())),
            }
        })
        .collect()
}

fn serialize_cookie_header(cookies: &[(String, String)]) -> String {
    cookies
        .iter()
        .map(|(name, value)| {
            if name.is_empty() {
                value.clone()
            } else {
                format!("{name}={value}")
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}
