//! Filtering log sink
//!
//! Observation-only collaborator: the engine reports what it did, the host
//! decides what to do with it. All methods default to no-ops so hosts only
//! implement what they surface.

/// A cookie the engine acted on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieEvent {
    pub request_id: u64,
    pub cookie_name: String,
    pub rule_text: String,
    /// True when the rule rewrites cookie attributes, false when it removes
    /// the cookie.
    pub is_modifying: bool,
}

pub trait FilteringLog {
    fn add_html_event(&self, _request_id: u64, _element: &str, _rule_text: &str) {}

    fn add_replace_rules_event(&self, _request_id: u64, _rule_texts: &[String]) {}

    fn add_cookie_event(&self, _event: &CookieEvent) {}
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopFilteringLog;

impl FilteringLog for NoopFilteringLog {}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::cell::RefCell;

    /// Records cookie events for assertions.
    #[derive(Debug, Default)]
    pub struct RecordingLog {
        pub cookie_events: RefCell<Vec<CookieEvent>>,
    }

    impl FilteringLog for RecordingLog {
        fn add_cookie_event(&self, event: &CookieEvent) {
            self.cookie_events.borrow_mut().push(event.clone());
        }
    }
}
