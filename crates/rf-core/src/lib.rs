//! ReqFilter Core Library
//!
//! Content-blocking rule engine: ingests Adblock-Plus style filter lists
//! and answers, per request or per page, which rules apply and what the
//! combined verdict is.
//!
//! # Architecture
//!
//! Filter-list text flows through a line reader and the rule scanner into
//! [`filterlist::RuleStorage`], which hands every rule a stable 64-bit
//! index. The [`engine::Engine`] facade indexes stored rules twice: the
//! network index ([`engine::network`]) answers `match_all` for requests in
//! amortised sub-linear time via a shortcut-hash table, and the cosmetic
//! index ([`engine::cosmetic`]) maps hostnames to page-altering rules.
//! Matched network rules are reduced to a single verdict by
//! [`engine::matching_result::MatchingResult`]; `$cookie` rules feed the
//! two-phase [`engine::cookie_filtering::CookieFiltering`] state machine.
//!
//! Indexes are built once at load time and are read-only afterwards; all
//! matching calls are synchronous and safe to share.

pub mod config;
pub mod engine;
pub mod error;
pub mod filterlist;
pub mod filtering_log;
pub mod hash;
pub mod request;
pub mod rules;
pub mod url;

// Re-export commonly used types
pub use config::EngineConfig;
pub use engine::cookie_filtering::{BrowserCookie, CookieApi, CookieFiltering, Header};
pub use engine::cosmetic::{CosmeticOption, CosmeticResult};
pub use engine::matching_result::MatchingResult;
pub use engine::network::RuleMatch;
pub use engine::Engine;
pub use error::FilterError;
pub use filterlist::{FilterList, RuleStorage, ScannerFlags};
pub use filtering_log::{FilteringLog, NoopFilteringLog};
pub use request::{Request, RequestType};
pub use rules::{CosmeticRule, NetworkRule, Rule};
