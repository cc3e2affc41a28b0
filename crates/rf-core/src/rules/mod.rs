//! Filter rule types
//!
//! A rule is either a network rule (request blocking/modifying) or a
//! cosmetic rule (page altering). The scanner classifies lines and the
//! engines dispatch on the variant.

pub mod cookie;
pub mod cosmetic;
pub mod network;
pub mod pattern;

pub use cookie::{CookieModifier, SameSite};
pub use cosmetic::{CosmeticRule, CosmeticRuleType};
pub use network::{AdvancedModifier, NetworkRule, NetworkRuleOption};

/// A parsed filter rule.
#[derive(Debug, Clone)]
pub enum Rule {
    Network(NetworkRule),
    Cosmetic(CosmeticRule),
}

impl Rule {
    pub fn text(&self) -> &str {
        match self {
            Rule::Network(r) => r.text(),
            Rule::Cosmetic(r) => r.text(),
        }
    }

    pub fn filter_list_id(&self) -> i32 {
        match self {
            Rule::Network(r) => r.filter_list_id(),
            Rule::Cosmetic(r) => r.filter_list_id(),
        }
    }

    pub fn as_network(&self) -> Option<&NetworkRule> {
        match self {
            Rule::Network(r) => Some(r),
            Rule::Cosmetic(_) => None,
        }
    }

    pub fn as_cosmetic(&self) -> Option<&CosmeticRule> {
        match self {
            Rule::Cosmetic(r) => Some(r),
            Rule::Network(_) => None,
        }
    }
}
