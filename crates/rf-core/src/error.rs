//! Error taxonomy for the rule engine.
//!
//! Constructor-time errors propagate to the caller; per-rule scan errors are
//! absorbed by the scanner (logged and skipped). Storage lookup misses are
//! `Option::None`, not errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FilterError {
    /// File open/read failure in a line reader.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A single rule failed to parse. The scanner logs and skips these;
    /// they only surface when a rule is parsed directly.
    #[error("invalid rule \"{line}\": {reason}")]
    RuleSyntax { line: String, reason: String },

    /// Invalid engine construction parameters.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl FilterError {
    pub(crate) fn syntax(line: &str, reason: impl Into<String>) -> Self {
        Self::RuleSyntax {
            line: line.to_string(),
            reason: reason.into(),
        }
    }
}
