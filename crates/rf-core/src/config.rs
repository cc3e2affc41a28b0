//! Engine configuration
//!
//! A plain per-engine value handed over at construction. Matching never
//! reads ambient state; everything it needs travels with the engine.

/// Host-supplied configuration.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Tag identifying the host runtime. Echoed in diagnostics, never
    /// interpreted.
    pub engine: String,
    /// Host semantic version, advisory.
    pub version: String,
    /// Enables per-rule diagnostics through the log facade.
    pub verbose: bool,
}

impl EngineConfig {
    pub fn new(engine: impl Into<String>, version: impl Into<String>, verbose: bool) -> Self {
        Self {
            engine: engine.into(),
            version: version.into(),
            verbose,
        }
    }
}
