//! Configuration surface (spec §6.3).
//!
//! The core never reads the environment itself; callers construct an
//! [`EngineConfig`] (or use [`EngineConfig::default`]) and pass it to every
//! public entry point. This mirrors the redesign direction in §9: "replace
//! [env vars] with an explicitly passed configuration value that the engine
//! threads through calls".

/// The default number of fixed-point iterations allowed before hard-binding
/// assembly gives up and reports `ExclusionFixedPointDivergence`.
pub const MAX_FIXED_POINT_ITERATIONS: usize = 4;

/// Canonical C2PA context URLs accepted by default.
pub const DEFAULT_ACCEPTED_CONTEXTS: &[&str] = &[
    "https://c2pa.org/2.2/context",
    "https://c2pa.org/2.3/context",
];

/// Context URL emitted at signing time unless overridden.
pub const DEFAULT_CONTEXT_URL: &str = "https://c2pa.org/2.3/context";

/// Process-wide knobs threaded through embed/verify calls.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Overrides the emitted C2PA `@context` URL at signing time.
    pub c2pa_context_url: String,
    /// Allowlist consulted by the verifier for interop-bridge inputs.
    pub accepted_contexts: Vec<String>,
    /// Default for `add_hard_binding` / `require_hard_binding` when the
    /// caller doesn't override it at the call site.
    pub hard_binding_default: bool,
    /// Fanout `k` for distributed legacy site-selection: at least
    /// `ceil(len(bytes) / k)` sites must be available.
    pub distribution_fanout: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            c2pa_context_url: DEFAULT_CONTEXT_URL.to_string(),
            accepted_contexts: DEFAULT_ACCEPTED_CONTEXTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            hard_binding_default: true,
            distribution_fanout: 4,
        }
    }
}

impl EngineConfig {
    /// Config used by the streaming embedder: hard binding can't be computed
    /// over an unfinished stream, so it defaults to disabled there.
    pub fn streaming_default() -> Self {
        Self {
            hard_binding_default: false,
            ..Self::default()
        }
    }
}
